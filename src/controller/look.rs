//! Look-convergence task
//!
//! A cancellable asynchronous process that steers orientation toward a
//! target across ticks, bounded by the physics model's turn rate. The tick
//! loop drives the state machine; callers suspend on a oneshot until the
//! task reaches a terminal state.

use tokio::sync::oneshot;

use crate::sim::TurnSpeeds;
use crate::util::angle;

use super::avatar::AvatarState;

/// Angular distance below which the target counts as reached, in degrees.
pub const CONVERGENCE_EPSILON: f32 = 0.1;

/// Terminal state observed by the caller of a look request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookResult {
    /// Orientation reached the target
    Converged,
    /// Superseded by a newer look request or an authoritative correction
    Interrupted,
}

struct ActiveLook {
    yaw: f32,
    pitch: f32,
    done: oneshot::Sender<LookResult>,
}

/// At most one convergence target is active at a time.
#[derive(Default)]
pub struct LookTask {
    active: Option<ActiveLook>,
}

impl LookTask {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Begin converging toward the target, interrupting any active task.
    /// The completion signal fires once converged or superseded.
    pub fn start(&mut self, yaw: f32, pitch: f32, done: oneshot::Sender<LookResult>) {
        self.cancel();
        self.active = Some(ActiveLook { yaw, pitch, done });
    }

    /// Clear the active target, resolving its caller as interrupted.
    pub fn cancel(&mut self) {
        if let Some(task) = self.active.take() {
            let _ = task.done.send(LookResult::Interrupted);
        }
    }

    /// Per-tick convergence check and bounded turn step.
    pub fn tick(&mut self, avatar: &mut AvatarState, speeds: TurnSpeeds) {
        let Some(target) = &self.active else {
            return;
        };

        let yaw_remaining = angle::delta_degrees(avatar.yaw, target.yaw);
        let pitch_remaining = avatar.pitch - target.pitch;
        if yaw_remaining.abs() < CONVERGENCE_EPSILON && pitch_remaining.abs() < CONVERGENCE_EPSILON
        {
            if let Some(task) = self.active.take() {
                let _ = task.done.send(LookResult::Converged);
            }
            return;
        }

        let yaw_step = angle::delta_degrees(target.yaw, avatar.yaw)
            .clamp(-speeds.yaw_per_tick, speeds.yaw_per_tick);
        let pitch_step =
            (target.pitch - avatar.pitch).clamp(-speeds.pitch_per_tick, speeds.pitch_per_tick);
        avatar.set_angles(avatar.yaw + yaw_step, avatar.pitch + pitch_step, true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn speeds() -> TurnSpeeds {
        TurnSpeeds::default()
    }

    #[test]
    fn superseding_interrupts_previous_caller() {
        let mut task = LookTask::new();
        let (tx1, mut rx1) = oneshot::channel();
        task.start(90.0, 0.0, tx1);
        let (tx2, _rx2) = oneshot::channel();
        task.start(180.0, 0.0, tx2);

        assert_eq!(rx1.try_recv().unwrap(), LookResult::Interrupted);
        assert!(task.is_active());
    }

    #[test]
    fn converges_within_epsilon() {
        let mut task = LookTask::new();
        let mut avatar = AvatarState::default();
        let (tx, mut rx) = oneshot::channel();
        task.start(1.0, 0.0, tx);

        // first tick turns (quantized), second detects convergence
        task.tick(&mut avatar, speeds());
        assert!(rx.try_recv().is_err());
        task.tick(&mut avatar, speeds());
        assert_eq!(rx.try_recv().unwrap(), LookResult::Converged);
        assert!(!task.is_active());
        assert!(angle::delta_degrees(avatar.yaw, 1.0).abs() < CONVERGENCE_EPSILON);
    }

    #[test]
    fn turn_rate_is_bounded_per_tick() {
        let mut task = LookTask::new();
        let mut avatar = AvatarState::default();
        let (tx, _rx) = oneshot::channel();
        task.start(90.0, 45.0, tx);

        task.tick(&mut avatar, speeds());
        assert!((avatar.yaw - 3.0).abs() < 1e-4);
        assert!((avatar.pitch - 3.0).abs() < 1e-4);
    }

    #[test]
    fn yaw_turns_through_the_wrap_point() {
        let mut task = LookTask::new();
        let mut avatar = AvatarState {
            yaw: 350.0,
            ..Default::default()
        };
        let (tx, _rx) = oneshot::channel();
        task.start(10.0, 0.0, tx);

        task.tick(&mut avatar, speeds());
        // shortest path goes forward past 360, not backward through 180
        assert!((avatar.yaw - 353.0).abs() < 1e-4);
    }

    #[test]
    fn cancel_resolves_as_interrupted() {
        let mut task = LookTask::new();
        let (tx, mut rx) = oneshot::channel();
        task.start(45.0, 0.0, tx);
        task.cancel();
        assert_eq!(rx.try_recv().unwrap(), LookResult::Interrupted);
        assert!(!task.is_active());
    }
}
