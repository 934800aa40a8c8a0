//! Controller core: owns the avatar and drives the tick pipeline
//!
//! Single-threaded cooperative model: one task runs [`Controller::run`],
//! which drains inbound messages and commands between scheduling passes.
//! All state mutation happens there, so the tick pipeline never races a
//! message handler.

pub mod avatar;
pub mod control;
pub mod look;
pub mod physics;
pub mod reconcile;
pub mod scheduler;

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, trace};
use uuid::Uuid;

use crate::config::ControllerConfig;
use crate::net::protocol::{EntityAction, Inbound, Outbound};
use crate::sim::Simulator;
use crate::world::WorldView;

use avatar::{AvatarState, Vec3};
use control::{ControlError, ControlIntent, ControlState};
use look::{LookResult, LookTask};
use physics::{check_glide_preconditions, GlideError, PhysicsAdapter};
use reconcile::Reconciler;
use scheduler::TickClock;

/// Commands accepted by the running controller task.
#[derive(Debug)]
pub enum Command {
    SetControl {
        intent: ControlIntent,
        active: bool,
    },
    ClearControls,
    Look {
        yaw: f32,
        pitch: f32,
        force: bool,
        done: oneshot::Sender<LookResult>,
    },
    LookAt {
        target: Vec3,
        force: bool,
        done: oneshot::Sender<LookResult>,
    },
    StartGlide {
        done: oneshot::Sender<Result<(), GlideError>>,
    },
    SetPhysicsEnabled(bool),
}

/// The client-side movement and state-synchronization core.
pub struct Controller {
    config: ControllerConfig,
    avatar: AvatarState,
    controls: ControlState,
    clock: TickClock,
    reconciler: Reconciler,
    look: LookTask,
    physics: PhysicsAdapter,
    world: Arc<dyn WorldView>,

    outbound_tx: mpsc::UnboundedSender<Outbound>,
    inbound_rx: mpsc::UnboundedReceiver<Inbound>,
    command_rx: mpsc::UnboundedReceiver<Command>,
    tick_tx: watch::Sender<u64>,

    tick: u64,
    session_id: Option<Uuid>,
    session_active: bool,
    /// Set by the first authoritative correction after login/respawn;
    /// physics does not run until the peer has placed us somewhere.
    physics_eligible: bool,
    physics_enabled: bool,
    held_slot: u8,
    running: bool,
}

impl Controller {
    /// Create a controller plus its channel-based handle and the stream of
    /// outbound wire messages for the transport to consume.
    pub fn new(
        config: ControllerConfig,
        simulator: Arc<dyn Simulator>,
        world: Arc<dyn WorldView>,
    ) -> (Self, ControllerHandle, mpsc::UnboundedReceiver<Outbound>) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (tick_tx, tick_rx) = watch::channel(0);

        let physics_enabled = config.physics_enabled;
        let controller = Self {
            clock: TickClock::new(config.tick_interval, config.catchup_limit),
            reconciler: Reconciler::new(config.features),
            config,
            avatar: AvatarState::default(),
            controls: ControlState::new(),
            look: LookTask::new(),
            physics: PhysicsAdapter::new(simulator),
            world,
            outbound_tx,
            inbound_rx,
            command_rx,
            tick_tx,
            tick: 0,
            session_id: None,
            session_active: false,
            physics_eligible: false,
            physics_enabled,
            held_slot: 0,
            running: false,
        };

        let handle = ControllerHandle {
            inbound_tx,
            command_tx,
            tick_rx,
        };

        (controller, handle, outbound_rx)
    }

    pub fn avatar(&self) -> &AvatarState {
        &self.avatar
    }

    /// Mutable access for embedders mirroring externally-owned entity data
    /// (health, status effects, equipment) into the body state.
    pub fn avatar_mut(&mut self) -> &mut AvatarState {
        &mut self.avatar
    }

    pub fn held_slot(&self) -> u8 {
        self.held_slot
    }

    pub fn set_control(&mut self, intent: ControlIntent, active: bool) {
        self.controls.set(intent, active);
    }

    pub fn set_control_by_name(&mut self, name: &str, active: bool) -> Result<(), ControlError> {
        self.controls.set_by_name(name, active)
    }

    pub fn get_control(&self, intent: ControlIntent) -> bool {
        self.controls.get(intent)
    }

    /// Trusted write that skips validation and jump bookkeeping, e.g. when
    /// replaying an intent the peer already believes is held.
    pub fn spoof_control(&mut self, intent: ControlIntent, active: bool) {
        self.controls.spoof_set(intent, active);
    }

    pub fn clear_controls(&mut self) {
        self.controls.clear_all();
    }

    pub fn set_physics_enabled(&mut self, enabled: bool) {
        self.physics_enabled = enabled;
    }

    /// Withdraw physics eligibility, e.g. while mounted on another entity.
    pub fn set_physics_eligible(&mut self, eligible: bool) {
        self.physics_eligible = eligible;
    }

    /// Steer orientation toward the target across ticks. A second call
    /// interrupts the first; `force` snaps immediately and completes
    /// synchronously.
    pub fn look(&mut self, yaw: f32, pitch: f32, force: bool) -> oneshot::Receiver<LookResult> {
        let (done, rx) = oneshot::channel();
        self.apply_look(yaw, pitch, force, done);
        rx
    }

    /// Look toward a world point from the avatar's eye position.
    pub fn look_at(&mut self, target: Vec3, force: bool) -> oneshot::Receiver<LookResult> {
        let (yaw, pitch) = self.look_angles_to(target);
        self.look(yaw, pitch, force)
    }

    /// Start gliding, or explain why that is not possible right now.
    pub fn start_glide(&mut self) -> Result<(), GlideError> {
        check_glide_preconditions(&self.avatar)?;
        let _ = self.outbound_tx.send(Outbound::EntityAction {
            action: EntityAction::GlideStart,
        });
        Ok(())
    }

    /// One scheduling pass: accumulate elapsed time and run due ticks.
    pub fn pump(&mut self, now: Instant) {
        if !self.session_active {
            return;
        }
        let steps = self.clock.advance(now);
        for _ in 0..steps {
            self.tick_once();
        }
    }

    fn tick_once(&mut self) {
        // chunk not loaded: definitional "not ready", retried next tick
        if self.world.block_at(self.avatar.position).is_none() {
            trace!("avatar chunk not loaded, skipping tick");
            return;
        }
        if !(self.physics_enabled && self.physics_eligible) {
            return;
        }

        let pose = self.reconciler.snapshot().pose();
        self.physics
            .step(&mut self.avatar, &mut self.controls, pose, &*self.world);

        self.look.tick(&mut self.avatar, self.physics.turn_speeds());

        for msg in self.reconciler.outbound_tick(&self.avatar, &self.controls) {
            let _ = self.outbound_tx.send(msg);
        }

        self.tick += 1;
        let _ = self.tick_tx.send(self.tick);
    }

    /// Apply one inbound message from the remote peer.
    pub fn handle_inbound(&mut self, msg: Inbound) {
        match msg {
            Inbound::PositionCorrection {
                x,
                y,
                z,
                yaw,
                pitch,
                flags,
                correlation_id,
            } => {
                // a correction supersedes any in-flight convergence
                self.look.cancel();
                let flags = flags.normalize();
                let msgs = self.reconciler.apply_correction(
                    &mut self.avatar,
                    Vec3::new(x, y, z),
                    yaw,
                    pitch,
                    flags,
                    correlation_id,
                );
                for msg in msgs {
                    let _ = self.outbound_tx.send(msg);
                }
                self.physics_eligible = true;
            }
            Inbound::Knockback { x, y, z } => {
                if self.physics_enabled {
                    self.avatar.velocity.x += x;
                    self.avatar.velocity.y += y;
                    self.avatar.velocity.z += z;
                    debug!(x, y, z, "applied knockback impulse");
                }
            }
            Inbound::Rotation { yaw, pitch } => {
                self.avatar.set_angles(yaw, pitch, true);
            }
            Inbound::HeldItemSlot { slot } => {
                self.held_slot = slot;
            }
            Inbound::Login => self.handle_login(),
            Inbound::Respawn => self.handle_respawn(),
            Inbound::SessionEnd => self.handle_end(),
        }
    }

    fn handle_login(&mut self) {
        let session_id = Uuid::new_v4();
        self.session_id = Some(session_id);
        self.avatar.yaw = 0.0;
        self.avatar.pitch = 0.0;
        self.physics_eligible = false;
        self.controls.force_reset();
        self.look.cancel();
        self.reconciler.reset();
        self.clock.reset();
        self.session_active = true;
        info!(session_id = %session_id, "session established");
    }

    fn handle_respawn(&mut self) {
        self.avatar.yaw = 0.0;
        self.avatar.pitch = 0.0;
        self.physics_eligible = false;
        self.controls.force_reset();
        self.look.cancel();
        if let Some(session_id) = self.session_id {
            info!(session_id = %session_id, "avatar respawned");
        }
    }

    fn handle_end(&mut self) {
        self.session_active = false;
        self.running = false;
        self.look.cancel();
        if let Some(session_id) = self.session_id.take() {
            info!(session_id = %session_id, "session ended");
        }
    }

    fn apply_command(&mut self, cmd: Command) {
        match cmd {
            Command::SetControl { intent, active } => self.set_control(intent, active),
            Command::ClearControls => self.clear_controls(),
            Command::Look {
                yaw,
                pitch,
                force,
                done,
            } => self.apply_look(yaw, pitch, force, done),
            Command::LookAt {
                target,
                force,
                done,
            } => {
                let (yaw, pitch) = self.look_angles_to(target);
                self.apply_look(yaw, pitch, force, done);
            }
            Command::StartGlide { done } => {
                let _ = done.send(self.start_glide());
            }
            Command::SetPhysicsEnabled(enabled) => self.set_physics_enabled(enabled),
        }
    }

    fn apply_look(&mut self, yaw: f32, pitch: f32, force: bool, done: oneshot::Sender<LookResult>) {
        if force {
            self.look.cancel();
            self.avatar.set_angles(yaw, pitch, true);
            let _ = done.send(LookResult::Converged);
            return;
        }
        self.look.start(yaw, pitch, done);
    }

    fn look_angles_to(&self, target: Vec3) -> (f32, f32) {
        let eye = Vec3::new(
            self.avatar.position.x,
            self.avatar.position.y + self.avatar.eye_height,
            self.avatar.position.z,
        );
        let dx = target.x - eye.x;
        let dy = target.y - eye.y;
        let dz = target.z - eye.z;

        let yaw_rad = (-dx).atan2(-dz);
        let ground_distance = (dx * dx + dz * dz).sqrt();
        let pitch_rad = dy.atan2(ground_distance);

        let yaw = (std::f64::consts::PI - yaw_rad).to_degrees() as f32;
        let pitch = (-pitch_rad.to_degrees()) as f32;
        (yaw, pitch)
    }

    /// Drive the controller until the session ends: fixed-interval
    /// scheduling passes interleaved with inbound messages and commands,
    /// all on this one task.
    pub async fn run(mut self) {
        let mut ticker = interval(self.config.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.running = true;

        while self.running {
            tokio::select! {
                instant = ticker.tick() => {
                    self.pump(instant);
                }
                Some(msg) = self.inbound_rx.recv() => {
                    self.handle_inbound(msg);
                }
                cmd = self.command_rx.recv() => match cmd {
                    Some(cmd) => self.apply_command(cmd),
                    // every handle dropped: nobody left to drive us
                    None => break,
                },
            }
        }

        info!("controller task stopped");
    }
}

/// Channel-based handle for interacting with a running controller task.
#[derive(Clone)]
pub struct ControllerHandle {
    inbound_tx: mpsc::UnboundedSender<Inbound>,
    command_tx: mpsc::UnboundedSender<Command>,
    tick_rx: watch::Receiver<u64>,
}

impl ControllerHandle {
    /// Feed one inbound wire message to the controller.
    pub fn deliver(&self, msg: Inbound) -> Result<(), ControllerClosed> {
        self.inbound_tx.send(msg).map_err(|_| ControllerClosed)
    }

    pub fn set_control(&self, intent: ControlIntent, active: bool) -> Result<(), ControllerClosed> {
        self.send(Command::SetControl { intent, active })
    }

    pub fn clear_controls(&self) -> Result<(), ControllerClosed> {
        self.send(Command::ClearControls)
    }

    pub fn set_physics_enabled(&self, enabled: bool) -> Result<(), ControllerClosed> {
        self.send(Command::SetPhysicsEnabled(enabled))
    }

    /// Steer toward the target orientation; resolves once converged or
    /// interrupted by a newer request or correction.
    pub async fn look(
        &self,
        yaw: f32,
        pitch: f32,
        force: bool,
    ) -> Result<LookResult, ControllerClosed> {
        let (done, rx) = oneshot::channel();
        self.send(Command::Look {
            yaw,
            pitch,
            force,
            done,
        })?;
        rx.await.map_err(|_| ControllerClosed)
    }

    /// Steer toward a world point; see [`ControllerHandle::look`].
    pub async fn look_at(&self, target: Vec3, force: bool) -> Result<LookResult, ControllerClosed> {
        let (done, rx) = oneshot::channel();
        self.send(Command::LookAt {
            target,
            force,
            done,
        })?;
        rx.await.map_err(|_| ControllerClosed)
    }

    pub async fn start_glide(&self) -> Result<Result<(), GlideError>, ControllerClosed> {
        let (done, rx) = oneshot::channel();
        self.send(Command::StartGlide { done })?;
        rx.await.map_err(|_| ControllerClosed)
    }

    /// Suspend until `ticks` further simulation ticks have executed.
    pub async fn wait_for_ticks(&self, ticks: u64) -> Result<(), ControllerClosed> {
        if ticks == 0 {
            return Ok(());
        }
        let mut rx = self.tick_rx.clone();
        let target = *rx.borrow() + ticks;
        while *rx.borrow() < target {
            rx.changed().await.map_err(|_| ControllerClosed)?;
        }
        Ok(())
    }

    /// Current executed-tick count.
    pub fn tick(&self) -> u64 {
        *self.tick_rx.borrow()
    }

    fn send(&self, cmd: Command) -> Result<(), ControllerClosed> {
        self.command_tx.send(cmd).map_err(|_| ControllerClosed)
    }
}

/// The controller task has shut down and can no longer be reached.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("controller task has shut down")]
pub struct ControllerClosed;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProtocolFeatures;
    use crate::net::protocol::{CorrectionFlags, RawCorrectionFlags};
    use crate::sim::{AvatarDelta, SimInput};
    use crate::world::Block;
    use std::time::Duration;

    /// Moves the avatar a fixed amount along +x each step.
    struct Drift;

    impl Simulator for Drift {
        fn simulate(&self, input: &SimInput, _world: &dyn WorldView) -> AvatarDelta {
            AvatarDelta {
                position: Vec3::new(
                    input.avatar.position.x + 0.25,
                    input.avatar.position.y,
                    input.avatar.position.z,
                ),
                velocity: input.avatar.velocity,
                on_ground: true,
            }
        }
    }

    /// Leaves the avatar exactly where it is.
    struct Stationary;

    impl Simulator for Stationary {
        fn simulate(&self, input: &SimInput, _world: &dyn WorldView) -> AvatarDelta {
            AvatarDelta {
                position: input.avatar.position,
                velocity: input.avatar.velocity,
                on_ground: input.avatar.on_ground,
            }
        }
    }

    struct Flat;

    impl WorldView for Flat {
        fn block_at(&self, _pos: Vec3) -> Option<Block> {
            Some(Block { id: 1 })
        }
    }

    struct Unloaded;

    impl WorldView for Unloaded {
        fn block_at(&self, _pos: Vec3) -> Option<Block> {
            None
        }
    }

    fn correction_to(x: f64, y: f64, z: f64) -> Inbound {
        Inbound::PositionCorrection {
            x,
            y,
            z,
            yaw: 0.0,
            pitch: 0.0,
            flags: RawCorrectionFlags::Fields(CorrectionFlags::default()),
            correlation_id: 1,
        }
    }

    fn spawn_controller(
        simulator: Arc<dyn Simulator>,
        world: Arc<dyn WorldView>,
    ) -> (Controller, mpsc::UnboundedReceiver<Outbound>) {
        let (controller, _handle, outbound_rx) =
            Controller::new(ControllerConfig::default(), simulator, world);
        (controller, outbound_rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<Outbound>) -> Vec<Outbound> {
        let mut msgs = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            msgs.push(msg);
        }
        msgs
    }

    #[test]
    fn ticks_are_gated_on_correction_after_login() {
        let (mut controller, mut rx) = spawn_controller(Arc::new(Drift), Arc::new(Flat));
        let t0 = Instant::now();

        controller.handle_inbound(Inbound::Login);
        controller.avatar_mut().alive = true;
        controller.pump(t0);
        controller.pump(t0 + Duration::from_millis(50));
        assert!(drain(&mut rx).is_empty(), "no physics before placement");

        controller.handle_inbound(correction_to(0.0, 64.0, 0.0));
        let msgs = drain(&mut rx);
        assert!(matches!(msgs[0], Outbound::CorrectionAck { .. }));
        assert!(matches!(msgs[1], Outbound::PositionAndLook { .. }));

        controller.pump(t0 + Duration::from_millis(100));
        let msgs = drain(&mut rx);
        assert!(
            matches!(msgs[0], Outbound::Position { .. }),
            "drift emits position updates once eligible: {msgs:?}"
        );
    }

    #[test]
    fn unloaded_chunk_skips_the_tick() {
        let (mut controller, mut rx) = spawn_controller(Arc::new(Drift), Arc::new(Unloaded));
        let t0 = Instant::now();

        controller.handle_inbound(Inbound::Login);
        controller.avatar_mut().alive = true;
        controller.handle_inbound(correction_to(0.0, 64.0, 0.0));
        drain(&mut rx);

        controller.pump(t0);
        controller.pump(t0 + Duration::from_millis(200));
        assert!(drain(&mut rx).is_empty());
        assert_eq!(controller.avatar().position.y, 64.0, "no physics ran");
    }

    #[test]
    fn forced_look_snaps_in_place_without_partial_turns() {
        let (mut controller, mut rx) = spawn_controller(Arc::new(Stationary), Arc::new(Flat));
        controller.handle_inbound(Inbound::Login);
        controller.avatar_mut().alive = true;
        controller.handle_inbound(correction_to(0.0, 64.0, 0.0));
        drain(&mut rx);

        let mut done = controller.look(90.0, 0.0, true);
        assert_eq!(done.try_recv().unwrap(), LookResult::Converged);
        assert!((controller.avatar().yaw - 90.0).abs() < 1e-4);
        assert!(drain(&mut rx).is_empty(), "snap emits nothing by itself");
    }

    #[test]
    fn correction_interrupts_active_look() {
        let (mut controller, mut rx) = spawn_controller(Arc::new(Stationary), Arc::new(Flat));
        controller.handle_inbound(Inbound::Login);
        controller.avatar_mut().alive = true;
        controller.handle_inbound(correction_to(0.0, 64.0, 0.0));
        drain(&mut rx);

        let mut done = controller.look(120.0, 0.0, false);
        controller.handle_inbound(correction_to(10.0, 64.0, 10.0));
        assert_eq!(done.try_recv().unwrap(), LookResult::Interrupted);
    }

    #[test]
    fn knockback_adds_velocity_only_with_physics_enabled() {
        let (mut controller, _rx) = spawn_controller(Arc::new(Stationary), Arc::new(Flat));
        controller.handle_inbound(Inbound::Knockback {
            x: 0.5,
            y: 1.0,
            z: -0.5,
        });
        assert_eq!(controller.avatar().velocity, Vec3::new(0.5, 1.0, -0.5));

        controller.set_physics_enabled(false);
        controller.handle_inbound(Inbound::Knockback {
            x: 0.5,
            y: 0.0,
            z: 0.0,
        });
        assert_eq!(controller.avatar().velocity, Vec3::new(0.5, 1.0, -0.5));
    }

    #[test]
    fn respawn_resets_orientation_and_controls() {
        let (mut controller, mut rx) = spawn_controller(Arc::new(Stationary), Arc::new(Flat));
        controller.handle_inbound(Inbound::Login);
        controller.avatar_mut().alive = true;
        controller.handle_inbound(correction_to(0.0, 64.0, 0.0));
        drain(&mut rx);

        controller.set_control(ControlIntent::Forward, true);
        controller.avatar_mut().yaw = 90.0;

        controller.handle_inbound(Inbound::Respawn);
        assert_eq!(controller.avatar().yaw, 0.0);
        assert!(!controller.get_control(ControlIntent::Forward));

        // no physics again until the next correction
        let t0 = Instant::now();
        controller.pump(t0);
        controller.pump(t0 + Duration::from_millis(100));
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn held_slot_is_mirrored() {
        let (mut controller, _rx) = spawn_controller(Arc::new(Stationary), Arc::new(Flat));
        controller.handle_inbound(Inbound::HeldItemSlot { slot: 3 });
        assert_eq!(controller.held_slot(), 3);
    }

    #[test]
    fn invalid_control_name_is_rejected() {
        let (mut controller, _rx) = spawn_controller(Arc::new(Stationary), Arc::new(Flat));
        assert!(controller.set_control_by_name("fly", true).is_err());
        assert!(controller.set_control_by_name("sneak", true).is_ok());
        assert!(controller.get_control(ControlIntent::Sneak));
    }

    #[test]
    fn look_angles_point_at_target() {
        let (mut controller, _rx) = spawn_controller(Arc::new(Stationary), Arc::new(Flat));
        controller.avatar_mut().position = Vec3::ZERO;

        // target due "south" (+z) at eye level: yaw 0, pitch 0
        let (yaw, pitch) = controller.look_angles_to(Vec3::new(0.0, 1.62, 10.0));
        assert!(crate::util::angle::delta_degrees(yaw, 0.0).abs() < 1e-3);
        assert!(pitch.abs() < 1e-3);

        // straight up: pitch -90
        let (_, pitch) = controller.look_angles_to(Vec3::new(0.0, 100.0, 0.0));
        assert!((pitch + 90.0).abs() < 1e-3);
    }
}
