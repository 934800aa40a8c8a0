//! Reconciliation engine
//!
//! After every tick this decides the minimal set of outbound messages that
//! keeps the remote peer's view consistent, diffing against the last state
//! actually transmitted. It also applies inbound authoritative corrections.

use tracing::{debug, trace};

use crate::config::ProtocolFeatures;
use crate::net::protocol::{CorrectionFlags, EntityAction, InputFlags, Outbound};
use crate::sim::SentPose;
use crate::util::angle;

use super::avatar::{AvatarState, Vec3};
use super::control::ControlState;

/// Dead ticks after which outbound emission stops entirely.
pub const DEAD_TICK_LIMIT: u32 = 20;

/// The last state actually transmitted to the remote peer.
///
/// Invariant: every field reflects exactly what went out on the wire; it is
/// only mutated by the record_* send paths and by `reset` on session start.
#[derive(Debug, Clone)]
pub struct SentSnapshot {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f32,
    pub pitch: f32,
    pub on_ground: bool,
    /// Quiet ticks remaining until a position resend is due
    pub ticker: i32,
    pub sprinting: bool,
    pub sneaking: bool,
    pub input_flags: InputFlags,
}

impl SentSnapshot {
    fn reset(resend_interval: i32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            yaw: 0.0,
            pitch: 0.0,
            on_ground: false,
            ticker: resend_interval,
            sprinting: false,
            sneaking: false,
            input_flags: InputFlags::default(),
        }
    }

    /// Pose baseline handed to the simulation step.
    pub fn pose(&self) -> SentPose {
        SentPose {
            x: self.x,
            y: self.y,
            z: self.z,
            yaw: self.yaw,
            pitch: self.pitch,
            on_ground: self.on_ground,
        }
    }
}

/// Computes outbound state diffs and applies authoritative corrections.
pub struct Reconciler {
    features: ProtocolFeatures,
    snapshot: SentSnapshot,
    dead_ticks: u32,
}

impl Reconciler {
    pub fn new(features: ProtocolFeatures) -> Self {
        Self {
            features,
            snapshot: SentSnapshot::reset(features.resend_interval_ticks),
            // removed until the first alive tick
            dead_ticks: DEAD_TICK_LIMIT + 1,
        }
    }

    pub fn snapshot(&self) -> &SentSnapshot {
        &self.snapshot
    }

    /// Recreate the outbound snapshot on session (re)establishment.
    pub fn reset(&mut self) {
        self.snapshot = SentSnapshot::reset(self.features.resend_interval_ticks);
    }

    /// Death/removal predicate: true once the avatar has been dead for
    /// `DEAD_TICK_LIMIT` consecutive ticks. An alive tick resets it.
    fn removed(&mut self, alive: bool) -> bool {
        if alive {
            self.dead_ticks = 0;
        } else if self.dead_ticks <= DEAD_TICK_LIMIT {
            self.dead_ticks += 1;
        }
        self.dead_ticks >= DEAD_TICK_LIMIT
    }

    /// Per-tick outbound decision (priority: combined > position >
    /// look > ground-state heartbeat). At most one position/look-bearing
    /// message is produced per tick.
    pub fn outbound_tick(&mut self, avatar: &AvatarState, controls: &ControlState) -> Vec<Outbound> {
        let mut out = Vec::new();

        if self.removed(avatar.alive) {
            return out;
        }

        let flags = controls.flags();

        // sprint is a request; it only applies while moving forward unsneaked
        let net_forward = i8::from(flags.forward) - i8::from(flags.back);
        let sprinting = net_forward > 0 && !flags.sneak && flags.sprint;
        if self.snapshot.sprinting != sprinting {
            out.push(Outbound::EntityAction {
                action: if sprinting {
                    EntityAction::SprintStart
                } else {
                    EntityAction::SprintStop
                },
            });
            self.snapshot.sprinting = sprinting;
        }

        if self.snapshot.sneaking != flags.sneak {
            out.push(Outbound::EntityAction {
                action: if flags.sneak {
                    EntityAction::SneakStart
                } else {
                    EntityAction::SneakStop
                },
            });
            self.snapshot.sneaking = flags.sneak;
        }

        if self.features.input_state_messages && self.snapshot.input_flags != flags {
            self.snapshot.input_flags = flags;
            out.push(Outbound::InputState { flags });
        }

        // anchor the candidate yaw on the last transmitted value so angle
        // wraparound never accumulates error
        let yaw = self.snapshot.yaw + angle::delta_degrees(avatar.yaw, self.snapshot.yaw);
        let pitch = avatar.pitch;
        let pos = avatar.position;

        let position_changed = self.snapshot.x != pos.x
            || self.snapshot.y != pos.y
            || self.snapshot.z != pos.z
            || self.snapshot.ticker <= 0;
        let look_changed = self.snapshot.yaw != yaw || self.snapshot.pitch != pitch;

        if position_changed && look_changed {
            out.push(self.record_position_and_look(pos, yaw, pitch, avatar.on_ground));
            self.snapshot.ticker = self.features.resend_interval_ticks;
        } else if position_changed {
            out.push(self.record_position(pos, avatar.on_ground));
            self.snapshot.ticker = self.features.resend_interval_ticks;
        } else if look_changed {
            out.push(self.record_look(yaw, pitch, avatar.on_ground));
        } else if self.features.position_update_every_tick
            || avatar.on_ground != self.snapshot.on_ground
        {
            trace!("emitting ground-state heartbeat");
            out.push(Outbound::GroundState {
                on_ground: avatar.on_ground,
            });
        }

        if !position_changed {
            self.snapshot.ticker -= 1;
        }

        // on_ground always tracks the latest tick
        self.snapshot.on_ground = avatar.on_ground;

        out
    }

    /// Apply an authoritative correction: flag-gated relative/absolute per
    /// axis and per angle, velocity zeroed on absolute axes, then an
    /// unconditional combined position+look echo (exempt from de-dup).
    pub fn apply_correction(
        &mut self,
        avatar: &mut AvatarState,
        delta: Vec3,
        yaw: f32,
        pitch: f32,
        flags: CorrectionFlags,
        correlation_id: i32,
    ) -> Vec<Outbound> {
        let mut out = Vec::new();
        let pos = avatar.position;
        let vel = avatar.velocity;

        avatar.position = Vec3 {
            x: if flags.x { pos.x } else { 0.0 } + delta.x,
            y: if flags.y { pos.y } else { 0.0 } + delta.y,
            z: if flags.z { pos.z } else { 0.0 } + delta.z,
        };

        // an absolute axis asserts ground truth; local prediction on that
        // axis is invalidated
        avatar.velocity = Vec3 {
            x: if flags.x { vel.x } else { 0.0 },
            y: if flags.y { vel.y } else { 0.0 },
            z: if flags.z { vel.z } else { 0.0 },
        };

        let new_yaw = if flags.yaw { avatar.yaw } else { 0.0 } + yaw;
        let new_pitch = if flags.pitch { avatar.pitch } else { 0.0 } + pitch;
        avatar.set_angles(new_yaw, new_pitch, true);

        if self.features.correction_ack {
            out.push(Outbound::CorrectionAck { correlation_id });
        }

        // on_ground is always reported false in the echo
        out.push(self.record_position_and_look(avatar.position, new_yaw, new_pitch, false));

        debug!(
            correlation_id,
            x = avatar.position.x,
            y = avatar.position.y,
            z = avatar.position.z,
            "applied authoritative correction"
        );
        out
    }

    fn record_position(&mut self, pos: Vec3, on_ground: bool) -> Outbound {
        self.snapshot.x = pos.x;
        self.snapshot.y = pos.y;
        self.snapshot.z = pos.z;
        self.snapshot.on_ground = on_ground;
        Outbound::Position {
            x: pos.x,
            y: pos.y,
            z: pos.z,
            on_ground,
        }
    }

    fn record_look(&mut self, yaw: f32, pitch: f32, on_ground: bool) -> Outbound {
        self.snapshot.yaw = yaw;
        self.snapshot.pitch = pitch;
        self.snapshot.on_ground = on_ground;
        Outbound::Look {
            yaw,
            pitch,
            on_ground,
        }
    }

    fn record_position_and_look(
        &mut self,
        pos: Vec3,
        yaw: f32,
        pitch: f32,
        on_ground: bool,
    ) -> Outbound {
        self.snapshot.x = pos.x;
        self.snapshot.y = pos.y;
        self.snapshot.z = pos.z;
        self.snapshot.yaw = yaw;
        self.snapshot.pitch = pitch;
        self.snapshot.on_ground = on_ground;
        Outbound::PositionAndLook {
            x: pos.x,
            y: pos.y,
            z: pos.z,
            yaw,
            pitch,
            on_ground,
        }
    }
}
