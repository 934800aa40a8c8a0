//! Opaque physics-simulation collaborator interface
//!
//! The controller treats the actual integration step as an external pure
//! function: it hands over the current control intents, the avatar body and
//! the last pose acknowledged by the remote peer, and applies whatever body
//! delta comes back. Everything about gravity, collision and drag lives on
//! the other side of this trait.

use crate::controller::avatar::{AvatarState, Vec3};
use crate::net::protocol::InputFlags;
use crate::world::WorldView;

/// Pose baseline the remote peer last saw, handed to the simulation so it
/// can reason about server-visible movement.
#[derive(Debug, Clone, Copy, Default)]
pub struct SentPose {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f32,
    pub pitch: f32,
    pub on_ground: bool,
}

/// Input to a single simulation step.
#[derive(Debug, Clone)]
pub struct SimInput {
    pub controls: InputFlags,
    /// One-shot jump request raised since the previous step.
    pub jump_requested: bool,
    pub avatar: AvatarState,
    pub last_sent: SentPose,
}

/// Body delta returned by a simulation step.
#[derive(Debug, Clone, Copy)]
pub struct AvatarDelta {
    pub position: Vec3,
    pub velocity: Vec3,
    pub on_ground: bool,
}

/// Maximum orientation change per tick, in degrees.
#[derive(Debug, Clone, Copy)]
pub struct TurnSpeeds {
    pub yaw_per_tick: f32,
    pub pitch_per_tick: f32,
}

impl Default for TurnSpeeds {
    fn default() -> Self {
        Self {
            yaw_per_tick: 3.0,
            pitch_per_tick: 3.0,
        }
    }
}

/// External simulation step. Pure given the world geometry; the only effect
/// is the returned delta.
pub trait Simulator: Send + Sync {
    fn simulate(&self, input: &SimInput, world: &dyn WorldView) -> AvatarDelta;

    /// Turn-rate bound used by the look-convergence task.
    fn turn_speeds(&self) -> TurnSpeeds {
        TurnSpeeds::default()
    }
}
