//! Physics adapter: bridges control state and the opaque simulation step

use std::sync::Arc;

use crate::sim::{SentPose, SimInput, Simulator, TurnSpeeds};
use crate::world::WorldView;

use super::avatar::AvatarState;
use super::control::ControlState;

/// Invokes the external simulation and applies the resulting body delta.
pub struct PhysicsAdapter {
    simulator: Arc<dyn Simulator>,
}

impl PhysicsAdapter {
    pub fn new(simulator: Arc<dyn Simulator>) -> Self {
        Self { simulator }
    }

    pub fn turn_speeds(&self) -> TurnSpeeds {
        self.simulator.turn_speeds()
    }

    /// Run one simulation step and fold the delta into the avatar body.
    /// Consumes the one-shot jump request.
    pub fn step(
        &self,
        avatar: &mut AvatarState,
        controls: &mut ControlState,
        last_sent: SentPose,
        world: &dyn WorldView,
    ) {
        let input = SimInput {
            controls: controls.flags(),
            jump_requested: controls.take_jump_request(),
            avatar: avatar.clone(),
            last_sent,
        };
        let delta = self.simulator.simulate(&input, world);
        avatar.position = delta.position;
        avatar.velocity = delta.velocity;
        avatar.on_ground = delta.on_ground;
    }
}

/// Check whether a glide (elytra-style flight) can start right now.
pub fn check_glide_preconditions(avatar: &AvatarState) -> Result<(), GlideError> {
    if avatar.gliding {
        Err(GlideError::AlreadyGliding)
    } else if avatar.on_ground {
        Err(GlideError::OnGround)
    } else if avatar.in_water {
        Err(GlideError::InWater)
    } else if avatar.levitation > 0 {
        Err(GlideError::Levitating)
    } else if !avatar.glider_equipped {
        Err(GlideError::NoGlider)
    } else {
        Ok(())
    }
}

/// Glide-start precondition failures
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GlideError {
    #[error("already gliding")]
    AlreadyGliding,

    #[error("unable to start gliding from the ground")]
    OnGround,

    #[error("unable to start gliding while in water")]
    InWater,

    #[error("unable to start gliding with a levitation effect")]
    Levitating,

    #[error("a glider must be equipped to start gliding")]
    NoGlider,
}
