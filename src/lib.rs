//! Avatar Controller - client-side movement and state-synchronization core
//!
//! This crate advances a local avatar physics simulation on a fixed tick,
//! reconciles it against authoritative corrections from a remote peer, and
//! emits only the minimal set of state-change messages needed to keep the
//! peer's view consistent. It handles:
//! - Fixed-timestep tick scheduling with a bounded catch-up policy
//! - Outbound position/orientation/action diffing with heartbeat semantics
//! - Authoritative corrections with per-axis relative/absolute flags
//! - Cancellable look-convergence toward a target orientation
//!
//! The physics integration itself, world data, and transport are external
//! collaborators reached through the [`sim::Simulator`] and
//! [`world::WorldView`] traits and the [`net::protocol`] message types.

pub mod config;
pub mod controller;
pub mod net;
pub mod sim;
pub mod util;
pub mod world;

pub use config::{ControllerConfig, ProtocolFeatures};
pub use controller::avatar::{AvatarState, Vec3};
pub use controller::control::{ControlError, ControlIntent, ControlState};
pub use controller::look::{LookResult, CONVERGENCE_EPSILON};
pub use controller::physics::GlideError;
pub use controller::reconcile::DEAD_TICK_LIMIT;
pub use controller::{Command, Controller, ControllerClosed, ControllerHandle};
pub use net::protocol::{
    CorrectionFlags, EntityAction, Inbound, InputFlags, Outbound, RawCorrectionFlags,
};
pub use sim::{AvatarDelta, SentPose, SimInput, Simulator, TurnSpeeds};
pub use world::{Block, WorldView};
