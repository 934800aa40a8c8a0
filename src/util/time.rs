//! Tick rate configuration for the fixed-timestep simulation

use std::time::Duration;

/// Fixed simulation timestep in milliseconds.
pub const TICK_INTERVAL_MS: u64 = 50;

/// Fixed simulation timestep.
pub const TICK_INTERVAL: Duration = Duration::from_millis(TICK_INTERVAL_MS);

/// Maximum number of ticks executed in one scheduling pass after a stall.
pub const DEFAULT_CATCHUP_TICKS: u32 = 4;

/// Simulation timestep in seconds, for physics integration.
pub fn tick_delta() -> f32 {
    TICK_INTERVAL_MS as f32 / 1000.0
}
