//! Controller configuration and protocol feature flags

use std::time::Duration;

use crate::util::time::{DEFAULT_CATCHUP_TICKS, TICK_INTERVAL};

/// Controller configuration
#[derive(Clone, Debug)]
pub struct ControllerConfig {
    /// Fixed simulation timestep
    pub tick_interval: Duration,
    /// Maximum ticks executed in one scheduling pass after a stall
    pub catchup_limit: u32,
    /// Whether local physics prediction runs at all
    pub physics_enabled: bool,
    /// Protocol-version dependent behavior switches
    pub features: ProtocolFeatures,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            tick_interval: TICK_INTERVAL,
            catchup_limit: DEFAULT_CATCHUP_TICKS,
            physics_enabled: true,
            features: ProtocolFeatures::default(),
        }
    }
}

/// Behavior switches that vary by remote protocol version
#[derive(Debug, Clone, Copy)]
pub struct ProtocolFeatures {
    /// Legacy peers require a position-bearing message every tick for
    /// health reconciliation, even without movement
    pub position_update_every_tick: bool,
    /// Newer peers expect the extended input vector whenever it changes
    pub input_state_messages: bool,
    /// Corrections carry a correlation id that must be echoed back
    pub correction_ack: bool,
    /// Quiet ticks between forced position resends
    pub resend_interval_ticks: i32,
}

impl Default for ProtocolFeatures {
    fn default() -> Self {
        Self {
            position_update_every_tick: false,
            input_state_messages: false,
            correction_ack: true,
            resend_interval_ticks: 20,
        }
    }
}

impl ProtocolFeatures {
    /// Feature profile for a named remote protocol version.
    pub fn for_version(version: &str) -> Self {
        match version {
            "1.8" => Self {
                position_update_every_tick: true,
                input_state_messages: false,
                correction_ack: false,
                resend_interval_ticks: 20,
            },
            "1.9" | "1.10" | "1.11" => Self {
                position_update_every_tick: true,
                ..Self::default()
            },
            "1.21.5" => Self {
                input_state_messages: true,
                resend_interval_ticks: 19,
                ..Self::default()
            },
            _ => Self::default(),
        }
    }
}
