//! Protocol message definitions
//! These are the wire types exchanged with the remote peer

use serde::{Deserialize, Serialize};

/// Extended input vector: every control intent as transmitted on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputFlags {
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
    pub jump: bool,
    pub sneak: bool,
    pub sprint: bool,
}

/// Entity action transitions (sprint/sneak/glide toggles).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityAction {
    SneakStart,
    SneakStop,
    SprintStart,
    SprintStop,
    GlideStart,
}

impl EntityAction {
    /// Numeric action id used by binary protocol encodings.
    pub fn action_id(self) -> u8 {
        match self {
            Self::SneakStart => 0,
            Self::SneakStop => 1,
            Self::SprintStart => 3,
            Self::SprintStop => 4,
            Self::GlideStart => 8,
        }
    }
}

/// Messages sent from the controller to the remote peer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outbound {
    /// Position update without orientation change
    Position {
        x: f64,
        y: f64,
        z: f64,
        on_ground: bool,
    },

    /// Orientation update without position change
    Look {
        yaw: f32,
        pitch: f32,
        on_ground: bool,
    },

    /// Combined position and orientation update
    PositionAndLook {
        x: f64,
        y: f64,
        z: f64,
        yaw: f32,
        pitch: f32,
        on_ground: bool,
    },

    /// Sprint/sneak/glide state transition
    EntityAction { action: EntityAction },

    /// Extended input vector (protocol-version gated)
    InputState { flags: InputFlags },

    /// Minimal ground-state heartbeat when nothing else changed
    GroundState { on_ground: bool },

    /// Acknowledges an authoritative correction by echoing its id
    CorrectionAck { correlation_id: i32 },
}

/// Canonical per-axis/angle relative flags of an authoritative correction.
/// `true` means the delivered value is relative to current state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionFlags {
    pub x: bool,
    pub y: bool,
    pub z: bool,
    pub yaw: bool,
    pub pitch: bool,
}

/// Correction flags as they appear on the wire. Older protocol versions pack
/// them into a bitmask, newer ones spell out named fields; both normalize to
/// [`CorrectionFlags`] before entering the reconciliation engine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawCorrectionFlags {
    Bitmask(u8),
    Fields(CorrectionFlags),
}

impl RawCorrectionFlags {
    pub fn normalize(self) -> CorrectionFlags {
        match self {
            Self::Bitmask(bits) => CorrectionFlags {
                x: bits & 0x01 != 0,
                y: bits & 0x02 != 0,
                z: bits & 0x04 != 0,
                yaw: bits & 0x08 != 0,
                pitch: bits & 0x10 != 0,
            },
            Self::Fields(flags) => flags,
        }
    }
}

/// Messages received from the remote peer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Inbound {
    /// Authoritative position/orientation correction
    PositionCorrection {
        x: f64,
        y: f64,
        z: f64,
        yaw: f32,
        pitch: f32,
        flags: RawCorrectionFlags,
        correlation_id: i32,
    },

    /// Velocity impulse from an explosion or similar
    Knockback { x: f64, y: f64, z: f64 },

    /// Server-driven orientation change
    Rotation { yaw: f32, pitch: f32 },

    /// Hotbar slot selected by the server
    HeldItemSlot { slot: u8 },

    /// Session established
    Login,

    /// Avatar respawned
    Respawn,

    /// Session torn down; stops the tick scheduler
    SessionEnd,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correction_flags_normalize_identically() {
        let from_bits = RawCorrectionFlags::Bitmask(0b00110).normalize();
        let from_fields = RawCorrectionFlags::Fields(CorrectionFlags {
            x: false,
            y: true,
            z: true,
            yaw: false,
            pitch: false,
        })
        .normalize();
        assert_eq!(from_bits, from_fields);
    }

    #[test]
    fn correction_parses_both_flag_shapes() {
        let legacy: Inbound = serde_json::from_str(
            r#"{"type":"position_correction","x":1.0,"y":64.0,"z":1.0,
                "yaw":0.0,"pitch":0.0,"flags":24,"correlation_id":7}"#,
        )
        .unwrap();
        let modern: Inbound = serde_json::from_str(
            r#"{"type":"position_correction","x":1.0,"y":64.0,"z":1.0,
                "yaw":0.0,"pitch":0.0,
                "flags":{"x":false,"y":false,"z":false,"yaw":true,"pitch":true},
                "correlation_id":7}"#,
        )
        .unwrap();

        let flags_of = |msg: Inbound| match msg {
            Inbound::PositionCorrection { flags, .. } => flags.normalize(),
            other => panic!("unexpected message: {other:?}"),
        };
        assert_eq!(flags_of(legacy), flags_of(modern));
    }

    #[test]
    fn outbound_uses_tagged_snake_case() {
        let msg = Outbound::PositionAndLook {
            x: 0.5,
            y: 64.0,
            z: -0.5,
            yaw: 90.0,
            pitch: 0.0,
            on_ground: false,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"position_and_look""#));
    }
}
