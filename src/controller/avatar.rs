//! Avatar body state owned by the controller

use crate::util::angle;

/// Three-component vector for positions and velocities.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Authoritative-local avatar body state.
///
/// Orientation is stored in the remote peer's angular unit (degrees) so that
/// repeated conversion never accumulates error. Positions are double
/// precision to match the wire format; angles are single precision.
#[derive(Debug, Clone)]
pub struct AvatarState {
    pub position: Vec3,
    pub velocity: Vec3,
    /// Yaw in degrees, remote unit
    pub yaw: f32,
    /// Pitch in degrees, clamped to [-90, 90]
    pub pitch: f32,
    pub on_ground: bool,
    pub alive: bool,

    /// Eye offset above the feet, used for look-at targeting
    pub eye_height: f64,

    // Mirrored status used by glide preconditions
    pub gliding: bool,
    pub in_water: bool,
    pub levitation: u8,
    pub glider_equipped: bool,
}

impl Default for AvatarState {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            yaw: 0.0,
            pitch: 0.0,
            on_ground: false,
            alive: false,
            eye_height: 1.62,
            gliding: false,
            in_water: false,
            levitation: 0,
            glider_equipped: false,
        }
    }
}

impl AvatarState {
    /// Apply a new orientation. When `quantize` is set the change is rounded
    /// to the smallest step the reference client can express, so the value
    /// the remote peer reconstructs matches ours exactly.
    pub fn set_angles(&mut self, yaw: f32, pitch: f32, quantize: bool) {
        if quantize {
            self.yaw += angle::quantize_degrees(yaw - self.yaw);
            self.pitch += angle::quantize_degrees(pitch - self.pitch);
        } else {
            self.yaw = yaw;
            self.pitch = pitch;
        }
        self.pitch = self.pitch.clamp(-90.0, 90.0);
    }
}
