//! Angle math in the remote peer's angular unit (degrees)

/// Mouse sensitivity the vanilla client is assumed to run at (0.0..1.0).
const MOUSE_SENSITIVITY: f32 = 0.5;

/// Smoothing factor derived from the sensitivity slider.
const SENSITIVITY_FACTOR: f32 = MOUSE_SENSITIVITY * 0.6 + 0.2;

/// Smallest orientation change the reference client can express.
///
/// The client accumulates mouse movement in multiples of this step, so
/// matching it keeps locally predicted angles bit-identical to what the
/// remote peer computes from our look messages.
pub const LOOK_STEP: f32 =
    0.15 * (SENSITIVITY_FACTOR * SENSITIVITY_FACTOR * SENSITIVITY_FACTOR * 8.0);

/// Wrap an angle to the (-180, 180] range.
pub fn wrap_degrees(deg: f32) -> f32 {
    let mut d = deg % 360.0;
    if d < -180.0 {
        d += 360.0;
    } else if d > 180.0 {
        d -= 360.0;
    }
    d
}

/// Shortest signed angular difference `a - b`, accounting for wraparound.
pub fn delta_degrees(a: f32, b: f32) -> f32 {
    wrap_degrees(a - b)
}

/// Round an angular delta to the nearest expressible look step.
pub fn quantize_degrees(delta: f32) -> f32 {
    (delta / LOOK_STEP).round() * LOOK_STEP
}
