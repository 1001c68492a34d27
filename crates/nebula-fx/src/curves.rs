//! Simple value-over-lifetime interpolation (start → end linear)

/// Linear interpolation between two floats
pub fn lerp_f32(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Normalized progress `age / lifetime` clamped to [0, 1]
pub fn progress(age: f32, lifetime: f32) -> f32 {
    if lifetime <= 0.0 {
        1.0
    } else {
        (age / lifetime).clamp(0.0, 1.0)
    }
}
