// angle.rs — 角度换算与归一化工具

use std::f64::consts::{FRAC_PI_2, TAU};

/// Reduces an angle in degrees to `[0, 360)`.
pub fn principal_angle(angle_deg: f64) -> f64 {
    let reduced = angle_deg - (angle_deg / 360.0).floor() * 360.0;
    // 浮点误差可能让 -1e-15 变成 360.0
    if reduced >= 360.0 {
        0.0
    } else {
        reduced
    }
}

/// Reduces an angle in radians to `[0, 2π)`.
pub fn wrap_radians(angle: f64) -> f64 {
    let reduced = angle - (angle / TAU).floor() * TAU;
    if reduced >= TAU {
        0.0
    } else {
        reduced
    }
}

/// Maps a principal angle in degrees onto `[-180, 180)`.
pub fn signed_angle(angle_deg: f64) -> f64 {
    let p = principal_angle(angle_deg);
    if p >= 180.0 {
        p - 360.0
    } else {
        p
    }
}

pub fn clamp(x: f64, lo: f64, hi: f64) -> f64 {
    x.max(lo).min(hi)
}

/// 纬度限制在 [-π/2, π/2]
pub fn clamp_latitude(phi: f64) -> f64 {
    clamp(phi, -FRAC_PI_2, FRAC_PI_2)
}

pub fn deg_to_rad(deg: f64) -> f64 {
    deg.to_radians()
}

pub fn rad_to_deg(rad: f64) -> f64 {
    rad.to_degrees()
}
