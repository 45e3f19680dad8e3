// camera.rs — 相机状态：经纬度、缩放等级、视场角、视口尺寸

use crate::angle::clamp_latitude;
use crate::config::ViewerConfig;
use crate::render::FrameParams;

pub const MAX_ZOOM_LEVEL: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewerSize {
    pub width: u32,
    pub height: u32,
    pub ratio: f64,
}

impl ViewerSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height, ratio: f64::from(width) / f64::from(height.max(1)) }
    }
}

/// Orientation, zoom and viewport of the single panorama camera.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraState {
    theta: f64,
    phi: f64,
    zoom_level: u8,
    fov: f64,
    min_fov: f64,
    max_fov: f64,
    size: ViewerSize,
}

impl CameraState {
    /// `min_fov` and `max_fov` are expected to be validated already.
    pub fn new(min_fov: f64, max_fov: f64) -> Self {
        Self {
            theta: 0.0,
            phi: 0.0,
            zoom_level: 0,
            fov: max_fov,
            min_fov,
            max_fov,
            size: ViewerSize::new(1, 1),
        }
    }

    pub fn from_config(config: &ViewerConfig) -> Self {
        let mut camera = Self::new(config.min_fov, config.max_fov);
        camera.rotate(config.default_long, config.default_lat);
        camera.zoom(f64::from(config.zoom_level));
        camera
    }

    pub fn theta(&self) -> f64 {
        self.theta
    }

    pub fn phi(&self) -> f64 {
        self.phi
    }

    pub fn zoom_level(&self) -> u8 {
        self.zoom_level
    }

    pub fn fov(&self) -> f64 {
        self.fov
    }

    pub fn size(&self) -> ViewerSize {
        self.size
    }

    /// Linear zoom → fov mapping: level 0 is `max_fov`, level 100 is `min_fov`.
    pub fn fov_for_level(&self, level: u8) -> f64 {
        self.max_fov + (f64::from(level) / 100.0) * (self.min_fov - self.max_fov)
    }

    /// 直接设置 theta（不取模），phi 限制在 [-π/2, π/2]
    pub fn rotate(&mut self, theta: f64, phi: f64) {
        if theta.is_finite() {
            self.theta = theta;
        }
        if phi.is_finite() {
            self.phi = clamp_latitude(phi);
        }
    }

    /// Applies a pointer delta in pixels.
    pub fn drag(&mut self, dx: f64, dy: f64, long_offset: f64, lat_offset: f64) {
        self.rotate(self.theta + dx * long_offset, self.phi + dy * lat_offset);
    }

    /// Rounds and clamps `level` to `[0, 100]`, then recomputes the fov.
    pub fn zoom(&mut self, level: f64) -> u8 {
        let level = if level.is_nan() { 0.0 } else { level.round() };
        self.zoom_level = level.clamp(0.0, f64::from(MAX_ZOOM_LEVEL)) as u8;
        self.fov = self.fov_for_level(self.zoom_level);
        self.zoom_level
    }

    /// `false` when already fully zoomed in.
    pub fn zoom_in(&mut self) -> bool {
        if self.zoom_level >= MAX_ZOOM_LEVEL {
            return false;
        }
        self.zoom(f64::from(self.zoom_level) + 1.0);
        true
    }

    pub fn zoom_out(&mut self) -> bool {
        if self.zoom_level == 0 {
            return false;
        }
        self.zoom(f64::from(self.zoom_level) - 1.0);
        true
    }

    /// Updates only the given dimensions. Returns whether anything changed.
    pub fn resize(&mut self, width: Option<u32>, height: Option<u32>) -> bool {
        let next = ViewerSize::new(
            width.unwrap_or(self.size.width),
            height.unwrap_or(self.size.height),
        );
        if next == self.size {
            return false;
        }
        self.size = next;
        true
    }

    pub fn frame(&self) -> FrameParams {
        FrameParams {
            theta: self.theta,
            phi: self.phi,
            fov_deg: self.fov,
            ratio: self.size.ratio,
        }
    }
}

/// Wheel delta → zoom step. Positive deltas zoom in.
pub fn wheel_step(delta: f64) -> Option<i32> {
    if delta > 0.0 {
        Some(1)
    } else if delta < 0.0 {
        Some(-1)
    } else {
        None
    }
}
