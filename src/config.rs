// config.rs — 配置项表：默认值、校验、JSON 加载

use crate::angle::{clamp, clamp_latitude, wrap_radians};
use crate::error::{Result, ViewerError};
use crate::speed::AnimationSpeed;
use serde::Deserialize;
use std::f64::consts::PI;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_MIN_FOV: f64 = 30.0;
pub const DEFAULT_MAX_FOV: f64 = 90.0;
pub const DEFAULT_TIME_ANIM_MS: u64 = 2000;
pub const DEFAULT_ANIM_SPEED: &str = "2rpm";
pub const DEFAULT_FPS: u32 = 60;
pub const DEFAULT_MAX_TEXTURE_WIDTH: u32 = 4096;
pub const MAX_FPS: u32 = 240;

/// `time_anim` accepts either a delay in milliseconds or `false`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TimeAnim {
    Enabled(bool),
    Millis(u64),
}

/// Raw option table as written by the user. Every field is optional;
/// [`ViewerOptions::validate`] fills in defaults and clamps.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ViewerOptions {
    pub min_fov: Option<f64>,
    pub max_fov: Option<f64>,
    pub long_offset: Option<f64>,
    pub lat_offset: Option<f64>,
    pub time_anim: Option<TimeAnim>,
    pub anim_speed: Option<String>,
    pub fps: Option<u32>,
    pub default_long: Option<f64>,
    pub default_lat: Option<f64>,
    pub zoom_level: Option<f64>,
    pub max_texture_width: Option<u32>,
    pub usexmpdata: Option<bool>,
    pub mousewheel: Option<bool>,
    pub mousemove: Option<bool>,
    pub navbar: Option<bool>,
}

/// Validated configuration consumed by the controller.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    /// 最小视场角（度），对应 zoom 100
    pub min_fov: f64,
    /// 最大视场角（度），对应 zoom 0
    pub max_fov: f64,
    /// 每像素水平旋转 (rad)
    pub long_offset: f64,
    /// 每像素垂直旋转 (rad)
    pub lat_offset: f64,
    /// None = 不自动旋转
    pub time_anim: Option<Duration>,
    pub anim_speed: AnimationSpeed,
    pub fps: u32,
    pub default_long: f64,
    pub default_lat: f64,
    pub zoom_level: u8,
    pub max_texture_width: u32,
    pub use_xmp_data: bool,
    pub mousewheel: bool,
    pub mousemove: bool,
    pub navbar: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            min_fov: DEFAULT_MIN_FOV,
            max_fov: DEFAULT_MAX_FOV,
            long_offset: PI / 360.0,
            lat_offset: PI / 180.0,
            time_anim: Some(Duration::from_millis(DEFAULT_TIME_ANIM_MS)),
            anim_speed: AnimationSpeed::default(),
            fps: DEFAULT_FPS,
            default_long: 0.0,
            default_lat: 0.0,
            zoom_level: 0,
            max_texture_width: DEFAULT_MAX_TEXTURE_WIDTH,
            use_xmp_data: true,
            mousewheel: true,
            mousemove: true,
            navbar: true,
        }
    }
}

fn finite(name: &str, v: f64) -> Result<f64> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(ViewerError::config(format!("option `{name}` must be a finite number")))
    }
}

impl ViewerOptions {
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| ViewerError::config(e.to_string()))
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ViewerError::config(format!("cannot read config {}: {e}", path.display()))
        })?;
        Self::from_json_str(&text)
    }

    /// Fields set in `other` take precedence.
    pub fn merged_with(self, other: ViewerOptions) -> Self {
        Self {
            min_fov: other.min_fov.or(self.min_fov),
            max_fov: other.max_fov.or(self.max_fov),
            long_offset: other.long_offset.or(self.long_offset),
            lat_offset: other.lat_offset.or(self.lat_offset),
            time_anim: other.time_anim.or(self.time_anim),
            anim_speed: other.anim_speed.or(self.anim_speed),
            fps: other.fps.or(self.fps),
            default_long: other.default_long.or(self.default_long),
            default_lat: other.default_lat.or(self.default_lat),
            zoom_level: other.zoom_level.or(self.zoom_level),
            max_texture_width: other.max_texture_width.or(self.max_texture_width),
            usexmpdata: other.usexmpdata.or(self.usexmpdata),
            mousewheel: other.mousewheel.or(self.mousewheel),
            mousemove: other.mousemove.or(self.mousemove),
            navbar: other.navbar.or(self.navbar),
        }
    }

    pub fn validate(self) -> Result<ViewerConfig> {
        let d = ViewerConfig::default();

        let mut min_fov = clamp(finite("min_fov", self.min_fov.unwrap_or(d.min_fov))?, 1.0, 179.0);
        let mut max_fov = clamp(finite("max_fov", self.max_fov.unwrap_or(d.max_fov))?, 1.0, 179.0);
        if min_fov > max_fov {
            std::mem::swap(&mut min_fov, &mut max_fov);
        }

        let time_anim = match self.time_anim {
            None | Some(TimeAnim::Enabled(true)) => d.time_anim,
            Some(TimeAnim::Enabled(false)) => None,
            Some(TimeAnim::Millis(ms)) => Some(Duration::from_millis(ms)),
        };

        let anim_speed = match self.anim_speed {
            Some(s) => AnimationSpeed::parse(&s)?,
            None => d.anim_speed,
        };

        let zoom_level = finite("zoom_level", self.zoom_level.unwrap_or(0.0))?;

        Ok(ViewerConfig {
            min_fov,
            max_fov,
            long_offset: finite("long_offset", self.long_offset.unwrap_or(d.long_offset))?,
            lat_offset: finite("lat_offset", self.lat_offset.unwrap_or(d.lat_offset))?,
            time_anim,
            anim_speed,
            fps: self.fps.unwrap_or(d.fps).clamp(1, MAX_FPS),
            default_long: wrap_radians(finite("default_long", self.default_long.unwrap_or(0.0))?),
            default_lat: clamp_latitude(finite("default_lat", self.default_lat.unwrap_or(0.0))?),
            zoom_level: zoom_level.round().clamp(0.0, 100.0) as u8,
            max_texture_width: self.max_texture_width.unwrap_or(d.max_texture_width).max(1),
            use_xmp_data: self.usexmpdata.unwrap_or(d.use_xmp_data),
            mousewheel: self.mousewheel.unwrap_or(d.mousewheel),
            mousemove: self.mousemove.unwrap_or(d.mousemove),
            navbar: self.navbar.unwrap_or(d.navbar),
        })
    }
}
