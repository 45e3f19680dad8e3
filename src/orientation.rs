// orientation.rs — 设备方向传感器 → 视角 (经度/纬度)
//
// 传感器给出的是设备坐标系下的 alpha/beta/gamma（度），需要根据屏幕方向
// 以及不同浏览器引擎的符号约定换算为统一的经纬度。

use crate::angle::{clamp, deg_to_rad, principal_angle, signed_angle};
use crate::error::{Result, ViewerError};

/// Current screen orientation as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenOrientation {
    PortraitPrimary,
    PortraitSecondary,
    LandscapePrimary,
    LandscapeSecondary,
}

impl ScreenOrientation {
    /// From a screen rotation angle in degrees (0, 90, 180, 270/-90).
    pub fn from_angle(angle_deg: i32) -> Self {
        match angle_deg.rem_euclid(360) {
            90 => Self::LandscapePrimary,
            180 => Self::PortraitSecondary,
            270 => Self::LandscapeSecondary,
            _ => Self::PortraitPrimary,
        }
    }

    /// 桌面端没有屏幕方向 API，按视口形状推断
    pub fn from_viewport(width: u32, height: u32) -> Self {
        if height > width {
            Self::PortraitPrimary
        } else {
            Self::LandscapePrimary
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "portrait-primary" => Some(Self::PortraitPrimary),
            "portrait-secondary" => Some(Self::PortraitSecondary),
            "landscape-primary" => Some(Self::LandscapePrimary),
            "landscape-secondary" => Some(Self::LandscapeSecondary),
            _ => None,
        }
    }
}

/// Rendering-engine families whose sensor conventions differ in landscape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineFamily {
    Gecko,
    WebKit,
    Trident,
}

impl EngineFamily {
    /// Classifies a platform identification string (user agent).
    /// Anything unrecognised is treated as WebKit.
    pub fn detect(platform_id: &str) -> Self {
        if ["Trident/", "MSIE ", "Edge/"].iter().any(|m| platform_id.contains(m)) {
            Self::Trident
        } else if platform_id.contains("Gecko/") && !platform_id.contains("like Gecko") {
            Self::Gecko
        } else {
            Self::WebKit
        }
    }
}

/// One-time platform classification used to pick correction branches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    pub engine: EngineFamily,
    /// 是否存在旧式 window.orientation 属性
    pub legacy_orientation: bool,
}

impl Platform {
    pub fn detect(platform_id: &str, legacy_orientation: bool) -> Self {
        Self { engine: EngineFamily::detect(platform_id), legacy_orientation }
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self { engine: EngineFamily::WebKit, legacy_orientation: false }
    }
}

/// Sensor event as delivered; any component may be missing.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RawOrientation {
    pub alpha: Option<f64>,
    pub beta: Option<f64>,
    pub gamma: Option<f64>,
}

/// A complete sensor reading in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientationSample {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}

impl RawOrientation {
    pub fn sample(&self) -> Option<OrientationSample> {
        Some(OrientationSample { alpha: self.alpha?, beta: self.beta?, gamma: self.gamma? })
    }
}

impl From<OrientationSample> for RawOrientation {
    fn from(s: OrientationSample) -> Self {
        Self { alpha: Some(s.alpha), beta: Some(s.beta), gamma: Some(s.gamma) }
    }
}

/// Viewing direction derived from the sensors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewingAngles {
    /// [0, 360)
    pub longitude_deg: f64,
    /// [-90, 90]
    pub latitude_deg: f64,
    /// [0, 2π)
    pub longitude: f64,
    /// [-π/2, π/2]
    pub latitude: f64,
}

impl ViewingAngles {
    fn from_degrees(theta: f64, phi: f64) -> Self {
        Self {
            longitude_deg: theta,
            latitude_deg: phi,
            longitude: deg_to_rad(theta),
            latitude: deg_to_rad(phi),
        }
    }
}

/// Maps a sensor reading to longitude/latitude for the given screen
/// orientation. The landscape corrections reproduce observed engine behaviour.
pub fn compute_angles(
    sample: &OrientationSample,
    screen: ScreenOrientation,
    platform: &Platform,
) -> ViewingAngles {
    let OrientationSample { alpha, beta, gamma } = *sample;

    let (mut theta, mut phi) = match screen {
        ScreenOrientation::PortraitPrimary => (alpha + gamma, beta - 90.0),
        ScreenOrientation::LandscapePrimary => (alpha + beta - 90.0, -gamma - 90.0),
        ScreenOrientation::LandscapeSecondary => (alpha - beta + 90.0, gamma - 90.0),
        ScreenOrientation::PortraitSecondary => (alpha - gamma, 270.0 - beta),
    };

    let landscape = matches!(
        screen,
        ScreenOrientation::LandscapePrimary | ScreenOrientation::LandscapeSecondary
    );

    if landscape {
        if beta.abs() > 90.0 {
            match platform.engine {
                EngineFamily::Gecko => phi += 180.0,
                EngineFamily::WebKit | EngineFamily::Trident => phi = -phi,
            }
        }

        if platform.legacy_orientation {
            if phi < 0.0 {
                phi = -(phi + 180.0);
            }
            theta = (theta + 180.0) % 360.0;
        }
    }

    let phi = clamp(signed_angle(phi), -90.0, 90.0);
    let theta = principal_angle(theta);

    ViewingAngles::from_degrees(theta, phi)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Support {
    Unknown,
    Supported,
    Unsupported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    Stopped,
    Tracking,
}

type Listener = Box<dyn FnMut(&ViewingAngles)>;

/// Stopped ⇄ Tracking state machine around [`compute_angles`].
pub struct OrientationTracker {
    platform: Platform,
    support: Support,
    state: TrackerState,
    last: Option<ViewingAngles>,
    listeners: Vec<Listener>,
}

impl OrientationTracker {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            support: Support::Unknown,
            state: TrackerState::Stopped,
            last: None,
            listeners: Vec::new(),
        }
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    pub fn support(&self) -> Support {
        self.support
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    pub fn is_tracking(&self) -> bool {
        self.state == TrackerState::Tracking
    }

    pub fn last_angles(&self) -> Option<&ViewingAngles> {
        self.last.as_ref()
    }

    /// Resolves the capability flag from the first sensor event (or its
    /// absence). Only the first call has an effect.
    pub fn probe(&mut self, first: Option<&RawOrientation>) -> Support {
        if self.support == Support::Unknown {
            self.support = match first.and_then(RawOrientation::sample) {
                Some(_) => Support::Supported,
                None => Support::Unsupported,
            };
            log::info!("device orientation support: {:?}", self.support);
        }
        self.support
    }

    pub fn add_listener(&mut self, listener: impl FnMut(&ViewingAngles) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn start(&mut self) -> Result<()> {
        if self.support != Support::Supported {
            return Err(ViewerError::UnsupportedCapability("device orientation"));
        }
        self.state = TrackerState::Tracking;
        Ok(())
    }

    pub fn stop(&mut self) {
        self.state = TrackerState::Stopped;
    }

    /// Returns whether tracking is active afterwards.
    pub fn toggle(&mut self) -> Result<bool> {
        match self.state {
            TrackerState::Tracking => {
                self.stop();
                Ok(false)
            }
            TrackerState::Stopped => self.start().map(|_| true),
        }
    }

    /// Feeds one sensor event. Ignored while stopped or if incomplete.
    pub fn update(
        &mut self,
        raw: &RawOrientation,
        screen: ScreenOrientation,
    ) -> Option<ViewingAngles> {
        if self.state != TrackerState::Tracking {
            return None;
        }
        let sample = raw.sample()?;
        let angles = compute_angles(&sample, screen, &self.platform);
        self.last = Some(angles);
        for listener in &mut self.listeners {
            listener(&angles);
        }
        Some(angles)
    }
}
