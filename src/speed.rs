// speed.rs — 自动旋转速度解析 ("2rpm", "10 degrees per second", ...)

use crate::error::{Result, ViewerError};
use once_cell::sync::Lazy;
use regex::Regex;
use std::f64::consts::TAU;
use std::str::FromStr;

static SPEED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([+-]?(?:\d+(?:\.\d*)?|\.\d+))\s*(.*?)\s*$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq)]
enum AngleUnit {
    Revolutions,
    Degrees,
    Radians,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum TimeUnit {
    Second,
    Minute,
}

fn lookup_unit(unit: &str) -> Option<(AngleUnit, TimeUnit)> {
    use AngleUnit::*;
    use TimeUnit::*;

    // 缩写
    match unit {
        "rpm" => return Some((Revolutions, Minute)),
        "rps" => return Some((Revolutions, Second)),
        "dpm" => return Some((Degrees, Minute)),
        "dps" => return Some((Degrees, Second)),
        _ => {}
    }

    let (angle, time) = unit.split_once(" per ")?;
    let angle = match angle {
        "rev" | "revolution" | "revolutions" => Revolutions,
        "deg" | "degree" | "degrees" => Degrees,
        "rad" | "radian" | "radians" => Radians,
        _ => return None,
    };
    let time = match time {
        "second" | "sec" | "s" => Second,
        "minute" | "min" => Minute,
        _ => return None,
    };
    Some((angle, time))
}

/// Angular speed in radians per second. The sign gives the direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationSpeed(pub f64);

impl AnimationSpeed {
    /// Parses strings such as `"2rpm"`, `"-10dps"` or `"0.5 radians per minute"`.
    /// A bare number is read as revolutions per minute.
    pub fn parse(input: &str) -> Result<Self> {
        let caps = SPEED_RE
            .captures(input)
            .ok_or_else(|| ViewerError::config(format!("invalid animation speed {input:?}")))?;

        let value: f64 = caps[1]
            .parse()
            .map_err(|_| ViewerError::config(format!("invalid animation speed {input:?}")))?;

        let unit = caps[2].to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ");
        let (angle, time) = if unit.is_empty() {
            (AngleUnit::Revolutions, TimeUnit::Minute)
        } else {
            lookup_unit(&unit).ok_or_else(|| {
                ViewerError::config(format!("unknown animation speed unit {unit:?}"))
            })?
        };

        let per_second = match time {
            TimeUnit::Second => value,
            TimeUnit::Minute => value / 60.0,
        };

        let rad_per_second = match angle {
            AngleUnit::Revolutions => per_second * TAU,
            AngleUnit::Degrees => per_second.to_radians(),
            AngleUnit::Radians => per_second,
        };

        Ok(Self(rad_per_second))
    }

    pub fn radians_per_second(self) -> f64 {
        self.0
    }

    /// 每帧递增角度 (rad)
    pub fn per_tick(self, fps: u32) -> f64 {
        self.0 / f64::from(fps.max(1))
    }
}

impl Default for AnimationSpeed {
    fn default() -> Self {
        Self(2.0 * TAU / 60.0)
    }
}

impl FromStr for AnimationSpeed {
    type Err = ViewerError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
