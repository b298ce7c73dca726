//! Persisted light settings and runtime configuration

use embassy_time::Duration;

use crate::acclimation::AcclimationSettings;
use crate::color::{Brightness, Color, CorrectionMethod, MAX_CHANNELS};
use crate::schedule::Schedule;
use crate::solar::GeoLocation;

const MODE_NAME_MANUAL: &str = "manual";
const MODE_NAME_SCHEDULED: &str = "scheduled";
const MODE_NAME_SUN: &str = "sun";

const MODE_ID_MANUAL: u8 = 0;
const MODE_ID_SCHEDULED: u8 = 1;
const MODE_ID_SUN: u8 = 2;

/// Westernmost timezone offset (UTC-12:00)
pub const TZ_OFFSET_MIN: i32 = -12 * 3600;

/// Easternmost timezone offset (UTC+14:00)
pub const TZ_OFFSET_MAX: i32 = 14 * 3600;

/// Brightness of every channel in the factory manual color
pub const DEFAULT_MANUAL_BRIGHTNESS: Brightness = 5;

/// Location reported when none has been configured (Kunming)
pub const DEFAULT_LOCATION: GeoLocation = GeoLocation {
    lat: 25.0430,
    lng: 102.7062,
};

/// Factory temporary override length, in minutes
pub const DEFAULT_TEMPORARY_DURATION: u16 = 20;

/// Source of the normal-state color
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Mode {
    /// Fixed user color
    #[default]
    Manual = MODE_ID_MANUAL,
    /// Piecewise-linear day schedule
    Scheduled = MODE_ID_SCHEDULED,
    /// Simulated solar day
    Sun = MODE_ID_SUN,
}

impl Mode {
    pub fn from_raw(value: u8) -> Option<Self> {
        Some(match value {
            MODE_ID_MANUAL => Self::Manual,
            MODE_ID_SCHEDULED => Self::Scheduled,
            MODE_ID_SUN => Self::Sun,
            _ => return None,
        })
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Manual => MODE_NAME_MANUAL,
            Self::Scheduled => MODE_NAME_SCHEDULED,
            Self::Sun => MODE_NAME_SUN,
        }
    }

    pub fn parse_from_str(s: &str) -> Option<Self> {
        match s {
            MODE_NAME_MANUAL => Some(Self::Manual),
            MODE_NAME_SCHEDULED => Some(Self::Scheduled),
            MODE_NAME_SUN => Some(Self::Sun),
            _ => None,
        }
    }

    /// Check if the mode follows the time of day
    pub const fn is_timed(self) -> bool {
        matches!(self, Self::Scheduled | Self::Sun)
    }
}

/// Timezone the solar day is computed in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimezoneSettings {
    pub enabled: bool,
    /// Seconds east of UTC
    pub offset: i32,
}

impl Default for TimezoneSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            offset: 8 * 3600,
        }
    }
}

impl TimezoneSettings {
    /// Check if `offset` is a real-world timezone offset
    pub const fn is_valid_offset(offset: i32) -> bool {
        offset >= TZ_OFFSET_MIN && offset <= TZ_OFFSET_MAX
    }

    /// Offset to compute the solar day in, if enabled
    pub const fn active_offset(&self) -> Option<i32> {
        if self.enabled { Some(self.offset) } else { None }
    }
}

/// User settings of the light controller
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub mode: Mode,
    pub manual_color: Color,
    /// Color of the sun at noon
    pub sun_color: Color,
    pub schedule: Schedule,
    pub correction: CorrectionMethod,
    pub location: Option<GeoLocation>,
    pub timezone: TimezoneSettings,
    pub acclimation: AcclimationSettings,
    pub acclimation_enabled: bool,
    /// Length of a temporary override, in minutes
    pub temporary_duration: u16,
}

impl Settings {
    /// Factory settings for a fixture with `channels` outputs
    pub fn default_for(channels: usize) -> Self {
        Self {
            mode: Mode::Manual,
            manual_color: Color::filled(channels, DEFAULT_MANUAL_BRIGHTNESS),
            sun_color: Color::blank(channels),
            schedule: Schedule::new(),
            correction: CorrectionMethod::Log,
            location: None,
            timezone: TimezoneSettings::default(),
            acclimation: AcclimationSettings::default(),
            acclimation_enabled: false,
            temporary_duration: DEFAULT_TEMPORARY_DURATION,
        }
    }

    /// Configured location, or [`DEFAULT_LOCATION`]
    pub fn location_or_default(&self) -> GeoLocation {
        self.location.unwrap_or(DEFAULT_LOCATION)
    }

    /// Check that stored settings fit a fixture with `channels` outputs
    pub fn is_consistent(&self, channels: usize) -> bool {
        self.manual_color.validate(channels).is_ok()
            && self.sun_color.validate(channels).is_ok()
            && crate::schedule::validate(self.schedule.items(), channels).is_ok()
            && self.location.is_none_or(|location| location.validate().is_ok())
            && TimezoneSettings::is_valid_offset(self.timezone.offset)
    }
}

/// Fade durations used by state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FadeTimings {
    /// Fade towards the normal color
    pub power_on: Duration,
    /// Fade to black before shutdown
    pub power_off: Duration,
    /// Fade into a temporary override
    pub temporary: Duration,
}

impl Default for FadeTimings {
    fn default() -> Self {
        Self {
            power_on: Duration::from_millis(5000),
            power_off: Duration::from_millis(3000),
            temporary: Duration::from_millis(5000),
        }
    }
}

/// Configuration of the light controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightConfig {
    /// Number of output channels, `1..=MAX_CHANNELS`
    pub channels: usize,
    pub timings: FadeTimings,
    /// Simulated seconds advanced per preview tick
    pub preview_step: u32,
    /// Period of the render tick
    pub render_period: Duration,
}

impl LightConfig {
    pub fn new(channels: usize) -> Self {
        Self {
            channels: channels.clamp(1, MAX_CHANNELS),
            timings: FadeTimings::default(),
            preview_step: 60,
            render_period: Duration::from_millis(10),
        }
    }
}
