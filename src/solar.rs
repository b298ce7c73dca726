//! Simulated solar day
//!
//! Sunrise, solar noon and sunset are approximated from the observer's
//! position and the date with a single-harmonic declination model. The day
//! is then turned into an eight point brightness curve that is evaluated
//! like any other [`Schedule`].

use chrono::{DateTime, Datelike};

use crate::color::{BRIGHTNESS_MAX, Color};
use crate::schedule::{INSTANT_LIMIT, SECS_PER_DAY, Schedule, ScheduleError, ScheduleItem};

/// Number of key points in a solar curve
pub const SOLAR_POINTS: usize = 8;

const SECS_PER_HOUR: f32 = 3600.0;

/// Where a key point is anchored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Anchor {
    Sunrise,
    Noon,
    Sunset,
}

/// Key points: anchor, offset in half-days, brightness fraction
const KEY_POINTS: [(Anchor, f32, f32); SOLAR_POINTS] = [
    (Anchor::Sunrise, 0.0, 0.0),
    (Anchor::Sunrise, 0.15, 0.2),
    (Anchor::Sunrise, 0.45, 0.6),
    (Anchor::Noon, -0.25, 0.95),
    (Anchor::Noon, 0.0, 1.0),
    (Anchor::Noon, 0.25, 0.95),
    (Anchor::Sunset, -0.45, 0.5),
    (Anchor::Sunset, 0.0, 0.0),
];

/// Solar computation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolarError {
    /// Latitude outside [-90, 90] or not finite.
    InvalidLatitude,
    /// Longitude outside [-180, 180] or not finite.
    InvalidLongitude,
    /// The sun stays below the horizon all day.
    NoSunrise,
    /// The sun stays above the horizon all day.
    NoSunset,
    /// The timestamp cannot be represented as a calendar date.
    DateOutOfRange,
    /// The generated curve violates schedule invariants.
    Curve(ScheduleError),
}

impl core::fmt::Display for SolarError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SolarError::InvalidLatitude => write!(f, "latitude must be within [-90, 90]"),
            SolarError::InvalidLongitude => write!(f, "longitude must be within [-180, 180]"),
            SolarError::NoSunrise => write!(f, "polar night, the sun does not rise"),
            SolarError::NoSunset => write!(f, "midnight sun, the sun does not set"),
            SolarError::DateOutOfRange => write!(f, "date out of range"),
            SolarError::Curve(error) => write!(f, "invalid solar curve: {error}"),
        }
    }
}

/// Observer position in degrees (north and east positive)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoLocation {
    pub lat: f32,
    pub lng: f32,
}

impl GeoLocation {
    /// Create a validated location
    pub fn new(lat: f32, lng: f32) -> Result<Self, SolarError> {
        let location = Self { lat, lng };
        location.validate()?;
        Ok(location)
    }

    pub fn validate(&self) -> Result<(), SolarError> {
        if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
            return Err(SolarError::InvalidLatitude);
        }
        if !self.lng.is_finite() || !(-180.0..=180.0).contains(&self.lng) {
            return Err(SolarError::InvalidLongitude);
        }
        Ok(())
    }
}

/// Sun events of one day, in hours of the device's local day
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SunTimes {
    pub sunrise: f32,
    pub noon: f32,
    pub sunset: f32,
    /// Solar declination in degrees
    pub declination: f32,
}

impl SunTimes {
    /// Hours of daylight
    pub fn daylight(&self) -> f32 {
        self.sunset - self.sunrise
    }
}

#[inline]
fn deg_to_rad(deg: f32) -> f32 {
    deg * core::f32::consts::PI / 180.0
}

#[inline]
fn rad_to_deg(rad: f32) -> f32 {
    rad * 180.0 / core::f32::consts::PI
}

/// Day of the year (1-366) at `utc` shifted by `offset` seconds
pub fn day_of_year(utc: i64, offset: i32) -> Result<u32, SolarError> {
    DateTime::from_timestamp(utc + i64::from(offset), 0)
        .map(|date| date.ordinal())
        .ok_or(SolarError::DateOutOfRange)
}

/// Approximate solar declination in degrees
#[allow(clippy::cast_precision_loss)]
pub fn declination(day_of_year: u32) -> f32 {
    23.45 * libm::sinf(deg_to_rad(360.0 * (284 + day_of_year) as f32 / 365.0))
}

/// Compute sunrise, noon and sunset
///
/// `target_offset` is the timezone the solar day is computed in, in seconds
/// east of UTC. Returned hours are on that timezone's clock, sunrise within
/// `[0, 24)` and the other events after it. The curve is played on the
/// device clock, so a target timezone other than the device's shifts it.
#[allow(clippy::cast_precision_loss)]
pub fn sun_times(
    location: GeoLocation,
    utc: i64,
    target_offset: i32,
) -> Result<SunTimes, SolarError> {
    location.validate()?;

    let decl = declination(day_of_year(utc, target_offset)?);

    let cos_omega = -libm::tanf(deg_to_rad(location.lat)) * libm::tanf(deg_to_rad(decl));
    if cos_omega >= 1.0 {
        return Err(SolarError::NoSunrise);
    }
    if cos_omega <= -1.0 {
        return Err(SolarError::NoSunset);
    }
    let omega = libm::acosf(cos_omega.clamp(-1.0, 1.0));
    let half_day = rad_to_deg(omega) / 15.0;

    let target_hours = target_offset as f32 / SECS_PER_HOUR;
    let noon = 12.0 + (target_hours * 15.0 - location.lng) / 15.0;

    let mut sunrise = noon - half_day;
    let mut days = 0.0;
    while sunrise < 0.0 {
        sunrise += 24.0;
        days += 24.0;
    }
    while sunrise >= 24.0 {
        sunrise -= 24.0;
        days -= 24.0;
    }

    Ok(SunTimes {
        sunrise,
        noon: noon + days,
        sunset: noon + half_day + days,
        declination: decl,
    })
}

/// Build the eight point curve for a day scaled by `sun_color`
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn solar_curve(times: &SunTimes, sun_color: &Color) -> Result<Schedule, SolarError> {
    let half_day = times.daylight() / 2.0;
    let mut items: heapless::Vec<ScheduleItem, SOLAR_POINTS> = heapless::Vec::new();
    let mut previous: Option<u32> = None;

    for (anchor, offset, fraction) in KEY_POINTS {
        let base = match anchor {
            Anchor::Sunrise => times.sunrise,
            Anchor::Noon => times.noon,
            Anchor::Sunset => times.sunset,
        };
        let hours = base + offset * half_day;
        let mut instant = libm::roundf(hours * SECS_PER_HOUR).max(0.0) as u32;
        if let Some(previous) = previous {
            if instant <= previous {
                instant = previous + 1;
            }
        }
        instant = instant.min(INSTANT_LIMIT - 1);
        previous = Some(instant);

        let mut color = sun_color.clone();
        for value in color.as_mut_slice() {
            let scaled = libm::roundf(f32::from(*value) * fraction);
            *value = (scaled as u16).min(BRIGHTNESS_MAX);
        }
        let _ = items.push(ScheduleItem::new(instant, color));
    }

    Schedule::from_items(&items, sun_color.len()).map_err(SolarError::Curve)
}

/// Start of the next local day as a UTC timestamp
pub fn next_local_midnight(utc: i64, local_offset: i32) -> i64 {
    let local = utc + i64::from(local_offset);
    let day = i64::from(SECS_PER_DAY);
    (local.div_euclid(day) + 1) * day - i64::from(local_offset)
}

/// Inputs needed to derive a solar curve
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolarInputs {
    pub location: GeoLocation,
    /// Timezone the solar day is computed in
    pub target_offset: i32,
    /// Timezone of the device clock
    pub local_offset: i32,
}

/// Owns today's solar curve and decides when to regenerate it
#[derive(Debug, Clone, Default)]
pub struct SolarEngine {
    curve: Option<Schedule>,
    times: Option<SunTimes>,
    inputs: Option<SolarInputs>,
    next_refresh_utc: i64,
}

impl SolarEngine {
    pub const fn new() -> Self {
        Self {
            curve: None,
            times: None,
            inputs: None,
            next_refresh_utc: 0,
        }
    }

    /// Current curve, if one has been generated
    pub fn curve(&self) -> Option<&Schedule> {
        self.curve.as_ref()
    }

    /// Sun events behind the current curve
    pub fn sun_times(&self) -> Option<SunTimes> {
        self.times
    }

    /// UTC timestamp at which the curve goes stale
    pub const fn next_refresh_utc(&self) -> i64 {
        self.next_refresh_utc
    }

    /// Drop the current curve
    pub fn invalidate(&mut self) {
        self.curve = None;
        self.times = None;
        self.inputs = None;
        self.next_refresh_utc = 0;
    }

    /// Check if the curve must be regenerated for `inputs` at `utc`
    pub fn is_stale(&self, inputs: &SolarInputs, utc: i64) -> bool {
        self.curve.is_none() || self.inputs.as_ref() != Some(inputs) || utc >= self.next_refresh_utc
    }

    /// Regenerate the curve for the local day containing `utc`
    pub fn regenerate(
        &mut self,
        inputs: &SolarInputs,
        sun_color: &Color,
        utc: i64,
    ) -> Result<&Schedule, SolarError> {
        let times = sun_times(inputs.location, utc, inputs.target_offset)?;
        let curve = solar_curve(&times, sun_color)?;
        crate::log::info!(
            "solar",
            "sunrise={} noon={} sunset={} decl={}",
            times.sunrise,
            times.noon,
            times.sunset,
            times.declination
        );
        self.times = Some(times);
        self.inputs = Some(*inputs);
        self.next_refresh_utc = next_local_midnight(utc, inputs.local_offset);
        Ok(self.curve.insert(curve))
    }
}
