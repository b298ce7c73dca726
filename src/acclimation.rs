//! Post-installation acclimation ramp
//!
//! For a number of days after installation the output is dimmed, starting at
//! `start_percent` and rising linearly to full brightness.

use crate::color::Color;

const SECS_PER_DAY: i64 = 86_400;

/// Shortest allowed ramp
pub const ACCLIMATION_DAYS_MIN: u8 = 5;

/// Longest allowed ramp
pub const ACCLIMATION_DAYS_MAX: u8 = 100;

/// Acclimation validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcclimationError {
    /// Duration outside the allowed range of days.
    Duration(u8),
    /// Start percent above 100.
    StartPercent(u8),
}

impl core::fmt::Display for AcclimationError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            AcclimationError::Duration(days) => write!(
                f,
                "duration {days} must be within {ACCLIMATION_DAYS_MIN}..={ACCLIMATION_DAYS_MAX} days"
            ),
            AcclimationError::StartPercent(percent) => {
                write!(f, "start percent {percent} exceeds 100")
            }
        }
    }
}

/// Ramp parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcclimationSettings {
    /// UTC timestamp the ramp starts at
    pub start_utc: i64,
    /// Ramp length in days
    pub duration: u8,
    /// Brightness on the first day, in percent
    pub start_percent: u8,
}

impl Default for AcclimationSettings {
    fn default() -> Self {
        Self {
            start_utc: 0,
            duration: 30,
            start_percent: 30,
        }
    }
}

impl AcclimationSettings {
    pub fn validate(&self) -> Result<(), AcclimationError> {
        if !(ACCLIMATION_DAYS_MIN..=ACCLIMATION_DAYS_MAX).contains(&self.duration) {
            return Err(AcclimationError::Duration(self.duration));
        }
        if self.start_percent > 100 {
            return Err(AcclimationError::StartPercent(self.start_percent));
        }
        Ok(())
    }

    /// UTC timestamp the ramp ends at
    pub fn end_utc(&self) -> i64 {
        self.start_utc + SECS_PER_DAY * i64::from(self.duration)
    }

    /// Check if `utc` lies within the ramp window
    pub fn contains(&self, utc: i64) -> bool {
        utc >= self.start_utc && utc <= self.end_utc()
    }

    /// Brightness percentage at `utc`, or `None` outside the window
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn percent_at(&self, utc: i64) -> Option<u8> {
        if !self.contains(utc) || self.duration == 0 {
            return None;
        }
        let duration = i64::from(self.duration);
        let days_elapsed = ((utc - self.start_utc) / SECS_PER_DAY).min(duration);
        let increment = i64::from(100 - self.start_percent.min(100));
        let percent = i64::from(self.start_percent)
            + (days_elapsed * increment + duration / 2) / duration;
        Some(percent.min(100) as u8)
    }
}

/// What the filter did on one pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcclimationOutcome {
    /// Ramp disabled, color untouched
    Inactive,
    /// Color scaled to the given percentage
    Applied(u8),
    /// Window passed while still enabled; the ramp must be terminated
    Expired,
}

/// Scale `color` according to the ramp at `utc`
pub fn apply(settings: &AcclimationSettings, enabled: bool, utc: i64, color: &mut Color) -> AcclimationOutcome {
    if !enabled {
        return AcclimationOutcome::Inactive;
    }
    match settings.percent_at(utc) {
        Some(percent) => {
            color.scale_percent(percent);
            AcclimationOutcome::Applied(percent)
        }
        None if utc > settings.end_utc() => AcclimationOutcome::Expired,
        None => AcclimationOutcome::Inactive,
    }
}

