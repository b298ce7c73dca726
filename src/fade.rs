use embassy_time::{Duration, Instant};

use crate::color::Color;
use crate::math::{blend16, progress16};

/// Shortest fade that may be requested
pub const FADE_MIN_DURATION: Duration = Duration::from_millis(10);

/// Fade request errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeError {
    /// Duration below [`FADE_MIN_DURATION`].
    TooShort,
    /// Start and end colors have different channel counts.
    ChannelMismatch,
}

impl core::fmt::Display for FadeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            FadeError::TooShort => write!(
                f,
                "fade must last at least {} ms",
                FADE_MIN_DURATION.as_millis()
            ),
            FadeError::ChannelMismatch => write!(f, "fade colors differ in channel count"),
        }
    }
}

/// A single color fade
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FadeJob {
    /// Live color at the moment fading began
    pub start_color: Color,
    /// Color reached when the fade completes
    pub end_color: Color,
    /// Time at which the fade started
    pub start_time: Instant,
    /// Total fade duration
    pub duration: Duration,
}

impl FadeJob {
    /// Color at `now`, or `None` once the fade has completed
    pub fn color_at(&self, now: Instant) -> Option<Color> {
        let elapsed = now.saturating_duration_since(self.start_time);
        if elapsed >= self.duration {
            return None;
        }

        let progress = progress16(elapsed, self.duration);
        let mut color = self.start_color.clone();
        for (channel, value) in color.as_mut_slice().iter_mut().enumerate() {
            let end = self.end_color.get(channel).unwrap_or(*value);
            *value = blend16(*value, end, progress);
        }
        Some(color)
    }
}

/// Drives at most one [`FadeJob`] at a time
///
/// Starting a fade while another runs replaces it.
#[derive(Debug, Clone, Default)]
pub struct FadeEngine {
    job: Option<FadeJob>,
}

impl FadeEngine {
    pub const fn new() -> Self {
        Self { job: None }
    }

    /// Check if a fade is in progress
    pub const fn is_fading(&self) -> bool {
        self.job.is_some()
    }

    /// Active fade, if any
    pub const fn job(&self) -> Option<&FadeJob> {
        self.job.as_ref()
    }

    /// Start fading from `current` to `target`
    pub fn start(
        &mut self,
        current: &Color,
        target: Color,
        duration: Duration,
        now: Instant,
    ) -> Result<(), FadeError> {
        if duration < FADE_MIN_DURATION {
            return Err(FadeError::TooShort);
        }
        if current.len() != target.len() {
            return Err(FadeError::ChannelMismatch);
        }
        self.job = Some(FadeJob {
            start_color: current.clone(),
            end_color: target,
            start_time: now,
            duration,
        });
        Ok(())
    }

    /// Cancel the active fade, leaving the live color where it is
    pub fn stop(&mut self) {
        self.job = None;
    }

    /// Advance the fade
    ///
    /// Returns the color to show, or `None` when no fade is active.
    /// On completion the end color is returned and the job is cleared.
    pub fn tick(&mut self, now: Instant) -> Option<Color> {
        let job = self.job.as_ref()?;
        match job.color_at(now) {
            Some(color) => Some(color),
            None => self.job.take().map(|job| job.end_color),
        }
    }
}
