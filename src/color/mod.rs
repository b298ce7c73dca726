//! Multi-channel LED colors
//!
//! A color is one brightness value per output channel. The channel count is
//! fixed when the controller is built and never exceeds [`MAX_CHANNELS`].

mod correction;

pub use correction::{CorrectionMethod, CorrectionTable};

use heapless::Vec;

use crate::math::round_div;

/// Per-channel brightness value
pub type Brightness = u16;

/// Hardware PWM duty value
pub type Duty = u16;

/// Maximum number of output channels a fixture can have
pub const MAX_CHANNELS: usize = 10;

/// Brightness of a fully lit channel
pub const BRIGHTNESS_MAX: Brightness = 4095;

/// Duty of a fully lit channel (12-bit PWM)
pub const DUTY_MAX: Duty = 4095;

/// Color validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorError {
    /// Channel count differs from the fixture's channel count.
    ChannelCount { expected: usize, actual: usize },
    /// A channel is brighter than [`BRIGHTNESS_MAX`].
    OutOfRange { channel: usize, value: Brightness },
}

impl core::fmt::Display for ColorError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ColorError::ChannelCount { expected, actual } => {
                write!(f, "expected {expected} channels, got {actual}")
            }
            ColorError::OutOfRange { channel, value } => {
                write!(
                    f,
                    "channel {channel} brightness {value} exceeds {BRIGHTNESS_MAX}"
                )
            }
        }
    }
}

/// Brightness of every output channel
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Color {
    channels: Vec<Brightness, MAX_CHANNELS>,
}

impl Color {
    /// Create a blank (all channels off) color
    ///
    /// `channels` is clamped to [`MAX_CHANNELS`].
    pub fn blank(channels: usize) -> Self {
        Self::filled(channels, 0)
    }

    /// Create a color with every channel set to `value`
    pub fn filled(channels: usize, value: Brightness) -> Self {
        let mut inner = Vec::new();
        for _ in 0..channels.min(MAX_CHANNELS) {
            let _ = inner.push(value.min(BRIGHTNESS_MAX));
        }
        Self { channels: inner }
    }

    /// Create a color from raw channel values, validating every channel
    pub fn from_slice(values: &[Brightness]) -> Result<Self, ColorError> {
        let channels = Vec::from_slice(values).map_err(|()| ColorError::ChannelCount {
            expected: MAX_CHANNELS,
            actual: values.len(),
        })?;
        let color = Self { channels };
        color.validate(values.len())?;
        Ok(color)
    }

    /// Check channel count and brightness bounds
    pub fn validate(&self, channels: usize) -> Result<(), ColorError> {
        if self.channels.len() != channels {
            return Err(ColorError::ChannelCount {
                expected: channels,
                actual: self.channels.len(),
            });
        }
        match self
            .channels
            .iter()
            .position(|value| *value > BRIGHTNESS_MAX)
        {
            Some(channel) => Err(ColorError::OutOfRange {
                channel,
                value: self.channels[channel],
            }),
            None => Ok(()),
        }
    }

    /// Number of channels
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Channel values
    pub fn as_slice(&self) -> &[Brightness] {
        &self.channels
    }

    /// Mutable channel values
    pub fn as_mut_slice(&mut self) -> &mut [Brightness] {
        &mut self.channels
    }

    /// Brightness of a single channel
    pub fn get(&self, channel: usize) -> Option<Brightness> {
        self.channels.get(channel).copied()
    }

    /// Check if every channel is off
    pub fn is_blank(&self) -> bool {
        self.channels.iter().all(|value| *value == 0)
    }

    /// Scale every channel by `percent` (0-100), rounding to nearest
    pub fn scale_percent(&mut self, percent: u8) {
        let percent = i64::from(percent.min(100));
        for value in self.channels.iter_mut() {
            let scaled = round_div(i64::from(*value) * percent, 100);
            *value = clamp_brightness(scaled);
        }
    }
}

/// Clamp an intermediate value into the valid brightness range
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub const fn clamp_brightness(value: i64) -> Brightness {
    if value < 0 {
        0
    } else if value > BRIGHTNESS_MAX as i64 {
        BRIGHTNESS_MAX
    } else {
        value as Brightness
    }
}
