//! Brightness to duty correction curves
//!
//! The perceptual curves are generated from closed-form formulas into a
//! lookup table sized to the brightness range. A table is rebuilt only when
//! the selected method changes.

use super::{BRIGHTNESS_MAX, Brightness, DUTY_MAX, Duty};
use crate::math::round_div;

const CORRECTION_NAME_LOG: &str = "log";
const CORRECTION_NAME_LINEAR: &str = "linear";
const CORRECTION_NAME_EXP: &str = "exp";
const CORRECTION_NAME_GAMMA: &str = "gamma";
const CORRECTION_NAME_CIE1931: &str = "cie1931";

const CORRECTION_ID_LOG: u8 = 0;
const CORRECTION_ID_LINEAR: u8 = 1;
const CORRECTION_ID_EXP: u8 = 2;
const CORRECTION_ID_GAMMA: u8 = 3;
const CORRECTION_ID_CIE1931: u8 = 4;

/// Gamma exponent for [`CorrectionMethod::Gamma`]
const GAMMA: f32 = 2.2;
/// Number of decades spanned by [`CorrectionMethod::Log`]
const LOG_DECADES: f32 = 3.0;
/// Steepness of [`CorrectionMethod::Exp`]
const EXP_STEEPNESS: f32 = 4.0;

const TABLE_SIZE: usize = BRIGHTNESS_MAX as usize + 1;

/// Selectable brightness correction curve
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum CorrectionMethod {
    /// Logarithmic dimming curve spanning three decades
    #[default]
    Log = CORRECTION_ID_LOG,
    /// Duty proportional to brightness
    Linear = CORRECTION_ID_LINEAR,
    /// Exponential ramp
    Exp = CORRECTION_ID_EXP,
    /// Power law with exponent 2.2
    Gamma = CORRECTION_ID_GAMMA,
    /// CIE 1931 lightness
    Cie1931 = CORRECTION_ID_CIE1931,
}

impl CorrectionMethod {
    pub fn from_raw(value: u8) -> Option<Self> {
        Some(match value {
            CORRECTION_ID_LOG => Self::Log,
            CORRECTION_ID_LINEAR => Self::Linear,
            CORRECTION_ID_EXP => Self::Exp,
            CORRECTION_ID_GAMMA => Self::Gamma,
            CORRECTION_ID_CIE1931 => Self::Cie1931,
            _ => return None,
        })
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Log => CORRECTION_NAME_LOG,
            Self::Linear => CORRECTION_NAME_LINEAR,
            Self::Exp => CORRECTION_NAME_EXP,
            Self::Gamma => CORRECTION_NAME_GAMMA,
            Self::Cie1931 => CORRECTION_NAME_CIE1931,
        }
    }

    pub fn parse_from_str(s: &str) -> Option<Self> {
        match s {
            CORRECTION_NAME_LOG => Some(Self::Log),
            CORRECTION_NAME_LINEAR => Some(Self::Linear),
            CORRECTION_NAME_EXP => Some(Self::Exp),
            CORRECTION_NAME_GAMMA => Some(Self::Gamma),
            CORRECTION_NAME_CIE1931 => Some(Self::Cie1931),
            _ => None,
        }
    }

    /// Relative output (0.0-1.0) for a relative brightness (0.0-1.0)
    fn curve(self, x: f32) -> f32 {
        match self {
            Self::Linear => x,
            Self::Gamma => libm::powf(x, GAMMA),
            Self::Log => {
                let span = libm::powf(10.0, LOG_DECADES) - 1.0;
                (libm::powf(10.0, LOG_DECADES * x) - 1.0) / span
            }
            Self::Exp => (libm::expf(EXP_STEEPNESS * x) - 1.0) / (libm::expf(EXP_STEEPNESS) - 1.0),
            Self::Cie1931 => {
                let lightness = x * 100.0;
                if lightness <= 8.0 {
                    lightness / 903.3
                } else {
                    let y = (lightness + 16.0) / 116.0;
                    y * y * y
                }
            }
        }
    }
}

/// Precomputed brightness to duty table for one correction method
pub struct CorrectionTable {
    method: CorrectionMethod,
    lut: [Duty; TABLE_SIZE],
}

impl CorrectionTable {
    /// Build the table for `method`
    pub fn new(method: CorrectionMethod) -> Self {
        let mut table = Self {
            method,
            lut: [0; TABLE_SIZE],
        };
        table.fill();
        table
    }

    /// Currently tabulated method
    pub const fn method(&self) -> CorrectionMethod {
        self.method
    }

    /// Switch to another method, rebuilding only if it changed
    pub fn set_method(&mut self, method: CorrectionMethod) {
        if method == self.method {
            return;
        }
        self.method = method;
        self.fill();
    }

    /// Map a brightness to a duty
    pub fn duty(&self, brightness: Brightness) -> Duty {
        self.lut[usize::from(brightness.min(BRIGHTNESS_MAX))]
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn fill(&mut self) {
        for (index, slot) in self.lut.iter_mut().enumerate() {
            *slot = if self.method == CorrectionMethod::Linear {
                linear_duty(index as Brightness)
            } else {
                let x = index as f32 / f32::from(BRIGHTNESS_MAX);
                let y = self.method.curve(x).clamp(0.0, 1.0);
                libm::roundf(y * f32::from(DUTY_MAX)) as Duty
            };
        }
    }
}

impl core::fmt::Debug for CorrectionTable {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CorrectionTable")
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}

/// Identity mapping, rescaled when brightness and duty ranges differ
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn linear_duty(brightness: Brightness) -> Duty {
    if DUTY_MAX == BRIGHTNESS_MAX {
        return brightness;
    }
    round_div(
        i64::from(brightness) * i64::from(DUTY_MAX),
        i64::from(BRIGHTNESS_MAX),
    ) as Duty
}
