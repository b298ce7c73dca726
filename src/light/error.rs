use crate::acclimation::AcclimationError;
use crate::color::ColorError;
use crate::driver::{DriverError, StoreError};
use crate::fade::FadeError;
use crate::schedule::ScheduleError;
use crate::settings::Mode;
use crate::solar::SolarError;

use super::State;

/// Rejected API input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    Color(ColorError),
    Schedule(ScheduleError),
    Location(SolarError),
    /// Timezone offset outside UTC-12:00..=UTC+14:00.
    TimezoneOffset(i32),
    Acclimation(AcclimationError),
    /// Preview needs at least two schedule items.
    PreviewTooShort { items: usize },
    /// Temporary override must last at least one minute.
    TemporaryDuration,
}

impl core::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ValidationError::Color(error) => write!(f, "invalid color: {error}"),
            ValidationError::Schedule(error) => write!(f, "invalid schedule: {error}"),
            ValidationError::Location(error) => write!(f, "invalid location: {error}"),
            ValidationError::TimezoneOffset(offset) => {
                write!(f, "timezone offset {offset} s out of range")
            }
            ValidationError::Acclimation(error) => write!(f, "invalid acclimation: {error}"),
            ValidationError::PreviewTooShort { items } => {
                write!(f, "preview needs at least 2 schedule items, got {items}")
            }
            ValidationError::TemporaryDuration => {
                write!(f, "temporary duration must be at least one minute")
            }
        }
    }
}

/// Light controller errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightError {
    Validation(ValidationError),
    /// The requested state switch is not allowed.
    IllegalTransition { from: State, to: State },
    /// The operation requires power.
    NotPowered,
    /// The operation is not available in the current state.
    WrongState(State),
    /// The requested mode is already active.
    ModeUnchanged(Mode),
    /// Sun mode needs a geo-location and a device timezone.
    SunUnavailable,
    /// Acclimation is not enabled.
    AcclimationNotEnabled,
    /// Settings could not be stored.
    Persistence(StoreError),
    /// An LED channel could not be driven.
    Actuator(DriverError),
    Solar(SolarError),
    Fade(FadeError),
    /// Too many pending state switches.
    QueueFull,
}

impl core::fmt::Display for LightError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            LightError::Validation(error) => write!(f, "{error}"),
            LightError::IllegalTransition { from, to } => write!(
                f,
                "illegal state switch from {} to {}",
                from.as_str(),
                to.as_str()
            ),
            LightError::NotPowered => write!(f, "power is off"),
            LightError::WrongState(state) => {
                write!(f, "not available in {} state", state.as_str())
            }
            LightError::ModeUnchanged(mode) => write!(f, "already in {} mode", mode.as_str()),
            LightError::SunUnavailable => {
                write!(f, "sun mode needs a location and a timezone")
            }
            LightError::AcclimationNotEnabled => write!(f, "acclimation is not enabled"),
            LightError::Persistence(error) => write!(f, "{error}"),
            LightError::Actuator(error) => write!(f, "{error}"),
            LightError::Solar(error) => write!(f, "{error}"),
            LightError::Fade(error) => write!(f, "{error}"),
            LightError::QueueFull => write!(f, "too many pending state switches"),
        }
    }
}

impl From<ValidationError> for LightError {
    fn from(error: ValidationError) -> Self {
        LightError::Validation(error)
    }
}

impl From<ColorError> for LightError {
    fn from(error: ColorError) -> Self {
        LightError::Validation(ValidationError::Color(error))
    }
}

impl From<ScheduleError> for LightError {
    fn from(error: ScheduleError) -> Self {
        LightError::Validation(ValidationError::Schedule(error))
    }
}

impl From<AcclimationError> for LightError {
    fn from(error: AcclimationError) -> Self {
        LightError::Validation(ValidationError::Acclimation(error))
    }
}

impl From<StoreError> for LightError {
    fn from(error: StoreError) -> Self {
        LightError::Persistence(error)
    }
}

impl From<DriverError> for LightError {
    fn from(error: DriverError) -> Self {
        LightError::Actuator(error)
    }
}

impl From<SolarError> for LightError {
    fn from(error: SolarError) -> Self {
        LightError::Solar(error)
    }
}

impl From<FadeError> for LightError {
    fn from(error: FadeError) -> Self {
        LightError::Fade(error)
    }
}
