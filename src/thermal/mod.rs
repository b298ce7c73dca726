//! Heat sink temperature regulation
//!
//! A [`ThermalController`] samples the sensor once per PID period, drives
//! the fan and requests a protective shutdown on sustained overheat.

mod api;
mod controller;
mod pid;
mod window;

pub use api::{ThermalApi, ThermalShared, ThermalStatus};
pub use controller::ThermalController;
pub use pid::{
    DEAD_BAND, INTEGRAL_MAX, INTEGRAL_MIN, INTEGRAL_THRESHOLD, OUTPUT_MAX, OUTPUT_MIN, PID_Q,
    Pid, PidGains,
};
pub use window::{TEMP_WINDOW_SIZE, TemperatureWindow};

use embassy_time::Duration;

use crate::driver::{DriverError, SensorFault, StoreError};

const FAN_MODE_NAME_DISABLED: &str = "disabled";
const FAN_MODE_NAME_PID: &str = "pid";
const FAN_MODE_NAME_MANUAL: &str = "manual";

/// Lowest keep temperature that may be configured (°C)
pub const KEEP_TEMP_MIN: u8 = 35;

/// Consecutive overheated samples tolerated before shutting down
pub const OVERHEATED_COUNT_MAX: u8 = 3;

/// Period of the thermal tick
pub const PID_PERIOD: Duration = Duration::from_millis(1000);

/// How the fan is driven
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum FanMode {
    /// Fan is never driven
    Disabled = 0,
    /// Closed loop on the filtered temperature
    #[default]
    Pid = 1,
    /// Fixed power
    Manual = 2,
}

impl FanMode {
    pub fn from_raw(value: u8) -> Option<Self> {
        Some(match value {
            0 => Self::Disabled,
            1 => Self::Pid,
            2 => Self::Manual,
            _ => return None,
        })
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disabled => FAN_MODE_NAME_DISABLED,
            Self::Pid => FAN_MODE_NAME_PID,
            Self::Manual => FAN_MODE_NAME_MANUAL,
        }
    }

    pub fn parse_from_str(s: &str) -> Option<Self> {
        match s {
            FAN_MODE_NAME_DISABLED => Some(Self::Disabled),
            FAN_MODE_NAME_PID => Some(Self::Pid),
            FAN_MODE_NAME_MANUAL => Some(Self::Manual),
            _ => None,
        }
    }
}

/// Persisted thermal settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThermalSettings {
    pub kp: i32,
    pub ki: i32,
    pub kd: i32,
    /// Setpoint of the PID loop (°C)
    pub keep_temp: u8,
    /// Shutdown threshold (°C)
    pub overheated_temp: u8,
    pub fan_mode: FanMode,
    /// Fan power in manual mode (percent)
    pub fan_manual_power: u8,
}

impl Default for ThermalSettings {
    fn default() -> Self {
        Self {
            kp: 250,
            ki: 10,
            kd: 50,
            keep_temp: 45,
            overheated_temp: 65,
            fan_mode: FanMode::Pid,
            fan_manual_power: 75,
        }
    }
}

impl ThermalSettings {
    pub const fn gains(&self) -> PidGains {
        PidGains {
            kp: self.kp,
            ki: self.ki,
            kd: self.kd,
        }
    }

    pub fn validate(&self) -> Result<(), ThermalError> {
        validate_gains(self.gains())?;
        if self.keep_temp < KEEP_TEMP_MIN || self.keep_temp >= self.overheated_temp {
            return Err(ThermalError::KeepTemperature(self.keep_temp));
        }
        if self.fan_manual_power > 100 {
            return Err(ThermalError::FanPower(self.fan_manual_power));
        }
        Ok(())
    }
}

pub(crate) fn validate_gains(gains: PidGains) -> Result<(), ThermalError> {
    if gains.kp < 0 || gains.ki < 0 || gains.kd < 0 {
        return Err(ThermalError::Gains);
    }
    Ok(())
}

/// Thermal controller errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThermalError {
    /// PID gains must not be negative.
    Gains,
    /// Keep temperature outside `KEEP_TEMP_MIN..overheated_temp`.
    KeepTemperature(u8),
    /// Fan power above 100 %.
    FanPower(u8),
    Sensor(SensorFault),
    Fan(DriverError),
    Persistence(StoreError),
}

impl core::fmt::Display for ThermalError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ThermalError::Gains => write!(f, "PID gains must not be negative"),
            ThermalError::KeepTemperature(temp) => {
                write!(f, "keep temperature {temp} out of range")
            }
            ThermalError::FanPower(power) => write!(f, "fan power {power} exceeds 100"),
            ThermalError::Sensor(error) => write!(f, "{error}"),
            ThermalError::Fan(error) => write!(f, "fan: {error}"),
            ThermalError::Persistence(error) => write!(f, "{error}"),
        }
    }
}

impl From<SensorFault> for ThermalError {
    fn from(error: SensorFault) -> Self {
        ThermalError::Sensor(error)
    }
}

impl From<DriverError> for ThermalError {
    fn from(error: DriverError) -> Self {
        ThermalError::Fan(error)
    }
}

impl From<StoreError> for ThermalError {
    fn from(error: StoreError) -> Self {
        ThermalError::Persistence(error)
    }
}
