//! Hardware and platform collaborators
//!
//! Implement these traits to run the controllers on a concrete board. The
//! controllers are generic over them and never touch registers themselves.

use crate::color::Duty;
use crate::events::ShutdownReason;
use crate::settings::Settings;
use crate::thermal::ThermalSettings;

/// An output could not be driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverError;

impl core::fmt::Display for DriverError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "driver error")
    }
}

/// The temperature sensor did not deliver a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorFault;

impl core::fmt::Display for SensorFault {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "temperature sensor fault")
    }
}

/// Settings could not be loaded or stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreError;

impl core::fmt::Display for StoreError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "settings store error")
    }
}

/// PWM outputs of the LED channels
pub trait ChannelDriver {
    /// Set the duty of `channel`; the pulse starts at `phase`
    fn set_duty(&mut self, channel: usize, duty: Duty, phase: Duty) -> Result<(), DriverError>;
}

/// Heat sink temperature sensor
pub trait TemperatureSensor {
    /// Read the temperature in °C
    fn read_temperature(&mut self) -> Result<i16, SensorFault>;
}

/// Cooling fan
pub trait FanDriver {
    /// Set fan power in percent (0-100)
    fn set_power(&mut self, power: u8) -> Result<(), DriverError>;
}

/// Persistent settings storage
///
/// Encoding is up to the implementation. Stores are expected to be
/// internally synchronized; they are never called inside a critical section.
pub trait SettingsStore {
    /// Load light settings, `None` if nothing was stored yet
    fn load_light(&self) -> Result<Option<Settings>, StoreError>;

    fn save_light(&self, settings: &Settings) -> Result<(), StoreError>;

    /// Load thermal settings, `None` if nothing was stored yet
    fn load_thermal(&self) -> Result<Option<ThermalSettings>, StoreError>;

    fn save_thermal(&self, settings: &ThermalSettings) -> Result<(), StoreError>;
}

/// Calendar time source
pub trait WallClock {
    /// Seconds since the Unix epoch, `None` until the clock is synchronized
    fn now_utc(&self) -> Option<i64>;

    /// Offset of the device timezone in seconds east of UTC, `None` when
    /// no timezone is configured
    fn local_offset(&self) -> Option<i32>;
}

/// System power state and shutdown path
pub trait PowerSupervisor {
    /// Check if the fixture is powered
    fn is_on(&self) -> bool;

    /// Request a protective or scheduled shutdown
    fn shutdown(&self, reason: ShutdownReason);
}
