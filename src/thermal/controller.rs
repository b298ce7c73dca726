use crate::driver::{FanDriver, PowerSupervisor, TemperatureSensor};
use crate::events::ShutdownReason;

use super::pid::OUTPUT_MAX;
use super::{
    FanMode, OVERHEATED_COUNT_MAX, Pid, TEMP_WINDOW_SIZE, TemperatureWindow, ThermalError,
    ThermalShared,
};

/// Fan power while the fixture is in trouble
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
const FAN_POWER_MAX: u8 = OUTPUT_MAX as u8;

/// Thermal timer side of the thermal controller
///
/// Call [`ThermalController::start`] once, then [`ThermalController::tick`]
/// every [`PID_PERIOD`](super::PID_PERIOD). Never persists settings.
pub struct ThermalController<'a, T, F, P> {
    shared: &'a ThermalShared,
    sensor: T,
    fan: F,
    power: &'a P,

    window: TemperatureWindow,
    pid: Pid,
    fan_power: Option<u8>,
    overheated_count: u8,
}

impl<'a, T, F, P> ThermalController<'a, T, F, P>
where
    T: TemperatureSensor,
    F: FanDriver,
    P: PowerSupervisor,
{
    pub fn new(shared: &'a ThermalShared, sensor: T, fan: F, power: &'a P) -> Self {
        Self {
            shared,
            sensor,
            fan,
            power,
            window: TemperatureWindow::new(),
            pid: Pid::new(),
            fan_power: None,
            overheated_count: 0,
        }
    }

    /// Fill the sample window and stop the fan
    pub fn start(&mut self) -> Result<(), ThermalError> {
        for _ in 0..TEMP_WINDOW_SIZE {
            let sample = self.sensor.read_temperature().ok();
            self.window.push(sample);
        }
        let current = self.window.average();
        self.shared.with_status(|status| {
            status.current_temp = current;
            status.sensor_fault = current.is_none();
        });
        self.pid.reset();
        let _ = self.shared.take_pid_reset();

        let mode = self.shared.settings().fan_mode;
        if current.is_none() {
            crate::log::error!("thermal", "no valid temperature sample during warm-up");
            if mode != FanMode::Disabled {
                self.set_fan(FAN_POWER_MAX)?;
            }
            return Err(ThermalError::Sensor(crate::driver::SensorFault));
        }
        if mode != FanMode::Disabled {
            self.set_fan(0)?;
        }
        crate::log::info!("thermal", "started at {} C", current.unwrap_or_default());
        Ok(())
    }

    /// Run one control period
    ///
    /// Sensor faults are not returned; they show in `ThermalStatus::sensor_fault`.
    pub fn tick(&mut self) -> Result<(), ThermalError> {
        let settings = self.shared.settings();
        if self.shared.take_pid_reset() {
            self.pid.reset();
        }
        let powered = self.power.is_on();

        let sample = match self.sensor.read_temperature() {
            Ok(sample) => sample,
            Err(_) => {
                crate::log::error!("thermal", "temperature sensor fault or not connected");
                self.shared.with_status(|status| status.sensor_fault = true);
                if settings.fan_mode != FanMode::Disabled {
                    self.set_fan(if powered { FAN_POWER_MAX } else { 0 })?;
                }
                return Ok(());
            }
        };
        self.window.push(Some(sample));
        let Some(temp) = self.window.average() else {
            return Ok(());
        };
        self.shared.with_status(|status| {
            status.current_temp = Some(temp);
            status.sensor_fault = false;
        });

        let keep = i16::from(settings.keep_temp);
        if !powered && temp <= keep {
            self.overheated_count = 0;
            self.publish_count();
            if settings.fan_mode != FanMode::Disabled && self.fan_power.unwrap_or(1) > 0 {
                self.set_fan(0)?;
            }
            return Ok(());
        }

        if powered && temp >= i16::from(settings.overheated_temp) {
            self.overheated_count = self.overheated_count.saturating_add(1);
            crate::log::warning!(
                "thermal",
                "[{}/{}] too hot",
                self.overheated_count,
                OVERHEATED_COUNT_MAX
            );
            if self.overheated_count > OVERHEATED_COUNT_MAX {
                crate::log::warning!(
                    "thermal",
                    "over temperature (temp={}, limit={}), shutting down",
                    temp,
                    settings.overheated_temp
                );
                self.overheated_count = 0;
                self.publish_count();
                let fan = if settings.fan_mode == FanMode::Disabled {
                    Ok(())
                } else {
                    self.set_fan(FAN_POWER_MAX)
                };
                self.power.shutdown(ShutdownReason::Overheated);
                return fan;
            }
        } else {
            self.overheated_count = 0;
        }
        self.publish_count();

        let power = match settings.fan_mode {
            FanMode::Disabled => return Ok(()),
            FanMode::Manual => settings.fan_manual_power.min(FAN_POWER_MAX),
            FanMode::Pid => self.pid.step(
                settings.gains(),
                i32::from(temp),
                i32::from(settings.keep_temp),
            ),
        };
        if self.fan_power != Some(power) {
            crate::log::info!(
                "thermal",
                "changing fan power: temp={} keep={} fan={}%",
                temp,
                settings.keep_temp,
                power
            );
            self.set_fan(power)?;
        }
        Ok(())
    }

    /// Consecutive overheated samples so far
    pub const fn overheated_count(&self) -> u8 {
        self.overheated_count
    }

    pub fn pid(&self) -> &Pid {
        &self.pid
    }

    pub fn fan(&self) -> &F {
        &self.fan
    }

    pub fn sensor_mut(&mut self) -> &mut T {
        &mut self.sensor
    }

    fn publish_count(&self) {
        let count = self.overheated_count;
        self.shared
            .with_status(|status| status.overheated_count = count);
    }

    fn set_fan(&mut self, power: u8) -> Result<(), ThermalError> {
        self.fan.set_power(power)?;
        self.fan_power = Some(power);
        self.shared.with_status(|status| status.fan_power = power);
        Ok(())
    }
}
