use core::cell::RefCell;

use critical_section::Mutex;

use crate::driver::SettingsStore;

use super::{FanMode, KEEP_TEMP_MIN, PidGains, ThermalError, ThermalSettings, validate_gains};

/// Runtime thermal readings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ThermalStatus {
    /// Filtered temperature (°C), `None` before the first valid sample
    pub current_temp: Option<i16>,
    /// Last fan power written (percent)
    pub fan_power: u8,
    /// Consecutive overheated samples
    pub overheated_count: u8,
    /// Last sensor read failed
    pub sensor_fault: bool,
}

/// State shared by the thermal timer and the request handlers
pub struct ThermalShared {
    settings: Mutex<RefCell<ThermalSettings>>,
    status: Mutex<RefCell<ThermalStatus>>,
    pid_reset: Mutex<RefCell<bool>>,
}

impl ThermalShared {
    /// Create shared state; invalid settings fall back to defaults
    pub fn new(settings: ThermalSettings) -> Self {
        let settings = match settings.validate() {
            Ok(()) => settings,
            Err(error) => {
                crate::log::warning!("thermal", "stored settings rejected ({}), using defaults", error);
                ThermalSettings::default()
            }
        };
        Self {
            settings: Mutex::new(RefCell::new(settings)),
            status: Mutex::new(RefCell::new(ThermalStatus::default())),
            pid_reset: Mutex::new(RefCell::new(false)),
        }
    }

    /// Load settings from `store`, falling back to defaults
    pub fn load<S: SettingsStore>(store: &S) -> Result<Self, ThermalError> {
        Ok(Self::new(store.load_thermal()?.unwrap_or_default()))
    }

    pub fn settings(&self) -> ThermalSettings {
        critical_section::with(|cs| *self.settings.borrow_ref(cs))
    }

    pub fn status(&self) -> ThermalStatus {
        critical_section::with(|cs| *self.status.borrow_ref(cs))
    }

    pub(crate) fn with_status<R>(&self, f: impl FnOnce(&mut ThermalStatus) -> R) -> R {
        critical_section::with(|cs| f(&mut self.status.borrow_ref_mut(cs)))
    }

    fn update_settings(&self, f: impl FnOnce(&mut ThermalSettings)) -> ThermalSettings {
        critical_section::with(|cs| {
            let mut settings = self.settings.borrow_ref_mut(cs);
            f(&mut settings);
            *settings
        })
    }

    fn request_pid_reset(&self) {
        critical_section::with(|cs| *self.pid_reset.borrow_ref_mut(cs) = true);
    }

    /// Consume a pending PID reset request
    pub(crate) fn take_pid_reset(&self) -> bool {
        critical_section::with(|cs| core::mem::take(&mut *self.pid_reset.borrow_ref_mut(cs)))
    }
}

/// Request handler facing API of the thermal controller
pub struct ThermalApi<'a, S> {
    shared: &'a ThermalShared,
    store: &'a S,
}

impl<'a, S: SettingsStore> ThermalApi<'a, S> {
    pub const fn new(shared: &'a ThermalShared, store: &'a S) -> Self {
        Self { shared, store }
    }

    pub fn settings(&self) -> ThermalSettings {
        self.shared.settings()
    }

    pub fn status(&self) -> ThermalStatus {
        self.shared.status()
    }

    /// Filtered temperature (°C)
    pub fn current_temp(&self) -> Option<i16> {
        self.shared.status().current_temp
    }

    pub fn fan_power(&self) -> u8 {
        self.shared.status().fan_power
    }

    /// Change the PID gains; the loop restarts from a clean state
    pub fn set_pid(&self, kp: i32, ki: i32, kd: i32) -> Result<(), ThermalError> {
        validate_gains(PidGains { kp, ki, kd })?;
        let snapshot = self.shared.update_settings(|settings| {
            settings.kp = kp;
            settings.ki = ki;
            settings.kd = kd;
        });
        self.shared.request_pid_reset();
        crate::log::info!("thermal", "PID gains set to kp={} ki={} kd={}", kp, ki, kd);
        self.persist(&snapshot)
    }

    /// Change the setpoint; must lie below the overheat threshold
    pub fn set_keep_temp(&self, keep_temp: u8) -> Result<(), ThermalError> {
        let overheated = self.shared.settings().overheated_temp;
        if keep_temp < KEEP_TEMP_MIN || keep_temp >= overheated {
            return Err(ThermalError::KeepTemperature(keep_temp));
        }
        let snapshot = self
            .shared
            .update_settings(|settings| settings.keep_temp = keep_temp);
        self.persist(&snapshot)
    }

    pub fn set_fan_mode(&self, mode: FanMode) -> Result<(), ThermalError> {
        let snapshot = self.shared.update_settings(|settings| settings.fan_mode = mode);
        if mode == FanMode::Pid {
            self.shared.request_pid_reset();
        }
        self.persist(&snapshot)
    }

    /// Drive the fan at a fixed power
    pub fn set_fan_manual(&self, power: u8) -> Result<(), ThermalError> {
        if power > 100 {
            return Err(ThermalError::FanPower(power));
        }
        let snapshot = self.shared.update_settings(|settings| {
            settings.fan_mode = FanMode::Manual;
            settings.fan_manual_power = power;
        });
        self.persist(&snapshot)
    }

    fn persist(&self, snapshot: &ThermalSettings) -> Result<(), ThermalError> {
        self.store.save_thermal(snapshot).map_err(|error| {
            crate::log::error!("thermal", "failed to save settings: {}", error);
            ThermalError::Persistence(error)
        })
    }
}
