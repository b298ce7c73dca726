#![no_std]

mod log;

pub mod acclimation;
pub mod color;
pub mod driver;
pub mod events;
pub mod fade;
pub mod light;
pub mod math;
pub mod output;
pub mod render_loop;
pub mod schedule;
pub mod settings;
pub mod solar;
pub mod thermal;

pub use acclimation::{AcclimationError, AcclimationOutcome, AcclimationSettings};
pub use color::{
    BRIGHTNESS_MAX, Brightness, Color, ColorError, CorrectionMethod, CorrectionTable, DUTY_MAX,
    Duty, MAX_CHANNELS,
};
pub use driver::{
    ChannelDriver, DriverError, FanDriver, PowerSupervisor, SensorFault, SettingsStore,
    StoreError, TemperatureSensor, WallClock,
};
pub use events::{Channel, LightNotification, ShutdownReason, SystemEvent};
pub use fade::{FadeEngine, FadeError, FadeJob};
pub use light::{LightApi, LightController, LightError, LightShared, State, Status, ValidationError};
pub use output::ChannelOutputMapper;
pub use render_loop::{RenderLoop, TickResult};
pub use schedule::{Schedule, ScheduleError, ScheduleItem};
pub use settings::{FadeTimings, LightConfig, Mode, Settings, TimezoneSettings};
pub use solar::{GeoLocation, SolarEngine, SolarError, SunTimes};
pub use thermal::{
    FanMode, ThermalApi, ThermalController, ThermalError, ThermalSettings, ThermalShared,
    ThermalStatus,
};

pub use embassy_time::{Duration, Instant};
