use embassy_time::Instant;

use crate::acclimation::AcclimationSettings;
use crate::color::{Color, CorrectionMethod};
use crate::driver::{PowerSupervisor, SettingsStore, WallClock};
use crate::events::SystemEvent;
use crate::schedule::{Schedule, ScheduleItem};
use crate::settings::{Mode, Settings, TimezoneSettings};
use crate::solar::GeoLocation;

use super::shared::Status;
use super::{LightError, LightShared, State, ValidationError};

/// Request handler facing API of the light controller
///
/// Inputs are validated synchronously; state switches are queued for the
/// render task. Settings that shape the normal color (color, schedule, mode)
/// are persisted when dimming ends, the rest is persisted immediately.
pub struct LightApi<'a, S, C, P> {
    shared: &'a LightShared,
    store: &'a S,
    clock: &'a C,
    power: &'a P,
}

impl<'a, S, C, P> LightApi<'a, S, C, P>
where
    S: SettingsStore,
    C: WallClock,
    P: PowerSupervisor,
{
    pub const fn new(shared: &'a LightShared, store: &'a S, clock: &'a C, power: &'a P) -> Self {
        Self {
            shared,
            store,
            clock,
            power,
        }
    }

    pub fn state(&self) -> State {
        self.shared.with_status(|status| status.state)
    }

    pub fn status(&self) -> Status {
        self.shared.status()
    }

    pub fn settings(&self) -> Settings {
        self.shared.settings()
    }

    /// Live color
    pub fn color(&self) -> Color {
        self.shared.with_status(|status| status.color.clone())
    }

    /// Set the color while dimming
    ///
    /// The color is stored as the manual color in manual mode and as the
    /// noon color in sun mode.
    pub fn set_color(&self, color: Color) -> Result<(), LightError> {
        color.validate(self.shared.channels())?;
        if !self.power.is_on() {
            return Err(LightError::NotPowered);
        }
        let state = self.shared.with_status(|status| {
            if status.state == State::Dimming {
                status.color = color.clone();
            }
            status.state
        });
        if state != State::Dimming {
            return Err(LightError::WrongState(state));
        }
        self.shared.update_settings(|settings| match settings.mode {
            Mode::Manual => settings.manual_color = color,
            Mode::Sun => settings.sun_color = color,
            Mode::Scheduled => {}
        });
        Ok(())
    }

    pub fn schedule(&self) -> Schedule {
        self.shared.with_settings(|settings| settings.schedule.clone())
    }

    /// Replace the schedule; items must be strictly ascending
    pub fn set_schedule(&self, items: &[ScheduleItem]) -> Result<(), LightError> {
        let schedule = Schedule::from_items(items, self.shared.channels())?;
        self.shared.update_settings(|settings| settings.schedule = schedule);
        Ok(())
    }

    pub fn mode(&self) -> Mode {
        self.shared.with_settings(|settings| settings.mode)
    }

    /// Switch the color source
    ///
    /// Only possible while powered and dimming. Scheduled mode may also be
    /// chosen from preview, which ends the preview.
    pub fn set_mode(&self, mode: Mode) -> Result<(), LightError> {
        if !self.power.is_on() {
            return Err(LightError::NotPowered);
        }
        let has_timezone = self.clock.local_offset().is_some();
        critical_section::with(|cs| {
            let (state, current, has_location) = {
                let status = self.shared.borrow_status(cs);
                let settings = self.shared.borrow_settings(cs);
                (status.state, settings.mode, settings.location.is_some())
            };
            if mode == current {
                return Err(LightError::ModeUnchanged(mode));
            }
            match (mode, state) {
                (_, State::Dimming) => {}
                (Mode::Scheduled, State::Preview) => {
                    self.shared.begin_transition(cs, State::Dimming)?;
                }
                (_, state) => return Err(LightError::WrongState(state)),
            }
            if mode == Mode::Sun && !(has_location && has_timezone) {
                return Err(LightError::SunUnavailable);
            }
            Ok(())
        })?;
        self.shared.update_settings(|settings| settings.mode = mode);
        crate::log::info!("light", "mode switched to {}", mode.as_str());
        Ok(())
    }

    /// Request a state switch
    pub fn switch_state(&self, to: State) -> Result<(), LightError> {
        if !self.power.is_on() {
            return Err(LightError::NotPowered);
        }
        critical_section::with(|cs| {
            let (from, mode, items) = {
                let status = self.shared.borrow_status(cs);
                let settings = self.shared.borrow_settings(cs);
                (status.state, settings.mode, settings.schedule.len())
            };
            if !from.can_switch_to(to) {
                return Err(LightError::IllegalTransition { from, to });
            }
            match to {
                State::Temporary if !mode.is_timed() => {
                    return Err(LightError::IllegalTransition { from, to });
                }
                State::Preview if items < 2 => {
                    return Err(ValidationError::PreviewTooShort { items }.into());
                }
                _ => {}
            }
            self.shared.begin_transition(cs, to).map(|_| ())
        })?;
        crate::log::info!("light", "switch to {} requested", to.as_str());
        Ok(())
    }

    pub fn correction(&self) -> CorrectionMethod {
        self.shared.with_settings(|settings| settings.correction)
    }

    pub fn set_correction(&self, method: CorrectionMethod) -> Result<(), LightError> {
        let snapshot = self.shared.update_settings(|settings| settings.correction = method);
        self.persist(&snapshot)
    }

    pub fn location(&self) -> Option<GeoLocation> {
        self.shared.with_settings(|settings| settings.location)
    }

    /// Store the geo-location and ask the controller to rebuild the solar curve
    pub fn set_location(&self, location: GeoLocation) -> Result<(), LightError> {
        location
            .validate()
            .map_err(|error| LightError::Validation(ValidationError::Location(error)))?;
        let snapshot = self
            .shared
            .update_settings(|settings| settings.location = Some(location));
        self.persist(&snapshot)?;
        self.shared.post_event(SystemEvent::GeoLocationChanged)
    }

    pub fn timezone(&self) -> TimezoneSettings {
        self.shared.with_settings(|settings| settings.timezone)
    }

    pub fn set_timezone_offset(&self, offset: i32) -> Result<(), LightError> {
        if !TimezoneSettings::is_valid_offset(offset) {
            return Err(ValidationError::TimezoneOffset(offset).into());
        }
        let snapshot = self
            .shared
            .update_settings(|settings| settings.timezone.offset = offset);
        self.persist(&snapshot)
    }

    pub fn set_timezone_enabled(&self, enabled: bool) -> Result<(), LightError> {
        let offset = self.timezone().offset;
        if enabled && !TimezoneSettings::is_valid_offset(offset) {
            return Err(ValidationError::TimezoneOffset(offset).into());
        }
        let snapshot = self
            .shared
            .update_settings(|settings| settings.timezone.enabled = enabled);
        self.persist(&snapshot)
    }

    /// Acclimation settings and whether the ramp is enabled
    pub fn acclimation(&self) -> (AcclimationSettings, bool) {
        self.shared
            .with_settings(|settings| (settings.acclimation, settings.acclimation_enabled))
    }

    /// Check if the ramp is currently scaling the output
    pub fn acclimation_activated(&self) -> bool {
        self.shared.with_status(|status| status.acclimation_activated)
    }

    pub fn set_acclimation(
        &self,
        acclimation: AcclimationSettings,
        enabled: bool,
    ) -> Result<(), LightError> {
        acclimation.validate()?;
        let snapshot = self.shared.update_settings(|settings| {
            settings.acclimation = acclimation;
            settings.acclimation_enabled = enabled;
        });
        if !enabled {
            self.shared
                .with_status(|status| status.acclimation_activated = false);
        }
        self.persist(&snapshot)?;
        crate::log::info!("acclimation", "settings updated, enabled={}", enabled);
        Ok(())
    }

    /// Disable a running ramp
    pub fn terminate_acclimation(&self) -> Result<(), LightError> {
        terminate_acclimation(self.shared, self.store)
    }

    /// Temporary override length in minutes
    pub fn temporary_duration(&self) -> u16 {
        self.shared.with_settings(|settings| settings.temporary_duration)
    }

    pub fn set_temporary_duration(&self, minutes: u16) -> Result<(), LightError> {
        if minutes == 0 {
            return Err(ValidationError::TemporaryDuration.into());
        }
        let snapshot = self
            .shared
            .update_settings(|settings| settings.temporary_duration = minutes);
        self.persist(&snapshot)
    }

    /// Seconds left in a temporary override, `None` outside of it
    #[allow(clippy::cast_possible_truncation)]
    pub fn temporary_remaining(&self, now: Instant) -> Option<u32> {
        let (state, off) = self
            .shared
            .with_status(|status| (status.state, status.temporary_off));
        if state != State::Temporary {
            return None;
        }
        let off = off?;
        let left = off.saturating_duration_since(now).as_millis();
        Some(((left + 500) / 1000) as u32)
    }

    fn persist(&self, snapshot: &Settings) -> Result<(), LightError> {
        self.store.save_light(snapshot).map_err(|error| {
            crate::log::error!("light", "failed to save settings: {}", error);
            LightError::Persistence(error)
        })
    }
}

/// Disable acclimation and persist the change
pub(crate) fn terminate_acclimation<S: SettingsStore>(
    shared: &LightShared,
    store: &S,
) -> Result<(), LightError> {
    let enabled = shared.with_settings(|settings| settings.acclimation_enabled);
    if !enabled {
        return Err(LightError::AcclimationNotEnabled);
    }
    let snapshot = shared.update_settings(|settings| settings.acclimation_enabled = false);
    shared.with_status(|status| status.acclimation_activated = false);
    store.save_light(&snapshot)?;
    crate::log::info!("acclimation", "terminated");
    Ok(())
}
