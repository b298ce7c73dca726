use embassy_time::{Duration, Instant};

use crate::acclimation::{self, AcclimationOutcome};
use crate::color::{Color, Duty, MAX_CHANNELS};
use crate::driver::{ChannelDriver, PowerSupervisor, SettingsStore, WallClock};
use crate::events::{LightNotification, ShutdownReason, SystemEvent};
use crate::fade::FadeEngine;
use crate::output::ChannelOutputMapper;
use crate::schedule::SECS_PER_DAY;
use crate::settings::{LightConfig, Mode, Settings};
use crate::solar::{self, SolarEngine, SolarInputs};

use super::api::terminate_acclimation;
use super::shared::PreviewClock;
use super::state::Transition;
use super::{LightError, LightShared, State};

/// Render task side of the light controller
///
/// Call [`LightController::tick`] every render period. Each tick drains
/// pending state switches and system events, advances the active fade or the
/// current state, then writes changed channels to the driver.
pub struct LightController<'a, D, S, C, P> {
    shared: &'a LightShared,
    driver: D,
    store: &'a S,
    clock: &'a C,
    power: &'a P,
    config: LightConfig,

    settings: Settings,
    revision: u32,

    fade: FadeEngine,
    solar: SolarEngine,
    output: ChannelOutputMapper,

    rendered: Option<Color>,
    color_to_resume: Option<Color>,
    started: bool,
}

impl<'a, D, S, C, P> LightController<'a, D, S, C, P>
where
    D: ChannelDriver,
    S: SettingsStore,
    C: WallClock,
    P: PowerSupervisor,
{
    pub fn new(
        shared: &'a LightShared,
        driver: D,
        store: &'a S,
        clock: &'a C,
        power: &'a P,
        config: LightConfig,
    ) -> Self {
        let settings = shared.settings();
        let revision = shared.revision();
        Self {
            output: ChannelOutputMapper::new(config.channels, settings.correction),
            shared,
            driver,
            store,
            clock,
            power,
            config,
            settings,
            revision,
            fade: FadeEngine::new(),
            solar: SolarEngine::new(),
            rendered: None,
            color_to_resume: None,
            started: false,
        }
    }

    /// Process one render period
    ///
    /// Persistence and solar failures are reported after the tick finished
    /// rendering. A driver failure requests a protective shutdown.
    pub fn tick(&mut self, now: Instant) -> Result<(), LightError> {
        let mut result = Ok(());

        self.sync_settings();
        if !self.started {
            self.started = true;
            if self.power.is_on() {
                keep_first(&mut result, self.fade_to_normal(now));
            }
        }

        keep_first(&mut result, self.process_transitions(now));
        keep_first(&mut result, self.process_events(now));
        keep_first(&mut result, self.run(now));
        self.render()?;

        result
    }

    /// Last duty written per channel
    pub fn duties(&self) -> heapless::Vec<Duty, MAX_CHANNELS> {
        self.output.duties()
    }

    pub fn config(&self) -> &LightConfig {
        &self.config
    }

    pub fn is_fading(&self) -> bool {
        self.fade.is_fading()
    }

    /// Today's solar curve, if one has been generated
    pub fn solar(&self) -> &SolarEngine {
        &self.solar
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    fn sync_settings(&mut self) {
        if let Some((settings, revision)) = self.shared.settings_since(self.revision) {
            self.settings = settings;
            self.revision = revision;
            self.output.set_method(self.settings.correction);
        }
    }

    fn process_transitions(&mut self, now: Instant) -> Result<(), LightError> {
        let mut result = Ok(());
        while let Some(transition) = self.shared.next_transition() {
            keep_first(&mut result, self.apply_transition(transition, now));
        }
        result
    }

    /// Switch state bypassing the transition rules
    fn force_state(&mut self, to: State, now: Instant) -> Result<(), LightError> {
        let mut result = Ok(());
        for transition in self.shared.force_transition(to) {
            keep_first(&mut result, self.apply_transition(transition, now));
        }
        result
    }

    /// Switch state from inside the render task
    fn switch_state(&mut self, to: State, now: Instant) -> Result<(), LightError> {
        critical_section::with(|cs| self.shared.begin_transition(cs, to))?;
        self.process_transitions(now)
    }

    fn apply_transition(&mut self, transition: Transition, now: Instant) -> Result<(), LightError> {
        crate::log::info!(
            "light",
            "switching state from {} to {}",
            transition.from.as_str(),
            transition.to.as_str()
        );
        self.exit(transition.from);
        let result = self.enter(transition.to, transition.from, now);
        self.shared.notify(LightNotification::StateChanged {
            from: transition.from,
            to: transition.to,
        });
        result
    }

    fn enter(&mut self, state: State, from: State, now: Instant) -> Result<(), LightError> {
        match state {
            State::Normal => self.normal_entry(from, now),
            State::Dimming => {
                self.stop_fade();
                crate::log::info!("light", "entering dimming mode");
                Ok(())
            }
            State::Temporary => self.temporary_entry(now),
            State::Preview => {
                self.preview_entry();
                Ok(())
            }
        }
    }

    fn exit(&mut self, state: State) {
        match state {
            State::Normal => self.stop_fade(),
            State::Dimming => {}
            State::Temporary => self.shared.with_status(|status| status.temporary_off = None),
            State::Preview => self.preview_exit(),
        }
    }

    fn normal_entry(&mut self, from: State, now: Instant) -> Result<(), LightError> {
        let mut result = Ok(());
        if self.settings.mode == Mode::Sun {
            self.solar.invalidate();
            keep_first(&mut result, self.update_solar().map(|_| ()));
        }
        if matches!(from, State::Dimming | State::Preview) {
            keep_first(&mut result, self.persist());
        }
        keep_first(&mut result, self.fade_to_normal(now));
        result
    }

    fn temporary_entry(&mut self, now: Instant) -> Result<(), LightError> {
        let timings = self.config.timings;
        let hold = Duration::from_secs(u64::from(self.settings.temporary_duration) * 60);
        self.shared
            .with_status(|status| status.temporary_off = Some(now + hold + timings.temporary));
        let target = self.settings.manual_color.clone();
        self.start_fade(target, timings.temporary, now)
    }

    fn preview_entry(&mut self) {
        let schedule = &self.settings.schedule;
        let (Some(first), Some(last)) = (schedule.first_instant(), schedule.last_instant()) else {
            return;
        };
        if schedule.len() < 2 {
            return;
        }
        let utc = self.clock.now_utc().unwrap_or(0);
        let offset = self.local_offset();
        let midnight = solar::next_local_midnight(utc, offset) - i64::from(SECS_PER_DAY);

        let color = self.shared.with_status(|status| {
            status.preview = Some(PreviewClock {
                now_utc: midnight + i64::from(first),
                end_utc: midnight + i64::from(last),
            });
            status.color.clone()
        });
        self.color_to_resume = Some(color);
        crate::log::info!("light", "preview started");
    }

    fn preview_exit(&mut self) {
        let resume = self.color_to_resume.take();
        self.shared.with_status(|status| {
            status.preview = None;
            if let Some(color) = resume {
                status.color = color;
            }
        });
        crate::log::info!("light", "preview ended");
    }

    fn process_events(&mut self, now: Instant) -> Result<(), LightError> {
        let mut result = Ok(());
        while let Some(event) = self.shared.next_event() {
            keep_first(&mut result, self.handle_event(event, now));
        }
        result
    }

    fn handle_event(&mut self, event: SystemEvent, now: Instant) -> Result<(), LightError> {
        match event {
            SystemEvent::Fault => {
                let result = self.force_state(State::Normal, now);
                self.stop_fade();
                self.set_color(Color::blank(self.config.channels));
                result
            }
            SystemEvent::PowerOff | SystemEvent::ShutdownScheduled => {
                let result = self.force_state(State::Normal, now);
                self.start_fade(
                    Color::blank(self.config.channels),
                    self.config.timings.power_off,
                    now,
                )?;
                result
            }
            SystemEvent::PowerOn => {
                if self.shared.with_status(|status| status.state) == State::Normal {
                    self.fade_to_normal(now)
                } else {
                    self.force_state(State::Normal, now)
                }
            }
            SystemEvent::GeoLocationChanged => {
                self.sync_settings();
                self.solar.invalidate();
                if self.settings.mode == Mode::Sun {
                    self.update_solar()?;
                }
                Ok(())
            }
            SystemEvent::TemporaryToggle => {
                if !self.power.is_on() {
                    return Ok(());
                }
                match self.shared.with_status(|status| status.state) {
                    State::Normal if self.settings.mode.is_timed() => {
                        self.switch_state(State::Temporary, now)
                    }
                    State::Temporary => self.switch_state(State::Normal, now),
                    _ => Ok(()),
                }
            }
        }
    }

    fn run(&mut self, now: Instant) -> Result<(), LightError> {
        if let Some(color) = self.fade.tick(now) {
            let fading = self.fade.job().cloned();
            self.shared.with_status(|status| {
                status.color = color;
                status.fade = fading;
            });
            return Ok(());
        }

        match self.shared.with_status(|status| status.state) {
            State::Normal => self.normal_run(),
            State::Dimming => Ok(()),
            State::Temporary => self.temporary_run(now),
            State::Preview => self.preview_run(now),
        }
    }

    fn normal_run(&mut self) -> Result<(), LightError> {
        if !self.power.is_on() {
            self.set_color(Color::blank(self.config.channels));
            return Ok(());
        }
        let Some(utc) = self.clock.now_utc() else {
            if self.settings.mode == Mode::Manual {
                self.set_color(self.settings.manual_color.clone());
            }
            return Ok(());
        };

        let mut result = Ok(());
        let mut color = match self.mode_color(utc) {
            Ok(color) => color,
            Err(error) => {
                result = Err(error);
                Color::blank(self.config.channels)
            }
        };
        match acclimation::apply(
            &self.settings.acclimation,
            self.settings.acclimation_enabled,
            utc,
            &mut color,
        ) {
            AcclimationOutcome::Applied(_) => {
                self.shared
                    .with_status(|status| status.acclimation_activated = true);
            }
            AcclimationOutcome::Inactive => {
                self.shared
                    .with_status(|status| status.acclimation_activated = false);
            }
            AcclimationOutcome::Expired => {
                crate::log::info!("acclimation", "ramp finished");
                keep_first(&mut result, terminate_acclimation(self.shared, self.store));
                self.sync_settings();
            }
        }
        self.set_color(color);
        result
    }

    fn temporary_run(&mut self, now: Instant) -> Result<(), LightError> {
        let off = self.shared.with_status(|status| status.temporary_off);
        if off.is_none_or(|off| now >= off) {
            return self.switch_state(State::Normal, now);
        }
        self.set_color(self.settings.manual_color.clone());
        Ok(())
    }

    fn preview_run(&mut self, now: Instant) -> Result<(), LightError> {
        let Some(clock) = self.shared.with_status(|status| status.preview) else {
            return self.switch_state(State::Dimming, now);
        };
        if clock.now_utc >= clock.end_utc {
            return self.switch_state(State::Dimming, now);
        }
        let color = self
            .settings
            .schedule
            .color_at(self.second_of_day(clock.now_utc), self.config.channels);
        let step = i64::from(self.config.preview_step);
        self.shared.with_status(|status| {
            status.color = color;
            if let Some(preview) = status.preview.as_mut() {
                preview.now_utc += step;
            }
        });
        Ok(())
    }

    /// Color of the active mode at `utc`, before acclimation
    fn mode_color(&mut self, utc: i64) -> Result<Color, LightError> {
        let second = self.second_of_day(utc);
        let channels = self.config.channels;
        match self.settings.mode {
            Mode::Manual => Ok(self.settings.manual_color.clone()),
            Mode::Scheduled => Ok(self.settings.schedule.color_at(second, channels)),
            Mode::Sun => {
                let curve = self.update_solar()?;
                Ok(curve.color_at(second, channels))
            }
        }
    }

    /// Regenerate the solar curve if it went stale
    fn update_solar(&mut self) -> Result<&crate::schedule::Schedule, LightError> {
        let inputs = self.solar_inputs().ok_or(LightError::SunUnavailable)?;
        let utc = self.clock.now_utc().ok_or(LightError::SunUnavailable)?;
        if self.solar.is_stale(&inputs, utc) {
            let regenerated = self
                .solar
                .regenerate(&inputs, &self.settings.sun_color, utc)
                .map(|_| ());
            if let Err(error) = regenerated {
                crate::log::error!("solar", "failed to update the solar curve: {}", error);
                self.solar.invalidate();
                return Err(error.into());
            }
        }
        self.solar.curve().ok_or(LightError::SunUnavailable)
    }

    fn solar_inputs(&self) -> Option<SolarInputs> {
        let location = self.settings.location?;
        let local_offset = self.clock.local_offset()?;
        Some(SolarInputs {
            location,
            target_offset: self.settings.timezone.active_offset().unwrap_or(local_offset),
            local_offset,
        })
    }

    fn local_offset(&self) -> i32 {
        self.clock.local_offset().unwrap_or(0)
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn second_of_day(&self, utc: i64) -> u32 {
        (utc + i64::from(self.local_offset())).rem_euclid(i64::from(SECS_PER_DAY)) as u32
    }

    /// Fade towards the color the active mode shows once the fade ends
    #[allow(clippy::cast_possible_wrap)]
    fn fade_to_normal(&mut self, now: Instant) -> Result<(), LightError> {
        let duration = self.config.timings.power_on;
        let target = match self.clock.now_utc() {
            Some(utc) => {
                let at = utc + duration.as_secs() as i64;
                let mut color = self.mode_color(at)?;
                let _ = acclimation::apply(
                    &self.settings.acclimation,
                    self.settings.acclimation_enabled,
                    at,
                    &mut color,
                );
                color
            }
            None if self.settings.mode == Mode::Manual => self.settings.manual_color.clone(),
            None => return Ok(()),
        };
        self.start_fade(target, duration, now)
    }

    fn start_fade(&mut self, target: Color, duration: Duration, now: Instant) -> Result<(), LightError> {
        let current = self.shared.with_status(|status| status.color.clone());
        self.fade.start(&current, target, duration, now)?;
        let job = self.fade.job().cloned();
        self.shared.with_status(|status| status.fade = job);
        crate::log::info!("fade", "fading over {} ms", duration.as_millis());
        Ok(())
    }

    fn stop_fade(&mut self) {
        if self.fade.is_fading() {
            self.fade.stop();
            self.shared.with_status(|status| status.fade = None);
        }
    }

    fn set_color(&self, color: Color) {
        self.shared.with_status(|status| {
            if status.color != color {
                status.color = color;
            }
        });
    }

    fn persist(&self) -> Result<(), LightError> {
        match self.store.save_light(&self.settings) {
            Ok(()) => {
                crate::log::info!("light", "settings saved");
                Ok(())
            }
            Err(error) => {
                crate::log::error!("light", "failed to save settings: {}", error);
                Err(error.into())
            }
        }
    }

    /// Write the live color to the driver
    fn render(&mut self) -> Result<(), LightError> {
        let color = self.shared.with_status(|status| status.color.clone());
        if let Err(error) = self.output.write(&mut self.driver, &color) {
            crate::log::error!("light", "failed to drive channels: {}", error);
            self.power.shutdown(ShutdownReason::ActuatorFault);
            return Err(error.into());
        }
        if self.rendered.as_ref() != Some(&color) {
            self.rendered = Some(color);
            self.shared.notify(LightNotification::ColorChanged);
        }
        Ok(())
    }
}

/// Record `next` unless an earlier error is already kept
fn keep_first(result: &mut Result<(), LightError>, next: Result<(), LightError>) {
    if result.is_ok() {
        *result = next;
    }
}
