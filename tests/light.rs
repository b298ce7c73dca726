mod tests {
    use std::cell::{Cell, RefCell};

    use aquarium_light_core::acclimation::AcclimationSettings;
    use aquarium_light_core::color::{Color, CorrectionMethod, Duty};
    use aquarium_light_core::driver::{
        ChannelDriver, DriverError, PowerSupervisor, SettingsStore, StoreError, WallClock,
    };
    use aquarium_light_core::events::{LightNotification, ShutdownReason, SystemEvent};
    use aquarium_light_core::light::{
        LightApi, LightController, LightError, LightShared, State, ValidationError,
    };
    use aquarium_light_core::render_loop::RenderLoop;
    use aquarium_light_core::schedule::{Schedule, ScheduleItem};
    use aquarium_light_core::settings::{DEFAULT_LOCATION, LightConfig, Mode, Settings};
    use aquarium_light_core::solar::{GeoLocation, SolarError};
    use aquarium_light_core::thermal::ThermalSettings;
    use embassy_time::{Duration, Instant};

    const CHANNELS: usize = 2;
    const DAY: i64 = 86_400;
    /// 2024-06-21 00:00 UTC
    const SOLSTICE: i64 = 1_718_928_000;

    #[derive(Default)]
    struct TestStore {
        light: RefCell<Option<Settings>>,
        saves: Cell<usize>,
        fail: Cell<bool>,
    }

    impl SettingsStore for TestStore {
        fn load_light(&self) -> Result<Option<Settings>, StoreError> {
            if self.fail.get() {
                return Err(StoreError);
            }
            Ok(self.light.borrow().clone())
        }

        fn save_light(&self, settings: &Settings) -> Result<(), StoreError> {
            if self.fail.get() {
                return Err(StoreError);
            }
            *self.light.borrow_mut() = Some(settings.clone());
            self.saves.set(self.saves.get() + 1);
            Ok(())
        }

        fn load_thermal(&self) -> Result<Option<ThermalSettings>, StoreError> {
            Ok(None)
        }

        fn save_thermal(&self, _settings: &ThermalSettings) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct TestClock {
        utc: Cell<Option<i64>>,
        offset: Cell<Option<i32>>,
    }

    impl TestClock {
        fn at(utc: i64, offset: i32) -> Self {
            Self {
                utc: Cell::new(Some(utc)),
                offset: Cell::new(Some(offset)),
            }
        }
    }

    impl WallClock for TestClock {
        fn now_utc(&self) -> Option<i64> {
            self.utc.get()
        }

        fn local_offset(&self) -> Option<i32> {
            self.offset.get()
        }
    }

    struct TestPower {
        on: Cell<bool>,
        shutdowns: RefCell<Vec<ShutdownReason>>,
    }

    impl TestPower {
        fn on() -> Self {
            Self {
                on: Cell::new(true),
                shutdowns: RefCell::new(Vec::new()),
            }
        }
    }

    impl PowerSupervisor for TestPower {
        fn is_on(&self) -> bool {
            self.on.get()
        }

        fn shutdown(&self, reason: ShutdownReason) {
            self.shutdowns.borrow_mut().push(reason);
        }
    }

    #[derive(Default)]
    struct TestDriver {
        duties: [Duty; CHANNELS],
        writes: usize,
        fail: bool,
    }

    impl ChannelDriver for TestDriver {
        fn set_duty(&mut self, channel: usize, duty: Duty, _phase: Duty) -> Result<(), DriverError> {
            if self.fail {
                return Err(DriverError);
            }
            self.duties[channel] = duty;
            self.writes += 1;
            Ok(())
        }
    }

    fn color(values: &[u16]) -> Color {
        Color::from_slice(values).unwrap()
    }

    fn at(ms: u64) -> Instant {
        Instant::from_millis(ms)
    }

    /// Factory settings with a linear curve so duties equal brightness
    fn linear_settings() -> Settings {
        Settings {
            correction: CorrectionMethod::Linear,
            ..Settings::default_for(CHANNELS)
        }
    }

    fn shared(settings: Settings) -> LightShared {
        LightShared::new(&LightConfig::new(CHANNELS), settings)
    }

    fn controller<'a>(
        shared: &'a LightShared,
        store: &'a TestStore,
        clock: &'a TestClock,
        power: &'a TestPower,
    ) -> LightController<'a, TestDriver, TestStore, TestClock, TestPower> {
        LightController::new(
            shared,
            TestDriver::default(),
            store,
            clock,
            power,
            LightConfig::new(CHANNELS),
        )
    }

    #[test]
    fn test_startup_fades_to_manual_color() {
        let shared = shared(linear_settings());
        let (store, clock, power) = (TestStore::default(), TestClock::default(), TestPower::on());
        let mut light = controller(&shared, &store, &clock, &power);

        light.tick(at(0)).unwrap();
        assert!(light.is_fading());
        assert_eq!(light.driver().duties, [0, 0]);

        light.tick(at(2500)).unwrap();
        assert_eq!(shared.status().color, color(&[3, 3]));

        light.tick(at(5000)).unwrap();
        assert!(!light.is_fading());
        assert_eq!(light.driver().duties, [5, 5]);

        light.tick(at(5010)).unwrap();
        assert_eq!(shared.status().state, State::Normal);
        assert_eq!(light.duties().as_slice(), &[5, 5]);
    }

    #[test]
    fn test_requests_need_power() {
        let shared = shared(linear_settings());
        let (store, clock) = (TestStore::default(), TestClock::default());
        let power = TestPower::on();
        power.on.set(false);
        let api = LightApi::new(&shared, &store, &clock, &power);

        assert_eq!(api.switch_state(State::Dimming), Err(LightError::NotPowered));
        assert_eq!(api.set_mode(Mode::Scheduled), Err(LightError::NotPowered));
        assert_eq!(api.set_color(color(&[1, 1])), Err(LightError::NotPowered));
        assert_eq!(api.state(), State::Normal);
    }

    #[test]
    fn test_unpowered_normal_is_blank() {
        let settings = Settings {
            manual_color: color(&[1000, 1000]),
            ..linear_settings()
        };
        let shared = shared(settings);
        let (store, clock) = (TestStore::default(), TestClock::default());
        let power = TestPower::on();
        power.on.set(false);
        let mut light = controller(&shared, &store, &clock, &power);

        light.tick(at(0)).unwrap();
        assert!(!light.is_fading());
        assert_eq!(light.driver().duties, [0, 0]);
    }

    #[test]
    fn test_illegal_transitions() {
        let shared = shared(linear_settings());
        let (store, clock, power) = (TestStore::default(), TestClock::default(), TestPower::on());
        let api = LightApi::new(&shared, &store, &clock, &power);
        let mut light = controller(&shared, &store, &clock, &power);
        light.tick(at(0)).unwrap();

        assert_eq!(
            api.switch_state(State::Preview),
            Err(LightError::IllegalTransition {
                from: State::Normal,
                to: State::Preview
            })
        );
        assert_eq!(
            api.switch_state(State::Normal),
            Err(LightError::IllegalTransition {
                from: State::Normal,
                to: State::Normal
            })
        );
        assert_eq!(
            api.switch_state(State::Temporary),
            Err(LightError::IllegalTransition {
                from: State::Normal,
                to: State::Temporary
            })
        );

        api.switch_state(State::Dimming).unwrap();
        assert_eq!(api.state(), State::Dimming);
        assert_eq!(
            api.switch_state(State::Preview),
            Err(LightError::Validation(ValidationError::PreviewTooShort {
                items: 0
            }))
        );
        assert_eq!(
            api.switch_state(State::Temporary),
            Err(LightError::IllegalTransition {
                from: State::Dimming,
                to: State::Temporary
            })
        );
    }

    #[test]
    fn test_state_switch_table() {
        use State::{Dimming, Normal, Preview, Temporary};
        let allowed = [
            (Normal, Dimming),
            (Normal, Temporary),
            (Dimming, Normal),
            (Dimming, Preview),
            (Temporary, Normal),
            (Preview, Dimming),
        ];
        for from in [Normal, Dimming, Temporary, Preview] {
            for to in [Normal, Dimming, Temporary, Preview] {
                assert_eq!(
                    from.can_switch_to(to),
                    allowed.contains(&(from, to)),
                    "{} -> {}",
                    from.as_str(),
                    to.as_str()
                );
            }
        }
    }

    #[test]
    fn test_set_color_only_while_dimming() {
        let shared = shared(linear_settings());
        let (store, clock, power) = (TestStore::default(), TestClock::default(), TestPower::on());
        let api = LightApi::new(&shared, &store, &clock, &power);
        let mut light = controller(&shared, &store, &clock, &power);
        light.tick(at(0)).unwrap();

        assert_eq!(
            api.set_color(color(&[100, 200])),
            Err(LightError::WrongState(State::Normal))
        );
        assert!(matches!(
            api.set_color(color(&[1, 2, 3])),
            Err(LightError::Validation(ValidationError::Color(_)))
        ));

        api.switch_state(State::Dimming).unwrap();
        light.tick(at(10)).unwrap();
        assert!(!light.is_fading());

        api.set_color(color(&[100, 200])).unwrap();
        assert_eq!(api.color(), color(&[100, 200]));
        light.tick(at(20)).unwrap();
        assert_eq!(light.driver().duties, [100, 200]);
        assert_eq!(api.settings().manual_color, color(&[100, 200]));
        assert_eq!(store.saves.get(), 0);

        api.switch_state(State::Normal).unwrap();
        light.tick(at(30)).unwrap();
        assert_eq!(store.saves.get(), 1);
        assert_eq!(
            store.light.borrow().as_ref().map(|settings| settings.manual_color.clone()),
            Some(color(&[100, 200]))
        );

        light.tick(at(6000)).unwrap();
        assert_eq!(light.driver().duties, [100, 200]);
    }

    #[test]
    fn test_preview_plays_schedule() {
        let settings = Settings {
            schedule: Schedule::from_items(
                &[
                    ScheduleItem::new(0, color(&[0, 0])),
                    ScheduleItem::new(600, color(&[600, 600])),
                ],
                CHANNELS,
            )
            .unwrap(),
            ..linear_settings()
        };
        let shared = shared(settings);
        let (store, power) = (TestStore::default(), TestPower::on());
        let clock = TestClock::at(SOLSTICE + 3600, 0);
        let api = LightApi::new(&shared, &store, &clock, &power);
        let mut light = controller(&shared, &store, &clock, &power);
        light.tick(at(0)).unwrap();

        api.switch_state(State::Dimming).unwrap();
        light.tick(at(10)).unwrap();
        api.set_color(color(&[7, 7])).unwrap();
        api.switch_state(State::Preview).unwrap();

        let mut shown = Vec::new();
        for tick in 0..10u64 {
            light.tick(at(20 + tick * 10)).unwrap();
            assert_eq!(api.state(), State::Preview);
            shown.push(shared.status().color.get(0).unwrap());
        }
        assert_eq!(shown, vec![0, 60, 120, 180, 240, 300, 360, 420, 480, 540]);
        let clock_now = shared.status().preview.unwrap();
        assert_eq!(clock_now.now_utc, SOLSTICE + 600);
        assert_eq!(clock_now.end_utc, SOLSTICE + 600);

        light.tick(at(200)).unwrap();
        assert_eq!(api.state(), State::Dimming);
        assert_eq!(shared.status().preview, None);
        assert_eq!(shared.status().color, color(&[7, 7]));
        assert_eq!(light.driver().duties, [7, 7]);
    }

    #[test]
    fn test_scheduled_mode_ends_preview() {
        let settings = Settings {
            schedule: Schedule::from_items(
                &[
                    ScheduleItem::new(0, color(&[0, 0])),
                    ScheduleItem::new(3600, color(&[100, 100])),
                ],
                CHANNELS,
            )
            .unwrap(),
            ..linear_settings()
        };
        let shared = shared(settings);
        let (store, power) = (TestStore::default(), TestPower::on());
        let clock = TestClock::at(SOLSTICE, 0);
        let api = LightApi::new(&shared, &store, &clock, &power);
        let mut light = controller(&shared, &store, &clock, &power);
        light.tick(at(0)).unwrap();

        api.switch_state(State::Dimming).unwrap();
        api.switch_state(State::Preview).unwrap();
        light.tick(at(10)).unwrap();
        assert_eq!(api.state(), State::Preview);

        assert_eq!(
            api.set_mode(Mode::Sun),
            Err(LightError::WrongState(State::Preview))
        );
        api.set_mode(Mode::Scheduled).unwrap();
        assert_eq!(api.state(), State::Dimming);
        assert_eq!(api.mode(), Mode::Scheduled);

        light.tick(at(20)).unwrap();
        assert_eq!(shared.status().preview, None);
    }

    #[test]
    fn test_mode_rules() {
        let shared = shared(linear_settings());
        let (store, power) = (TestStore::default(), TestPower::on());
        let clock = TestClock {
            utc: Cell::new(Some(SOLSTICE)),
            offset: Cell::new(None),
        };
        let api = LightApi::new(&shared, &store, &clock, &power);
        let mut light = controller(&shared, &store, &clock, &power);
        light.tick(at(0)).unwrap();

        assert_eq!(
            api.set_mode(Mode::Scheduled),
            Err(LightError::WrongState(State::Normal))
        );

        api.switch_state(State::Dimming).unwrap();
        light.tick(at(10)).unwrap();
        assert_eq!(
            api.set_mode(Mode::Manual),
            Err(LightError::ModeUnchanged(Mode::Manual))
        );
        assert_eq!(api.set_mode(Mode::Sun), Err(LightError::SunUnavailable));

        api.set_location(DEFAULT_LOCATION).unwrap();
        assert_eq!(store.saves.get(), 1);
        assert_eq!(api.set_mode(Mode::Sun), Err(LightError::SunUnavailable));
        assert_eq!(api.mode(), Mode::Manual);

        api.set_mode(Mode::Scheduled).unwrap();
        assert_eq!(api.mode(), Mode::Scheduled);
        assert_eq!(store.saves.get(), 1);

        api.switch_state(State::Normal).unwrap();
        light.tick(at(20)).unwrap();
        assert_eq!(store.saves.get(), 2);
        assert_eq!(
            store.light.borrow().as_ref().map(|settings| settings.mode),
            Some(Mode::Scheduled)
        );
    }

    #[test]
    fn test_temporary_override() {
        let settings = Settings {
            mode: Mode::Scheduled,
            manual_color: color(&[50, 50]),
            schedule: Schedule::from_items(&[ScheduleItem::new(0, color(&[300, 300]))], CHANNELS)
                .unwrap(),
            ..linear_settings()
        };
        let shared = shared(settings);
        let (store, power) = (TestStore::default(), TestPower::on());
        let clock = TestClock::at(SOLSTICE, 0);
        let api = LightApi::new(&shared, &store, &clock, &power);
        let mut light = controller(&shared, &store, &clock, &power);

        light.tick(at(0)).unwrap();
        light.tick(at(5000)).unwrap();
        assert_eq!(light.driver().duties, [300, 300]);
        assert_eq!(api.temporary_remaining(at(5000)), None);

        api.switch_state(State::Temporary).unwrap();
        light.tick(at(6000)).unwrap();
        assert_eq!(api.state(), State::Temporary);
        assert_eq!(api.temporary_remaining(at(6000)), Some(1205));
        assert_eq!(api.temporary_remaining(at(6400)), Some(1205));
        assert_eq!(api.temporary_remaining(at(6600)), Some(1204));

        light.tick(at(11_000)).unwrap();
        assert_eq!(light.driver().duties, [50, 50]);
        assert_eq!(
            api.switch_state(State::Dimming),
            Err(LightError::IllegalTransition {
                from: State::Temporary,
                to: State::Dimming
            })
        );
        assert_eq!(api.state(), State::Temporary);

        light.tick(at(1_210_990)).unwrap();
        assert_eq!(api.state(), State::Temporary);

        light.tick(at(1_211_000)).unwrap();
        assert_eq!(api.state(), State::Normal);
        assert_eq!(api.temporary_remaining(at(1_211_000)), None);
        assert!(light.is_fading());

        light.tick(at(1_216_000)).unwrap();
        assert_eq!(light.driver().duties, [300, 300]);
        assert_eq!(store.saves.get(), 0);
    }

    #[test]
    fn test_temporary_toggle_event() {
        let settings = Settings {
            mode: Mode::Scheduled,
            schedule: Schedule::from_items(&[ScheduleItem::new(0, color(&[300, 300]))], CHANNELS)
                .unwrap(),
            ..linear_settings()
        };
        let shared = shared(settings);
        let (store, power) = (TestStore::default(), TestPower::on());
        let clock = TestClock::at(SOLSTICE, 0);
        let mut light = controller(&shared, &store, &clock, &power);
        light.tick(at(0)).unwrap();

        shared.events().try_send(SystemEvent::TemporaryToggle).unwrap();
        light.tick(at(10)).unwrap();
        assert_eq!(shared.status().state, State::Temporary);

        shared.events().try_send(SystemEvent::TemporaryToggle).unwrap();
        light.tick(at(20)).unwrap();
        assert_eq!(shared.status().state, State::Normal);

        power.on.set(false);
        shared.events().try_send(SystemEvent::TemporaryToggle).unwrap();
        light.tick(at(30)).unwrap();
        assert_eq!(shared.status().state, State::Normal);
    }

    #[test]
    fn test_power_off_fades_to_black() {
        let settings = Settings {
            manual_color: color(&[1000, 1000]),
            ..linear_settings()
        };
        let shared = shared(settings);
        let (store, clock, power) = (TestStore::default(), TestClock::default(), TestPower::on());
        let mut light = controller(&shared, &store, &clock, &power);
        light.tick(at(0)).unwrap();
        light.tick(at(5000)).unwrap();
        assert_eq!(light.driver().duties, [1000, 1000]);

        power.on.set(false);
        shared.events().try_send(SystemEvent::PowerOff).unwrap();
        light.tick(at(6000)).unwrap();
        assert!(light.is_fading());
        assert_eq!(light.driver().duties, [1000, 1000]);

        light.tick(at(7500)).unwrap();
        assert_eq!(light.driver().duties, [500, 500]);

        light.tick(at(9000)).unwrap();
        assert!(!light.is_fading());
        assert_eq!(light.driver().duties, [0, 0]);

        light.tick(at(9010)).unwrap();
        assert_eq!(light.driver().duties, [0, 0]);
    }

    #[test]
    fn test_power_off_leaves_dimming() {
        let shared = shared(linear_settings());
        let (store, clock, power) = (TestStore::default(), TestClock::default(), TestPower::on());
        let api = LightApi::new(&shared, &store, &clock, &power);
        let mut light = controller(&shared, &store, &clock, &power);
        light.tick(at(0)).unwrap();
        api.switch_state(State::Dimming).unwrap();
        light.tick(at(10)).unwrap();

        shared.events().try_send(SystemEvent::ShutdownScheduled).unwrap();
        light.tick(at(20)).unwrap();
        assert_eq!(api.state(), State::Normal);
        assert_eq!(store.saves.get(), 1);
        assert_eq!(
            light.is_fading().then(|| shared.status().fade.unwrap().end_color),
            Some(Color::blank(CHANNELS))
        );
    }

    #[test]
    fn test_fault_blanks_immediately() {
        let settings = Settings {
            manual_color: color(&[1000, 1000]),
            ..linear_settings()
        };
        let shared = shared(settings);
        let (store, clock, power) = (TestStore::default(), TestClock::default(), TestPower::on());
        let api = LightApi::new(&shared, &store, &clock, &power);
        let mut light = controller(&shared, &store, &clock, &power);
        light.tick(at(0)).unwrap();
        light.tick(at(5000)).unwrap();
        api.switch_state(State::Dimming).unwrap();
        light.tick(at(5010)).unwrap();

        power.on.set(false);
        shared.events().try_send(SystemEvent::Fault).unwrap();
        light.tick(at(5020)).unwrap();
        assert_eq!(api.state(), State::Normal);
        assert!(!light.is_fading());
        assert_eq!(light.driver().duties, [0, 0]);

        light.tick(at(5030)).unwrap();
        assert_eq!(light.driver().duties, [0, 0]);
    }

    #[test]
    fn test_power_on_restores_normal_color() {
        let settings = Settings {
            manual_color: color(&[1000, 1000]),
            ..linear_settings()
        };
        let shared = shared(settings);
        let (store, clock) = (TestStore::default(), TestClock::default());
        let power = TestPower::on();
        power.on.set(false);
        let mut light = controller(&shared, &store, &clock, &power);
        light.tick(at(0)).unwrap();
        assert_eq!(light.driver().duties, [0, 0]);

        power.on.set(true);
        shared.events().try_send(SystemEvent::PowerOn).unwrap();
        light.tick(at(10)).unwrap();
        assert!(light.is_fading());

        light.tick(at(5010)).unwrap();
        assert_eq!(light.driver().duties, [1000, 1000]);
    }

    #[test]
    fn test_acclimation_scales_and_expires() {
        let start = SOLSTICE;
        let settings = Settings {
            manual_color: color(&[1000, 100]),
            acclimation: AcclimationSettings {
                start_utc: start,
                duration: 10,
                start_percent: 30,
            },
            acclimation_enabled: true,
            ..linear_settings()
        };
        let shared = shared(settings);
        let (store, power) = (TestStore::default(), TestPower::on());
        let clock = TestClock::at(start + 5 * DAY, 0);
        let api = LightApi::new(&shared, &store, &clock, &power);
        let mut light = controller(&shared, &store, &clock, &power);

        light.tick(at(0)).unwrap();
        light.tick(at(5000)).unwrap();
        assert_eq!(light.driver().duties, [650, 65]);

        light.tick(at(5010)).unwrap();
        assert_eq!(light.driver().duties, [650, 65]);
        assert!(api.acclimation_activated());

        clock.utc.set(Some(start + 11 * DAY));
        light.tick(at(5020)).unwrap();
        assert_eq!(light.driver().duties, [1000, 100]);
        assert!(!api.acclimation_activated());
        assert!(!api.acclimation().1);
        assert_eq!(store.saves.get(), 1);
        assert_eq!(
            api.terminate_acclimation(),
            Err(LightError::AcclimationNotEnabled)
        );
    }

    #[test]
    fn test_acclimation_settings() {
        let shared = shared(linear_settings());
        let (store, clock, power) = (TestStore::default(), TestClock::default(), TestPower::on());
        let api = LightApi::new(&shared, &store, &clock, &power);

        let short = AcclimationSettings {
            start_utc: SOLSTICE,
            duration: 4,
            start_percent: 30,
        };
        assert!(matches!(
            api.set_acclimation(short, true),
            Err(LightError::Validation(ValidationError::Acclimation(_)))
        ));

        let ramp = AcclimationSettings {
            duration: 20,
            ..short
        };
        api.set_acclimation(ramp, true).unwrap();
        assert_eq!(api.acclimation(), (ramp, true));
        assert_eq!(store.saves.get(), 1);

        api.terminate_acclimation().unwrap();
        assert_eq!(api.acclimation(), (ramp, false));
        assert_eq!(store.saves.get(), 2);
    }

    #[test]
    fn test_sun_mode_follows_curve() {
        let settings = Settings {
            mode: Mode::Sun,
            sun_color: color(&[4095, 4095]),
            location: Some(DEFAULT_LOCATION),
            ..linear_settings()
        };
        let shared = shared(settings);
        let (store, power) = (TestStore::default(), TestPower::on());
        // 12:00 local time at UTC+8
        let clock = TestClock::at(SOLSTICE + 4 * 3600, 8 * 3600);
        let mut light = controller(&shared, &store, &clock, &power);

        light.tick(at(0)).unwrap();
        light.tick(at(5000)).unwrap();
        light.tick(at(5010)).unwrap();

        let curve = light.solar().curve().unwrap();
        assert_eq!(curve.len(), 8);
        let duty = light.driver().duties[0];
        assert!(duty > 3800, "duty {duty}");
        assert!(duty < 4095, "duty {duty}");
        assert_eq!(light.solar().next_refresh_utc(), SOLSTICE + 16 * 3600);
    }

    #[test]
    fn test_location_change_rebuilds_curve() {
        let settings = Settings {
            mode: Mode::Sun,
            sun_color: color(&[4095, 4095]),
            location: Some(DEFAULT_LOCATION),
            ..linear_settings()
        };
        let shared = shared(settings);
        let (store, power) = (TestStore::default(), TestPower::on());
        let clock = TestClock::at(SOLSTICE + 4 * 3600, 8 * 3600);
        let api = LightApi::new(&shared, &store, &clock, &power);
        let mut light = controller(&shared, &store, &clock, &power);
        light.tick(at(0)).unwrap();
        let before = light.solar().sun_times().unwrap();

        api.set_location(GeoLocation::new(0.0, 120.0).unwrap()).unwrap();
        light.tick(at(10)).unwrap();
        let after = light.solar().sun_times().unwrap();
        assert!(after.noon < before.noon);
    }

    #[test]
    fn test_target_timezone_moves_curve() {
        let settings = Settings {
            mode: Mode::Sun,
            sun_color: color(&[4095, 4095]),
            location: Some(DEFAULT_LOCATION),
            ..linear_settings()
        };
        let shared = shared(settings);
        let (store, power) = (TestStore::default(), TestPower::on());
        let clock = TestClock::at(SOLSTICE + 4 * 3600, 8 * 3600);
        let api = LightApi::new(&shared, &store, &clock, &power);
        let mut light = controller(&shared, &store, &clock, &power);
        light.tick(at(0)).unwrap();
        let device = light.solar().sun_times().unwrap();

        api.set_timezone_offset(0).unwrap();
        api.set_timezone_enabled(true).unwrap();
        light.tick(at(10)).unwrap();
        let target = light.solar().sun_times().unwrap();
        let shift = (device.noon - target.noon).rem_euclid(24.0);
        assert!((shift - 8.0).abs() < 0.01, "shift {shift}");
    }

    #[test]
    fn test_settings_validation() {
        let shared = shared(linear_settings());
        let (store, clock, power) = (TestStore::default(), TestClock::default(), TestPower::on());
        let api = LightApi::new(&shared, &store, &clock, &power);

        assert_eq!(
            api.set_location(GeoLocation {
                lat: 95.0,
                lng: 0.0
            }),
            Err(LightError::Validation(ValidationError::Location(
                SolarError::InvalidLatitude
            )))
        );
        assert_eq!(
            api.set_timezone_offset(15 * 3600),
            Err(LightError::Validation(ValidationError::TimezoneOffset(
                15 * 3600
            )))
        );
        assert_eq!(
            api.set_temporary_duration(0),
            Err(LightError::Validation(ValidationError::TemporaryDuration))
        );
        assert_eq!(store.saves.get(), 0);

        api.set_timezone_offset(-3600).unwrap();
        api.set_timezone_enabled(true).unwrap();
        assert_eq!(api.timezone().active_offset(), Some(-3600));
        api.set_temporary_duration(45).unwrap();
        assert_eq!(api.temporary_duration(), 45);
        api.set_correction(CorrectionMethod::Gamma).unwrap();
        assert_eq!(api.correction(), CorrectionMethod::Gamma);
        assert_eq!(store.saves.get(), 4);

        assert!(matches!(
            api.set_schedule(&[
                ScheduleItem::new(100, color(&[0, 0])),
                ScheduleItem::new(50, color(&[0, 0])),
            ]),
            Err(LightError::Validation(ValidationError::Schedule(_)))
        ));
    }

    #[test]
    fn test_persistence_failure_is_reported() {
        let shared = shared(linear_settings());
        let (store, clock, power) = (TestStore::default(), TestClock::default(), TestPower::on());
        store.fail.set(true);
        let api = LightApi::new(&shared, &store, &clock, &power);

        assert_eq!(
            api.set_correction(CorrectionMethod::Exp),
            Err(LightError::Persistence(StoreError))
        );
    }

    #[test]
    fn test_driver_failure_requests_shutdown() {
        let shared = shared(linear_settings());
        let (store, clock, power) = (TestStore::default(), TestClock::default(), TestPower::on());
        let mut light = controller(&shared, &store, &clock, &power);
        light.driver_mut().fail = true;

        assert_eq!(
            light.tick(at(0)),
            Err(LightError::Actuator(DriverError))
        );
        assert_eq!(*power.shutdowns.borrow(), vec![ShutdownReason::ActuatorFault]);
    }

    #[test]
    fn test_notifications() {
        let shared = shared(linear_settings());
        let (store, clock, power) = (TestStore::default(), TestClock::default(), TestPower::on());
        let api = LightApi::new(&shared, &store, &clock, &power);
        let mut light = controller(&shared, &store, &clock, &power);
        let notifications = shared.notifications();

        light.tick(at(0)).unwrap();
        api.switch_state(State::Dimming).unwrap();
        light.tick(at(10)).unwrap();

        assert_eq!(
            notifications.try_receive(),
            Ok(LightNotification::ColorChanged)
        );
        assert_eq!(
            notifications.try_receive(),
            Ok(LightNotification::StateChanged {
                from: State::Normal,
                to: State::Dimming
            })
        );
        assert!(notifications.try_receive().is_err());
    }

    #[test]
    fn test_load_falls_back_to_defaults() {
        let config = LightConfig::new(CHANNELS);
        let store = TestStore::default();

        let shared = LightShared::load(&config, &store).unwrap();
        assert_eq!(shared.settings(), Settings::default_for(CHANNELS));

        *store.light.borrow_mut() = Some(Settings::default_for(3));
        let shared = LightShared::load(&config, &store).unwrap();
        assert_eq!(shared.settings(), Settings::default_for(CHANNELS));

        let stored = Settings {
            mode: Mode::Scheduled,
            ..Settings::default_for(CHANNELS)
        };
        *store.light.borrow_mut() = Some(stored.clone());
        let shared = LightShared::load(&config, &store).unwrap();
        assert_eq!(shared.settings(), stored);

        store.fail.set(true);
        assert!(matches!(
            LightShared::load(&config, &store),
            Err(LightError::Persistence(StoreError))
        ));
    }

    #[test]
    fn test_render_loop_pacing() {
        let shared = shared(linear_settings());
        let (store, clock, power) = (TestStore::default(), TestClock::default(), TestPower::on());
        let mut render = RenderLoop::new(controller(&shared, &store, &clock, &power));
        assert_eq!(render.period(), Duration::from_millis(10));

        let result = render.tick(at(0));
        assert_eq!(result.sleep_duration, Duration::from_millis(10));
        assert!(result.outcome.is_ok());

        let result = render.tick(at(5));
        assert_eq!(result.next_deadline, at(20));
        assert_eq!(result.sleep_duration, Duration::from_millis(15));

        let result = render.tick(at(100));
        assert_eq!(result.next_deadline, at(110));
        assert_eq!(result.sleep_duration, Duration::from_millis(10));
        assert!(render.controller().is_fading());
    }
}
