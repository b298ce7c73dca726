use core::cell::RefCell;

use critical_section::{CriticalSection, Mutex};
use embassy_time::Instant;
use heapless::Vec;

use crate::color::Color;
use crate::driver::SettingsStore;
use crate::events::{
    LightNotification, NotificationChannel, Receiver, Sender, SystemEvent, SystemEventChannel,
    NOTIFICATION_CAPACITY, SYSTEM_EVENT_CAPACITY,
};
use crate::fade::FadeJob;
use crate::settings::{LightConfig, Settings};

use super::state::{State, Transition, TransitionQueue};
use super::LightError;

/// Number of state switches that can wait for the render task
pub const TRANSITION_CAPACITY: usize = 4;

pub(crate) const FORCED_BATCH: usize = TRANSITION_CAPACITY + 1;

/// Virtual clock of a running preview
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewClock {
    /// Simulated UTC timestamp shown by the current frame
    pub now_utc: i64,
    /// Simulated UTC timestamp at which playback ends
    pub end_utc: i64,
}

/// Runtime status of the light controller, never persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub state: State,
    /// Live color of every channel
    pub color: Color,
    /// Active fade, if any
    pub fade: Option<FadeJob>,
    pub preview: Option<PreviewClock>,
    /// Monotonic time a temporary override ends at
    pub temporary_off: Option<Instant>,
    /// Acclimation ramp is currently scaling the output
    pub acclimation_activated: bool,
}

impl Status {
    fn new(channels: usize) -> Self {
        Self {
            state: State::Normal,
            color: Color::blank(channels),
            fade: None,
            preview: None,
            temporary_off: None,
            acclimation_activated: false,
        }
    }
}

#[derive(Debug)]
struct SettingsCell {
    settings: Settings,
    revision: u32,
}

/// State shared by the render task, the request handlers and event sources
///
/// Every access is a short critical section; persistence and other slow work
/// happen on copies outside of it.
pub struct LightShared {
    channels: usize,
    settings: Mutex<RefCell<SettingsCell>>,
    status: Mutex<RefCell<Status>>,
    transitions: Mutex<RefCell<TransitionQueue<TRANSITION_CAPACITY>>>,
    events: SystemEventChannel,
    notifications: NotificationChannel,
}

impl LightShared {
    /// Create shared state from already loaded settings
    ///
    /// Settings that do not fit the configured channel count are replaced
    /// by factory defaults.
    pub fn new(config: &LightConfig, settings: Settings) -> Self {
        let channels = config.channels;
        let settings = if settings.is_consistent(channels) {
            settings
        } else {
            crate::log::warning!("light", "stored settings do not fit {} channels, using defaults", channels);
            Settings::default_for(channels)
        };
        Self {
            channels,
            settings: Mutex::new(RefCell::new(SettingsCell {
                settings,
                revision: 0,
            })),
            status: Mutex::new(RefCell::new(Status::new(channels))),
            transitions: Mutex::new(RefCell::new(TransitionQueue::new())),
            events: SystemEventChannel::new(),
            notifications: NotificationChannel::new(),
        }
    }

    /// Load settings from `store`, falling back to factory defaults
    pub fn load<S: SettingsStore>(config: &LightConfig, store: &S) -> Result<Self, LightError> {
        let settings = match store.load_light()? {
            Some(settings) => settings,
            None => {
                crate::log::info!("light", "no stored settings, using defaults");
                Settings::default_for(config.channels)
            }
        };
        Ok(Self::new(config, settings))
    }

    /// Number of output channels
    pub const fn channels(&self) -> usize {
        self.channels
    }

    /// Handle for posting system events to the controller
    pub const fn events(&self) -> Sender<'_, SystemEvent, SYSTEM_EVENT_CAPACITY> {
        self.events.sender()
    }

    /// Handle for reading controller notifications
    pub const fn notifications(&self) -> Receiver<'_, LightNotification, NOTIFICATION_CAPACITY> {
        self.notifications.receiver()
    }

    pub(crate) fn next_event(&self) -> Option<SystemEvent> {
        self.events.try_receive().ok()
    }

    pub(crate) fn post_event(&self, event: SystemEvent) -> Result<(), LightError> {
        self.events.try_send(event).map_err(|_| LightError::QueueFull)
    }

    pub(crate) fn notify(&self, notification: LightNotification) {
        if self.notifications.try_send(notification).is_err() {
            crate::log::warning!("light", "notification queue full, dropping {:?}", notification);
        }
    }

    /// Snapshot of the status
    pub fn status(&self) -> Status {
        self.with_status(|status| status.clone())
    }

    /// Snapshot of the settings
    pub fn settings(&self) -> Settings {
        critical_section::with(|cs| self.settings.borrow_ref(cs).settings.clone())
    }

    pub(crate) fn with_status<R>(&self, f: impl FnOnce(&mut Status) -> R) -> R {
        critical_section::with(|cs| f(&mut self.status.borrow_ref_mut(cs)))
    }

    pub(crate) fn with_settings<R>(&self, f: impl FnOnce(&Settings) -> R) -> R {
        critical_section::with(|cs| f(&self.settings.borrow_ref(cs).settings))
    }

    /// Mutate settings and return a snapshot for persistence
    pub(crate) fn update_settings(&self, f: impl FnOnce(&mut Settings)) -> Settings {
        critical_section::with(|cs| {
            let mut cell = self.settings.borrow_ref_mut(cs);
            f(&mut cell.settings);
            cell.revision = cell.revision.wrapping_add(1);
            cell.settings.clone()
        })
    }

    /// Copy of the settings if they changed since `revision`
    pub(crate) fn settings_since(&self, revision: u32) -> Option<(Settings, u32)> {
        critical_section::with(|cs| {
            let cell = self.settings.borrow_ref(cs);
            (cell.revision != revision).then(|| (cell.settings.clone(), cell.revision))
        })
    }

    pub(crate) fn revision(&self) -> u32 {
        critical_section::with(|cs| self.settings.borrow_ref(cs).revision)
    }

    /// Switch state and queue the hooks, under an already held section
    pub(crate) fn begin_transition(
        &self,
        cs: CriticalSection<'_>,
        to: State,
    ) -> Result<Transition, LightError> {
        let mut status = self.status.borrow_ref_mut(cs);
        let mut queue = self.transitions.borrow_ref_mut(cs);
        let transition = Transition {
            from: status.state,
            to,
        };
        queue.push(transition).map_err(|_| LightError::QueueFull)?;
        status.state = to;
        Ok(transition)
    }

    /// Switch state unconditionally
    ///
    /// Transitions still waiting for their hooks are drained first and
    /// returned ahead of the forced one so hooks keep running in order.
    /// Nothing is appended if the state is already `to`.
    pub(crate) fn force_transition(&self, to: State) -> Vec<Transition, FORCED_BATCH> {
        critical_section::with(|cs| {
            let mut status = self.status.borrow_ref_mut(cs);
            let mut queue = self.transitions.borrow_ref_mut(cs);
            let mut batch = Vec::new();
            while let Some(transition) = queue.pop() {
                let _ = batch.push(transition);
            }
            if status.state != to {
                let _ = batch.push(Transition {
                    from: status.state,
                    to,
                });
                status.state = to;
            }
            batch
        })
    }

    pub(crate) fn next_transition(&self) -> Option<Transition> {
        critical_section::with(|cs| self.transitions.borrow_ref_mut(cs).pop())
    }

    pub(crate) fn borrow_status<'cs>(
        &'cs self,
        cs: CriticalSection<'cs>,
    ) -> core::cell::Ref<'cs, Status> {
        self.status.borrow_ref(cs)
    }

    pub(crate) fn borrow_settings<'cs>(
        &'cs self,
        cs: CriticalSection<'cs>,
    ) -> core::cell::Ref<'cs, Settings> {
        core::cell::Ref::map(self.settings.borrow_ref(cs), |cell| &cell.settings)
    }
}
