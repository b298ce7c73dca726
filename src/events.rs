//! Cross-context events
//!
//! The render task, the thermal timer and the request handlers run in
//! different execution contexts. They talk through bounded queues guarded by
//! `critical-section`, so pushing from an interrupt or timer callback is safe.

use core::cell::RefCell;

use critical_section::Mutex;
use heapless::Deque;

use crate::light::State;

/// Why the system is being shut down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// Sustained overheat reported by the thermal controller
    Overheated,
    /// An LED channel could not be driven
    ActuatorFault,
    /// Regular, user-initiated shutdown
    Scheduled,
}

/// System events consumed by the light controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemEvent {
    /// Power came on; fade up to the normal color
    PowerOn,
    /// Power is going off; fade to black
    PowerOff,
    /// A shutdown has been scheduled; fade to black
    ShutdownScheduled,
    /// Fatal fault; blank immediately
    Fault,
    /// The stored geo-location changed
    GeoLocationChanged,
    /// Toggle the temporary override (e.g. from a button)
    TemporaryToggle,
}

/// Notifications emitted for observers of the light state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightNotification {
    /// The controller switched state
    StateChanged { from: State, to: State },
    /// The live color changed
    ColorChanged,
}

/// Queue is full; the rejected value is handed back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrySendError<T>(pub T);

/// Queue is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TryReceiveError;

/// Bounded multi-producer queue usable from any context
pub struct Channel<T, const SIZE: usize> {
    queue: Mutex<RefCell<Deque<T, SIZE>>>,
}

impl<T, const SIZE: usize> Channel<T, SIZE> {
    pub const fn new() -> Self {
        Self {
            queue: Mutex::new(RefCell::new(Deque::new())),
        }
    }

    /// Handle for producers
    pub const fn sender(&self) -> Sender<'_, T, SIZE> {
        Sender { channel: self }
    }

    /// Handle for the consumer
    pub const fn receiver(&self) -> Receiver<'_, T, SIZE> {
        Receiver { channel: self }
    }

    /// Enqueue `value`, handing it back if the queue is full
    pub fn try_send(&self, value: T) -> Result<(), TrySendError<T>> {
        critical_section::with(|cs| {
            self.queue
                .borrow(cs)
                .borrow_mut()
                .push_back(value)
                .map_err(TrySendError)
        })
    }

    /// Dequeue the oldest value
    pub fn try_receive(&self) -> Result<T, TryReceiveError> {
        critical_section::with(|cs| {
            self.queue
                .borrow(cs)
                .borrow_mut()
                .pop_front()
                .ok_or(TryReceiveError)
        })
    }

    /// Number of queued values
    pub fn len(&self) -> usize {
        critical_section::with(|cs| self.queue.borrow(cs).borrow().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T, const SIZE: usize> Default for Channel<T, SIZE> {
    fn default() -> Self {
        Self::new()
    }
}

/// Producer handle of a [`Channel`]
#[derive(Clone, Copy)]
pub struct Sender<'a, T, const SIZE: usize> {
    channel: &'a Channel<T, SIZE>,
}

impl<T, const SIZE: usize> Sender<'_, T, SIZE> {
    pub fn try_send(&self, value: T) -> Result<(), TrySendError<T>> {
        self.channel.try_send(value)
    }
}

/// Consumer handle of a [`Channel`]
#[derive(Clone, Copy)]
pub struct Receiver<'a, T, const SIZE: usize> {
    channel: &'a Channel<T, SIZE>,
}

impl<T, const SIZE: usize> Receiver<'_, T, SIZE> {
    pub fn try_receive(&self) -> Result<T, TryReceiveError> {
        self.channel.try_receive()
    }
}

/// Capacity of the system event queue
pub const SYSTEM_EVENT_CAPACITY: usize = 8;

/// Capacity of the notification queue
pub const NOTIFICATION_CAPACITY: usize = 16;

/// Queue of events for the light controller
pub type SystemEventChannel = Channel<SystemEvent, SYSTEM_EVENT_CAPACITY>;

/// Queue of notifications for the resource layer
pub type NotificationChannel = Channel<LightNotification, NOTIFICATION_CAPACITY>;
