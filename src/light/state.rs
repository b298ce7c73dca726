use heapless::Deque;

const STATE_NAME_NORMAL: &str = "normal";
const STATE_NAME_DIMMING: &str = "dimming";
const STATE_NAME_TEMPORARY: &str = "temporary";
const STATE_NAME_PREVIEW: &str = "preview";

/// Controller state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum State {
    /// Color follows the active mode
    #[default]
    Normal = 0,
    /// Manual editing, color only changes through the API
    Dimming = 1,
    /// Manual color shown for a limited time
    Temporary = 2,
    /// Accelerated playback of the schedule
    Preview = 3,
}

impl State {
    pub fn from_raw(value: u8) -> Option<Self> {
        Some(match value {
            0 => Self::Normal,
            1 => Self::Dimming,
            2 => Self::Temporary,
            3 => Self::Preview,
            _ => return None,
        })
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => STATE_NAME_NORMAL,
            Self::Dimming => STATE_NAME_DIMMING,
            Self::Temporary => STATE_NAME_TEMPORARY,
            Self::Preview => STATE_NAME_PREVIEW,
        }
    }

    pub fn parse_from_str(s: &str) -> Option<Self> {
        match s {
            STATE_NAME_NORMAL => Some(Self::Normal),
            STATE_NAME_DIMMING => Some(Self::Dimming),
            STATE_NAME_TEMPORARY => Some(Self::Temporary),
            STATE_NAME_PREVIEW => Some(Self::Preview),
            _ => None,
        }
    }

    /// Check if a requested switch from `self` to `to` is allowed
    ///
    /// Forced switches triggered by power and fault events bypass this.
    pub const fn can_switch_to(self, to: State) -> bool {
        match (self, to) {
            (Self::Preview, Self::Dimming) => true,
            (Self::Preview, _) => false,
            (Self::Dimming | Self::Temporary, Self::Normal) => true,
            (Self::Normal, Self::Dimming) => true,
            (Self::Normal, Self::Temporary) => true,
            (Self::Dimming, Self::Preview) => true,
            _ => false,
        }
    }
}

/// A state switch waiting for its exit and entry hooks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: State,
    pub to: State,
}

/// FIFO of pending transitions
///
/// N is the number of transitions that can be pending at once
#[derive(Debug, Default)]
pub struct TransitionQueue<const N: usize> {
    inner: Deque<Transition, N>,
}

impl<const N: usize> TransitionQueue<N> {
    pub const fn new() -> Self {
        Self {
            inner: Deque::new(),
        }
    }

    /// Push a transition onto the queue
    ///
    /// Returns the transition if the queue is full
    pub fn push(&mut self, transition: Transition) -> Result<(), Transition> {
        self.inner.push_back(transition)
    }

    /// Pop the oldest transition
    pub fn pop(&mut self) -> Option<Transition> {
        self.inner.pop_front()
    }

    pub fn is_full(&self) -> bool {
        self.inner.is_full()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
