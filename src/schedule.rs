//! Piecewise-linear day schedules
//!
//! A schedule is a strictly ascending list of instants (seconds of the local
//! day) each carrying a color. Instants may extend into the next day, up to
//! `2 * SECS_PER_DAY`, to express a program that wraps past midnight.

use heapless::Vec;

use crate::color::{Color, ColorError, clamp_brightness};
use crate::math::interpolate;

/// Seconds in one day
pub const SECS_PER_DAY: u32 = 86_400;

/// Exclusive upper bound of a schedule instant
pub const INSTANT_LIMIT: u32 = 2 * SECS_PER_DAY;

/// Maximum number of items in a schedule
pub const SCHEDULE_CAPACITY: usize = 48;

/// Schedule validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleError {
    /// More items than [`SCHEDULE_CAPACITY`].
    CapacityExceeded,
    /// Item at `index` does not come strictly after its predecessor.
    NotAscending { index: usize },
    /// The last instant is not below [`INSTANT_LIMIT`].
    InstantOutOfRange { instant: u32 },
    /// An item carries an invalid color.
    Color { index: usize, error: ColorError },
}

impl core::fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ScheduleError::CapacityExceeded => {
                write!(f, "schedule holds at most {SCHEDULE_CAPACITY} items")
            }
            ScheduleError::NotAscending { index } => {
                write!(f, "item {index} is not after the previous item")
            }
            ScheduleError::InstantOutOfRange { instant } => {
                write!(f, "instant {instant} must be below {INSTANT_LIMIT}")
            }
            ScheduleError::Color { index, error } => {
                write!(f, "item {index}: {error}")
            }
        }
    }
}

/// One key point of a schedule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleItem {
    /// Seconds since local midnight, in `[0, 2 * SECS_PER_DAY)`
    pub instant: u32,
    /// Color at this instant
    pub color: Color,
}

impl ScheduleItem {
    pub fn new(instant: u32, color: Color) -> Self {
        Self { instant, color }
    }
}

/// Result of looking up an instant in a schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bracket<'a> {
    /// Instant lies between two items
    Between(&'a ScheduleItem, &'a ScheduleItem),
    /// Instant is at or after the last item
    Hold(&'a ScheduleItem),
}

/// Validated, strictly ascending schedule
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schedule {
    items: Vec<ScheduleItem, SCHEDULE_CAPACITY>,
}

impl Schedule {
    /// Create an empty schedule
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Build a schedule from items, validating every invariant
    pub fn from_items(items: &[ScheduleItem], channels: usize) -> Result<Self, ScheduleError> {
        validate(items, channels)?;
        let items = Vec::from_slice(items).map_err(|()| ScheduleError::CapacityExceeded)?;
        Ok(Self { items })
    }

    /// Schedule items in ascending order
    pub fn items(&self) -> &[ScheduleItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// First instant, if any
    pub fn first_instant(&self) -> Option<u32> {
        self.items.first().map(|item| item.instant)
    }

    /// Last instant, if any
    pub fn last_instant(&self) -> Option<u32> {
        self.items.last().map(|item| item.instant)
    }

    /// Find the items surrounding `instant`
    ///
    /// Returns `None` if `instant` precedes the first item.
    pub fn bracket(&self, instant: u32) -> Option<Bracket<'_>> {
        let first = self.items.first()?;
        if instant < first.instant {
            return None;
        }
        for pair in self.items.windows(2) {
            if instant < pair[1].instant {
                return Some(Bracket::Between(&pair[0], &pair[1]));
            }
        }
        self.items.last().map(Bracket::Hold)
    }

    /// Color of the schedule at a local second of the day
    ///
    /// An instant before the first item is retried one day later so that
    /// programs wrapping past midnight keep running. Returns a blank color
    /// of `channels` width when nothing matches.
    pub fn color_at(&self, second_of_day: u32, channels: usize) -> Color {
        let next_day = second_of_day.saturating_add(SECS_PER_DAY);
        let found = match self.bracket(second_of_day) {
            Some(bracket) => Some((bracket, second_of_day)),
            None => self.bracket(next_day).map(|bracket| (bracket, next_day)),
        };
        match found {
            Some((Bracket::Hold(item), _)) => item.color.clone(),
            Some((Bracket::Between(begin, end), instant)) => interpolate_color(begin, end, instant),
            None => Color::blank(channels),
        }
    }
}

/// Interpolate every channel between two items at `instant`
pub fn interpolate_color(begin: &ScheduleItem, end: &ScheduleItem, instant: u32) -> Color {
    let mut color = begin.color.clone();
    for (channel, value) in color.as_mut_slice().iter_mut().enumerate() {
        let va = i64::from(*value);
        let vb = i64::from(end.color.get(channel).unwrap_or(0));
        let v = interpolate(
            i64::from(begin.instant),
            va,
            i64::from(end.instant),
            vb,
            i64::from(instant),
        );
        *value = clamp_brightness(v);
    }
    color
}

/// Check capacity, ordering, instant range and colors
pub fn validate(items: &[ScheduleItem], channels: usize) -> Result<(), ScheduleError> {
    if items.len() > SCHEDULE_CAPACITY {
        return Err(ScheduleError::CapacityExceeded);
    }
    for (index, pair) in items.windows(2).enumerate() {
        if pair[1].instant <= pair[0].instant {
            return Err(ScheduleError::NotAscending { index: index + 1 });
        }
    }
    if let Some(last) = items.last() {
        if last.instant >= INSTANT_LIMIT {
            return Err(ScheduleError::InstantOutOfRange {
                instant: last.instant,
            });
        }
    }
    for (index, item) in items.iter().enumerate() {
        item.color
            .validate(channels)
            .map_err(|error| ScheduleError::Color { index, error })?;
    }
    Ok(())
}
