//! Render tick pacing.
//!
//! Provides portable tick pacing without async/await or platform-specific timers.
//! The caller is responsible for sleeping/waiting between ticks.

use embassy_time::{Duration, Instant};

use crate::driver::{ChannelDriver, PowerSupervisor, SettingsStore, WallClock};
use crate::light::{LightController, LightError};

/// Result of a render tick.
#[derive(Debug, Clone, Copy)]
pub struct TickResult {
    /// The deadline for the next tick.
    pub next_deadline: Instant,
    /// How long to wait until the next tick (may be zero if behind schedule).
    pub sleep_duration: Duration,
    /// Outcome of the controller tick.
    pub outcome: Result<(), LightError>,
}

/// Portable render loop that manages timing without async.
///
/// This loop:
/// - Tracks tick timing with drift correction
/// - Calls the light controller
/// - Returns timing info so the caller can sleep appropriately
///
/// # Usage
///
/// ```ignore
/// let mut render = RenderLoop::new(controller);
///
/// loop {
///     let result = render.tick(Instant::now());
///     sleep_ms(result.sleep_duration.as_millis());
/// }
/// ```
pub struct RenderLoop<'a, D, S, C, P> {
    controller: LightController<'a, D, S, C, P>,
    next_tick: Instant,
    period: Duration,
}

impl<'a, D, S, C, P> RenderLoop<'a, D, S, C, P>
where
    D: ChannelDriver,
    S: SettingsStore,
    C: WallClock,
    P: PowerSupervisor,
{
    /// Create a render loop with the controller's configured period.
    pub fn new(controller: LightController<'a, D, S, C, P>) -> Self {
        let period = controller.config().render_period;
        Self::with_period(controller, period)
    }

    /// Create a render loop with a custom period.
    pub fn with_period(controller: LightController<'a, D, S, C, P>, period: Duration) -> Self {
        Self {
            controller,
            next_tick: Instant::from_millis(0),
            period,
        }
    }

    /// Run one tick and return timing information.
    ///
    /// If we fell behind by more than two periods the backlog is skipped
    /// instead of catching up.
    pub fn tick(&mut self, now: Instant) -> TickResult {
        let max_drift = self.period * 2;
        if now > self.next_tick + max_drift {
            self.next_tick = now;
        }

        let outcome = self.controller.tick(now);
        if let Err(error) = outcome {
            crate::log::error!("render", "tick failed: {}", error);
        }

        self.next_tick += self.period;
        let sleep_duration = self.next_tick.saturating_duration_since(now);

        TickResult {
            next_deadline: self.next_tick,
            sleep_duration,
            outcome,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Get a reference to the controller.
    pub fn controller(&self) -> &LightController<'a, D, S, C, P> {
        &self.controller
    }

    /// Get a mutable reference to the controller.
    pub fn controller_mut(&mut self) -> &mut LightController<'a, D, S, C, P> {
        &mut self.controller
    }
}
