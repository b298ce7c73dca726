use crate::math::round_div;

/// Number of samples averaged into the current temperature
pub const TEMP_WINDOW_SIZE: usize = 8;

/// Circular buffer of the most recent temperature samples
///
/// Fault-marked slots (`None`) are skipped when averaging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemperatureWindow {
    samples: [Option<i16>; TEMP_WINDOW_SIZE],
    index: usize,
}

impl Default for TemperatureWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl TemperatureWindow {
    pub const fn new() -> Self {
        Self {
            samples: [None; TEMP_WINDOW_SIZE],
            index: 0,
        }
    }

    /// Overwrite the oldest slot
    pub fn push(&mut self, sample: Option<i16>) {
        self.samples[self.index % TEMP_WINDOW_SIZE] = sample;
        self.index = (self.index + 1) % TEMP_WINDOW_SIZE;
    }

    /// Number of valid samples
    pub fn valid(&self) -> usize {
        self.samples.iter().flatten().count()
    }

    /// Rounded mean of the valid samples
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub fn average(&self) -> Option<i16> {
        let n = self.valid();
        if n == 0 {
            return None;
        }
        let sum: i64 = self.samples.iter().flatten().map(|t| i64::from(*t)).sum();
        Some(round_div(sum, n as i64) as i16)
    }
}
