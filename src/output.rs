//! Brightness to hardware duty mapping

use heapless::Vec;

use crate::color::{Color, CorrectionMethod, CorrectionTable, DUTY_MAX, Duty, MAX_CHANNELS};
use crate::driver::{ChannelDriver, DriverError};

/// Length of one PWM period in duty units
const DUTY_MODULUS: u32 = DUTY_MAX as u32 + 1;

/// Maps colors to channel duties and writes them to a [`ChannelDriver`]
///
/// Pulses of consecutive channels are staggered: each channel starts where
/// the previous channel's pulse ended, wrapping at the PWM period. Channels
/// whose duty and pulse start both match the last write are skipped.
#[derive(Debug)]
pub struct ChannelOutputMapper {
    table: CorrectionTable,
    /// Last written `(duty, phase)` per channel
    written: Vec<Option<(Duty, Duty)>, MAX_CHANNELS>,
}

impl ChannelOutputMapper {
    pub fn new(channels: usize, method: CorrectionMethod) -> Self {
        let mut written = Vec::new();
        for _ in 0..channels.min(MAX_CHANNELS) {
            let _ = written.push(None);
        }
        Self {
            table: CorrectionTable::new(method),
            written,
        }
    }

    pub const fn method(&self) -> CorrectionMethod {
        self.table.method()
    }

    /// Select the correction curve used by subsequent writes
    pub fn set_method(&mut self, method: CorrectionMethod) {
        self.table.set_method(method);
    }

    /// Duty for one brightness value under the current curve
    pub fn duty(&self, brightness: u16) -> Duty {
        self.table.duty(brightness)
    }

    /// Last duty written per channel (0 for channels never written)
    pub fn duties(&self) -> Vec<Duty, MAX_CHANNELS> {
        self.written
            .iter()
            .map(|written| written.map_or(0, |(duty, _)| duty))
            .collect()
    }

    /// Forget the written duties so the next write touches every channel
    pub fn invalidate(&mut self) {
        for written in &mut self.written {
            *written = None;
        }
    }

    /// Write `color`, returning the number of channels actually updated
    #[allow(clippy::cast_possible_truncation)]
    pub fn write<D: ChannelDriver>(
        &mut self,
        driver: &mut D,
        color: &Color,
    ) -> Result<usize, DriverError> {
        let mut phase: u32 = 0;
        let mut updated = 0;
        for (channel, &brightness) in color.as_slice().iter().enumerate() {
            let Some(slot) = self.written.get_mut(channel) else {
                break;
            };
            let duty = self.table.duty(brightness);
            let pulse = (duty, phase as Duty);
            if *slot != Some(pulse) {
                driver.set_duty(channel, duty, pulse.1)?;
                *slot = Some(pulse);
                updated += 1;
            }
            phase = (phase + u32::from(duty)) % DUTY_MODULUS;
        }
        Ok(updated)
    }
}
