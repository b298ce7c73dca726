/// Fixed-point scale of the PID sum
pub const PID_Q: i32 = 100;

pub const INTEGRAL_MIN: i32 = -50_000;
pub const INTEGRAL_MAX: i32 = 50_000;

/// Lowest non-zero fan power the loop commands
pub const OUTPUT_MIN: i32 = 10;
pub const OUTPUT_MAX: i32 = 100;

/// Errors within this band (°C) keep the previous output
pub const DEAD_BAND: i32 = 1;

/// Errors of at least this size (°C) feed the integral
pub const INTEGRAL_THRESHOLD: i32 = 2;

/// Integer PID gains
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PidGains {
    pub kp: i32,
    pub ki: i32,
    pub kd: i32,
}

/// PID loop state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pid {
    prev_error: i32,
    integral: i32,
    last_output: u8,
}

impl Pid {
    pub const fn new() -> Self {
        Self {
            prev_error: 0,
            integral: 0,
            last_output: 0,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub const fn integral(&self) -> i32 {
        self.integral
    }

    pub const fn prev_error(&self) -> i32 {
        self.prev_error
    }

    pub const fn last_output(&self) -> u8 {
        self.last_output
    }

    /// Compute fan power (0-100) for `temp` against `setpoint`
    ///
    /// Output below [`OUTPUT_MIN`] switches the fan off. While saturated the
    /// integral contribution of this step is taken back.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn step(&mut self, gains: PidGains, temp: i32, setpoint: i32) -> u8 {
        let error = temp - setpoint;
        if error.abs() <= DEAD_BAND {
            return self.last_output;
        }

        let p = gains.kp.saturating_mul(error);
        if error.abs() >= INTEGRAL_THRESHOLD {
            self.integral = self
                .integral
                .saturating_add(gains.ki.saturating_mul(error))
                .clamp(INTEGRAL_MIN, INTEGRAL_MAX);
        }
        let d = gains.kd.saturating_mul(error - self.prev_error);
        self.prev_error = error;

        let sum = p.saturating_add(self.integral).saturating_add(d);
        let output = if sum > OUTPUT_MAX * PID_Q {
            if error > 0 {
                self.unwind(gains.ki, error);
            }
            OUTPUT_MAX
        } else if sum < OUTPUT_MIN * PID_Q {
            if error < 0 {
                self.unwind(gains.ki, error);
            }
            0
        } else {
            sum / PID_Q
        };

        self.last_output = output as u8;
        self.last_output
    }

    fn unwind(&mut self, ki: i32, error: i32) {
        self.integral = self
            .integral
            .saturating_sub(ki.saturating_mul(error))
            .clamp(INTEGRAL_MIN, INTEGRAL_MAX);
    }
}
