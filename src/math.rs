use embassy_time::Duration;

/// One in 16.16 fixed point
pub const FIXED_ONE: u32 = 1 << 16;

/// Integer division rounding half away from zero
///
/// Adds half of the divisor, signed like the quotient, before the
/// truncating division.
#[inline]
pub const fn round_div(numerator: i64, denominator: i64) -> i64 {
    if denominator == 0 {
        return 0;
    }
    let half = denominator.abs() / 2;
    if (numerator < 0) == (denominator < 0) {
        (numerator + half * denominator.signum()) / denominator
    } else {
        (numerator - half * denominator.signum()) / denominator
    }
}

/// Linear interpolation between `(ta, va)` and `(tb, vb)` at `t`
///
/// `V = VA + round((VB - VA) * (t - tA) / (tB - tA))`
#[inline]
pub const fn interpolate(ta: i64, va: i64, tb: i64, vb: i64, t: i64) -> i64 {
    if ta == tb {
        return va;
    }
    va + round_div((vb - va) * (t - ta), tb - ta)
}

/// Progress of a transition in 16.16 fixed point (0..=65536)
#[allow(clippy::cast_possible_truncation)]
#[inline]
pub const fn progress16(elapsed: Duration, duration: Duration) -> u32 {
    let total = duration.as_millis();
    if total == 0 {
        return 0;
    }
    let elapsed = elapsed.as_millis();
    if elapsed >= total {
        return FIXED_ONE;
    }

    ((elapsed * FIXED_ONE as u64 + total / 2) / total) as u32
}

/// Blend two 16-bit values with a 16.16 fixed point progress
///
/// Symmetric rounding: `±32768` before the shift.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
#[inline]
pub const fn blend16(start: u16, end: u16, progress: u32) -> u16 {
    let delta = (end as i64 - start as i64) * progress as i64;
    let half = (FIXED_ONE / 2) as i64;
    let step = if delta >= 0 {
        (delta + half) >> 16
    } else {
        -((-delta + half) >> 16)
    };

    (start as i64 + step) as u16
}
