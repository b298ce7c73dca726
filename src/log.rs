//! Feature-gated logging.
//!
//! With `esp32-log` enabled lines go to the ESP console through `esp-println`.
//! Without it the macros only type-check their arguments.

#[cfg(feature = "esp32-log")]
macro_rules! log_at {
    ($level:literal, $tag:literal, $($arg:tt)*) => {
        esp_println::println!(
            "{} [{}] {}",
            $level,
            $tag,
            core::format_args!($($arg)*)
        )
    };
}

#[cfg(not(feature = "esp32-log"))]
macro_rules! log_at {
    ($level:literal, $tag:literal, $($arg:tt)*) => {{
        let _ = core::format_args!($($arg)*);
    }};
}

macro_rules! info {
    ($tag:literal, $($arg:tt)*) => { $crate::log::log_at!("INFO", $tag, $($arg)*) };
}

macro_rules! warning {
    ($tag:literal, $($arg:tt)*) => { $crate::log::log_at!("WARN", $tag, $($arg)*) };
}

macro_rules! error {
    ($tag:literal, $($arg:tt)*) => { $crate::log::log_at!("ERROR", $tag, $($arg)*) };
}

pub(crate) use {error, info, log_at, warning};
