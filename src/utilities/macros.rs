//! Logging macros for the terminal firmware.
//!
//! On the target these forward to `defmt`. On the host (tests and the
//! simulator) they print to stderr, so the same log points stay visible
//! without a debug probe.
//!
//! Only `{}` placeholders with primitive arguments are used, since the
//! format string has to be valid for both backends.
#![macro_use]

#[cfg(target_arch = "arm")]
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)+) => { ::defmt::info!($($arg)+) };
}

#[cfg(target_arch = "arm")]
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)+) => { ::defmt::warn!($($arg)+) };
}

#[cfg(target_arch = "arm")]
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)+) => { ::defmt::error!($($arg)+) };
}

#[cfg(not(target_arch = "arm"))]
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)+) => { ::std::eprintln!("[INFO] {}", ::std::format!($($arg)+)) };
}

#[cfg(not(target_arch = "arm"))]
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)+) => { ::std::eprintln!("[WARN] {}", ::std::format!($($arg)+)) };
}

#[cfg(not(target_arch = "arm"))]
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)+) => { ::std::eprintln!("[ERROR] {}", ::std::format!($($arg)+)) };
}
