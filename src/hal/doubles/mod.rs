//! Host side test doubles for the hardware interfaces.
pub mod error;
pub mod flash;
pub mod gpio;
pub mod serial;
pub mod spi;
