//! Hardware Abstraction Layer: the narrow interfaces the terminal core
//! needs from storage, transport, bus, pins and time. Concrete drivers
//! implement them in `drivers`; host doubles in `doubles`.
#![macro_use]

pub mod flash;
pub mod gpio;
pub mod serial;
pub mod spi;
pub mod time;

#[cfg(not(target_arch = "arm"))]
#[doc(hidden)]
pub mod doubles;
