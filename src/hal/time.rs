//! Time units.
use core::ops::{Add, Sub};

#[derive(Clone, Copy, Debug, Default, PartialOrd, Ord, PartialEq, Eq)]
pub struct Seconds(pub u32);

#[derive(Clone, Copy, Debug, Default, PartialOrd, Ord, PartialEq, Eq)]
pub struct Milliseconds(pub u32);

/// Count of 1 Hz clock ticks since power up.
///
/// The counter wraps around; subtracting two ticks always yields the
/// elapsed time as long as less than `u32::MAX` seconds separate them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Tick(pub u32);

/// Anything able to tell the current tick.
pub trait Now {
    fn now(&self) -> Tick;
}

impl Sub for Tick {
    type Output = Seconds;
    fn sub(self, rhs: Self) -> Seconds { Seconds(self.0.wrapping_sub(rhs.0)) }
}

impl Add<Seconds> for Tick {
    type Output = Self;
    fn add(self, rhs: Seconds) -> Self { Tick(self.0.wrapping_add(rhs.0)) }
}

/// Extension trait that adds convenience methods to the `u32` type
pub trait U32Ext {
    /// Wrap in `Seconds`
    fn s(self) -> Seconds;

    /// Wrap in `Milliseconds`
    fn ms(self) -> Milliseconds;
}

impl U32Ext for u32 {
    fn s(self) -> Seconds { Seconds(self) }

    fn ms(self) -> Milliseconds { Milliseconds(self) }
}

impl From<Seconds> for Milliseconds {
    fn from(seconds: Seconds) -> Self { Milliseconds(seconds.0 * 1_000) }
}
