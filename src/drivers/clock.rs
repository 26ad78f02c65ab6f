//! Seconds clock driven by a periodic 1 Hz interrupt.
use crate::hal::time::{Now, Tick};
use core::sync::atomic::{AtomicU32, Ordering};

/// Monotonic (wrapping) count of elapsed seconds.
///
/// `tick` is called only from the periodic timer interrupt, `now` from
/// the application loop. There is a single writer, so a load/store pair
/// is enough.
#[derive(Default)]
pub struct SecondsClock {
    ticks: AtomicU32,
}

impl SecondsClock {
    pub const fn new() -> Self { Self { ticks: AtomicU32::new(0) } }

    /// Advances the clock by one second. Interrupt context only.
    pub fn tick(&self) {
        let next = self.ticks.load(Ordering::Relaxed).wrapping_add(1);
        self.ticks.store(next, Ordering::Release);
    }
}

impl Now for SecondsClock {
    fn now(&self) -> Tick { Tick(self.ticks.load(Ordering::Acquire)) }
}
