use crate::hal::gpio::OutputPin;
use std::vec::Vec;

/// Output line recording every level it is driven to, `true` being high.
#[derive(Clone, Debug, Default)]
pub struct MockPin {
    pub changes: Vec<bool>,
}

impl MockPin {
    /// Level last driven. An untouched pin reads low.
    pub fn level(&self) -> bool { self.changes.last().copied().unwrap_or(false) }

    /// Completed active low frames: a fall followed by a rise.
    pub fn frames(&self) -> usize {
        self.changes.windows(2).filter(|pair| !pair[0] && pair[1]).count()
    }
}

impl OutputPin for MockPin {
    fn set_low(&mut self) { self.changes.push(false) }

    fn set_high(&mut self) { self.changes.push(true) }
}
