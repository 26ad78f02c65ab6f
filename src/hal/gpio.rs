//! Digital output lines, such as the flash chip select.

pub trait OutputPin {
    fn set_low(&mut self);
    fn set_high(&mut self);

    fn set(&mut self, high: bool) {
        if high {
            self.set_high()
        } else {
            self.set_low()
        }
    }
}
