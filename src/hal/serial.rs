//! Byte stream transport interface.
use core::fmt::Debug;

/// Transmit half of a byte transport (UART, USB CDC...).
///
/// Sends are blocking from the caller's point of view: the call
/// returns once every byte has been handed to the peripheral.
pub trait Write {
    type Error: Copy + Debug;

    fn send(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;

    fn write_str(&mut self, s: &str) -> Result<(), Self::Error> { self.send(s.as_bytes()) }
}

/// Adapter exposing any [`Write`] transport to the `ufmt` macros.
pub struct Writer<'a, S: Write + ?Sized>(pub &'a mut S);

impl<'a, S: Write + ?Sized> ufmt::uWrite for Writer<'a, S> {
    type Error = S::Error;

    fn write_str(&mut self, s: &str) -> Result<(), Self::Error> { self.0.write_str(s) }
}
