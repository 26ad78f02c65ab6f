//! Traits for Serial Peripheral Interface implementation.

/// Allows the transmission and reception of a word in full duplex.
pub trait FullDuplex<WORD> {
    type Error;

    fn transmit(&mut self, word: Option<WORD>) -> nb::Result<(), Self::Error>;
    /// Must be called after transmit (full duplex operation)
    fn receive(&mut self) -> nb::Result<WORD, Self::Error>;

    /// Clocks one word out and returns the word clocked in during the
    /// same transfer.
    fn exchange(&mut self, word: Option<WORD>) -> Result<WORD, Self::Error>
    where
        WORD: Copy,
    {
        nb::block!(self.transmit(word))?;
        nb::block!(self.receive())
    }
}
