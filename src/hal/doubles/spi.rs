use crate::hal::spi::FullDuplex;
use std::{collections::VecDeque, vec::Vec};

/// Misuse of the full duplex contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BusError {
    /// Two transmits without a receive in between
    Overrun,
    /// A receive with no transfer in flight
    NothingClocked,
}

/// Scripted SPI bus.
///
/// Words clocked out with `Some` are logged in `sent`; dummy words used
/// for reads are not. Every receive pops the next scripted answer, or
/// the default word once the script is exhausted.
#[derive(Debug)]
pub struct MockSpi<WORD> {
    pub to_receive: VecDeque<WORD>,
    pub sent: VecDeque<WORD>,
    in_flight: bool,
}

impl<WORD: Copy> MockSpi<WORD> {
    pub fn new() -> Self { Self::answering([]) }

    /// Bus that will answer with `words`, in order.
    pub fn answering<I: IntoIterator<Item = WORD>>(words: I) -> Self {
        Self { to_receive: words.into_iter().collect(), sent: VecDeque::new(), in_flight: false }
    }

    pub fn sent_words(&self) -> Vec<WORD> { self.sent.iter().copied().collect() }
}

impl<WORD: Copy> Default for MockSpi<WORD> {
    fn default() -> Self { Self::new() }
}

impl<WORD: Copy + Default> FullDuplex<WORD> for MockSpi<WORD> {
    type Error = BusError;

    fn transmit(&mut self, word: Option<WORD>) -> nb::Result<(), Self::Error> {
        if self.in_flight {
            return Err(nb::Error::Other(BusError::Overrun));
        }
        self.in_flight = true;
        self.sent.extend(word);
        Ok(())
    }

    fn receive(&mut self) -> nb::Result<WORD, Self::Error> {
        if !self.in_flight {
            return Err(nb::Error::Other(BusError::NothingClocked));
        }
        self.in_flight = false;
        Ok(self.to_receive.pop_front().unwrap_or_default())
    }
}
