use crate::error::{self, Error};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FakeError {
    /// A program operation crossed a page boundary
    PageOverrun,
    /// Access outside the simulated device
    OutOfRange,
}

impl error::Convertible for FakeError {
    fn into(self) -> Error { Error::DeviceError("A fake error occurred [TESTING ONLY]") }
}
