//! Error type for the checkout terminal as a whole.
use crate::hal::serial;
use ufmt::uwriteln;

/// Top level error type for the terminal. Unlike the specific
/// driver errors, this error contains textual descriptions of the
/// problem as it is meant to be directly reported through serial.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
pub enum Error {
    /// Error caused by a low level peripheral driver
    DriverError(&'static str),
    /// Error caused by a high level device driver
    DeviceError(&'static str),
    /// A record index past the erased catalog region
    IndexOutOfRange,
    /// A reply line did not fit its buffer
    ReplyOverflow,
    /// The byte transport refused a reply
    TransportError,
}

/// Implemented by module specific errors that can be
/// described in terms of the top level error.
pub trait Convertible {
    fn into(self) -> Error;
}

impl<T: Convertible> From<T> for Error {
    fn from(t: T) -> Self { t.into() }
}

impl Error {
    /// Reports error via abstract serial device
    pub fn report<S: serial::Write>(&self, serial: &mut S) {
        let mut writer = serial::Writer(serial);
        match self {
            Error::DriverError(text) => uwriteln!(writer, "[Driver Error] -> {}", *text),
            Error::DeviceError(text) => uwriteln!(writer, "[Device Error] -> {}", *text),
            Error::IndexOutOfRange => {
                uwriteln!(writer, "[Logic Error] -> Record index beyond catalog capacity")
            }
            Error::ReplyOverflow => uwriteln!(writer, "[Logic Error] -> Reply line too long"),
            Error::TransportError => uwriteln!(writer, "[Driver Error] -> Transport send failed"),
        }
        .ok();
    }
}
