//! Outbound protocol lines.
//!
//! Every reply is a single ASCII line: `CMD:<NAME>` followed by comma
//! separated `KEY:VALUE` pairs and a newline. Lines are rendered into a
//! bounded buffer first, so a reply is either sent whole or not at all.
use crate::{devices::catalog::ProductRecord, error::Error, hal::serial};
use ufmt::{uDisplay, uWrite, uwrite, Formatter};

/// Longest reply line, newline included.
pub const REPLY_CAPACITY: usize = 128;

/// Price rendered with exactly two decimals, rounded half away from zero.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Price(pub f32);

impl uDisplay for Price {
    fn fmt<W: uWrite + ?Sized>(&self, f: &mut Formatter<'_, W>) -> Result<(), W::Error> {
        let (negative, magnitude) = if self.0 < 0.0 { (true, -self.0) } else { (false, self.0) };
        // Saturating cast, NaN renders as zero
        let cents = (magnitude * 100.0 + 0.5) as u64;
        if negative && cents > 0 {
            f.write_str("-")?;
        }
        uwrite!(f, "{}.", cents / 100)?;
        if cents % 100 < 10 {
            f.write_str("0")?;
        }
        uwrite!(f, "{}", cents % 100)
    }
}

/// Anomalies reported to the host as `ALARM` replies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
pub enum Alarm {
    /// A sync was requested while one is in progress.
    BusySyncing,
    /// A scan arrived while the terminal can't serve it.
    SystemBusy,
    /// A product id that isn't a plain unsigned integer.
    InvalidId,
    /// The closing count disagrees with the records received.
    SyncMismatch,
    /// A scanned id with no catalog record.
    ItemNotFound,
    /// The catalog refused a record or erase.
    WriteFailed,
    /// No room for another distinct product in the cart.
    CartFull,
}

impl Alarm {
    /// 1 for recoverable notices, 2 for errors that invalidate data.
    pub fn level(self) -> u8 {
        match self {
            Alarm::InvalidId | Alarm::SyncMismatch | Alarm::WriteFailed => 2,
            Alarm::BusySyncing | Alarm::SystemBusy | Alarm::ItemNotFound | Alarm::CartFull => 1,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Alarm::BusySyncing => "Busy_Syncing",
            Alarm::SystemBusy => "System_Busy",
            Alarm::InvalidId => "Invalid_ID",
            Alarm::SyncMismatch => "Sync_Mismatch_Error",
            Alarm::ItemNotFound => "Item_Not_Found",
            Alarm::WriteFailed => "Write_Failed",
            Alarm::CartFull => "Cart_Full",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Reply<'a> {
    /// Erase finished, ready for records.
    RequestSync,
    /// A successful scan.
    Report(&'a ProductRecord),
    Alarm(Alarm),
    /// Payment confirmed for `total` distinct products.
    PayOff { total: u32 },
}

impl<'a> uDisplay for Reply<'a> {
    fn fmt<W: uWrite + ?Sized>(&self, f: &mut Formatter<'_, W>) -> Result<(), W::Error> {
        match self {
            Reply::RequestSync => f.write_str("CMD:REQ_SYNC"),
            Reply::Report(record) => uwrite!(
                f,
                "CMD:REPORT,ID:{},PR:{},NM:{}",
                record.id,
                Price(record.price),
                record.name.as_str()
            ),
            Reply::Alarm(alarm) => {
                uwrite!(f, "CMD:ALARM,LEVEL:{},MSG:{}", alarm.level(), alarm.message())
            }
            Reply::PayOff { total } => uwrite!(f, "CMD:PAY_OFF,TOTAL:{}", *total),
        }
    }
}

impl<'a> Reply<'a> {
    /// Renders the full line, trailing newline included.
    pub fn render(&self) -> Result<heapless::String<REPLY_CAPACITY>, Error> {
        let mut line = heapless::String::new();
        uwrite!(line, "{}\n", self).map_err(|_| Error::ReplyOverflow)?;
        Ok(line)
    }

    /// Renders and sends the line in one transport call.
    pub fn send<S: serial::Write>(&self, serial: &mut S) -> Result<(), Error> {
        let line = self.render()?;
        serial.write_str(line.as_str()).map_err(|_| Error::TransportError)
    }
}
