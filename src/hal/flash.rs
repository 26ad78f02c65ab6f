//! Block storage interfaces.
//!
//! A block device exposes the three raw primitives of serial NOR flash:
//! byte range reads, page bounded programs and sector erases. Both write
//! capable primitives follow `nb` semantics: they return `WouldBlock`
//! while the device is still busy with a previous operation, and callers
//! that need them synchronous wrap them in `nb::block!`.
use crate::utilities::memory::IterableByPages;
use core::fmt;
use nb::block;

/// Raw block device primitives.
pub trait BlockDevice {
    type Error: Clone + Copy + fmt::Debug;

    /// Largest span a single program operation may cover. A program must
    /// never cross a multiple of this size.
    fn page_size(&self) -> usize;

    /// Smallest erasable unit.
    fn sector_size(&self) -> usize;

    fn read(&mut self, address: u32, bytes: &mut [u8]) -> nb::Result<(), Self::Error>;

    /// Programs `bytes` at `address`. The range must lie inside one page.
    fn program_page(&mut self, address: u32, bytes: &[u8]) -> nb::Result<(), Self::Error>;

    /// Erases the sector containing `address`, leaving every byte `0xFF`.
    fn erase_sector(&mut self, address: u32) -> nb::Result<(), Self::Error>;
}

/// Writes a range of bytes at an arbitrary address.
///
/// This is a high level write that abstracts away the need to keep
/// program operations inside page boundaries. The range is split into
/// a leading partial page, full pages and a trailing partial page, each
/// programmed synchronously. The split is invisible to callers: the
/// device ends up holding the same bytes an unsplit write would leave.
///
/// The target range must have been erased beforehand.
pub trait Write: BlockDevice {
    fn write(&mut self, address: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        let page_size = self.page_size();
        for (span_address, span) in bytes.page_spans(address, page_size) {
            block!(self.program_page(span_address, span))?;
        }
        Ok(())
    }
}

impl<F: BlockDevice> Write for F {}
