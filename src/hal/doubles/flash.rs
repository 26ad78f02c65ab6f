use super::error::FakeError;
use crate::hal::flash::BlockDevice;

/// In-memory NOR flash.
///
/// Behaves like the real part where it matters to the catalog: erased
/// bytes read `0xFF`, programming can only clear bits, and a program
/// that would cross a page boundary is rejected instead of wrapping.
pub struct FakeFlash {
    page_size: usize,
    sector_size: usize,
    data: Vec<u8>,
    programs: Vec<(u32, usize)>,
    erases: Vec<u32>,
    reads: usize,
}

impl FakeFlash {
    pub fn new(page_size: usize, sector_size: usize, size: usize) -> FakeFlash {
        FakeFlash {
            page_size,
            sector_size,
            data: vec![0xFF; size],
            programs: Vec::new(),
            erases: Vec::new(),
            reads: 0,
        }
    }

    /// Raw device contents
    pub fn contents(&self) -> &[u8] { &self.data }

    /// Overwrites bytes directly, bypassing NOR semantics. Useful to
    /// simulate torn writes and stale data.
    pub fn poke(&mut self, address: u32, bytes: &[u8]) {
        let start = address as usize;
        self.data[start..start + bytes.len()].copy_from_slice(bytes);
    }

    /// (address, length) of every program operation, in order
    pub fn programs(&self) -> &[(u32, usize)] { &self.programs }

    /// Base address of every erased sector, in order
    pub fn erases(&self) -> &[u32] { &self.erases }

    /// Number of read operations so far
    pub fn reads(&self) -> usize { self.reads }

    /// Forgets the operation history. Stored contents are untouched.
    pub fn reset_counters(&mut self) {
        self.programs.clear();
        self.erases.clear();
        self.reads = 0;
    }

    fn range(&self, address: u32, length: usize) -> Result<core::ops::Range<usize>, FakeError> {
        let start = address as usize;
        let end = start + length;
        if end > self.data.len() {
            Err(FakeError::OutOfRange)
        } else {
            Ok(start..end)
        }
    }
}

impl BlockDevice for FakeFlash {
    type Error = FakeError;

    fn page_size(&self) -> usize { self.page_size }

    fn sector_size(&self) -> usize { self.sector_size }

    fn read(&mut self, address: u32, bytes: &mut [u8]) -> nb::Result<(), Self::Error> {
        let range = self.range(address, bytes.len())?;
        self.reads += 1;
        bytes.copy_from_slice(&self.data[range]);
        Ok(())
    }

    fn program_page(&mut self, address: u32, bytes: &[u8]) -> nb::Result<(), Self::Error> {
        let range = self.range(address, bytes.len())?;
        let offset_in_page = address as usize % self.page_size;
        if offset_in_page + bytes.len() > self.page_size {
            return Err(nb::Error::Other(FakeError::PageOverrun));
        }
        self.programs.push((address, bytes.len()));
        self.data[range].iter_mut().zip(bytes).for_each(|(o, i)| *o &= *i);
        Ok(())
    }

    fn erase_sector(&mut self, address: u32) -> nb::Result<(), Self::Error> {
        let base = address - (address % self.sector_size as u32);
        let range = self.range(base, self.sector_size)?;
        self.erases.push(base);
        self.data[range].iter_mut().for_each(|b| *b = 0xFF);
        Ok(())
    }
}
