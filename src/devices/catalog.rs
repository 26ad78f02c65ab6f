//! Flash backed product catalog.
//!
//! The catalog is a metadata header in its own sector followed by a flat
//! array of fixed size records. Record `i` lives at
//! `RECORDS_ADDRESS + i * RECORD_SIZE`, so no directory is needed. A
//! record or header only counts once its valid marker reads back; erased
//! or torn slots are logically absent.
//!
//! The cached count mirrors the committed header and bounds every scan,
//! so lookups never wander into erased or half written flash.
use crate::{
    config::{DATA_SECTORS, MAX_RECORDS, METADATA_ADDRESS, RECORDS_ADDRESS, SECTOR_SIZE},
    devices::protocol::reply::Price,
    error::Error,
    hal::{
        flash::{BlockDevice, Write},
        serial,
    },
    utilities::bitwise::is_erased,
};
use core::convert::TryInto;
use nb::block;
use static_assertions::const_assert_eq;
use ufmt::uwriteln;

/// Sentinel marking a committed record or header.
pub const VALID_MARKER: u32 = 0xA5A5_A5A5;
/// Version tag written with every header commit.
pub const CATALOG_VERSION: u16 = 0x0100;

/// Bytes reserved for a product name, terminator included.
pub const NAME_CAPACITY: usize = 48;

const ID_OFFSET: usize = 0;
const PRICE_OFFSET: usize = ID_OFFSET + 8;
const NAME_OFFSET: usize = PRICE_OFFSET + 4;
const RECORD_MARKER_OFFSET: usize = NAME_OFFSET + NAME_CAPACITY;
pub const RECORD_SIZE: usize = RECORD_MARKER_OFFSET + 4;

// Record addresses are computed, never looked up.
const_assert_eq!(RECORD_SIZE, 64);

const COUNT_OFFSET: usize = 0;
const TIMESTAMP_OFFSET: usize = 4;
const VERSION_OFFSET: usize = 8;
const METADATA_MARKER_OFFSET: usize = 12;
pub const METADATA_SIZE: usize = METADATA_MARKER_OFFSET + 4;

/// Product name, at most `NAME_CAPACITY - 1` bytes of UTF-8.
pub type Name = heapless::String<{ NAME_CAPACITY - 1 }>;

/// Builds a name from arbitrary text, silently truncating it to capacity.
/// The cut is moved back to the closest character boundary so the
/// result is always valid UTF-8.
pub fn truncated_name(text: &str) -> Name {
    let mut end = text.len().min(NAME_CAPACITY - 1);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    let mut name = Name::new();
    // Cannot fail, the slice fits by construction
    name.push_str(&text[..end]).ok();
    name
}

/// Decodes the longest valid UTF-8 prefix of a byte slice.
pub(crate) fn utf8_prefix(bytes: &[u8]) -> &str {
    match core::str::from_utf8(bytes) {
        Ok(text) => text,
        Err(error) => core::str::from_utf8(&bytes[..error.valid_up_to()]).unwrap_or(""),
    }
}

fn u32_at(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap_or([0xFF; 4]))
}

/// A single catalog entry, keyed by barcode.
#[derive(Clone, Debug, PartialEq)]
pub struct ProductRecord {
    pub id: u64,
    pub price: f32,
    pub name: Name,
}

impl ProductRecord {
    pub fn new(id: u64, price: f32, name: &str) -> Self {
        Self { id, price, name: truncated_name(name) }
    }

    /// Serialized form, with the valid marker set and the name null padded.
    pub fn to_bytes(&self) -> [u8; RECORD_SIZE] {
        let mut bytes = [0u8; RECORD_SIZE];
        bytes[ID_OFFSET..PRICE_OFFSET].copy_from_slice(&self.id.to_le_bytes());
        bytes[PRICE_OFFSET..NAME_OFFSET].copy_from_slice(&self.price.to_le_bytes());
        bytes[NAME_OFFSET..NAME_OFFSET + self.name.len()].copy_from_slice(self.name.as_bytes());
        bytes[RECORD_MARKER_OFFSET..].copy_from_slice(&VALID_MARKER.to_le_bytes());
        bytes
    }

    /// Returns `None` unless the valid marker is present.
    pub fn from_bytes(bytes: &[u8; RECORD_SIZE]) -> Option<Self> {
        if u32_at(bytes, RECORD_MARKER_OFFSET) != VALID_MARKER {
            return None;
        }
        let id = u64::from_le_bytes(bytes[ID_OFFSET..PRICE_OFFSET].try_into().ok()?);
        let price = f32::from_le_bytes(bytes[PRICE_OFFSET..NAME_OFFSET].try_into().ok()?);
        let name_field = &bytes[NAME_OFFSET..RECORD_MARKER_OFFSET];
        let length = name_field.iter().position(|b| *b == 0).unwrap_or(name_field.len());
        Some(Self { id, price, name: truncated_name(utf8_prefix(&name_field[..length])) })
    }
}

/// Catalog header, stored at the start of the metadata sector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CatalogMetadata {
    pub total_count: u32,
    pub update_timestamp: u32,
    pub version: u16,
}

impl CatalogMetadata {
    pub fn to_bytes(&self) -> [u8; METADATA_SIZE] {
        let mut bytes = [0xFFu8; METADATA_SIZE];
        bytes[COUNT_OFFSET..TIMESTAMP_OFFSET].copy_from_slice(&self.total_count.to_le_bytes());
        bytes[TIMESTAMP_OFFSET..VERSION_OFFSET]
            .copy_from_slice(&self.update_timestamp.to_le_bytes());
        bytes[VERSION_OFFSET..VERSION_OFFSET + 2].copy_from_slice(&self.version.to_le_bytes());
        bytes[METADATA_MARKER_OFFSET..].copy_from_slice(&VALID_MARKER.to_le_bytes());
        bytes
    }

    /// Returns `None` for an erased or otherwise uninitialized header.
    pub fn from_bytes(bytes: &[u8; METADATA_SIZE]) -> Option<Self> {
        if u32_at(bytes, METADATA_MARKER_OFFSET) != VALID_MARKER {
            return None;
        }
        Some(Self {
            total_count: u32_at(bytes, COUNT_OFFSET),
            update_timestamp: u32_at(bytes, TIMESTAMP_OFFSET),
            version: u16::from_le_bytes([bytes[VERSION_OFFSET], bytes[VERSION_OFFSET + 1]]),
        })
    }
}

fn record_address(index: u32) -> u32 { RECORDS_ADDRESS + index * RECORD_SIZE as u32 }

/// Fixed record catalog on top of a raw block device.
pub struct Catalog<F: BlockDevice> {
    flash: F,
    cached_count: u32,
}

impl<F> Catalog<F>
where
    F: BlockDevice,
    Error: From<F::Error>,
{
    /// Loads the cached count from the header. Never fails: a missing,
    /// erased or unreadable header is an empty catalog.
    pub fn init(mut flash: F) -> Self {
        let mut bytes = [0u8; METADATA_SIZE];
        let cached_count = match block!(flash.read(METADATA_ADDRESS, &mut bytes)) {
            Ok(()) => match CatalogMetadata::from_bytes(&bytes) {
                Some(metadata) => {
                    let count = metadata.total_count.min(MAX_RECORDS as u32);
                    log_info!("[Catalog] Loaded. Total items: {}", count);
                    count
                }
                None if is_erased(&bytes) => {
                    log_info!("[Catalog] Empty.");
                    0
                }
                None => {
                    log_warn!("[Catalog] Invalid header, treating catalog as empty.");
                    0
                }
            },
            Err(_) => {
                log_error!("[Catalog] Header unreadable, treating catalog as empty.");
                0
            }
        };
        Self { flash, cached_count }
    }

    /// Number of committed records. Upper bound for every scan.
    pub fn count(&self) -> u32 { self.cached_count }

    /// Highest number of records the erased region can hold.
    pub const fn capacity() -> usize { MAX_RECORDS }

    /// Erases the header sector and the configured run of data sectors.
    ///
    /// Not atomic with respect to reads: callers guarantee no lookups
    /// happen until it returns.
    pub fn erase_all(&mut self) -> Result<(), Error> {
        log_info!("[Catalog] Erasing...");
        self.cached_count = 0;
        block!(self.flash.erase_sector(METADATA_ADDRESS))?;

        let sector_size = self.flash.sector_size() as u32;
        let end = RECORDS_ADDRESS + (DATA_SECTORS * SECTOR_SIZE) as u32;
        let mut address = RECORDS_ADDRESS;
        while address < end {
            block!(self.flash.erase_sector(address))?;
            address += sector_size;
        }
        log_info!("[Catalog] Erase done.");
        Ok(())
    }

    /// Programs a record at `index`. The slot must have been erased by
    /// the last `erase_all`; indices are never rewritten in place.
    pub fn write_record(&mut self, index: u32, id: u64, price: f32, name: &str) -> Result<(), Error> {
        if index as usize >= MAX_RECORDS {
            return Err(Error::IndexOutOfRange);
        }
        let record = ProductRecord::new(id, price, name);
        Ok(self.flash.write(record_address(index), &record.to_bytes())?)
    }

    /// Reads the record at `index`, if its slot holds a committed record.
    pub fn read_record(&mut self, index: u32) -> Result<Option<ProductRecord>, Error> {
        if index as usize >= MAX_RECORDS {
            return Err(Error::IndexOutOfRange);
        }
        let mut bytes = [0u8; RECORD_SIZE];
        block!(self.flash.read(record_address(index), &mut bytes))?;
        Ok(ProductRecord::from_bytes(&bytes))
    }

    /// Linear scan over the committed records. Only the id is read for
    /// each slot; the full record is read and its marker checked on a
    /// match. The lowest matching index wins.
    pub fn find_by_id(&mut self, id: u64) -> Result<Option<ProductRecord>, Error> {
        for index in 0..self.cached_count {
            let mut id_bytes = [0u8; 8];
            block!(self.flash.read(record_address(index), &mut id_bytes))?;
            if u64::from_le_bytes(id_bytes) != id {
                continue;
            }
            if let Some(record) = self.read_record(index)? {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    /// Writes a fresh header for `count` records and adopts it as the
    /// cached count.
    pub fn commit_metadata(&mut self, count: u32, timestamp: u32) -> Result<(), Error> {
        let metadata = CatalogMetadata {
            total_count: count,
            update_timestamp: timestamp,
            version: CATALOG_VERSION,
        };
        self.flash.write(METADATA_ADDRESS, &metadata.to_bytes())?;
        self.cached_count = count.min(MAX_RECORDS as u32);
        log_info!("[Catalog] Header committed. Total: {}", count);
        Ok(())
    }

    /// Reads back the stored header, if valid.
    pub fn metadata(&mut self) -> Result<Option<CatalogMetadata>, Error> {
        let mut bytes = [0u8; METADATA_SIZE];
        block!(self.flash.read(METADATA_ADDRESS, &mut bytes))?;
        Ok(CatalogMetadata::from_bytes(&bytes))
    }

    /// Committed records in index order. Unreadable and invalid slots
    /// are skipped.
    pub fn records(&mut self) -> impl Iterator<Item = (u32, ProductRecord)> + '_ {
        let count = self.cached_count;
        (0..count).filter_map(move |index| match self.read_record(index) {
            Ok(Some(record)) => Some((index, record)),
            _ => None,
        })
    }

    /// Writes every committed record to a serial device, one per line.
    pub fn dump<S: serial::Write>(&mut self, serial: &mut S) -> Result<(), Error> {
        let mut writer = serial::Writer(serial);
        uwriteln!(writer, "--- Catalog dump ({} items) ---", self.cached_count)
            .map_err(|_| Error::TransportError)?;
        for (index, record) in self.records() {
            uwriteln!(
                writer,
                "[{}] ID:{}, Price:{}, Name:{}",
                index,
                record.id,
                Price(record.price),
                record.name.as_str()
            )
            .map_err(|_| Error::TransportError)?;
        }
        uwriteln!(writer, "--- End ---").map_err(|_| Error::TransportError)
    }

    /// Gives back the underlying device.
    pub fn release(self) -> F { self.flash }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        config::PAGE_SIZE,
        hal::doubles::{flash::FakeFlash, serial::MockSerial},
    };

    fn device_size() -> usize { RECORDS_ADDRESS as usize + DATA_SECTORS * SECTOR_SIZE }

    fn blank_flash() -> FakeFlash { FakeFlash::new(PAGE_SIZE, SECTOR_SIZE, device_size()) }

    fn catalog_with(records: &[(u64, f32, &str)]) -> Catalog<FakeFlash> {
        let mut catalog = Catalog::init(blank_flash());
        catalog.erase_all().unwrap();
        for (index, (id, price, name)) in records.iter().enumerate() {
            catalog.write_record(index as u32, *id, *price, name).unwrap();
        }
        catalog.commit_metadata(records.len() as u32, 0).unwrap();
        catalog
    }

    #[test]
    fn blank_device_initializes_as_an_empty_catalog() {
        let catalog = Catalog::init(blank_flash());
        assert_eq!(catalog.count(), 0);
    }

    #[test]
    fn corrupt_header_initializes_as_an_empty_catalog() {
        // Given
        let mut flash = blank_flash();
        flash.poke(METADATA_ADDRESS, &[0x03, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0xFF, 0xFF, 0x12, 0x34, 0x56, 0x78]);

        // Then
        assert_eq!(Catalog::init(flash).count(), 0);
    }

    #[test]
    fn committed_count_survives_a_restart() {
        // Given
        let catalog = catalog_with(&[(1, 1.0, "a"), (2, 2.0, "b")]);

        // When
        let mut restarted = Catalog::init(catalog.release());

        // Then
        assert_eq!(restarted.count(), 2);
        assert_eq!(
            restarted.metadata().unwrap(),
            Some(CatalogMetadata { total_count: 2, update_timestamp: 0, version: CATALOG_VERSION })
        );
    }

    #[test]
    fn written_records_read_back_identically() {
        // Given
        let mut catalog = catalog_with(&[]);

        // When
        catalog.write_record(7, 6912345, 19.90, "Milk").unwrap();

        // Then
        let record = catalog.read_record(7).unwrap().unwrap();
        assert_eq!(record, ProductRecord::new(6912345, 19.90, "Milk"));
        assert_eq!(record.name.as_str(), "Milk");
    }

    #[test]
    fn long_names_are_truncated_to_capacity() {
        // Given
        let long_name = "x".repeat(60);
        let mut catalog = catalog_with(&[]);

        // When
        catalog.write_record(0, 1, 1.0, &long_name).unwrap();

        // Then
        let record = catalog.read_record(0).unwrap().unwrap();
        assert_eq!(record.name.len(), NAME_CAPACITY - 1);
        assert_eq!(record.to_bytes()[RECORD_MARKER_OFFSET - 1], 0);
    }

    #[test]
    fn truncation_respects_character_boundaries() {
        // 23 two byte characters, then one that would straddle byte 47
        let text = "é".repeat(24);
        let name = truncated_name(&text);
        assert_eq!(name.len(), 46);
        assert!(name.chars().all(|c| c == 'é'));
    }

    #[test]
    fn erased_and_torn_slots_are_absent() {
        // Given
        let mut catalog = catalog_with(&[(5, 5.0, "five")]);
        // Torn write: id landed, marker never did
        let mut torn = ProductRecord::new(6, 6.0, "six").to_bytes();
        torn[RECORD_MARKER_OFFSET..].copy_from_slice(&[0xFF; 4]);
        let header = CatalogMetadata { total_count: 3, update_timestamp: 0, version: CATALOG_VERSION };
        let mut flash = catalog.release();
        flash.poke(record_address(1), &torn);
        flash.poke(METADATA_ADDRESS, &header.to_bytes());
        let mut catalog = Catalog::init(flash);

        // Then
        assert_eq!(catalog.count(), 3);
        assert_eq!(catalog.read_record(1).unwrap(), None);
        assert_eq!(catalog.read_record(2).unwrap(), None);
        assert_eq!(catalog.find_by_id(6).unwrap(), None);
    }

    #[test]
    fn lookups_find_committed_records() {
        // Given
        let mut catalog = catalog_with(&[(11, 1.5, "tea"), (22, 2.5, "rice"), (33, 3.5, "soap")]);

        // Then
        assert_eq!(catalog.find_by_id(22).unwrap(), Some(ProductRecord::new(22, 2.5, "rice")));
        assert_eq!(catalog.find_by_id(44).unwrap(), None);
    }

    #[test]
    fn lookups_never_scan_past_the_cached_count() {
        // Given
        let mut catalog = catalog_with(&[(11, 1.5, "tea"), (22, 2.5, "rice")]);
        catalog.write_record(2, 33, 3.5, "soap").unwrap();
        let mut flash = catalog.release();
        flash.reset_counters();
        let mut catalog = Catalog::init(flash);
        let reads_at_init = 1;

        // When
        let found = catalog.find_by_id(33).unwrap();

        // Then
        assert_eq!(found, None);
        let flash = catalog.release();
        assert_eq!(flash.reads(), reads_at_init + 2);
    }

    #[test]
    fn duplicate_ids_resolve_to_the_lowest_index() {
        let mut catalog = catalog_with(&[(9, 1.0, "first"), (9, 2.0, "second")]);
        assert_eq!(catalog.find_by_id(9).unwrap().unwrap().name.as_str(), "first");
    }

    #[test]
    fn erase_clears_records_header_and_count() {
        // Given
        let mut flash = catalog_with(&[(1, 1.0, "a")]).release();
        flash.reset_counters();
        let mut catalog = Catalog::init(flash);

        // When
        catalog.erase_all().unwrap();

        // Then
        assert_eq!(catalog.count(), 0);
        assert_eq!(catalog.read_record(0).unwrap(), None);
        assert_eq!(catalog.metadata().unwrap(), None);
        let flash = catalog.release();
        assert_eq!(flash.erases().len(), 1 + DATA_SECTORS);
        assert_eq!(flash.erases()[0], METADATA_ADDRESS);
        assert_eq!(flash.erases()[1], RECORDS_ADDRESS);
    }

    #[test]
    fn writes_beyond_the_erased_region_are_rejected() {
        let mut catalog = catalog_with(&[]);
        assert_eq!(
            catalog.write_record(MAX_RECORDS as u32, 1, 1.0, "x"),
            Err(Error::IndexOutOfRange)
        );
    }

    #[test]
    fn records_straddling_small_pages_are_split_transparently() {
        // Given
        let mut catalog = Catalog::init(FakeFlash::new(16, SECTOR_SIZE, device_size()));

        // When
        catalog.write_record(3, 42, 4.2, "split").unwrap();

        // Then
        assert_eq!(catalog.read_record(3).unwrap(), Some(ProductRecord::new(42, 4.2, "split")));
        let flash = catalog.release();
        assert_eq!(flash.programs().len(), RECORD_SIZE / 16);
    }

    #[test]
    fn dump_lists_every_committed_record() {
        // Given
        let mut catalog = catalog_with(&[(11, 1.5, "tea"), (22, 19.9, "rice")]);
        let mut serial = MockSerial::default();

        // When
        catalog.dump(&mut serial).unwrap();

        // Then
        assert_eq!(serial.lines(), vec![
            "--- Catalog dump (2 items) ---",
            "[0] ID:11, Price:1.50, Name:tea",
            "[1] ID:22, Price:19.90, Name:rice",
            "--- End ---",
        ]);
    }
}
