//! Build time configuration.
//!
//! All values come from `terminal_config.ron` through the build script.
//! Derived values and layout sanity checks live here so that an
//! inconsistent configuration fails to compile.
use crate::devices::catalog::{METADATA_SIZE, RECORD_SIZE};
use static_assertions::const_assert;

include!(concat!(env!("OUT_DIR"), "/config.rs"));

/// Number of records covered by the data sectors erased at the start
/// of every sync. Writes beyond this index are rejected.
pub const MAX_RECORDS: usize = DATA_SECTORS * SECTOR_SIZE / RECORD_SIZE;

// Records and program pages nest evenly.
const_assert!(PAGE_SIZE % RECORD_SIZE == 0 || RECORD_SIZE % PAGE_SIZE == 0);
const_assert!(METADATA_SIZE <= SECTOR_SIZE);
const_assert!((METADATA_ADDRESS as usize) + SECTOR_SIZE <= RECORDS_ADDRESS as usize);
const_assert!(MAX_RECORDS > 0);
const_assert!(RING_BUFFER_SIZE >= 2);
const_assert!(LINE_BUFFER_SIZE > 0);
