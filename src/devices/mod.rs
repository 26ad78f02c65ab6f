//! Modules with business logic related to the problem domain,
//! laid on top of abstract drivers. Devices are generic over the
//! `hal` traits, so the same code runs on the board and on the host.

pub mod catalog;
pub mod interfaces;
pub mod protocol;
pub mod sync;
pub mod terminal;
