//! # Checkout Terminal Library
//!
//! This crate contains the firmware core of a self-service
//! retail terminal in library form: the flash backed product
//! catalog, the host synchronization protocol and the state
//! machines that drive a shopping session.
#![cfg_attr(test, allow(unused_imports))]
#![cfg_attr(target_arch = "arm", no_std)]

extern crate static_assertions;

#[macro_use]
pub mod utilities {
    #[macro_use]
    mod macros;
    pub mod bitwise;
    #[macro_use]
    pub mod memory;
}

pub mod config;
pub mod devices;
pub mod drivers;
pub mod error;
pub mod hal;
