//! Driver implementations for the terminal hardware. They offer
//! a safe API on top of the abstract `hal` interfaces.

pub mod clock;

pub mod winbond {
    pub mod w25q64_flash;
}
