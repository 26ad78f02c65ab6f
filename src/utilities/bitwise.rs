//! Bit and byte level checks on raw device data.

/// Single bit queries on status words.
pub trait BitFlags: Copy {
    fn is_set(self, bit: u8) -> bool;

    fn is_clear(self, bit: u8) -> bool { !self.is_set(bit) }
}

impl BitFlags for u8 {
    fn is_set(self, bit: u8) -> bool { bit < 8 && self & (1 << bit) != 0 }
}

impl BitFlags for u32 {
    fn is_set(self, bit: u8) -> bool { bit < 32 && self & (1 << bit) != 0 }
}

/// True if every byte reads back as freshly erased NOR flash.
pub fn is_erased(bytes: &[u8]) -> bool { bytes.iter().all(|b| *b == 0xFF) }

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn status_bits_are_queried_individually() {
        let busy_and_write_enabled = 0b0000_0011u8;
        assert!(busy_and_write_enabled.is_set(0));
        assert!(busy_and_write_enabled.is_set(1));
        assert!(busy_and_write_enabled.is_clear(2));
        assert!(0x8000_0000u32.is_set(31));
        assert!(0xFFu8.is_clear(8));
    }

    #[test]
    fn erased_detection() {
        assert!(is_erased(&[0xFF, 0xFF, 0xFF]));
        assert!(is_erased(&[]));
        assert!(!is_erased(&[0xFF, 0xFE]));
    }
}
