//! Address arithmetic for page organised memories.
#![macro_use]

#[macro_export]
macro_rules! mb {
    ($val:expr) => {
        $val * 1024 * 1024
    };
}

/// Iterator splitting a byte range starting at an arbitrary address into
/// spans that never cross a page boundary.
///
/// The first span fills the remainder of the starting page if the address
/// is not page aligned, then full pages follow, then a partial trailing
/// span for whatever is left. Concatenating all spans in order yields the
/// original slice.
pub struct PageSpans<'a> {
    bytes: &'a [u8],
    address: u32,
    page_size: usize,
}

/// Anything that can be sliced into page bounded spans.
pub trait IterableByPages<'a> {
    fn page_spans(self, address: u32, page_size: usize) -> PageSpans<'a>;
}

impl<'a> IterableByPages<'a> for &'a [u8] {
    fn page_spans(self, address: u32, page_size: usize) -> PageSpans<'a> {
        assert!(page_size > 0);
        PageSpans { bytes: self, address, page_size }
    }
}

impl<'a> Iterator for PageSpans<'a> {
    type Item = (u32, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        if self.bytes.is_empty() {
            return None;
        }

        let offset_in_page = self.address as usize % self.page_size;
        let length = (self.page_size - offset_in_page).min(self.bytes.len());
        let (span, rest) = self.bytes.split_at(length);
        let address = self.address;
        self.bytes = rest;
        self.address += length as u32;
        Some((address, span))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn aligned_write_is_split_in_full_pages_and_a_tail() {
        // Given
        let memory = [0xAAu8; 40];

        // When
        let spans: Vec<_> = memory[..].page_spans(0x100, 16).collect();

        // Then
        assert_eq!(spans.len(), 3);
        assert_eq!((spans[0].0, spans[0].1.len()), (0x100, 16));
        assert_eq!((spans[1].0, spans[1].1.len()), (0x110, 16));
        assert_eq!((spans[2].0, spans[2].1.len()), (0x120, 8));
    }

    #[test]
    fn misaligned_write_fills_the_current_page_first() {
        // Given
        let memory: Vec<u8> = (0..64).collect();

        // When
        let spans: Vec<_> = memory[..].page_spans(0x0F3, 32).collect();

        // Then
        assert_eq!((spans[0].0, spans[0].1.len()), (0x0F3, 13));
        assert_eq!((spans[1].0, spans[1].1.len()), (0x100, 32));
        assert_eq!((spans[2].0, spans[2].1.len()), (0x120, 19));
        let rejoined: Vec<u8> = spans.iter().flat_map(|(_, s)| s.iter().copied()).collect();
        assert_eq!(rejoined, memory);
    }

    #[test]
    fn short_write_inside_a_page_is_left_whole() {
        let memory = [1u8, 2, 3];
        let spans: Vec<_> = memory[..].page_spans(0x205, 256).collect();
        assert_eq!(spans, vec![(0x205, &memory[..])]);
    }

    #[test]
    fn no_span_crosses_a_page_boundary() {
        const PAGE: usize = 16;
        let memory = [0x5Au8; 3 * PAGE + 5];
        for offset in 0..PAGE as u32 {
            for (address, span) in memory[..].page_spans(offset, PAGE) {
                let first_page = address as usize / PAGE;
                let last_page = (address as usize + span.len() - 1) / PAGE;
                assert_eq!(first_page, last_page);
            }
        }
    }

    #[test]
    fn empty_write_yields_nothing() {
        assert_eq!([0u8; 0][..].page_spans(0x10, 16).count(), 0);
    }

    #[test]
    fn megabyte_macro() {
        assert_eq!(mb!(8), 0x800000);
    }
}
