//! Line oriented text protocol spoken with the host.
//!
//! Bytes arrive through a [`ring_buffer::RingBuffer`] filled from the
//! receive interrupt. The [`Decoder`] drains it from the application loop,
//! assembles lines and classifies each one into an [`Event`]:
//!
//! ```text
//! CMD:SYNC_START,TOTAL:<count>
//! CMD:SYNC_DATA,ID:<id>,PR:<price>,NM:<name>
//! CMD:SYNC_END,SUM:<count>
//! CMD:SCAN,ID:<id>
//! ```
//!
//! Classification matches the command token anywhere in the line, so
//! line noise ahead of `CMD:` is tolerated. Lines matching no command
//! are dropped and draining continues.
use crate::{
    config::{LINE_BUFFER_SIZE, RING_BUFFER_SIZE},
    devices::catalog::{truncated_name, utf8_prefix, Name},
};
use heapless::Vec;
use ring_buffer::Consumer;

pub mod reply;
pub mod ring_buffer;

/// Payload of a `SYNC_DATA` line.
#[derive(Clone, Debug, PartialEq)]
pub struct ProductData {
    /// `None` when the id was absent, empty, not all digits or too large.
    pub id: Option<u64>,
    pub price: f32,
    pub name: Name,
}

impl ProductData {
    pub fn id_valid(&self) -> bool { self.id.is_some() }
}

/// A decoded protocol line.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    SyncStart { expected_count: u32 },
    SyncData(ProductData),
    SyncEnd { reported_count: u32 },
    Scan { id: Option<u64> },
}

/// Position of the first occurrence of `needle` in `haystack`.
fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

/// Extracts the value of `KEY:` up to the next comma or the end of the
/// line. Keys start a field, so they follow a comma or open the line.
/// Returns `None` if the key never appears.
fn field<'a>(line: &'a [u8], key: &[u8]) -> Option<&'a [u8]> {
    let mut offset = 0;
    while let Some(position) = find(&line[offset..], key) {
        let start = offset + position;
        let at_boundary = start == 0 || line[start - 1] == b',';
        match line[start + key.len()..].split_first() {
            Some((b':', value)) if at_boundary => {
                let end = value.iter().position(|b| *b == b',').unwrap_or(value.len());
                return Some(&value[..end]);
            }
            _ => offset = start + key.len(),
        }
    }
    None
}

fn text(value: Option<&[u8]>) -> &str { value.map(utf8_prefix).unwrap_or("").trim_start() }

/// Leading run of decimal digits, optionally signed with `+`. Anything
/// after it, a fractional part included, is ignored.
fn parse_count(value: Option<&[u8]>) -> u32 {
    let value = text(value);
    let unsigned = value.strip_prefix('+').unwrap_or(value);
    let digits = unsigned.bytes().take_while(u8::is_ascii_digit).count();
    unsigned[..digits].parse().unwrap_or(0)
}

/// Longest leading run of number characters that reads as a float.
fn parse_price(value: Option<&[u8]>) -> f32 {
    let value = text(value);
    let candidate = value
        .bytes()
        .take_while(|b| b.is_ascii_digit() || matches!(*b, b'+' | b'-' | b'.' | b'e' | b'E'))
        .count();
    (1..=candidate).rev().find_map(|end| value[..end].parse().ok()).unwrap_or(0.0)
}

/// Ids are plain unsigned decimal integers that fit in 64 bits.
fn parse_id(value: Option<&[u8]>) -> Option<u64> {
    let value = value?;
    if value.is_empty() || !value.iter().all(u8::is_ascii_digit) {
        return None;
    }
    core::str::from_utf8(value).ok()?.parse().ok()
}

/// Classifies a complete line, without its terminator. Matching works on
/// raw bytes, so undecodable noise around the fields is harmless. Only
/// the name is decoded as text, up to its first invalid UTF-8 sequence.
pub fn parse_line(line: &[u8]) -> Option<Event> {
    if find(line, b"CMD:SYNC_START").is_some() {
        Some(Event::SyncStart { expected_count: parse_count(field(line, b"TOTAL")) })
    } else if find(line, b"CMD:SYNC_DATA").is_some() {
        Some(Event::SyncData(ProductData {
            id: parse_id(field(line, b"ID")),
            price: parse_price(field(line, b"PR")),
            name: truncated_name(utf8_prefix(field(line, b"NM").unwrap_or(b""))),
        }))
    } else if find(line, b"CMD:SYNC_END").is_some() {
        Some(Event::SyncEnd { reported_count: parse_count(field(line, b"SUM")) })
    } else if find(line, b"CMD:SCAN").is_some() {
        Some(Event::Scan { id: parse_id(field(line, b"ID")) })
    } else {
        None
    }
}

/// Assembles lines out of the receive queue.
pub struct Decoder<'a, const N: usize = RING_BUFFER_SIZE, const L: usize = LINE_BUFFER_SIZE> {
    consumer: Consumer<'a, N>,
    line: Vec<u8, L>,
    truncated: bool,
}

impl<'a, const N: usize, const L: usize> Decoder<'a, N, L> {
    pub fn new(consumer: Consumer<'a, N>) -> Self {
        Self { consumer, line: Vec::new(), truncated: false }
    }

    /// No bytes left in the receive queue.
    pub fn is_drained(&self) -> bool { self.consumer.is_empty() }

    /// Drains queued bytes until a line decodes into an event, or the
    /// queue runs dry. A partial line is kept for the next call.
    ///
    /// Carriage returns are ignored, line feeds terminate. Bytes past the
    /// line capacity are dropped and the line is decoded truncated.
    pub fn try_parse_line(&mut self) -> Option<Event> {
        let dropped = self.consumer.take_dropped();
        if dropped > 0 {
            log_warn!("[Protocol] Receive queue overflow, {} bytes lost", dropped);
        }

        while let Some(byte) = self.consumer.dequeue() {
            match byte {
                b'\r' => {}
                b'\n' => {
                    if self.truncated {
                        log_warn!("[Protocol] Line truncated to {} bytes", L);
                    }
                    let event = parse_line(&self.line);
                    self.line.clear();
                    self.truncated = false;
                    if event.is_some() {
                        return event;
                    }
                }
                _ => {
                    if self.line.push(byte).is_err() {
                        self.truncated = true;
                    }
                }
            }
        }
        None
    }
}
