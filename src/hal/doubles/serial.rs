use crate::hal::serial;

/// Transport double recording every byte sent through it.
#[derive(Debug, Default)]
pub struct MockSerial {
    pub write_record: Vec<u8>,
    /// When set, every send fails
    pub broken: bool,
}

impl MockSerial {
    pub fn written(&self) -> &str { core::str::from_utf8(&self.write_record).unwrap_or("") }

    /// Complete lines sent so far, without terminators
    pub fn lines(&self) -> Vec<&str> { self.written().lines().collect() }

    pub fn clear(&mut self) { self.write_record.clear(); }
}

impl serial::Write for MockSerial {
    type Error = ();

    fn send(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        if self.broken {
            return Err(());
        }
        self.write_record.extend_from_slice(bytes);
        Ok(())
    }
}
