//! Device driver for the Winbond W25Q64 serial NOR flash.
//!
//! 8MB organised in 256 byte program pages and 4KB erase sectors.
//! Write capable commands yield `WouldBlock` while the chip reports a
//! write in progress, so wrapping them in `nb::block!` busy-waits on the
//! device's completion signal.
use crate::{
    error::{self, Convertible},
    hal::{flash::BlockDevice, gpio, spi, time::Milliseconds},
    mb,
    utilities::bitwise::BitFlags,
};

/// JEDEC manufacturer id for Winbond.
const MANUFACTURER_ID: u8 = 0xEF;

const PAGE_SIZE: usize = 256;
const SECTOR_SIZE: usize = 4096;
const MEMORY_SIZE: usize = mb!(8);

/// Worst case page program time from the datasheet AC characteristics.
pub const PAGE_PROGRAM_WORST_CASE: Milliseconds = Milliseconds(3);
/// Worst case 4KB sector erase time from the datasheet AC characteristics.
pub const SECTOR_ERASE_WORST_CASE: Milliseconds = Milliseconds(400);

pub struct W25q64<SPI, CS>
where
    SPI: spi::FullDuplex<u8>,
    CS: gpio::OutputPin,
{
    spi: SPI,
    chip_select: CS,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    SpiError,
    WrongManufacturerId,
    MisalignedAccess,
    AddressOutOfRange,
}

impl Convertible for Error {
    fn into(self) -> error::Error {
        match self {
            Error::SpiError => error::Error::DriverError("Flash SPI transfer failed"),
            Error::WrongManufacturerId => error::Error::DriverError("Unexpected flash chip id"),
            Error::MisalignedAccess => error::Error::DeviceError("Program crosses a flash page"),
            Error::AddressOutOfRange => error::Error::DeviceError("Flash address out of range"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Command {
    PageProgram = 0x02,
    ReadData = 0x03,
    ReadStatus = 0x05,
    WriteEnable = 0x06,
    SectorErase = 0x20,
    JedecId = 0x9F,
}

struct Status {
    write_in_progress: bool,
}

enum CommandData<'a> {
    Read(&'a mut [u8]),
    Write(&'a [u8]),
    None,
}

impl<SPI, CS> W25q64<SPI, CS>
where
    SPI: spi::FullDuplex<u8>,
    CS: gpio::OutputPin,
{
    /// Fails if the chip doesn't answer with the Winbond JEDEC id.
    pub fn new(spi: SPI, mut chip_select: CS) -> Result<Self, Error> {
        chip_select.set_high();
        let mut flash = Self { spi, chip_select };
        flash.verify_id()?;
        Ok(flash)
    }

    fn verify_id(&mut self) -> Result<(), Error> {
        let mut response = [0u8; 3];
        self.execute_command(Command::JedecId, None, CommandData::Read(&mut response))?;
        match response[0] {
            MANUFACTURER_ID => Ok(()),
            _ => Err(Error::WrongManufacturerId),
        }
    }

    fn status(&mut self) -> Result<Status, Error> {
        let mut response = [0u8; 1];
        self.execute_command(Command::ReadStatus, None, CommandData::Read(&mut response))?;
        Ok(Status { write_in_progress: response[0].is_set(0) })
    }

    fn yield_if_busy(&mut self) -> nb::Result<(), Error> {
        if self.status()?.write_in_progress {
            Err(nb::Error::WouldBlock)
        } else {
            Ok(())
        }
    }

    fn check_range(address: u32, length: usize) -> Result<(), Error> {
        if address as usize + length > MEMORY_SIZE {
            Err(Error::AddressOutOfRange)
        } else {
            Ok(())
        }
    }

    // Low level helper for executing Winbond commands. Chip select is
    // released no matter how the transfer ends.
    fn execute_command(
        &mut self,
        command: Command,
        address: Option<u32>,
        data: CommandData,
    ) -> Result<(), Error> {
        self.chip_select.set_low();
        let result = Self::transfer(&mut self.spi, command, address, data);
        self.chip_select.set_high();
        result
    }

    fn transfer(
        spi: &mut SPI,
        command: Command,
        address: Option<u32>,
        data: CommandData,
    ) -> Result<(), Error> {
        spi.exchange(Some(command as u8)).map_err(|_| Error::SpiError)?;
        if let Some(address) = address {
            for byte in &address.to_be_bytes()[1..] {
                spi.exchange(Some(*byte)).map_err(|_| Error::SpiError)?;
            }
        }
        match data {
            CommandData::Write(bytes) => {
                for byte in bytes {
                    spi.exchange(Some(*byte)).map_err(|_| Error::SpiError)?;
                }
            }
            CommandData::Read(buffer) => {
                for byte in buffer {
                    *byte = spi.exchange(None).map_err(|_| Error::SpiError)?;
                }
            }
            CommandData::None => (),
        }
        Ok(())
    }
}

impl<SPI, CS> BlockDevice for W25q64<SPI, CS>
where
    SPI: spi::FullDuplex<u8>,
    CS: gpio::OutputPin,
{
    type Error = Error;

    fn page_size(&self) -> usize { PAGE_SIZE }

    fn sector_size(&self) -> usize { SECTOR_SIZE }

    fn read(&mut self, address: u32, bytes: &mut [u8]) -> nb::Result<(), Self::Error> {
        Self::check_range(address, bytes.len())?;
        self.yield_if_busy()?;
        Ok(self.execute_command(Command::ReadData, Some(address), CommandData::Read(bytes))?)
    }

    fn program_page(&mut self, address: u32, bytes: &[u8]) -> nb::Result<(), Self::Error> {
        Self::check_range(address, bytes.len())?;
        if address as usize % PAGE_SIZE + bytes.len() > PAGE_SIZE {
            return Err(nb::Error::Other(Error::MisalignedAccess));
        }
        self.yield_if_busy()?;
        self.execute_command(Command::WriteEnable, None, CommandData::None)?;
        Ok(self.execute_command(Command::PageProgram, Some(address), CommandData::Write(bytes))?)
    }

    fn erase_sector(&mut self, address: u32) -> nb::Result<(), Self::Error> {
        Self::check_range(address, 0)?;
        let sector_base = address - (address % SECTOR_SIZE as u32);
        self.yield_if_busy()?;
        self.execute_command(Command::WriteEnable, None, CommandData::None)?;
        Ok(self.execute_command(Command::SectorErase, Some(sector_base), CommandData::None)?)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::hal::doubles::{gpio::MockPin, spi::MockSpi};

    fn flash_to_test() -> W25q64<MockSpi<u8>, MockPin> {
        let spi = MockSpi::answering([0, MANUFACTURER_ID, 0x40, 0x17]);
        let mut flash = W25q64::new(spi, MockPin::default()).unwrap();
        // Chip select is released, then wiggled to send the id command
        assert_eq!(flash.chip_select.changes, vec![true, false, true]);
        assert_eq!(flash.spi.sent.pop_front().unwrap(), Command::JedecId as u8);
        flash.spi.sent.clear();
        flash.spi.to_receive.clear();
        flash.chip_select.changes.clear();
        flash
    }

    #[test]
    fn initialisation_succeeds_for_correct_manufacturer_id() {
        const WRONG_MANUFACTURER_ID: u8 = 0x20;

        // Given
        let spi = MockSpi::answering([0, WRONG_MANUFACTURER_ID, 0xBA, 0x18]);

        // Then
        assert_eq!(
            W25q64::new(spi, MockPin::default()).err(),
            Some(Error::WrongManufacturerId)
        );

        // Given
        let spi = MockSpi::answering([0, MANUFACTURER_ID, 0x40, 0x17]);

        // Then
        assert!(W25q64::new(spi, MockPin::default()).is_ok());
    }

    #[test]
    fn page_program_command_sequence() {
        // Given
        let mut flash = flash_to_test();

        // When
        flash.program_page(0x000102, &[0xAA, 0xBB]).unwrap();

        // Then
        assert_eq!(flash.spi.sent_words(), vec![
            Command::ReadStatus as u8,
            Command::WriteEnable as u8,
            Command::PageProgram as u8,
            0x00, 0x01, 0x02,
            0xAA, 0xBB,
        ]);
        assert_eq!(flash.chip_select.frames(), 3);
        assert!(flash.chip_select.level());
    }

    #[test]
    fn programs_crossing_a_page_are_rejected_without_bus_traffic() {
        // Given
        let mut flash = flash_to_test();

        // Then
        assert_eq!(
            flash.program_page(0x0000FF, &[0x00, 0x00]),
            Err(nb::Error::Other(Error::MisalignedAccess))
        );
        assert!(flash.spi.sent.is_empty());
    }

    #[test]
    fn write_capable_commands_yield_if_device_busy() {
        // Given
        const BUSY_WRITING_STATUS: u8 = 1;
        let mut flash = flash_to_test();
        flash.spi.to_receive.extend([0, BUSY_WRITING_STATUS]);

        // Then
        assert_eq!(flash.erase_sector(0x1000), Err(nb::Error::WouldBlock));
        assert_eq!(flash.spi.sent_words(), vec![Command::ReadStatus as u8]);
    }

    #[test]
    fn sector_erase_targets_the_sector_base() {
        // Given
        let mut flash = flash_to_test();

        // When
        flash.erase_sector(0x001234).unwrap();

        // Then
        assert_eq!(flash.spi.sent_words(), vec![
            Command::ReadStatus as u8,
            Command::WriteEnable as u8,
            Command::SectorErase as u8,
            0x00, 0x10, 0x00,
        ]);
    }

    #[test]
    fn reads_return_the_clocked_in_bytes() {
        // Given
        let mut flash = flash_to_test();
        // Status frame (2 words), read command and address (4 words), then data
        flash.spi.to_receive.extend([0, 0, 0, 0, 0, 0, 0x12, 0x34]);
        let mut buffer = [0u8; 2];

        // When
        flash.read(0x000010, &mut buffer).unwrap();

        // Then
        assert_eq!(buffer, [0x12, 0x34]);
        assert_eq!(flash.spi.sent_words(), vec![
            Command::ReadStatus as u8,
            Command::ReadData as u8,
            0x00, 0x00, 0x10,
        ]);
    }

    #[test]
    fn out_of_range_accesses_are_rejected() {
        let mut flash = flash_to_test();
        let mut buffer = [0u8; 4];
        assert_eq!(
            flash.read(MEMORY_SIZE as u32 - 2, &mut buffer),
            Err(nb::Error::Other(Error::AddressOutOfRange))
        );
    }
}
