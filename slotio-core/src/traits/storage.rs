//! Byte-addressable nonvolatile storage

/// Nonvolatile storage errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NvError {
    /// The device did not respond or the transfer failed
    Bus,
    /// Access extends past the end of the device
    OutOfRange,
}

/// Byte-addressable nonvolatile memory (FRAM, EEPROM)
///
/// Writes take effect immediately; there is no erase step and no
/// alignment requirement.
pub trait NvStorage {
    /// Device size in bytes
    fn capacity(&self) -> u32;

    /// Read `buf.len()` bytes starting at `address`
    fn read(&mut self, address: u16, buf: &mut [u8]) -> Result<(), NvError>;

    /// Write `data` starting at `address`
    fn write(&mut self, address: u16, data: &[u8]) -> Result<(), NvError>;
}
