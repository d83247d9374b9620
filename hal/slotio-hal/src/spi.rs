//! SPI bus abstractions
//!
//! Chip select is not part of the bus: the shift-register chains on the
//! card are framed by their own latch lines, driven as [`OutputPin`]s.
//!
//! [`OutputPin`]: crate::gpio::OutputPin

/// SPI bus master
pub trait SpiBus {
    /// Error type for SPI operations
    type Error;

    /// Write data without reading
    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Read data (writes zeros)
    fn read(&mut self, buf: &mut [u8]) -> Result<(), Self::Error>;
}
