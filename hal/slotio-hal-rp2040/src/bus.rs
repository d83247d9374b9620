//! Adapters from `embedded-hal` 1.0 onto the `slotio-hal` traits
//!
//! embassy-rp implements the `embedded-hal` traits for its blocking SPI,
//! I2C and GPIO drivers; wrapping them here keeps slotio-drivers free of
//! any chip crate.

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, OutputPin as EhOutputPin};
use embedded_hal::i2c::I2c;
use embedded_hal::spi::SpiBus as EhSpiBus;
use slotio_hal::{I2cBus, OutputPin, SpiBus};

/// Blocking `embedded-hal` SPI bus
pub struct EhSpi<S>(pub S);

impl<S: EhSpiBus> SpiBus for EhSpi<S> {
    type Error = S::Error;

    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.0.write(data)?;
        // The latch edge must not race the last bits on the wire
        self.0.flush()
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<(), Self::Error> {
        self.0.read(buf)?;
        self.0.flush()
    }
}

/// Blocking `embedded-hal` I2C bus
pub struct EhI2c<I>(pub I);

impl<I: I2c> I2cBus for EhI2c<I> {
    type Error = I::Error;

    fn write(&mut self, address: u8, data: &[u8]) -> Result<(), Self::Error> {
        self.0.write(address, data)
    }

    fn write_read(
        &mut self,
        address: u8,
        write_data: &[u8],
        read_buf: &mut [u8],
    ) -> Result<(), Self::Error> {
        self.0.write_read(address, write_data, read_buf)
    }
}

/// Infallible GPIO output that remembers the level it drove
pub struct EhOutput<P> {
    pin: P,
    high: bool,
}

impl<P> EhOutput<P>
where
    P: EhOutputPin + ErrorType<Error = Infallible>,
{
    pub fn new(pin: P, high: bool) -> Self {
        let mut output = Self { pin, high };
        output.set_state(high);
        output
    }
}

impl<P> OutputPin for EhOutput<P>
where
    P: EhOutputPin + ErrorType<Error = Infallible>,
{
    fn set_high(&mut self) {
        match self.pin.set_high() {
            Ok(()) => self.high = true,
            Err(e) => match e {},
        }
    }

    fn set_low(&mut self) {
        match self.pin.set_low() {
            Ok(()) => self.high = false,
            Err(e) => match e {},
        }
    }

    fn is_set_high(&self) -> bool {
        self.high
    }
}
