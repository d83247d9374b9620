//! 74HC165 / 74HC595 shift-register chain
//!
//! Both chains hang off one SPI bus. The '165 input chain parallel-loads
//! while SH/nLD is low and shifts out on MISO once it goes high; the '595
//! output chain shifts in from MOSI and presents its shift stage on the
//! outputs at the rising edge of RCLK. Byte 0 is the first byte on the wire
//! in both directions.

use slotio_core::topology::{INPUT_BYTES, OUTPUT_BYTES};
use slotio_core::traits::{IoBoard, IoError};
use slotio_hal::{OutputPin, SpiBus};

/// Input and output chains sharing one bus
pub struct ShiftRegisterChain<SPI, L> {
    spi: SPI,
    /// '165 SH/nLD
    load: L,
    /// '595 RCLK
    latch: L,
}

impl<SPI: SpiBus, L: OutputPin> ShiftRegisterChain<SPI, L> {
    /// Take ownership of the bus and both strobe lines
    ///
    /// Both lines idle high: the '165 in shift mode and RCLK ready for the
    /// next rising edge.
    pub fn new(spi: SPI, mut load: L, mut latch: L) -> Self {
        load.set_high();
        latch.set_high();
        Self { spi, load, latch }
    }

    pub fn release(self) -> (SPI, L, L) {
        (self.spi, self.load, self.latch)
    }
}

impl<SPI: SpiBus, L: OutputPin> IoBoard for ShiftRegisterChain<SPI, L> {
    fn sample_inputs(&mut self, inputs: &mut [u8; INPUT_BYTES]) -> Result<(), IoError> {
        // Snapshot every line at once, then clock the snapshot out
        self.load.set_low();
        self.load.set_high();
        self.spi.read(inputs).map_err(|_| IoError::Bus)
    }

    fn assert_outputs(&mut self, outputs: &[u8; OUTPUT_BYTES]) -> Result<(), IoError> {
        self.latch.set_low();
        let result = self.spi.write(outputs).map_err(|_| IoError::Bus);
        // Only latch a complete image
        if result.is_ok() {
            self.latch.set_high();
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq)]
    enum Op {
        Pin(&'static str, bool),
        Read(usize),
        Write(Vec<u8>),
    }

    type Log = Rc<RefCell<Vec<Op>>>;

    struct MockPin {
        name: &'static str,
        high: bool,
        log: Log,
    }

    impl OutputPin for MockPin {
        fn set_high(&mut self) {
            self.high = true;
            self.log.borrow_mut().push(Op::Pin(self.name, true));
        }

        fn set_low(&mut self) {
            self.high = false;
            self.log.borrow_mut().push(Op::Pin(self.name, false));
        }

        fn is_set_high(&self) -> bool {
            self.high
        }
    }

    struct MockSpi {
        miso: Vec<u8>,
        fail: bool,
        log: Log,
    }

    impl SpiBus for MockSpi {
        type Error = ();

        fn write(&mut self, data: &[u8]) -> Result<(), ()> {
            if self.fail {
                return Err(());
            }
            self.log.borrow_mut().push(Op::Write(data.to_vec()));
            Ok(())
        }

        fn read(&mut self, buf: &mut [u8]) -> Result<(), ()> {
            if self.fail {
                return Err(());
            }
            buf.copy_from_slice(&self.miso[..buf.len()]);
            self.log.borrow_mut().push(Op::Read(buf.len()));
            Ok(())
        }
    }

    fn chain(miso: &[u8]) -> (ShiftRegisterChain<MockSpi, MockPin>, Log) {
        let log = Log::default();
        let pin = |name| MockPin {
            name,
            high: false,
            log: log.clone(),
        };
        let spi = MockSpi {
            miso: miso.to_vec(),
            fail: false,
            log: log.clone(),
        };
        let chain = ShiftRegisterChain::new(spi, pin("load"), pin("latch"));
        log.borrow_mut().clear();
        (chain, log)
    }

    #[test]
    fn test_new_idles_strobes_high() {
        let (chain, _) = chain(&[]);
        let (_, load, latch) = chain.release();
        assert!(load.is_set_high());
        assert!(latch.is_set_high());
    }

    #[test]
    fn test_sample_loads_then_shifts() {
        let (mut chain, log) = chain(&[0x12, 0x34, 0x56]);
        let mut inputs = [0u8; INPUT_BYTES];
        chain.sample_inputs(&mut inputs).unwrap();

        assert_eq!(inputs, [0x12, 0x34, 0x56]);
        assert_eq!(
            *log.borrow(),
            vec![Op::Pin("load", false), Op::Pin("load", true), Op::Read(3)]
        );
    }

    #[test]
    fn test_assert_latches_after_write() {
        let (mut chain, log) = chain(&[]);
        chain.assert_outputs(&[0x80, 0x01, 0xFF]).unwrap();

        assert_eq!(
            *log.borrow(),
            vec![
                Op::Pin("latch", false),
                Op::Write(vec![0x80, 0x01, 0xFF]),
                Op::Pin("latch", true),
            ]
        );
    }

    #[test]
    fn test_bus_error_skips_latch() {
        let (mut chain, log) = chain(&[0; 3]);
        chain.spi.fail = true;

        assert_eq!(chain.assert_outputs(&[0; OUTPUT_BYTES]), Err(IoError::Bus));
        assert_eq!(*log.borrow(), vec![Op::Pin("latch", false)]);

        let mut inputs = [0u8; INPUT_BYTES];
        assert_eq!(chain.sample_inputs(&mut inputs), Err(IoError::Bus));
    }
}
