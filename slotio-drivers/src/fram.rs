//! MB85RC16 I2C FRAM
//!
//! 2 KiB organized as eight 256-byte segments. The segment number travels
//! in the low three bits of the I2C device address and only the low byte
//! of the memory address is sent on the wire, so no transfer may cross a
//! segment boundary. FRAM writes complete at bus speed; there is no page
//! buffer and no write-completion polling.

use heapless::Vec;
use slotio_core::traits::{NvError, NvStorage};
use slotio_hal::I2cBus;

/// Device address with A2..A0 strapped low
pub const BASE_ADDRESS: u8 = 0x50;

/// Bytes addressable through one device address
pub const SEGMENT_SIZE: usize = 256;

/// MB85RC16 size
pub const MB85RC16_CAPACITY: u32 = 2048;

/// Largest data payload of a single bus transaction
pub const MAX_CHUNK: usize = 32;

pub struct Mb85rc<I2C> {
    i2c: I2C,
    capacity: u32,
}

impl<I2C: I2cBus> Mb85rc<I2C> {
    pub fn new(i2c: I2C) -> Self {
        Self {
            i2c,
            capacity: MB85RC16_CAPACITY,
        }
    }

    pub fn release(self) -> I2C {
        self.i2c
    }

    fn check(&self, address: u16, len: usize) -> Result<(), NvError> {
        if address as u32 + len as u32 > self.capacity {
            return Err(NvError::OutOfRange);
        }
        Ok(())
    }
}

/// Device address selecting the segment that holds `address`
fn device_address(address: u16) -> u8 {
    BASE_ADDRESS | ((address >> 8) & 0x07) as u8
}

/// Length of the next transfer starting at `address`
fn chunk_len(address: u16, remaining: usize) -> usize {
    let to_segment_end = SEGMENT_SIZE - (address as usize % SEGMENT_SIZE);
    remaining.min(to_segment_end).min(MAX_CHUNK)
}

impl<I2C: I2cBus> NvStorage for Mb85rc<I2C> {
    fn capacity(&self) -> u32 {
        self.capacity
    }

    fn read(&mut self, address: u16, buf: &mut [u8]) -> Result<(), NvError> {
        self.check(address, buf.len())?;

        let mut address = address;
        let mut rest = buf;
        while !rest.is_empty() {
            let n = chunk_len(address, rest.len());
            let (chunk, tail) = rest.split_at_mut(n);
            self.i2c
                .write_read(device_address(address), &[address as u8], chunk)
                .map_err(|_| NvError::Bus)?;
            address += n as u16;
            rest = tail;
        }
        Ok(())
    }

    fn write(&mut self, address: u16, data: &[u8]) -> Result<(), NvError> {
        self.check(address, data.len())?;

        let mut address = address;
        let mut rest = data;
        while !rest.is_empty() {
            let n = chunk_len(address, rest.len());
            let (chunk, tail) = rest.split_at(n);

            let mut frame: Vec<u8, { MAX_CHUNK + 1 }> = Vec::new();
            frame.push(address as u8).map_err(|_| NvError::Bus)?;
            frame.extend_from_slice(chunk).map_err(|_| NvError::Bus)?;
            self.i2c
                .write(device_address(address), &frame)
                .map_err(|_| NvError::Bus)?;

            address += n as u16;
            rest = tail;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Bus with one emulated MB85RC16 behind it
    struct MockI2c {
        memory: [u8; MB85RC16_CAPACITY as usize],
        transactions: Vec<(u8, usize), 128>,
        fail: bool,
    }

    impl MockI2c {
        fn new() -> Self {
            Self {
                memory: [0; MB85RC16_CAPACITY as usize],
                transactions: Vec::new(),
                fail: false,
            }
        }

        fn offset(device: u8, word: u8) -> usize {
            assert_eq!(device & !0x07, BASE_ADDRESS);
            ((device & 0x07) as usize) << 8 | word as usize
        }
    }

    impl I2cBus for MockI2c {
        type Error = ();

        fn write(&mut self, address: u8, data: &[u8]) -> Result<(), ()> {
            if self.fail {
                return Err(());
            }
            let start = Self::offset(address, data[0]);
            let payload = &data[1..];
            // Word address wraps inside the segment on real parts
            assert!(start % SEGMENT_SIZE + payload.len() <= SEGMENT_SIZE);
            self.memory[start..start + payload.len()].copy_from_slice(payload);
            self.transactions.push((address, payload.len())).unwrap();
            Ok(())
        }

        fn write_read(&mut self, address: u8, write: &[u8], read: &mut [u8]) -> Result<(), ()> {
            if self.fail {
                return Err(());
            }
            let start = Self::offset(address, write[0]);
            assert!(start % SEGMENT_SIZE + read.len() <= SEGMENT_SIZE);
            read.copy_from_slice(&self.memory[start..start + read.len()]);
            self.transactions.push((address, read.len())).unwrap();
            Ok(())
        }
    }

    #[test]
    fn test_device_address_carries_segment() {
        assert_eq!(device_address(0x0000), 0x50);
        assert_eq!(device_address(0x00FF), 0x50);
        assert_eq!(device_address(0x0100), 0x51);
        assert_eq!(device_address(0x07FF), 0x57);
    }

    #[test]
    fn test_write_then_read_back() {
        let mut fram = Mb85rc::new(MockI2c::new());
        fram.write(0x0210, &[1, 2, 3, 4]).unwrap();

        let mut buf = [0u8; 4];
        fram.read(0x0210, &mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3, 4]);
        assert_eq!(fram.release().memory[0x0210..0x0214], [1, 2, 3, 4]);
    }

    #[test]
    fn test_transfers_split_at_segment_boundary() {
        let mut fram = Mb85rc::new(MockI2c::new());
        let data = [0xA5u8; 10];
        fram.write(0x01FC, &data).unwrap();

        let i2c = fram.release();
        assert_eq!(i2c.transactions[..], [(0x51, 4), (0x52, 6)]);
        assert!(i2c.memory[0x01FC..0x0206].iter().all(|&b| b == 0xA5));
    }

    #[test]
    fn test_transfers_split_into_chunks() {
        let mut fram = Mb85rc::new(MockI2c::new());
        let mut data = [0u8; 70];
        for (i, b) in data.iter_mut().enumerate() {
            *b = i as u8;
        }
        fram.write(0x0300, &data).unwrap();

        let mut buf = [0u8; 70];
        fram.read(0x0300, &mut buf).unwrap();
        assert_eq!(buf, data);

        let i2c = fram.release();
        assert_eq!(
            i2c.transactions[..],
            [(0x53, 32), (0x53, 32), (0x53, 6), (0x53, 32), (0x53, 32), (0x53, 6)]
        );
    }

    #[test]
    fn test_out_of_range_touches_nothing() {
        let mut fram = Mb85rc::new(MockI2c::new());
        assert_eq!(fram.write(0x07FF, &[0, 0]), Err(NvError::OutOfRange));

        let mut buf = [0u8; 1];
        assert_eq!(fram.read(0x0800, &mut buf), Err(NvError::OutOfRange));
        fram.read(0x07FF, &mut buf).unwrap();

        assert_eq!(fram.release().transactions[..], [(0x57, 1)]);
    }

    #[test]
    fn test_bus_failure() {
        let mut i2c = MockI2c::new();
        i2c.fail = true;
        let mut fram = Mb85rc::new(i2c);
        assert_eq!(fram.write(0, &[1]), Err(NvError::Bus));
        assert_eq!(fram.capacity(), MB85RC16_CAPACITY);
    }
}
