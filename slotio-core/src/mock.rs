//! In-memory collaborators for host tests

use heapless::{Deque, Vec};
use slotio_protocol::{DeviceEvent, Frame, HostCommand};

use crate::topology::{INPUT_BYTES, OUTPUT_BYTES};
use crate::traits::{HostLink, IoBoard, IoError, NvError, NvStorage, Watchdog};

pub const MEM_CAPACITY: usize = 2048;

/// FRAM stand-in that counts write traffic
#[derive(Clone)]
pub struct MemStorage {
    pub bytes: [u8; MEM_CAPACITY],
    pub writes: usize,
    pub bytes_written: usize,
    pub fail_writes: bool,
    pub fail_reads: bool,
}

impl MemStorage {
    pub fn new() -> Self {
        Self {
            bytes: [0xFF; MEM_CAPACITY],
            writes: 0,
            bytes_written: 0,
            fail_writes: false,
            fail_reads: false,
        }
    }

    fn range(&self, address: u16, len: usize) -> Result<core::ops::Range<usize>, NvError> {
        let start = address as usize;
        let end = start + len;
        if end > MEM_CAPACITY {
            return Err(NvError::OutOfRange);
        }
        Ok(start..end)
    }
}

impl NvStorage for MemStorage {
    fn capacity(&self) -> u32 {
        MEM_CAPACITY as u32
    }

    fn read(&mut self, address: u16, buf: &mut [u8]) -> Result<(), NvError> {
        if self.fail_reads {
            return Err(NvError::Bus);
        }
        let range = self.range(address, buf.len())?;
        buf.copy_from_slice(&self.bytes[range]);
        Ok(())
    }

    fn write(&mut self, address: u16, data: &[u8]) -> Result<(), NvError> {
        if self.fail_writes {
            return Err(NvError::Bus);
        }
        let range = self.range(address, data.len())?;
        self.bytes[range].copy_from_slice(data);
        self.writes += 1;
        self.bytes_written += data.len();
        Ok(())
    }
}

/// Shift-register board whose inputs are set by the test
pub struct ScriptedBoard {
    pub inputs: [u8; INPUT_BYTES],
    pub outputs: [u8; OUTPUT_BYTES],
    pub flushes: usize,
    pub fail_sample: bool,
}

impl ScriptedBoard {
    pub fn new(inputs: [u8; INPUT_BYTES]) -> Self {
        Self {
            inputs,
            outputs: [0; OUTPUT_BYTES],
            flushes: 0,
            fail_sample: false,
        }
    }
}

impl IoBoard for ScriptedBoard {
    fn sample_inputs(&mut self, inputs: &mut [u8; INPUT_BYTES]) -> Result<(), IoError> {
        if self.fail_sample {
            return Err(IoError::Bus);
        }
        *inputs = self.inputs;
        Ok(())
    }

    fn assert_outputs(&mut self, outputs: &[u8; OUTPUT_BYTES]) -> Result<(), IoError> {
        self.outputs = *outputs;
        self.flushes += 1;
        Ok(())
    }
}

/// Host link fed with commands and recording every event
pub struct RecordingHost {
    pub inbox: Deque<Frame, 8>,
    pub sent: Vec<DeviceEvent, 32>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self {
            inbox: Deque::new(),
            sent: Vec::new(),
        }
    }

    pub fn push(&mut self, command: HostCommand) {
        self.push_frame(command.to_frame().unwrap());
    }

    pub fn push_frame(&mut self, frame: Frame) {
        self.inbox.push_back(frame).unwrap();
    }

    /// Drain everything sent so far
    pub fn take_sent(&mut self) -> Vec<DeviceEvent, 32> {
        core::mem::take(&mut self.sent)
    }
}

impl HostLink for RecordingHost {
    fn recv_command(&mut self) -> Option<Frame> {
        self.inbox.pop_front()
    }

    fn send_event(&mut self, event: DeviceEvent) {
        self.sent.push(event).unwrap();
    }
}

#[derive(Default)]
pub struct CountingWatchdog {
    pub period_us: Option<u32>,
    pub feeds: u32,
}

impl Watchdog for CountingWatchdog {
    fn arm(&mut self, period_us: u32) {
        self.period_us = Some(period_us);
    }

    fn feed(&mut self) {
        self.feeds += 1;
    }
}
