//! Frame encoding and decoding for the host link.
//!
//! Frame format:
//! - START (1 byte): 0xAA synchronization byte
//! - LENGTH (1 byte): payload length (0-64)
//! - OPCODE (1 byte): command or event opcode
//! - PAYLOAD (0-64 bytes): opcode-specific data
//! - CHECKSUM (1 byte): XOR of LENGTH, OPCODE, and all PAYLOAD bytes
//!
//! The cabinet line is shared with coin mech noise, so a START byte does
//! not reliably open a frame. [`FrameReader`] keeps the raw bytes of the
//! candidate frame and, when it turns out corrupt, rescans them for the
//! next START instead of throwing them away.

use heapless::{Deque, Vec};

/// Frame synchronization byte
pub const FRAME_START: u8 = 0xAA;

/// Maximum payload size in bytes
pub const MAX_PAYLOAD_SIZE: usize = 64;

/// Maximum complete frame size (START + LENGTH + OPCODE + MAX_PAYLOAD + CHECKSUM)
pub const MAX_FRAME_SIZE: usize = 1 + 1 + 1 + MAX_PAYLOAD_SIZE + 1;

/// Bytes a frame carries besides its payload
const OVERHEAD: usize = 4;

/// Errors that can occur during frame parsing or encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Payload exceeds maximum allowed size
    PayloadTooLarge,
    /// Checksum mismatch on a frame carrying `opcode`
    Checksum { opcode: u8 },
    /// Declared payload length is larger than any frame may carry
    InvalidLength(u8),
    /// Bytes do not start with START or end before the declared length
    Incomplete,
    /// Buffer too small for encoding
    BufferTooSmall,
}

/// A complete, opcode-tagged message
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Frame {
    /// Command or event opcode
    pub opcode: u8,
    /// Payload data
    pub payload: Vec<u8, MAX_PAYLOAD_SIZE>,
}

impl Frame {
    /// Create a new frame with the given opcode and payload
    pub fn new(opcode: u8, payload: &[u8]) -> Result<Self, FrameError> {
        let payload = Vec::from_slice(payload).map_err(|_| FrameError::PayloadTooLarge)?;
        Ok(Self { opcode, payload })
    }

    /// Create a frame with no payload
    pub fn empty(opcode: u8) -> Self {
        Self {
            opcode,
            payload: Vec::new(),
        }
    }

    fn checksum(length: u8, opcode: u8, payload: &[u8]) -> u8 {
        payload.iter().fold(length ^ opcode, |acc, &b| acc ^ b)
    }

    /// Encoded size of this frame in bytes
    pub fn encoded_len(&self) -> usize {
        4 + self.payload.len()
    }

    /// Encode this frame into a byte buffer
    ///
    /// Returns the number of bytes written
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, FrameError> {
        let frame_len = self.encoded_len();
        if buffer.len() < frame_len {
            return Err(FrameError::BufferTooSmall);
        }

        let length = self.payload.len() as u8;
        let end = 3 + self.payload.len();

        buffer[0] = FRAME_START;
        buffer[1] = length;
        buffer[2] = self.opcode;
        buffer[3..end].copy_from_slice(&self.payload);
        buffer[end] = Self::checksum(length, self.opcode, &self.payload);

        Ok(frame_len)
    }

    /// Encode this frame into a heapless Vec
    pub fn encode_to_vec(&self) -> Result<Vec<u8, MAX_FRAME_SIZE>, FrameError> {
        let mut buffer = [0u8; MAX_FRAME_SIZE];
        let len = self.encode(&mut buffer)?;
        Vec::from_slice(&buffer[..len]).map_err(|_| FrameError::BufferTooSmall)
    }

    /// Decode one complete frame from `bytes`
    ///
    /// `bytes` must begin with START; anything after the checksum is ignored.
    pub fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        let (&start, rest) = bytes.split_first().ok_or(FrameError::Incomplete)?;
        if start != FRAME_START {
            return Err(FrameError::Incomplete);
        }
        let &length = rest.first().ok_or(FrameError::Incomplete)?;
        if usize::from(length) > MAX_PAYLOAD_SIZE {
            return Err(FrameError::InvalidLength(length));
        }

        let end = usize::from(length) + 3;
        if bytes.len() <= end {
            return Err(FrameError::Incomplete);
        }
        let opcode = bytes[2];
        let payload = &bytes[3..end];
        if bytes[end] != Self::checksum(length, opcode, payload) {
            return Err(FrameError::Checksum { opcode });
        }

        Self::new(opcode, payload)
    }
}

/// Reassembles frames from a noisy byte stream
///
/// Bytes of a rejected frame after its START are scanned again, so a
/// real frame hiding behind a stray START is still delivered.
#[derive(Debug, Clone)]
pub struct FrameReader {
    /// Candidate frame; empty or starting with START
    pending: Vec<u8, MAX_FRAME_SIZE>,
    /// Bytes of a rejected candidate still to be scanned
    rescan: Deque<u8, MAX_FRAME_SIZE>,
}

impl Default for FrameReader {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameReader {
    pub const fn new() -> Self {
        Self {
            pending: Vec::new(),
            rescan: Deque::new(),
        }
    }

    /// Drop the candidate frame and anything waiting to be rescanned
    pub fn clear(&mut self) {
        self.pending.clear();
        self.rescan.clear();
    }

    /// Frames and errors found in `bytes`, in line order
    ///
    /// Bytes the returned iterator has not reached when it is dropped are
    /// lost; drain it to the end.
    pub fn frames<'a>(&'a mut self, bytes: &'a [u8]) -> Frames<'a> {
        Frames {
            reader: self,
            input: bytes,
        }
    }

    fn step(&mut self, byte: u8) -> Option<Result<Frame, FrameError>> {
        if self.pending.is_empty() && byte != FRAME_START {
            return None;
        }
        // Cannot overflow: the length check caps the candidate at MAX_FRAME_SIZE
        let _ = self.pending.push(byte);

        if self.pending.len() == 2 && usize::from(byte) > MAX_PAYLOAD_SIZE {
            self.reject();
            return Some(Err(FrameError::InvalidLength(byte)));
        }
        if self.pending.len() < 2 || self.pending.len() < usize::from(self.pending[1]) + OVERHEAD {
            return None;
        }

        let result = Frame::decode(&self.pending);
        match result {
            Ok(_) => self.pending.clear(),
            Err(_) => self.reject(),
        }
        Some(result)
    }

    /// Give up on the candidate's START and queue the rest for rescanning
    fn reject(&mut self) {
        // pending and rescan together never exceed one frame, minus the START dropped here
        for &byte in self.pending[1..].iter().rev() {
            let _ = self.rescan.push_front(byte);
        }
        self.pending.clear();
    }
}

/// Iterator returned by [`FrameReader::frames`]
pub struct Frames<'a> {
    reader: &'a mut FrameReader,
    input: &'a [u8],
}

impl Iterator for Frames<'_> {
    type Item = Result<Frame, FrameError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let byte = match self.reader.rescan.pop_front() {
                Some(byte) => byte,
                None => {
                    let (&byte, rest) = self.input.split_first()?;
                    self.input = rest;
                    byte
                }
            };
            if let Some(result) = self.reader.step(byte) {
                return Some(result);
            }
        }
    }
}
