//! Host → card commands
//!
//! Every command is a frame whose opcode selects the command and whose
//! payload carries fixed-format arguments. Argument *values* (track
//! indices, storage ranges, ...) are validated by the card logic, not
//! here; this module only checks that the payload is long enough.

use heapless::Vec;

use crate::events::MAX_LINE_BYTES;
use crate::frame::{Frame, FrameError, MAX_PAYLOAD_SIZE};

pub const CMD_ACK: u8 = 0x00;
pub const CMD_GET_INFO: u8 = 0x01;
pub const CMD_GET_KEY_MASKS: u8 = 0x02;
pub const CMD_GET_KEYS: u8 = 0x10;
pub const CMD_SET_OUTPUT: u8 = 0x11;
pub const CMD_GET_COIN_COUNTER: u8 = 0x20;
pub const CMD_RESET_COIN_COUNTER: u8 = 0x21;
pub const CMD_TICK_AUDIT_COUNTER: u8 = 0x30;
pub const CMD_EJECT: u8 = 0x40;
pub const CMD_SET_TRACK_LEVEL: u8 = 0x41;
pub const CMD_SET_EJECT_TIMEOUT: u8 = 0x42;
pub const CMD_READ_STORAGE: u8 = 0x50;
pub const CMD_WRITE_STORAGE: u8 = 0x58;
pub const CMD_REBOOT: u8 = 0xFF;

/// Largest storage block that fits in one frame next to its address and length
pub const MAX_STORAGE_CHUNK: usize = MAX_PAYLOAD_SIZE - 3;

/// Why a frame could not be turned into a [`HostCommand`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Opcode is not part of the command table
    UnknownOpcode(u8),
    /// Opcode is known but the payload is shorter than its arguments
    Truncated(u8),
}

impl ParseError {
    /// Opcode of the offending frame
    pub fn opcode(self) -> u8 {
        match self {
            ParseError::UnknownOpcode(op) | ParseError::Truncated(op) => op,
        }
    }
}

/// Commands issued by the host
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HostCommand {
    /// Host acknowledges arrival events; disarms the supervisory timeout
    Ack,
    /// Request device identity
    GetInfo,
    /// Request the debounced-line masks
    GetKeyMasks,
    /// Request the current line snapshot
    GetKeys,
    /// Overwrite the host-owned output bits
    SetOutput { bytes: Vec<u8, MAX_LINE_BYTES> },
    /// Request a persisted coin counter
    GetCoinCounter { track: u8 },
    /// Zero a persisted coin counter
    ResetCoinCounter { track: u8 },
    /// Queue ticks on a mechanical audit counter
    TickAuditCounter { counter: u8, ticks: u32 },
    /// Start (`count > 0`) or cancel (`count == 0`) dispensing
    Eject { track: u8, count: u8 },
    /// Select which raw level counts as active for a track sensor
    SetTrackLevel { track: u8, active_high: bool },
    /// Set the per-track eject deadline in microseconds
    SetEjectTimeout { track: u8, timeout_us: u32 },
    /// Read from the user storage region
    ReadStorage { address: u16, length: u8 },
    /// Write to the user storage region
    WriteStorage {
        address: u16,
        data: Vec<u8, MAX_STORAGE_CHUNK>,
    },
    /// Stop feeding the watchdog so the card resets
    Reboot,
}

/// Cursor over a command payload
struct Args<'a> {
    opcode: u8,
    bytes: &'a [u8],
}

impl<'a> Args<'a> {
    fn new(frame: &'a Frame) -> Self {
        Self {
            opcode: frame.opcode,
            bytes: &frame.payload,
        }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ParseError> {
        if self.bytes.len() < n {
            return Err(ParseError::Truncated(self.opcode));
        }
        let (head, tail) = self.bytes.split_at(n);
        self.bytes = tail;
        Ok(head)
    }

    fn u8(&mut self) -> Result<u8, ParseError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, ParseError> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32, ParseError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }
}

impl HostCommand {
    /// Decode a command from a received frame
    pub fn from_frame(frame: &Frame) -> Result<Self, ParseError> {
        let mut args = Args::new(frame);

        let cmd = match frame.opcode {
            CMD_ACK => HostCommand::Ack,
            CMD_GET_INFO => HostCommand::GetInfo,
            CMD_GET_KEY_MASKS => HostCommand::GetKeyMasks,
            CMD_GET_KEYS => HostCommand::GetKeys,
            CMD_SET_OUTPUT => {
                let len = args.u8()? as usize;
                let bytes = args.take(len)?;
                // The card only owns a few output bytes; anything past them is ignored
                let keep = len.min(MAX_LINE_BYTES);
                HostCommand::SetOutput {
                    bytes: Vec::from_slice(&bytes[..keep])
                        .map_err(|_| ParseError::Truncated(frame.opcode))?,
                }
            }
            CMD_GET_COIN_COUNTER => HostCommand::GetCoinCounter { track: args.u8()? },
            CMD_RESET_COIN_COUNTER => HostCommand::ResetCoinCounter { track: args.u8()? },
            CMD_TICK_AUDIT_COUNTER => HostCommand::TickAuditCounter {
                counter: args.u8()?,
                ticks: args.u32()?,
            },
            CMD_EJECT => HostCommand::Eject {
                track: args.u8()?,
                count: args.u8()?,
            },
            CMD_SET_TRACK_LEVEL => HostCommand::SetTrackLevel {
                track: args.u8()?,
                active_high: args.u8()? != 0,
            },
            CMD_SET_EJECT_TIMEOUT => HostCommand::SetEjectTimeout {
                track: args.u8()?,
                timeout_us: args.u32()?,
            },
            CMD_READ_STORAGE => HostCommand::ReadStorage {
                address: args.u16()?,
                length: args.u8()?,
            },
            CMD_WRITE_STORAGE => {
                let address = args.u16()?;
                let len = args.u8()? as usize;
                let data = args.take(len)?;
                HostCommand::WriteStorage {
                    address,
                    data: Vec::from_slice(data).map_err(|_| ParseError::Truncated(frame.opcode))?,
                }
            }
            CMD_REBOOT => HostCommand::Reboot,
            other => return Err(ParseError::UnknownOpcode(other)),
        };

        Ok(cmd)
    }

    /// Opcode this command is sent with
    pub fn opcode(&self) -> u8 {
        match self {
            HostCommand::Ack => CMD_ACK,
            HostCommand::GetInfo => CMD_GET_INFO,
            HostCommand::GetKeyMasks => CMD_GET_KEY_MASKS,
            HostCommand::GetKeys => CMD_GET_KEYS,
            HostCommand::SetOutput { .. } => CMD_SET_OUTPUT,
            HostCommand::GetCoinCounter { .. } => CMD_GET_COIN_COUNTER,
            HostCommand::ResetCoinCounter { .. } => CMD_RESET_COIN_COUNTER,
            HostCommand::TickAuditCounter { .. } => CMD_TICK_AUDIT_COUNTER,
            HostCommand::Eject { .. } => CMD_EJECT,
            HostCommand::SetTrackLevel { .. } => CMD_SET_TRACK_LEVEL,
            HostCommand::SetEjectTimeout { .. } => CMD_SET_EJECT_TIMEOUT,
            HostCommand::ReadStorage { .. } => CMD_READ_STORAGE,
            HostCommand::WriteStorage { .. } => CMD_WRITE_STORAGE,
            HostCommand::Reboot => CMD_REBOOT,
        }
    }

    /// Encode this command into a frame (host side, tests and bench tools)
    pub fn to_frame(&self) -> Result<Frame, FrameError> {
        let mut payload = Vec::<u8, MAX_PAYLOAD_SIZE>::new();
        let mut put = |bytes: &[u8]| {
            payload
                .extend_from_slice(bytes)
                .map_err(|_| FrameError::PayloadTooLarge)
        };

        match self {
            HostCommand::Ack
            | HostCommand::GetInfo
            | HostCommand::GetKeyMasks
            | HostCommand::GetKeys
            | HostCommand::Reboot => {}
            HostCommand::SetOutput { bytes } => {
                put(&[bytes.len() as u8])?;
                put(bytes)?;
            }
            HostCommand::GetCoinCounter { track } | HostCommand::ResetCoinCounter { track } => {
                put(&[*track])?;
            }
            HostCommand::TickAuditCounter { counter, ticks } => {
                put(&[*counter])?;
                put(&ticks.to_le_bytes())?;
            }
            HostCommand::Eject { track, count } => put(&[*track, *count])?,
            HostCommand::SetTrackLevel { track, active_high } => {
                put(&[*track, *active_high as u8])?;
            }
            HostCommand::SetEjectTimeout { track, timeout_us } => {
                put(&[*track])?;
                put(&timeout_us.to_le_bytes())?;
            }
            HostCommand::ReadStorage { address, length } => {
                put(&address.to_le_bytes())?;
                put(&[*length])?;
            }
            HostCommand::WriteStorage { address, data } => {
                put(&address.to_le_bytes())?;
                put(&[data.len() as u8])?;
                put(data)?;
            }
        }

        Frame::new(self.opcode(), &payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_eject() {
        let frame = Frame::new(CMD_EJECT, &[0x01, 0x05]).unwrap();
        assert_eq!(
            HostCommand::from_frame(&frame),
            Ok(HostCommand::Eject { track: 1, count: 5 })
        );
    }

    #[test]
    fn test_parse_little_endian_arguments() {
        let frame = Frame::new(CMD_SET_EJECT_TIMEOUT, &[0x00, 0x40, 0x42, 0x0F, 0x00]).unwrap();
        assert_eq!(
            HostCommand::from_frame(&frame),
            Ok(HostCommand::SetEjectTimeout {
                track: 0,
                timeout_us: 1_000_000
            })
        );

        let frame = Frame::new(CMD_READ_STORAGE, &[0x00, 0x02, 16]).unwrap();
        assert_eq!(
            HostCommand::from_frame(&frame),
            Ok(HostCommand::ReadStorage {
                address: 0x0200,
                length: 16
            })
        );
    }

    #[test]
    fn test_parse_write_storage_uses_declared_length() {
        let frame = Frame::new(CMD_WRITE_STORAGE, &[0x10, 0x02, 2, 0xAB, 0xCD]).unwrap();
        match HostCommand::from_frame(&frame).unwrap() {
            HostCommand::WriteStorage { address, data } => {
                assert_eq!(address, 0x0210);
                assert_eq!(&data[..], &[0xAB, 0xCD]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_truncated_payload() {
        let frame = Frame::new(CMD_EJECT, &[0x00]).unwrap();
        assert_eq!(
            HostCommand::from_frame(&frame),
            Err(ParseError::Truncated(CMD_EJECT))
        );

        // Declared length longer than what follows
        let frame = Frame::new(CMD_WRITE_STORAGE, &[0x00, 0x02, 4, 0xAA]).unwrap();
        assert_eq!(
            HostCommand::from_frame(&frame),
            Err(ParseError::Truncated(CMD_WRITE_STORAGE))
        );
    }

    #[test]
    fn test_unknown_opcode() {
        let err = HostCommand::from_frame(&Frame::empty(0x77)).unwrap_err();
        assert_eq!(err, ParseError::UnknownOpcode(0x77));
        assert_eq!(err.opcode(), 0x77);
    }

    #[test]
    fn test_set_output_ignores_extra_bytes() {
        let frame = Frame::new(CMD_SET_OUTPUT, &[10, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10]).unwrap();
        match HostCommand::from_frame(&frame).unwrap() {
            HostCommand::SetOutput { bytes } => assert_eq!(bytes.len(), MAX_LINE_BYTES),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_encoded_command_parses_back() {
        let cmd = HostCommand::TickAuditCounter {
            counter: 3,
            ticks: 70_000,
        };
        let frame = cmd.to_frame().unwrap();
        assert_eq!(frame.opcode, CMD_TICK_AUDIT_COUNTER);
        assert_eq!(HostCommand::from_frame(&frame), Ok(cmd));
    }
}
