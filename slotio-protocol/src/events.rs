//! Card → host events
//!
//! Replies to host commands and unsolicited notifications (arrivals,
//! line changes, boot, errors) share one opcode space.

use heapless::Vec;

use crate::commands::MAX_STORAGE_CHUNK;
use crate::frame::{Frame, FrameError, MAX_PAYLOAD_SIZE};

pub const EVT_INFO: u8 = 0x01;
pub const EVT_KEY_MASKS: u8 = 0x02;
pub const EVT_KEYS: u8 = 0x10;
pub const EVT_COIN_COUNTER: u8 = 0x20;
pub const EVT_READ_STORAGE: u8 = 0x50;
pub const EVT_WRITE_STORAGE: u8 = 0x58;
pub const EVT_BOOT: u8 = 0x80;
pub const EVT_ERROR: u8 = 0xFF;

/// Upper bound on input or output line bytes carried in one event
pub const MAX_LINE_BYTES: usize = 8;

/// Device identity reported by `GET_INFO`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceInfo {
    pub vendor: &'static str,
    pub product: &'static str,
    pub version: &'static str,
    /// Build date as a decimal `YYYYMMDD`
    pub build: u32,
}

impl DeviceInfo {
    /// Payload bytes needed to carry this identity
    pub fn encoded_len(&self) -> usize {
        3 + self.vendor.len() + self.product.len() + self.version.len() + 4
    }
}

/// Error kinds reported to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ErrorEvent {
    /// Eject requested while the track is still dispensing
    EjectInterrupted { track: u8, remaining: u8 },
    /// Dispensing did not complete before the deadline
    EjectTimeout { track: u8, remaining: u8 },
    NotATrack { track: u8 },
    /// Storage access below the user region
    ProtectedStorage { address: u16 },
    /// Transfer longer than the card accepts in one request
    TooLong { max: u8, requested: u8 },
    NotACounter { counter: u8 },
    /// Storage access past the end of the device
    OutOfRange { address: u16, length: u8 },
    UnknownCommand { opcode: u8 },
}

impl ErrorEvent {
    /// Error kind byte
    pub fn kind(&self) -> u8 {
        match self {
            ErrorEvent::EjectInterrupted { .. } => 0x01,
            ErrorEvent::EjectTimeout { .. } => 0x02,
            ErrorEvent::NotATrack { .. } => 0x03,
            ErrorEvent::ProtectedStorage { .. } => 0x04,
            ErrorEvent::TooLong { .. } => 0x05,
            ErrorEvent::NotACounter { .. } => 0x06,
            ErrorEvent::OutOfRange { .. } => 0x07,
            ErrorEvent::UnknownCommand { .. } => 0xFF,
        }
    }
}

/// Events sent from the card to the host
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceEvent {
    Info(DeviceInfo),
    /// Per-byte mask of debounced input lines
    KeyMasks(Vec<u8, MAX_LINE_BYTES>),
    /// Input line snapshot
    Keys(Vec<u8, MAX_LINE_BYTES>),
    /// Persisted coin counter of a track
    CoinCounter { track: u8, count: u32 },
    StorageRead {
        address: u16,
        data: Vec<u8, MAX_STORAGE_CHUNK>,
    },
    StorageWritten { address: u16, length: u8 },
    /// Sent once after boot with the storage open outcome
    Boot { storage: u8 },
    Error(ErrorEvent),
}

impl DeviceEvent {
    /// Opcode this event is sent with
    pub fn opcode(&self) -> u8 {
        match self {
            DeviceEvent::Info(_) => EVT_INFO,
            DeviceEvent::KeyMasks(_) => EVT_KEY_MASKS,
            DeviceEvent::Keys(_) => EVT_KEYS,
            DeviceEvent::CoinCounter { .. } => EVT_COIN_COUNTER,
            DeviceEvent::StorageRead { .. } => EVT_READ_STORAGE,
            DeviceEvent::StorageWritten { .. } => EVT_WRITE_STORAGE,
            DeviceEvent::Boot { .. } => EVT_BOOT,
            DeviceEvent::Error(_) => EVT_ERROR,
        }
    }

    /// Encode this event into a frame
    pub fn to_frame(&self) -> Result<Frame, FrameError> {
        let mut payload = Vec::<u8, MAX_PAYLOAD_SIZE>::new();
        let mut put = |bytes: &[u8]| {
            payload
                .extend_from_slice(bytes)
                .map_err(|_| FrameError::PayloadTooLarge)
        };

        match self {
            DeviceEvent::Info(info) => {
                for s in [info.vendor, info.product, info.version] {
                    let len = u8::try_from(s.len()).map_err(|_| FrameError::PayloadTooLarge)?;
                    put(&[len])?;
                    put(s.as_bytes())?;
                }
                put(&info.build.to_le_bytes())?;
            }
            DeviceEvent::KeyMasks(bytes) | DeviceEvent::Keys(bytes) => {
                put(&[bytes.len() as u8])?;
                put(bytes)?;
            }
            DeviceEvent::CoinCounter { track, count } => {
                put(&[*track])?;
                put(&count.to_le_bytes())?;
            }
            DeviceEvent::StorageRead { address, data } => {
                put(&address.to_le_bytes())?;
                put(&[data.len() as u8])?;
                put(data)?;
            }
            DeviceEvent::StorageWritten { address, length } => {
                put(&address.to_le_bytes())?;
                put(&[*length])?;
            }
            DeviceEvent::Boot { storage } => put(&[*storage])?,
            DeviceEvent::Error(err) => {
                put(&[err.kind()])?;
                match *err {
                    ErrorEvent::EjectInterrupted { track, remaining }
                    | ErrorEvent::EjectTimeout { track, remaining } => put(&[track, remaining])?,
                    ErrorEvent::NotATrack { track } => put(&[track])?,
                    ErrorEvent::ProtectedStorage { address } => put(&address.to_le_bytes())?,
                    ErrorEvent::TooLong { max, requested } => put(&[max, requested])?,
                    ErrorEvent::NotACounter { counter } => put(&[counter])?,
                    ErrorEvent::OutOfRange { address, length } => {
                        put(&address.to_le_bytes())?;
                        put(&[length])?;
                    }
                    ErrorEvent::UnknownCommand { opcode } => put(&[opcode])?,
                }
            }
        }

        Frame::new(self.opcode(), &payload)
    }
}

impl From<ErrorEvent> for DeviceEvent {
    fn from(err: ErrorEvent) -> Self {
        DeviceEvent::Error(err)
    }
}
