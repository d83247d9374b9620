//! Slotio Host Protocol
//!
//! This crate defines the serial protocol between the I/O card and the
//! host computer driving the cabinet. The host issues opcode-tagged
//! commands; the card answers with result events, unsolicited arrival
//! events and error events.
//!
//! # Protocol Overview
//!
//! All messages use a simple binary frame format:
//! ```text
//! ┌───────┬────────┬──────┬─────────────┬──────────┐
//! │ START │ LENGTH │ TYPE │ PAYLOAD     │ CHECKSUM │
//! │ 1B    │ 1B     │ 1B   │ 0–64B       │ 1B       │
//! └───────┴────────┴──────┴─────────────┴──────────┘
//! ```
//!
//! `TYPE` is the command opcode (host → card) or the event opcode
//! (card → host). The two opcode spaces are independent. Multi-byte
//! integers in payloads are little-endian.

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![deny(unsafe_code)]

pub mod commands;
pub mod events;
pub mod frame;

pub use commands::{HostCommand, ParseError, MAX_STORAGE_CHUNK};
pub use events::{DeviceEvent, DeviceInfo, ErrorEvent, MAX_LINE_BYTES};
pub use frame::{Frame, FrameError, FrameReader, Frames, FRAME_START, MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE};
