//! Persistent audit and configuration store
//!
//! One fixed-layout record is kept twice, in two banks of a
//! byte-addressable nonvolatile device. Each copy carries a sequence
//! number and a CRC32 seeded with the layout version, so a torn write
//! or a layout change is detected when the store is opened.

pub mod crc;
pub mod record;
pub mod store;

pub use crc::integrity_code;
pub use record::{ConfigRecord, LAYOUT_VERSION, RECORD_LEN};
pub use store::{Bank, OpenOutcome, PersistentStore};
