//! Collaborator traits
//!
//! These traits define the interface between the control loop and the
//! hardware, storage and transport implementations it drives.

pub mod host;
pub mod io;
pub mod storage;
pub mod watchdog;

pub use host::HostLink;
pub use io::{IoBoard, IoError};
pub use storage::{NvError, NvStorage};
pub use watchdog::Watchdog;
