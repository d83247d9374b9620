//! Inter-task communication channels
//!
//! The UART tasks and the control task only meet here. Both queues are
//! drained without blocking by the control loop's side.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

use slotio_protocol::{DeviceEvent, Frame};

/// Complete command frames waiting for the control loop
///
/// The loop executes one per iteration; a short queue is enough.
const COMMAND_CHANNEL_SIZE: usize = 4;

/// Events waiting for the UART
const EVENT_CHANNEL_SIZE: usize = 16;

/// Command frames from the host RX task
pub static COMMAND_CHANNEL: Channel<CriticalSectionRawMutex, Frame, COMMAND_CHANNEL_SIZE> =
    Channel::new();

/// Events for the host TX task
pub static EVENT_CHANNEL: Channel<CriticalSectionRawMutex, DeviceEvent, EVENT_CHANNEL_SIZE> =
    Channel::new();
