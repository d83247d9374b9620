//! Host link over the static channels

use defmt::*;
use slotio_core::traits::HostLink;
use slotio_protocol::{DeviceEvent, Frame};

use crate::channels::{COMMAND_CHANNEL, EVENT_CHANNEL};

/// Control-loop side of the UART tasks
pub struct ChannelHostLink;

impl HostLink for ChannelHostLink {
    fn recv_command(&mut self) -> Option<Frame> {
        COMMAND_CHANNEL.try_receive().ok()
    }

    fn send_event(&mut self, event: DeviceEvent) {
        if EVENT_CHANNEL.try_send(event).is_err() {
            warn!("Event channel full, dropping event");
        }
    }
}
