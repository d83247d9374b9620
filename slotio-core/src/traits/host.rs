//! Host command/event channel

use slotio_protocol::{DeviceEvent, Frame};

/// Framed link to the host computer
///
/// Framing and checksums are handled by the implementation; the control
/// loop only sees complete, opcode-tagged frames.
pub trait HostLink {
    /// Take the next complete command frame, if one has arrived
    fn recv_command(&mut self) -> Option<Frame>;

    /// Queue an event for the host
    ///
    /// Never blocks. An implementation that cannot queue the event drops it.
    fn send_event(&mut self, event: DeviceEvent);
}
