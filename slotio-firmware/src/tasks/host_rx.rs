//! Host UART receive task
//!
//! Reassembles command frames and queues them for the control loop.
//! Frames are not decoded here; the control loop owns the reply to a
//! malformed command.

use defmt::*;
use embassy_rp::uart::BufferedUartRx;
use embedded_io_async::Read;

use slotio_protocol::{FrameError, FrameReader};

use crate::channels::COMMAND_CHANNEL;

/// Buffer size for UART receive
const RX_BUF_SIZE: usize = 64;

#[embassy_executor::task]
pub async fn host_rx_task(mut rx: BufferedUartRx) {
    info!("Host RX task started");

    let mut reader = FrameReader::new();
    let mut buf = [0u8; RX_BUF_SIZE];

    loop {
        match rx.read(&mut buf).await {
            Ok(n) if n > 0 => {
                trace!("RX: {} bytes", n);

                for result in reader.frames(&buf[..n]) {
                    match result {
                        Ok(frame) => {
                            debug!("Command 0x{:02x}", frame.opcode);
                            if COMMAND_CHANNEL.try_send(frame).is_err() {
                                warn!("Command channel full, dropping frame");
                            }
                        }
                        Err(FrameError::Checksum { opcode }) => {
                            warn!("Corrupt frame for command 0x{:02x}", opcode);
                        }
                        Err(e) => {
                            warn!("Frame parse error: {:?}", e);
                        }
                    }
                }
            }
            Ok(_) => {}
            Err(e) => {
                warn!("UART read error: {:?}", e);
                reader.clear();
            }
        }
    }
}
