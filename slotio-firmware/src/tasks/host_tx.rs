//! Host UART transmit task

use defmt::*;
use embassy_rp::uart::BufferedUartTx;
use embedded_io_async::Write;

use slotio_protocol::MAX_FRAME_SIZE;

use crate::channels::EVENT_CHANNEL;

/// Host TX task - encodes queued events onto the wire in order
#[embassy_executor::task]
pub async fn host_tx_task(mut tx: BufferedUartTx) {
    info!("Host TX task started");

    let mut buf = [0u8; MAX_FRAME_SIZE];

    loop {
        let event = EVENT_CHANNEL.receive().await;

        let frame = match event.to_frame() {
            Ok(frame) => frame,
            Err(e) => {
                error!("Event 0x{:02x} does not fit a frame: {:?}", event.opcode(), e);
                continue;
            }
        };

        match frame.encode(&mut buf) {
            Ok(len) => {
                if let Err(e) = tx.write_all(&buf[..len]).await {
                    warn!("Failed to send event: {:?}", e);
                } else {
                    trace!("Sent event 0x{:02x}", frame.opcode);
                }
            }
            Err(e) => warn!("Frame encode error: {:?}", e),
        }
    }
}
