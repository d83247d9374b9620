//! Control task
//!
//! Owns the card: boots the control loop on the real peripherals and
//! steps it for as long as the firmware runs.

use defmt::*;
use embassy_futures::yield_now;
use embassy_rp::gpio::Output;
use embassy_rp::i2c::{Blocking as I2cBlocking, I2c};
use embassy_rp::peripherals::{I2C0, SPI0};
use embassy_rp::spi::{Blocking as SpiBlocking, Spi};
use embassy_time::Instant;

use slotio_core::control::{ControlLoop, Flow};
use slotio_core::storage::OpenOutcome;
use slotio_drivers::{Mb85rc, ShiftRegisterChain};
use slotio_hal_rp2040::{EhI2c, EhOutput, EhSpi, RpWatchdog};

use crate::config::BOARD;
use crate::host_link::ChannelHostLink;

/// Shift-register chains on SPI0
pub type CardBoard =
    ShiftRegisterChain<EhSpi<Spi<'static, SPI0, SpiBlocking>>, EhOutput<Output<'static>>>;

/// Audit FRAM on I2C0
pub type CardFram = Mb85rc<EhI2c<I2c<'static, I2C0, I2cBlocking>>>;

/// Microsecond clock, wrapping every ~71 minutes
fn now_us() -> u32 {
    Instant::now().as_micros() as u32
}

#[embassy_executor::task]
pub async fn control_task(
    io: CardBoard,
    nv: CardFram,
    watchdog: RpWatchdog,
    // '595 nG, active low
    mut output_enable: Output<'static>,
) {
    info!("Control task started");

    let (mut card, outcome) = match ControlLoop::boot(
        io,
        nv,
        ChannelHostLink,
        watchdog,
        BOARD,
        now_us(),
    ) {
        Ok(booted) => booted,
        Err(e) => {
            // The armed watchdog is no longer fed and resets the card
            error!("Boot failed: {:?}", e);
            core::future::pending::<()>().await;
            return;
        }
    };

    // Boot latched an all-off image
    output_enable.set_low();

    match outcome {
        OpenOutcome::BothValid { adopted } => info!("Storage: both banks valid, {:?} adopted", adopted),
        OpenOutcome::Recovered { from } => warn!("Storage: recovered from {:?}", from),
        OpenOutcome::Initialized => warn!("Storage: no valid bank, defaults written"),
    }

    loop {
        match card.step(now_us()) {
            Ok(Flow::Continue) => {}
            Ok(Flow::Halted) => break,
            Err(e) => warn!("Control loop error: {:?}", e),
        }
        yield_now().await;
    }

    info!("Reboot requested, waiting for watchdog reset");
    output_enable.set_high();
    core::future::pending::<()>().await;
}
