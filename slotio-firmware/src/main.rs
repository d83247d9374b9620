//! Slotio - Coin/Ticket I/O Card Firmware
//!
//! Main firmware binary for the RP2040-based coin I/O card. Sits between
//! a cabinet's coin mechanisms and the host computer: track sensors and
//! audit counters on a shift-register chain, a redundant FRAM audit store
//! and a framed UART link to the host.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Level, Output};
use embassy_rp::i2c::{Config as I2cBusConfig, I2c};
use embassy_rp::peripherals::UART0;
use embassy_rp::spi::{Config as SpiConfig, Spi};
use embassy_rp::uart::{BufferedInterruptHandler, Config as UartConfig, Uart};
use embassy_rp::watchdog::Watchdog;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use slotio_core::topology::OUTPUT_BYTES;
use slotio_core::traits::IoBoard;
use slotio_drivers::{Mb85rc, ShiftRegisterChain};
use slotio_hal_rp2040::{EhI2c, EhOutput, EhSpi, RpWatchdog};

mod channels;
mod config;
mod host_link;
mod tasks;

bind_interrupts!(struct Irqs {
    UART0_IRQ => BufferedInterruptHandler<UART0>;
});

/// Shift-register clock; the '165/'595 pair is good for far more
const SPI_FREQUENCY: u32 = 1_000_000;

/// MB85RC FRAM runs fine in fast mode
const FRAM_I2C_FREQUENCY: u32 = 400_000;

// Static cells for UART buffers (must live forever)
static TX_BUF: StaticCell<[u8; 256]> = StaticCell::new();
static RX_BUF: StaticCell<[u8; 64]> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Slotio firmware starting...");

    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    let board = &config::BOARD;
    info!(
        "{} {} {} ({})",
        board.identity.vendor, board.identity.product, board.identity.version, board.identity.build
    );

    // Output chain stays disabled until it holds a known image
    let output_enable = Output::new(p.PIN_17, Level::High);
    let mut output_clear = Output::new(p.PIN_22, Level::Low);
    output_clear.set_high();

    // Shift-register chains: SCK=GPIO18, MOSI=GPIO19, MISO=GPIO16,
    // '165 SH/nLD=GPIO20, '595 RCLK=GPIO21
    let mut spi_config = SpiConfig::default();
    spi_config.frequency = SPI_FREQUENCY;
    let spi = Spi::new_blocking(p.SPI0, p.PIN_18, p.PIN_19, p.PIN_16, spi_config);
    let mut io = ShiftRegisterChain::new(
        EhSpi(spi),
        EhOutput::new(Output::new(p.PIN_20, Level::High), true),
        EhOutput::new(Output::new(p.PIN_21, Level::High), true),
    );
    if let Err(e) = io.assert_outputs(&[0; OUTPUT_BYTES]) {
        warn!("Failed to clear outputs: {:?}", e);
    }
    info!("Shift-register chain initialized");

    // FRAM: SCL=GPIO5, SDA=GPIO4, WP=GPIO6 (held low: writable)
    let mut i2c_config = I2cBusConfig::default();
    i2c_config.frequency = FRAM_I2C_FREQUENCY;
    let i2c = I2c::new_blocking(p.I2C0, p.PIN_5, p.PIN_4, i2c_config);
    let nv = Mb85rc::new(EhI2c(i2c));
    let write_protect = Output::new(p.PIN_6, Level::Low);
    info!("FRAM initialized");

    // Host link: UART0 TX=GPIO0, RX=GPIO1
    let uart_config = UartConfig::default(); // 115200 baud default

    let tx_buf = TX_BUF.init([0u8; 256]);
    let rx_buf = RX_BUF.init([0u8; 64]);

    let uart = Uart::new_blocking(p.UART0, p.PIN_0, p.PIN_1, uart_config);
    let uart = uart.into_buffered(Irqs, tx_buf, rx_buf);
    let (tx, rx) = uart.split();
    info!("UART initialized for host communication");

    let watchdog = RpWatchdog::new(Watchdog::new(p.WATCHDOG));

    // Both lines hold their level for the lifetime of the firmware
    core::mem::forget(output_clear);
    core::mem::forget(write_protect);

    // Spawn tasks
    spawner.spawn(tasks::host_rx_task(rx)).unwrap();
    spawner.spawn(tasks::host_tx_task(tx)).unwrap();
    spawner
        .spawn(tasks::control_task(io, nv, watchdog, output_enable))
        .unwrap();

    info!("All tasks spawned, firmware running");

    loop {
        embassy_time::Timer::after_secs(60).await;
        trace!("Main loop heartbeat");
    }
}
