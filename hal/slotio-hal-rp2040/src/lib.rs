//! RP2040-specific HAL for the coin I/O card
//!
//! This crate binds the RP2040 peripherals to the traits the rest of the
//! firmware is written against:
//!
//! - `embedded-hal` 1.0 SPI, I2C and output pins onto the `slotio-hal`
//!   bus traits ([`bus`])
//! - The hardware watchdog onto `slotio_core::traits::Watchdog`
//!   ([`watchdog`])

#![no_std]

pub mod bus;
pub mod watchdog;

pub use bus::{EhI2c, EhOutput, EhSpi};
pub use watchdog::RpWatchdog;
