//! Slotio Hardware Abstraction Layer
//!
//! This crate defines the bus traits the card drivers are written against.
//! Chip-specific HALs implement them, so the shift-register and FRAM
//! drivers can be tested on the host with plain mock buses.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  slotio-drivers (shift chain, FRAM)     │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  slotio-hal (this crate - traits)       │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//!             ┌───────────────┐
//!             │  slotio-hal-  │
//!             │    rp2040     │
//!             └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`gpio::OutputPin`] - Latch and strobe lines
//! - [`i2c::I2cBus`] - I2C bus operations
//! - [`spi::SpiBus`] - SPI bus operations

#![no_std]
#![deny(unsafe_code)]

pub mod gpio;
pub mod i2c;
pub mod spi;

// Re-export key traits at crate root for convenience
pub use gpio::OutputPin;
pub use i2c::I2cBus;
pub use spi::SpiBus;
