//! Hardware driver implementations
//!
//! This crate provides concrete implementations of the collaborator traits
//! defined in slotio-core, written against the bus traits of slotio-hal:
//!
//! - 74HC165 / 74HC595 shift-register chain ([`ShiftRegisterChain`])
//! - MB85RC I2C FRAM ([`Mb85rc`])

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod fram;
pub mod shift;

pub use fram::Mb85rc;
pub use shift::ShiftRegisterChain;
