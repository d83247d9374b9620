//! Board-agnostic core logic for the coin I/O card
//!
//! This crate contains all application logic that does not depend on
//! specific hardware implementations:
//!
//! - Collaborator traits (I/O board, nonvolatile storage, host link, watchdog)
//! - Card topology (tracks, counters, line assignments)
//! - Redundant dual-bank audit store
//! - Timing primitives (debounce, pulse train, one-shot timeout)
//! - The cooperative control loop and host command interpreter
//! - Board configuration and its validation

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod config;
pub mod control;
pub mod storage;
pub mod timing;
pub mod topology;
pub mod traits;

#[cfg(test)]
mod mock;
