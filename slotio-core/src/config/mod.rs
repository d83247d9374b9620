//! Configuration types
//!
//! The board configuration is fixed at build time: the firmware's build
//! script reads `board.toml`, validates it here and bakes it into a
//! `const`.

pub mod board;

pub use board::*;
