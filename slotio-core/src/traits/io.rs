//! Shift-register I/O board

use crate::topology::{INPUT_BYTES, OUTPUT_BYTES};

/// I/O board errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IoError {
    /// The serial bus to the shift registers failed
    Bus,
}

/// Latched input and output lines
///
/// Both operations complete in bounded time; the control loop calls them
/// once per iteration.
pub trait IoBoard {
    /// Sample the raw level of every input line
    fn sample_inputs(&mut self, inputs: &mut [u8; INPUT_BYTES]) -> Result<(), IoError>;

    /// Drive every output line and latch the result
    fn assert_outputs(&mut self, outputs: &[u8; OUTPUT_BYTES]) -> Result<(), IoError>;
}
