//! Timing state machines
//!
//! All three primitives take the current time as a wrapping `u32`
//! microsecond count and never read a clock themselves. Elapsed time is
//! always computed with wrapping subtraction, so they keep working across
//! the ~71 minute rollover.

pub mod debounce;
pub mod pulse;
pub mod timeout;

pub use debounce::{DebounceFilter, Edge};
pub use pulse::{PulseGenerator, PulsePhase};
pub use timeout::TimeoutTracker;
