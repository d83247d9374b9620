//! Embassy async tasks
//!
//! Each task runs independently and communicates via channels.

pub mod control;
pub mod host_rx;
pub mod host_tx;

pub use control::control_task;
pub use host_rx::host_rx_task;
pub use host_tx::host_tx_task;
