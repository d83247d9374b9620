//! RP2040 hardware watchdog

use embassy_rp::watchdog::Watchdog as RpWatchdogPeripheral;
use embassy_time::Duration;
use slotio_core::traits::Watchdog;

/// Watchdog that resets the chip when the control loop stalls
///
/// The RP2040 counter tops out at about 8.3 s; longer periods are rejected
/// by [`slotio_core::config::BoardConfig::validate`] before they get here.
pub struct RpWatchdog {
    inner: RpWatchdogPeripheral,
}

impl RpWatchdog {
    pub fn new(inner: RpWatchdogPeripheral) -> Self {
        Self { inner }
    }
}

impl Watchdog for RpWatchdog {
    fn arm(&mut self, period_us: u32) {
        self.inner.start(Duration::from_micros(period_us as u64));
    }

    fn feed(&mut self) {
        self.inner.feed();
    }
}
