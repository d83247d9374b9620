//! Hardware watchdog

/// Independent watchdog that resets the device when not fed in time
pub trait Watchdog {
    /// Start the watchdog with the given period
    fn arm(&mut self, period_us: u32);

    /// Restart the current period
    fn feed(&mut self);
}

impl<W: Watchdog + ?Sized> Watchdog for &mut W {
    fn arm(&mut self, period_us: u32) {
        (**self).arm(period_us)
    }

    fn feed(&mut self) {
        (**self).feed()
    }
}
