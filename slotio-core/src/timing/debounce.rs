//! Energy-integrating debounce filter
//!
//! Behaves like an RC low-pass followed by a Schmitt trigger: time spent
//! at the active level charges an accumulator, time spent at the inactive
//! level drains it, and the output only flips once the accumulator hits
//! the threshold in either direction. Short bounces cancel out instead of
//! restarting a timer.

/// Output transition reported by [`DebounceFilter::feed`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Edge {
    /// Output became active
    Raise,
    /// Output became inactive
    Fall,
}

/// Debounce state for one input line
#[derive(Debug, Clone, Copy)]
pub struct DebounceFilter {
    threshold: i32,
    output: bool,
    energy: i32,
    last_sample: u32,
}

impl DebounceFilter {
    /// Create a filter that flips after `threshold_us` of net dwell time
    ///
    /// The threshold is capped at `i32::MAX / 2`.
    pub const fn new(threshold_us: u32) -> Self {
        let cap = (i32::MAX / 2) as u32;
        let threshold = if threshold_us > cap { cap } else { threshold_us };
        Self {
            threshold: threshold as i32,
            output: false,
            energy: 0,
            last_sample: 0,
        }
    }

    /// Seed the output without reporting an edge
    pub fn begin(&mut self, active: bool, now: u32) {
        self.output = active;
        self.energy = 0;
        self.last_sample = now;
    }

    /// Integrate one sample
    ///
    /// `active_level` is the raw level that counts as active for this line.
    /// Returns the edge if the output flipped; at most one per call.
    pub fn feed(&mut self, observed: bool, active_level: bool, now: u32) -> Option<Edge> {
        // Clamping dt to twice the threshold cannot change the outcome
        let dt = now
            .wrapping_sub(self.last_sample)
            .min(2 * self.threshold as u32) as i32;
        self.last_sample = now;

        self.energy = if observed == active_level {
            self.energy.saturating_add(dt)
        } else {
            self.energy.saturating_sub(dt)
        }
        .clamp(-self.threshold, self.threshold);

        if self.energy >= self.threshold && !self.output {
            self.output = true;
            Some(Edge::Raise)
        } else if self.energy <= -self.threshold && self.output {
            self.output = false;
            Some(Edge::Fall)
        } else {
            None
        }
    }

    /// Current debounced state (true = active)
    pub fn output(&self) -> bool {
        self.output
    }

    pub fn energy(&self) -> i32 {
        self.energy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const T: u32 = 5_000;

    #[test]
    fn test_begin_does_not_fire() {
        let mut filter = DebounceFilter::new(T);
        filter.begin(true, 100);
        assert_eq!(filter.feed(true, true, 100), None);
        assert_eq!(filter.feed(true, true, 100 + 2 * T), None);
        assert!(filter.output());
    }

    #[test]
    fn test_continuous_active_raises_once() {
        let mut filter = DebounceFilter::new(T);
        filter.begin(false, 0);

        let mut raises = 0;
        let mut now = 0;
        for _ in 0..20 {
            now += 1_000;
            if filter.feed(true, true, now) == Some(Edge::Raise) {
                raises += 1;
            }
        }
        assert_eq!(raises, 1);
        assert!(filter.output());
        assert_eq!(filter.energy(), T as i32);
    }

    #[test]
    fn test_raise_needs_full_threshold() {
        let mut filter = DebounceFilter::new(T);
        filter.begin(false, 0);
        assert_eq!(filter.feed(true, true, T - 1), None);
        assert_eq!(filter.feed(true, true, T), Some(Edge::Raise));
    }

    #[test]
    fn test_bounces_cancel_out() {
        let mut filter = DebounceFilter::new(T);
        filter.begin(false, 0);

        // 3ms active, 2ms bounce, 3ms active: net 4ms < 5ms
        assert_eq!(filter.feed(true, true, 3_000), None);
        assert_eq!(filter.feed(false, true, 5_000), None);
        assert_eq!(filter.feed(true, true, 8_000), None);
        assert_eq!(filter.energy(), 4_000);

        assert_eq!(filter.feed(true, true, 9_000), Some(Edge::Raise));
    }

    #[test]
    fn test_fall_after_raise() {
        let mut filter = DebounceFilter::new(T);
        filter.begin(false, 0);
        assert_eq!(filter.feed(true, true, 10_000), Some(Edge::Raise));
        // Energy must drain from +T to -T
        assert_eq!(filter.feed(false, true, 15_000), None);
        assert_eq!(filter.feed(false, true, 20_000), Some(Edge::Fall));
    }

    #[test]
    fn test_active_low_line() {
        let mut filter = DebounceFilter::new(T);
        filter.begin(false, 0);
        // Raw low is active
        assert_eq!(filter.feed(false, false, 6_000), Some(Edge::Raise));
        assert_eq!(filter.feed(true, false, 20_000), Some(Edge::Fall));
    }

    #[test]
    fn test_handles_clock_rollover() {
        let mut filter = DebounceFilter::new(T);
        filter.begin(false, u32::MAX - 1_000);
        assert_eq!(filter.feed(true, true, 4_500), Some(Edge::Raise));
    }

    #[test]
    fn test_long_gap_is_clamped() {
        let mut filter = DebounceFilter::new(T);
        filter.begin(false, 0);
        assert_eq!(filter.feed(true, true, 3_000_000_000), Some(Edge::Raise));
        assert_eq!(filter.energy(), T as i32);
    }

    proptest! {
        #[test]
        fn short_dwell_never_fires(steps in proptest::collection::vec((any::<bool>(), 1u32..500), 1..64)) {
            let mut filter = DebounceFilter::new(T);
            filter.begin(false, 0);

            // Total active time below the threshold can never raise the output
            let mut now = 0u32;
            let mut active_total = 0u32;
            for (active, dt) in steps {
                if active && active_total + dt >= T {
                    break;
                }
                now += dt;
                if active {
                    active_total += dt;
                }
                prop_assert_eq!(filter.feed(active, true, now), None);
            }
            prop_assert!(!filter.output());
        }

        #[test]
        fn energy_stays_within_threshold(steps in proptest::collection::vec((any::<bool>(), any::<u32>()), 1..64)) {
            let mut filter = DebounceFilter::new(T);
            filter.begin(false, 0);
            let mut now = 0u32;
            for (active, dt) in steps {
                now = now.wrapping_add(dt);
                filter.feed(active, true, now);
                prop_assert!(filter.energy().unsigned_abs() <= T);
            }
        }
    }
}
