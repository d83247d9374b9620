//! One-shot deadline

/// Deadline that fires at most once per `start`
#[derive(Debug, Clone, Copy)]
pub struct TimeoutTracker {
    duration: u32,
    started: u32,
    armed: bool,
}

impl TimeoutTracker {
    pub const fn new(duration_us: u32) -> Self {
        Self {
            duration: duration_us,
            started: 0,
            armed: false,
        }
    }

    /// Set the duration used by subsequent `start` calls
    pub fn begin(&mut self, duration_us: u32) {
        self.duration = duration_us;
    }

    /// Arm the deadline `duration` after `now`
    pub fn start(&mut self, now: u32) {
        self.started = now;
        self.armed = true;
    }

    pub fn stop(&mut self) {
        self.armed = false;
    }

    /// Check the deadline; disarms when it fires
    pub fn trigger(&mut self, now: u32) -> bool {
        if self.armed && now.wrapping_sub(self.started) > self.duration {
            self.armed = false;
            return true;
        }
        false
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn duration(&self) -> u32 {
        self.duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const D: u32 = 1_000;

    #[test]
    fn test_fires_once_after_deadline() {
        let mut t = TimeoutTracker::new(D);
        t.start(500);
        assert!(!t.trigger(500 + D - 1));
        assert!(!t.trigger(500 + D));
        assert!(t.trigger(500 + D + 1));
        assert!(!t.trigger(500 + D + 2));
        assert!(!t.trigger(500 + 100 * D));
    }

    #[test]
    fn test_never_fires_unarmed() {
        let mut t = TimeoutTracker::new(D);
        assert!(!t.trigger(10 * D));
        t.start(0);
        t.stop();
        assert!(!t.trigger(10 * D));
    }

    #[test]
    fn test_restart_pushes_deadline() {
        let mut t = TimeoutTracker::new(D);
        t.start(0);
        t.start(D);
        assert!(!t.trigger(D + D));
        assert!(t.trigger(D + D + 1));
    }

    #[test]
    fn test_begin_changes_duration() {
        let mut t = TimeoutTracker::new(D);
        t.begin(10);
        t.start(u32::MAX - 5);
        assert!(!t.trigger(4));
        assert!(t.trigger(5));
        assert_eq!(t.duration(), 10);
    }
}
