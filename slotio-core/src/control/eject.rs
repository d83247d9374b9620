//! Per-track eject supervision

use crate::timing::TimeoutTracker;

/// Supervisory state of an eject track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EjectState {
    /// Motor off, deadline disarmed
    Idle,
    /// Motor on, deadline armed
    Dispensing,
}

/// State and deadline of one eject track
///
/// The remaining count lives in the persistent store; this only tracks
/// whether the motor is supposed to be running.
#[derive(Debug, Clone, Copy)]
pub struct EjectChannel {
    state: EjectState,
    deadline: TimeoutTracker,
}

impl EjectChannel {
    pub const fn new(timeout_us: u32) -> Self {
        Self {
            state: EjectState::Idle,
            deadline: TimeoutTracker::new(timeout_us),
        }
    }

    pub fn state(&self) -> EjectState {
        self.state
    }

    pub fn is_dispensing(&self) -> bool {
        self.state == EjectState::Dispensing
    }

    /// Enter `Dispensing` and arm the deadline
    pub fn start(&mut self, now: u32) {
        self.state = EjectState::Dispensing;
        self.deadline.start(now);
    }

    /// Push the deadline out after progress
    pub fn restart(&mut self, now: u32) {
        self.deadline.start(now);
    }

    /// Return to `Idle` and disarm the deadline
    pub fn stop(&mut self) {
        self.state = EjectState::Idle;
        self.deadline.stop();
    }

    /// Deadline for subsequent starts
    pub fn set_timeout(&mut self, timeout_us: u32) {
        self.deadline.begin(timeout_us);
    }

    pub fn timeout(&self) -> u32 {
        self.deadline.duration()
    }

    /// True once when dispensing overran the deadline
    pub fn timed_out(&mut self, now: u32) -> bool {
        self.is_dispensing() && self.deadline.trigger(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_only_while_dispensing() {
        let mut ch = EjectChannel::new(100);
        assert!(!ch.timed_out(1_000));

        ch.start(0);
        assert!(!ch.timed_out(100));
        assert!(ch.timed_out(101));
        assert!(!ch.timed_out(102));
    }

    #[test]
    fn test_restart_extends_deadline() {
        let mut ch = EjectChannel::new(100);
        ch.start(0);
        ch.restart(90);
        assert!(!ch.timed_out(150));
        assert!(ch.timed_out(191));
    }

    #[test]
    fn test_stop_disarms() {
        let mut ch = EjectChannel::new(100);
        ch.start(0);
        ch.stop();
        assert_eq!(ch.state(), EjectState::Idle);
        assert!(!ch.timed_out(1_000));
    }
}
