//! Pulse train generator for mechanical tally counters

/// Phase of the current pulse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PulsePhase {
    Idle,
    High,
    Low,
}

/// Emits queued pulses with fixed high and low widths
///
/// The low phase is part of each cycle so the counter coil has time to
/// release before the next pulse starts.
#[derive(Debug, Clone, Copy)]
pub struct PulseGenerator {
    high_us: u32,
    low_us: u32,
    phase: PulsePhase,
    pending: u32,
    phase_start: u32,
}

impl PulseGenerator {
    pub const fn new(high_us: u32, low_us: u32) -> Self {
        Self {
            high_us,
            low_us,
            phase: PulsePhase::Idle,
            pending: 0,
            phase_start: 0,
        }
    }

    /// Queue `n` more pulses
    pub fn pulse(&mut self, n: u32) {
        self.pending = self.pending.saturating_add(n);
    }

    /// Advance the state machine
    ///
    /// Returns true if the phase changed.
    pub fn update(&mut self, now: u32) -> bool {
        match self.phase {
            PulsePhase::Idle => {
                if self.pending == 0 {
                    return false;
                }
                self.phase = PulsePhase::High;
            }
            PulsePhase::High => {
                if now.wrapping_sub(self.phase_start) <= self.high_us {
                    return false;
                }
                self.phase = PulsePhase::Low;
            }
            PulsePhase::Low => {
                if now.wrapping_sub(self.phase_start) <= self.low_us {
                    return false;
                }
                self.phase = PulsePhase::Idle;
                self.pending -= 1;
            }
        }
        self.phase_start = now;
        true
    }

    /// Level to drive on the counter output
    pub fn get(&self) -> bool {
        self.phase == PulsePhase::High
    }

    pub fn phase(&self) -> PulsePhase {
        self.phase
    }

    /// Pulses not yet completed, including the one in progress
    pub fn pending(&self) -> u32 {
        self.pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HIGH: u32 = 50_000;
    const LOW: u32 = 30_000;

    #[test]
    fn test_idle_without_pulses() {
        let mut gen = PulseGenerator::new(HIGH, LOW);
        assert!(!gen.update(0));
        assert!(!gen.update(1_000_000));
        assert!(!gen.get());
    }

    #[test]
    fn test_single_cycle() {
        let mut gen = PulseGenerator::new(HIGH, LOW);
        gen.pulse(1);

        assert!(gen.update(100));
        assert!(gen.get());

        assert!(!gen.update(100 + HIGH));
        assert!(gen.update(100 + HIGH + 1));
        assert_eq!(gen.phase(), PulsePhase::Low);
        assert!(!gen.get());

        assert!(!gen.update(100 + HIGH + 1 + LOW));
        assert!(gen.update(100 + HIGH + 2 + LOW));
        assert_eq!(gen.phase(), PulsePhase::Idle);
        assert_eq!(gen.pending(), 0);
    }

    #[test]
    fn test_three_pulses_complete() {
        let mut gen = PulseGenerator::new(HIGH, LOW);
        gen.pulse(3);

        let mut highs = 0;
        let mut now = 0;
        for _ in 0..1_000 {
            now += 1_000;
            if gen.update(now) && gen.get() {
                highs += 1;
            }
        }

        assert_eq!(highs, 3);
        assert_eq!(gen.pending(), 0);
        assert!(!gen.get());

        // Nothing more happens until new pulses are queued
        assert!(!gen.update(now + 10_000_000));
        gen.pulse(1);
        assert!(gen.update(now + 10_000_001));
    }

    #[test]
    fn test_pulse_saturates() {
        let mut gen = PulseGenerator::new(HIGH, LOW);
        gen.pulse(u32::MAX);
        gen.pulse(5);
        assert_eq!(gen.pending(), u32::MAX);
    }
}
