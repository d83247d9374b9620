//! Board configuration
//!
//! Timing constants, storage geometry and device identity for one
//! build of the card.

use slotio_protocol::{DeviceInfo, MAX_PAYLOAD_SIZE, MAX_STORAGE_CHUNK};

use crate::storage::RECORD_LEN;
use crate::topology::ALL_TRACKS;

/// Longest period the RP2040 watchdog can be armed with
pub const MAX_WATCHDOG_US: u32 = 0x7F_FFFF;

/// Largest byte-addressable device the 16-bit storage addresses can reach
pub const MAX_CAPACITY: u32 = 0x1_0000;

/// Timing constants, all in microseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimingConfig {
    /// Time a sensor must integrate at one level before its output flips
    pub debounce_us: u32,
    /// Audit counter strobe high time
    pub pulse_high_us: u32,
    /// Audit counter strobe low time before the next pulse
    pub pulse_low_us: u32,
    /// Supervisory deadline for host acknowledgements while dispensing
    pub ack_timeout_us: u32,
    /// Eject deadline used until the host sets one
    pub eject_timeout_us: u32,
    /// Hardware watchdog period
    pub watchdog_us: u32,
}

/// Nonvolatile storage geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StorageConfig {
    /// Start of the first record bank
    pub bank0: u16,
    /// Start of the second record bank
    pub bank1: u16,
    /// First address the host may read or write
    pub user_start: u16,
    /// Device size in bytes
    pub capacity: u32,
    /// Longest host storage transfer
    pub max_transfer: u8,
}

/// Complete board configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BoardConfig {
    pub identity: DeviceInfo,
    pub timing: TimingConfig,
    pub storage: StorageConfig,
    /// Active-level bitset written when the store has to be initialized
    pub track_levels: u8,
}

/// Configuration validation failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Debounce threshold is zero or too large to integrate
    DebounceThreshold,
    /// A pulse width is zero
    PulseWidth,
    /// Ack timeout is zero
    AckTimeout,
    /// Watchdog period is zero or beyond the hardware limit
    WatchdogPeriod,
    /// The two record banks overlap
    BankOverlap,
    /// A record bank reaches into the user region
    UserRegion,
    /// Device capacity does not leave room for a user region
    Capacity,
    /// Max transfer is zero or does not fit a frame
    MaxTransfer,
    /// Identity strings do not fit a single frame
    IdentityTooLong,
    /// Active-level bits set for tracks that do not exist
    TrackLevels,
}

impl BoardConfig {
    /// Configuration shipped with the card
    pub const DEFAULT: BoardConfig = BoardConfig {
        identity: DeviceInfo {
            vendor: "Spark",
            product: "SLOT-IO-Card",
            version: "v0.1.0",
            build: 20261015,
        },
        timing: TimingConfig {
            debounce_us: 5_000,
            pulse_high_us: 50_000,
            pulse_low_us: 50_000,
            ack_timeout_us: 3_000_000,
            eject_timeout_us: 10_000_000,
            watchdog_us: 500_000,
        },
        storage: StorageConfig {
            bank0: 0x0000,
            bank1: 0x0100,
            user_start: 0x0200,
            capacity: 2048,
            max_transfer: 32,
        },
        track_levels: 0b0000_0000,
    };

    /// Check that the configuration can be run
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.timing;
        if t.debounce_us == 0 || t.debounce_us > (i32::MAX / 2) as u32 {
            return Err(ConfigError::DebounceThreshold);
        }
        if t.pulse_high_us == 0 || t.pulse_low_us == 0 {
            return Err(ConfigError::PulseWidth);
        }
        if t.ack_timeout_us == 0 {
            return Err(ConfigError::AckTimeout);
        }
        if t.watchdog_us == 0 || t.watchdog_us > MAX_WATCHDOG_US {
            return Err(ConfigError::WatchdogPeriod);
        }

        let s = &self.storage;
        let bank0_end = s.bank0 as u32 + RECORD_LEN as u32;
        let bank1_end = s.bank1 as u32 + RECORD_LEN as u32;
        if bank0_end > s.bank1 as u32 && bank1_end > s.bank0 as u32 {
            return Err(ConfigError::BankOverlap);
        }
        if bank0_end > s.user_start as u32 || bank1_end > s.user_start as u32 {
            return Err(ConfigError::UserRegion);
        }
        if s.capacity <= s.user_start as u32 || s.capacity > MAX_CAPACITY {
            return Err(ConfigError::Capacity);
        }
        if s.max_transfer == 0 || s.max_transfer as usize > MAX_STORAGE_CHUNK {
            return Err(ConfigError::MaxTransfer);
        }

        if self.identity.encoded_len() > MAX_PAYLOAD_SIZE {
            return Err(ConfigError::IdentityTooLong);
        }
        if self.track_levels >> ALL_TRACKS != 0 {
            return Err(ConfigError::TrackLevels);
        }

        Ok(())
    }
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert_eq!(BoardConfig::DEFAULT.validate(), Ok(()));
    }

    #[test]
    fn test_rejects_bad_timing() {
        let mut cfg = BoardConfig::DEFAULT;
        cfg.timing.debounce_us = 0;
        assert_eq!(cfg.validate(), Err(ConfigError::DebounceThreshold));

        let mut cfg = BoardConfig::DEFAULT;
        cfg.timing.debounce_us = u32::MAX;
        assert_eq!(cfg.validate(), Err(ConfigError::DebounceThreshold));

        let mut cfg = BoardConfig::DEFAULT;
        cfg.timing.pulse_low_us = 0;
        assert_eq!(cfg.validate(), Err(ConfigError::PulseWidth));

        let mut cfg = BoardConfig::DEFAULT;
        cfg.timing.watchdog_us = MAX_WATCHDOG_US + 1;
        assert_eq!(cfg.validate(), Err(ConfigError::WatchdogPeriod));
    }

    #[test]
    fn test_rejects_overlapping_banks() {
        let mut cfg = BoardConfig::DEFAULT;
        cfg.storage.bank1 = cfg.storage.bank0 + RECORD_LEN as u16 - 1;
        assert_eq!(cfg.validate(), Err(ConfigError::BankOverlap));

        // Adjacent banks are fine
        cfg.storage.bank1 = cfg.storage.bank0 + RECORD_LEN as u16;
        assert_eq!(cfg.validate(), Ok(()));
    }

    #[test]
    fn test_rejects_bank_in_user_region() {
        let mut cfg = BoardConfig::DEFAULT;
        cfg.storage.user_start = cfg.storage.bank1 + 8;
        assert_eq!(cfg.validate(), Err(ConfigError::UserRegion));
    }

    #[test]
    fn test_rejects_bad_storage_limits() {
        let mut cfg = BoardConfig::DEFAULT;
        cfg.storage.capacity = cfg.storage.user_start as u32;
        assert_eq!(cfg.validate(), Err(ConfigError::Capacity));

        let mut cfg = BoardConfig::DEFAULT;
        cfg.storage.max_transfer = MAX_STORAGE_CHUNK as u8 + 1;
        assert_eq!(cfg.validate(), Err(ConfigError::MaxTransfer));
    }

    #[test]
    fn test_rejects_long_identity() {
        let mut cfg = BoardConfig::DEFAULT;
        cfg.identity.product = "a product name that is far too long to fit into a frame";
        assert_eq!(cfg.validate(), Err(ConfigError::IdentityTooLong));
    }

    #[test]
    fn test_rejects_unknown_track_levels() {
        let mut cfg = BoardConfig::DEFAULT;
        cfg.track_levels = 1 << ALL_TRACKS;
        assert_eq!(cfg.validate(), Err(ConfigError::TrackLevels));
    }
}
