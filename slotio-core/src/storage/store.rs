//! Dual-bank record store

use crate::config::StorageConfig;
use crate::topology::{Counter, EjectTrack, Track};
use crate::traits::{NvError, NvStorage};

use super::record::{
    ConfigRecord, OFF_COINS_TO_EJECT, OFF_COIN_COUNT, OFF_COUNTER_TICKS, OFF_EJECT_TIMEOUT,
    OFF_SEQ, OFF_TRACK_LEVELS, RECORD_LEN,
};

/// One of the two record banks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Bank {
    Zero = 0,
    One = 1,
}

/// What `open` found in the banks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OpenOutcome {
    /// Both banks valid; the newer one was adopted
    BothValid { adopted: Bank },
    /// Only one bank was valid
    Recovered { from: Bank },
    /// Neither bank was valid; defaults were written to both
    Initialized,
}

impl OpenOutcome {
    /// Code reported to the host in the boot event
    pub fn code(self) -> u8 {
        match self {
            OpenOutcome::BothValid { adopted } => adopted as u8,
            OpenOutcome::Recovered { from } => 2 + from as u8,
            OpenOutcome::Initialized => 4,
        }
    }
}

/// Owner of the authoritative in-memory record
///
/// Every setter updates memory first, then writes the changed field plus
/// the sequence number and integrity code to bank 0 and then bank 1. A
/// bank that is known to differ from memory (invalid or older at open, or
/// interrupted by a failed write) is rewritten in full instead.
pub struct PersistentStore<S> {
    device: S,
    config: StorageConfig,
    record: ConfigRecord,
    stale: [bool; 2],
}

impl<S: NvStorage> PersistentStore<S> {
    /// Load the record from the device
    ///
    /// `defaults` is written to both banks when neither holds a valid record.
    /// A device smaller than the configured capacity is refused with
    /// [`NvError::OutOfRange`] before anything is read.
    pub fn open(
        mut device: S,
        config: StorageConfig,
        defaults: ConfigRecord,
    ) -> Result<(Self, OpenOutcome), NvError> {
        if device.capacity() < config.capacity {
            return Err(NvError::OutOfRange);
        }

        let mut image = [0u8; RECORD_LEN];

        device.read(config.bank0, &mut image)?;
        let bank0 = ConfigRecord::decode(&image);
        device.read(config.bank1, &mut image)?;
        let bank1 = ConfigRecord::decode(&image);

        let (record, stale, outcome) = match (bank0, bank1) {
            (Some(r0), Some(r1)) => {
                if newer(r1.seq, r0.seq) {
                    (r1, [true, false], OpenOutcome::BothValid { adopted: Bank::One })
                } else {
                    // Equal sequence numbers should mean equal content
                    (r0, [false, r0 != r1], OpenOutcome::BothValid { adopted: Bank::Zero })
                }
            }
            (Some(r0), None) => (r0, [false, true], OpenOutcome::Recovered { from: Bank::Zero }),
            (None, Some(r1)) => (r1, [true, false], OpenOutcome::Recovered { from: Bank::One }),
            (None, None) => (defaults, [true, true], OpenOutcome::Initialized),
        };

        let mut store = Self {
            device,
            config,
            record,
            stale,
        };

        if outcome == OpenOutcome::Initialized {
            store.commit(0, RECORD_LEN)?;
        }

        Ok((store, outcome))
    }

    /// The authoritative record
    pub fn record(&self) -> &ConfigRecord {
        &self.record
    }

    pub fn device(&self) -> &S {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut S {
        &mut self.device
    }

    /// Active level of a track sensor (true = high)
    pub fn track_level(&self, track: Track) -> bool {
        self.record.track_levels & (1 << track.index()) != 0
    }

    pub fn set_track_level(&mut self, track: Track, active_high: bool) -> Result<(), NvError> {
        let bit = 1 << track.index();
        if active_high {
            self.record.track_levels |= bit;
        } else {
            self.record.track_levels &= !bit;
        }
        self.commit(OFF_TRACK_LEVELS, 1)
    }

    pub fn coins_to_eject(&self, eject: EjectTrack) -> u8 {
        self.record.coins_to_eject[eject.index()]
    }

    pub fn set_coins_to_eject(&mut self, eject: EjectTrack, coins: u8) -> Result<(), NvError> {
        self.record.coins_to_eject[eject.index()] = coins;
        self.commit(OFF_COINS_TO_EJECT + eject.index(), 1)
    }

    pub fn coin_count(&self, track: Track) -> u32 {
        self.record.coin_count[track.index()]
    }

    pub fn set_coin_count(&mut self, track: Track, count: u32) -> Result<(), NvError> {
        self.record.coin_count[track.index()] = count;
        self.commit(OFF_COIN_COUNT + 4 * track.index(), 4)
    }

    /// Eject deadline in microseconds
    pub fn eject_timeout(&self, eject: EjectTrack) -> u32 {
        self.record.eject_timeout[eject.index()]
    }

    pub fn set_eject_timeout(&mut self, eject: EjectTrack, timeout_us: u32) -> Result<(), NvError> {
        self.record.eject_timeout[eject.index()] = timeout_us;
        self.commit(OFF_EJECT_TIMEOUT + 4 * eject.index(), 4)
    }

    pub fn counter_ticks(&self, counter: Counter) -> u32 {
        self.record.counter_ticks[counter.index()]
    }

    pub fn set_counter_ticks(&mut self, counter: Counter, ticks: u32) -> Result<(), NvError> {
        self.record.counter_ticks[counter.index()] = ticks;
        self.commit(OFF_COUNTER_TICKS + 4 * counter.index(), 4)
    }

    /// Raw read outside the record banks
    ///
    /// Region protection is the caller's job.
    pub fn read_bytes(&mut self, address: u16, buf: &mut [u8]) -> Result<(), NvError> {
        self.device.read(address, buf)
    }

    /// Raw write outside the record banks
    ///
    /// Region protection is the caller's job.
    pub fn write_bytes(&mut self, address: u16, data: &[u8]) -> Result<(), NvError> {
        self.device.write(address, data)
    }

    /// Bump the sequence number and persist `len` bytes at `offset`
    fn commit(&mut self, offset: usize, len: usize) -> Result<(), NvError> {
        self.record.seq = self.record.seq.wrapping_add(1);
        let image = self.record.encode();

        // Banks not confirmed below are rewritten in full next time
        let full = core::mem::replace(&mut self.stale, [true; 2]);

        for (bank, base) in [(0, self.config.bank0), (1, self.config.bank1)] {
            if full[bank] {
                self.device.write(base, &image)?;
            } else if offset + len == OFF_SEQ {
                self.device.write(base + offset as u16, &image[offset..])?;
            } else {
                self.device
                    .write(base + offset as u16, &image[offset..offset + len])?;
                self.device.write(base + OFF_SEQ as u16, &image[OFF_SEQ..])?;
            }

            self.stale[bank] = false;
        }

        Ok(())
    }
}

/// Wrapping sequence comparison: is `a` ahead of `b`?
fn newer(a: u32, b: u32) -> bool {
    (a.wrapping_sub(b) as i32) > 0
}
