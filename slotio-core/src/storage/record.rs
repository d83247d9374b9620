//! Persisted record layout
//!
//! All multi-byte fields are little-endian. Byte offsets:
//!
//! | Offset | Size | Field            |
//! |--------|------|------------------|
//! | 0      | 1    | track_levels     |
//! | 1      | 2    | coins_to_eject   |
//! | 3      | 24   | coin_count       |
//! | 27     | 8    | eject_timeout    |
//! | 35     | 16   | counter_ticks    |
//! | 51     | 4    | seq              |
//! | 55     | 4    | integrity code   |

use crate::topology::{ALL_TRACKS, COUNTERS, EJECT_TRACKS};

use super::crc::integrity_code;

/// Layout version mixed into the integrity code
///
/// Bump whenever the field layout changes so old banks fail validation.
pub const LAYOUT_VERSION: u32 = 2;

pub(crate) const OFF_TRACK_LEVELS: usize = 0;
pub(crate) const OFF_COINS_TO_EJECT: usize = OFF_TRACK_LEVELS + 1;
pub(crate) const OFF_COIN_COUNT: usize = OFF_COINS_TO_EJECT + EJECT_TRACKS;
pub(crate) const OFF_EJECT_TIMEOUT: usize = OFF_COIN_COUNT + 4 * ALL_TRACKS;
pub(crate) const OFF_COUNTER_TICKS: usize = OFF_EJECT_TIMEOUT + 4 * EJECT_TRACKS;
pub(crate) const OFF_SEQ: usize = OFF_COUNTER_TICKS + 4 * COUNTERS;
pub(crate) const OFF_CRC: usize = OFF_SEQ + 4;

/// Serialized record size in bytes
pub const RECORD_LEN: usize = OFF_CRC + 4;

/// The durable record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConfigRecord {
    /// Bit `n` set: track `n` is active when its raw line is high
    pub track_levels: u8,
    /// Units still to dispense per eject track
    pub coins_to_eject: [u8; EJECT_TRACKS],
    /// Per-track audit totals
    pub coin_count: [u32; ALL_TRACKS],
    /// Per-eject-track deadline in microseconds
    pub eject_timeout: [u32; EJECT_TRACKS],
    /// Completed pulses per audit counter
    pub counter_ticks: [u32; COUNTERS],
    /// Bumped on every mutation
    pub seq: u32,
}

impl ConfigRecord {
    /// Fresh record with zeroed counters
    pub const fn defaults(track_levels: u8, eject_timeout_us: u32) -> Self {
        Self {
            track_levels,
            coins_to_eject: [0; EJECT_TRACKS],
            coin_count: [0; ALL_TRACKS],
            eject_timeout: [eject_timeout_us; EJECT_TRACKS],
            counter_ticks: [0; COUNTERS],
            seq: 0,
        }
    }

    /// Serialize, appending the integrity code
    pub fn encode(&self) -> [u8; RECORD_LEN] {
        let mut buf = [0u8; RECORD_LEN];

        buf[OFF_TRACK_LEVELS] = self.track_levels;
        buf[OFF_COINS_TO_EJECT..OFF_COIN_COUNT].copy_from_slice(&self.coins_to_eject);
        put_u32s(&mut buf[OFF_COIN_COUNT..OFF_EJECT_TIMEOUT], &self.coin_count);
        put_u32s(&mut buf[OFF_EJECT_TIMEOUT..OFF_COUNTER_TICKS], &self.eject_timeout);
        put_u32s(&mut buf[OFF_COUNTER_TICKS..OFF_SEQ], &self.counter_ticks);
        buf[OFF_SEQ..OFF_CRC].copy_from_slice(&self.seq.to_le_bytes());

        let code = integrity_code(&buf[..OFF_CRC]);
        buf[OFF_CRC..].copy_from_slice(&code.to_le_bytes());
        buf
    }

    /// Deserialize a bank image
    ///
    /// Returns `None` if the stored integrity code does not match.
    pub fn decode(buf: &[u8; RECORD_LEN]) -> Option<Self> {
        let stored = read_u32(&buf[OFF_CRC..]);
        if stored != integrity_code(&buf[..OFF_CRC]) {
            return None;
        }

        let mut record = Self::defaults(0, 0);
        record.track_levels = buf[OFF_TRACK_LEVELS];
        record
            .coins_to_eject
            .copy_from_slice(&buf[OFF_COINS_TO_EJECT..OFF_COIN_COUNT]);
        get_u32s(&buf[OFF_COIN_COUNT..OFF_EJECT_TIMEOUT], &mut record.coin_count);
        get_u32s(&buf[OFF_EJECT_TIMEOUT..OFF_COUNTER_TICKS], &mut record.eject_timeout);
        get_u32s(&buf[OFF_COUNTER_TICKS..OFF_SEQ], &mut record.counter_ticks);
        record.seq = read_u32(&buf[OFF_SEQ..OFF_CRC]);

        Some(record)
    }
}

fn put_u32s(dst: &mut [u8], values: &[u32]) {
    for (chunk, value) in dst.chunks_exact_mut(4).zip(values) {
        chunk.copy_from_slice(&value.to_le_bytes());
    }
}

fn get_u32s(src: &[u8], values: &mut [u32]) {
    for (chunk, value) in src.chunks_exact(4).zip(values) {
        *value = read_u32(chunk);
    }
}

fn read_u32(b: &[u8]) -> u32 {
    u32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_layout_size() {
        assert_eq!(RECORD_LEN, 59);
        assert_eq!(OFF_SEQ, 51);
    }

    #[test]
    fn test_field_placement() {
        let mut record = ConfigRecord::defaults(0b10_0001, 1_000_000);
        record.coin_count[2] = 0x1122_3344;
        record.counter_ticks[3] = 7;
        let buf = record.encode();

        assert_eq!(buf[OFF_TRACK_LEVELS], 0b10_0001);
        assert_eq!(&buf[OFF_COIN_COUNT + 8..OFF_COIN_COUNT + 12], &[0x44, 0x33, 0x22, 0x11]);
        assert_eq!(&buf[OFF_EJECT_TIMEOUT..OFF_EJECT_TIMEOUT + 4], &1_000_000u32.to_le_bytes());
        assert_eq!(buf[OFF_COUNTER_TICKS + 12], 7);
    }

    #[test]
    fn test_corruption_is_rejected() {
        let mut buf = ConfigRecord::defaults(0, 500).encode();
        assert!(ConfigRecord::decode(&buf).is_some());

        buf[OFF_COIN_COUNT] ^= 0x01;
        assert!(ConfigRecord::decode(&buf).is_none());
    }

    #[test]
    fn test_blank_device_is_invalid() {
        assert!(ConfigRecord::decode(&[0x00; RECORD_LEN]).is_none());
        assert!(ConfigRecord::decode(&[0xFF; RECORD_LEN]).is_none());
    }

    proptest! {
        #[test]
        fn encoded_record_decodes_unchanged(
            track_levels in 0u8..64,
            coins in any::<[u8; EJECT_TRACKS]>(),
            counts in any::<[u32; ALL_TRACKS]>(),
            timeouts in any::<[u32; EJECT_TRACKS]>(),
            ticks in any::<[u32; COUNTERS]>(),
            seq in any::<u32>(),
        ) {
            let record = ConfigRecord {
                track_levels,
                coins_to_eject: coins,
                coin_count: counts,
                eject_timeout: timeouts,
                counter_ticks: ticks,
                seq,
            };
            prop_assert_eq!(ConfigRecord::decode(&record.encode()), Some(record));
        }
    }
}
