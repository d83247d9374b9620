//! Record integrity code

use super::record::LAYOUT_VERSION;

/// CRC32 (IEEE 802.3) over `data`, seeded with the record layout version
pub fn integrity_code(data: &[u8]) -> u32 {
    let crc = crc32_update(0xFFFF_FFFF, &LAYOUT_VERSION.to_le_bytes());
    !crc32_update(crc, data)
}

/// Bitwise CRC32 update (reflected polynomial)
fn crc32_update(crc: u32, data: &[u8]) -> u32 {
    const POLY: u32 = 0xEDB8_8320;
    let mut crc = crc;

    for &byte in data {
        crc ^= byte as u32;
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ POLY;
            } else {
                crc >>= 1;
            }
        }
    }

    crc
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_crc32_check_value() {
        // Standard CRC-32 check value
        assert_eq!(!crc32_update(0xFFFF_FFFF, b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn test_layout_version_changes_code() {
        let data = [0u8; 16];
        let unseeded = !crc32_update(0xFFFF_FFFF, &data);
        assert_ne!(integrity_code(&data), unseeded);
    }

    proptest! {
        #[test]
        fn single_bit_flip_is_detected(
            data in proptest::collection::vec(any::<u8>(), 1..64),
            index in any::<prop::sample::Index>(),
            bit in 0u8..8,
        ) {
            let mut corrupted = data.clone();
            let i = index.index(corrupted.len());
            corrupted[i] ^= 1 << bit;
            prop_assert_ne!(integrity_code(&data), integrity_code(&corrupted));
        }
    }
}
