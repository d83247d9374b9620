//! Pending output image

use crate::topology::{Line, OUTPUT_BYTES};

/// Output bytes waiting to be latched
///
/// Changes accumulate during an iteration and are pushed to the board in
/// one transfer at the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputImage {
    bytes: [u8; OUTPUT_BYTES],
    dirty: bool,
}

impl OutputImage {
    pub const fn new() -> Self {
        Self {
            bytes: [0; OUTPUT_BYTES],
            dirty: true,
        }
    }

    pub fn set(&mut self, line: Line, high: bool) {
        line.write(&mut self.bytes, high);
        self.dirty = true;
    }

    pub fn get(&self, line: Line) -> bool {
        line.read(&self.bytes)
    }

    /// Replace the bits selected by `mask` with those of `values`
    ///
    /// Bytes beyond the image are ignored.
    pub fn overwrite_masked(&mut self, values: &[u8], mask: &[u8; OUTPUT_BYTES]) {
        for ((byte, value), mask) in self.bytes.iter_mut().zip(values).zip(mask) {
            *byte = (*byte & !mask) | (value & mask);
        }
        self.dirty = true;
    }

    pub fn bytes(&self) -> &[u8; OUTPUT_BYTES] {
        &self.bytes
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }
}

impl Default for OutputImage {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::HOST_OUTPUT_MASK;

    #[test]
    fn test_overwrite_respects_mask() {
        let mut image = OutputImage::new();
        image.set(Line::new(0, 7), true);
        image.mark_clean();

        image.overwrite_masked(&[0xFF, 0xAB, 0xCD, 0xEE], &HOST_OUTPUT_MASK);
        assert_eq!(image.bytes(), &[0b1011_0000, 0xAB, 0xCD]);
        assert!(image.is_dirty());

        image.overwrite_masked(&[0x00], &HOST_OUTPUT_MASK);
        assert_eq!(image.bytes(), &[0b1000_0000, 0xAB, 0xCD]);
    }
}
