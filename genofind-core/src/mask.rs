//! Soft masks over sequences
//!
//! A set bit marks a masked base. Target sequences record their upper-case
//! bases this way; queries usually mask lower-case repeat bases.

use bitvec::prelude::*;

/// One bit per base of a sequence
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SoftMask {
    bits: BitVec<u64, Lsb0>,
}

impl SoftMask {
    /// Nothing masked
    pub fn new(len: usize) -> Self {
        Self {
            bits: bitvec![u64, Lsb0; 0; len],
        }
    }

    /// Mark every upper-case letter
    pub fn from_upper_case(sequence: &[u8]) -> Self {
        sequence.iter().map(|b| b.is_ascii_uppercase()).collect()
    }

    /// Mark every lower-case letter
    pub fn from_lower_case(sequence: &[u8]) -> Self {
        sequence.iter().map(|b| b.is_ascii_lowercase()).collect()
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn is_masked(&self, pos: usize) -> bool {
        self.bits.get(pos).map(|b| *b).unwrap_or(false)
    }

    pub fn set(&mut self, pos: usize, masked: bool) {
        if pos < self.bits.len() {
            self.bits.set(pos, masked);
        }
    }

    /// Mask `[start, end)`, clipped to the mask length
    pub fn set_range(&mut self, start: usize, end: usize) {
        let end = end.min(self.bits.len());
        if start < end {
            self.bits[start..end].fill(true);
        }
    }

    /// True if any base in `[start, end)` is masked
    pub fn any_in(&self, start: usize, end: usize) -> bool {
        let end = end.min(self.bits.len());
        start < end && self.bits[start..end].any()
    }

    pub fn count_ones(&self) -> usize {
        self.bits.count_ones()
    }
}

impl FromIterator<bool> for SoftMask {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        Self {
            bits: iter.into_iter().collect(),
        }
    }
}
