//! Bit queue for multi-group messages

/// MSB-first bit queue
///
/// Continuation groups of an Alert-C message append their
/// free-format bits here. Labelled fields are then read back
/// off the front of the queue.
///
/// ```
/// use rdsurvey::tmc::Bitstream;
///
/// let mut bits = Bitstream::new();
/// bits.push_bits(0b1011, 4);
/// bits.push_bits(0xff, 8);
/// assert_eq!(12, bits.len());
/// assert_eq!(0b10, bits.peek(2));
/// assert_eq!(0b101, bits.take(3));
/// assert_eq!(0b1_1111_1111, bits.take(9));
/// assert!(bits.is_empty());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Bitstream {
    bits: u128,
    len: u32,
}

impl Bitstream {
    /// Maximum number of bits held at once
    ///
    /// An Alert-C message carries at most four continuation
    /// groups of 28 bits each.
    pub const CAPACITY: u32 = 128;

    /// Empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bits queued
    pub fn len(&self) -> u32 {
        self.len
    }

    /// True if no bits are queued
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append the `width` low bits of `value`
    ///
    /// Bits beyond the queue capacity are lost from the front.
    pub fn push_bits(&mut self, value: u32, width: u32) {
        let width = width.min(32);
        if width == 0 {
            return;
        }
        let value = value as u128 & mask(width);
        self.bits = (self.bits << width) | value;
        self.len = (self.len + width).min(Self::CAPACITY);
    }

    /// Read the `width` oldest bits without removing them
    ///
    /// If fewer bits are queued, the missing low-order bits
    /// are zero.
    pub fn peek(&self, width: u32) -> u32 {
        let width = width.min(32);
        if width == 0 {
            return 0;
        }
        if width <= self.len {
            ((self.bits >> (self.len - width)) & mask(width)) as u32
        } else {
            ((self.bits & mask(self.len)) << (width - self.len)) as u32
        }
    }

    /// Remove and return the `width` oldest bits
    pub fn take(&mut self, width: u32) -> u32 {
        let out = self.peek(width);
        self.len -= width.min(self.len);
        self.bits &= mask(self.len);
        out
    }

    /// Discard everything
    pub fn clear(&mut self) {
        self.bits = 0;
        self.len = 0;
    }
}

fn mask(width: u32) -> u128 {
    if width >= 128 {
        u128::MAX
    } else {
        (1u128 << width) - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_continuation_layout() {
        // one continuation group: 12 bits from block C, 16 from D
        let mut bits = Bitstream::new();
        bits.push_bits(0x0abc, 12);
        bits.push_bits(0x1234, 16);
        assert_eq!(28, bits.len());
        assert_eq!(0xa, bits.take(4));
        assert_eq!(0xbc1, bits.take(12));
        assert_eq!(0x234, bits.peek(12));
        assert_eq!(12, bits.len());
    }

    #[test]
    fn test_short_peek() {
        let mut bits = Bitstream::new();
        bits.push_bits(0b11, 2);
        assert_eq!(0b1100, bits.peek(4));
        assert_eq!(0b11, bits.take(2));
        assert_eq!(0, bits.take(5));
        assert!(bits.is_empty());
    }

    #[test]
    fn test_capacity() {
        let mut bits = Bitstream::new();
        for _ in 0..5 {
            bits.push_bits(0xffff_ffff, 32);
        }
        assert_eq!(Bitstream::CAPACITY, bits.len());
        bits.clear();
        assert_eq!(0, bits.len());
    }
}
