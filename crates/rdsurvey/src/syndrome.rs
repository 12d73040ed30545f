//! Block syndromes and offset words
//!
//! Each RDS block is a 26-bit codeword: 16 information bits
//! followed by 10 check bits. The check bits are the remainder
//! of the information word, modulo the generator polynomial
//!
//! ```txt
//! g(x) = x^10 + x^8 + x^7 + x^5 + x^4 + x^3 + 1
//! ```
//!
//! XORed with an *offset word* that identifies the block's
//! position within the group. The syndrome of an error-free
//! block is therefore the syndrome of its offset word, which
//! lets the receiver find block boundaries in an unframed
//! bitstream.

use std::fmt;

/// Mask for a 26-bit block
pub const BLOCK_MASK: u32 = 0x3ff_ffff;

/// Number of bits in one block
pub const BLOCK_BITS: u32 = 26;

/// Number of bits in one group
pub const GROUP_BITS: u32 = 4 * BLOCK_BITS;

// generator polynomial, including the x^10 term
const GENERATOR: u32 = 0x5b9;

// parity-check matrix, one row per received bit, LSB first
const PARITY_CHECK: [u16; 26] = [
    0x31b, 0x38f, 0x2a7, 0x0f7, 0x1ee, 0x3dc, 0x201, 0x1bb, 0x376, 0x355, 0x313, 0x39f, 0x287,
    0x0b7, 0x16e, 0x2dc, 0x001, 0x002, 0x004, 0x008, 0x010, 0x020, 0x040, 0x080, 0x100, 0x200,
];

// expected syndromes for each block position, for the
// "A" and "B" variants of the third block
const SYNDROMES: [[u16; 2]; 4] = [
    [0x3d8, 0x3d8],
    [0x3d4, 0x3d4],
    [0x25c, 0x3cc],
    [0x258, 0x258],
];

/// Position of a block within a group
///
/// Block C has two offset words. `C` is used by version A
/// groups; `CPrime` (C′) is used by version B groups, which
/// repeat the PI in the third block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlockPosition {
    A,
    B,
    C,
    CPrime,
    D,
}

impl BlockPosition {
    /// Offset word added to the check bits
    pub const fn offset_word(&self) -> u16 {
        match self {
            BlockPosition::A => 0x0fc,
            BlockPosition::B => 0x198,
            BlockPosition::C => 0x168,
            BlockPosition::CPrime => 0x350,
            BlockPosition::D => 0x1b4,
        }
    }

    /// Index of the block within its group, from 0 to 3
    pub const fn index(&self) -> usize {
        match self {
            BlockPosition::A => 0,
            BlockPosition::B => 1,
            BlockPosition::C | BlockPosition::CPrime => 2,
            BlockPosition::D => 3,
        }
    }

    /// Syndrome of an error-free block at this position
    pub const fn expected_syndrome(&self) -> u16 {
        match self {
            BlockPosition::CPrime => SYNDROMES[2][1],
            _ => SYNDROMES[self.index()][0],
        }
    }
}

impl fmt::Display for BlockPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BlockPosition::A => "A",
            BlockPosition::B => "B",
            BlockPosition::C => "C",
            BlockPosition::CPrime => "C'",
            BlockPosition::D => "D",
        };
        f.write_str(s)
    }
}

/// Compute the syndrome of a 26-bit block
///
/// Only the low 26 bits of `block` are considered. The
/// most-significant of these is the first bit received.
///
/// ```
/// use rdsurvey::syndrome::{syndrome, BlockPosition};
///
/// // an all-zero information word carries only its offset
/// let block = BlockPosition::A.offset_word() as u32;
/// assert_eq!(syndrome(block), 0x3d8);
/// ```
pub fn syndrome(block: u32) -> u16 {
    let mut block = block & BLOCK_MASK;
    let mut out = 0u16;
    for row in PARITY_CHECK.iter() {
        if block & 1 != 0 {
            out ^= row;
        }
        block >>= 1;
    }
    out
}

/// Compute the 10 check bits for an information word
///
/// The result does not include any offset word.
pub fn checkword(info: u16) -> u16 {
    let mut reg = (info as u32) << 10;
    for bit in (10..26).rev() {
        if reg & (1 << bit) != 0 {
            reg ^= GENERATOR << (bit - 10);
        }
    }
    (reg & 0x3ff) as u16
}

/// Encode an information word as a 26-bit block
///
/// ```
/// use rdsurvey::syndrome::{encode, syndrome, BlockPosition};
///
/// let block = encode(0xf202, BlockPosition::A);
/// assert_eq!(block >> 10, 0xf202);
/// assert_eq!(syndrome(block), BlockPosition::A.expected_syndrome());
/// ```
pub fn encode(info: u16, position: BlockPosition) -> u32 {
    ((info as u32) << 10) | (checkword(info) ^ position.offset_word()) as u32
}

/// Check a block against the syndromes for group index `index`
///
/// Returns `true` if `syn` matches either offset-word variant
/// expected at block `index` (0 to 3).
pub fn matches_index(syn: u16, index: usize) -> bool {
    SYNDROMES[index & 3].contains(&syn)
}

/// Find the group index whose offset word produces `syn`
///
/// Returns the first block index, from 0 to 3, which could have
/// produced the given syndrome. Returns `None` if the syndrome
/// matches no known offset word.
pub fn match_syndrome(syn: u16) -> Option<usize> {
    (0..4).find(|&i| matches_index(syn, i))
}

#[cfg(test)]
mod tests {
    use super::*;

    const POSITIONS: [BlockPosition; 5] = [
        BlockPosition::A,
        BlockPosition::B,
        BlockPosition::C,
        BlockPosition::CPrime,
        BlockPosition::D,
    ];

    #[test]
    fn test_offset_syndromes() {
        for pos in POSITIONS.iter() {
            assert_eq!(
                syndrome(pos.offset_word() as u32),
                pos.expected_syndrome(),
                "position {}",
                pos
            );
        }
    }

    #[test]
    fn test_valid_codewords() {
        for info in [0x0000u16, 0xf202, 0x0408, 0x5c66, 0x2043, 0xffff, 0x1234] {
            assert_eq!(syndrome(((info as u32) << 10) | checkword(info) as u32), 0);
            for pos in POSITIONS.iter() {
                let block = encode(info, *pos);
                let syn = syndrome(block);
                assert_eq!(syn, pos.expected_syndrome());
                assert!(matches_index(syn, pos.index()));
            }
        }
    }

    #[test]
    fn test_single_bit_errors() {
        for info in [0x0000u16, 0xf202, 0xa5a5] {
            for pos in POSITIONS.iter() {
                let good = encode(info, *pos);
                for bit in 0..BLOCK_BITS {
                    let syn = syndrome(good ^ (1 << bit));
                    // never accepted at its own position
                    assert!(!matches_index(syn, pos.index()));

                    // C and D offsets are one syndrome bit apart, so
                    // only A, B, and C' are free of any cross-match
                    match pos {
                        BlockPosition::C | BlockPosition::D => {}
                        _ => assert_eq!(None, match_syndrome(syn)),
                    }
                }
            }
        }
    }

    #[test]
    fn test_match_syndrome() {
        assert_eq!(Some(0), match_syndrome(0x3d8));
        assert_eq!(Some(1), match_syndrome(0x3d4));
        assert_eq!(Some(2), match_syndrome(0x25c));
        assert_eq!(Some(2), match_syndrome(0x3cc));
        assert_eq!(Some(3), match_syndrome(0x258));
        assert_eq!(None, match_syndrome(0x000));
    }
}
