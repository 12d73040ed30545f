//! RDS groups

use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

/// Group version
///
/// Version B groups repeat the PI code in block C and carry
/// less payload than version A groups.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroupVersion {
    A,
    B,
}

impl GroupVersion {
    /// Version from the B<sub>0</sub> bit of block B
    pub fn from_bit(bit: u16) -> Self {
        if bit & 1 == 0 {
            GroupVersion::A
        } else {
            GroupVersion::B
        }
    }

    /// Zero for version A, one for version B
    pub fn as_bit(&self) -> usize {
        match self {
            GroupVersion::A => 0,
            GroupVersion::B => 1,
        }
    }
}

impl fmt::Display for GroupVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupVersion::A => f.write_str("A"),
            GroupVersion::B => f.write_str("B"),
        }
    }
}

/// Group type and version, like `0A` or `14B`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupType {
    number: u8,
    version: GroupVersion,
}

impl GroupType {
    /// Number of distinct (type, version) slots
    pub const COUNT: usize = 32;

    /// Create from a type number (0 to 15) and version
    pub const fn new(number: u8, version: GroupVersion) -> Self {
        Self {
            number: number & 0xf,
            version,
        }
    }

    /// Decode from the contents of block B
    pub fn from_block_b(b: u16) -> Self {
        Self::new(((b >> 12) & 0xf) as u8, GroupVersion::from_bit(b >> 11))
    }

    /// Group type number, from 0 to 15
    pub fn number(&self) -> u8 {
        self.number
    }

    /// Group version
    pub fn version(&self) -> GroupVersion {
        self.version
    }

    /// Dense index from 0 to 31
    pub fn index(&self) -> usize {
        ((self.number as usize) << 1) | self.version.as_bit()
    }

    /// Reverse of [`index()`](GroupType::index)
    pub fn from_index(index: usize) -> Self {
        Self::new(((index >> 1) & 0xf) as u8, GroupVersion::from_bit(index as u16))
    }
}

impl fmt::Display for GroupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.number, self.version)
    }
}

/// A received group of four blocks
///
/// Each block is either a 16-bit information word or `None`
/// if the block failed its syndrome check. Groups also carry
/// the bit time at which they were completed, which is a
/// monotonic count of bits (not necessarily starting at zero).
///
/// Groups read from, and print to, the hex dump format:
///
/// ```
/// use rdsurvey::Group;
///
/// let group: Group = "F202 0408 ---- 2043".parse().unwrap();
/// assert_eq!(Some(0xf202), group.block(0));
/// assert_eq!(None, group.block(2));
/// assert_eq!(3, group.valid_count());
/// assert_eq!("0A", group.group_type().unwrap().to_string());
/// assert_eq!("F202 0408 ---- 2043", group.to_string());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Group {
    blocks: [Option<u16>; 4],
    bit_time: u64,
}

impl Group {
    /// New group from blocks and bit time
    pub fn new(blocks: [Option<u16>; 4], bit_time: u64) -> Self {
        Self { blocks, bit_time }
    }

    /// New group with all four blocks valid
    pub fn from_words(words: [u16; 4], bit_time: u64) -> Self {
        Self::new(words.map(Some), bit_time)
    }

    /// Block at `index`, if it was received without error
    #[inline]
    pub fn block(&self, index: usize) -> Option<u16> {
        self.blocks.get(index).copied().flatten()
    }

    /// All four blocks
    pub fn blocks(&self) -> &[Option<u16>; 4] {
        &self.blocks
    }

    /// True if block `index` was received without error
    #[inline]
    pub fn is_valid(&self, index: usize) -> bool {
        self.block(index).is_some()
    }

    /// Number of blocks received without error
    pub fn valid_count(&self) -> usize {
        self.blocks.iter().filter(|b| b.is_some()).count()
    }

    /// Bit time at the end of this group
    pub fn bit_time(&self) -> u64 {
        self.bit_time
    }

    /// Group type and version, if block B is valid
    pub fn group_type(&self) -> Option<GroupType> {
        self.block(1).map(GroupType::from_block_b)
    }

    /// Program identification code
    ///
    /// The PI is read from block A. Version B groups repeat
    /// it in block C′, which is used if block A is invalid.
    pub fn pi(&self) -> Option<u16> {
        match (self.block(0), self.group_type(), self.block(2)) {
            (Some(pi), _, _) => Some(pi),
            (None, Some(gt), Some(pi)) if gt.version() == GroupVersion::B => Some(pi),
            _ => None,
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, blk) in self.blocks.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            match blk {
                Some(val) => write!(f, "{:04X}", val)?,
                None => f.write_str("----")?,
            }
        }
        Ok(())
    }
}

/// Error parsing a hex dump group line
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum GroupParseErr {
    /// Fewer than four fields on the line
    #[error("not enough blocks: expected four")]
    TooFewBlocks,

    /// A field is neither four hex digits nor `----`
    #[error("invalid block \"{0}\": expected four hex digits or \"----\"")]
    InvalidBlock(String),
}

lazy_static! {
    static ref BLOCK_FIELD: Regex = Regex::new(r"^(?:[0-9A-Fa-f]{4}|----)$").expect("bad regex");
}

impl FromStr for Group {
    type Err = GroupParseErr;

    /// Parse the last four whitespace-separated fields
    ///
    /// The bit time of the resulting group is zero.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split_whitespace().collect();
        if fields.len() < 4 {
            return Err(GroupParseErr::TooFewBlocks);
        }

        let mut blocks = [None; 4];
        for (out, field) in blocks.iter_mut().zip(&fields[fields.len() - 4..]) {
            if !BLOCK_FIELD.is_match(field) {
                return Err(GroupParseErr::InvalidBlock(field.to_string()));
            }
            if *field != "----" {
                *out = u16::from_str_radix(field, 16).ok();
            }
        }

        Ok(Group::new(blocks, 0))
    }
}
