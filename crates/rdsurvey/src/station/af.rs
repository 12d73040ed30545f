//! Alternate frequency lists
//!
//! AF codes are transmitted in pairs. Codes 1 to 204 denote
//! VHF frequencies from 87.6 to 107.9 MHz, in steps of
//! 100 kHz. Codes 224 to 249 begin a new list and announce
//! the number of frequencies it contains; the second code of
//! such a pair is the transmitter's own frequency.
//!
//! There are two ways to transmit a list:
//!
//! * **Method A**: the list is sent as-is, two codes per group.
//! * **Method B**: every pair contains the transmitter
//!   frequency and one alternate. The order of the pair
//!   tells whether the alternate carries the same programme
//!   or a regional variant.
//!
//! The method is not announced. It must be inferred.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

#[cfg(not(test))]
use log::debug;

#[cfg(test)]
use std::println as debug;

/// Filler code, used to pad an odd-length list
pub const FILLER_CODE: u8 = 205;

/// Convert an AF code to a frequency, in units of 100 kHz
///
/// ```
/// use rdsurvey::station::af::channel_to_freq;
///
/// assert_eq!(Some(876), channel_to_freq(1));
/// assert_eq!(Some(1079), channel_to_freq(204));
/// assert_eq!(None, channel_to_freq(205));
/// ```
pub fn channel_to_freq(channel: u8) -> Option<u16> {
    if channel <= 204 {
        Some(875 + channel as u16)
    } else {
        None
    }
}

/// Format a frequency in units of 100 kHz, like `"87.6"`
pub fn format_freq(freq: u16) -> String {
    format!("{}.{}", freq / 10, freq % 10)
}

/// True if `code` introduces a new list
pub fn is_list_length_indicator(code: u8) -> bool {
    (224..=249).contains(&code)
}

/// AF list transmission method
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AfMethod {
    /// Not enough data to tell
    Unknown,

    /// Plain list of frequencies
    A,

    /// Pairs of (transmitter, alternate)
    B,
}

impl fmt::Display for AfMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AfMethod::Unknown => f.write_str("?"),
            AfMethod::A => f.write_str("A"),
            AfMethod::B => f.write_str("B"),
        }
    }
}

/// One list of alternate frequencies
///
/// Each list belongs to a transmitter frequency, if known.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AfList {
    transmitter: Option<u16>,
    expected_len: Option<u8>,
    method: AfMethod,
    afs: BTreeSet<u16>,
}

impl AfList {
    /// New empty list for the given transmitter frequency
    pub fn new(transmitter: Option<u16>) -> Self {
        Self {
            transmitter,
            expected_len: None,
            method: AfMethod::Unknown,
            afs: BTreeSet::new(),
        }
    }

    /// Transmitter frequency, in units of 100 kHz
    pub fn transmitter(&self) -> Option<u16> {
        self.transmitter
    }

    /// Inferred transmission method
    pub fn method(&self) -> AfMethod {
        self.method
    }

    /// Number of frequencies announced by the list header
    pub fn expected_len(&self) -> Option<u8> {
        self.expected_len
    }

    /// Alternate frequencies, in units of 100 kHz
    pub fn frequencies(&self) -> &BTreeSet<u16> {
        &self.afs
    }

    /// Add one AF pair to this list
    ///
    /// Returns `false` if the pair cannot belong to this list.
    /// That happens only for a method B list whose
    /// transmitter frequency is in neither half of the pair,
    /// which is taken as the start of a new list. This is a
    /// heuristic. It can misfire on unusual streams.
    pub fn add_pair(&mut self, a: u8, b: u8) -> bool {
        let fa = channel_to_freq(a);
        let fb = channel_to_freq(b);

        if self.transmitter.is_some() && fa == self.transmitter {
            self.method = AfMethod::B;
            self.afs.extend(fb);
            true
        } else if self.transmitter.is_some() && fb == self.transmitter {
            self.method = AfMethod::B;
            self.afs.extend(fa);
            true
        } else if fa.is_none() && fb.is_none() {
            true
        } else if self.method == AfMethod::B {
            false
        } else {
            if self.transmitter.is_some() {
                self.method = AfMethod::A;
            }
            self.afs.extend(fa);
            self.afs.extend(fb);
            true
        }
    }
}

impl fmt::Display for AfList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "List[{}, sz={}]: ", self.method, self.afs.len())?;
        match self.transmitter {
            Some(tx) => write!(f, "{} ->", format_freq(tx))?,
            None => f.write_str("? ->")?,
        }
        for af in self.afs.iter() {
            write!(f, " {}", format_freq(*af))?;
        }
        Ok(())
    }
}

/// All AF lists of a tuned station
///
/// Pairs are added to the list most recently opened by a
/// list-length indicator. Pairs received before any such
/// indicator go to a list with an unknown transmitter.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AfLists {
    lists: Vec<AfList>,
    current: Option<usize>,
}

impl AfLists {
    /// No lists
    pub fn new() -> Self {
        Self::default()
    }

    /// All lists, in order of appearance
    pub fn lists(&self) -> &[AfList] {
        &self.lists
    }

    /// The list currently being received
    pub fn current(&self) -> Option<&AfList> {
        self.current.and_then(|i| self.lists.get(i))
    }

    /// List for the given transmitter frequency
    pub fn for_transmitter(&self, freq: u16) -> Option<&AfList> {
        self.lists.iter().find(|l| l.transmitter == Some(freq))
    }

    /// Forget all lists
    pub fn clear(&mut self) {
        self.lists.clear();
        self.current = None;
    }

    /// Add a pair of AF codes from a type 0A group
    pub fn add_pair(&mut self, a: u8, b: u8) {
        if is_list_length_indicator(a) {
            if b > FILLER_CODE {
                return;
            }
            let tx = channel_to_freq(b);
            let idx = match self.lists.iter().position(|l| l.transmitter == tx) {
                Some(idx) => idx,
                None => {
                    self.lists.push(AfList::new(tx));
                    self.lists.len() - 1
                }
            };
            self.lists[idx].expected_len = Some(a - 224);
            self.current = Some(idx);
            return;
        }

        if a > FILLER_CODE || b > FILLER_CODE {
            debug!("af: unhandled AF pair: {}, {}", a, b);
            return;
        }

        let idx = self.current_or_new();
        if !self.lists[idx].add_pair(a, b) {
            debug!("af: pair {}, {} does not fit a method B list; new list", a, b);
            self.lists.push(AfList::new(None));
            let idx = self.lists.len() - 1;
            self.current = Some(idx);
            self.lists[idx].add_pair(a, b);
        }
    }

    fn current_or_new(&mut self) -> usize {
        match self.current {
            Some(idx) => idx,
            None => {
                self.lists.push(AfList::new(None));
                let idx = self.lists.len() - 1;
                self.current = Some(idx);
                idx
            }
        }
    }
}

/// AF information about another network
///
/// EON carries AFs either as a plain list (which may or may
/// not include a list-length indicator) or as *mapped*
/// frequencies, which tie one of our frequencies to one of
/// theirs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MappedAfs {
    afs: BTreeSet<u16>,
    mapped: BTreeMap<u16, BTreeSet<u16>>,
}

impl MappedAfs {
    /// Nothing received
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an AF pair, skipping a list length indicator
    pub fn add_pair(&mut self, a: u8, b: u8) {
        if !is_list_length_indicator(a) {
            self.afs.extend(channel_to_freq(a));
        }
        self.afs.extend(channel_to_freq(b));
    }

    /// Map `channel`, on the tuned network, to `mapped`
    pub fn add_mapped(&mut self, channel: u8, mapped: u8) {
        if let (Some(freq), Some(mapped)) = (channel_to_freq(channel), channel_to_freq(mapped)) {
            self.mapped.entry(freq).or_default().insert(mapped);
        }
    }

    /// Unmapped alternate frequencies
    pub fn frequencies(&self) -> &BTreeSet<u16> {
        &self.afs
    }

    /// Mapped frequencies, keyed by tuned-network frequency
    pub fn mapped(&self) -> &BTreeMap<u16, BTreeSet<u16>> {
        &self.mapped
    }
}

impl fmt::Display for MappedAfs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.mapped.is_empty() {
            let all: Vec<String> = self.afs.iter().map(|af| format_freq(*af)).collect();
            return f.write_str(&all.join(" "));
        }

        f.write_str("Mapped:")?;
        for (freq, set) in self.mapped.iter() {
            let all: Vec<String> = set.iter().map(|af| format_freq(*af)).collect();
            write!(f, " [{} -> {}]", format_freq(*freq), all.join(", "))?;
        }
        Ok(())
    }
}
