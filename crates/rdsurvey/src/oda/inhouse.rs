//! In-house data in group 6

use std::collections::HashMap;
use std::fmt;

#[cfg(not(test))]
use log::debug;
#[cfg(test)]
use std::println as debug;

use crate::group::Group;
use crate::station::charset::to_char;

/// One distinct in-house payload
///
/// The five free bits of block B and all of blocks C and D.
/// Displays as hex words followed by a character rendering,
/// with control codes shown as `.`:
///
/// ```
/// use rdsurvey::oda::InHouseData;
///
/// let data = InHouseData::new(0x1f, 0x4142, 0x0143);
/// assert_eq!("1F/4142-0143 (AB.C)", data.to_string());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct InHouseData {
    pub w1: u8,
    pub w2: u16,
    pub w3: u16,
}

impl InHouseData {
    /// New payload; only the low five bits of `w1` are kept
    pub fn new(w1: u8, w2: u16, w3: u16) -> Self {
        Self {
            w1: w1 & 0x1f,
            w2,
            w3,
        }
    }

    /// Four-character rendering of blocks C and D
    pub fn text(&self) -> String {
        [self.w2 >> 8, self.w2 & 0xff, self.w3 >> 8, self.w3 & 0xff]
            .iter()
            .map(|c| if *c >= 32 { to_char(*c as u8) } else { '.' })
            .collect()
    }
}

impl fmt::Display for InHouseData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02X}/{:04X}-{:04X} ({})",
            self.w1,
            self.w2,
            self.w3,
            self.text()
        )
    }
}

/// Collects in-house payloads with occurrence counts
///
/// Payloads are kept in order of first reception.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InHouse {
    seen: Vec<(InHouseData, u32)>,
    index: HashMap<InHouseData, usize>,
}

impl InHouse {
    /// Nothing received
    pub fn new() -> Self {
        Self::default()
    }

    /// Distinct payloads with the number of times each was seen
    pub fn messages(&self) -> &[(InHouseData, u32)] {
        &self.seen
    }

    /// Receive one group
    ///
    /// Blocks B, C, and D must all be present.
    pub fn receive_group(&mut self, group: &Group) {
        let data = match (group.block(1), group.block(2), group.block(3)) {
            (Some(b1), Some(b2), Some(b3)) => InHouseData::new(b1 as u8, b2, b3),
            _ => return,
        };
        debug!("in-house: {}", data);

        match self.index.get(&data) {
            Some(i) => self.seen[*i].1 += 1,
            None => {
                self.index.insert(data, self.seen.len());
                self.seen.push((data, 1));
            }
        }
    }
}

impl fmt::Display for InHouse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} distinct messages", self.seen.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts() {
        let mut ih = InHouse::new();
        let g = Group::from_words([0xf202, 0x6025, 0x4142, 0x4344], 0);
        ih.receive_group(&g);
        ih.receive_group(&g);
        ih.receive_group(&Group::from_words([0xf202, 0x6026, 0x4142, 0x4344], 0));
        ih.receive_group(&Group::new([Some(0xf202), Some(0x6025), None, Some(0x4344)], 0));

        let msgs = ih.messages();
        assert_eq!(2, msgs.len());
        assert_eq!(2, msgs[0].1);
        assert_eq!(0x05, msgs[0].0.w1);
        assert_eq!("ABCD", msgs[0].0.text());
        assert_eq!(1, msgs[1].1);
    }
}
