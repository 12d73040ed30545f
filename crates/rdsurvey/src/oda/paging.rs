//! Radio paging in group 7A

use std::fmt;

#[cfg(not(test))]
use log::debug;
#[cfg(test)]
use std::println as debug;

use crate::group::{Group, GroupType, GroupVersion};
use crate::station::charset::to_char;

/// Transmitter network group designators, from group 1A
pub const RP_TNGD: [&str; 8] = [
    "No RP",
    "RP groups 00-99",
    "RP groups 00-39",
    "RP groups 40-99",
    "RP groups 40-69",
    "RP groups 70-99",
    "RP groups 00-19",
    "RP groups 20-39",
];

/// Kind of paging call
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum PagingKind {
    /// Text message of up to 80 characters
    #[strum(serialize = "alpha")]
    Alpha,

    /// Ten-digit numeric message
    #[strum(serialize = "10-digit")]
    Numeric10,

    /// 18- or 15-digit numeric message
    #[strum(serialize = "18/15-digit")]
    Numeric18,

    /// Tone only
    #[strum(serialize = "beep")]
    Beep,
}

/// A paging call
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PagingMessage {
    kind: PagingKind,
    address: Option<String>,
    contents: String,
    complete: bool,
    bit_time: u64,
}

impl PagingMessage {
    fn new(kind: PagingKind, address: Option<String>, bit_time: u64) -> Self {
        Self {
            kind,
            address,
            contents: String::new(),
            complete: false,
            bit_time,
        }
    }

    /// Kind of call
    pub fn kind(&self) -> PagingKind {
        self.kind
    }

    /// Pager address, like `12/3456`
    ///
    /// `None` if the group carrying the address was missed.
    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    /// Message text
    ///
    /// Missed parts of alpha messages read `????`.
    pub fn contents(&self) -> &str {
        &self.contents
    }

    /// True once the last part has been received
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Bit time of the first group of the call
    pub fn bit_time(&self) -> u64 {
        self.bit_time
    }
}

impl fmt::Display for PagingMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to {}: \"{}\"",
            self.kind,
            self.address.as_deref().unwrap_or("Unknown"),
            self.contents
        )
    }
}

/// Radio paging decoder
///
/// Paging is announced by group 1A, which also carries the
/// battery-saving interval synchronization. Calls are sent
/// in group 7A. Each group carries a six-digit pager address
/// or a fragment of a message, selected by the low bits of
/// block B.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Paging {
    network: &'static str,
    messages: Vec<PagingMessage>,
    current: Option<usize>,
    last_part: u8,
    interval: Option<u8>,
    operator: Option<u16>,
}

impl Paging {
    /// Number of battery-saving intervals in a minute
    pub const INTERVALS: u8 = 10;

    /// New decoder for the given network group designator
    pub fn new(tngd: u8) -> Self {
        Self {
            network: RP_TNGD[(tngd & 7) as usize],
            messages: Vec::new(),
            current: None,
            last_part: 0,
            interval: None,
            operator: None,
        }
    }

    /// Network group designation, like `RP groups 00-99`
    pub fn network(&self) -> &'static str {
        self.network
    }

    /// Every call received, oldest first
    pub fn messages(&self) -> &[PagingMessage] {
        &self.messages
    }

    /// Current battery-saving interval, 0 to 9
    ///
    /// Unknown until the first full minute.
    pub fn interval(&self) -> Option<u8> {
        self.interval
    }

    /// Enhanced paging operator code, from group 1A
    pub fn operator(&self) -> Option<u16> {
        self.operator
    }

    /// Receive the interval bits of group 1A
    ///
    /// The `sync` bit marks the start of a new interval.
    pub fn sync_info(&mut self, sync: u8, id: u8) {
        if sync & 1 == 1 {
            self.interval = self.interval.map(|i| (i + 1) % Self::INTERVALS);
        }
        debug!(
            "paging: sync={} id={} interval={:?}",
            sync & 1,
            id & 1,
            self.interval
        );
    }

    /// Mark the start of a minute, from group 4A
    pub fn full_minute(&mut self) {
        self.interval = Some(0);
    }

    pub(crate) fn set_operator(&mut self, code: u16) {
        if code != 0 {
            self.operator = Some(code);
        }
    }

    /// Decode one group
    ///
    /// Only group 7A is decoded, and only with blocks C and
    /// D present.
    pub fn receive_group(&mut self, group: &Group) {
        if group.group_type() != Some(GroupType::new(7, GroupVersion::A)) {
            return;
        }
        let (b1, b2, b3) = match (group.block(1), group.block(2), group.block(3)) {
            (Some(b1), Some(b2), Some(b3)) => (b1, b2, b3),
            _ => return,
        };

        let address = format!(
            "{}{}/{}{}{}{}",
            bcd_digit(b2, 3),
            bcd_digit(b2, 2),
            bcd_digit(b2, 1),
            bcd_digit(b2, 0),
            bcd_digit(b3, 3),
            bcd_digit(b3, 2)
        );
        let bit_time = group.bit_time();
        debug!("paging: flag={}", if (b1 >> 5) & 1 == 0 { 'A' } else { 'B' });

        if b1 & 0x8 == 0x8 {
            let part = (b1 & 0x7) as u8;
            if part == 0 {
                self.start(PagingMessage::new(PagingKind::Alpha, Some(address), bit_time));
                self.last_part = 0;
            } else {
                if self.current_kind() != Some(PagingKind::Alpha) {
                    // address group was missed
                    self.start(PagingMessage::new(PagingKind::Alpha, None, bit_time));
                    self.last_part = 0;
                }

                if part != 7 {
                    self.last_part = next_part(self.last_part);
                    while self.last_part != part {
                        self.append("????");
                        self.last_part = next_part(self.last_part);
                    }
                }

                let text: String = [b2, b3]
                    .iter()
                    .flat_map(|b| [to_char((b >> 8) as u8), to_char(*b as u8)])
                    .collect();
                debug!("paging: alpha part {}: \"{}\"", part, text);
                self.append(&text);

                if part == 7 {
                    self.finish();
                }
            }
        } else if b1 & 0xc == 0x4 {
            debug!("paging: 18/15-digit call to {}", address);
            self.start(PagingMessage::new(
                PagingKind::Numeric18,
                Some(address),
                bit_time,
            ));
            self.finish();
        } else if b1 & 0xe == 0x2 {
            if b1 & 1 == 0 {
                let digits: String = [bcd_digit(b3, 1), bcd_digit(b3, 0)].iter().collect();
                debug!("paging: 10-digit call to {}, {}...", address, digits);
                self.start(PagingMessage::new(
                    PagingKind::Numeric10,
                    Some(address),
                    bit_time,
                ));
                self.append(&digits);
            } else {
                let digits = bcd_word(b2) + &bcd_word(b3);
                debug!("paging: 10-digit call ...{}", digits);
                if self.current_kind() != Some(PagingKind::Numeric10) {
                    self.start(PagingMessage::new(PagingKind::Numeric10, None, bit_time));
                    self.append("...");
                }
                self.append(&digits);
                self.finish();
            }
        } else if b1 & 0xf == 0x1 {
            debug!("paging: part of function");
        } else if b1 & 0xf == 0 {
            debug!("paging: beep to {}", address);
            self.start(PagingMessage::new(PagingKind::Beep, Some(address), bit_time));
            self.finish();
        }
    }

    fn current_kind(&self) -> Option<PagingKind> {
        self.current.map(|i| self.messages[i].kind)
    }

    fn start(&mut self, msg: PagingMessage) {
        self.messages.push(msg);
        self.current = Some(self.messages.len() - 1);
    }

    fn append(&mut self, text: &str) {
        if let Some(i) = self.current {
            self.messages[i].contents.push_str(text);
        }
    }

    fn finish(&mut self) {
        if let Some(i) = self.current.take() {
            self.messages[i].complete = true;
        }
    }
}

impl fmt::Display for Paging {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {} calls", self.network, self.messages.len())
    }
}

// alpha parts run 1 to 6 and wrap
fn next_part(part: u8) -> u8 {
    if part >= 6 {
        1
    } else {
        part + 1
    }
}

fn bcd_digit(word: u16, pos: u32) -> char {
    match (word >> (pos * 4)) & 0xf {
        v @ 0..=9 => (b'0' + v as u8) as char,
        10 => ' ',
        _ => '!',
    }
}

fn bcd_word(word: u16) -> String {
    (0..4).rev().map(|pos| bcd_digit(word, pos)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rp(b1: u16, b2: u16, b3: u16) -> Group {
        Group::from_words([0xf202, 0x7000 | b1, b2, b3], 0)
    }

    #[test]
    fn test_bcd() {
        assert_eq!("12 !", bcd_word(0x12af));
    }

    #[test]
    fn test_alpha() {
        let mut rp_dec = Paging::new(1);
        assert_eq!("RP groups 00-99", rp_dec.network());

        rp_dec.receive_group(&rp(0x8, 0x1234, 0x5600));
        rp_dec.receive_group(&rp(0x9, 0x4845, 0x4c4c));
        // part 2 missed
        rp_dec.receive_group(&rp(0xb, 0x4f21, 0x2020));
        rp_dec.receive_group(&rp(0xf, 0x2020, 0x2020));

        let msgs = rp_dec.messages();
        assert_eq!(1, msgs.len());
        assert_eq!(PagingKind::Alpha, msgs[0].kind());
        assert_eq!(Some("12/3456"), msgs[0].address());
        assert_eq!("HELL????O!      ", msgs[0].contents());
        assert!(msgs[0].is_complete());
    }

    #[test]
    fn test_alpha_missed_address() {
        let mut rp_dec = Paging::new(1);
        rp_dec.receive_group(&rp(0x9, 0x4142, 0x4344));
        assert_eq!(None, rp_dec.messages()[0].address());
        assert_eq!("ABCD", rp_dec.messages()[0].contents());
        assert!(!rp_dec.messages()[0].is_complete());
    }

    #[test]
    fn test_numeric_and_beep() {
        let mut rp_dec = Paging::new(2);
        rp_dec.receive_group(&rp(0x2, 0x0123, 0x4598));
        rp_dec.receive_group(&rp(0x3, 0x7654, 0x3210));
        rp_dec.receive_group(&rp(0x0, 0x9876, 0x5400));

        let msgs = rp_dec.messages();
        assert_eq!(2, msgs.len());
        assert_eq!(PagingKind::Numeric10, msgs[0].kind());
        assert_eq!(Some("01/2345"), msgs[0].address());
        assert_eq!("9876543210", msgs[0].contents());
        assert!(msgs[0].is_complete());
        assert_eq!(PagingKind::Beep, msgs[1].kind());
        assert_eq!("beep to 98/7654: \"\"", msgs[1].to_string());
    }

    #[test]
    fn test_intervals() {
        let mut rp_dec = Paging::new(1);
        rp_dec.sync_info(1, 0);
        assert_eq!(None, rp_dec.interval());
        rp_dec.full_minute();
        for _ in 0..11 {
            rp_dec.sync_info(1, 0);
        }
        rp_dec.sync_info(0, 1);
        assert_eq!(Some(1), rp_dec.interval());
    }
}
