//! TMC/Alert-C traffic messages
//!
//! Alert-C is carried in the group announced for AID
//! `0xCD46`, normally 8A. Each group is one of
//!
//! * a *single-group* message, complete in itself;
//! * the *first group* of a multi-group message, which
//!   carries the same fields as a single-group message;
//! * a *continuation* of a multi-group message, which
//!   carries 28 free-format bits of labelled fields; or
//! * *tuning information*, which names the service provider
//!   and other networks carrying the same service.
//!
//! System information, such as the location table number,
//! arrives in the ODA announcement group 3A.
//!
//! Continuations must arrive in sequence. A continuation
//! which is out of sequence is ignored, and one with the
//! wrong continuity index abandons the pending message.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use lazy_static::lazy_static;

#[cfg(not(test))]
use log::{debug, info, warn};
#[cfg(test)]
use std::{println as debug, println as info, println as warn};

use crate::group::{Group, GroupType, GroupVersion};
use crate::station::charset::to_char;
use crate::station::MappedAfs;
use crate::tmc::{Bitstream, TmcDatabase, TmcMessage, LABEL_SIZES};

/// Application ID of Alert-C
pub const ALERT_C_AID: u16 = 0xcd46;

const GAP_GROUPS: [u8; 4] = [3, 5, 8, 11];
const TA_SECONDS: [u8; 4] = [1, 2, 4, 8];
const TW_SECONDS: [u8; 4] = [1, 2, 4, 8];
const TD_SECONDS: [u8; 4] = [0, 1, 2, 3];

lazy_static! {
    static ref NO_DATABASE: TmcDatabase = TmcDatabase::new();
}

/// Format a message geographical scope
///
/// The four scope bits are International, National,
/// Regional, and Urban.
///
/// ```
/// use rdsurvey::oda::decode_mgs;
///
/// assert_eq!("INU", decode_mgs(0b1101));
/// assert_eq!("", decode_mgs(0));
/// ```
pub fn decode_mgs(mgs: u8) -> String {
    [(8, 'I'), (4, 'N'), (2, 'R'), (1, 'U')]
        .iter()
        .filter(|(bit, _)| mgs & bit != 0)
        .map(|(_, c)| *c)
        .collect()
}

/// Alert-C system information
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SystemInfo {
    /// Location table number
    pub ltn: Option<u8>,

    /// Alternative frequency indicator: other networks carry
    /// the same service
    pub afi: bool,

    /// Enhanced mode, with the timing parameters below
    pub enhanced_mode: bool,

    /// Message geographical scope
    pub mgs: Option<u8>,

    /// Service identifier
    pub sid: Option<u8>,

    /// Minimum gap between Alert-C groups, in groups
    pub gap: Option<u8>,

    /// Enhanced mode timing, in seconds
    pub ta: Option<u8>,
    pub tw: Option<u8>,
    pub td: Option<u8>,
}

impl fmt::Display for SystemInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ltn {
            Some(ltn) => write!(f, "LTN={}", ltn)?,
            None => f.write_str("LTN=?")?,
        }
        write!(
            f,
            ", AFI={}, Mode={}, MGS={}",
            self.afi as u8,
            self.enhanced_mode as u8,
            self.mgs.map(decode_mgs).unwrap_or_default()
        )?;
        if let Some(sid) = self.sid {
            write!(f, ", SID={}", sid)?;
        }
        if let Some(gap) = self.gap {
            write!(f, ", gap={} groups", gap)?;
        }
        if let (true, Some(ta), Some(tw), Some(td)) = (self.enhanced_mode, self.ta, self.tw, self.td)
        {
            write!(f, ", Ta={}s, Tw={}s, Td={}s", ta, tw, td)?;
        }
        Ok(())
    }
}

/// Another network named by tuning information
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TmcOtherNetwork {
    pi: u16,
    afs: MappedAfs,
    ltn: Option<u8>,
    mgs: Option<u8>,
    sid: Option<u8>,
}

impl TmcOtherNetwork {
    /// New record for PI `pi`
    pub fn new(pi: u16) -> Self {
        Self {
            pi,
            afs: MappedAfs::new(),
            ltn: None,
            mgs: None,
            sid: None,
        }
    }

    /// Programme identification
    pub fn pi(&self) -> u16 {
        self.pi
    }

    /// Frequencies carrying the service
    pub fn afs(&self) -> &MappedAfs {
        &self.afs
    }

    /// Location table number, if it differs from ours
    pub fn ltn(&self) -> Option<u8> {
        self.ltn
    }

    /// Geographical scope, if it differs from ours
    pub fn mgs(&self) -> Option<u8> {
        self.mgs
    }

    /// Service identifier, if it differs from ours
    pub fn sid(&self) -> Option<u8> {
        self.sid
    }
}

impl fmt::Display for TmcOtherNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ON.PI={:04X} {}", self.pi, self.afs)?;
        if let (Some(ltn), Some(mgs), Some(sid)) = (self.ltn, self.mgs, self.sid) {
            write!(f, ", ON.LTN={}, ON.MGS={}, ON.SID={}", ltn, decode_mgs(mgs), sid)?;
        }
        Ok(())
    }
}

/// Alert-C decoder
///
/// Completed messages are kept in a list. Each new message
/// replaces those it [overrides](TmcMessage::overrides), and
/// cancellations remove messages without adding themselves.
///
/// ```
/// use rdsurvey::Group;
/// use rdsurvey::oda::AlertC;
///
/// let mut tmc = AlertC::new(None);
/// // single-group message: event 401 at location 12345
/// tmc.receive_group(&Group::from_words([0xd301, 0x8008, 0x0191, 12345], 0));
/// assert_eq!(1, tmc.messages().len());
/// assert_eq!(401, tmc.messages()[0].events().next().unwrap().info().code());
/// ```
#[derive(Clone, Debug)]
pub struct AlertC {
    database: Option<Arc<TmcDatabase>>,
    cc: u8,
    info: SystemInfo,
    provider: [String; 2],
    others: BTreeMap<u16, TmcOtherNetwork>,
    pending: Option<TmcMessage>,
    continuity: Option<u8>,
    next_group: Option<u8>,
    total_groups: u8,
    bits: Bitstream,
    messages: Vec<TmcMessage>,
    last: Option<TmcMessage>,
}

impl AlertC {
    /// New decoder
    ///
    /// Without a database, events decode as placeholders and
    /// no locations resolve.
    pub fn new(database: Option<Arc<TmcDatabase>>) -> Self {
        Self {
            database,
            cc: 0,
            info: SystemInfo::default(),
            provider: ["????".to_owned(), "????".to_owned()],
            others: BTreeMap::new(),
            pending: None,
            continuity: None,
            next_group: None,
            total_groups: 0,
            bits: Bitstream::new(),
            messages: Vec::new(),
            last: None,
        }
    }

    /// System information received so far
    pub fn system_info(&self) -> &SystemInfo {
        &self.info
    }

    /// Service provider name
    ///
    /// Halves not yet received read `????`.
    pub fn provider_name(&self) -> String {
        format!("{}{}", self.provider[0], self.provider[1])
    }

    /// Other networks, by PI
    pub fn other_networks(&self) -> &BTreeMap<u16, TmcOtherNetwork> {
        &self.others
    }

    /// Current messages
    pub fn messages(&self) -> &[TmcMessage] {
        &self.messages
    }

    /// Multi-group message being received, if any
    pub fn pending(&self) -> Option<&TmcMessage> {
        self.pending.as_ref()
    }

    /// Most recently completed message
    ///
    /// Includes cancellations, which do not appear in
    /// [`messages()`](AlertC::messages).
    pub fn last_message(&self) -> Option<&TmcMessage> {
        self.last.as_ref()
    }

    /// Event and location database
    pub fn database(&self) -> &TmcDatabase {
        database_or_empty(&self.database)
    }

    /// Receive a group
    ///
    /// Accepts group 3A system information and group 8A
    /// messages. Blocks B, C, and D must all be present.
    pub fn receive_group(&mut self, group: &Group) {
        let (b1, b2, b3) = match (group.block(1), group.block(2), group.block(3)) {
            (Some(b1), Some(b2), Some(b3)) => (b1, b2, b3),
            _ => return,
        };
        if let Some(pi) = group.pi() {
            self.cc = (pi >> 12) as u8;
        }

        let group_type = GroupType::from_block_b(b1);
        let completed = if group_type == GroupType::new(3, GroupVersion::A) {
            self.receive_system_info(b2);
            false
        } else if (b1 >> 4) & 1 == 0 {
            self.receive_user_message(b1, b2, b3)
        } else {
            self.receive_tuning_info(b1, b2, b3);
            false
        };

        if completed {
            self.store_pending();
        }
    }

    fn receive_system_info(&mut self, b2: u16) {
        match (b2 >> 14) & 3 {
            0 => {
                self.info.ltn = Some(((b2 >> 6) & 0x3f) as u8);
                self.info.afi = (b2 >> 5) & 1 == 1;
                self.info.enhanced_mode = (b2 >> 4) & 1 == 1;
                self.info.mgs = Some((b2 & 0xf) as u8);
            }
            1 => {
                self.info.gap = Some(GAP_GROUPS[((b2 >> 12) & 3) as usize]);
                self.info.sid = Some(((b2 >> 6) & 0x3f) as u8);
                self.info.ta = Some(TA_SECONDS[((b2 >> 4) & 3) as usize]);
                self.info.tw = Some(TW_SECONDS[((b2 >> 2) & 3) as usize]);
                self.info.td = Some(TD_SECONDS[(b2 & 3) as usize]);
            }
            _ => return,
        }
        debug!("tmc: system information: {}", self.info);
    }

    // returns true if a message was completed
    fn receive_user_message(&mut self, b1: u16, b2: u16, b3: u16) -> bool {
        let events = database_or_empty(&self.database).events();

        if b1 & 0x8 != 0 {
            let duration = (b1 & 0x7) as u32;
            let diversion = (b2 >> 15) & 1 == 1;
            let mut msg = TmcMessage::new(
                ((b2 >> 14) & 1) as u8,
                ((b2 >> 11) & 0x7) as u32,
                b2 & 0x7ff,
                b3,
                self.cc,
                self.info.ltn,
                events,
            );
            msg.set_single_group_fields(diversion, duration);
            debug!("tmc: single-group message");

            self.pending = Some(msg);
            self.continuity = None;
            self.next_group = None;
            return true;
        }

        let idx = (b1 & 0x7) as u8;
        if idx == 0 || idx == 7 {
            debug!("tmc: non-standard message [CI={}]: {:04X}-{:04X}", idx, b2, b3);
            return false;
        }

        if (b2 >> 15) & 1 == 1 {
            debug!("tmc: first group [CI={}]", idx);
            self.pending = Some(TmcMessage::new(
                ((b2 >> 14) & 1) as u8,
                ((b2 >> 11) & 0x7) as u32,
                b2 & 0x7ff,
                b3,
                self.cc,
                self.info.ltn,
                events,
            ));
            self.bits.clear();
            self.continuity = Some(idx);
            self.next_group = Some(2);
            return false;
        }

        let remaining = ((b2 >> 12) & 0x3) as u8;
        if (b2 >> 14) & 1 == 1 {
            self.total_groups = 2 + remaining;
        }
        let group_number = self.total_groups.checked_sub(remaining);

        let expected = match self.next_group {
            Some(n) => n,
            None => {
                debug!("tmc: ignoring continuation [CI={}] without first group", idx);
                return false;
            }
        };

        if self.continuity != Some(idx) {
            warn!(
                "tmc: continuity index {} does not match {:?}; abandoning message",
                idx, self.continuity
            );
            self.pending = None;
            self.continuity = None;
            self.next_group = None;
            return false;
        }

        if group_number != Some(expected) {
            debug!(
                "tmc: ignoring group {:?}/{}, expected {}",
                group_number, self.total_groups, expected
            );
            return false;
        }

        self.next_group = if expected + 1 > self.total_groups {
            None
        } else {
            Some(expected + 1)
        };

        self.bits.push_bits((b2 & 0xfff) as u32, 12);
        self.bits.push_bits(b3 as u32, 16);

        while self.bits.len() >= 4 {
            let label = self.bits.peek(4);
            let size = LABEL_SIZES[label as usize];
            if self.bits.len() < 4 + size {
                break;
            }
            self.bits.take(4);
            let value = self.bits.take(size);
            if label == 0 && value == 0 {
                debug!("tmc: end of message");
                break;
            }
            debug!("tmc: label {} -> {}", label, value);
            if let Some(msg) = self.pending.as_mut() {
                msg.add_field(label, value, events);
            }
        }

        remaining == 0
    }

    fn receive_tuning_info(&mut self, b1: u16, b2: u16, b3: u16) {
        let addr = b1 & 0xf;
        match addr {
            4 | 5 => {
                let half: String = [b2 >> 8, b2, b3 >> 8, b3]
                    .iter()
                    .map(|c| to_char(*c as u8))
                    .collect();
                debug!("tmc: provider name [{}] = \"{}\"", addr - 4, half);
                self.provider[(addr - 4) as usize] = half;
            }
            6 => {
                let on = self.other_mut(b3);
                on.afs.add_pair((b2 >> 8) as u8, b2 as u8);
                debug!("tmc: other network {}", on);
            }
            7 => {
                let on = self.other_mut(b3);
                on.afs.add_mapped((b2 >> 8) as u8, b2 as u8);
                debug!("tmc: other network {}", on);
            }
            8 => {
                debug!("tmc: other networks ON.PI={:04X}, ON.PI={:04X}", b2, b3);
                self.other_mut(b2);
                self.other_mut(b3);
            }
            9 => {
                let on = self.other_mut(b3);
                on.ltn = Some(((b2 >> 10) & 0x3f) as u8);
                on.mgs = Some(((b2 >> 6) & 0xf) as u8);
                on.sid = Some((b2 & 0x3f) as u8);
                debug!("tmc: other network {}", on);
            }
            _ => debug!("tmc: tuning information addr={}", addr),
        }
    }

    fn other_mut(&mut self, pi: u16) -> &mut TmcOtherNetwork {
        self.others
            .entry(pi)
            .or_insert_with(|| TmcOtherNetwork::new(pi))
    }

    fn store_pending(&mut self) {
        let mut msg = match self.pending.take() {
            Some(msg) => msg,
            None => return,
        };
        msg.finish();
        msg.resolve(database_or_empty(&self.database).locations());

        let mut old_updates = 0;
        self.messages.retain(|m| {
            if msg.overrides(m) {
                old_updates = m.update_count();
                false
            } else {
                true
            }
        });
        msg.set_update_count(old_updates + 1);

        info!(
            "tmc: message at location {}: {}",
            msg.location(),
            msg.events()
                .map(|e| e.text())
                .collect::<Vec<String>>()
                .join("; ")
        );

        if !msg.is_cancellation() {
            self.messages.push(msg.clone());
        }
        self.last = Some(msg);
    }
}

impl fmt::Display for AlertC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "provider \"{}\", {}, {} messages",
            self.provider_name(),
            self.info,
            self.messages.len()
        )
    }
}

fn database_or_empty(database: &Option<Arc<TmcDatabase>>) -> &TmcDatabase {
    database.as_deref().unwrap_or(&NO_DATABASE)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::tmc::{sample_table, EventTable, Table};

    const PI: u16 = 0xd301;

    fn database() -> Arc<TmcDatabase> {
        let mut events = EventTable::new();
        events.load_events(&Table::parse(
            "EL",
            "CODE;TEXT_Q;TEXT;X;Y;N;Q;T;D;U;C
101;stationary traffic for $Q km;stationary traffic;;;;1;D;1;;1
401;closed;;;;;;L;2;U;5
402;closed ahead;;;;;;L;2;;5
2047;message cancelled;;;;;;D;1;;5
",
        ));
        Arc::new(
            TmcDatabase::new()
                .with_events(events)
                .with_locations(sample_table()),
        )
    }

    fn tmc(b1: u16, b2: u16, b3: u16) -> Group {
        Group::from_words([PI, 0x8000 | b1, b2, b3], 0)
    }

    fn single(dir: u16, extent: u16, event: u16, location: u16) -> Group {
        tmc(0x8, (dir << 14) | (extent << 11) | event, location)
    }

    // LTN 1, all scopes
    fn system_info() -> Group {
        Group::from_words([PI, 0x3010, 0x004f, ALERT_C_AID], 0)
    }

    #[test]
    fn test_system_info() {
        let mut dec = AlertC::new(None);
        dec.receive_group(&system_info());
        dec.receive_group(&Group::from_words([PI, 0x3010, 0x5a4e, ALERT_C_AID], 0));

        let info = dec.system_info();
        assert_eq!(Some(1), info.ltn);
        assert!(!info.afi);
        assert!(!info.enhanced_mode);
        assert_eq!(Some(0xf), info.mgs);
        assert_eq!(Some(5), info.gap);
        assert_eq!(Some(0x29), info.sid);
        assert_eq!(Some(1), info.ta);
        assert_eq!(Some(8), info.tw);
        assert_eq!(Some(2), info.td);
    }

    #[test]
    fn test_single_group() {
        let mut dec = AlertC::new(Some(database()));
        dec.receive_group(&system_info());
        dec.receive_group(&tmc(0x8 | 0x3, 0x8000 | (2 << 11) | 401, 301));

        let msg = dec.last_message().expect("message");
        assert!(msg.is_complete());
        assert!(msg.diversion());
        assert_eq!(Some(3), msg.duration());
        assert_eq!(2, msg.extent());
        assert_eq!(0xd, msg.cc());
        assert_eq!(Some(1), msg.ltn());
        assert_eq!(Some(301), msg.primary_location().map(|k| k.lcd));
        assert_eq!(Some(303), msg.secondary_location().map(|k| k.lcd));
        assert_eq!(1, dec.messages().len());
        assert_eq!(1, msg.update_count());
    }

    #[test]
    fn test_multi_group() {
        let mut dec = AlertC::new(Some(database()));
        dec.receive_group(&tmc(0x1, 0x8000 | 101, 302));
        assert_eq!(0, dec.pending().expect("pending").field_count());

        // length 12, speed 16, end of message
        dec.receive_group(&tmc(0x1, 0x4261, 0xc000));
        assert!(dec.pending().is_none());

        let msg = dec.last_message().expect("message");
        assert_eq!(2, msg.field_count());
        assert_eq!(Some(14), msg.information_blocks()[0].length());
        assert_eq!(Some(80), msg.information_blocks()[0].speed());
        assert_eq!(1, dec.messages().len());

        // repeated last group is ignored
        dec.receive_group(&tmc(0x1, 0x4261, 0xc000));
        assert_eq!(1, dec.messages().len());
    }

    #[test]
    fn test_continuation_discard() {
        let mut dec = AlertC::new(Some(database()));
        dec.receive_group(&tmc(0x2, 0x8000 | 101, 302));
        // second of four groups
        dec.receive_group(&tmc(0x2, 0x6261, 0xc000));
        let before = dec.pending().expect("pending").clone();
        assert_eq!(2, before.field_count());

        // claims to be group 4 while 3 is expected
        dec.receive_group(&tmc(0x2, 0x0261, 0xc000));
        assert_eq!(Some(&before), dec.pending());

        dec.receive_group(&tmc(0x2, 0x1000, 0x0000));
        assert_eq!(Some(2), dec.pending().map(|m| m.field_count()));
        assert!(dec.messages().is_empty());

        dec.receive_group(&tmc(0x2, 0x0000, 0x0000));
        assert!(dec.pending().is_none());
        assert_eq!(1, dec.messages().len());
        assert_eq!(2, dec.messages()[0].field_count());
    }

    #[test]
    fn test_continuity_index_mismatch() {
        let mut dec = AlertC::new(None);
        dec.receive_group(&tmc(0x1, 0x8000 | 101, 302));
        dec.receive_group(&tmc(0x3, 0x4261, 0xc000));
        assert!(dec.pending().is_none());
        assert!(dec.last_message().is_none());

        // without a first group
        dec.receive_group(&tmc(0x3, 0x4261, 0xc000));
        assert!(dec.last_message().is_none());
    }

    #[test]
    fn test_override_and_cancel() {
        let mut dec = AlertC::new(Some(database()));
        dec.receive_group(&system_info());
        dec.receive_group(&single(0, 0, 401, 302));
        dec.receive_group(&single(0, 0, 101, 302));
        assert_eq!(2, dec.messages().len());

        dec.receive_group(&single(0, 0, 402, 302));
        assert_eq!(2, dec.messages().len());
        assert_eq!(402, dec.messages()[1].events().next().expect("event").info().code());
        assert_eq!(2, dec.messages()[1].update_count());

        dec.receive_group(&single(0, 0, 2047, 302));
        assert_eq!(1, dec.messages().len());
        assert_eq!(101, dec.messages()[0].events().next().expect("event").info().code());
        assert_eq!(3, dec.last_message().expect("cancel").update_count());
    }

    #[test]
    fn test_tuning_info() {
        let mut dec = AlertC::new(None);
        dec.receive_group(&tmc(0x14, 0x5445, 0x5354));
        assert_eq!("TEST????", dec.provider_name());
        dec.receive_group(&tmc(0x15, 0x2046, 0x4d20));
        assert_eq!("TEST FM ", dec.provider_name());

        dec.receive_group(&tmc(0x16, 0x0510, 0xd302));
        dec.receive_group(&tmc(0x19, (2 << 10) | (0x8 << 6) | 7, 0xd302));
        dec.receive_group(&tmc(0x18, 0xd303, 0xd304));

        let ons = dec.other_networks();
        assert_eq!(3, ons.len());
        let on = &ons[&0xd302];
        assert_eq!(Some(2), on.ltn());
        assert_eq!(Some(7), on.sid());
        assert_eq!(2, on.afs().frequencies().len());
        assert!(ons.contains_key(&0xd303));
    }
}
