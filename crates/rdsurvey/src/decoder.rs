//! Group-level decoding

pub mod clock;

use std::sync::Arc;

use arraydeque::ArrayDeque;
use arrayvec::ArrayVec;

#[cfg(not(test))]
use log::{debug, info, warn};

#[cfg(test)]
use std::println as debug;
#[cfg(test)]
use std::println as info;
#[cfg(test)]
use std::println as warn;

pub use clock::ClockTime;

use crate::group::{Group, GroupType, GroupVersion};
use crate::oda::{Application, Paging, ALERT_C_AID};
use crate::receiver::LogEvent;
use crate::station::charset::{block_chars, language};
use crate::station::{Pin, Station, StationWatch};
use crate::tmc::TmcDatabase;

/// Groups remembered for the signal quality estimate
const QUALITY_GROUPS: usize = 40;

/// Events caused by one group
///
/// No group causes more than a handful of events.
pub type GroupEvents = ArrayVec<LogEvent, 4>;

const GROUP_7A: GroupType = GroupType::new(7, GroupVersion::A);
const GROUP_8A: GroupType = GroupType::new(8, GroupVersion::A);

/// Group-level decoder
///
/// The `GroupDecoder` accepts framed groups with
/// [`process_group()`](GroupDecoder::process_group) and
/// accumulates what they carry into a [`Station`].
///
/// The station is identified by its PI code. A group with a
/// different PI is ignored unless more than `pi_tolerance`
/// such groups arrive in a row, in which case the old
/// station is lost and a new one is tuned.
///
/// After synchronization is lost, groups are not decoded
/// until a PI matching the tuned station is seen again.
///
/// Every field is gated on the validity of the blocks which
/// carry it. A partial group updates what it can.
#[derive(Debug)]
pub struct GroupDecoder {
    station: Option<Station>,
    synced: bool,
    bad_pi_count: u32,
    pi_tolerance: u32,
    rbds: bool,
    database: Option<Arc<TmcDatabase>>,
    quality: ArrayDeque<u8, QUALITY_GROUPS, arraydeque::Wrapping>,
    watches: Vec<StationWatch>,
}

impl GroupDecoder {
    /// New decoder
    ///
    /// If `rbds` is set, programme types are labelled for
    /// North America. The TMC `database`, if any, is shared
    /// with every Alert-C application.
    pub fn new(pi_tolerance: u32, rbds: bool, database: Option<Arc<TmcDatabase>>) -> Self {
        Self {
            station: None,
            synced: false,
            bad_pi_count: 0,
            pi_tolerance,
            rbds,
            database,
            quality: ArrayDeque::new(),
            watches: Vec::new(),
        }
    }

    /// Reset to zero initial conditions
    ///
    /// The tuned station is forgotten. Subscribers are kept
    /// and see no station.
    pub fn reset(&mut self) {
        self.station = None;
        self.synced = false;
        self.bad_pi_count = 0;
        self.quality.clear();
        self.publish();
    }

    /// The tuned station, if any
    pub fn station(&self) -> Option<&Station> {
        self.station.as_ref()
    }

    /// Signal quality, from 0.0 to 1.0
    ///
    /// The fraction of valid blocks in the last 40 groups.
    /// Groups which were never received count as invalid.
    pub fn quality(&self) -> f32 {
        let ok: u32 = self.quality.iter().map(|n| *n as u32).sum();
        ok as f32 / (4 * QUALITY_GROUPS) as f32
    }

    /// Subscribe to station updates
    ///
    /// The returned watch holds a snapshot of the tuned station
    /// which is refreshed after every group. It may be read
    /// from any thread.
    pub fn subscribe(&mut self) -> StationWatch {
        let watch = StationWatch::default();
        if let Ok(mut slot) = watch.write() {
            *slot = self.station.clone();
        }
        self.watches.push(watch.clone());
        watch
    }

    /// Notify the decoder that synchronization was lost
    ///
    /// Further groups are not decoded until the PI of the
    /// tuned station is received again.
    pub fn lose_sync(&mut self) {
        if self.synced {
            debug!("decoder: suppressing groups until PI is confirmed");
        }
        self.synced = false;
    }

    /// End of input
    ///
    /// Returns the loss of the tuned station, if there is one.
    /// The station's data remains available.
    pub fn finish(&mut self) -> Option<LogEvent> {
        self.synced = false;
        self.station.as_ref().map(|st| {
            info!("decoder: end of input, station {:04X} lost", st.pi());
            LogEvent::StationLost { pi: st.pi() }
        })
    }

    /// Decode one group
    ///
    /// Returns the events which the group caused.
    pub fn process_group(&mut self, group: &Group) -> GroupEvents {
        let mut events = GroupEvents::new();
        self.quality.push_back(group.valid_count() as u8);

        let accepted = match group.pi() {
            Some(pi) => self.process_pi(pi, group.bit_time(), &mut events),
            None => true,
        };

        if self.synced && accepted {
            if let Some(station) = self.station.as_mut() {
                decode_fields(station, group, self.database.as_ref(), &mut events);
            }
        }

        self.publish();
        events
    }

    // false if the group belongs to a PI glitch and must be skipped
    fn process_pi(&mut self, pi: u16, bit_time: u64, events: &mut GroupEvents) -> bool {
        match self.station.as_mut() {
            None => {
                info!("decoder: station {:04X} tuned", pi);
                self.station = Some(Station::new(pi, bit_time, self.rbds));
                self.bad_pi_count = 0;
                self.synced = true;
                events.push(LogEvent::StationTuned { pi });
                true
            }
            Some(station) if station.pi() == pi => {
                station.ping_pi(bit_time);
                self.bad_pi_count = 0;
                self.synced = true;
                true
            }
            Some(station) => {
                self.bad_pi_count += 1;
                if self.bad_pi_count > self.pi_tolerance {
                    info!(
                        "decoder: station {:04X} lost, {:04X} tuned",
                        station.pi(),
                        pi
                    );
                    events.push(LogEvent::StationLost { pi: station.pi() });
                    events.push(LogEvent::StationTuned { pi });
                    self.station = Some(Station::new(pi, bit_time, self.rbds));
                    self.bad_pi_count = 0;
                    self.synced = true;
                    true
                } else {
                    debug!(
                        "decoder: ignoring PI {:04X} ({} of {})",
                        pi, self.bad_pi_count, self.pi_tolerance
                    );
                    false
                }
            }
        }
    }

    fn publish(&self) {
        for watch in &self.watches {
            if let Ok(mut slot) = watch.write() {
                *slot = self.station.clone();
            }
        }
    }
}

impl Default for GroupDecoder {
    fn default() -> Self {
        Self::new(3, false, None)
    }
}

// field extraction, by group type
fn decode_fields(
    station: &mut Station,
    group: &Group,
    database: Option<&Arc<TmcDatabase>>,
    events: &mut GroupEvents,
) {
    let (b1, gt) = match (group.block(1), group.group_type()) {
        (Some(b1), Some(gt)) => (b1, gt),
        _ => {
            station.add_unknown_group_to_stats(group.valid_count());
            return;
        }
    };
    station.add_group_to_stats(gt, group.valid_count());

    let b2 = group.block(2);
    let b3 = group.block(3);
    let version_a = gt.version() == GroupVersion::A;

    station.info_mut().tp = (b1 >> 10) & 1 == 1;
    station.info_mut().pty = ((b1 >> 5) & 0x1f) as u8;

    match (gt.number(), gt.version()) {
        (0, _) => {
            decode_tuning_bits(station, b1);
            if let Some(b3) = b3 {
                station.info_mut().ps.set_segment((b1 & 3) as usize, block_chars(b3));
            }
            if let (GroupVersion::A, Some(b2)) = (gt.version(), b2) {
                station.afs_mut().add_pair((b2 >> 8) as u8, b2 as u8);
            }
        }
        (1, _) => {
            if version_a {
                decode_paging_info(station, b1);
            }
            if let Some(b3) = b3 {
                station.info_mut().pin = Some(Pin::from(b3));
            }
            if let (GroupVersion::A, Some(b2)) = (gt.version(), b2) {
                decode_slow_labelling(station, b2, database);
            }
        }
        (2, _) => {
            let addr = (b1 & 0xf) as usize;
            let rt = station.rt_mut();
            rt.set_flag(((b1 >> 4) & 1) as u8);
            match (gt.version(), b2, b3) {
                (GroupVersion::A, Some(b2), Some(b3)) => {
                    let [c0, c1] = block_chars(b2);
                    let [c2, c3] = block_chars(b3);
                    rt.set_chars(addr, &[c0, c1, c2, c3]);
                }
                (GroupVersion::A, b2, b3) => {
                    if let Some(b2) = b2 {
                        rt.set_chars(addr * 2, &block_chars(b2));
                    }
                    if let Some(b3) = b3 {
                        rt.set_chars(addr * 2 + 1, &block_chars(b3));
                    }
                }
                (GroupVersion::B, _, Some(b3)) => rt.set_chars(addr, &block_chars(b3)),
                (GroupVersion::B, _, None) => {}
            }
        }
        (3, GroupVersion::A) => {
            if let Some(aid) = b3 {
                let target =
                    GroupType::new(((b1 >> 1) & 0xf) as u8, GroupVersion::from_bit(b1 & 1));
                let app = station.oda_mut().announce(target, aid, database);
                if b2.is_some() {
                    app.receive_group(group);
                }
            }
        }
        (4, GroupVersion::A) => {
            if let (Some(b2), Some(b3)) = (b2, b3) {
                match ClockTime::from_blocks(b1, b2, b3) {
                    Some(ct) => {
                        debug!("decoder: clock time {}", ct);
                        station.set_clock(ct, group.bit_time());
                        if let Some(paging) = station
                            .oda_mut()
                            .get_mut(GROUP_7A)
                            .and_then(Application::as_paging_mut)
                        {
                            paging.full_minute();
                        }
                        events.push(LogEvent::ClockTime(ct));
                    }
                    None => debug!("decoder: invalid clock time {:04X} {:04X}", b2, b3),
                }
            }
        }
        (10, GroupVersion::A) => {
            let pos = (b1 & 1) as usize;
            let ptyn = station.ptyn_mut();
            ptyn.set_flag(((b1 >> 4) & 1) as u8);
            match (b2, b3) {
                (Some(b2), Some(b3)) => {
                    let [c0, c1] = block_chars(b2);
                    let [c2, c3] = block_chars(b3);
                    ptyn.set_chars(pos, &[c0, c1, c2, c3]);
                }
                (b2, b3) => {
                    if let Some(b2) = b2 {
                        ptyn.set_chars(pos * 2, &block_chars(b2));
                    }
                    if let Some(b3) = b3 {
                        ptyn.set_chars(pos * 2 + 1, &block_chars(b3));
                    }
                }
            }
        }
        (14, version) => {
            if let Some(on_pi) = b3 {
                decode_eon(station, version, b1, b2, on_pi, events);
            }
        }
        (15, GroupVersion::A) => {
            let addr = (b1 & 1) as usize;
            if let Some(b2) = b2 {
                station.info_mut().ps.set_segment(addr * 2, block_chars(b2));
            }
            if let Some(b3) = b3 {
                station.info_mut().ps.set_segment(addr * 2 + 1, block_chars(b3));
            }
        }
        (15, GroupVersion::B) => {
            decode_tuning_bits(station, b1);
            if let Some(b3) = b3 {
                decode_tuning_bits(station, b3);
            }
        }
        _ => {
            if gt.number() == 6 {
                station
                    .oda_mut()
                    .route_if_empty(gt, Application::InHouse(Default::default()));
            }
            match station.oda_mut().get_mut(gt) {
                Some(app) => app.receive_group(group),
                None => debug!("decoder: no application for group {}", gt),
            }
        }
    }
}

// TA, music/speech, and DI bits of groups 0 and 15B
fn decode_tuning_bits(station: &mut Station, block: u16) {
    station.info_mut().ta = (block >> 4) & 1 == 1;
    station.set_music((block >> 3) & 1 == 1);
    station.set_di_bit(block & 3, (block >> 2) & 1 == 1);
}

// radio paging descriptor of group 1A
fn decode_paging_info(station: &mut Station, b1: u16) {
    let tngd = ((b1 >> 2) & 7) as u8;
    if tngd == 0 {
        return;
    }
    let bsi = b1 & 3;
    match station
        .oda_mut()
        .route_if_empty(GROUP_7A, Application::Paging(Paging::new(tngd)))
        .as_paging_mut()
    {
        Some(paging) => paging.sync_info(((bsi >> 1) & 1) as u8, (bsi & 1) as u8),
        None => warn!("decoder: paging announced, but group 7A carries another application"),
    }
}

// slow labelling codes of group 1A, block C
fn decode_slow_labelling(station: &mut Station, b2: u16, database: Option<&Arc<TmcDatabase>>) {
    let variant = (b2 >> 12) & 7;
    debug!("decoder: slow labelling variant {}, la={}", variant, b2 >> 15);
    match variant {
        0 => {
            let opc = (b2 >> 8) & 0xf;
            let ecc = (b2 & 0xff) as u8;
            debug!("decoder: OPC={} ECC={:02X}", opc, ecc);
            station.set_ecc(ecc);
        }
        1 => {
            let tmcid = b2 & 0xfff;
            debug!("decoder: TMC identification {:03X}", tmcid);
            let app = station.oda_mut().route_if_empty(
                GROUP_8A,
                Application::for_aid(ALERT_C_AID, database.cloned()),
            );
            if app.as_alert_c().is_none() {
                warn!(
                    "decoder: TMC identified, but group 8A carries {}",
                    app.name()
                );
            }
        }
        2 => {
            if let Some(paging) = station
                .oda_mut()
                .get_mut(GROUP_7A)
                .and_then(Application::as_paging_mut)
            {
                paging.set_operator(b2 & 0xfff);
            }
        }
        3 => {
            let code = (b2 & 0xff) as u8;
            debug!(
                "decoder: language {}",
                language(code).unwrap_or("unknown")
            );
            station.set_language(code);
        }
        6 => debug!("decoder: broadcaster data {:03X}", b2 & 0xfff),
        7 => debug!("decoder: EWS channel {:03X}", b2 & 0xfff),
        _ => {}
    }
}

// enhanced other networks, group 14
fn decode_eon(
    station: &mut Station,
    version: GroupVersion,
    b1: u16,
    b2: Option<u16>,
    on_pi: u16,
    events: &mut GroupEvents,
) {
    let other = station.other_mut(on_pi);
    other.info_mut().tp = (b1 >> 4) & 1 == 1;

    if version == GroupVersion::B {
        let ta = (b1 >> 3) & 1 == 1;
        other.info_mut().ta = ta;
        info!(
            "decoder: EON {} PI={:04X}",
            if ta { "switch to" } else { "return from" },
            on_pi
        );
        events.push(if ta {
            LogEvent::EonSwitch { pi: on_pi }
        } else {
            LogEvent::EonReturn { pi: on_pi }
        });
        return;
    }

    let b2 = match b2 {
        Some(b2) => b2,
        None => return,
    };
    let variant = b1 & 0xf;
    match variant {
        0..=3 => other
            .info_mut()
            .ps
            .set_segment(variant as usize, block_chars(b2)),
        4 => other.afs_mut().add_pair((b2 >> 8) as u8, b2 as u8),
        5..=9 => other.afs_mut().add_mapped((b2 >> 8) as u8, b2 as u8),
        12 => other.info_mut().linkage = Some(b2),
        13 => {
            other.info_mut().pty = ((b2 >> 11) & 0x1f) as u8;
            other.info_mut().ta = b2 & 1 == 1;
        }
        14 => other.info_mut().pin = Some(Pin::from(b2)),
        _ => debug!("decoder: EON variant {} unused", variant),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex(line: &str) -> Group {
        line.parse().expect("bad group")
    }

    fn feed(dec: &mut GroupDecoder, lines: &[&str]) -> Vec<LogEvent> {
        lines
            .iter()
            .flat_map(|l| dec.process_group(&hex(l)))
            .collect()
    }

    #[test]
    fn test_ps_culture() {
        let mut dec = GroupDecoder::default();
        let events = feed(
            &mut dec,
            &[
                "F202 0408 5C66 2043",
                "F202 0409 5C62 554C",
                "F202 040A 1E5C 5455",
                "F202 040F 1C5C 5245",
            ],
        );
        assert_eq!(vec![LogEvent::StationTuned { pi: 0xf202 }], events);

        let st = dec.station().expect("no station");
        assert_eq!(0xf202, st.pi());
        assert_eq!(" CULTURE", st.station_name());
        assert_eq!(4, st.group_count(GroupType::new(0, GroupVersion::A)));
        assert!(!st.afs().lists().is_empty());
        assert!((dec.quality() - 16.0 / 160.0).abs() < 1e-6);
    }

    #[test]
    fn test_pi_debounce() {
        let mut dec = GroupDecoder::new(3, false, None);
        feed(&mut dec, &["F202 0408 5C66 2043"]);

        // a few glitches do not lose the station
        let events = feed(
            &mut dec,
            &[
                "1234 0409 5C62 4142",
                "1234 0409 5C62 4142",
                "F202 0409 5C62 554C",
            ],
        );
        assert!(events.is_empty());
        let ps = dec.station().expect("station").info().ps().text().current();
        assert_eq!(Some(" CUL    ".to_owned()), ps);

        // a persistent change does
        let events = feed(&mut dec, &["1234 0400 0000 0000"; 4]);
        assert_eq!(
            vec![
                LogEvent::StationLost { pi: 0xf202 },
                LogEvent::StationTuned { pi: 0x1234 },
            ],
            events
        );
        assert_eq!(0x1234, dec.station().expect("station").pi());
    }

    #[test]
    fn test_pi_glitch_skips_one_group() {
        let mut dec = GroupDecoder::default();
        feed(&mut dec, &["F202 0408 5C66 2043"]);

        // the glitched group is dropped, but the groups after
        // it are decoded even without a PI
        let events = feed(
            &mut dec,
            &[
                "1234 0409 5C62 4142",
                "---- 0409 5C62 554C",
                "---- 040A 1E5C 5455",
            ],
        );
        assert!(events.is_empty());
        assert_eq!(" CULTU??", dec.station().expect("station").station_name());
    }

    #[test]
    fn test_lose_sync() {
        let mut dec = GroupDecoder::default();
        feed(&mut dec, &["F202 0408 5C66 2043"]);
        dec.lose_sync();

        // no PI: not decoded
        feed(&mut dec, &["---- 0409 5C62 554C"]);
        assert_eq!(" C??????", dec.station().expect("station").station_name());

        // PI confirmed: decoded again
        feed(&mut dec, &["F202 0409 5C62 554C", "---- 040A 1E5C 5455"]);
        assert_eq!(" CULTU??", dec.station().expect("station").station_name());

        assert_eq!(
            Some(LogEvent::StationLost { pi: 0xf202 }),
            dec.finish()
        );
    }

    #[test]
    fn test_radiotext() {
        let mut dec = GroupDecoder::default();
        feed(
            &mut dec,
            &[
                "F202 2400 4355 4C54",
                "F202 2401 5552 4520",
                "F202 2402 0D20 2020",
            ],
        );
        let st = dec.station().expect("station");
        assert_eq!(Some("CULTURE ".to_owned()), st.rt().current());
    }

    #[test]
    fn test_clock_time() {
        let mut dec = GroupDecoder::default();
        let events = feed(&mut dec, &["F202 4001 C60E DB42"]);
        let ct = ClockTime::from_blocks(0x4001, 0xc60e, 0xdb42).expect("ct");
        assert_eq!(
            vec![
                LogEvent::StationTuned { pi: 0xf202 },
                LogEvent::ClockTime(ct)
            ],
            events
        );
        assert_eq!(Some(ct), dec.station().and_then(|s| s.clock()).map(|c| c.0));
    }

    #[test]
    fn test_eon() {
        let mut dec = GroupDecoder::default();
        let events = feed(
            &mut dec,
            &[
                "F202 E400 4142 D301",
                "F202 E401 4344 D301",
                "F202 E40D 6801 D301",
                "F202 EC08 F202 D301",
                "F202 EC00 F202 D301",
            ],
        );
        assert_eq!(
            vec![
                LogEvent::StationTuned { pi: 0xf202 },
                LogEvent::EonSwitch { pi: 0xd301 },
                LogEvent::EonReturn { pi: 0xd301 },
            ],
            events
        );
        let on = dec.station().and_then(|s| s.other(0xd301)).expect("ON");
        assert_eq!("ABCD????", on.info().station_name());
        assert_eq!(13, on.info().pty());
        assert!(!on.info().ta());
    }

    #[test]
    fn test_oda_routing() {
        let mut dec = GroupDecoder::default();
        feed(
            &mut dec,
            &[
                // Alert-C announced for 8A
                "F202 3010 0000 CD46",
                // in-house data, no announcement needed
                "F202 6001 4142 4344",
            ],
        );
        let st = dec.station().expect("station");
        let alert_c = st
            .oda()
            .get(GROUP_8A)
            .and_then(Application::as_alert_c);
        assert!(alert_c.is_some());
        let inhouse = st
            .oda()
            .get(GroupType::new(6, GroupVersion::A))
            .and_then(Application::as_in_house)
            .expect("in-house");
        assert_eq!(1, inhouse.messages().len());
    }

    #[test]
    fn test_paging_and_tmc_identification() {
        let mut dec = GroupDecoder::default();
        feed(
            &mut dec,
            &[
                // tngd=1, TMC identification
                "F202 1004 1123 0000",
                // paging operator code
                "F202 1004 2042 0000",
            ],
        );
        let st = dec.station().expect("station");
        let paging = st
            .oda()
            .get(GROUP_7A)
            .and_then(Application::as_paging)
            .expect("paging");
        assert_eq!("RP groups 00-99", paging.network());
        assert_eq!(Some(0x042), paging.operator());
        assert!(st.oda().alert_c().is_some());
    }

    #[test]
    fn test_subscribe() {
        let mut dec = GroupDecoder::default();
        let watch = dec.subscribe();
        assert!(watch.read().expect("lock").is_none());

        feed(&mut dec, &["F202 0408 5C66 2043"]);
        let snapshot = watch.read().expect("lock");
        assert_eq!(Some(0xf202), snapshot.as_ref().map(Station::pi));
    }
}
