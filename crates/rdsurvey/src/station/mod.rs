//! Long-lived station state
//!
//! A [`Station`] accumulates everything known about the
//! tuned programme. Each group carries only a fragment, so
//! every field is built incrementally and survives missing
//! or corrupt groups.
//!
//! Stations referenced by Enhanced Other Networks (EON)
//! information are kept as [`OtherNetwork`] records inside
//! the tuned station.

pub mod af;
pub mod charset;
mod text;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock};

pub use af::{AfList, AfLists, AfMethod, MappedAfs};
pub use text::Text;

use crate::decoder::ClockTime;
use crate::group::GroupType;
use crate::oda::OdaRegistry;

/// Shared, read-only view of the tuned station
///
/// The decoder publishes a fresh snapshot after each group.
/// Consumers on other threads take the read lock and clone
/// or inspect it. `None` means that no station is tuned.
pub type StationWatch = Arc<RwLock<Option<Station>>>;

/// Number of rows in the group statistics table
///
/// Rows 0 to 15 are group types. Row 16 counts groups whose
/// type could not be read.
pub const STATS_ROWS: usize = 17;

/// Programme Item Number
///
/// The scheduled start of the current programme, as
/// day-of-month, hour, and minute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Pin {
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
}

impl From<u16> for Pin {
    fn from(pin: u16) -> Self {
        Self {
            day: ((pin >> 11) & 0x1f) as u8,
            hour: ((pin >> 6) & 0x1f) as u8,
            minute: (pin & 0x3f) as u8,
        }
    }
}

impl fmt::Display for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "D={}, H={:02}:{:02}", self.day, self.hour, self.minute)
    }
}

/// Programme service name
///
/// PS names arrive two characters at a time, addressed by
/// segment 0 to 3. Two views are kept:
///
/// * a [`Text`], which archives each distinct name and
///   credits it with every segment received for it; and
/// * a *dynamic PS* log, for stations which scroll
///   messages through the PS.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProgramService {
    text: Text,
    page: [Option<[char; 2]>; 4],
    pages: Vec<String>,
}

impl ProgramService {
    /// Number of dynamic PS pages retained
    pub const MAX_PAGES: usize = 10;

    /// No name received
    pub fn new() -> Self {
        Self {
            text: Text::new(8, false),
            page: [None; 4],
            pages: Vec::new(),
        }
    }

    /// Receive two characters for segment `addr`
    pub fn set_segment(&mut self, addr: usize, chars: [char; 2]) {
        let addr = addr & 3;
        if matches!(self.page[addr], Some(prev) if prev != chars) {
            let page = render_segments(&self.page);
            self.pages.push(page);
            if self.pages.len() > Self::MAX_PAGES {
                self.pages.remove(0);
            }
            self.page = [None; 4];
        }
        self.page[addr] = Some(chars);
        self.text.set_chars(addr, &chars);
    }

    /// Best estimate of the station name
    ///
    /// The whole name most often received wins. Until a name
    /// has been received completely, the latest partial name
    /// is returned, with unseen segments shown as `??`.
    pub fn station_name(&self) -> String {
        let best = self.text.most_frequent_text();
        if best.is_empty() {
            render_segments(&self.page)
        } else {
            best
        }
    }

    /// True if no segment has been received
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.text.past_messages(false).is_empty()
    }

    /// Incrementally-received text, with message history
    pub fn text(&self) -> &Text {
        &self.text
    }

    /// Recent PS pages, oldest first, joined by spaces
    ///
    /// Empty unless the station changes its PS.
    pub fn dynamic_text(&self) -> String {
        let pages: Vec<&str> = self.pages.iter().map(|p| p.trim()).collect();
        pages.join(" ")
    }
}

impl Default for ProgramService {
    fn default() -> Self {
        Self::new()
    }
}

fn render_segments(segments: &[Option<[char; 2]>; 4]) -> String {
    let mut out = String::with_capacity(8);
    for seg in segments.iter() {
        match seg {
            Some(chars) => out.extend(chars.iter()),
            None => out.push_str("??"),
        }
    }
    out
}

/// Fields common to the tuned station and other networks
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceInfo {
    pub(crate) pi: u16,
    pub(crate) ps: ProgramService,
    pub(crate) pty: u8,
    pub(crate) tp: bool,
    pub(crate) ta: bool,
    pub(crate) pin: Option<Pin>,
    pub(crate) linkage: Option<u16>,
}

impl ServiceInfo {
    /// New record for the given PI code
    pub fn new(pi: u16) -> Self {
        Self {
            pi,
            ps: ProgramService::new(),
            pty: 0,
            tp: false,
            ta: false,
            pin: None,
            linkage: None,
        }
    }

    /// Programme identification code
    ///
    /// Zero if not yet known.
    pub fn pi(&self) -> u16 {
        self.pi
    }

    /// Programme service name
    pub fn ps(&self) -> &ProgramService {
        &self.ps
    }

    /// Best estimate of the station name
    pub fn station_name(&self) -> String {
        self.ps.station_name()
    }

    /// Programme type code, from 0 to 31
    pub fn pty(&self) -> u8 {
        self.pty
    }

    /// Traffic programme flag
    pub fn tp(&self) -> bool {
        self.tp
    }

    /// Traffic announcement flag
    pub fn ta(&self) -> bool {
        self.ta
    }

    /// Programme item number, if received
    pub fn pin(&self) -> Option<Pin> {
        self.pin
    }

    /// Linkage information, if received
    pub fn linkage(&self) -> Option<u16> {
        self.linkage
    }

    /// Short traffic summary, like `TP + TA`
    pub fn traffic_info(&self) -> &'static str {
        match (self.tp, self.ta) {
            (true, true) => "TP + TA",
            (true, false) => "TP",
            (false, true) => "ON with TP",
            (false, false) => "",
        }
    }
}

/// A network described by EON information
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OtherNetwork {
    info: ServiceInfo,
    afs: MappedAfs,
}

impl OtherNetwork {
    /// New record for the other network `pi`
    pub fn new(pi: u16) -> Self {
        Self {
            info: ServiceInfo::new(pi),
            afs: MappedAfs::new(),
        }
    }

    /// Common service information
    pub fn info(&self) -> &ServiceInfo {
        &self.info
    }

    /// Alternate frequencies
    pub fn afs(&self) -> &MappedAfs {
        &self.afs
    }

    pub(crate) fn info_mut(&mut self) -> &mut ServiceInfo {
        &mut self.info
    }

    pub(crate) fn afs_mut(&mut self) -> &mut MappedAfs {
        &mut self.afs
    }
}

impl fmt::Display for OtherNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PI={:04X} PS*=\"{}\" {}",
            self.info.pi,
            self.info.station_name(),
            self.afs
        )
    }
}

/// The tuned station
///
/// Created by the group decoder when a new PI is confirmed
/// and replaced wholesale when the station changes.
#[derive(Clone, Debug)]
pub struct Station {
    info: ServiceInfo,
    rbds: bool,
    rt: Text,
    ptyn: Text,
    afs: AfLists,
    di: u8,
    music: bool,
    ecc: Option<u8>,
    language: Option<u8>,
    clock: Option<(ClockTime, u64)>,
    others: BTreeMap<u16, OtherNetwork>,
    stats: [[u32; 2]; STATS_ROWS],
    total_blocks: u64,
    total_blocks_ok: u64,
    time_of_last_pi: u64,
    oda: OdaRegistry,
}

impl Station {
    /// New station with the given PI, first seen at `bit_time`
    ///
    /// If `rbds` is set, programme types are labelled with
    /// the North American table.
    pub fn new(pi: u16, bit_time: u64, rbds: bool) -> Self {
        Self {
            info: ServiceInfo::new(pi),
            rbds,
            rt: Text::new(64, true),
            ptyn: Text::new(8, false),
            afs: AfLists::new(),
            di: 0,
            music: false,
            ecc: None,
            language: None,
            clock: None,
            others: BTreeMap::new(),
            stats: [[0; 2]; STATS_ROWS],
            total_blocks: 0,
            total_blocks_ok: 0,
            time_of_last_pi: bit_time,
            oda: OdaRegistry::new(),
        }
    }

    /// Programme identification code
    pub fn pi(&self) -> u16 {
        self.info.pi
    }

    /// Common service information
    pub fn info(&self) -> &ServiceInfo {
        &self.info
    }

    /// Best estimate of the station name
    pub fn station_name(&self) -> String {
        self.info.station_name()
    }

    /// Programme type label
    pub fn pty_label(&self) -> &'static str {
        charset::pty_label(self.info.pty, self.rbds)
    }

    /// Radiotext
    pub fn rt(&self) -> &Text {
        &self.rt
    }

    /// Programme type name
    pub fn ptyn(&self) -> &Text {
        &self.ptyn
    }

    /// Alternate frequency lists
    pub fn afs(&self) -> &AfLists {
        &self.afs
    }

    /// Decoder identification bits
    ///
    /// Bit 0 is stereo, bit 1 artificial head, bit 2
    /// compressed, and bit 3 dynamic PTY.
    pub fn di(&self) -> u8 {
        self.di
    }

    /// True if the station signals music, false for speech
    pub fn is_music(&self) -> bool {
        self.music
    }

    /// Extended country code, if received
    pub fn ecc(&self) -> Option<u8> {
        self.ecc
    }

    /// ISO country code from the PI and ECC
    pub fn country(&self) -> Option<&'static str> {
        let ecc = self.ecc?;
        charset::country_code((self.info.pi >> 12) as u8, ecc)
    }

    /// Language code, if received
    pub fn language(&self) -> Option<u8> {
        self.language
    }

    /// Most recent clock time and the bit time it was received
    pub fn clock(&self) -> Option<&(ClockTime, u64)> {
        self.clock.as_ref()
    }

    /// Other networks, by PI
    pub fn others(&self) -> &BTreeMap<u16, OtherNetwork> {
        &self.others
    }

    /// Other network `pi`, if known
    pub fn other(&self, pi: u16) -> Option<&OtherNetwork> {
        self.others.get(&pi)
    }

    /// Number of groups received of the given type
    pub fn group_count(&self, group_type: GroupType) -> u32 {
        self.stats[group_type.number() as usize][group_type.version().as_bit()]
    }

    /// Number of groups whose type could not be read
    pub fn unknown_group_count(&self) -> u32 {
        self.stats[STATS_ROWS - 1][0]
    }

    /// Total and valid block counts
    pub fn block_counts(&self) -> (u64, u64) {
        (self.total_blocks, self.total_blocks_ok)
    }

    /// Bit time at which the PI was last seen
    pub fn time_of_last_pi(&self) -> u64 {
        self.time_of_last_pi
    }

    /// Open data applications
    pub fn oda(&self) -> &OdaRegistry {
        &self.oda
    }

    pub(crate) fn info_mut(&mut self) -> &mut ServiceInfo {
        &mut self.info
    }

    pub(crate) fn rt_mut(&mut self) -> &mut Text {
        &mut self.rt
    }

    pub(crate) fn ptyn_mut(&mut self) -> &mut Text {
        &mut self.ptyn
    }

    pub(crate) fn afs_mut(&mut self) -> &mut AfLists {
        &mut self.afs
    }

    pub(crate) fn oda_mut(&mut self) -> &mut OdaRegistry {
        &mut self.oda
    }

    pub(crate) fn set_pi(&mut self, pi: u16) {
        self.info.pi = pi;
    }

    pub(crate) fn ping_pi(&mut self, bit_time: u64) {
        self.time_of_last_pi = bit_time;
    }

    pub(crate) fn set_di_bit(&mut self, addr: u16, value: bool) {
        let bit = 1u8 << (3 - (addr & 3));
        if value {
            self.di |= bit;
        } else {
            self.di &= !bit;
        }
    }

    pub(crate) fn set_music(&mut self, music: bool) {
        self.music = music;
    }

    pub(crate) fn set_ecc(&mut self, ecc: u8) {
        self.ecc = Some(ecc);
    }

    pub(crate) fn set_language(&mut self, language: u8) {
        self.language = Some(language);
    }

    pub(crate) fn set_clock(&mut self, clock: ClockTime, bit_time: u64) {
        self.clock = Some((clock, bit_time));
    }

    pub(crate) fn other_mut(&mut self, pi: u16) -> &mut OtherNetwork {
        self.others
            .entry(pi)
            .or_insert_with(|| OtherNetwork::new(pi))
    }

    pub(crate) fn add_group_to_stats(&mut self, group_type: GroupType, valid: usize) {
        self.stats[group_type.number() as usize][group_type.version().as_bit()] += 1;
        self.count_blocks(valid);
    }

    pub(crate) fn add_unknown_group_to_stats(&mut self, valid: usize) {
        self.stats[STATS_ROWS - 1][0] += 1;
        self.count_blocks(valid);
    }

    fn count_blocks(&mut self, valid: usize) {
        self.total_blocks += 4;
        self.total_blocks_ok += valid as u64;
    }
}

impl fmt::Display for Station {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "PI={:04X}    Station name=\"{}\"    PS=\"{}\"",
            self.info.pi,
            self.station_name(),
            self.info.ps.text().latest_complete_or_partial_text()
        )?;

        let dps = self.info.ps.dynamic_text();
        if !dps.is_empty() {
            writeln!(f, "Dynamic PS: {}", dps)?;
        }
        if let Some(rt) = self.rt.current() {
            writeln!(f, "RT: \"{}\"", rt)?;
        }
        for on in self.others.values() {
            writeln!(f, "ON: {}", on)?;
        }
        for list in self.afs.lists() {
            writeln!(f, "AF {}", list)?;
        }

        write!(f, "Groups:")?;
        for (num, row) in self.stats.iter().take(STATS_ROWS - 1).enumerate() {
            for (ver, count) in row.iter().enumerate() {
                if *count > 0 {
                    write!(f, " {}{}: {}", num, ['A', 'B'][ver], count)?;
                }
            }
        }
        writeln!(f, " U: {}", self.unknown_group_count())?;

        if let Some((clock, _)) = &self.clock {
            writeln!(f, "Latest CT: {}", clock)?;
        }

        write!(f, "PTY: {} -> {}", self.info.pty, self.pty_label())?;
        if let Some(ptyn) = self.ptyn.current() {
            write!(f, ", PTYN={}", ptyn)?;
        }
        writeln!(f)?;

        writeln!(
            f,
            "DI: {}, {}, {}, {}",
            if self.di & 1 == 0 { "Mono" } else { "Stereo" },
            if self.di & 2 == 0 {
                "Not artificial head"
            } else {
                "Artificial head"
            },
            if self.di & 4 == 0 {
                "Not compressed"
            } else {
                "Compressed"
            },
            if self.di & 8 == 0 {
                "Static PTY"
            } else {
                "Dynamic PTY"
            }
        )?;

        if let Some(cc) = self.country() {
            writeln!(f, "Country: {}", cc)?;
        }
        if let Some(lang) = self.language.and_then(charset::language) {
            writeln!(f, "Language: {}", lang)?;
        }
        for app in self.oda.applications() {
            writeln!(f, "ODA: {}", app)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin() {
        let pin = Pin::from((17 << 11) | (9 << 6) | 45);
        assert_eq!(17, pin.day);
        assert_eq!(9, pin.hour);
        assert_eq!(45, pin.minute);
        assert_eq!("D=17, H=09:45", pin.to_string());
    }

    #[test]
    fn test_ps_vote_any_order() {
        const SEGMENTS: [[char; 2]; 4] = [[' ', 'C'], ['U', 'L'], ['T', 'U'], ['R', 'E']];

        let mut forward = ProgramService::new();
        let mut shuffled = ProgramService::new();
        assert_eq!("????????", forward.station_name());

        for _ in 0..3 {
            for (i, seg) in SEGMENTS.iter().enumerate() {
                forward.set_segment(i, *seg);
            }
            for i in [2usize, 0, 3, 1] {
                shuffled.set_segment(i, SEGMENTS[i]);
            }
        }

        // a single corrupted segment is outvoted
        shuffled.set_segment(1, ['X', 'X']);
        assert_eq!(" CULTURE", forward.station_name());
        assert_eq!(" CULTURE", shuffled.station_name());
        assert_eq!(" CULTURE", forward.text().most_frequent_text());
    }

    // segments 0-1 of `name` are sent `a` times, then 2-3 `b` times
    fn send_name(ps: &mut ProgramService, name: &str, a: usize, b: usize) {
        let chars: Vec<char> = name.chars().collect();
        for _ in 0..a {
            ps.set_segment(0, [chars[0], chars[1]]);
            ps.set_segment(1, [chars[2], chars[3]]);
        }
        for _ in 0..b {
            ps.set_segment(2, [chars[4], chars[5]]);
            ps.set_segment(3, [chars[6], chars[7]]);
        }
    }

    #[test]
    fn test_ps_vote_whole_names() {
        let mut ps = ProgramService::new();
        send_name(&mut ps, "RADIO 1 ", 3, 2);
        send_name(&mut ps, "NEWS AT ", 2, 3);
        send_name(&mut ps, "RADIO 1 ", 3, 2);
        send_name(&mut ps, "NEWS AT ", 2, 3);

        // never a mix of the two
        let name = ps.station_name();
        assert!(name == "RADIO 1 " || name == "NEWS AT ", "got {:?}", name);

        send_name(&mut ps, "RADIO 1 ", 3, 2);
        assert_eq!("RADIO 1 ", ps.station_name());
    }

    #[test]
    fn test_ps_partial() {
        let mut ps = ProgramService::new();
        ps.set_segment(0, ['R', 'A']);
        ps.set_segment(2, ['O', ' ']);
        assert_eq!("RA??O ??", ps.station_name());
    }

    #[test]
    fn test_dynamic_ps() {
        let mut ps = ProgramService::new();
        for (i, seg) in [['R', 'A'], ['D', 'I'], ['O', ' '], ['1', ' ']].iter().enumerate() {
            ps.set_segment(i, *seg);
        }
        ps.set_segment(0, ['N', 'E']);
        ps.set_segment(1, ['W', 'S']);
        ps.set_segment(0, ['N', 'O']);
        assert_eq!("RADIO 1 NEWS????", ps.dynamic_text());
    }

    #[test]
    fn test_di_bits() {
        let mut station = Station::new(0xf202, 0, false);
        station.set_di_bit(3, true);
        assert_eq!(1, station.di());
        station.set_di_bit(0, true);
        assert_eq!(9, station.di());
        station.set_di_bit(3, false);
        assert_eq!(8, station.di());
    }

    #[test]
    fn test_other_networks() {
        let mut station = Station::new(0xf202, 0, false);
        station.other_mut(0xf201).info_mut().pty = 10;
        station
            .other_mut(0xf201)
            .afs_mut()
            .add_pair(224 + 1, 100);
        assert_eq!(1, station.others().len());
        let on = station.other(0xf201).expect("on");
        assert_eq!(10, on.info().pty());
        assert_eq!("PI=F201 PS*=\"????????\" 97.5", on.to_string());
    }
}
