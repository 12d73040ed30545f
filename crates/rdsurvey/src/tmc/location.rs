//! Location tables
//!
//! A TMC message names its location by a code which is only
//! meaningful within a *location table*. Each country
//! publishes one or more tables, identified by country id
//! (`CID`) and table number (`TABCD`).
//!
//! Locations form a hierarchy. Points lie on segments, which
//! lie on roads, and everything lies within some
//! administrative area. Points and segments are also chained
//! in both directions along their road by *offsets*.
//!
//! The [`LocationTable`] stores every record in an arena. All
//! cross-references are kept as location codes and resolved
//! on demand, so rows may refer to locations which appear
//! later in the same file or in another file. Lookups return
//! a [`Location`] handle which can walk these references.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use strum::EnumMessage;

#[cfg(not(test))]
use log::{debug, info};

#[cfg(test)]
use std::{println as debug, println as info};

use super::table::{Row, Table, TableErr};

/// Identifies a location
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LocationKey {
    /// Country id
    pub cid: u16,

    /// Location table number
    pub tabcd: u8,

    /// Location code
    pub lcd: u16,
}

impl LocationKey {
    /// New key
    pub fn new(cid: u16, tabcd: u8, lcd: u16) -> Self {
        Self { cid, tabcd, lcd }
    }

    // same table, different code
    fn with_lcd(&self, lcd: u16) -> Self {
        Self { lcd, ..*self }
    }
}

impl fmt::Display for LocationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CID: {}, TABCD: {}, LCD: {}",
            self.cid, self.tabcd, self.lcd
        )
    }
}

/// Geometric class of a location
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Default,
    strum_macros::EnumMessage,
    strum_macros::EnumString,
)]
pub enum LocationClass {
    /// An area
    #[strum(serialize = "A", detailed_message = "Area")]
    Area,

    /// A line: a road or segment
    #[strum(serialize = "L", detailed_message = "Line")]
    Line,

    /// A point
    #[default]
    #[strum(serialize = "P", detailed_message = "Point")]
    Point,
}

impl LocationClass {
    /// Parse from a `CLASS` column
    ///
    /// Anything other than `A` or `L` is a point.
    pub fn from<S: AsRef<str>>(code: S) -> Self {
        LocationClass::from_str(code.as_ref()).unwrap_or_default()
    }

    /// One-letter code
    pub fn as_code_str(&self) -> &'static str {
        self.get_serializations()[0]
    }
}

impl fmt::Display for LocationClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code_str())
    }
}

/// A country, from `COUNTRIES.DAT`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Country {
    /// Country id
    pub cid: u16,

    /// Extended country code, in hex
    pub ecc: String,

    /// Country code, the PI country nibble in hex
    pub ccd: String,

    /// Country name
    pub name: String,
}

impl Country {
    /// PI country nibble
    pub fn country_code(&self) -> Option<u8> {
        u8::from_str_radix(&self.ccd, 16).ok()
    }
}

/// A location table, from `LOCATIONDATASETS.DAT`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocationDataset {
    /// Country id
    pub cid: u16,

    /// Location table number
    pub tabcd: u8,

    /// Version string
    pub version: String,

    /// Free-form description
    pub comment: String,
}

/// Kind-specific data of a location
#[derive(Clone, Debug, PartialEq)]
pub enum LocationKind {
    /// Administrative or other area
    Area,

    /// A road
    Road {
        /// Road number, like `A7`
        road_number: String,

        /// Level in the road hierarchy
        pes_lev: Option<i64>,
    },

    /// A section of a road
    Segment {
        /// Road number
        road_number: String,

        /// Enclosing road
        road: Option<u16>,

        /// Enclosing higher-order segment
        segment: Option<u16>,
    },

    /// A junction or other point on a road
    Point {
        /// Junction number
        junction_number: String,

        /// Secondary area
        other_area: Option<u16>,

        /// Enclosing segment
        segment: Option<u16>,

        /// Enclosing road
        road: Option<u16>,

        /// Longitude, in degrees
        longitude: f64,

        /// Latitude, in degrees
        latitude: f64,

        /// `INTERRUPTSROAD` column
        interrupts_road: Option<i64>,

        /// Inside a built-up area
        urban: bool,
    },
}

impl LocationKind {
    /// Short kind name
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationKind::Area => "area",
            LocationKind::Road { .. } => "road",
            LocationKind::Segment { .. } => "segment",
            LocationKind::Point { .. } => "point",
        }
    }

    fn same_kind(&self, other: &LocationKind) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

/// A location record, as loaded
#[derive(Clone, Debug, PartialEq)]
pub struct LocationRecord {
    /// Identity
    pub key: LocationKey,

    /// Geometric class
    pub class: LocationClass,

    /// Type code
    pub tcd: u16,

    /// Subtype code
    pub stcd: u16,

    /// Road name id
    pub rnid: Option<u32>,

    /// First name id
    pub n1id: Option<u32>,

    /// Second name id
    pub n2id: Option<u32>,

    /// Enclosing administrative area
    pub area: Option<u16>,

    /// Kind-specific data
    pub kind: LocationKind,
}

// files read by load_dir, in dependency order
const LOCATION_FILES: &[&str] = &[
    "COUNTRIES",
    "LOCATIONDATASETS",
    "NAMES",
    "ADMINISTRATIVEAREA",
    "OTHERAREAS",
    "ROADS",
    "SEGMENTS",
    "SOFFSETS",
    "POINTS",
    "POFFSETS",
];

/// All loaded location tables
///
/// ```
/// use rdsurvey::tmc::{LocationTable, Table};
///
/// let mut lt = LocationTable::new();
/// lt.load_table(&Table::parse(
///     "ROADS",
///     "CID;TABCD;LCD;CLASS;TCD;STCD;ROADNUMBER;RNID;N1ID;N2ID;POL_LCD;PES_LEV\n\
///      58;1;100;L;1;1;A7;;;;;0\n",
/// )).unwrap();
///
/// let road = lt.get(58, 1, 100).unwrap();
/// assert_eq!(Some("A7"), road.road_number());
/// assert!(lt.get(58, 1, 101).is_none());
/// ```
#[derive(Clone, Debug, Default)]
pub struct LocationTable {
    countries: Vec<Country>,
    datasets: Vec<LocationDataset>,
    names: HashMap<(u16, u32), (u32, String)>,
    records: Vec<LocationRecord>,
    index: HashMap<LocationKey, usize>,
    offsets: HashMap<LocationKey, (Option<u16>, Option<u16>)>,
}

impl LocationTable {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every location table file found in `dir`
    ///
    /// File names are matched without regard to case. Files
    /// which are not present are skipped.
    pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<Self, TableErr> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir).map_err(|source| TableErr::Io {
            path: dir.to_owned(),
            source,
        })?;

        let mut found = HashMap::new();
        for entry in entries.flatten() {
            let path = entry.path();
            let is_dat = path
                .extension()
                .map(|e| e.eq_ignore_ascii_case("dat"))
                .unwrap_or(false);
            if let (true, Some(stem)) = (is_dat, path.file_stem()) {
                found.insert(stem.to_string_lossy().to_ascii_uppercase(), path.clone());
            }
        }

        let mut out = Self::new();
        for name in LOCATION_FILES {
            if let Some(path) = found.get(*name) {
                let table = Table::read(path)?;
                out.load_table(&table)?;
                info!("tmc: loaded {} rows from {}", table.len(), path.display());
            }
        }
        Ok(out)
    }

    /// Load one table, dispatching on its name
    ///
    /// Tables with unfamiliar names are ignored.
    pub fn load_table(&mut self, table: &Table) -> Result<(), TableErr> {
        match table.name() {
            "COUNTRIES" => self.load_countries(table),
            "LOCATIONDATASETS" => self.load_datasets(table),
            "NAMES" => self.load_names(table),
            "ADMINISTRATIVEAREA" | "OTHERAREAS" => self.load_locations(table, area_kind),
            "ROADS" => self.load_locations(table, road_kind),
            "SEGMENTS" => self.load_locations(table, segment_kind),
            "POINTS" => self.load_locations(table, point_kind),
            "SOFFSETS" | "POFFSETS" => self.load_offsets(table),
            other => {
                debug!("tmc: ignoring table {}", other);
                Ok(())
            }
        }
    }

    /// Add a country
    pub fn insert_country(&mut self, country: Country) {
        self.countries.retain(|c| c.cid != country.cid);
        self.countries.push(country);
    }

    /// Add a location table description
    pub fn insert_dataset(&mut self, dataset: LocationDataset) {
        self.datasets
            .retain(|d| (d.cid, d.tabcd) != (dataset.cid, dataset.tabcd));
        self.datasets.push(dataset);
    }

    /// Add a name
    ///
    /// A name id may be listed once per language. The entry
    /// with the lowest language id is kept.
    pub fn insert_name<S: Into<String>>(&mut self, cid: u16, lid: u32, nid: u32, name: S) {
        let name = name.into();
        self.names
            .entry((cid, nid))
            .and_modify(|old| {
                if lid < old.0 {
                    *old = (lid, name.clone());
                }
            })
            .or_insert((lid, name));
    }

    /// Add or replace a location
    pub fn insert(&mut self, record: LocationRecord) {
        match self.index.get(&record.key) {
            Some(idx) => self.records[*idx] = record,
            None => {
                self.index.insert(record.key, self.records.len());
                self.records.push(record);
            }
        }
    }

    /// Set the negative and positive offsets of a location
    ///
    /// The location itself need not be loaded yet.
    pub fn set_offsets(&mut self, key: LocationKey, neg: Option<u16>, pos: Option<u16>) {
        self.offsets.insert(key, (neg, pos));
    }

    /// Number of locations
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if no locations are loaded
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Location by country id, table number, and code
    pub fn get(&self, cid: u16, tabcd: u8, lcd: u16) -> Option<Location<'_>> {
        self.get_key(&LocationKey::new(cid, tabcd, lcd))
    }

    /// Location by key
    pub fn get_key(&self, key: &LocationKey) -> Option<Location<'_>> {
        self.index.get(key).map(|idx| Location {
            table: self,
            idx: *idx,
        })
    }

    /// Location by PI country nibble, table number, and code
    ///
    /// This is how messages name locations: the country comes
    /// from the PI code and the table number from the Alert-C
    /// system information.
    pub fn get_by_cc(&self, cc: u8, tabcd: u8, lcd: u16) -> Option<Location<'_>> {
        let country = self.country_by_cc(cc, tabcd)?;
        self.get(country.cid, tabcd, lcd)
    }

    /// Country with PI country nibble `cc` which has table `tabcd`
    ///
    /// If no dataset list is loaded, any country with a
    /// matching nibble whose locations include table `tabcd`
    /// qualifies.
    pub fn country_by_cc(&self, cc: u8, tabcd: u8) -> Option<&Country> {
        self.countries
            .iter()
            .filter(|c| c.country_code() == Some(cc))
            .find(|c| self.has_dataset(c.cid, tabcd))
    }

    /// Country by id
    pub fn country(&self, cid: u16) -> Option<&Country> {
        self.countries.iter().find(|c| c.cid == cid)
    }

    /// Location table description
    pub fn dataset(&self, cid: u16, tabcd: u8) -> Option<&LocationDataset> {
        self.datasets
            .iter()
            .find(|d| d.cid == cid && d.tabcd == tabcd)
    }

    /// Name by country id and name id
    pub fn name(&self, cid: u16, nid: u32) -> Option<&str> {
        self.names.get(&(cid, nid)).map(|(_, name)| name.as_str())
    }

    fn has_dataset(&self, cid: u16, tabcd: u8) -> bool {
        if self.datasets.is_empty() {
            self.records
                .iter()
                .any(|r| r.key.cid == cid && r.key.tabcd == tabcd)
        } else {
            self.dataset(cid, tabcd).is_some()
        }
    }

    fn load_countries(&mut self, table: &Table) -> Result<(), TableErr> {
        table.require(&["CID", "CCD"])?;
        for row in table.rows() {
            self.insert_country(Country {
                cid: row.int_as("CID")?,
                ecc: row.str("ECC").to_owned(),
                ccd: row.str("CCD").to_owned(),
                name: row.str("CNAME").to_owned(),
            });
        }
        Ok(())
    }

    fn load_datasets(&mut self, table: &Table) -> Result<(), TableErr> {
        table.require(&["CID", "TABCD"])?;
        for row in table.rows() {
            self.insert_dataset(LocationDataset {
                cid: row.int_as("CID")?,
                tabcd: row.int_as("TABCD")?,
                version: row.str("VERSION").to_owned(),
                comment: row.str("DCOMMENT").to_owned(),
            });
        }
        Ok(())
    }

    fn load_names(&mut self, table: &Table) -> Result<(), TableErr> {
        table.require(&["CID", "NID", "NAME"])?;
        for row in table.rows() {
            let lid = row.opt_int_as("LID")?.unwrap_or(0);
            self.insert_name(row.int_as("CID")?, lid, row.int_as("NID")?, row.str("NAME"));
        }
        Ok(())
    }

    fn load_offsets(&mut self, table: &Table) -> Result<(), TableErr> {
        table.require(&["CID", "TABCD", "LCD", "NEG_OFF_LCD", "POS_OFF_LCD"])?;
        for row in table.rows() {
            let key = row_key(&row)?;
            self.set_offsets(
                key,
                row.opt_int_as("NEG_OFF_LCD")?,
                row.opt_int_as("POS_OFF_LCD")?,
            );
        }
        Ok(())
    }

    fn load_locations(
        &mut self,
        table: &Table,
        kind: fn(&Row<'_>) -> Result<LocationKind, TableErr>,
    ) -> Result<(), TableErr> {
        table.require(&["CID", "TABCD", "LCD", "CLASS", "TCD", "STCD"])?;
        for row in table.rows() {
            let nid_column = if table.has_column("N1ID") {
                "N1ID"
            } else {
                "NID"
            };
            self.insert(LocationRecord {
                key: row_key(&row)?,
                class: LocationClass::from(row.str("CLASS")),
                tcd: row.int_as("TCD")?,
                stcd: row.int_as("STCD")?,
                rnid: row.opt_int_as("RNID")?,
                n1id: row.opt_int_as(nid_column)?,
                n2id: row.opt_int_as("N2ID")?,
                area: row.opt_int_as("POL_LCD")?,
                kind: kind(&row)?,
            });
        }
        Ok(())
    }
}

fn row_key(row: &Row<'_>) -> Result<LocationKey, TableErr> {
    Ok(LocationKey::new(
        row.int_as("CID")?,
        row.int_as("TABCD")?,
        row.int_as("LCD")?,
    ))
}

fn area_kind(_row: &Row<'_>) -> Result<LocationKind, TableErr> {
    Ok(LocationKind::Area)
}

fn road_kind(row: &Row<'_>) -> Result<LocationKind, TableErr> {
    Ok(LocationKind::Road {
        road_number: row.str("ROADNUMBER").to_owned(),
        pes_lev: row.opt_int("PES_LEV")?,
    })
}

fn segment_kind(row: &Row<'_>) -> Result<LocationKind, TableErr> {
    Ok(LocationKind::Segment {
        road_number: row.str("ROADNUMBER").to_owned(),
        road: row.opt_int_as("ROA_LCD")?,
        segment: row.opt_int_as("SEG_LCD")?,
    })
}

fn point_kind(row: &Row<'_>) -> Result<LocationKind, TableErr> {
    Ok(LocationKind::Point {
        junction_number: row.str("JUNCTIONNUMBER").to_owned(),
        other_area: row.opt_int_as("OTH_LCD")?,
        segment: row.opt_int_as("SEG_LCD")?,
        road: row.opt_int_as("ROA_LCD")?,
        longitude: coordinate(row, "XCOORD")?,
        latitude: coordinate(row, "YCOORD")?,
        interrupts_road: row.opt_int("INTERRUPTSROAD")?,
        urban: row.opt_int("URBAN")?.unwrap_or(0) != 0,
    })
}

// coordinates are integers in units of 1e-5 degree, or decimal degrees
fn coordinate(row: &Row<'_>, column: &str) -> Result<f64, TableErr> {
    let value = row.str(column);
    if value.contains('.') {
        return value
            .parse::<f64>()
            .map_err(|_| row.bad_value(column, value));
    }
    Ok(row.opt_int(column)?.unwrap_or(0) as f64 * 1e-5)
}

// parent chains are short; anything deeper is a cycle in the data
const MAX_DEPTH: usize = 16;

/// A location within a [`LocationTable`]
///
/// Handles are cheap to copy. Two handles are equal if they
/// refer to the same record of the same table.
#[derive(Clone, Copy)]
pub struct Location<'a> {
    table: &'a LocationTable,
    idx: usize,
}

impl<'a> Location<'a> {
    /// The underlying record
    pub fn record(&self) -> &'a LocationRecord {
        &self.table.records[self.idx]
    }

    /// Identity
    pub fn key(&self) -> LocationKey {
        self.record().key
    }

    /// Location code
    pub fn lcd(&self) -> u16 {
        self.record().key.lcd
    }

    /// Geometric class
    pub fn class(&self) -> LocationClass {
        self.record().class
    }

    /// Kind-specific data
    pub fn kind(&self) -> &'a LocationKind {
        &self.record().kind
    }

    /// Enclosing administrative area
    pub fn area(&self) -> Option<Location<'a>> {
        self.resolve(self.record().area)
    }

    /// Secondary area of a point
    pub fn other_area(&self) -> Option<Location<'a>> {
        match self.kind() {
            LocationKind::Point { other_area, .. } => self.resolve(*other_area),
            _ => None,
        }
    }

    /// Enclosing road of a segment or point
    pub fn road(&self) -> Option<Location<'a>> {
        match self.kind() {
            LocationKind::Segment { road, .. } | LocationKind::Point { road, .. } => {
                self.resolve(*road)
            }
            _ => None,
        }
    }

    /// Enclosing segment of a segment or point
    pub fn segment(&self) -> Option<Location<'a>> {
        match self.kind() {
            LocationKind::Segment { segment, .. } | LocationKind::Point { segment, .. } => {
                self.resolve(*segment)
            }
            _ => None,
        }
    }

    /// Next location in the negative direction
    ///
    /// Only points and segments have offsets. An offset to a
    /// location of a different kind is ignored.
    pub fn neg_offset(&self) -> Option<Location<'a>> {
        self.offset_link(|(neg, _)| neg)
    }

    /// Next location in the positive direction
    pub fn pos_offset(&self) -> Option<Location<'a>> {
        self.offset_link(|(_, pos)| pos)
    }

    /// Walk `extent` steps along the offset chain
    ///
    /// Direction 0 walks in the positive direction, anything
    /// else in the negative direction. The walk stops at the
    /// end of the chain, so an extent which is too large
    /// returns the last location. Areas and roads have no
    /// offsets and return themselves.
    pub fn offset(&self, extent: u32, direction: u8) -> Location<'a> {
        let mut out = *self;
        for _ in 0..extent {
            let next = if direction == 0 {
                out.pos_offset()
            } else {
                out.neg_offset()
            };
            match next {
                Some(next) => out = next,
                None => break,
            }
        }
        out
    }

    /// Road name
    pub fn road_name(&self) -> Option<&'a str> {
        self.name_of(self.record().rnid)
    }

    /// First name
    pub fn name1(&self) -> Option<&'a str> {
        self.name_of(self.record().n1id)
    }

    /// Second name
    pub fn name2(&self) -> Option<&'a str> {
        self.name_of(self.record().n2id)
    }

    /// Road number
    ///
    /// Points and segments inherit the number of their road,
    /// or failing that, of their enclosing segment.
    pub fn road_number(&self) -> Option<&'a str> {
        self.road_number_depth(0)
    }

    /// Junction name of a point, like `Köln-Nord (24)`
    pub fn junction_name(&self) -> Option<String> {
        let junction = match self.kind() {
            LocationKind::Point {
                junction_number, ..
            } => junction_number.as_str(),
            _ => return None,
        };
        match (self.name1().filter(|n| !n.is_empty()), junction.is_empty()) {
            (Some(name), false) => Some(format!("{} ({})", name, junction)),
            (Some(name), true) => Some(name.to_owned()),
            (None, false) => Some(junction.to_owned()),
            (None, true) => None,
        }
    }

    /// Coordinates of a point, as (longitude, latitude)
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match self.kind() {
            LocationKind::Point {
                longitude,
                latitude,
                ..
            } => Some((*longitude, *latitude)),
            _ => None,
        }
    }

    /// Short human-readable name
    ///
    /// * Areas: the area name
    /// * Roads and segments: road number, road name, and the
    ///   names of both ends, like `A7 Kassel - Hannover`
    /// * Points: road number and junction name
    pub fn display_name(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        match self.kind() {
            LocationKind::Area => parts.extend(self.name1().map(str::to_owned)),
            LocationKind::Road { .. } | LocationKind::Segment { .. } => {
                parts.extend(self.road_number().map(str::to_owned));
                parts.extend(self.road_name().map(str::to_owned));
                match (self.name1(), self.name2()) {
                    (Some(n1), Some(n2)) => parts.push(format!("{} - {}", n1, n2)),
                    (Some(n), None) | (None, Some(n)) => parts.push(n.to_owned()),
                    (None, None) => {}
                }
            }
            LocationKind::Point { .. } => {
                parts.extend(self.road_number().map(str::to_owned));
                parts.extend(self.junction_name());
            }
        }
        parts.retain(|p| !p.is_empty());
        if parts.is_empty() {
            format!("LCD {}", self.lcd())
        } else {
            parts.join(" ")
        }
    }

    /// True if `location` encloses this one
    ///
    /// A location is a child of its area, road, and segment,
    /// of a point's secondary area, and transitively of their
    /// parents.
    pub fn is_child_of(&self, location: &Location<'a>) -> bool {
        self.is_child_of_depth(location, 0)
    }

    /// Smallest location enclosing both this one and `secondary`
    ///
    /// Returns this location if `secondary` is `None`, equal
    /// to it, or one of its children. Otherwise, tries the
    /// chain of segments enclosing this location, from the
    /// lowest order up, and then their roads. Areas are not
    /// considered. Returns `None` if nothing encloses both.
    pub fn enclosing_location(&self, secondary: Option<&Location<'a>>) -> Option<Location<'a>> {
        let sec = match secondary {
            None => return Some(*self),
            Some(sec) => *sec,
        };
        self.enclosing_candidates()
            .into_iter()
            .find(|cand| sec == *cand || sec.is_child_of(cand))
    }

    // self, enclosing segments, then roads; lowest order first
    fn enclosing_candidates(&self) -> Vec<Location<'a>> {
        let mut out = vec![*self];
        let mut cur = *self;
        while let Some(seg) = cur.segment() {
            if out.contains(&seg) || out.len() > MAX_DEPTH {
                break;
            }
            out.push(seg);
            cur = seg;
        }

        let roads: Vec<Location<'a>> = out.iter().filter_map(|loc| loc.road()).collect();
        for road in roads {
            if !out.contains(&road) {
                out.push(road);
            }
        }
        out
    }

    fn is_child_of_depth(&self, location: &Location<'a>, depth: usize) -> bool {
        if depth > MAX_DEPTH {
            return false;
        }
        let parents = [self.area(), self.other_area(), self.road(), self.segment()];
        parents.iter().flatten().any(|parent| {
            parent == location || parent.is_child_of_depth(location, depth + 1)
        })
    }

    fn road_number_depth(&self, depth: usize) -> Option<&'a str> {
        if depth > MAX_DEPTH {
            return None;
        }
        let own = match self.kind() {
            LocationKind::Road { road_number, .. } => return non_empty(road_number),
            LocationKind::Segment { road_number, .. } => non_empty(road_number),
            _ => None,
        };
        self.road()
            .and_then(|r| r.road_number_depth(depth + 1))
            .or_else(|| {
                self.segment()
                    .and_then(|s| s.road_number_depth(depth + 1))
            })
            .or(own)
    }

    fn offset_link<F>(&self, pick: F) -> Option<Location<'a>>
    where
        F: Fn((Option<u16>, Option<u16>)) -> Option<u16>,
    {
        if !matches!(
            self.kind(),
            LocationKind::Segment { .. } | LocationKind::Point { .. }
        ) {
            return None;
        }
        let lcd = pick(*self.table.offsets.get(&self.key())?)?;
        self.resolve(Some(lcd))
            .filter(|next| next.kind().same_kind(self.kind()))
    }

    fn resolve(&self, lcd: Option<u16>) -> Option<Location<'a>> {
        self.table.get_key(&self.key().with_lcd(lcd?))
    }

    fn name_of(&self, nid: Option<u32>) -> Option<&'a str> {
        self.table.name(self.key().cid, nid?)
    }
}

fn non_empty(s: &str) -> Option<&str> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

impl<'a> PartialEq for Location<'a> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.table, other.table) && self.idx == other.idx
    }
}

impl<'a> Eq for Location<'a> {}

impl<'a> fmt::Debug for Location<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Location")
            .field("key", &self.key())
            .field("kind", &self.kind().as_str())
            .finish()
    }
}

impl<'a> fmt::Display for Location<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rec = self.record();
        writeln!(
            f,
            "{}, Type: {}{}.{}",
            rec.key, rec.class, rec.tcd, rec.stcd
        )?;
        writeln!(f, "{}", self.display_name())?;
        if let Some(area) = self.area() {
            writeln!(f, "Administrative area: {}", area.display_name())?;
        }
        if let Some((lon, lat)) = self.coordinates() {
            writeln!(f, "Lon: {:.5}, Lat: {:.5}", lon, lat)?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use assert_approx_eq::assert_approx_eq;

    // A small table along one road:
    //
    //   area 1 (Land) > area 2 (Kreis)
    //   road 100 "A7"
    //     segment 200 > segments 201, 202, 203
    //     points 301 -> 302 -> 303 -> 304 on segment 201/202
    pub(crate) fn sample_table() -> LocationTable {
        let mut lt = LocationTable::new();
        let tables = [
            Table::parse("COUNTRIES", "CID;ECC;CCD;CNAME\n58;E0;D;Germany\n"),
            Table::parse("LOCATIONDATASETS", "CID;TABCD;DCOMMENT;VERSION\n58;1;Test;1.0\n"),
            Table::parse(
                "NAMES",
                "CID;LID;NID;NAME\n58;1;1;Hessen\n58;1;2;Kassel\n58;1;3;Hannover\n\
                 58;1;4;Nord\n58;1;5;Mitte\n58;1;6;Süd\n58;1;7;Ende\n58;2;2;Cassel\n",
            ),
            Table::parse(
                "ADMINISTRATIVEAREA",
                "CID;TABCD;LCD;CLASS;TCD;STCD;NID;POL_LCD\n58;1;1;A;1;0;1;\n58;1;2;A;9;0;2;1\n",
            ),
            Table::parse(
                "ROADS",
                "CID;TABCD;LCD;CLASS;TCD;STCD;ROADNUMBER;RNID;N1ID;N2ID;POL_LCD;PES_LEV\n\
                 58;1;100;L;1;1;A7;;2;3;1;0\n",
            ),
            Table::parse(
                "SEGMENTS",
                "CID;TABCD;LCD;CLASS;TCD;STCD;ROADNUMBER;RNID;N1ID;N2ID;ROA_LCD;SEG_LCD;POL_LCD\n\
                 58;1;200;L;3;1;;;2;3;100;;1\n\
                 58;1;201;L;3;2;;;2;5;100;200;2\n\
                 58;1;202;L;3;2;;;5;3;100;200;2\n\
                 58;1;203;L;3;2;;;;;100;;1\n",
            ),
            Table::parse(
                "SOFFSETS",
                "CID;TABCD;LCD;NEG_OFF_LCD;POS_OFF_LCD\n58;1;201;;202\n58;1;202;201;\n",
            ),
            Table::parse(
                "POINTS",
                "CID;TABCD;LCD;CLASS;TCD;STCD;JUNCTIONNUMBER;RNID;N1ID;N2ID;POL_LCD;OTH_LCD;\
                 SEG_LCD;ROA_LCD;XCOORD;YCOORD;INTERRUPTSROAD;URBAN\n\
                 58;1;301;P;1;3;80;;4;;2;;201;100;+00949000;+05131500;0;0\n\
                 58;1;302;P;1;3;81;;5;;2;;201;100;+00950000;+05132000;0;1\n\
                 58;1;303;P;1;3;;;6;;2;;202;100;+00951000;+05133000;0;0\n\
                 58;1;304;P;1;3;82;;7;;2;;202;100;+00952000;+05134000;0;0\n",
            ),
            Table::parse(
                "POFFSETS",
                "CID;TABCD;LCD;NEG_OFF_LCD;POS_OFF_LCD\n\
                 58;1;301;;302\n58;1;302;301;303\n58;1;303;302;304\n58;1;304;303;\n",
            ),
        ];
        for table in tables.iter() {
            lt.load_table(table).expect("load");
        }
        lt
    }

    #[test]
    fn test_load() {
        let lt = sample_table();
        assert_eq!(11, lt.len());
        assert_eq!(Some("Kassel"), lt.name(58, 2));
        assert_eq!("1.0", lt.dataset(58, 1).expect("dataset").version);
        assert_eq!("Germany", lt.country_by_cc(0xd, 1).expect("country").name);
        assert!(lt.country_by_cc(0xd, 2).is_none());

        let pt = lt.get_by_cc(0xd, 1, 302).expect("point");
        assert_eq!(LocationClass::Point, pt.class());
        let (lon, lat) = pt.coordinates().expect("coordinates");
        assert_approx_eq!(9.5, lon, 1e-9);
        assert_approx_eq!(51.32, lat, 1e-9);
        match pt.kind() {
            LocationKind::Point { urban, .. } => assert!(*urban),
            _ => panic!("not a point"),
        }
    }

    #[test]
    fn test_names() {
        let lt = sample_table();
        assert_eq!("A7 Kassel - Hannover", lt.get(58, 1, 100).expect("road").display_name());
        assert_eq!("Hessen", lt.get(58, 1, 1).expect("area").display_name());

        let pt = lt.get(58, 1, 301).expect("point");
        assert_eq!(Some("A7"), pt.road_number());
        assert_eq!(Some("Nord (80)".to_owned()), pt.junction_name());
        assert_eq!("A7 Nord (80)", pt.display_name());
        assert_eq!(
            Some("Süd".to_owned()),
            lt.get(58, 1, 303).expect("point").junction_name()
        );
    }

    #[test]
    fn test_offset_clamp() {
        let lt = sample_table();
        let p301 = lt.get(58, 1, 301).expect("point");
        let p304 = lt.get(58, 1, 304).expect("point");

        assert_eq!(p301, p301.offset(0, 0));
        assert_eq!(303, p301.offset(2, 0).lcd());
        assert_eq!(p304, p301.offset(3, 0));
        assert_eq!(p304, p301.offset(31, 0));
        assert_eq!(p301, p304.offset(31, 1));
        assert_eq!(p301, p301.offset(5, 1));

        let road = lt.get(58, 1, 100).expect("road");
        assert_eq!(road, road.offset(5, 0));
    }

    #[test]
    fn test_hierarchy() {
        let lt = sample_table();
        let land = lt.get(58, 1, 1).expect("area");
        let kreis = lt.get(58, 1, 2).expect("area");
        let road = lt.get(58, 1, 100).expect("road");
        let s200 = lt.get(58, 1, 200).expect("segment");
        let s201 = lt.get(58, 1, 201).expect("segment");
        let s203 = lt.get(58, 1, 203).expect("segment");
        let p301 = lt.get(58, 1, 301).expect("point");
        let p303 = lt.get(58, 1, 303).expect("point");

        assert!(kreis.is_child_of(&land));
        assert!(p301.is_child_of(&land));
        assert!(p301.is_child_of(&s200));
        assert!(p301.is_child_of(&road));
        assert!(!road.is_child_of(&p301));
        assert!(!s203.is_child_of(&s200));

        assert_eq!(Some(p301), p301.enclosing_location(None));
        assert_eq!(Some(p301), p301.enclosing_location(Some(&p301)));
        assert_eq!(Some(s200), p301.enclosing_location(Some(&p303)));
        assert_eq!(Some(road), s201.enclosing_location(Some(&s203)));
        assert_eq!(Some(s200), s200.enclosing_location(Some(&p303)));
        assert_eq!(None, p301.enclosing_location(Some(&land)));
    }
}
