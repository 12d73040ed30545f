//! TMC event and supplementary information lists

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use strum::EnumMessage;

use super::table::{split_fields, Table, TableErr};

/// Nature of an event
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
pub enum EventNature {
    /// Information about a current situation
    #[default]
    #[strum(serialize = "", detailed_message = "Info")]
    Info,

    /// A forecast of a future situation
    #[strum(serialize = "F", detailed_message = "Forecast")]
    Forecast,

    /// Not to be presented to the driver
    #[strum(serialize = "S", detailed_message = "Silent")]
    Silent,
}

/// Expected duration of an event
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
pub enum DurationType {
    /// Changes from minute to minute
    #[default]
    #[strum(serialize = "D", detailed_message = "Dynamic")]
    Dynamic,

    /// Likely to last for hours or days
    #[strum(serialize = "L", detailed_message = "Longer Lasting")]
    LongerLasting,
}

impl DurationType {
    /// The other duration type
    pub fn invert(self) -> Self {
        match self {
            DurationType::Dynamic => DurationType::LongerLasting,
            DurationType::LongerLasting => DurationType::Dynamic,
        }
    }
}

/// Urgency of an event
///
/// Control codes in a message can raise or lower the urgency.
/// Both directions wrap around.
///
/// ```
/// use rdsurvey::tmc::Urgency;
///
/// assert_eq!(Urgency::Urgent, Urgency::Normal.next());
/// assert_eq!(Urgency::ExtremelyUrgent, Urgency::Normal.prev());
/// assert_eq!("XUrgent", Urgency::ExtremelyUrgent.to_string());
/// assert!(Urgency::Urgent < Urgency::ExtremelyUrgent);
/// ```
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    strum_macros::EnumMessage,
    strum_macros::EnumString,
)]
pub enum Urgency {
    /// Normal
    #[default]
    #[strum(serialize = "", detailed_message = "Normal")]
    Normal,

    /// Urgent
    #[strum(serialize = "U", detailed_message = "Urgent")]
    Urgent,

    /// Extremely urgent
    #[strum(serialize = "X", detailed_message = "XUrgent")]
    ExtremelyUrgent,
}

impl Urgency {
    /// One step more urgent
    pub fn next(self) -> Self {
        match self {
            Urgency::Normal => Urgency::Urgent,
            Urgency::Urgent => Urgency::ExtremelyUrgent,
            Urgency::ExtremelyUrgent => Urgency::Normal,
        }
    }

    /// One step less urgent
    pub fn prev(self) -> Self {
        match self {
            Urgency::Normal => Urgency::ExtremelyUrgent,
            Urgency::Urgent => Urgency::Normal,
            Urgency::ExtremelyUrgent => Urgency::Urgent,
        }
    }
}

// Display for the strum-coded enums
macro_rules! display_detailed {
    ($($t:ty),*) => {
        $(
            impl fmt::Display for $t {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.get_detailed_message().unwrap_or_default())
                }
            }
        )*
    };
}

display_detailed!(EventNature, DurationType, Urgency);

/// An entry of the event list
///
/// Events are identified by an 11-bit code. The event list
/// gives each code a text, with and without a quantifier, and
/// the defaults for its urgency, directionality, and
/// duration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TmcEvent {
    code: u16,
    text: String,
    text_q: String,
    nature: EventNature,
    quantifier_type: Option<u8>,
    duration_type: DurationType,
    bidirectional: bool,
    urgency: Urgency,
    update_class: u8,
}

impl TmcEvent {
    /// Placeholder for a code which is not in the event list
    ///
    /// ```
    /// use rdsurvey::tmc::TmcEvent;
    ///
    /// let evt = TmcEvent::unknown(2047);
    /// assert_eq!("unknown#2047", evt.text());
    /// assert_eq!(1, evt.update_class());
    /// assert!(!evt.is_bidirectional());
    /// ```
    pub fn unknown(code: u16) -> Self {
        let text = format!("unknown#{}", code);
        Self {
            code,
            text: text.clone(),
            text_q: text,
            nature: EventNature::Info,
            quantifier_type: None,
            duration_type: DurationType::Dynamic,
            bidirectional: false,
            urgency: Urgency::Normal,
            update_class: 1,
        }
    }

    /// Parse one row of the event list
    ///
    /// Columns are positional: code, text with quantifier,
    /// text, two unused columns, nature, quantifier type,
    /// duration type, directionality (`2` for both
    /// directions), urgency, and update class. Returns `None`
    /// if the code is not a number.
    pub fn from_row(line: &str) -> Option<Self> {
        let comp: Vec<&str> = split_fields(line).collect();
        Self::from_fields(&comp)
    }

    /// Build from the fields of one event list row
    pub fn from_fields(comp: &[&str]) -> Option<Self> {
        let col = |i: usize| comp.get(i).copied().unwrap_or("");

        let code = col(0).parse::<u16>().ok()?;
        let text_q = col(1).to_owned();
        let text = if col(2).is_empty() {
            text_q.clone()
        } else {
            col(2).to_owned()
        };

        Some(Self {
            code,
            text,
            text_q,
            nature: EventNature::from_str(col(5)).unwrap_or_default(),
            quantifier_type: col(6).parse::<u8>().ok(),
            duration_type: DurationType::from_str(col(7)).unwrap_or_default(),
            bidirectional: col(8) == "2",
            urgency: Urgency::from_str(col(9)).unwrap_or_default(),
            update_class: col(10).parse::<u8>().unwrap_or(0),
        })
    }

    /// Event code
    pub fn code(&self) -> u16 {
        self.code
    }

    /// Text without a quantifier
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Text with a `$Q` placeholder for the quantifier
    pub fn text_q(&self) -> &str {
        &self.text_q
    }

    /// Nature of the event
    pub fn nature(&self) -> EventNature {
        self.nature
    }

    /// Quantifier type, 0 to 12, if the event takes one
    pub fn quantifier_type(&self) -> Option<u8> {
        self.quantifier_type
    }

    /// Default duration type
    pub fn duration_type(&self) -> DurationType {
        self.duration_type
    }

    /// True if the event affects both directions by default
    pub fn is_bidirectional(&self) -> bool {
        self.bidirectional
    }

    /// Default urgency
    pub fn urgency(&self) -> Urgency {
        self.urgency
    }

    /// Update class
    ///
    /// A new message replaces older messages at the same
    /// location which share an update class with it.
    pub fn update_class(&self) -> u8 {
        self.update_class
    }

    /// True for update classes 32 to 39
    pub fn is_forecast_class(&self) -> bool {
        (32..=39).contains(&self.update_class)
    }

    /// True for the event which deletes a message
    pub fn is_cancellation(&self) -> bool {
        self.text == "message cancelled"
    }

    /// Text with the quantifier substituted
    ///
    /// Uses the plain text if there is no quantifier or the
    /// event has no quantifier type.
    pub fn text_with_quantifier(&self, quantifier: Option<u32>) -> String {
        match quantifier.and_then(|q| self.format_quantifier(q)) {
            Some(q) => self.text_q.replace("$Q", &q),
            None => self.text.clone(),
        }
    }

    /// Format a quantifier value according to the quantifier type
    ///
    /// Returns `None` if the event takes no quantifier.
    ///
    /// ```
    /// use rdsurvey::tmc::TmcEvent;
    ///
    /// let evt = TmcEvent::from_row("24;stationary traffic for $Q km;;;;;4;D;1;;1").unwrap();
    /// assert_eq!(Some("of up to 15 km/h".to_owned()), evt.format_quantifier(3));
    /// ```
    pub fn format_quantifier(&self, q: u32) -> Option<String> {
        self.quantifier_type.map(|t| format_quantifier(t, q))
    }
}

impl fmt::Display for TmcEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.text)
    }
}

/// Format quantifier `q` of quantifier type `qtype`
///
/// A zero quantifier stands for the largest value of its
/// range: 32 for the five-bit types 0 to 5, and 256 for the
/// others.
pub fn format_quantifier(qtype: u8, q: u32) -> String {
    let q = if q == 0 {
        if qtype <= 5 {
            32
        } else {
            256
        }
    } else {
        q
    };

    match qtype {
        0 => {
            let n = if q <= 28 { q } else { (q - 29) * 2 + 30 };
            n.to_string()
        }
        1 => {
            let n = if q <= 4 {
                q
            } else if q <= 14 {
                (q - 4) * 10
            } else {
                (q - 12) * 50
            };
            n.to_string()
        }
        2 => format!("less than {} m", q * 10),
        3 => format!("{} %", (q - 1) * 5),
        4 => format!("of up to {} km/h", q * 5),
        5 => {
            if q <= 10 {
                format!("of up to {} minutes", q * 5)
            } else if q <= 22 {
                format!("of up to {} hours", q - 10)
            } else {
                format!("of up to {} hours", (q - 20) * 6)
            }
        }
        6 => format!("{} °C", q as i64 - 51),
        7 => format!("{:02}:{:02}", (q - 1) / 6, ((q - 1) % 6) * 10),
        8 | 9 => {
            let val = if q <= 100 {
                q as f64 / 10.0
            } else {
                0.5 * (q as f64 - 80.0)
            };
            let unit = if qtype == 8 { "tonnes" } else { "m" };
            format!("{:.1} {}", val, unit)
        }
        10 => format!("of up to {} mm", q),
        11 => {
            let tenths = 875 + q;
            format!("{}.{} MHz", tenths / 10, tenths % 10)
        }
        12 => {
            // LF in 9 kHz steps from 153 kHz, then MF from 531 kHz
            let khz = if q <= 15 { 144 + 9 * q } else { 531 + 9 * (q - 16) };
            format!("{} kHz", khz)
        }
        _ => "ILLEGAL".to_owned(),
    }
}

/// An entry of the supplementary information list
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SupplementaryInfo {
    code: u16,
    text: String,
}

impl SupplementaryInfo {
    /// New entry
    pub fn new<S: Into<String>>(code: u16, text: S) -> Self {
        Self {
            code,
            text: text.into(),
        }
    }

    /// Parse one row of the supplementary information list
    ///
    /// The code is the second column and the text the third.
    pub fn from_row(line: &str) -> Option<Self> {
        let mut comp = split_fields(line).skip(1);
        let code = comp.next()?.parse::<u16>().ok()?;
        let text = comp.next().unwrap_or("");
        Some(Self::new(code, text))
    }

    /// Code
    pub fn code(&self) -> u16 {
        self.code
    }

    /// Text
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for SupplementaryInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.text)
    }
}

/// The event list, with supplementary information
///
/// Lookups of unknown codes never fail: they yield a
/// placeholder.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventTable {
    events: HashMap<u16, TmcEvent>,
    supplementary: HashMap<u16, SupplementaryInfo>,
}

impl EventTable {
    /// Empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `EL.DAT` and, if present, `SIL.DAT` from `dir`
    pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<Self, TableErr> {
        let dir = dir.as_ref();
        let mut out = Self::new();
        out.load_events(&Table::read(dir.join("EL.DAT"))?);
        let sil = dir.join("SIL.DAT");
        if sil.exists() {
            out.load_supplementary(&Table::read(sil)?);
        }
        Ok(out)
    }

    /// Add every event row of `table`
    ///
    /// Rows which do not begin with a code are skipped.
    pub fn load_events(&mut self, table: &Table) {
        for row in table.rows() {
            let fields: Vec<&str> = (0..11).map(|i| row.field(i)).collect();
            if let Some(evt) = TmcEvent::from_fields(&fields) {
                self.insert(evt);
            }
        }
    }

    /// Add every supplementary information row of `table`
    pub fn load_supplementary(&mut self, table: &Table) {
        for row in table.rows() {
            if let Ok(code) = row.field(1).parse::<u16>() {
                self.supplementary
                    .insert(code, SupplementaryInfo::new(code, row.field(2)));
            }
        }
    }

    /// Add or replace one event
    pub fn insert(&mut self, event: TmcEvent) {
        self.events.insert(event.code, event);
    }

    /// Add or replace one supplementary information entry
    pub fn insert_supplementary(&mut self, info: SupplementaryInfo) {
        self.supplementary.insert(info.code, info);
    }

    /// Number of known events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True if no events are known
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Event by code, or a placeholder
    pub fn get(&self, code: u16) -> TmcEvent {
        self.events
            .get(&code)
            .cloned()
            .unwrap_or_else(|| TmcEvent::unknown(code))
    }

    /// Supplementary information by code, or a placeholder
    pub fn supplementary(&self, code: u16) -> SupplementaryInfo {
        self.supplementary
            .get(&code)
            .cloned()
            .unwrap_or_else(|| SupplementaryInfo::new(code, format!("unknown#{}", code)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EL: &str = "CODE;TEXT_Q;TEXT;X;Y;N;Q;T;D;U;C
1;traffic problem;;;;;;D;1;;1
101;stationary traffic for $Q km;stationary traffic;;;;1;D;1;;1
401;closed;;;;;;L;2;U;5
2047;message cancelled;;;;;;D;1;;31
1497;Long-term forecast of $Q;forecast;;;F;;L;2;X;34
";

    const SIL: &str = "X;CODE;TEXT
;1;heavy vehicles
;2;buses
";

    #[test]
    fn test_event_rows() {
        let mut table = EventTable::new();
        table.load_events(&Table::parse("EL", EL));
        assert_eq!(5, table.len());

        let closed = table.get(401);
        assert_eq!("closed", closed.text());
        assert!(closed.is_bidirectional());
        assert_eq!(DurationType::LongerLasting, closed.duration_type());
        assert_eq!(Urgency::Urgent, closed.urgency());
        assert_eq!(5, closed.update_class());
        assert_eq!(None, closed.quantifier_type());

        let stationary = table.get(101);
        assert_eq!(Some(1), stationary.quantifier_type());
        assert_eq!("stationary traffic", stationary.text_with_quantifier(None));
        assert_eq!(
            "stationary traffic for 20 km",
            stationary.text_with_quantifier(Some(6))
        );

        let fcst = table.get(1497);
        assert_eq!(EventNature::Forecast, fcst.nature());
        assert!(fcst.is_forecast_class());
        assert!(table.get(2047).is_cancellation());

        let unknown = table.get(999);
        assert_eq!("unknown#999", unknown.text());
        assert_eq!("[999] unknown#999", unknown.to_string());
    }

    #[test]
    fn test_supplementary() {
        let mut table = EventTable::new();
        table.load_supplementary(&Table::parse("SIL", SIL));
        assert_eq!("[2] buses", table.supplementary(2).to_string());
        assert_eq!("unknown#9", table.supplementary(9).text());

        let info = SupplementaryInfo::from_row(";1;heavy vehicles").expect("row");
        assert_eq!(1, info.code());
    }

    #[test]
    fn test_quantifiers() {
        assert_eq!("28", format_quantifier(0, 28));
        assert_eq!("30", format_quantifier(0, 29));
        assert_eq!("36", format_quantifier(0, 0));
        assert_eq!("4", format_quantifier(1, 4));
        assert_eq!("100", format_quantifier(1, 14));
        assert_eq!("150", format_quantifier(1, 15));
        assert_eq!("less than 50 m", format_quantifier(2, 5));
        assert_eq!("45 %", format_quantifier(3, 10));
        assert_eq!("of up to 50 minutes", format_quantifier(5, 10));
        assert_eq!("of up to 2 hours", format_quantifier(5, 12));
        assert_eq!("of up to 18 hours", format_quantifier(5, 23));
        assert_eq!("-1 °C", format_quantifier(6, 50));
        assert_eq!("01:30", format_quantifier(7, 10));
        assert_eq!("3.5 tonnes", format_quantifier(8, 35));
        assert_eq!("10.0 m", format_quantifier(9, 100));
        assert_eq!("15.5 m", format_quantifier(9, 111));
        assert_eq!("of up to 7 mm", format_quantifier(10, 7));
        assert_eq!("87.6 MHz", format_quantifier(11, 1));
        assert_eq!("153 kHz", format_quantifier(12, 1));
        assert_eq!("531 kHz", format_quantifier(12, 16));
        assert_eq!("ILLEGAL", format_quantifier(13, 1));
    }
}
