//! Alert-C traffic messages

use std::fmt;

use super::event::{EventTable, SupplementaryInfo, TmcEvent, Urgency};
use super::location::{LocationKey, LocationTable};

/// Width, in bits, of the value which follows each label
pub const LABEL_SIZES: [u32; 16] = [3, 3, 5, 5, 5, 8, 8, 8, 8, 11, 16, 16, 16, 16, 0, 0];

/// Location code which matches every location
pub const ANY_LOCATION: u16 = 65535;

/// Format a start or stop time code
///
/// ```
/// use rdsurvey::tmc::format_time;
///
/// assert_eq!("07:45", format_time(31));
/// assert_eq!("midnight + 1 days, 2 hours", format_time(122));
/// assert_eq!("day 3 this month", format_time(203));
/// assert_eq!("15/01", format_time(232));
/// assert_eq!("INVALID", format_time(256));
/// ```
pub fn format_time(time: u32) -> String {
    match time {
        0..=95 => format!("{:02}:{:02}", time / 4, (time % 4) * 15),
        96..=200 => format!(
            "midnight + {} days, {} hours",
            (time - 96) / 24,
            (time - 96) % 24
        ),
        201..=231 => format!("day {} this month", time - 200),
        232..=255 => format!(
            "{:02}/{:02}",
            15 + 16 * ((time - 231) % 2),
            (time - 231) / 2
        ),
        _ => "INVALID".to_owned(),
    }
}

/// Decode the length label
///
/// Zero means "longer than 100 km" and is stored as 1000.
pub fn decode_length(value: u32) -> u32 {
    match value {
        0 => 1000,
        1..=10 => value,
        11..=15 => 10 + (value - 10) * 2,
        _ => 20 + (value - 15) * 5,
    }
}

/// One event of a message
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
    info: TmcEvent,
    urgency: Urgency,
    quantifier: Option<u32>,
    source_location: Option<u16>,
    supplementary: Vec<SupplementaryInfo>,
}

impl Event {
    /// New event with the default urgency of its code
    pub fn new(info: TmcEvent) -> Self {
        Self {
            urgency: info.urgency(),
            info,
            quantifier: None,
            source_location: None,
            supplementary: Vec::new(),
        }
    }

    /// Event list entry
    pub fn info(&self) -> &TmcEvent {
        &self.info
    }

    /// Urgency, after control codes
    pub fn urgency(&self) -> Urgency {
        self.urgency
    }

    /// Raw quantifier value
    pub fn quantifier(&self) -> Option<u32> {
        self.quantifier
    }

    /// Location of the cause of the problem
    pub fn source_location(&self) -> Option<u16> {
        self.source_location
    }

    /// Supplementary information
    pub fn supplementary(&self) -> &[SupplementaryInfo] {
        &self.supplementary
    }

    /// Event text, with the quantifier if any
    pub fn text(&self) -> String {
        self.info.text_with_quantifier(self.quantifier)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}, urgency={}",
            self.info.code(),
            self.text(),
            self.urgency
        )?;
        if let Some(src) = self.source_location {
            write!(f, ", source problem at {}", src)?;
        }
        if let Some(q) = self.quantifier {
            write!(f, " (Q={})", q)?;
        }
        if !self.supplementary.is_empty() {
            let all: Vec<String> = self.supplementary.iter().map(|s| s.to_string()).collect();
            write!(f, "\nSupplementary information: [{}]", all.join(", "))?;
        }
        Ok(())
    }
}

/// A group of events sharing length, speed, and destination
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InformationBlock {
    length: Option<u32>,
    speed: Option<u32>,
    destination: Option<u16>,
    events: Vec<Event>,
    diversion_route: Vec<u16>,
}

impl InformationBlock {
    /// Block with no events
    pub fn new() -> Self {
        Self::default()
    }

    /// Block with one event
    pub fn with_event(event: Event) -> Self {
        Self {
            events: vec![event],
            ..Self::default()
        }
    }

    /// Length of the affected route, in km
    ///
    /// 1000 means "more than 100 km".
    pub fn length(&self) -> Option<u32> {
        self.length
    }

    /// Speed limit, in km/h
    pub fn speed(&self) -> Option<u32> {
        self.speed
    }

    /// Destination location code
    pub fn destination(&self) -> Option<u16> {
        self.destination
    }

    /// Events
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Diversion route, as location codes
    pub fn diversion_route(&self) -> &[u16] {
        &self.diversion_route
    }

    fn current_event(&mut self) -> Option<&mut Event> {
        self.events.last_mut()
    }
}

impl fmt::Display for InformationBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "-------------")?;
        if let Some(dest) = self.destination {
            write!(f, "For destination: {}  ", dest)?;
        }
        match self.length {
            Some(len) if len > 100 => write!(f, "length > 100 km  ")?,
            Some(len) => write!(f, "length = {} km  ", len)?,
            None => {}
        }
        if let Some(speed) = self.speed {
            write!(f, "speed limit = {} km/h", speed)?;
        }
        if self.length.is_some() || self.speed.is_some() || self.destination.is_some() {
            writeln!(f)?;
        }
        for evt in self.events.iter() {
            writeln!(f, "{}", evt)?;
        }
        if !self.diversion_route.is_empty() {
            writeln!(f, "Diversion route: {:?}", self.diversion_route)?;
        }
        Ok(())
    }
}

/// An Alert-C message
///
/// Messages are built from a first group, which names the
/// primary event and location, and then fed labelled fields
/// from continuation groups with
/// [`add_field()`](TmcMessage::add_field). A message is only
/// meaningful once [complete](TmcMessage::is_complete).
///
/// ```
/// use rdsurvey::tmc::{EventTable, TmcMessage};
///
/// let events = EventTable::new();
/// let mut msg = TmcMessage::new(0, 2, 101, 12345, 0xd, Some(1), &events);
/// msg.add_field(2, 12, &events); // length
/// msg.add_field(1, 6, &events);  // extent += 8
/// assert_eq!(10, msg.extent());
/// assert_eq!(Some(14), msg.information_blocks()[0].length());
/// assert_eq!(2, msg.field_count());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TmcMessage {
    direction: u8,
    extent: u32,
    cc: u8,
    ltn: Option<u8>,
    location: u16,
    reversed_directionality: bool,
    bidirectional: bool,
    duration: Option<u32>,
    start_time: Option<u32>,
    stop_time: Option<u32>,
    dynamic: bool,
    spoken: bool,
    diversion: bool,
    blocks: Vec<InformationBlock>,
    field_count: usize,
    complete: bool,
    update_count: u32,
    primary: Option<LocationKey>,
    secondary: Option<LocationKey>,
    location_text: Option<String>,
    extent_text: Option<String>,
}

impl TmcMessage {
    /// New message from the fields of a first group
    ///
    /// `direction` is 0 for the positive direction. `cc` is
    /// the country nibble of the PI code and `ltn` the
    /// location table number, if known.
    pub fn new(
        direction: u8,
        extent: u32,
        event: u16,
        location: u16,
        cc: u8,
        ltn: Option<u8>,
        events: &EventTable,
    ) -> Self {
        Self {
            direction,
            extent,
            cc,
            ltn,
            location,
            reversed_directionality: false,
            bidirectional: true,
            duration: None,
            start_time: None,
            stop_time: None,
            dynamic: true,
            spoken: false,
            diversion: false,
            blocks: vec![InformationBlock::with_event(Event::new(events.get(event)))],
            field_count: 0,
            complete: false,
            update_count: 0,
            primary: None,
            secondary: None,
            location_text: None,
            extent_text: None,
        }
    }

    /// Direction of queue growth, 0 for positive
    pub fn direction(&self) -> u8 {
        self.direction
    }

    /// Number of steps along the offset chain
    pub fn extent(&self) -> u32 {
        self.extent
    }

    /// PI country nibble
    pub fn cc(&self) -> u8 {
        self.cc
    }

    /// Location table number
    pub fn ltn(&self) -> Option<u8> {
        self.ltn
    }

    /// Primary location code
    pub fn location(&self) -> u16 {
        self.location
    }

    /// True if the message affects both directions
    ///
    /// Valid once complete.
    pub fn is_bidirectional(&self) -> bool {
        self.bidirectional
    }

    /// Duration and persistence code
    pub fn duration(&self) -> Option<u32> {
        self.duration
    }

    /// Start time code; see [`format_time()`]
    pub fn start_time(&self) -> Option<u32> {
        self.start_time
    }

    /// Stop time code; see [`format_time()`]
    pub fn stop_time(&self) -> Option<u32> {
        self.stop_time
    }

    /// True for a dynamic message, false for longer lasting
    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    /// True if the message should be spoken
    pub fn is_spoken(&self) -> bool {
        self.spoken
    }

    /// True if a diversion is advised
    pub fn diversion(&self) -> bool {
        self.diversion
    }

    /// Information blocks; the first holds the primary event
    pub fn information_blocks(&self) -> &[InformationBlock] {
        &self.blocks
    }

    /// All events, in order
    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.blocks.iter().flat_map(|ib| ib.events.iter())
    }

    /// Number of labelled fields applied
    pub fn field_count(&self) -> usize {
        self.field_count
    }

    /// True once every group of the message has been received
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Number of messages this one has replaced, plus one
    pub fn update_count(&self) -> u32 {
        self.update_count
    }

    /// Resolved primary location
    pub fn primary_location(&self) -> Option<LocationKey> {
        self.primary
    }

    /// Resolved far end of the extent
    pub fn secondary_location(&self) -> Option<LocationKey> {
        self.secondary
    }

    /// Apply one labelled field
    ///
    /// | Label | Field                                |
    /// |-------|--------------------------------------|
    /// | 0     | duration                             |
    /// | 1     | control code                         |
    /// | 2     | length of route affected             |
    /// | 3     | speed limit                          |
    /// | 4, 5  | quantifier of the current event      |
    /// | 6     | supplementary information            |
    /// | 7, 8  | start and stop time                  |
    /// | 9     | additional event                     |
    /// | 10    | diversion route                      |
    /// | 11    | destination                          |
    /// | 13    | source of problem                    |
    /// | 14    | start of a new information block     |
    ///
    /// Other labels are ignored.
    pub fn add_field(&mut self, label: u32, value: u32, events: &EventTable) {
        self.field_count += 1;
        match label {
            0 => self.duration = Some(value),
            1 => self.control_code(value),
            2 => self.current_block().length = Some(decode_length(value)),
            3 => self.current_block().speed = Some(5 * value),
            4 | 5 => {
                if let Some(evt) = self.current_block().current_event() {
                    evt.quantifier = Some(value);
                }
            }
            6 => {
                let info = events.supplementary(value as u16);
                if let Some(evt) = self.current_block().current_event() {
                    evt.supplementary.push(info);
                }
            }
            7 => self.start_time = Some(value),
            8 => self.stop_time = Some(value),
            9 => {
                let evt = Event::new(events.get(value as u16));
                self.current_block().events.push(evt);
            }
            10 => self.current_block().diversion_route.push(value as u16),
            11 => self.current_block().destination = Some(value as u16),
            13 => {
                if let Some(evt) = self.current_block().current_event() {
                    evt.source_location = Some(value as u16);
                }
            }
            14 => self.blocks.push(InformationBlock::new()),
            _ => {}
        }
    }

    /// Set the duration and diversion flag of a single-group message
    pub(crate) fn set_single_group_fields(&mut self, diversion: bool, duration: u32) {
        self.diversion = diversion;
        self.duration = Some(duration);
    }

    /// Mark the message complete
    ///
    /// The message is bidirectional if all of its events are,
    /// unless the directionality was reversed by a control
    /// code.
    pub fn finish(&mut self) {
        let bidirectional = self.events().all(|e| e.info.is_bidirectional());
        self.bidirectional = bidirectional != self.reversed_directionality;
        self.complete = true;
    }

    /// Look up the primary location and the end of the extent
    ///
    /// Nothing is resolved without a location table number.
    pub fn resolve(&mut self, locations: &LocationTable) {
        let ltn = match self.ltn {
            Some(ltn) => ltn,
            None => return,
        };
        if let Some(primary) = locations.get_by_cc(self.cc, ltn, self.location) {
            let secondary = primary.offset(self.extent, self.direction);
            self.primary = Some(primary.key());
            self.location_text = Some(primary.to_string());
            if secondary != primary {
                self.secondary = Some(secondary.key());
                self.extent_text = Some(secondary.to_string());
            }
        }
    }

    /// True if this message replaces `other`
    ///
    /// All of these must hold:
    ///
    /// * same location, or this message is for
    ///   [every location](ANY_LOCATION)
    /// * same direction
    /// * some event of this message shares an update class with
    ///   some event of `other`
    /// * for forecasts, the same duration
    pub fn overrides(&self, other: &TmcMessage) -> bool {
        (self.location == other.location || self.location == ANY_LOCATION)
            && self.direction == other.direction
            && self.shares_update_class(other)
            && (!self.is_forecast() || self.duration == other.duration)
    }

    /// True if any event is in a forecast update class
    pub fn is_forecast(&self) -> bool {
        self.events().any(|e| e.info.is_forecast_class())
    }

    /// True if the primary event cancels messages
    pub fn is_cancellation(&self) -> bool {
        self.events()
            .next()
            .map(|e| e.info.is_cancellation())
            .unwrap_or(false)
    }

    pub(crate) fn set_update_count(&mut self, count: u32) {
        self.update_count = count;
    }

    fn shares_update_class(&self, other: &TmcMessage) -> bool {
        other.events().any(|theirs| {
            self.events()
                .any(|ours| ours.info.update_class() == theirs.info.update_class())
        })
    }

    fn control_code(&mut self, value: u32) {
        match value {
            0 | 1 => {
                if let Some(evt) = self.blocks.first_mut().and_then(|ib| ib.events.first_mut()) {
                    evt.urgency = if value == 0 {
                        evt.urgency.next()
                    } else {
                        evt.urgency.prev()
                    };
                }
            }
            2 => self.reversed_directionality = true,
            3 => self.dynamic = !self.dynamic,
            4 => self.spoken = !self.spoken,
            5 => self.diversion = true,
            6 => self.extent += 8,
            7 => self.extent += 16,
            _ => {}
        }
    }

    fn current_block(&mut self) -> &mut InformationBlock {
        if self.blocks.is_empty() {
            self.blocks.push(InformationBlock::new());
        }
        let last = self.blocks.len() - 1;
        &mut self.blocks[last]
    }
}

impl fmt::Display for TmcMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.complete {
            return f.write_str("Incomplete!");
        }

        write!(f, "CC: {:X}, LTN: ", self.cc)?;
        match self.ltn {
            Some(ltn) => write!(f, "{}", ltn)?,
            None => f.write_str("?")?,
        }
        write!(
            f,
            ", Location: {}, extent={}, {}directional, growth direction {}",
            self.location,
            self.extent,
            if self.bidirectional { "bi" } else { "mono" },
            if self.direction == 0 { "+" } else { "-" }
        )?;
        if self.diversion {
            f.write_str(", diversion advised")?;
        }
        if let Some(start) = self.start_time {
            write!(f, ", start={}", format_time(start))?;
        }
        if let Some(stop) = self.stop_time {
            write!(f, ", stop={}", format_time(stop))?;
        }
        writeln!(f)?;

        for ib in self.blocks.iter() {
            write!(f, "{}", ib)?;
        }
        if let Some(loc) = &self.location_text {
            write!(f, "-------------\n{}", loc)?;
        }
        if let Some(ext) = &self.extent_text {
            write!(f, "-------------\nExtent:\n{}", ext)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::tmc::location::tests::sample_table;
    use crate::tmc::Table;

    fn event_table() -> EventTable {
        let mut events = EventTable::new();
        events.load_events(&Table::parse(
            "EL",
            "CODE;TEXT_Q;TEXT;X;Y;N;Q;T;D;U;C
101;stationary traffic for $Q km;stationary traffic;;;;1;D;1;;1
401;closed;;;;;;L;2;U;5
402;closed ahead;;;;;;L;2;;5
2047;message cancelled;;;;;;D;1;;31
1497;forecast of $Q;forecast;;;F;;L;2;;34
",
        ));
        events
    }

    fn complete(mut msg: TmcMessage) -> TmcMessage {
        msg.finish();
        msg
    }

    #[test]
    fn test_length_quantizer() {
        assert_eq!(1000, decode_length(0));
        assert_eq!(10, decode_length(10));
        assert_eq!(12, decode_length(11));
        assert_eq!(20, decode_length(15));
        assert_eq!(25, decode_length(16));
        assert_eq!(100, decode_length(31));
    }

    #[test]
    fn test_fields() {
        let events = event_table();
        let mut msg = TmcMessage::new(1, 3, 101, 302, 0xd, Some(1), &events);
        msg.add_field(4, 6, &events);
        msg.add_field(3, 16, &events);
        msg.add_field(1, 0, &events);
        msg.add_field(1, 3, &events);
        msg.add_field(6, 9, &events);
        msg.add_field(9, 401, &events);
        msg.add_field(14, 0, &events);
        msg.add_field(11, 304, &events);
        msg.add_field(7, 31, &events);
        assert_eq!(9, msg.field_count());

        let blocks = msg.information_blocks();
        assert_eq!(2, blocks.len());
        assert_eq!(Some(80), blocks[0].speed());
        assert_eq!(2, blocks[0].events().len());
        assert_eq!(Some(304), blocks[1].destination());
        assert!(blocks[1].events().is_empty());

        let first = &blocks[0].events()[0];
        assert_eq!(Urgency::Urgent, first.urgency());
        assert_eq!("stationary traffic for 20 km", first.text());
        assert_eq!("unknown#9", first.supplementary()[0].text());
        assert!(!msg.is_dynamic());
        assert_eq!(Some(31), msg.start_time());

        let msg = complete(msg);
        assert!(!msg.is_bidirectional());
        let text = msg.to_string();
        assert!(text.starts_with(
            "CC: D, LTN: 1, Location: 302, extent=3, monodirectional, growth direction -, start=07:45\n"
        ));
        assert!(text.contains("[101] stationary traffic for 20 km, urgency=Urgent (Q=6)"));
        assert!(text.contains("speed limit = 80 km/h"));
    }

    #[test]
    fn test_directionality() {
        let events = event_table();
        let msg = complete(TmcMessage::new(0, 0, 401, 302, 0xd, Some(1), &events));
        assert!(msg.is_bidirectional());

        let mut msg = TmcMessage::new(0, 0, 401, 302, 0xd, Some(1), &events);
        msg.add_field(1, 2, &events);
        assert!(!complete(msg).is_bidirectional());

        let mut msg = TmcMessage::new(0, 0, 401, 302, 0xd, Some(1), &events);
        msg.add_field(9, 101, &events);
        assert!(!complete(msg).is_bidirectional());

        // reversal of a unidirectional event
        let mut msg = TmcMessage::new(0, 0, 101, 302, 0xd, Some(1), &events);
        msg.add_field(1, 2, &events);
        let mut msg = complete(msg);
        assert!(msg.is_bidirectional());
        msg.finish();
        assert!(msg.is_bidirectional());
    }

    #[test]
    fn test_overrides() {
        let events = event_table();
        let closed = complete(TmcMessage::new(0, 0, 401, 302, 0xd, Some(1), &events));
        let ahead = complete(TmcMessage::new(0, 0, 402, 302, 0xd, Some(1), &events));
        let elsewhere = complete(TmcMessage::new(0, 0, 402, 303, 0xd, Some(1), &events));
        let other_dir = complete(TmcMessage::new(1, 0, 402, 302, 0xd, Some(1), &events));
        let jam = complete(TmcMessage::new(0, 0, 101, 302, 0xd, Some(1), &events));
        let everywhere = complete(TmcMessage::new(0, 0, 402, ANY_LOCATION, 0xd, Some(1), &events));

        assert!(ahead.overrides(&closed));
        assert!(!elsewhere.overrides(&closed));
        assert!(!other_dir.overrides(&closed));
        assert!(!jam.overrides(&closed));
        assert!(everywhere.overrides(&closed));

        let cancel = complete(TmcMessage::new(0, 0, 2047, 302, 0xd, Some(1), &events));
        assert!(cancel.is_cancellation());
        assert!(!closed.is_cancellation());
    }

    #[test]
    fn test_forecast_duration() {
        let events = event_table();
        let mut a = TmcMessage::new(0, 0, 1497, 302, 0xd, Some(1), &events);
        a.set_single_group_fields(false, 1);
        let mut b = TmcMessage::new(0, 0, 1497, 302, 0xd, Some(1), &events);
        b.set_single_group_fields(false, 2);
        let (a, b) = (complete(a), complete(b));

        assert!(a.is_forecast());
        assert!(!b.overrides(&a));
        assert!(a.overrides(&a.clone()));
    }

    #[test]
    fn test_resolve() {
        let events = event_table();
        let lt = sample_table();

        let mut msg = TmcMessage::new(0, 2, 401, 301, 0xd, Some(1), &events);
        msg.resolve(&lt);
        assert_eq!(Some(301), msg.primary_location().map(|k| k.lcd));
        assert_eq!(Some(303), msg.secondary_location().map(|k| k.lcd));

        let mut msg = TmcMessage::new(1, 9, 401, 302, 0xd, Some(1), &events);
        msg.resolve(&lt);
        assert_eq!(Some(301), msg.secondary_location().map(|k| k.lcd));

        let mut msg = TmcMessage::new(0, 2, 401, 999, 0xd, Some(1), &events);
        msg.resolve(&lt);
        assert_eq!(None, msg.primary_location());

        let mut msg = TmcMessage::new(0, 2, 401, 301, 0xd, None, &events);
        msg.resolve(&lt);
        assert_eq!(None, msg.primary_location());
    }

    #[test]
    fn test_incomplete_display() {
        let msg = TmcMessage::new(0, 0, 401, 302, 0xd, Some(1), &EventTable::new());
        assert_eq!("Incomplete!", msg.to_string());
    }
}
