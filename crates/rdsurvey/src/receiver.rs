//! Full receiver chain

mod output;
pub mod sync;

#[cfg(not(test))]
use log::{info, trace};

#[cfg(test)]
use std::println as trace;
#[cfg(test)]
use std::println as info;

use std::collections::{vec_deque, VecDeque};
use std::convert::From;
use std::iter::{IntoIterator, Iterator};

use crate::builder::RdsReceiverBuilder;
use crate::decoder::GroupDecoder;
use crate::group::Group;
use crate::station::{Station, StationWatch};
use crate::syndrome::GROUP_BITS;

pub use output::{LogEvent, RdsEvent};
pub use sync::{BitSynchronizer, SyncOut};

/// RDS receiver
///
/// The receiver binds by iterator to a source of bits, with
/// [`iter()`](RdsReceiver::iter), or to a source of already
/// framed groups, with [`iter_groups()`](RdsReceiver::iter_groups).
/// Either iterator yields [`RdsEvent`] as they occur and ends
/// with [`LogEvent::EndOfStream`] once its source is
/// exhausted.
///
/// Everything the receiver learns about the tuned station is
/// available from [`station()`](RdsReceiver::station), or from
/// any thread via [`subscribe()`](RdsReceiver::subscribe).
///
/// ```
/// use rdsurvey::{Group, LogEvent, RdsReceiverBuilder};
///
/// let groups: Vec<Group> = [
///     "F202 0408 5C66 2043",
///     "F202 0409 5C62 554C",
///     "F202 040A 1E5C 5455",
///     "F202 040F 1C5C 5245",
/// ]
/// .iter()
/// .map(|l| l.parse().unwrap())
/// .collect();
///
/// let mut rx = RdsReceiverBuilder::new().build();
/// let events: Vec<LogEvent> = rx
///     .iter_groups(groups)
///     .map(|evt| evt.into_inner())
///     .collect();
///
/// assert_eq!(LogEvent::StationTuned { pi: 0xf202 }, events[0]);
/// assert_eq!(LogEvent::EndOfStream, events[2]);
/// assert_eq!(" CULTURE", rx.station().unwrap().station_name());
/// ```
#[derive(Debug)]
pub struct RdsReceiver {
    sync: BitSynchronizer,
    decoder: GroupDecoder,
    pending: VecDeque<RdsEvent>,
    group_count: u64,
    bit_time: u64,
}

impl RdsReceiver {
    /// Bind to a source of bits
    ///
    /// Returns an iterator of the receiver's events. Bits are
    /// consumed only as fast as the iterator is driven.
    #[must_use = "iterators are lazy and do nothing unless consumed"]
    pub fn iter<'rx, I, T>(&'rx mut self, input: I) -> SourceIter<'rx, T>
    where
        I: IntoIterator<Item = bool> + IntoIterator<IntoIter = T>,
        T: Iterator<Item = bool>,
    {
        SourceIter {
            source: input.into_iter(),
            receiver: self,
            finished: false,
        }
    }

    /// Bind to a source of groups
    ///
    /// The synchronizer is bypassed. Returns an iterator of
    /// the receiver's events.
    #[must_use = "iterators are lazy and do nothing unless consumed"]
    pub fn iter_groups<'rx, I, T>(&'rx mut self, input: I) -> GroupIter<'rx, T>
    where
        I: IntoIterator<Item = Group> + IntoIterator<IntoIter = T>,
        T: Iterator<Item = Group>,
    {
        GroupIter {
            source: input.into_iter(),
            receiver: self,
            finished: false,
        }
    }

    /// Process one bit
    ///
    /// Returns the group completed by this bit, if any. Events
    /// are queued; collect them with
    /// [`events()`](RdsReceiver::events).
    pub fn input_bit(&mut self, bit: bool) -> Option<Group> {
        let out = self.sync.input(bit);
        self.bit_time = self.sync.bit_time();
        match out {
            SyncOut::Searching => None,
            SyncOut::Acquired(_) => {
                self.push(LogEvent::SyncAcquired);
                None
            }
            SyncOut::Group(group) => {
                self.input_group(&group);
                Some(group)
            }
            SyncOut::Lost(group) => {
                self.push(LogEvent::SyncLost);
                self.decoder.lose_sync();
                self.input_group(&group);
                Some(group)
            }
        }
    }

    /// Process one framed group
    ///
    /// Events are queued; collect them with
    /// [`events()`](RdsReceiver::events).
    pub fn input_group(&mut self, group: &Group) {
        self.group_count += 1;
        self.bit_time = u64::max(self.bit_time, group.bit_time());
        if self.group_count % Self::TRACE_LOG_INTERVAL_GROUPS == 0 {
            trace!(
                "[{:<14}]: {} groups, quality {:0.2}",
                self.bit_time,
                self.group_count,
                self.decoder.quality()
            );
        }

        let events = self.decoder.process_group(group);
        for evt in events {
            self.pending.push_back(RdsEvent::new(evt, group.bit_time()));
        }
    }

    /// Signal the end of input
    ///
    /// Queues the loss of the tuned station, if any, and
    /// [`LogEvent::EndOfStream`].
    pub fn end(&mut self) {
        self.end_station();
        self.push(LogEvent::EndOfStream);
    }

    /// Signal a retune
    ///
    /// Queues the loss of the tuned station, if any. The input
    /// continues, so no [`LogEvent::EndOfStream`] is queued.
    /// Drain the events before calling
    /// [`reset()`](RdsReceiver::reset).
    pub fn end_station(&mut self) {
        if let Some(evt) = self.decoder.finish() {
            self.push(evt);
        }
    }

    /// Drain queued events
    pub fn events(&mut self) -> vec_deque::Drain<'_, RdsEvent> {
        self.pending.drain(..)
    }

    /// The tuned station, if any
    pub fn station(&self) -> Option<&Station> {
        self.decoder.station()
    }

    /// Subscribe to station snapshots
    ///
    /// See [`GroupDecoder::subscribe()`].
    pub fn subscribe(&mut self) -> StationWatch {
        self.decoder.subscribe()
    }

    /// Fraction of valid blocks in the last 40 groups
    pub fn quality(&self) -> f32 {
        self.decoder.quality()
    }

    /// True if the synchronizer is locked
    pub fn is_synced(&self) -> bool {
        self.sync.is_synced()
    }

    /// Time of the latest input, in bits
    ///
    /// For bit sources, this is the count of bits received.
    /// For group sources, it is the bit time of the latest
    /// group.
    pub fn bit_time(&self) -> u64 {
        self.bit_time
    }

    /// Number of groups decoded
    pub fn group_count(&self) -> u64 {
        self.group_count
    }

    /// Reset to zero initial conditions
    ///
    /// The tuned station and any queued events are
    /// discarded.
    pub fn reset(&mut self) {
        self.sync.reset();
        self.decoder.reset();
        self.pending.clear();
        self.group_count = 0;
        self.bit_time = 0;
    }

    fn push(&mut self, evt: LogEvent) {
        self.pending.push_back(RdsEvent::new(evt, self.bit_time));
    }

    fn next_event(&mut self) -> Option<RdsEvent> {
        let out = self.pending.pop_front()?;
        info!("receiver {}", out);
        Some(out)
    }

    // Print trace-level messages about once per minute
    const TRACE_LOG_INTERVAL_GROUPS: u64 = 60 * 1187 / GROUP_BITS as u64;
}

impl From<&RdsReceiverBuilder> for RdsReceiver {
    fn from(cfg: &RdsReceiverBuilder) -> Self {
        Self {
            sync: BitSynchronizer::new(
                cfg.sync_threshold(),
                cfg.sync_confirm_groups(),
                cfg.sync_loss_groups(),
            ),
            decoder: GroupDecoder::new(
                cfg.pi_tolerance(),
                cfg.rbds(),
                cfg.tmc_database().cloned(),
            ),
            pending: VecDeque::new(),
            group_count: 0,
            bit_time: 0,
        }
    }
}

/// Bit source iterator
///
/// This iterator is bound to a source of bits. Calling the
/// `next()` method returns the next [`RdsEvent`] from the
/// receiver. When the source is exhausted, the loss of the
/// tuned station and the end of the stream are reported, and
/// then the iterator returns `None`.
#[derive(Debug)]
pub struct SourceIter<'rx, I>
where
    I: Iterator<Item = bool>,
{
    source: I,
    receiver: &'rx mut RdsReceiver,
    finished: bool,
}

impl<'rx, I> Iterator for SourceIter<'rx, I>
where
    I: Iterator<Item = bool>,
{
    type Item = RdsEvent;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(evt) = self.receiver.next_event() {
                return Some(evt);
            }
            if self.finished {
                return None;
            }
            match self.source.next() {
                Some(bit) => {
                    self.receiver.input_bit(bit);
                }
                None => {
                    self.receiver.end();
                    self.finished = true;
                }
            }
        }
    }
}

/// Group source iterator
///
/// Like [`SourceIter`], but bound to a source of framed
/// groups, such as a [`HexDumpReader`](crate::hexdump::HexDumpReader).
#[derive(Debug)]
pub struct GroupIter<'rx, I>
where
    I: Iterator<Item = Group>,
{
    source: I,
    receiver: &'rx mut RdsReceiver,
    finished: bool,
}

impl<'rx, I> Iterator for GroupIter<'rx, I>
where
    I: Iterator<Item = Group>,
{
    type Item = RdsEvent;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(evt) = self.receiver.next_event() {
                return Some(evt);
            }
            if self.finished {
                return None;
            }
            match self.source.next() {
                Some(group) => self.receiver.input_group(&group),
                None => {
                    self.receiver.end();
                    self.finished = true;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::syndrome::{encode, BlockPosition, BLOCK_BITS};

    fn group_bits(words: [u16; 4]) -> impl Iterator<Item = bool> {
        let positions = [
            BlockPosition::A,
            BlockPosition::B,
            BlockPosition::C,
            BlockPosition::D,
        ];
        words
            .into_iter()
            .zip(positions)
            .flat_map(|(w, pos)| {
                let block = encode(w, pos);
                (0..BLOCK_BITS).rev().map(move |b| (block >> b) & 1 == 1)
            })
    }

    fn culture_bits() -> Vec<bool> {
        [
            [0xf202, 0x0408, 0x5c66, 0x2043],
            [0xf202, 0x0409, 0x5c62, 0x554c],
            [0xf202, 0x040a, 0x1e5c, 0x5455],
            [0xf202, 0x040f, 0x1c5c, 0x5245],
        ]
        .into_iter()
        .flat_map(group_bits)
        .collect()
    }

    #[test]
    fn test_bits_to_station() {
        let mut rx = RdsReceiverBuilder::new().build();
        let mut bits = culture_bits();
        bits.extend(culture_bits());
        bits.extend(std::iter::repeat(false).take(12 * GROUP_BITS as usize));

        let events: Vec<LogEvent> = rx.iter(bits).map(RdsEvent::into_inner).collect();
        assert_eq!(
            vec![
                LogEvent::SyncAcquired,
                LogEvent::StationTuned { pi: 0xf202 },
                LogEvent::SyncLost,
                LogEvent::StationLost { pi: 0xf202 },
                LogEvent::EndOfStream,
            ],
            events
        );
        assert_eq!(" CULTURE", rx.station().expect("station").station_name());
        assert!(!rx.is_synced());
    }

    #[test]
    fn test_input_bit() {
        let mut rx = RdsReceiverBuilder::new().build();
        let mut groups = vec![];
        for bit in culture_bits().into_iter().chain(culture_bits()) {
            groups.extend(rx.input_bit(bit));
        }
        assert!(rx.is_synced());
        assert_eq!(
            Some("F202 040F 1C5C 5245".to_owned()),
            groups.last().map(Group::to_string)
        );

        let events: Vec<RdsEvent> = rx.events().collect();
        assert_eq!(&LogEvent::SyncAcquired, events[0].what());
        assert_eq!(&LogEvent::StationTuned { pi: 0xf202 }, events[1].what());
        assert_eq!(0, rx.events().count());
    }

    #[test]
    fn test_empty_source() {
        let mut rx = RdsReceiverBuilder::new().build();
        let events: Vec<RdsEvent> = rx.iter(std::iter::empty::<bool>()).collect();
        assert_eq!(1, events.len());
        assert!(events[0].what().is_end());
    }

    #[test]
    fn test_end_station() {
        let mut rx = RdsReceiverBuilder::new().build();
        for _ in rx.iter(culture_bits()) {}
        rx.end_station();
        let events: Vec<LogEvent> = rx.events().map(RdsEvent::into_inner).collect();
        assert_eq!(vec![LogEvent::StationLost { pi: 0xf202 }], events);

        rx.reset();
        rx.end_station();
        assert_eq!(0, rx.events().count());
    }

    #[test]
    fn test_reset() {
        let mut rx = RdsReceiverBuilder::new().build();
        for _ in rx.iter(culture_bits()) {}
        assert!(rx.station().is_some());
        rx.reset();
        assert!(rx.station().is_none());
        assert_eq!(0, rx.bit_time());
        assert_eq!(0, rx.group_count());
    }
}
