//! # rdsurvey: RDS/RBDS and TMC Decoding
//!
//! This crate decodes the
//! [Radio Data System](https://en.wikipedia.org/wiki/Radio_Data_System)
//! (RDS), and its North American variant RBDS, into station
//! information. It also decodes traffic messages sent with the
//! TMC/Alert-C protocol and resolves their locations against
//! national location tables.
//!
//! ## Disclaimer
//!
//! This crate is dual-licensed MIT and Apache 2.0. Read these licenses
//! carefully as they may affect your rights.
//!
//! Traffic messages decoded by this crate are only as good as the
//! signal and the location tables you give it. Do not rely on it for
//! navigation or for anything safety-critical.
//!
//! ## Example
//!
//! You will first need to recover the RDS *bitstream* from an FM
//! broadcast. This means demodulating the 57 kHz subcarrier and
//! decoding the differential biphase symbols into bits. Doing so is
//! beyond the scope of this crate. Many software-defined radio
//! programs can do it for you, and some can write the bits or the
//! decoded groups to a file.
//!
//! ```
//! use rdsurvey::{LogEvent, RdsReceiverBuilder};
//!
//! # let some_bit_source_iterator = || std::iter::once(false);
//! #
//! // create an RdsReceiver
//! let mut rx = RdsReceiverBuilder::new()
//!     .with_sync_threshold(2)       // syndrome matches required to lock
//!     .with_pi_tolerance(3)         // PI glitches before a station change
//!     .build();
//!
//! // let bitsrc be an iterator which outputs bits, in order
//! // of reception
//! let bitsrc = some_bit_source_iterator();
//! for evt in rx.iter(bitsrc) {
//!     match evt.what() {
//!         LogEvent::StationTuned { pi } => println!("tuned to {:04X}", pi),
//!         LogEvent::ClockTime(ct) => println!("the time is {}", ct),
//!         _ => {}
//!     }
//! }
//! ```
//!
//! The digital receiver is created via a
//! [builder](struct.RdsReceiverBuilder.html).
//!
//! The [`RdsReceiver`](struct.RdsReceiver.html) binds by iterator to any
//! source of `bool` bits. If you already have framed groups, such as
//! those read from a hex dump with a
//! [`HexDumpReader`](hexdump::HexDumpReader), use
//! [`iter_groups()`](RdsReceiver::iter_groups) instead.
//!
//! The iterator yields an [`RdsEvent`] whenever something happens:
//! synchronization is acquired or lost, a station is tuned or lost,
//! the station sends the time, or another network starts a traffic
//! announcement. Everything else the station sends accumulates in the
//! [`Station`], which you may inspect at any time.
//!
//! ```
//! use rdsurvey::{Group, RdsReceiverBuilder};
//!
//! let groups = [
//!     "F202 0408 5C66 2043",
//!     "F202 0409 5C62 554C",
//!     "F202 040A 1E5C 5455",
//!     "F202 040F 1C5C 5245",
//! ];
//!
//! let mut rx = RdsReceiverBuilder::new().build();
//! for line in groups {
//!     let group: Group = line.parse().expect("bad group");
//!     rx.input_group(&group);
//! }
//!
//! let station = rx.station().expect("no station");
//! assert_eq!(0xf202, station.pi());
//! assert_eq!(" CULTURE", station.station_name());
//! ```
//!
//! ## Open data applications and TMC
//!
//! Stations announce *open data applications* (ODAs) in group 3A.
//! The [`Station`] keeps an [`OdaRegistry`](oda::OdaRegistry) of
//! every application it has seen. Radio paging, in-house data, and
//! TMC/Alert-C are decoded; other applications are counted.
//!
//! Traffic messages refer to events and locations by number. To turn
//! them into text, load a [`TmcDatabase`](tmc::TmcDatabase) from a
//! directory of location tables in the Alert-C exchange format and
//! give it to the builder.
//!
//! ## Background
//!
//! RDS sends 1187.5 bits per second on a subcarrier of an FM
//! broadcast. Bits are grouped into 26-bit *blocks*, each of which
//! carries 16 bits of information and a 10-bit check word. Four
//! blocks make a *group*. The check word of each block is offset by
//! a different word for each position in the group, which lets the
//! receiver find the group structure in an unframed bitstream.
//!
//! Every group carries the programme identification (PI) code of the
//! station and a group type. There are 32 group types, numbered 0A
//! through 15B, and each carries a different fragment of information.
//!
//! ## Crate features
//!
//! * `chrono`: Convert [clock time](ClockTime) to a true
//!   [`DateTime`](chrono::DateTime). If enabled, `chrono` becomes
//!   part of this crate's public API.

mod builder;

pub mod decoder;
pub mod group;
pub mod hexdump;
pub mod oda;
pub mod receiver;
pub mod station;
pub mod syndrome;
pub mod tmc;

pub use builder::RdsReceiverBuilder;
pub use decoder::{ClockTime, GroupDecoder};
pub use group::{Group, GroupParseErr, GroupType, GroupVersion};
pub use receiver::{GroupIter, LogEvent, RdsEvent, RdsReceiver, SourceIter};
pub use station::{OtherNetwork, ServiceInfo, Station, StationWatch};
