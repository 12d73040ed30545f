//! Traffic Message Channel
//!
//! TMC carries traffic messages in the RDS data channel as an
//! open data application. Each message is an *event*, coded
//! against a standard event list, at a *location*, coded
//! against a national location table. This module provides
//!
//! * the [`Bitstream`] used to reassemble multi-group
//!   messages;
//! * the [`TmcMessage`] model with its labelled fields;
//! * event and supplementary information lists
//!   ([`EventTable`]);
//! * location tables ([`LocationTable`]), which are a
//!   hierarchy of areas, roads, segments, and points; and
//! * the [`LocationComparator`], which orders locations
//!   along a road.
//!
//! The group-level decoding lives in the Alert-C
//! application handler of the `oda` module.

mod bitstream;
mod comparator;
mod database;
mod event;
mod location;
mod message;
mod table;

pub use bitstream::Bitstream;
pub use comparator::LocationComparator;
pub use database::TmcDatabase;
pub use event::{
    format_quantifier, DurationType, EventNature, EventTable, SupplementaryInfo, TmcEvent, Urgency,
};
pub use location::{
    Country, Location, LocationClass, LocationDataset, LocationKey, LocationKind, LocationRecord,
    LocationTable,
};
pub use message::{
    decode_length, format_time, Event, InformationBlock, TmcMessage, ANY_LOCATION, LABEL_SIZES,
};
pub use table::{Row, Table, TableErr};

#[cfg(test)]
pub(crate) use location::tests::sample_table;
