//! Event lists and location tables, loaded together

use std::path::Path;

#[cfg(not(test))]
use log::info;
#[cfg(test)]
use std::println as info;

use super::event::EventTable;
use super::location::LocationTable;
use super::table::TableErr;

/// Everything needed to render traffic messages
///
/// The database is read-only once loaded. Share it between
/// receivers with an `Arc`.
///
/// ```
/// use rdsurvey::tmc::{EventTable, LocationTable, TmcDatabase};
///
/// let db = TmcDatabase::new()
///     .with_events(EventTable::new())
///     .with_locations(LocationTable::new());
/// assert!(db.events().is_empty());
/// assert!(db.locations().is_empty());
/// ```
#[derive(Clone, Debug, Default)]
pub struct TmcDatabase {
    events: EventTable,
    locations: LocationTable,
}

impl TmcDatabase {
    /// Empty database
    ///
    /// Events decode as placeholders and no locations
    /// resolve.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every table found in `dir`
    ///
    /// The event list `EL.DAT` and supplementary information
    /// `SIL.DAT` are optional, as are the location table
    /// files. A directory with none of them yields an empty
    /// database.
    pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<Self, TableErr> {
        let dir = dir.as_ref();
        let events = if dir.join("EL.DAT").exists() {
            EventTable::load_dir(dir)?
        } else {
            EventTable::new()
        };
        let locations = LocationTable::load_dir(dir)?;

        info!(
            "tmc: loaded {} events and {} locations from {}",
            events.len(),
            locations.len(),
            dir.display()
        );

        Ok(Self { events, locations })
    }

    /// Replace the event list
    pub fn with_events(mut self, events: EventTable) -> Self {
        self.events = events;
        self
    }

    /// Replace the location tables
    pub fn with_locations(mut self, locations: LocationTable) -> Self {
        self.locations = locations;
        self
    }

    /// Event and supplementary information lists
    pub fn events(&self) -> &EventTable {
        &self.events
    }

    /// Location tables
    pub fn locations(&self) -> &LocationTable {
        &self.locations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    #[test]
    fn test_load_dir() {
        let dir = std::env::temp_dir().join(format!("rdsurvey-tmcdb-{}", std::process::id()));
        fs::create_dir_all(&dir).expect("tmpdir");
        fs::write(
            dir.join("EL.DAT"),
            "CODE;TEXT_Q;TEXT;X;Y;N;Q;T;D;U;C\n401;closed;;;;;;L;2;U;5\n",
        )
        .expect("write");
        fs::write(dir.join("countries.dat"), "CID;ECC;CCD;CNAME\n58;E0;D;Germany\n")
            .expect("write");

        let db = TmcDatabase::load_dir(&dir).expect("load");
        assert_eq!("closed", db.events().get(401).text());
        assert!(db.locations().country(58).is_some());

        fs::remove_dir_all(&dir).expect("cleanup");
    }

    #[test]
    fn test_missing_dir() {
        assert!(TmcDatabase::load_dir("/nonexistent/rdsurvey/tmc").is_err());
    }
}
