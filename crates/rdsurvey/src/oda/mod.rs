//! Open data applications
//!
//! Group types which are not reserved for a fixed purpose may
//! carry an *open data application* (ODA). A station
//! announces each application in group 3A by its application
//! ID (AID), together with the group type which carries it.
//! The [`OdaRegistry`] keeps one routing slot per group type
//! and version, and the group decoder forwards each group to
//! the [`Application`] routed for its type.
//!
//! Some applications predate the ODA mechanism and are
//! routed by other means: radio paging is announced in group
//! 1A, in-house data always uses group 6, and old TMC
//! services identify themselves in group 1A.

mod alertc;
mod inhouse;
mod paging;

use std::fmt;
use std::sync::Arc;

use phf::phf_map;

#[cfg(not(test))]
use log::{info, warn};
#[cfg(test)]
use std::{println as info, println as warn};

use crate::group::{Group, GroupType, GroupVersion};
use crate::tmc::TmcDatabase;

pub use alertc::{decode_mgs, AlertC, SystemInfo, TmcOtherNetwork, ALERT_C_AID};
pub use inhouse::{InHouse, InHouseData};
pub use paging::{Paging, PagingKind, PagingMessage, RP_TNGD};

// Application IDs with a name
static AID_CODEBOOK: phf::Map<u16, &'static str> = phf_map! {
    0xcd46u16 => "TMC/Alert-C",
    0x4b02u16 => "TMC/Alert-C with Alert-Plus",
    0x4bd7u16 => "RadioText+",
    0x0093u16 => "EN 301 700 (DAB cross-referencing)",
};

/// Name of an application ID, if known
///
/// ```
/// use rdsurvey::oda::aid_name;
///
/// assert_eq!(Some("TMC/Alert-C"), aid_name(0xcd46));
/// assert_eq!(None, aid_name(0x1234));
/// ```
pub fn aid_name(aid: u16) -> Option<&'static str> {
    AID_CODEBOOK.get(&aid).copied()
}

/// Describe the announced target group of an application
///
/// Group 0A means that the application is carried in group
/// 3A only, and group 15B signals a temporary data fault.
pub fn target_name(target: GroupType) -> String {
    match (target.number(), target.version()) {
        (0, GroupVersion::A) => "only in group 3A".to_owned(),
        (15, GroupVersion::B) => "temporary data fault".to_owned(),
        _ => format!("group {}", target),
    }
}

/// True if `target` names a group which can be routed
fn is_routable(target: GroupType) -> bool {
    !matches!(
        (target.number(), target.version()),
        (0, GroupVersion::A) | (15, GroupVersion::B)
    )
}

/// A data application
///
/// Every variant decodes groups through
/// [`receive_group()`](Application::receive_group).
#[derive(Clone, Debug)]
pub enum Application {
    /// TMC/Alert-C, with or without Alert-Plus
    AlertC { aid: u16, decoder: Box<AlertC> },

    /// Radio paging
    Paging(Paging),

    /// In-house data
    InHouse(InHouse),

    /// An application which this crate does not decode
    ///
    /// Groups are counted but otherwise ignored.
    Unrecognized { aid: u16, group_count: u32 },
}

impl Application {
    /// Application for an announced AID
    ///
    /// The TMC `database` is used only for Alert-C.
    pub fn for_aid(aid: u16, database: Option<Arc<TmcDatabase>>) -> Self {
        match aid {
            0xcd46 | 0x4b02 => Application::AlertC {
                aid,
                decoder: Box::new(AlertC::new(database)),
            },
            _ => Application::Unrecognized {
                aid,
                group_count: 0,
            },
        }
    }

    /// Application name
    pub fn name(&self) -> &'static str {
        match self {
            Application::AlertC { aid, .. } => aid_name(*aid).unwrap_or("TMC/Alert-C"),
            Application::Paging(_) => "Paging",
            Application::InHouse(_) => "In-house",
            Application::Unrecognized { aid, .. } => aid_name(*aid).unwrap_or("Unknown"),
        }
    }

    /// Application ID
    ///
    /// `None` for applications which are not routed by AID.
    pub fn aid(&self) -> Option<u16> {
        match self {
            Application::AlertC { aid, .. } | Application::Unrecognized { aid, .. } => Some(*aid),
            Application::Paging(_) | Application::InHouse(_) => None,
        }
    }

    /// Decode one group routed to this application
    pub fn receive_group(&mut self, group: &Group) {
        match self {
            Application::AlertC { decoder, .. } => decoder.receive_group(group),
            Application::Paging(paging) => paging.receive_group(group),
            Application::InHouse(inhouse) => inhouse.receive_group(group),
            Application::Unrecognized { group_count, .. } => *group_count += 1,
        }
    }

    /// The Alert-C decoder, if this is Alert-C
    pub fn as_alert_c(&self) -> Option<&AlertC> {
        match self {
            Application::AlertC { decoder, .. } => Some(decoder.as_ref()),
            _ => None,
        }
    }

    /// The paging decoder, if this is paging
    pub fn as_paging(&self) -> Option<&Paging> {
        match self {
            Application::Paging(paging) => Some(paging),
            _ => None,
        }
    }

    pub(crate) fn as_paging_mut(&mut self) -> Option<&mut Paging> {
        match self {
            Application::Paging(paging) => Some(paging),
            _ => None,
        }
    }

    /// The in-house data, if this is in-house data
    pub fn as_in_house(&self) -> Option<&InHouse> {
        match self {
            Application::InHouse(inhouse) => Some(inhouse),
            _ => None,
        }
    }
}

impl fmt::Display for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())?;
        if let Some(aid) = self.aid() {
            write!(f, " [AID {:04X}]", aid)?;
        }
        match self {
            Application::AlertC { decoder, .. } => write!(f, ": {}", decoder),
            Application::Paging(paging) => write!(f, ": {}", paging),
            Application::InHouse(inhouse) => write!(f, ": {}", inhouse),
            Application::Unrecognized { group_count, .. } => {
                write!(f, ": {} groups", group_count)
            }
        }
    }
}

/// Routing of group types to applications
///
/// Applications are stored once each, in order of first
/// announcement. Each of the 32 group type slots routes to
/// at most one of them.
///
/// Once a slot is routed it is never displaced. A later
/// announcement of a different application for the same
/// group type is logged and ignored.
#[derive(Clone, Debug, Default)]
pub struct OdaRegistry {
    apps: Vec<Application>,
    slots: [Option<usize>; GroupType::COUNT],
}

impl OdaRegistry {
    /// No applications
    pub fn new() -> Self {
        Self::default()
    }

    /// Every application, in order of first announcement
    pub fn applications(&self) -> impl Iterator<Item = &Application> {
        self.apps.iter()
    }

    /// Application routed for `group_type`
    pub fn get(&self, group_type: GroupType) -> Option<&Application> {
        self.slots[group_type.index()].map(|i| &self.apps[i])
    }

    /// Mutable application routed for `group_type`
    pub fn get_mut(&mut self, group_type: GroupType) -> Option<&mut Application> {
        match self.slots[group_type.index()] {
            Some(i) => Some(&mut self.apps[i]),
            None => None,
        }
    }

    /// Application with the given AID
    pub fn by_aid(&self, aid: u16) -> Option<&Application> {
        self.apps.iter().find(|app| app.aid() == Some(aid))
    }

    /// The Alert-C decoder, wherever it is routed
    pub fn alert_c(&self) -> Option<&AlertC> {
        self.apps.iter().find_map(Application::as_alert_c)
    }

    /// Process a group 3A announcement
    ///
    /// The application for `aid` is created on its first
    /// announcement and routed to `target`, unless `target`
    /// already routes to another application. Returns the
    /// announced application.
    pub(crate) fn announce(
        &mut self,
        target: GroupType,
        aid: u16,
        database: Option<&Arc<TmcDatabase>>,
    ) -> &mut Application {
        let idx = match self.apps.iter().position(|app| app.aid() == Some(aid)) {
            Some(idx) => idx,
            None => {
                info!(
                    "oda: {} [AID {:04X}] announced, {}",
                    aid_name(aid).unwrap_or("unknown application"),
                    aid,
                    target_name(target)
                );
                self.apps.push(Application::for_aid(aid, database.cloned()));
                self.apps.len() - 1
            }
        };

        if is_routable(target) {
            match self.slots[target.index()] {
                None => self.slots[target.index()] = Some(idx),
                Some(current) if current != idx => {
                    warn!(
                        "oda: AID {:04X} announced for group {}, which carries {}",
                        aid,
                        target,
                        self.apps[current].name()
                    );
                }
                Some(_) => {}
            }
        }

        &mut self.apps[idx]
    }

    /// Route `group_type` to `app` unless it is already routed
    ///
    /// Returns the application routed for `group_type`, which
    /// may be an existing one.
    pub(crate) fn route_if_empty(
        &mut self,
        group_type: GroupType,
        app: Application,
    ) -> &mut Application {
        let idx = match self.slots[group_type.index()] {
            Some(idx) => idx,
            None => {
                info!("oda: {} routed to group {}", app.name(), group_type);
                self.apps.push(app);
                let idx = self.apps.len() - 1;
                self.slots[group_type.index()] = Some(idx);
                idx
            }
        };
        &mut self.apps[idx]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GROUP_8A: GroupType = GroupType::new(8, GroupVersion::A);

    #[test]
    fn test_announce() {
        let mut reg = OdaRegistry::new();
        let app = reg.announce(GROUP_8A, ALERT_C_AID, None);
        assert_eq!("TMC/Alert-C", app.name());
        assert!(reg.get(GROUP_8A).and_then(Application::as_alert_c).is_some());
        assert!(reg.alert_c().is_some());

        // repeated announcement does not create another
        reg.announce(GROUP_8A, ALERT_C_AID, None);
        assert_eq!(1, reg.applications().count());

        // conflicting announcement is ignored
        reg.announce(GROUP_8A, 0x4bd7, None);
        assert_eq!(Some(ALERT_C_AID), reg.get(GROUP_8A).and_then(Application::aid));
        assert_eq!(2, reg.applications().count());
        assert_eq!("RadioText+", reg.by_aid(0x4bd7).expect("rt+").name());
    }

    #[test]
    fn test_unroutable_targets() {
        let mut reg = OdaRegistry::new();
        reg.announce(GroupType::new(0, GroupVersion::A), 0x4bd7, None);
        reg.announce(GroupType::new(15, GroupVersion::B), 0x1234, None);
        assert!(reg.get(GroupType::new(0, GroupVersion::A)).is_none());
        assert!(reg.get(GroupType::new(15, GroupVersion::B)).is_none());
        assert_eq!(2, reg.applications().count());
        assert_eq!("only in group 3A", target_name(GroupType::new(0, GroupVersion::A)));
        assert_eq!("group 11A", target_name(GroupType::new(11, GroupVersion::A)));
    }

    #[test]
    fn test_unrecognized_counts_groups() {
        let mut reg = OdaRegistry::new();
        let target = GroupType::new(11, GroupVersion::A);
        reg.announce(target, 0x1234, None);

        let group = Group::from_words([0xf202, 0xb000, 0, 0], 0);
        if let Some(app) = reg.get_mut(target) {
            app.receive_group(&group);
            app.receive_group(&group);
        }
        let app = reg.get(target).expect("app");
        assert_eq!("Unknown [AID 1234]: 2 groups", app.to_string());
    }

    #[test]
    fn test_route_if_empty() {
        let mut reg = OdaRegistry::new();
        let rp = GroupType::new(7, GroupVersion::A);
        reg.route_if_empty(rp, Application::Paging(Paging::new(1)));
        let app = reg.route_if_empty(rp, Application::InHouse(InHouse::new()));
        assert!(app.as_paging().is_some());
        assert_eq!(1, reg.applications().count());
    }
}
