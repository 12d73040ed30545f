use std::sync::Arc;

use crate::receiver::sync::MAX_HISTORY;
use crate::receiver::RdsReceiver;
use crate::tmc::TmcDatabase;

/// Builds an RDS receiver
///
/// The builder comes with a sensible set of default options,
/// and you can build a working receiver without changing any
/// of them. You will probably want to supply a
/// [TMC database](RdsReceiverBuilder::with_tmc_database) if
/// you intend to decode traffic messages.
///
/// The API specified by the builder is part of this crate's
/// API. The actual default values are *not*, however, and
/// are subject to revision in any minor release. If you
/// care very strongly about a setting, be sure to configure
/// it here.
///
/// ```
/// use rdsurvey::RdsReceiverBuilder;
///
/// let mut rx = RdsReceiverBuilder::new()
///     .with_sync_threshold(2)      // syndrome matches required to lock
///     .with_sync_loss_groups(10)   // invalid groups before unlock
///     .with_pi_tolerance(3)        // PI glitches before a station change
///     .with_rbds(true)             // North American programme types
///     .build();
/// # assert!(rx.station().is_none());
/// ```
#[derive(Clone, Debug)]
pub struct RdsReceiverBuilder {
    sync_threshold: usize,
    sync_confirm_groups: u32,
    sync_loss_groups: u32,
    pi_tolerance: u32,
    rbds: bool,
    tmc_database: Option<Arc<TmcDatabase>>,
}

impl RdsReceiverBuilder {
    /// New receiver chain with "sensible" defaults
    pub fn new() -> Self {
        Self {
            sync_threshold: 2,
            sync_confirm_groups: 5,
            sync_loss_groups: 10,
            pi_tolerance: 3,
            rbds: false,
            tmc_database: None,
        }
    }

    /// Build a receiver chain
    ///
    /// Once built, the receiver chain is immediately ready to
    /// process bits or groups.
    pub fn build(&self) -> RdsReceiver {
        RdsReceiver::from(self)
    }

    /// Syndrome matches required to acquire sync
    ///
    /// While searching, the synchronizer locks once *more than*
    /// `threshold` syndrome matches agree on the same block
    /// alignment. Each block of a clean signal produces one
    /// match, so the default of `2` locks after three clean
    /// blocks. The value is capped at `7`.
    ///
    /// Lower values lock faster but are more prone to locking
    /// onto noise.
    pub fn with_sync_threshold(&mut self, threshold: usize) -> &mut Self {
        self.sync_threshold = usize::clamp(threshold, 0, MAX_HISTORY - 1);
        self
    }

    /// Confirmation window for sync acquisition (groups)
    ///
    /// Syndrome matches older than `groups` groups (of 104
    /// bits each) are forgotten while searching.
    pub fn with_sync_confirm_groups(&mut self, groups: u32) -> &mut Self {
        self.sync_confirm_groups = u32::max(groups, 1);
        self
    }

    /// Invalid groups before sync is lost
    ///
    /// Once locked, the synchronizer gives up after `groups`
    /// consecutive groups in which no block passes its
    /// syndrome check.
    pub fn with_sync_loss_groups(&mut self, groups: u32) -> &mut Self {
        self.sync_loss_groups = u32::max(groups, 1);
        self
    }

    /// Tolerated PI glitches
    ///
    /// A group with a different PI than the tuned station is
    /// ignored. Only after more than `tolerance` such groups
    /// in a row does the decoder accept the new PI as a new
    /// station.
    pub fn with_pi_tolerance(&mut self, tolerance: u32) -> &mut Self {
        self.pi_tolerance = tolerance;
        self
    }

    /// Use RBDS programme type labels
    ///
    /// North American stations (RBDS) use a different table of
    /// programme type names than the rest of the world.
    pub fn with_rbds(&mut self, rbds: bool) -> &mut Self {
        self.rbds = rbds;
        self
    }

    /// TMC event and location database
    ///
    /// Alert-C traffic messages refer to events and locations
    /// by number. Without a database, messages are still
    /// decoded, but their events have no text and their
    /// locations cannot be resolved.
    pub fn with_tmc_database(&mut self, database: Arc<TmcDatabase>) -> &mut Self {
        self.tmc_database = Some(database);
        self
    }

    /// Syndrome matches required to acquire sync
    pub fn sync_threshold(&self) -> usize {
        self.sync_threshold
    }

    /// Confirmation window for sync acquisition (groups)
    pub fn sync_confirm_groups(&self) -> u32 {
        self.sync_confirm_groups
    }

    /// Invalid groups before sync is lost
    pub fn sync_loss_groups(&self) -> u32 {
        self.sync_loss_groups
    }

    /// Tolerated PI glitches
    pub fn pi_tolerance(&self) -> u32 {
        self.pi_tolerance
    }

    /// Use RBDS programme type labels
    pub fn rbds(&self) -> bool {
        self.rbds
    }

    /// TMC event and location database
    pub fn tmc_database(&self) -> Option<&Arc<TmcDatabase>> {
        self.tmc_database.as_ref()
    }
}

impl std::default::Default for RdsReceiverBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits() {
        let mut cfg = RdsReceiverBuilder::default();
        cfg.with_sync_threshold(100)
            .with_sync_confirm_groups(0)
            .with_sync_loss_groups(0);
        assert_eq!(MAX_HISTORY - 1, cfg.sync_threshold());
        assert_eq!(1, cfg.sync_confirm_groups());
        assert_eq!(1, cfg.sync_loss_groups());
        assert!(cfg.tmc_database().is_none());

        cfg.with_tmc_database(Arc::new(TmcDatabase::new()));
        assert!(cfg.tmc_database().is_some());
    }
}
