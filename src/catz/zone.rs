//! A catalog zone and its live state.

use core::fmt;

use std::sync::{Arc, Weak};

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::trace;

use super::coo::CooStore;
use super::entry::EntryStore;
use super::error::UpdateError;
use super::options::Options;
use super::registry::CatalogZones;
use crate::base::name::Name;
use crate::zonedb::{UpdateNotifier, Version, ZoneDatabase};

//------------ CatalogZone ---------------------------------------------------

/// A catalog zone known to a [`CatalogZones`] registry.
///
/// The catalog zone holds the member zone entries and change of ownership
/// permissions of the most recently merged content of the zone. Both can
/// be read at any time without blocking: readers get a snapshot that stays
/// valid even if a merge replaces it.
///
/// Everything else is protected by a per-zone lock: the options, the
/// schema version, and the state of the update pipeline.
pub struct CatalogZone {
    pub(super) name: Name,
    pub(super) registry: Weak<CatalogZones>,
    pub(super) entries: ArcSwap<EntryStore>,
    pub(super) coos: ArcSwap<CooStore>,
    pub(super) state: Mutex<ZoneState>,
}

/// The lock protected part of a catalog zone.
pub(super) struct ZoneState {
    /// The options from server configuration.
    pub(super) default_options: Options,

    /// The zone-wide options declared in the catalog zone.
    ///
    /// Unset values are filled in from the default options.
    pub(super) zone_options: Options,

    /// The schema version of the last merged content.
    pub(super) version: Option<u32>,

    /// Whether the zone is still part of the server configuration.
    pub(super) active: bool,

    /// Whether the last update run found the content to be unusable.
    pub(super) broken: bool,

    /// A new version of the database waits for processing.
    pub(super) pending: bool,

    /// An update run is in progress.
    pub(super) running: bool,

    /// When the last update run was started.
    pub(super) last_updated: Option<Instant>,

    /// The database the catalog zone is read from.
    pub(super) db: Option<Arc<dyn ZoneDatabase>>,

    /// The newest database version not yet processed.
    pub(super) db_version: Option<Version>,

    /// The database version processed by the running update.
    pub(super) update_version: Option<Version>,

    /// The debounce timer task.
    pub(super) timer: Option<JoinHandle<()>>,

    pub(super) metrics: UpdateMetrics,
}

impl CatalogZone {
    pub(super) fn new(name: Name, registry: Weak<CatalogZones>) -> Arc<Self> {
        Arc::new(CatalogZone {
            name,
            registry,
            entries: ArcSwap::from_pointee(EntryStore::new()),
            coos: ArcSwap::from_pointee(CooStore::new()),
            state: Mutex::new(ZoneState {
                default_options: Options::new(),
                zone_options: Options::new(),
                version: None,
                active: true,
                broken: false,
                pending: false,
                running: false,
                last_updated: None,
                db: None,
                db_version: None,
                update_version: None,
                timer: None,
                metrics: UpdateMetrics::default(),
            }),
        })
    }

    /// Returns the name of the catalog zone.
    pub fn name(&self) -> &Name {
        &self.name
    }

    /// Returns the member zone entries of the last merged content.
    pub fn entries(&self) -> Arc<EntryStore> {
        self.entries.load_full()
    }

    /// Returns the change of ownership permissions of the last merge.
    pub fn coos(&self) -> Arc<CooStore> {
        self.coos.load_full()
    }

    pub fn update_state(&self) -> UpdateState {
        let state = self.state.lock();
        if state.running {
            UpdateState::Running
        } else if state.pending {
            UpdateState::Pending
        } else {
            UpdateState::Idle
        }
    }

    /// Returns whether the zone is part of the current configuration.
    pub fn is_active(&self) -> bool {
        self.state.lock().active
    }

    /// Returns whether the last update run found unusable content.
    pub fn is_broken(&self) -> bool {
        self.state.lock().broken
    }

    /// Returns the schema version of the last merged content.
    pub fn version(&self) -> Option<u32> {
        self.state.lock().version
    }

    /// Returns the zone-wide options including defaults.
    pub fn zone_options(&self) -> Options {
        self.state.lock().zone_options.clone()
    }

    /// Returns the options taken from server configuration.
    pub fn default_options(&self) -> Options {
        self.state.lock().default_options.clone()
    }

    /// Sets the options taken from server configuration.
    ///
    /// The new options are used from the next update run on.
    pub fn set_default_options(&self, options: Options) {
        self.state.lock().default_options = options;
    }

    /// Resets the options taken from server configuration.
    ///
    /// This is used when the server configuration is reloaded before the
    /// defaults are set again.
    pub fn reset_default_options(&self) {
        self.state.lock().default_options = Options::new();
    }

    pub fn metrics(&self) -> UpdateMetrics {
        self.state.lock().metrics.clone()
    }

    pub(super) fn set_active(&self, active: bool) {
        self.state.lock().active = active;
    }

    /// Stops the debounce timer if it is running.
    pub(super) fn stop_timer(&self) {
        if let Some(timer) = self.state.lock().timer.take() {
            trace!("catz({:p}): {}: stopping update timer", self, self.name);
            timer.abort();
        }
    }

    /// Detaches the zone from its database.
    pub(super) fn detach_db(&self, notifier: &Arc<dyn UpdateNotifier>) {
        let mut state = self.state.lock();
        let Some(db) = state.db.take() else {
            return;
        };
        if let Some(version) = state.db_version.take() {
            db.close_version(version);
        }
        db.unregister_update_notifier(notifier);
    }
}

//--- Drop

impl Drop for CatalogZone {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        if let Some(db) = state.db.take() {
            if let Some(version) = state.db_version.take() {
                db.close_version(version);
            }
            if let Some(version) = state.update_version.take() {
                db.close_version(version);
            }
        }
    }
}

//--- Debug

impl fmt::Debug for CatalogZone {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("CatalogZone")
            .field("name", &self.name)
            .field("update_state", &self.update_state())
            .finish()
    }
}

/// Returns whether two handles refer to the same database.
///
/// Only the data pointers are compared as vtable pointers of the same type
/// may differ between codegen units.
pub(super) fn same_db(
    left: &Arc<dyn ZoneDatabase>,
    right: &Arc<dyn ZoneDatabase>,
) -> bool {
    core::ptr::eq(
        Arc::as_ptr(left) as *const (),
        Arc::as_ptr(right) as *const (),
    )
}

//------------ UpdateState ---------------------------------------------------

/// The state of the update pipeline of a catalog zone.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UpdateState {
    /// Nothing to do.
    Idle,

    /// A new database version waits for the debounce timer.
    Pending,

    /// An update run is in progress.
    ///
    /// Another database version may be pending at the same time.
    Running,
}

//--- Display

impl fmt::Display for UpdateState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            UpdateState::Idle => f.write_str("idle"),
            UpdateState::Pending => f.write_str("pending"),
            UpdateState::Running => f.write_str("running"),
        }
    }
}

//------------ UpdateMetrics -------------------------------------------------

/// Statistics of the update runs of a catalog zone.
#[derive(Clone, Debug)]
pub struct UpdateMetrics {
    pub zone_created_at: Instant,

    /// None means never started
    pub last_update_started_at: Option<Instant>,

    /// None means never finished
    pub last_update_finished_at: Option<Instant>,

    /// The number of update runs started.
    pub updates_started: u64,

    /// The number of update runs finished, successful or not.
    pub updates_completed: u64,

    /// The number of update runs that ended in a merge.
    pub updates_merged: u64,

    /// None means never finished
    pub last_update_result: Option<Result<(), UpdateError>>,
}

impl UpdateMetrics {
    pub(super) fn update_started(&mut self) {
        self.updates_started += 1;
        self.last_update_started_at = Some(Instant::now());
    }

    pub(super) fn update_finished(
        &mut self,
        result: &Result<(), UpdateError>,
    ) {
        self.updates_completed += 1;
        if result.is_ok() {
            self.updates_merged += 1;
        }
        self.last_update_finished_at = Some(Instant::now());
        self.last_update_result = Some(result.clone());
    }
}

impl Default for UpdateMetrics {
    fn default() -> Self {
        Self {
            zone_created_at: Instant::now(),
            last_update_started_at: Default::default(),
            last_update_finished_at: Default::default(),
            updates_started: 0,
            updates_completed: 0,
            updates_merged: 0,
            last_update_result: None,
        }
    }
}

//------------ ResultText ----------------------------------------------------

/// Displays the outcome of an operation for log messages.
pub(super) struct ResultText<'a, E>(pub(super) &'a Result<(), E>);

impl<E: fmt::Display> fmt::Display for ResultText<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.0 {
            Ok(()) => f.write_str("success"),
            Err(err) => err.fmt(f),
        }
    }
}
