//! The update pipeline of a catalog zone.
//!
//! When the database of a catalog zone announces a new version, the zone
//! goes from idle to pending and a debounce timer is started. It fires
//! right away unless the last update started less than the minimum update
//! interval ago. When it fires, the zone is running: the database is
//! walked and parsed on a blocking thread, and the result is merged into
//! the live zone. New versions arriving while pending or running only
//! replace the version to process next. Once the run is done, the timer is
//! started again if another version is pending.

use core::iter;
use core::time::Duration;

use std::sync::Arc;

use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};

use super::error::UpdateError;
use super::parse::{is_processable, ParsedCatalog};
use super::registry::CatalogZones;
use super::zone::{same_db, CatalogZone, ResultText, ZoneState};
use crate::base::iana::Rtype;
use crate::base::name::{Label, Name};
use crate::base::rdata::ZoneRecordData;
use crate::zonedb::{DbError, DbIterator, NodeId, Version, ZoneDatabase};

impl CatalogZone {
    /// Processes the news of a new version of the zone's database.
    pub(super) fn db_updated(
        self: &Arc<Self>,
        registry: &CatalogZones,
        db: Arc<dyn ZoneDatabase>,
    ) {
        let mut state = self.state.lock();

        if let Some(old) = state.db.take() {
            if same_db(&old, &db) {
                state.db = Some(old);
            } else {
                debug!(
                    "catz({:p}): {}: database replaced, detaching",
                    Arc::as_ptr(self), self.name
                );
                if let Some(version) = state.db_version.take() {
                    old.close_version(version);
                }
                old.unregister_update_notifier(registry.notifier_ref());
            }
        }
        if state.db.is_none() {
            db.register_update_notifier(registry.notifier());
            state.db = Some(db.clone());
        }

        if !state.pending && !state.running {
            state.pending = true;
            state.db_version = Some(db.current_version());
            self.start_timer(registry, &mut state);
        } else {
            state.pending = true;
            debug!(
                "catz({:p}): {}: update already queued or running",
                Arc::as_ptr(self), self.name
            );
            if let Some(version) = state.db_version.take() {
                db.close_version(version);
            }
            state.db_version = Some(db.current_version());
        }
    }

    /// Starts the debounce timer.
    fn start_timer(
        self: &Arc<Self>,
        registry: &CatalogZones,
        state: &mut ZoneState,
    ) {
        let interval = u64::from(state.default_options.min_update_interval);
        let mut delay = Duration::ZERO;
        if let Some(last) = state.last_updated {
            let elapsed = last.elapsed().as_secs();
            if elapsed < interval {
                let defer = interval - elapsed;
                info!(
                    "catz({:p}): {}: new zone version came too soon, \
                     deferring update for {} seconds",
                    Arc::as_ptr(self), self.name, defer
                );
                delay = Duration::from_secs(defer);
            }
        }

        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        let zone = self.clone();
        state.timer = Some(registry.runtime().spawn(async move {
            if !delay.is_zero() {
                sleep(delay).await;
            }
            zone.timer_fired();
        }));
    }

    /// Starts an update run once the debounce timer has fired.
    fn timer_fired(self: &Arc<Self>) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        if registry.is_shutting_down() {
            return;
        }

        let mut state = self.state.lock();
        state.timer = None;
        state.pending = false;
        state.running = true;
        state.last_updated = Some(Instant::now());

        let db = state.db.clone();
        let version = state.db_version.take();
        let (Some(db), Some(version)) = (db, version) else {
            state.running = false;
            return;
        };

        if !state.active {
            info!(
                "catz({:p}): {}: no longer active, reload is canceled",
                Arc::as_ptr(self), self.name
            );
            db.close_version(version);
            state.running = false;
            return;
        }

        state.update_version = Some(version);
        state.metrics.update_started();
        info!(
            "catz({:p}): {}: reload start",
            Arc::as_ptr(self),
            self.name
        );
        drop(state);

        let zone = self.clone();
        let runtime = registry.runtime().clone();
        runtime.spawn(async move {
            zone.run_update(registry, db, version).await
        });
    }

    /// Performs an update run.
    async fn run_update(
        self: Arc<Self>,
        registry: Arc<CatalogZones>,
        db: Arc<dyn ZoneDatabase>,
        version: Version,
    ) {
        let walker = self.clone();
        let walk_registry = registry.clone();
        let walk_db = db.clone();
        let walked = tokio::task::spawn_blocking(move || {
            walker.walk(&walk_registry, &walk_db, version)
        })
        .await;
        let walked = match walked {
            Ok(walked) => walked,
            Err(err) => {
                error!(
                    "catz({:p}): {}: update task failed: {err}",
                    self, self.name
                );
                Err(UpdateError::Canceled)
            }
        };

        let result = walked
            .and_then(|candidate| self.apply(&registry, &db, candidate));

        self.update_done(&registry, &db, result);
    }

    /// Walks the database and parses its content.
    fn walk(
        &self,
        registry: &CatalogZones,
        db: &Arc<dyn ZoneDatabase>,
        version: Version,
    ) -> Result<ParsedCatalog, UpdateError> {
        let origin = db.origin();
        if registry.is_shutting_down() {
            return Err(UpdateError::ShuttingDown);
        }
        match registry.zone_get(origin) {
            None => {
                error!("catz({:p}): zone '{}' not in config", self, origin);
                return Err(UpdateError::NotFound);
            }
            Some(zone) if !core::ptr::eq(Arc::as_ptr(&zone), self) => {
                info!(
                    "catz({:p}): zone '{}' is no longer active",
                    self, origin
                );
                return Err(UpdateError::Canceled);
            }
            Some(_) => {}
        }
        if !self.is_active() {
            info!("catz({:p}): zone '{}' is no longer active", self, origin);
            return Err(UpdateError::Canceled);
        }

        let mut it = db.iterator(version);
        let serial = self.soa_serial(db, it.as_mut(), version)?;
        info!(
            "catz({:p}): updating catalog zone '{}' with serial {}",
            self, origin, serial
        );

        let mut candidate = ParsedCatalog::new(origin.clone());

        // The version goes first as the other properties depend on it.
        let version_node = match version_name(origin) {
            Some(name) => match it.seek(&name) {
                Ok(()) => {
                    let (node, name) = it.current()?;
                    self.process_node(
                        &mut candidate,
                        db,
                        node,
                        &name,
                        version,
                    )?;
                    Some(node)
                }
                Err(DbError::NotFound) => None,
                Err(err) => return Err(err.into()),
            },
            None => None,
        };
        if version_node.is_none() {
            warn!(
                "catz({:p}): zone '{}' has no 'version' record",
                self, origin
            );
            candidate.mark_broken();
        }

        let mut res = it.first();
        while res.is_ok() {
            if registry.is_shutting_down() {
                return Err(UpdateError::ShuttingDown);
            }
            let (node, name) = it.current()?;
            if Some(node) != version_node {
                self.process_node(&mut candidate, db, node, &name, version)?;
            }
            res = it.next();
        }
        match res {
            Err(DbError::NoMore) => {}
            Err(err) => return Err(err.into()),
            Ok(()) => {}
        }
        debug!("catz({:p}): {}: iteration finished", self, origin);
        Ok(candidate)
    }

    /// Returns the serial of the SOA record at the apex.
    fn soa_serial(
        &self,
        db: &Arc<dyn ZoneDatabase>,
        it: &mut dyn DbIterator,
        version: Version,
    ) -> Result<u32, UpdateError> {
        let serial = match it.seek(db.origin()) {
            Ok(()) => {
                let (node, _) = it.current()?;
                db.all_rrsets(node, version)?.iter().find_map(|rrset| {
                    match rrset.first() {
                        Some(ZoneRecordData::Soa(soa))
                            if rrset.rtype() == Rtype::SOA =>
                        {
                            Some(soa.serial)
                        }
                        _ => None,
                    }
                })
            }
            Err(DbError::NotFound) => None,
            Err(err) => return Err(err.into()),
        };
        serial.ok_or_else(|| {
            error!(
                "catz({:p}): zone '{}' has no SOA record",
                self,
                db.origin()
            );
            UpdateError::NoSoa
        })
    }

    /// Feeds all RRsets of a node to the parser.
    fn process_node(
        &self,
        candidate: &mut ParsedCatalog,
        db: &Arc<dyn ZoneDatabase>,
        node: NodeId,
        name: &Name,
        version: Version,
    ) -> Result<(), UpdateError> {
        let class = db.class();
        for rrset in db.all_rrsets(node, version)? {
            if !is_processable(rrset.rtype()) {
                continue;
            }
            if let Err(err) = candidate.process_rrset(name, class, &rrset) {
                warn!(
                    "catz({:p}): invalid record in catalog zone - \
                     {} {} {} ({}) - ignoring",
                    self,
                    name,
                    class,
                    rrset.rtype(),
                    err
                );
            }
        }
        Ok(())
    }

    /// Checks the schema version and merges a usable candidate.
    ///
    /// Nothing is merged if the zone was removed from the registry or
    /// replaced by another zone while the database was walked.
    fn apply(
        self: &Arc<Self>,
        registry: &CatalogZones,
        db: &Arc<dyn ZoneDatabase>,
        mut candidate: ParsedCatalog,
    ) -> Result<(), UpdateError> {
        let mut state = self.state.lock();
        if registry.is_shutting_down() {
            return Err(UpdateError::ShuttingDown);
        }
        let current = registry
            .zone_get(&self.name)
            .map(|zone| Arc::ptr_eq(&zone, self))
            .unwrap_or(false);
        if !state.active || !current {
            info!(
                "catz({:p}): zone '{}' is no longer active",
                Arc::as_ptr(self), self.name
            );
            return Err(UpdateError::Canceled);
        }

        // Without a valid version record, the current one stays.
        let version = candidate.version().or(state.version);
        match version {
            None => {
                warn!(
                    "catz({:p}): zone '{}' version is not set",
                    Arc::as_ptr(self), self.name
                );
                candidate.mark_broken();
            }
            Some(1) | Some(2) => state.version = version,
            Some(version) => {
                warn!(
                    "catz({:p}): zone '{}' unsupported version '{}'",
                    Arc::as_ptr(self), self.name, version
                );
                candidate.mark_broken();
            }
        }

        state.broken = candidate.is_broken();
        if state.broken {
            error!(
                "catz({:p}): new catalog zone '{}' is broken and will \
                 not be processed",
                Arc::as_ptr(self), self.name
            );
            return Err(UpdateError::Broken);
        }

        self.merge_locked(&mut state, registry, candidate);
        debug!(
            "catz({:p}): {}: new zone merged",
            Arc::as_ptr(self),
            self.name
        );

        // A catalog zone configured from an already loaded zone never had
        // its notifier registered at load time. A database detached in the
        // meantime must stay detached.
        let attached = match &state.db {
            Some(current) => same_db(current, db),
            None => false,
        };
        if state.active && attached {
            db.register_update_notifier(registry.notifier());
        }
        Ok(())
    }

    /// Finishes an update run.
    fn update_done(
        self: &Arc<Self>,
        registry: &CatalogZones,
        db: &Arc<dyn ZoneDatabase>,
        result: Result<(), UpdateError>,
    ) {
        let mut state = self.state.lock();
        state.running = false;
        if let Some(version) = state.update_version.take() {
            db.close_version(version);
        }
        state.metrics.update_finished(&result);
        if !registry.is_shutting_down() && state.pending {
            self.start_timer(registry, &mut state);
        }
        info!(
            "catz({:p}): {}: reload done: {}",
            Arc::as_ptr(self),
            self.name,
            ResultText(&result)
        );
    }
}

/// Returns the name of the version property of a catalog zone.
fn version_name(origin: &Name) -> Option<Name> {
    let label = Label::from_slice(b"version").ok()?;
    Name::from_labels(iter::once(label).chain(origin.iter())).ok()
}

//============ Testing =======================================================
