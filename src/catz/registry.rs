//! The catalog zones of a view.

use core::fmt;
use core::sync::atomic::{AtomicBool, Ordering};

use std::collections::HashMap;
use std::string::String;
use std::sync::{Arc, Weak};
use std::vec::Vec;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tracing::{debug, warn};

use super::error::RegistryError;
use super::host::ZoneHost;
use super::parse::ParsedCatalog;
use super::zone::CatalogZone;
use crate::base::name::Name;
use crate::zonedb::{UpdateNotifier, ZoneDatabase};

//------------ View ----------------------------------------------------------

/// A view of the host server.
///
/// Catalog zones and the member zones they declare belong to a view.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct View {
    name: String,
}

impl View {
    pub fn new(name: impl Into<String>) -> Self {
        View { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.name)
    }
}

//------------ CatalogZones --------------------------------------------------

type ZoneMap = HashMap<Name, Arc<CatalogZone>>;

/// The catalog zones configured for a view.
///
/// The registry keeps track of the catalog zones and receives notifications
/// about new versions of their databases. It uses the [`ZoneHost`] given
/// upon creation to provision the member zones.
///
/// Timers and update runs are spawned onto the Tokio runtime given upon
/// creation. The runtime must have its time driver enabled.
///
/// Across a reload of the server configuration, the registry is used as
/// follows: call [`prereconfig`][Self::prereconfig] first, then
/// [`zone_add_or_get`][Self::zone_add_or_get] for every catalog zone in
/// the new configuration, and finally
/// [`postreconfig`][Self::postreconfig] which removes all catalog zones
/// that are not part of the configuration anymore.
pub struct CatalogZones {
    view: ArcSwap<View>,
    host: Arc<dyn ZoneHost>,
    runtime: Handle,
    zones: ArcSwap<ZoneMap>,

    /// Serializes changes to `zones`.
    write: Mutex<()>,

    shutting_down: AtomicBool,
    notifier: Arc<dyn UpdateNotifier>,
    me: Weak<CatalogZones>,
}

impl CatalogZones {
    pub fn new(
        view: View,
        host: Arc<dyn ZoneHost>,
        runtime: Handle,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me| CatalogZones {
            view: ArcSwap::from_pointee(view),
            host,
            runtime,
            zones: ArcSwap::from_pointee(ZoneMap::new()),
            write: Mutex::new(()),
            shutting_down: AtomicBool::new(false),
            notifier: Arc::new(RegistryNotifier {
                registry: me.clone(),
            }),
            me: me.clone(),
        })
    }

    pub fn view(&self) -> Arc<View> {
        self.view.load_full()
    }

    /// Replaces the view during a reconfiguration.
    ///
    /// The new view must have the same name as the current one.
    pub fn set_view(&self, view: View) -> Result<(), RegistryError> {
        if view.name() != self.view.load().name() {
            return Err(RegistryError::ViewMismatch);
        }
        self.view.store(Arc::new(view));
        Ok(())
    }

    pub fn host(&self) -> &Arc<dyn ZoneHost> {
        &self.host
    }

    pub(super) fn runtime(&self) -> &Handle {
        &self.runtime
    }

    /// Returns the notifier to register with catalog zone databases.
    ///
    /// The notifier is registered automatically once the registry has
    /// learned about a database via [`db_updated`][Self::db_updated].
    pub fn notifier(&self) -> Arc<dyn UpdateNotifier> {
        self.notifier.clone()
    }

    pub(super) fn notifier_ref(&self) -> &Arc<dyn UpdateNotifier> {
        &self.notifier
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::Acquire)
    }

    /// Returns the catalog zone with the given name, adding it if needed.
    ///
    /// If the zone exists but has been deactivated by
    /// [`prereconfig`][Self::prereconfig], it is activated again and keeps
    /// its state.
    pub fn zone_add_or_get(
        &self,
        name: Name,
    ) -> Result<Arc<CatalogZone>, RegistryError> {
        debug!("catz: add zone {}", name);
        if self.is_shutting_down() {
            return Err(RegistryError::ShuttingDown);
        }

        let _write = self.write.lock();
        let zones = self.zones.load_full();
        if let Some(zone) = zones.get(&name) {
            zone.set_active(true);
            return Ok(zone.clone());
        }
        let zone = CatalogZone::new(name.clone(), self.me.clone());
        let mut zones = ZoneMap::clone(&zones);
        zones.insert(name, zone.clone());
        self.zones.store(Arc::new(zones));
        Ok(zone)
    }

    /// Returns the catalog zone with the given name.
    pub fn zone_get(&self, name: &Name) -> Option<Arc<CatalogZone>> {
        if self.is_shutting_down() {
            return None;
        }
        self.zones.load().get(name).cloned()
    }

    /// Returns all catalog zones.
    pub fn zones(&self) -> Vec<Arc<CatalogZone>> {
        self.zones.load().values().cloned().collect()
    }

    /// Processes the news of a new version of a catalog zone database.
    ///
    /// The host server calls this when it has loaded a catalog zone. For
    /// later versions, the database will call the registry's notifier.
    pub fn db_updated(&self, db: Arc<dyn ZoneDatabase>) {
        if self.is_shutting_down() {
            return;
        }
        let Some(zone) = self.zone_get(db.origin()) else {
            debug!("catz: zone '{}' not in config", db.origin());
            return;
        };
        zone.db_updated(self, db);
    }

    /// Prepares for a reconfiguration.
    ///
    /// Marks all catalog zones as inactive.
    pub fn prereconfig(&self) {
        if self.is_shutting_down() {
            return;
        }
        for zone in self.zones.load().values() {
            zone.set_active(false);
        }
    }

    /// Finishes a reconfiguration.
    ///
    /// Removes all catalog zones that are still inactive, i.e., that have
    /// not been added again since [`prereconfig`][Self::prereconfig].
    /// Their member zones are deleted.
    pub fn postreconfig(&self) {
        if self.is_shutting_down() {
            return;
        }

        let removed: Vec<_> = {
            let _write = self.write.lock();
            let zones = self.zones.load_full();
            let (active, removed): (ZoneMap, ZoneMap) = zones
                .iter()
                .map(|(name, zone)| (name.clone(), zone.clone()))
                .partition(|(_, zone)| zone.is_active());
            self.zones.store(Arc::new(active));
            removed.into_values().collect()
        };

        for zone in removed {
            warn!("catz({:p}): removing catalog zone {}", zone, zone.name());
            zone.merge(self, ParsedCatalog::new(zone.name().clone()));
            zone.stop_timer();
            zone.detach_db(&self.notifier);
        }
    }

    /// Shuts down the registry.
    ///
    /// Update runs in progress finish without merging. Afterwards, the
    /// registry doesn't know any catalog zones.
    pub fn shutdown(&self) {
        self.shutting_down.store(true, Ordering::Release);
        let zones = {
            let _write = self.write.lock();
            self.zones.swap(Arc::new(ZoneMap::new()))
        };
        for zone in zones.values() {
            zone.set_active(false);
            zone.stop_timer();
            zone.detach_db(&self.notifier);
        }
    }
}

//------------ RegistryNotifier ----------------------------------------------

/// Forwards database updates to a registry.
struct RegistryNotifier {
    registry: Weak<CatalogZones>,
}

impl UpdateNotifier for RegistryNotifier {
    fn on_update(&self, db: Arc<dyn ZoneDatabase>) {
        if let Some(registry) = self.registry.upgrade() {
            registry.db_updated(db)
        }
    }
}

//============ Testing =======================================================
