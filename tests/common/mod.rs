//! Helpers for the catalog zone tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use domain_catz::base::iana::{Class, Rtype};
use domain_catz::base::name::Name;
use domain_catz::base::rdata::{Apl, AplItem, Soa, Txt, ZoneRecordData};
use domain_catz::base::rrset::{Rrset, SharedRrset};
use domain_catz::catz::{
    zone_config, CatalogZone, Entry, HostError, HostZone, UpdateState, View,
    ZoneHost,
};
use domain_catz::zonedb::{
    DbError, DbIterator, MemoryDatabase, NodeId, UpdateNotifier, Version,
    ZoneDatabase,
};

//------------ Logging -------------------------------------------------------

/// Initializes tracing based logging.
///
/// Override the level with the RUST_LOG environment variable, e.g.
/// RUST_LOG=debug.
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_thread_ids(true)
        .without_time()
        .try_init()
        .ok();
}

//------------ Op ------------------------------------------------------------

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Op {
    Add,
    Modify,
    Delete,
}

//------------ RecordingHost -------------------------------------------------

/// A zone table that records all changes made to it.
#[derive(Default)]
pub struct RecordingHost {
    ops: Mutex<Vec<(Op, String, String)>>,
    zones: Mutex<HashMap<Name, Served>>,
}

/// A zone in the table of a [`RecordingHost`].
#[derive(Clone)]
pub struct Served {
    pub catz: Arc<CatalogZone>,
    pub config: String,
}

impl RecordingHost {
    /// Returns and forgets the recorded operations.
    ///
    /// Each operation is given as the operation, the member zone name and
    /// the catalog zone name.
    pub fn take_ops(&self) -> Vec<(Op, String, String)> {
        std::mem::take(&mut *self.ops.lock().unwrap())
    }

    pub fn served(&self, name: &str) -> Option<Served> {
        self.zones.lock().unwrap().get(&name_of(name)).cloned()
    }

    pub fn served_count(&self) -> usize {
        self.zones.lock().unwrap().len()
    }

    fn record(&self, op: Op, entry: &Entry, catz: &CatalogZone) {
        let member = entry
            .name()
            .map(|name| name.to_string())
            .unwrap_or_default();
        self.ops
            .lock()
            .unwrap()
            .push((op, member, catz.name().to_string()));
    }
}

impl ZoneHost for RecordingHost {
    fn add_zone(
        &self,
        entry: &Entry,
        catz: &Arc<CatalogZone>,
        view: &View,
    ) -> Result<(), HostError> {
        self.record(Op::Add, entry, catz);
        let name = entry.name().ok_or(HostError::NotFound)?;
        let config = zone_config(view, catz.name(), entry)
            .map_err(|err| HostError::Failure(err.to_string()))?;
        let mut zones = self.zones.lock().unwrap();
        if zones.contains_key(name) {
            return Err(HostError::Exists);
        }
        zones.insert(
            name.clone(),
            Served {
                catz: catz.clone(),
                config,
            },
        );
        Ok(())
    }

    fn modify_zone(
        &self,
        entry: &Entry,
        catz: &Arc<CatalogZone>,
        view: &View,
    ) -> Result<(), HostError> {
        self.record(Op::Modify, entry, catz);
        let name = entry.name().ok_or(HostError::NotFound)?;
        let config = zone_config(view, catz.name(), entry)
            .map_err(|err| HostError::Failure(err.to_string()))?;
        match self.zones.lock().unwrap().get_mut(name) {
            Some(served) => {
                served.config = config;
                Ok(())
            }
            None => Err(HostError::NotFound),
        }
    }

    fn delete_zone(
        &self,
        entry: &Entry,
        catz: &Arc<CatalogZone>,
        _view: &View,
    ) -> Result<(), HostError> {
        self.record(Op::Delete, entry, catz);
        let name = entry.name().ok_or(HostError::NotFound)?;
        match self.zones.lock().unwrap().remove(name) {
            Some(_) => Ok(()),
            None => Err(HostError::NotFound),
        }
    }

    fn find_zone(
        &self,
        _view: &View,
        name: &Name,
    ) -> Result<Arc<dyn HostZone>, HostError> {
        match self.zones.lock().unwrap().get(name) {
            Some(served) => Ok(Arc::new(served.clone())),
            None => Err(HostError::NotFound),
        }
    }
}

impl HostZone for Served {
    fn parent_catalog(&self) -> Option<Arc<CatalogZone>> {
        Some(self.catz.clone())
    }
}

//------------ Catalog Content -----------------------------------------------

pub fn name_of(s: &str) -> Name {
    Name::from_str(s).unwrap()
}

pub fn soa(origin: &str, serial: u32) -> Rrset {
    Rrset::new(Rtype::SOA, 3600).with_data(ZoneRecordData::Soa(Soa {
        mname: name_of(&format!("ns.{origin}")),
        rname: name_of(&format!("hostmaster.{origin}")),
        serial,
        refresh: 3600,
        retry: 600,
        expire: 86400,
        minimum: 3600,
    }))
}

pub fn ns(target: &str) -> Rrset {
    Rrset::new(Rtype::NS, 3600)
        .with_data(ZoneRecordData::Ns(name_of(target)))
}

pub fn ptr(target: &str) -> Rrset {
    Rrset::new(Rtype::PTR, 3600)
        .with_data(ZoneRecordData::Ptr(name_of(target)))
}

pub fn txt(text: &str) -> Rrset {
    Rrset::new(Rtype::TXT, 3600)
        .with_data(Txt::from_strings([text]).unwrap())
}

pub fn a(addr: [u8; 4]) -> Rrset {
    Rrset::new(Rtype::A, 3600).with_data(std::net::Ipv4Addr::from(addr))
}

pub fn apl(items: Vec<AplItem>) -> Rrset {
    Rrset::new(Rtype::APL, 3600).with_data(Apl::new(items))
}

/// Replaces the content of a catalog zone database.
///
/// The apex SOA and NS records are added automatically. Owner names of
/// `records` are relative to the apex.
pub fn publish(
    db: &MemoryDatabase,
    serial: u32,
    records: Vec<(&str, Rrset)>,
) {
    let origin = db.origin().clone();
    let mut write = db.write();
    write.clear();
    write.add_rrset(&origin, soa(&origin.to_string(), serial));
    write.add_rrset(&origin, ns(&format!("ns.{origin}")));
    for (owner, rrset) in records {
        write.add_rrset(&name_of(&format!("{owner}.{origin}")), rrset);
    }
    write.commit().unwrap();
}

pub fn catalog_db(origin: &str) -> Arc<MemoryDatabase> {
    MemoryDatabase::new(name_of(origin), Class::IN)
}

/// Waits until the update pipeline of a catalog zone is idle.
pub async fn wait_idle(zone: &CatalogZone) {
    wait_for(|| zone.update_state() == UpdateState::Idle).await;
}

/// Waits until a condition becomes true.
///
/// Panics after ten seconds of wall clock time.
pub async fn wait_for(mut cond: impl FnMut() -> bool) {
    let deadline = std::time::Instant::now() + Duration::from_secs(10);
    while !cond() {
        assert!(
            std::time::Instant::now() < deadline,
            "condition not met in time"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

//------------ GatedDatabase -------------------------------------------------

/// A zone database whose walks wait for a gate to open.
///
/// Update notifiers are not registered with the inner database. Tests
/// report new versions to the registry themselves. Whether a notifier is
/// registered is tracked, though.
pub struct GatedDatabase {
    inner: Arc<MemoryDatabase>,
    gate: Mutex<bool>,
    opened: Condvar,
    walks: Mutex<usize>,
    registered: Mutex<bool>,
}

impl GatedDatabase {
    pub fn new(inner: Arc<MemoryDatabase>) -> Arc<Self> {
        Arc::new(GatedDatabase {
            inner,
            gate: Mutex::new(false),
            opened: Condvar::new(),
            walks: Mutex::new(0),
            registered: Mutex::new(false),
        })
    }

    pub fn open(&self) {
        *self.gate.lock().unwrap() = true;
        self.opened.notify_all();
    }

    pub fn walks(&self) -> usize {
        *self.walks.lock().unwrap()
    }

    pub fn is_registered(&self) -> bool {
        *self.registered.lock().unwrap()
    }
}

impl ZoneDatabase for GatedDatabase {
    fn origin(&self) -> &Name {
        self.inner.origin()
    }

    fn class(&self) -> Class {
        self.inner.class()
    }

    fn current_version(&self) -> Version {
        self.inner.current_version()
    }

    fn close_version(&self, version: Version) {
        self.inner.close_version(version)
    }

    fn iterator(&self, version: Version) -> Box<dyn DbIterator> {
        *self.walks.lock().unwrap() += 1;
        let mut open = self.gate.lock().unwrap();
        while !*open {
            open = self.opened.wait(open).unwrap();
        }
        self.inner.iterator(version)
    }

    fn all_rrsets(
        &self,
        node: NodeId,
        version: Version,
    ) -> Result<Vec<SharedRrset>, DbError> {
        self.inner.all_rrsets(node, version)
    }

    fn register_update_notifier(&self, _notifier: Arc<dyn UpdateNotifier>) {
        *self.registered.lock().unwrap() = true;
    }

    fn unregister_update_notifier(
        &self,
        _notifier: &Arc<dyn UpdateNotifier>,
    ) {
        *self.registered.lock().unwrap() = false;
    }
}
