//! A versioned in-memory zone database.

use std::boxed::Box;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Weak};
use std::vec::Vec;

use parking_lot::{Mutex, RwLock};
use tracing::trace;

use super::{
    DbError, DbIterator, NodeId, UpdateNotifier, Version, ZoneDatabase,
};
use crate::base::iana::{Class, Rtype};
use crate::base::name::Name;
use crate::base::rrset::{Rrset, SharedRrset};

//------------ Type Aliases --------------------------------------------------

type Content = BTreeMap<Name, Vec<SharedRrset>>;

//------------ MemoryDatabase ------------------------------------------------

/// A zone database keeping all versions of a zone in memory.
///
/// Every committed [`WriteDatabase`] creates a new version. Versions are
/// kept around as long as they are current or open. Registered update
/// notifiers are called after each commit.
pub struct MemoryDatabase {
    origin: Name,
    class: Class,
    me: Weak<MemoryDatabase>,
    data: RwLock<Data>,
    notifiers: Mutex<Vec<Arc<dyn UpdateNotifier>>>,
}

struct Data {
    /// The names of all nodes ever created, indexed by node ID.
    nodes: Vec<Name>,

    /// The node IDs of all nodes ever created.
    node_ids: HashMap<Name, NodeId>,

    /// The current version.
    current: Version,

    /// The retained versions.
    versions: HashMap<Version, Snapshot>,
}

struct Snapshot {
    content: Arc<Content>,
    open: usize,
}

impl MemoryDatabase {
    /// Creates a new, empty database for the zone `origin`.
    pub fn new(origin: Name, class: Class) -> Arc<Self> {
        let mut versions = HashMap::new();
        versions.insert(
            Version::default(),
            Snapshot {
                content: Default::default(),
                open: 0,
            },
        );
        Arc::new_cyclic(|me| MemoryDatabase {
            origin,
            class,
            me: me.clone(),
            data: RwLock::new(Data {
                nodes: Vec::new(),
                node_ids: HashMap::new(),
                current: Version::default(),
                versions,
            }),
            notifiers: Mutex::new(Vec::new()),
        })
    }

    /// Starts creating a new version of the database.
    ///
    /// The new version starts out with the content of the current version.
    pub fn write(&self) -> WriteDatabase {
        let data = self.data.read();
        let content = data
            .versions
            .get(&data.current)
            .map(|snapshot| snapshot.content.as_ref().clone())
            .unwrap_or_default();
        WriteDatabase {
            db: self.me.clone(),
            content,
        }
    }

    /// Returns the number of versions currently retained.
    pub fn retained_versions(&self) -> usize {
        self.data.read().versions.len()
    }

    fn commit(&self, content: Content) -> Version {
        let version = {
            let mut data = self.data.write();
            for name in content.keys() {
                if !data.node_ids.contains_key(name) {
                    let id = NodeId::from_index(data.nodes.len());
                    data.nodes.push(name.clone());
                    data.node_ids.insert(name.clone(), id);
                }
            }
            let old = data.current;
            let version = old.next();
            data.versions.insert(
                version,
                Snapshot {
                    content: Arc::new(content),
                    open: 0,
                },
            );
            data.current = version;
            if data.versions.get(&old).map(|snapshot| snapshot.open) == Some(0)
            {
                data.versions.remove(&old);
            }
            version
        };

        trace!("{}: committed version {version}", self.origin);

        let Some(me) = self.me.upgrade() else {
            return version;
        };
        let notifiers = self.notifiers.lock().clone();
        for notifier in notifiers {
            notifier.on_update(me.clone());
        }
        version
    }
}

//--- ZoneDatabase

impl ZoneDatabase for MemoryDatabase {
    fn origin(&self) -> &Name {
        &self.origin
    }

    fn class(&self) -> Class {
        self.class
    }

    fn current_version(&self) -> Version {
        let mut data = self.data.write();
        let current = data.current;
        if let Some(snapshot) = data.versions.get_mut(&current) {
            snapshot.open += 1;
        }
        current
    }

    fn close_version(&self, version: Version) {
        let mut data = self.data.write();
        let current = data.current;
        let Some(snapshot) = data.versions.get_mut(&version) else {
            return;
        };
        snapshot.open = snapshot.open.saturating_sub(1);
        if snapshot.open == 0 && version != current {
            data.versions.remove(&version);
        }
    }

    fn iterator(&self, version: Version) -> Box<dyn DbIterator> {
        let data = self.data.read();
        let nodes = data
            .versions
            .get(&version)
            .map(|snapshot| {
                snapshot
                    .content
                    .keys()
                    .filter_map(|name| {
                        data.node_ids.get(name).map(|id| (*id, name.clone()))
                    })
                    .collect()
            })
            .unwrap_or_default();
        Box::new(MemoryIterator { nodes, pos: None })
    }

    fn all_rrsets(
        &self,
        node: NodeId,
        version: Version,
    ) -> Result<Vec<SharedRrset>, DbError> {
        let data = self.data.read();
        let snapshot =
            data.versions.get(&version).ok_or(DbError::UnknownVersion)?;
        let name = data.nodes.get(node.index()).ok_or(DbError::UnknownNode)?;
        Ok(snapshot.content.get(name).cloned().unwrap_or_default())
    }

    fn register_update_notifier(&self, notifier: Arc<dyn UpdateNotifier>) {
        let mut notifiers = self.notifiers.lock();
        if !notifiers.iter().any(|item| same_notifier(item, &notifier)) {
            notifiers.push(notifier);
        }
    }

    fn unregister_update_notifier(&self, notifier: &Arc<dyn UpdateNotifier>) {
        self.notifiers
            .lock()
            .retain(|item| !same_notifier(item, notifier));
    }
}

/// Compares notifiers by the address of their data only.
fn same_notifier(
    left: &Arc<dyn UpdateNotifier>,
    right: &Arc<dyn UpdateNotifier>,
) -> bool {
    core::ptr::eq(
        Arc::as_ptr(left) as *const (),
        Arc::as_ptr(right) as *const (),
    )
}

//------------ WriteDatabase -------------------------------------------------

/// A new version of a [`MemoryDatabase`] under construction.
///
/// Nothing is visible to readers until [`commit`][Self::commit] is called.
/// Owner names are not checked against the apex of the zone.
pub struct WriteDatabase {
    db: Weak<MemoryDatabase>,
    content: Content,
}

impl WriteDatabase {
    /// Adds an RRset at `owner`, replacing an RRset of the same type.
    pub fn add_rrset(&mut self, owner: &Name, rrset: Rrset) -> &mut Self {
        let rrsets = self.content.entry(owner.clone()).or_default();
        rrsets.retain(|item| item.rtype() != rrset.rtype());
        rrsets.push(rrset.into_shared());
        self
    }

    /// Removes the RRset of type `rtype` at `owner`.
    pub fn remove_rrset(&mut self, owner: &Name, rtype: Rtype) -> &mut Self {
        if let Some(rrsets) = self.content.get_mut(owner) {
            rrsets.retain(|item| item.rtype() != rtype);
            if rrsets.is_empty() {
                self.content.remove(owner);
            }
        }
        self
    }

    /// Removes all content.
    pub fn clear(&mut self) -> &mut Self {
        self.content.clear();
        self
    }

    /// Removes all RRsets at `owner`.
    pub fn remove_node(&mut self, owner: &Name) -> &mut Self {
        self.content.remove(owner);
        self
    }

    /// Publishes the new version and notifies all update notifiers.
    ///
    /// Returns `None` if the database has been dropped in the meantime.
    pub fn commit(self) -> Option<Version> {
        let db = self.db.upgrade()?;
        Some(db.commit(self.content))
    }
}

//------------ MemoryIterator ------------------------------------------------

struct MemoryIterator {
    nodes: Vec<(NodeId, Name)>,
    pos: Option<usize>,
}

impl DbIterator for MemoryIterator {
    fn seek(&mut self, name: &Name) -> Result<(), DbError> {
        match self.nodes.binary_search_by(|(_, item)| item.cmp(name)) {
            Ok(pos) => {
                self.pos = Some(pos);
                Ok(())
            }
            Err(pos) => {
                self.pos = Some(pos);
                Err(DbError::NotFound)
            }
        }
    }

    fn first(&mut self) -> Result<(), DbError> {
        self.pos = Some(0);
        if self.nodes.is_empty() {
            Err(DbError::NoMore)
        } else {
            Ok(())
        }
    }

    fn next(&mut self) -> Result<(), DbError> {
        let next = self.pos.map(|pos| pos + 1).unwrap_or(0);
        self.pos = Some(next);
        if next < self.nodes.len() {
            Ok(())
        } else {
            Err(DbError::NoMore)
        }
    }

    fn current(&self) -> Result<(NodeId, Name), DbError> {
        self.pos
            .and_then(|pos| self.nodes.get(pos))
            .cloned()
            .ok_or(DbError::NoMore)
    }
}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;
    use crate::base::rdata::ZoneRecordData;
    use core::str::FromStr;
    use std::net::Ipv4Addr;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn name(s: &str) -> Name {
        Name::from_str(s).unwrap()
    }

    fn a(addr: Ipv4Addr) -> Rrset {
        Rrset::new(Rtype::A, 3600).with_data(addr)
    }

    #[derive(Default)]
    struct Counter(AtomicUsize);

    impl UpdateNotifier for Counter {
        fn on_update(&self, _db: Arc<dyn ZoneDatabase>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn versions_are_isolated() {
        let db = MemoryDatabase::new(name("example.com"), Class::IN);
        let owner = name("www.example.com");
        let mut write = db.write();
        write.add_rrset(&owner, a(Ipv4Addr::new(192, 0, 2, 1)));
        let v1 = write.commit().unwrap();

        let open = db.current_version();
        assert_eq!(open, v1);

        let mut write = db.write();
        write.remove_node(&owner);
        let v2 = write.commit().unwrap();
        assert_ne!(v1, v2);
        assert_eq!(db.retained_versions(), 2);

        let mut it = db.iterator(v2);
        assert_eq!(it.first(), Err(DbError::NoMore));

        let mut it = db.iterator(v1);
        it.seek(&owner).unwrap();
        let (node, name) = it.current().unwrap();
        assert_eq!(name, owner);
        assert_eq!(db.all_rrsets(node, v1).unwrap().len(), 1);
        assert!(db.all_rrsets(node, v2).unwrap().is_empty());

        db.close_version(open);
        assert_eq!(db.retained_versions(), 1);
        assert_eq!(db.all_rrsets(node, v1), Err(DbError::UnknownVersion));
    }

    #[test]
    fn iterator_order_and_seek() {
        let db = MemoryDatabase::new(name("example.com"), Class::IN);
        let mut write = db.write();
        for owner in ["b.example.com", "example.com", "a.b.example.com"] {
            write.add_rrset(&name(owner), a(Ipv4Addr::LOCALHOST));
        }
        let version = write.commit().unwrap();

        let mut it = db.iterator(version);
        it.first().unwrap();
        let mut seen = Vec::new();
        loop {
            seen.push(it.current().unwrap().1);
            if it.next().is_err() {
                break;
            }
        }
        assert_eq!(
            seen,
            vec![
                name("example.com"),
                name("b.example.com"),
                name("a.b.example.com")
            ]
        );

        assert_eq!(it.seek(&name("c.example.com")), Err(DbError::NotFound));
        it.seek(&name("b.example.com")).unwrap();
        assert_eq!(it.current().unwrap().1, name("b.example.com"));
    }

    #[test]
    fn empty_database() {
        let db = MemoryDatabase::new(name("example.com"), Class::IN);
        let mut it = db.iterator(Version::default());
        assert_eq!(it.first(), Err(DbError::NoMore));
        assert_eq!(it.seek(&name("example.com")), Err(DbError::NotFound));
    }

    #[test]
    fn notifiers_are_idempotent() {
        let db = MemoryDatabase::new(name("example.com"), Class::IN);
        let counter = Arc::new(Counter::default());
        let notifier: Arc<dyn UpdateNotifier> = counter.clone();
        db.register_update_notifier(notifier.clone());
        db.register_update_notifier(notifier.clone());
        db.write().commit().unwrap();
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);

        db.unregister_update_notifier(&notifier);
        db.write().commit().unwrap();
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn add_rrset_replaces_same_type() {
        let db = MemoryDatabase::new(name("example.com"), Class::IN);
        let owner = name("example.com");
        let mut write = db.write();
        write
            .add_rrset(&owner, a(Ipv4Addr::new(192, 0, 2, 1)))
            .add_rrset(&owner, a(Ipv4Addr::new(192, 0, 2, 2)));
        let version = write.commit().unwrap();
        let mut it = db.iterator(version);
        it.first().unwrap();
        let (node, _) = it.current().unwrap();
        let rrsets = db.all_rrsets(node, version).unwrap();
        assert_eq!(rrsets.len(), 1);
        assert_eq!(
            rrsets[0].first(),
            Some(&ZoneRecordData::A(Ipv4Addr::new(192, 0, 2, 2)))
        );
    }
}
