//! Merging freshly parsed content into a live catalog zone.

use std::collections::HashMap;
use std::sync::Arc;
use std::vec::Vec;

use parking_lot::MutexGuard;
use tracing::{debug, error, info};

use super::entry::{Entry, EntryStore};
use super::error::HostError;
use super::host::ZoneHost;
use super::parse::ParsedCatalog;
use super::registry::{CatalogZones, View};
use super::zone::{CatalogZone, ResultText, ZoneState};
use crate::base::name::{Name, OwnedLabel};

impl CatalogZone {
    /// Merges a parsed catalog into the zone.
    ///
    /// Member zones present only in the live zone are deleted, member zones
    /// present only in the candidate are added, and member zones present
    /// in both but configured differently are modified, in that order. The
    /// entries and permissions of the candidate then replace those of the
    /// live zone.
    ///
    /// Merging an empty candidate removes all member zones.
    pub(super) fn merge(
        self: &Arc<Self>,
        registry: &CatalogZones,
        candidate: ParsedCatalog,
    ) {
        let mut state = self.state.lock();
        self.merge_locked(&mut state, registry, candidate);
    }

    /// Merges a parsed catalog into the zone while its lock is held.
    ///
    /// The lock is released temporarily during a change of ownership.
    pub(super) fn merge_locked(
        self: &Arc<Self>,
        state: &mut MutexGuard<ZoneState>,
        registry: &CatalogZones,
        candidate: ParsedCatalog,
    ) {
        let view = registry.view();
        let host = registry.host();
        let (entries, coos, zone_options) = candidate.into_parts();

        state.zone_options = zone_options;
        let defaults = state.default_options.clone();
        state.zone_options.set_default(&defaults);

        let mut old: HashMap<OwnedLabel, Arc<Entry>> = self
            .entries
            .load()
            .values()
            .into_iter()
            .map(|entry| (entry.mhash().clone(), entry))
            .collect();
        let to_add = EntryStore::new();
        let to_mod = EntryStore::new();

        for entry in entries.values() {
            let mhash = entry.mhash().clone();
            let Some(name) = entry.name().cloned() else {
                // Options for a member zone that was never declared.
                entries.remove(&mhash);
                continue;
            };
            debug!(
                "catz({:p}): iterating over '{}' from catalog '{}'",
                Arc::as_ptr(self), name, self.name
            );

            let zone_options = state.zone_options.clone();
            entries.update(&mhash, |entry| {
                entry.options_mut().set_default(&zone_options)
            });
            let Some(entry) = entries.get(&mhash) else {
                continue;
            };

            let owner = self.transfer_ownership(
                state,
                host.as_ref(),
                &view,
                &entry,
                &name,
            );

            match old.remove(&mhash) {
                None => {
                    if let Ok(Some(parent)) = &owner {
                        if Arc::ptr_eq(parent, self) {
                            info!(
                                "catz({:p}): zone '{}' unique label has \
                                 changed, reset state",
                                Arc::as_ptr(self), name
                            );
                        }
                    }
                    self.stage(&to_add, entry, "adding");
                }
                Some(_) if owner.is_err() => {
                    debug!(
                        "catz({:p}): zone '{}' was expected to exist but \
                         can not be found, will be restored",
                        Arc::as_ptr(self), name
                    );
                    self.stage(&to_add, entry, "adding");
                }
                Some(old_entry) => {
                    if !old_entry.is_equivalent(&entry) {
                        self.stage(&to_mod, entry, "modifying");
                    }
                }
            }
        }

        // Deletions first so that a re-added zone finds its slot free.
        let mut to_delete: Vec<_> = old.into_values().collect();
        to_delete.sort_by(|left, right| left.name().cmp(&right.name()));
        for entry in to_delete {
            let res = host.delete_zone(&entry, self, &view);
            info!(
                "catz({:p}): deleting zone '{}' from catalog '{}' - {}",
                Arc::as_ptr(self),
                entry,
                self.name,
                ResultText(&res)
            );
        }
        for entry in sorted(to_add) {
            let res = host.add_zone(&entry, self, &view);
            info!(
                "catz({:p}): adding zone '{}' from catalog '{}' - {}",
                Arc::as_ptr(self),
                entry,
                self.name,
                ResultText(&res)
            );
        }
        for entry in sorted(to_mod) {
            let res = host.modify_zone(&entry, self, &view);
            info!(
                "catz({:p}): modifying zone '{}' from catalog '{}' - {}",
                Arc::as_ptr(self),
                entry,
                self.name,
                ResultText(&res)
            );
        }

        self.entries.store(Arc::new(entries));
        self.coos.store(Arc::new(coos));
    }

    /// Takes over a member zone from another catalog zone if permitted.
    ///
    /// Returns the catalog zone the member zone belonged to before, if the
    /// host has the zone, or the error of the host otherwise. If the zone
    /// was taken over, returns the result of deleting it from its previous
    /// catalog zone instead.
    ///
    /// The lock of this zone is released while the other catalog zone is
    /// locked so that two catalog zone locks are never held at once.
    fn transfer_ownership(
        self: &Arc<Self>,
        state: &mut MutexGuard<ZoneState>,
        host: &dyn ZoneHost,
        view: &View,
        entry: &Entry,
        name: &Name,
    ) -> Result<Option<Arc<CatalogZone>>, HostError> {
        let zone = host.find_zone(view, name)?;
        let parent = zone.parent_catalog();
        let other = match &parent {
            Some(other) if !Arc::ptr_eq(other, self) => other.clone(),
            _ => return Ok(parent),
        };

        MutexGuard::unlocked(state, || {
            let _other_state = other.state.lock();
            let granted = other
                .coos
                .load()
                .get(name)
                .map(|coo| coo.name() == &self.name)
                .unwrap_or(false);
            if !granted {
                return Ok(parent);
            }
            debug!(
                "catz({:p}): change of ownership from '{}' to '{}'",
                Arc::as_ptr(self), other.name, self.name
            );
            let res = host.delete_zone(entry, &other, view);
            info!(
                "catz({:p}): deleting zone '{}' from catalog '{}' - {}",
                Arc::as_ptr(self),
                name,
                other.name,
                ResultText(&res)
            );
            res.map(|()| parent)
        })
    }

    /// Stages an entry for adding or modifying.
    fn stage(&self, store: &EntryStore, entry: Arc<Entry>, action: &str) {
        let mhash = entry.mhash().clone();
        if let Err(existing) = store.insert_unique(mhash, entry) {
            error!(
                "catz({:p}): error {} zone '{}' from catalog '{}' - exists",
                self, action, existing, self.name
            );
        }
    }
}

/// Returns the staged entries in name order.
fn sorted(store: EntryStore) -> Vec<Arc<Entry>> {
    let mut entries = store.take_all();
    entries.sort_by(|left, right| left.name().cmp(&right.name()));
    entries
}

//============ Testing =======================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::iana::{Class, Rtype};
    use crate::base::rdata::{Txt, ZoneRecordData};
    use crate::base::rrset::Rrset;
    use crate::catz::host::HostZone;
    use crate::catz::options::Options;
    use core::str::FromStr;
    use parking_lot::Mutex;
    use std::net::Ipv4Addr;
    use tokio::runtime::Handle;

    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    enum Op {
        Add,
        Modify,
        Delete,
    }

    struct Member(Arc<CatalogZone>);

    impl HostZone for Member {
        fn parent_catalog(&self) -> Option<Arc<CatalogZone>> {
            Some(self.0.clone())
        }
    }

    #[derive(Default)]
    struct Host {
        ops: Mutex<Vec<(Op, Name, Name)>>,
        zones: Mutex<HashMap<Name, Arc<CatalogZone>>>,
    }

    impl Host {
        fn take_ops(&self) -> Vec<(Op, Name, Name)> {
            core::mem::take(&mut *self.ops.lock())
        }

        fn record(&self, op: Op, entry: &Entry, catz: &CatalogZone) {
            let member = entry.name().cloned().unwrap_or_else(Name::root);
            self.ops.lock().push((op, member, catz.name().clone()));
        }
    }

    impl ZoneHost for Host {
        fn add_zone(
            &self,
            entry: &Entry,
            catz: &Arc<CatalogZone>,
            _view: &View,
        ) -> Result<(), HostError> {
            self.record(Op::Add, entry, catz);
            let Some(name) = entry.name() else {
                return Err(HostError::NotFound);
            };
            let mut zones = self.zones.lock();
            if zones.contains_key(name) {
                return Err(HostError::Exists);
            }
            zones.insert(name.clone(), catz.clone());
            Ok(())
        }

        fn modify_zone(
            &self,
            entry: &Entry,
            catz: &Arc<CatalogZone>,
            _view: &View,
        ) -> Result<(), HostError> {
            self.record(Op::Modify, entry, catz);
            Ok(())
        }

        fn delete_zone(
            &self,
            entry: &Entry,
            catz: &Arc<CatalogZone>,
            _view: &View,
        ) -> Result<(), HostError> {
            self.record(Op::Delete, entry, catz);
            let name = entry.name().ok_or(HostError::NotFound)?;
            self.zones
                .lock()
                .remove(name)
                .map(|_| ())
                .ok_or(HostError::NotFound)
        }

        fn find_zone(
            &self,
            _view: &View,
            name: &Name,
        ) -> Result<Arc<dyn HostZone>, HostError> {
            match self.zones.lock().get(name) {
                Some(catz) => Ok(Arc::new(Member(catz.clone()))),
                None => Err(HostError::NotFound),
            }
        }
    }

    fn name(s: &str) -> Name {
        Name::from_str(s).unwrap()
    }

    fn ptr(target: &str) -> Rrset {
        Rrset::new(Rtype::PTR, 0).with_data(ZoneRecordData::Ptr(name(target)))
    }

    fn a(addr: [u8; 4]) -> Rrset {
        Rrset::new(Rtype::A, 0).with_data(Ipv4Addr::from(addr))
    }

    fn candidate(origin: &str, records: &[(&str, Rrset)]) -> ParsedCatalog {
        let mut catalog = ParsedCatalog::new(name(origin));
        let version = Rrset::new(Rtype::TXT, 0)
            .with_data(Txt::from_strings(["2"]).unwrap());
        catalog
            .process_rrset(
                &name(&format!("version.{origin}")),
                Class::IN,
                &version,
            )
            .unwrap();
        for (owner, rrset) in records {
            let owner = name(&format!("{owner}.{origin}"));
            catalog.process_rrset(&owner, Class::IN, rrset).unwrap();
        }
        catalog
    }

    fn setup() -> (Arc<CatalogZones>, Arc<Host>) {
        let host = Arc::new(Host::default());
        let registry = CatalogZones::new(
            View::new("_default"),
            host.clone(),
            Handle::current(),
        );
        (registry, host)
    }

    #[tokio::test]
    async fn merge_is_idempotent() {
        let (registry, host) = setup();
        let zone = registry.zone_add_or_get(name("cat.example")).unwrap();
        let records = || {
            [
                ("m1.zones", ptr("one.example")),
                ("m2.zones", ptr("two.example")),
                ("primaries.ext.m2.zones", a([192, 0, 2, 1])),
            ]
        };

        zone.merge(&registry, candidate("cat.example", &records()));
        assert_eq!(
            host.take_ops(),
            vec![
                (Op::Add, name("one.example"), name("cat.example")),
                (Op::Add, name("two.example"), name("cat.example")),
            ]
        );
        assert_eq!(zone.entries().len(), 2);

        zone.merge(&registry, candidate("cat.example", &records()));
        assert!(host.take_ops().is_empty());
    }

    #[tokio::test]
    async fn changes_are_ordered() {
        let (registry, host) = setup();
        let zone = registry.zone_add_or_get(name("cat.example")).unwrap();
        zone.merge(
            &registry,
            candidate(
                "cat.example",
                &[
                    ("old.zones", ptr("renamed.example")),
                    ("m1.zones", ptr("one.example")),
                    ("m2.zones", ptr("two.example")),
                ],
            ),
        );
        host.take_ops();

        zone.merge(
            &registry,
            candidate(
                "cat.example",
                &[
                    ("new.zones", ptr("renamed.example")),
                    ("m1.zones", ptr("one.example")),
                    ("primaries.ext.m1.zones", a([192, 0, 2, 1])),
                    ("m3.zones", ptr("three.example")),
                ],
            ),
        );
        assert_eq!(
            host.take_ops(),
            vec![
                (Op::Delete, name("renamed.example"), name("cat.example")),
                (Op::Delete, name("two.example"), name("cat.example")),
                (Op::Add, name("renamed.example"), name("cat.example")),
                (Op::Add, name("three.example"), name("cat.example")),
                (Op::Modify, name("one.example"), name("cat.example")),
            ]
        );
        let entries = zone.entries();
        assert_eq!(entries.len(), 3);
        let one = entries.get(OwnedLabel::from_str("m1").unwrap().as_label());
        assert_eq!(one.unwrap().options().primaries.len(), 1);
    }

    #[tokio::test]
    async fn zone_wide_options_and_defaults() {
        let (registry, host) = setup();
        let zone = registry.zone_add_or_get(name("cat.example")).unwrap();
        let mut defaults = Options::new();
        defaults.allow_transfer = Some("none; ".into());
        defaults.in_memory = true;
        zone.set_default_options(defaults);

        zone.merge(
            &registry,
            candidate(
                "cat.example",
                &[
                    ("m1.zones", ptr("one.example")),
                    ("primaries.ext", a([192, 0, 2, 53])),
                    // Options for an undeclared member are dropped.
                    ("primaries.ext.dangling.zones", a([192, 0, 2, 2])),
                ],
            ),
        );
        assert_eq!(host.take_ops().len(), 1);

        let options = zone.zone_options();
        assert_eq!(options.primaries.len(), 1);
        assert_eq!(options.allow_transfer.as_deref(), Some("none; "));

        let entries = zone.entries();
        assert_eq!(entries.len(), 1);
        let entry = entries.values().pop().unwrap();
        assert_eq!(entry.options().primaries, options.primaries);
        assert_eq!(entry.options().allow_transfer.as_deref(), Some("none; "));
        assert!(entry.options().in_memory);
    }

    #[tokio::test]
    async fn missing_member_is_restored() {
        let (registry, host) = setup();
        let zone = registry.zone_add_or_get(name("cat.example")).unwrap();
        let records = || [("m1.zones", ptr("one.example"))];
        zone.merge(&registry, candidate("cat.example", &records()));
        host.take_ops();

        host.zones.lock().clear();
        zone.merge(&registry, candidate("cat.example", &records()));
        assert_eq!(
            host.take_ops(),
            vec![(Op::Add, name("one.example"), name("cat.example"))]
        );
    }

    #[tokio::test]
    async fn change_of_ownership() {
        let (registry, host) = setup();
        let old = registry.zone_add_or_get(name("old.example")).unwrap();
        let new = registry.zone_add_or_get(name("new.example")).unwrap();

        old.merge(
            &registry,
            candidate(
                "old.example",
                &[
                    ("a.zones", ptr("member.example")),
                    ("coo.a.zones", ptr("new.example")),
                ],
            ),
        );
        new.merge(
            &registry,
            candidate("new.example", &[("b.zones", ptr("member.example"))]),
        );
        assert_eq!(
            host.take_ops(),
            vec![
                (Op::Add, name("member.example"), name("old.example")),
                (Op::Delete, name("member.example"), name("old.example")),
                (Op::Add, name("member.example"), name("new.example")),
            ]
        );
        assert!(Arc::ptr_eq(
            host.zones.lock().get(&name("member.example")).unwrap(),
            &new
        ));
    }

    #[tokio::test]
    async fn no_transfer_without_permission() {
        let (registry, host) = setup();
        let old = registry.zone_add_or_get(name("old.example")).unwrap();
        let new = registry.zone_add_or_get(name("new.example")).unwrap();

        old.merge(
            &registry,
            candidate("old.example", &[("a.zones", ptr("member.example"))]),
        );
        new.merge(
            &registry,
            candidate("new.example", &[("b.zones", ptr("member.example"))]),
        );
        assert_eq!(
            host.take_ops(),
            vec![
                (Op::Add, name("member.example"), name("old.example")),
                (Op::Add, name("member.example"), name("new.example")),
            ]
        );
        assert!(Arc::ptr_eq(
            host.zones.lock().get(&name("member.example")).unwrap(),
            &old
        ));
    }

    #[tokio::test]
    async fn empty_candidate_removes_all() {
        let (registry, host) = setup();
        let zone = registry.zone_add_or_get(name("cat.example")).unwrap();
        zone.merge(
            &registry,
            candidate(
                "cat.example",
                &[
                    ("m1.zones", ptr("one.example")),
                    ("coo.m1.zones", ptr("other.example")),
                ],
            ),
        );
        assert_eq!(zone.coos().len(), 1);
        host.take_ops();

        zone.merge(&registry, ParsedCatalog::new(name("cat.example")));
        assert_eq!(
            host.take_ops(),
            vec![(Op::Delete, name("one.example"), name("cat.example"))]
        );
        assert!(zone.entries().is_empty());
        assert!(zone.coos().is_empty());
    }
}
