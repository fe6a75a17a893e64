//! Parsing the content of a catalog zone.
//!
//! The content of a catalog zone is interpreted one RRset at a time by
//! [`ParsedCatalog::process_rrset`]. The meaning of an RRset is determined
//! by the labels of its owner name relative to the catalog zone apex, read
//! from right to left:
//!
//! ```text
//! version                               TXT "2"
//! zones.<mhash>                         PTR <member zone name>
//! coo.<mhash>.zones                     PTR <catalog zone granted ownership>
//! [<label>.]primaries.ext.<mhash>.zones A, AAAA, or TXT <key name>
//! allow-query.ext.<mhash>.zones         APL
//! allow-transfer.ext.<mhash>.zones      APL
//! [<label>.]primaries.ext               zone-wide primaries
//! allow-query.ext, allow-transfer.ext   zone-wide access control lists
//! ```
//!
//! The custom properties `primaries` (or `masters`), `allow-query` and
//! `allow-transfer` must be wrapped in an `ext` label with schema version 2.
//! With schema version 1, they appear without it and the `ext` label as well
//! as the `coo` property are not recognized. Since later records depend on
//! the schema version, the `version` RRset must be processed first.

use core::fmt::Write;
use core::str::FromStr;

use std::borrow::ToOwned;
use std::net::{IpAddr, SocketAddr};
use std::string::String;
use std::sync::Arc;
use std::vec::Vec;

use tracing::warn;

use super::coo::{Coo, CooStore};
use super::entry::{Entry, EntryStore};
use super::error::ParseError;
use super::options::{Options, PrimaryInfo};
use crate::base::iana::{Class, Rtype};
use crate::base::name::{Label, Name, RelativeName};
use crate::base::rdata::{Apl, ZoneRecordData};
use crate::base::rrset::Rrset;

//------------ ParsedCatalog -------------------------------------------------

/// The content of a catalog zone as parsed from its records.
///
/// A parsed catalog is the candidate that is merged into the live
/// [`CatalogZone`][super::CatalogZone] when the catalog zone has changed.
#[derive(Debug)]
pub struct ParsedCatalog {
    origin: Name,
    entries: EntryStore,
    coos: CooStore,
    zone_options: Options,
    version: Option<u32>,
    broken: bool,
}

impl ParsedCatalog {
    /// Creates an empty parsed catalog for the catalog zone `origin`.
    pub fn new(origin: Name) -> Self {
        ParsedCatalog {
            origin,
            entries: EntryStore::new(),
            coos: CooStore::new(),
            zone_options: Options::new(),
            version: None,
            broken: false,
        }
    }

    pub fn origin(&self) -> &Name {
        &self.origin
    }

    pub fn entries(&self) -> &EntryStore {
        &self.entries
    }

    pub fn coos(&self) -> &CooStore {
        &self.coos
    }

    pub fn zone_options(&self) -> &Options {
        &self.zone_options
    }

    /// Returns the schema version if a valid version record was seen.
    pub fn version(&self) -> Option<u32> {
        self.version
    }

    /// Returns whether the content must not be used.
    pub fn is_broken(&self) -> bool {
        self.broken
    }

    pub fn mark_broken(&mut self) {
        self.broken = true;
    }

    pub(super) fn into_parts(self) -> (EntryStore, CooStore, Options) {
        (self.entries, self.coos, self.zone_options)
    }

    /// Processes an RRset of the catalog zone.
    ///
    /// Errors only affect the property the RRset is for, unless the RRset
    /// makes the whole content unusable. In that case, the catalog is
    /// marked as broken. This happens for RRsets of a class other than IN,
    /// for RRsets at the apex other than SOA and NS, for multiple records
    /// where only one is allowed, and for an invalid version record.
    ///
    /// RRsets of types that are not catalog zone data, i.e., DNSSEC related
    /// types and ZONEMD, are silently ignored.
    pub fn process_rrset(
        &mut self,
        owner: &Name,
        class: Class,
        rrset: &Rrset,
    ) -> Result<(), ParseError> {
        if class != Class::IN {
            warn!("catz({:p}): RR found which has a non-IN class", self);
            self.broken = true;
            return Err(ParseError::ClassMismatch(class));
        }

        if !is_processable(rrset.rtype()) {
            return Ok(());
        }

        let name = owner
            .strip_suffix(&self.origin)
            .ok_or(ParseError::OutOfZone)?;
        if name.is_empty() {
            return match rrset.rtype() {
                Rtype::SOA | Rtype::NS => Ok(()),
                rtype => {
                    self.broken = true;
                    Err(ParseError::UnexpectedApexRecord(rtype))
                }
            };
        }
        self.process_value(&name, rrset)
    }

    /// Returns whether custom properties need the `ext` label.
    ///
    /// This is the case for schema version 2 and later. If the version is
    /// still unknown, it is assumed to be new.
    fn requires_ext(&self) -> bool {
        self.version.map_or(true, |version| version >= 2)
    }

    /// Splits the property off the right-hand end of `name`.
    ///
    /// Returns the property and the labels in front of it.
    fn split_property(
        &self,
        name: &RelativeName,
    ) -> Result<(Property, RelativeName), ParseError> {
        let label = name.last().ok_or(ParseError::UnknownProperty)?;
        let mut property = Property::from_label(label);
        let mut suffix_labels = 1;
        if self.requires_ext() && property.is_custom() {
            if property != Property::Ext || name.label_count() < 2 {
                return Err(ParseError::ExtRequired);
            }
            suffix_labels = 2;
            property = name
                .label_from_end(1)
                .map(Property::from_label)
                .unwrap_or(Property::Unknown);
        }
        let prefix = name
            .strip_last(suffix_labels)
            .ok_or(ParseError::UnknownProperty)?;
        Ok((property, prefix))
    }

    fn process_value(
        &mut self,
        name: &RelativeName,
        rrset: &Rrset,
    ) -> Result<(), ParseError> {
        let (property, prefix) = self.split_property(name)?;
        match property {
            Property::Zones => self.process_zones(&prefix, rrset),
            Property::Primaries => process_primaries(
                &mut self.zone_options.primaries,
                &prefix,
                rrset,
            ),
            Property::AllowQuery => {
                expect_no_prefix(&prefix)?;
                self.zone_options.allow_query =
                    Some(self.process_apl(rrset)?);
                Ok(())
            }
            Property::AllowTransfer => {
                expect_no_prefix(&prefix)?;
                self.zone_options.allow_transfer =
                    Some(self.process_apl(rrset)?);
                Ok(())
            }
            Property::Version => {
                expect_no_prefix(&prefix)?;
                self.process_version(rrset)
            }
            _ => Err(ParseError::UnknownProperty),
        }
    }

    fn process_zones(
        &mut self,
        name: &RelativeName,
        rrset: &Rrset,
    ) -> Result<(), ParseError> {
        let mhash = name.last().ok_or(ParseError::UnknownProperty)?;
        if name.label_count() == 1 {
            self.process_zones_entry(mhash, rrset)
        } else {
            let option =
                name.strip_last(1).ok_or(ParseError::UnknownProperty)?;
            self.process_zones_suboption(mhash, &option, rrset)
        }
    }

    fn process_zones_entry(
        &mut self,
        mhash: &Label,
        rrset: &Rrset,
    ) -> Result<(), ParseError> {
        if rrset.rtype() != Rtype::PTR {
            return Err(ParseError::WrongType(rrset.rtype()));
        }
        let target = match rrset.data() {
            [ZoneRecordData::Ptr(target)] => target.clone(),
            [_] => return Err(ParseError::WrongType(rrset.rtype())),
            _ => {
                warn!(
                    "catz({:p}): member zone PTR RRset contains more than \
                     one record, which is invalid",
                    self
                );
                self.broken = true;
                return Err(ParseError::MultipleRecords);
            }
        };

        let entry = Entry::new(mhash.to_owned(), Some(target.clone()));
        if let Err(existing) =
            self.entries.insert_unique(mhash.to_owned(), Arc::new(entry))
        {
            if existing.name().is_none() {
                self.entries.update(mhash, |entry| entry.set_name(target));
            }
        }
        Ok(())
    }

    fn process_zones_suboption(
        &mut self,
        mhash: &Label,
        name: &RelativeName,
        rrset: &Rrset,
    ) -> Result<(), ParseError> {
        let (property, prefix) = self.split_property(name)?;

        // The entry is created even if the property turns out to be
        // invalid. Entries without a name are dropped when merging.
        let _ = self
            .entries
            .get_or_insert_with(mhash.to_owned(), || {
                Entry::new(mhash.to_owned(), None)
            });

        match property {
            Property::Coo => self.process_coo(mhash, rrset),
            Property::Primaries => {
                let mut res = Ok(());
                self.entries.update(mhash, |entry| {
                    res = process_primaries(
                        &mut entry.options_mut().primaries,
                        &prefix,
                        rrset,
                    )
                });
                res
            }
            Property::AllowQuery => {
                expect_no_prefix(&prefix)?;
                let acl = self.process_apl(rrset)?;
                self.entries.update(mhash, |entry| {
                    entry.options_mut().allow_query = Some(acl)
                });
                Ok(())
            }
            Property::AllowTransfer => {
                expect_no_prefix(&prefix)?;
                let acl = self.process_apl(rrset)?;
                self.entries.update(mhash, |entry| {
                    entry.options_mut().allow_transfer = Some(acl)
                });
                Ok(())
            }
            _ => Err(ParseError::UnknownProperty),
        }
    }

    fn process_coo(
        &mut self,
        mhash: &Label,
        rrset: &Rrset,
    ) -> Result<(), ParseError> {
        // Change of ownership was introduced with schema version 2.
        if !self.requires_ext() {
            return Err(ParseError::VersionTooOld);
        }
        if rrset.rtype() != Rtype::PTR {
            return Err(ParseError::WrongType(rrset.rtype()));
        }
        let target = match rrset.data() {
            [ZoneRecordData::Ptr(target)] => target,
            [_] => return Err(ParseError::WrongType(rrset.rtype())),
            _ => {
                warn!(
                    "catz({:p}): 'coo' property PTR RRset contains more \
                     than one record, which is invalid",
                    self
                );
                self.broken = true;
                return Err(ParseError::MultipleRecords);
            }
        };
        if target.is_root() {
            return Err(ParseError::EmptyName);
        }

        let entry = self.entries.get(mhash).ok_or(ParseError::MissingEntry)?;
        let member = entry.name().ok_or(ParseError::MissingEntry)?;

        // A permission that was already registered stays.
        let coo = Coo::new(target.clone(), member.clone());
        let _ = self.coos.insert_unique(member.clone(), Arc::new(coo));
        Ok(())
    }

    fn process_version(&mut self, rrset: &Rrset) -> Result<(), ParseError> {
        if rrset.rtype() != Rtype::TXT {
            return Err(ParseError::WrongType(rrset.rtype()));
        }
        match parse_version(rrset) {
            Ok(version) => {
                self.version = Some(version);
                Ok(())
            }
            Err(err) => {
                warn!(
                    "catz({:p}): invalid record for the catalog zone \
                     version property",
                    self
                );
                self.broken = true;
                Err(err)
            }
        }
    }

    /// Converts an APL RRset into access control list text.
    fn process_apl(&self, rrset: &Rrset) -> Result<String, ParseError> {
        if rrset.rtype() != Rtype::APL {
            return Err(ParseError::WrongType(rrset.rtype()));
        }
        if rrset.len() > 1 {
            warn!(
                "catz({:p}): more than one APL entry for member zone, \
                 result is undefined",
                self
            );
        }
        match rrset.first() {
            Some(ZoneRecordData::Apl(apl)) => Ok(render_apl(apl)),
            _ => Err(ParseError::WrongType(rrset.rtype())),
        }
    }
}

//------------ Property ------------------------------------------------------

/// The property labels of the catalog zone schema.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Property {
    Unknown,
    Zones,
    Coo,
    Version,
    Ext,
    Primaries,
    AllowQuery,
    AllowTransfer,
}

impl Property {
    fn from_label(label: &Label) -> Self {
        match label.as_slice() {
            b"ext" => Property::Ext,
            b"zones" => Property::Zones,
            b"masters" | b"primaries" => Property::Primaries,
            b"allow-query" => Property::AllowQuery,
            b"allow-transfer" => Property::AllowTransfer,
            b"coo" => Property::Coo,
            b"version" => Property::Version,
            _ => Property::Unknown,
        }
    }

    /// Returns whether this is a custom property.
    ///
    /// The `ext` label itself counts as custom.
    fn is_custom(self) -> bool {
        matches!(
            self,
            Property::Ext
                | Property::Primaries
                | Property::AllowQuery
                | Property::AllowTransfer
        )
    }
}

//------------ Helper Functions ----------------------------------------------

/// Returns whether RRsets of the given type carry catalog zone data.
pub fn is_processable(rtype: Rtype) -> bool {
    !(rtype.is_dnssec()
        || rtype == Rtype::CDS
        || rtype == Rtype::CDNSKEY
        || rtype == Rtype::ZONEMD)
}

fn expect_no_prefix(prefix: &RelativeName) -> Result<(), ParseError> {
    if prefix.is_empty() {
        Ok(())
    } else {
        Err(ParseError::UnexpectedPrefix)
    }
}

/// Parses the content of a version TXT RRset.
fn parse_version(rrset: &Rrset) -> Result<u32, ParseError> {
    let txt = match rrset.data() {
        [ZoneRecordData::Txt(txt)] => txt,
        [_] => return Err(ParseError::BadTxt),
        _ => return Err(ParseError::MultipleRecords),
    };
    let text = txt.as_single().ok_or(ParseError::BadTxt)?;
    if text.len() > 15 {
        return Err(ParseError::BadVersion);
    }
    core::str::from_utf8(text)
        .ok()
        .filter(|text| text.bytes().all(|ch| ch.is_ascii_digit()))
        .and_then(|text| text.parse().ok())
        .ok_or(ParseError::BadVersion)
}

/// Applies a primaries RRset to a list of primaries.
///
/// With a label, the first record of the RRset sets either the address
/// (A or AAAA) or the TSIG key name (TXT) of the primary with that label,
/// adding it if necessary. Without a label, every A or AAAA record adds an
/// anonymous primary.
fn process_primaries(
    primaries: &mut Vec<PrimaryInfo>,
    label: &RelativeName,
    rrset: &Rrset,
) -> Result<(), ParseError> {
    if !label.is_empty() {
        let mut key = None;
        let mut addr = None;
        match rrset.first() {
            Some(ZoneRecordData::A(a)) => {
                addr = Some(SocketAddr::new((*a).into(), 0))
            }
            Some(ZoneRecordData::Aaaa(a)) => {
                addr = Some(SocketAddr::new((*a).into(), 0))
            }
            Some(ZoneRecordData::Txt(txt)) => {
                let text = txt.as_single().ok_or(ParseError::BadTxt)?;
                let text = core::str::from_utf8(text)
                    .map_err(|_| ParseError::BadTxt)?;
                key = Some(Name::from_str(text)?);
            }
            _ => return Err(ParseError::WrongType(rrset.rtype())),
        }

        let pos = match primaries
            .iter()
            .position(|item| item.label.as_ref() == Some(label))
        {
            Some(pos) => pos,
            None => {
                primaries.push(PrimaryInfo::labelled(label.clone()));
                primaries.len() - 1
            }
        };
        let slot = &mut primaries[pos];
        if key.is_some() {
            slot.key = key;
        } else {
            slot.addr = addr;
        }
        return Ok(());
    }

    if rrset.rtype() != Rtype::A && rrset.rtype() != Rtype::AAAA {
        return Err(ParseError::WrongType(rrset.rtype()));
    }
    for data in rrset.data() {
        let addr: IpAddr = match data {
            ZoneRecordData::A(addr) => (*addr).into(),
            ZoneRecordData::Aaaa(addr) => (*addr).into(),
            _ => continue,
        };
        // Port 0 means the default port.
        primaries.push(PrimaryInfo::new(SocketAddr::new(addr, 0)));
    }
    Ok(())
}

/// Renders address prefix list data as access control list text.
///
/// Each item becomes `[!]addr[/prefix]; ` where the prefix is left out if
/// it covers the whole address. Items of unknown address families are
/// skipped.
pub fn render_apl(apl: &Apl) -> String {
    let mut acl = String::new();
    for item in apl.items() {
        let (addr, max_prefix): (IpAddr, u8) =
            match (item.ipv4(), item.ipv6()) {
                (Some(addr), _) => (addr.into(), 32),
                (_, Some(addr)) => (addr.into(), 128),
                _ => continue,
            };
        if item.negation {
            acl.push('!');
        }
        let _ = write!(acl, "{addr}");
        if item.prefix < max_prefix {
            let _ = write!(acl, "/{}", item.prefix);
        }
        acl.push_str("; ");
    }
    acl
}

//============ Testing =======================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::rdata::{AplItem, Txt};
    use rstest::rstest;
    use std::net::{Ipv4Addr, Ipv6Addr};
    use std::string::ToString;

    const ORIGIN: &str = "catalog.example";

    fn name(s: &str) -> Name {
        Name::from_str(s).unwrap()
    }

    fn owner(rel: &str) -> Name {
        if rel.is_empty() {
            name(ORIGIN)
        } else {
            name(&format!("{rel}.{ORIGIN}"))
        }
    }

    fn ptr(target: &str) -> Rrset {
        Rrset::new(Rtype::PTR, 0).with_data(ZoneRecordData::Ptr(name(target)))
    }

    fn txt(strings: &[&str]) -> Rrset {
        Rrset::new(Rtype::TXT, 0)
            .with_data(Txt::from_strings(strings.iter()).unwrap())
    }

    fn a(addr: [u8; 4]) -> Rrset {
        Rrset::new(Rtype::A, 0).with_data(Ipv4Addr::from(addr))
    }

    fn apl(items: Vec<AplItem>) -> Rrset {
        Rrset::new(Rtype::APL, 0).with_data(Apl::new(items))
    }

    fn catalog(version: &str) -> ParsedCatalog {
        let mut catz = ParsedCatalog::new(name(ORIGIN));
        catz.process_rrset(&owner("version"), Class::IN, &txt(&[version]))
            .unwrap();
        catz
    }

    fn process(
        catz: &mut ParsedCatalog,
        rel: &str,
        rrset: Rrset,
    ) -> Result<(), ParseError> {
        catz.process_rrset(&owner(rel), Class::IN, &rrset)
    }

    fn entry(catz: &ParsedCatalog, mhash: &str) -> Arc<Entry> {
        let mhash = crate::base::name::OwnedLabel::from_str(mhash).unwrap();
        catz.entries().get(mhash.as_label()).unwrap()
    }

    #[test]
    fn member_with_primaries() {
        let mut catz = catalog("2");
        process(&mut catz, "ABC123.zones", ptr("member1.example.")).unwrap();
        process(
            &mut catz,
            "primaries.ext.ABC123.zones",
            a([192, 0, 2, 1]),
        )
        .unwrap();

        assert_eq!(catz.version(), Some(2));
        assert!(!catz.is_broken());
        assert_eq!(catz.entries().len(), 1);
        let entry = entry(&catz, "ABC123");
        assert_eq!(entry.name(), Some(&name("member1.example")));
        assert_eq!(
            entry.options().primaries,
            vec![PrimaryInfo::new("192.0.2.1:0".parse().unwrap())]
        );
    }

    #[test]
    fn version_one_without_ext() {
        let mut catz = catalog("1");
        process(&mut catz, "ABC123.zones", ptr("member1.example.")).unwrap();
        process(&mut catz, "masters.ABC123.zones", a([192, 0, 2, 1]))
            .unwrap();
        process(&mut catz, "masters", a([192, 0, 2, 53])).unwrap();
        assert_eq!(entry(&catz, "ABC123").options().primaries.len(), 1);
        assert_eq!(catz.zone_options().primaries.len(), 1);
    }

    #[rstest]
    #[case("1", "coo.ABC123.zones", ParseError::VersionTooOld)]
    #[case("1", "primaries.ext.ABC123.zones", ParseError::UnknownProperty)]
    #[case("1", "allow-query.ext", ParseError::UnknownProperty)]
    #[case("2", "masters.ABC123.zones", ParseError::ExtRequired)]
    #[case("2", "allow-query", ParseError::ExtRequired)]
    #[case("2", "ext", ParseError::ExtRequired)]
    #[case("2", "bogus.ext", ParseError::UnknownProperty)]
    #[case("2", "bogus.ABC123.zones", ParseError::UnknownProperty)]
    #[case("2", "label.allow-query.ext", ParseError::UnexpectedPrefix)]
    fn version_gating(
        #[case] version: &str,
        #[case] rel: &str,
        #[case] expected: ParseError,
    ) {
        let mut catz = catalog(version);
        process(&mut catz, "ABC123.zones", ptr("member1.example.")).unwrap();
        let rrset = match rel {
            rel if rel.starts_with("coo") => ptr("other.example."),
            rel if rel.contains("allow-") => apl(vec![]),
            _ => a([192, 0, 2, 1]),
        };
        assert_eq!(process(&mut catz, rel, rrset), Err(expected));
        assert!(!catz.is_broken());
        assert!(entry(&catz, "ABC123").options().primaries.is_empty());
        assert!(catz.coos().is_empty());
    }

    #[test]
    fn apl_rendering() {
        let mut catz = catalog("2");
        process(&mut catz, "ABC123.zones", ptr("member1.example.")).unwrap();
        process(
            &mut catz,
            "allow-query.ext.ABC123.zones",
            apl(vec![AplItem::v4(Ipv4Addr::new(192, 0, 2, 0), 24, false)]),
        )
        .unwrap();
        process(
            &mut catz,
            "allow-transfer.ext.ABC123.zones",
            apl(vec![
                AplItem::v6("2001:db8::1".parse().unwrap(), 128, true),
                AplItem::v4(Ipv4Addr::new(198, 51, 100, 7), 32, false),
                AplItem {
                    family: 3,
                    prefix: 8,
                    negation: false,
                    afdpart: Default::default(),
                },
                AplItem::v6(Ipv6Addr::UNSPECIFIED, 0, false),
            ]),
        )
        .unwrap();

        let entry = entry(&catz, "ABC123");
        assert_eq!(
            entry.options().allow_query.as_deref(),
            Some("192.0.2.0/24; ")
        );
        assert_eq!(
            entry.options().allow_transfer.as_deref(),
            Some("!2001:db8::1; 198.51.100.7; ::/0; ")
        );
    }

    #[test]
    fn first_apl_record_is_used() {
        let mut catz = catalog("2");
        let rrset = Rrset::new(Rtype::APL, 0)
            .with_data(Apl::new(vec![AplItem::v4(
                Ipv4Addr::new(192, 0, 2, 0),
                24,
                false,
            )]))
            .with_data(Apl::new(vec![AplItem::v4(
                Ipv4Addr::new(203, 0, 113, 0),
                24,
                false,
            )]));
        process(&mut catz, "allow-query.ext", rrset).unwrap();
        assert_eq!(
            catz.zone_options().allow_query.as_deref(),
            Some("192.0.2.0/24; ")
        );
    }

    #[test]
    fn labelled_primaries() {
        let mut catz = catalog("2");
        process(&mut catz, "ABC123.zones", ptr("member1.example.")).unwrap();
        process(
            &mut catz,
            "ns1.primaries.ext.ABC123.zones",
            a([192, 0, 2, 1]),
        )
        .unwrap();
        process(
            &mut catz,
            "ns1.primaries.ext.ABC123.zones",
            txt(&["tsig-key.example"]),
        )
        .unwrap();
        process(
            &mut catz,
            "ns2.primaries.ext.ABC123.zones",
            txt(&["other-key"]),
        )
        .unwrap();
        assert_eq!(
            process(
                &mut catz,
                "ns3.primaries.ext.ABC123.zones",
                txt(&["a", "b"]),
            ),
            Err(ParseError::BadTxt)
        );

        let primaries = entry(&catz, "ABC123").options().primaries.clone();
        assert_eq!(primaries.len(), 2);
        assert_eq!(primaries[0].label.as_ref().unwrap().to_string(), "ns1");
        assert_eq!(primaries[0].addr, Some("192.0.2.1:0".parse().unwrap()));
        assert_eq!(primaries[0].key, Some(name("tsig-key.example")));
        assert_eq!(primaries[1].addr, None);
        assert_eq!(primaries[1].key, Some(name("other-key")));
    }

    #[test]
    fn anonymous_primaries_need_addresses() {
        let mut catz = catalog("2");
        let rrset = Rrset::new(Rtype::A, 0)
            .with_data(Ipv4Addr::new(192, 0, 2, 1))
            .with_data(Ipv4Addr::new(192, 0, 2, 2));
        process(&mut catz, "primaries.ext", rrset).unwrap();
        assert_eq!(catz.zone_options().primaries.len(), 2);
        assert_eq!(
            process(&mut catz, "primaries.ext", txt(&["key"])),
            Err(ParseError::WrongType(Rtype::TXT))
        );
    }

    #[test]
    fn duplicate_member_ptr_is_broken() {
        let mut catz = catalog("2");
        let rrset = ptr("one.example.")
            .with_data(ZoneRecordData::Ptr(name("two.example.")));
        assert_eq!(
            process(&mut catz, "ABC123.zones", rrset),
            Err(ParseError::MultipleRecords)
        );
        assert!(catz.is_broken());
        assert!(catz.entries().is_empty());
    }

    #[test]
    fn suboption_before_member_ptr() {
        let mut catz = catalog("2");
        process(
            &mut catz,
            "primaries.ext.ABC123.zones",
            a([192, 0, 2, 1]),
        )
        .unwrap();
        assert_eq!(entry(&catz, "ABC123").name(), None);
        process(&mut catz, "ABC123.zones", ptr("member1.example.")).unwrap();
        let entry = entry(&catz, "ABC123");
        assert_eq!(entry.name(), Some(&name("member1.example")));
        assert_eq!(entry.options().primaries.len(), 1);
    }

    #[test]
    fn change_of_ownership() {
        let mut catz = catalog("2");
        assert_eq!(
            process(&mut catz, "coo.ABC123.zones", ptr("new.example.")),
            Err(ParseError::MissingEntry)
        );
        process(&mut catz, "ABC123.zones", ptr("member1.example.")).unwrap();
        assert_eq!(
            process(&mut catz, "coo.ABC123.zones", ptr(".")),
            Err(ParseError::EmptyName)
        );
        process(&mut catz, "coo.ABC123.zones", ptr("new.example.")).unwrap();

        let coo = catz.coos().get(&name("member1.example")).unwrap();
        assert_eq!(coo.name(), &name("new.example"));
        assert_eq!(coo.key(), &name("member1.example"));

        let rrset = ptr("a.example.")
            .with_data(ZoneRecordData::Ptr(name("b.example.")));
        assert_eq!(
            process(&mut catz, "coo.ABC123.zones", rrset),
            Err(ParseError::MultipleRecords)
        );
        assert!(catz.is_broken());
    }

    #[rstest]
    #[case(&["3"], Some(3), false)]
    #[case(&["two"], None, true)]
    #[case(&["1234567890123456"], None, true)]
    #[case(&["99999999999"], None, true)]
    #[case(&["1", "2"], None, true)]
    fn version_record(
        #[case] strings: &[&str],
        #[case] version: Option<u32>,
        #[case] broken: bool,
    ) {
        let mut catz = ParsedCatalog::new(name(ORIGIN));
        let res = process(&mut catz, "version", txt(strings));
        assert_eq!(res.is_ok(), !broken);
        assert_eq!(catz.version(), version);
        assert_eq!(catz.is_broken(), broken);
    }

    #[test]
    fn version_with_prefix() {
        let mut catz = ParsedCatalog::new(name(ORIGIN));
        assert_eq!(
            process(&mut catz, "foo.version", txt(&["2"])),
            Err(ParseError::UnexpectedPrefix)
        );
        assert_eq!(catz.version(), None);
    }

    #[test]
    fn apex_records() {
        let mut catz = catalog("2");
        let ns = Rrset::new(Rtype::NS, 0)
            .with_data(ZoneRecordData::Ns(name("invalid.")));
        process(&mut catz, "", ns).unwrap();
        assert!(!catz.is_broken());

        assert_eq!(
            process(&mut catz, "", a([192, 0, 2, 1])),
            Err(ParseError::UnexpectedApexRecord(Rtype::A))
        );
        assert!(catz.is_broken());
    }

    #[test]
    fn non_in_class_is_broken() {
        let mut catz = catalog("2");
        assert_eq!(
            catz.process_rrset(
                &owner("ABC123.zones"),
                Class::CH,
                &ptr("member1.example.")
            ),
            Err(ParseError::ClassMismatch(Class::CH))
        );
        assert!(catz.is_broken());
    }

    #[test]
    fn out_of_zone_and_dnssec() {
        let mut catz = catalog("2");
        assert_eq!(
            catz.process_rrset(
                &name("zones.elsewhere.example"),
                Class::IN,
                &ptr("member1.example.")
            ),
            Err(ParseError::OutOfZone)
        );
        assert!(!catz.is_broken());

        let rrsig = Rrset::new(Rtype::RRSIG, 0).with_data(
            ZoneRecordData::Other(Rtype::RRSIG, Default::default()),
        );
        process(&mut catz, "", rrsig.clone()).unwrap();
        process(&mut catz, "ABC123.zones", rrsig).unwrap();
        assert!(!catz.is_broken());
        assert!(catz.entries().is_empty());
    }

    #[test]
    fn properties_are_case_sensitive() {
        let mut catz = catalog("2");
        assert_eq!(
            process(&mut catz, "ABC123.ZONES", ptr("member1.example.")),
            Err(ParseError::UnknownProperty)
        );
    }
}
