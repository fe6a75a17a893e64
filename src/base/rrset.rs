//! Resource record sets.

use core::ops;

use std::sync::Arc;
use std::vec::Vec;

use super::iana::Rtype;
use super::rdata::ZoneRecordData;

//------------ Rrset ---------------------------------------------------------

/// A set of records of the same type at the same owner.
///
/// The owner name and class are not part of the set. They are provided by
/// the node the set is stored at.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Rrset {
    rtype: Rtype,
    ttl: u32,
    data: Vec<ZoneRecordData>,
}

impl Rrset {
    pub fn new(rtype: Rtype, ttl: u32) -> Self {
        Rrset {
            rtype,
            ttl,
            data: Vec::new(),
        }
    }

    pub fn rtype(&self) -> Rtype {
        self.rtype
    }

    pub fn ttl(&self) -> u32 {
        self.ttl
    }

    pub fn data(&self) -> &[ZoneRecordData] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn first(&self) -> Option<&ZoneRecordData> {
        self.data.first()
    }

    pub fn set_ttl(&mut self, ttl: u32) {
        self.ttl = ttl;
    }

    pub fn limit_ttl(&mut self, ttl: u32) {
        if self.ttl > ttl {
            self.ttl = ttl
        }
    }

    pub fn push_data(&mut self, data: ZoneRecordData) {
        assert_eq!(data.rtype(), self.rtype);
        self.data.push(data);
    }

    /// Adds data to the set and returns the set.
    #[must_use]
    pub fn with_data(mut self, data: impl Into<ZoneRecordData>) -> Self {
        self.push_data(data.into());
        self
    }

    pub fn into_shared(self) -> SharedRrset {
        SharedRrset::new(self)
    }
}

impl From<ZoneRecordData> for Rrset {
    fn from(data: ZoneRecordData) -> Self {
        Rrset {
            rtype: data.rtype(),
            ttl: 3600,
            data: vec![data],
        }
    }
}

//------------ SharedRrset ---------------------------------------------------

/// An RRset behind an arc.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SharedRrset(Arc<Rrset>);

impl SharedRrset {
    pub fn new(rrset: Rrset) -> Self {
        SharedRrset(Arc::new(rrset))
    }

    pub fn as_rrset(&self) -> &Rrset {
        self.0.as_ref()
    }
}

//--- Deref, AsRef

impl ops::Deref for SharedRrset {
    type Target = Rrset;

    fn deref(&self) -> &Self::Target {
        self.as_rrset()
    }
}

impl AsRef<Rrset> for SharedRrset {
    fn as_ref(&self) -> &Rrset {
        self.as_rrset()
    }
}

impl From<Rrset> for SharedRrset {
    fn from(rrset: Rrset) -> Self {
        SharedRrset::new(rrset)
    }
}
