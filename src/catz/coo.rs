//! Change of ownership permissions.

use core::fmt;

use super::store::Store;
use crate::base::name::Name;

//------------ Coo -----------------------------------------------------------

/// A change of ownership permission.
///
/// A catalog zone grants the catalog zone `name` permission to take over
/// the member zone `key`. The permission is declared via a `coo` PTR record
/// below the member zone's entry.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Coo {
    name: Name,
    key: Name,
}

impl Coo {
    pub fn new(name: Name, key: Name) -> Self {
        Coo { name, key }
    }

    /// Returns the name of the catalog zone granted ownership.
    pub fn name(&self) -> &Name {
        &self.name
    }

    /// Returns the name of the member zone the permission is for.
    pub fn key(&self) -> &Name {
        &self.key
    }
}

//--- Display

impl fmt::Display for Coo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} -> {}", self.key, self.name)
    }
}

//------------ CooStore ------------------------------------------------------

/// The change of ownership permissions of a catalog zone.
///
/// The store is keyed by the name of the member zone.
pub type CooStore = Store<Name, Coo>;
