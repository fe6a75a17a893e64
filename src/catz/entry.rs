//! Member zone entries.

use core::fmt;

use super::options::Options;
use super::store::Store;
use crate::base::name::{Name, OwnedLabel};

//------------ Entry ---------------------------------------------------------

/// A member zone of a catalog zone.
///
/// Entries are identified by their unique label, the `mhash`, which is the
/// label directly below the `zones` label of the catalog zone. The name of
/// the member zone is taken from the PTR record at that owner. Until that
/// record has been seen, the entry has no name.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Entry {
    mhash: OwnedLabel,
    name: Option<Name>,
    options: Options,
}

impl Entry {
    pub fn new(mhash: OwnedLabel, name: Option<Name>) -> Self {
        Entry {
            mhash,
            name,
            options: Options::new(),
        }
    }

    pub fn mhash(&self) -> &OwnedLabel {
        &self.mhash
    }

    /// Returns the name of the member zone if it is known.
    pub fn name(&self) -> Option<&Name> {
        self.name.as_ref()
    }

    pub fn set_name(&mut self, name: Name) {
        self.name = Some(name);
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut Options {
        &mut self.options
    }

    /// Returns whether two entries configure a member zone the same way.
    ///
    /// Neither the unique label nor the member zone name are compared.
    pub fn is_equivalent(&self, other: &Entry) -> bool {
        self.options.is_equivalent(&other.options)
    }
}

//--- Display

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{name}"),
            None => write!(f, "<{}>", self.mhash),
        }
    }
}

//------------ EntryStore ----------------------------------------------------

/// The member zone entries of a catalog zone keyed by unique label.
pub type EntryStore = Store<OwnedLabel, Entry>;

//============ Testing =======================================================
