//! The zone database a catalog zone is read from.
//!
//! The catalog zone engine doesn't own the data of a catalog zone. It reads
//! it from a database provided by the server, accessed through the
//! [`ZoneDatabase`] trait. A database keeps several versions of a zone: the
//! engine opens the current version when it learns of a change, walks the
//! nodes of that version using a [`DbIterator`], reads the RRsets of every
//! node, and closes the version again once it is done.
//!
//! Databases tell interested parties about new versions through the
//! [`UpdateNotifier`] trait. The catalog zone registry registers itself as
//! a notifier with every catalog zone database it is told about.
//!
//! [`MemoryDatabase`] is a versioned in-memory implementation of the trait.

use core::fmt;

use std::boxed::Box;
use std::sync::Arc;
use std::vec::Vec;

use crate::base::iana::Class;
use crate::base::name::Name;
use crate::base::rrset::SharedRrset;

pub use self::in_memory::{MemoryDatabase, WriteDatabase};

mod in_memory;

//------------ Version -------------------------------------------------------

/// A handle to a version of the content of a zone database.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Version(u32);

impl Version {
    pub fn next(self) -> Version {
        Version(self.0.wrapping_add(1))
    }

    pub fn to_int(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}

//------------ NodeId --------------------------------------------------------

/// Identifies a node, i.e., an owner name, of a zone database.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct NodeId(usize);

impl NodeId {
    pub fn from_index(index: usize) -> Self {
        NodeId(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

//------------ ZoneDatabase --------------------------------------------------

/// A versioned zone database.
pub trait ZoneDatabase: Send + Sync {
    /// Returns the apex name of the zone.
    fn origin(&self) -> &Name;

    /// Returns the class of the zone.
    fn class(&self) -> Class;

    /// Opens the current version of the database.
    ///
    /// The version remains readable until it is closed again via
    /// [`close_version`][Self::close_version], even if newer versions are
    /// created in the meantime.
    fn current_version(&self) -> Version;

    /// Closes a version previously opened.
    fn close_version(&self, version: Version);

    /// Creates an iterator over the nodes of the given version.
    ///
    /// Nodes are visited in canonical name order. If the version isn't
    /// open, the iterator is empty.
    fn iterator(&self, version: Version) -> Box<dyn DbIterator>;

    /// Returns all RRsets of `node` for the given version.
    ///
    /// A node that doesn't exist in the version has no RRsets.
    fn all_rrsets(
        &self,
        node: NodeId,
        version: Version,
    ) -> Result<Vec<SharedRrset>, DbError>;

    /// Registers a notifier to be called whenever a new version is created.
    ///
    /// Registering the same notifier a second time has no effect.
    fn register_update_notifier(&self, notifier: Arc<dyn UpdateNotifier>);

    /// Removes a notifier registration.
    fn unregister_update_notifier(&self, notifier: &Arc<dyn UpdateNotifier>);
}

//------------ DbIterator ----------------------------------------------------

/// An iterator over the nodes of a zone database.
///
/// The iterator is a cursor: it is positioned via [`first`][Self::first],
/// [`seek`][Self::seek] or [`next`][Self::next] and the node it is
/// positioned at is returned by [`current`][Self::current].
pub trait DbIterator: Send {
    /// Positions the iterator at the node for `name`.
    ///
    /// Returns [`DbError::NotFound`] if there is no such node. In this case
    /// the position of the iterator is undefined.
    fn seek(&mut self, name: &Name) -> Result<(), DbError>;

    /// Positions the iterator at the first node.
    fn first(&mut self) -> Result<(), DbError>;

    /// Advances the iterator to the next node.
    ///
    /// Returns [`DbError::NoMore`] if the iterator was at the last node.
    fn next(&mut self) -> Result<(), DbError>;

    /// Returns the node the iterator is positioned at.
    fn current(&self) -> Result<(NodeId, Name), DbError>;
}

//------------ UpdateNotifier ------------------------------------------------

/// Receives notifications about new versions of a zone database.
pub trait UpdateNotifier: Send + Sync {
    /// Called after a new version of `db` has been committed.
    ///
    /// The method is called without any locks of the database held.
    fn on_update(&self, db: Arc<dyn ZoneDatabase>);
}

//============ Error Types ===================================================

//------------ DbError -------------------------------------------------------

/// An error happened while accessing a zone database.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DbError {
    /// There is no node for the requested name.
    NotFound,

    /// An iterator was advanced past its last node.
    NoMore,

    /// The version isn't open or doesn't exist.
    UnknownVersion,

    /// The node doesn't exist in the database.
    UnknownNode,
}

//--- Display and Error

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DbError::NotFound => write!(f, "not found"),
            DbError::NoMore => write!(f, "no more"),
            DbError::UnknownVersion => write!(f, "unknown version"),
            DbError::UnknownNode => write!(f, "unknown node"),
        }
    }
}

impl std::error::Error for DbError {}
