//! The interface to the zone table of the host server.
//!
//! The catalog zone engine doesn't manage member zones itself. Instead, it
//! tells the server which zones to add, reconfigure or remove through the
//! [`ZoneHost`] trait. The server also lets the engine look up zones it
//! already serves so that the engine can find out which catalog zone, if
//! any, a member zone currently belongs to.

use std::sync::Arc;

use super::entry::Entry;
use super::error::HostError;
use super::registry::View;
use super::zone::CatalogZone;
use crate::base::name::Name;

//------------ ZoneHost ------------------------------------------------------

/// The zone table of a server provisioned via catalog zones.
///
/// The zone changing methods are called while the catalog zone given to
/// them is locked. They must not call methods of [`CatalogZone`] that take
/// the lock, such as [`CatalogZone::zone_options`]. They may use
/// [`CatalogZone::name`], [`CatalogZone::entries`] and
/// [`CatalogZone::coos`].
pub trait ZoneHost: Send + Sync {
    /// Adds the member zone described by `entry` to `view`.
    ///
    /// Should return [`HostError::Exists`] if the zone is already served.
    fn add_zone(
        &self,
        entry: &Entry,
        catz: &Arc<CatalogZone>,
        view: &View,
    ) -> Result<(), HostError>;

    /// Changes the configuration of the member zone described by `entry`.
    fn modify_zone(
        &self,
        entry: &Entry,
        catz: &Arc<CatalogZone>,
        view: &View,
    ) -> Result<(), HostError>;

    /// Removes the member zone described by `entry` from `view`.
    fn delete_zone(
        &self,
        entry: &Entry,
        catz: &Arc<CatalogZone>,
        view: &View,
    ) -> Result<(), HostError>;

    /// Looks up a zone served in `view`.
    ///
    /// Should return [`HostError::NotFound`] if there is no such zone.
    fn find_zone(
        &self,
        view: &View,
        name: &Name,
    ) -> Result<Arc<dyn HostZone>, HostError>;
}

//------------ HostZone ------------------------------------------------------

/// A zone served by the host server.
pub trait HostZone: Send + Sync {
    /// Returns the catalog zone the zone was provisioned by, if any.
    fn parent_catalog(&self) -> Option<Arc<CatalogZone>>;
}
