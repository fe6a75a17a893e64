//! Catalog zones.
//!
//! This module keeps the member zones of a server in sync with the catalog
//! zones configured for it.
//!
//! The starting point is [`CatalogZones`], the registry of the catalog
//! zones of a view. It is created with a [`ZoneHost`], the interface to the
//! server's zone table through which member zones are added, modified and
//! deleted. Catalog zones are added to the registry via
//! [`CatalogZones::zone_add_or_get`].
//!
//! Whenever a new version of a catalog zone's database becomes available,
//! the registry is told about it, either by the server calling
//! [`CatalogZones::db_updated`] or by the database calling the registry's
//! [notifier][CatalogZones::notifier]. After a debounce delay, the content
//! of the database is parsed into a [`ParsedCatalog`] and merged into the
//! live [`CatalogZone`], issuing the necessary zone table changes.
//!
//! The content of a catalog zone follows [RFC 9432]. Schema versions 1 and
//! 2 are supported. In addition to the properties defined by the RFC, the
//! custom properties `primaries` (or `masters`), `allow-query` and
//! `allow-transfer` can be used, both zone-wide and per member zone.
//!
//! [RFC 9432]: https://www.rfc-editor.org/rfc/rfc9432

pub use self::coo::{Coo, CooStore};
pub use self::entry::{Entry, EntryStore};
pub use self::error::{
    HostError, ParseError, RegistryError, UpdateError, ZoneConfigError,
};
pub use self::host::{HostZone, ZoneHost};
pub use self::options::{Options, PrimaryInfo};
pub use self::parse::{render_apl, ParsedCatalog};
pub use self::registry::{CatalogZones, View};
pub use self::store::Store;
pub use self::zone::{CatalogZone, UpdateMetrics, UpdateState};
pub use self::zonecfg::{master_file_name, zone_config};

mod coo;
mod entry;
mod error;
mod host;
mod merge;
mod options;
mod parse;
mod registry;
mod store;
mod update;
mod zone;
mod zonecfg;
