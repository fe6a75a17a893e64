//! Catalog zone options.
//!
//! The same [`Options`] type is used on three levels: the defaults for a
//! catalog zone taken from the server configuration, the zone-wide options
//! declared by the catalog zone itself, and the options of each member zone.
//! Lower levels inherit unset values from higher ones via
//! [`Options::set_default`].

use core::fmt;
use std::net::SocketAddr;
use std::string::String;
use std::vec::Vec;

use crate::base::name::{Name, RelativeName};

//------------ Options -------------------------------------------------------

/// The configuration of a catalog zone or a member zone.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "kebab-case"))]
pub struct Options {
    /// The primary servers to transfer the zone from.
    #[cfg_attr(feature = "serde", serde(alias = "masters"))]
    pub primaries: Vec<PrimaryInfo>,

    /// The `allow-query` access control list in configuration syntax.
    pub allow_query: Option<String>,

    /// The `allow-transfer` access control list in configuration syntax.
    pub allow_transfer: Option<String>,

    /// Whether member zones are kept in memory only.
    pub in_memory: bool,

    /// The minimum number of seconds between two updates of a catalog zone.
    pub min_update_interval: u32,

    /// The directory for the zone files of member zones.
    #[cfg_attr(feature = "serde", serde(rename = "zone-directory"))]
    pub zone_dir: Option<String>,
}

impl Options {
    /// The default minimum update interval in seconds.
    pub const DEFAULT_MIN_UPDATE_INTERVAL: u32 = 5;

    /// Creates a new, empty value.
    pub fn new() -> Self {
        Options {
            primaries: Vec::new(),
            allow_query: None,
            allow_transfer: None,
            in_memory: false,
            min_update_interval: Self::DEFAULT_MIN_UPDATE_INTERVAL,
            zone_dir: None,
        }
    }

    /// Returns whether neither primaries nor access control lists are set.
    pub fn is_empty(&self) -> bool {
        self.primaries.is_empty()
            && self.allow_query.is_none()
            && self.allow_transfer.is_none()
    }

    /// Copies all options into `target`.
    ///
    /// # Panics
    ///
    /// The target must not have any primaries or access control lists set.
    pub fn copy_to(&self, target: &mut Options) {
        assert!(target.is_empty(), "copy into populated catz options");
        target.clone_from(self);
    }

    /// Fills the unset options from `defaults`.
    ///
    /// The in-memory flag is always taken from `defaults` as it is derived
    /// from server configuration rather than declared in catalog zones.
    pub fn set_default(&mut self, defaults: &Options) {
        if self.primaries.is_empty() && !defaults.primaries.is_empty() {
            self.primaries.clone_from(&defaults.primaries);
        }
        if self.zone_dir.is_none() {
            self.zone_dir.clone_from(&defaults.zone_dir);
        }
        if self.allow_query.is_none() {
            self.allow_query.clone_from(&defaults.allow_query);
        }
        if self.allow_transfer.is_none() {
            self.allow_transfer.clone_from(&defaults.allow_transfer);
        }
        self.in_memory = defaults.in_memory;
    }

    /// Returns whether two sets of options configure a zone the same way.
    ///
    /// This compares the primaries, in order, and the access control lists.
    /// Labels of primaries are not compared.
    pub fn is_equivalent(&self, other: &Options) -> bool {
        self.primaries.len() == other.primaries.len()
            && self
                .primaries
                .iter()
                .zip(other.primaries.iter())
                .all(|(left, right)| left.is_equivalent(right))
            && self.allow_query == other.allow_query
            && self.allow_transfer == other.allow_transfer
    }
}

//--- Default

impl Default for Options {
    fn default() -> Self {
        Self::new()
    }
}

//------------ PrimaryInfo ---------------------------------------------------

/// A primary server of a zone.
///
/// Primaries declared in a catalog zone with a label can be defined across
/// multiple records: the address comes from an A or AAAA record, the TSIG
/// key name from a TXT record with the same label.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PrimaryInfo {
    /// The address of the server.
    ///
    /// A port of zero means the default port.
    pub addr: Option<SocketAddr>,

    /// The name of the TSIG key to use.
    pub key: Option<Name>,

    /// The name of the TLS configuration to use.
    pub tls: Option<Name>,

    /// The label the server was declared with in a catalog zone.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub label: Option<RelativeName>,
}

impl PrimaryInfo {
    /// Creates information for a server known by address only.
    pub fn new(addr: SocketAddr) -> Self {
        PrimaryInfo {
            addr: Some(addr),
            ..Default::default()
        }
    }

    /// Creates an empty slot for a labelled server.
    pub fn labelled(label: RelativeName) -> Self {
        PrimaryInfo {
            label: Some(label),
            ..Default::default()
        }
    }

    fn is_equivalent(&self, other: &PrimaryInfo) -> bool {
        self.addr == other.addr
            && self.key == other.key
            && self.tls == other.tls
    }
}

//--- Display

impl fmt::Display for PrimaryInfo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.addr {
            Some(addr) => write!(f, "{addr}")?,
            None => f.write_str("<no address>")?,
        }
        if let Some(key) = &self.key {
            write!(f, " key {key}")?;
        }
        if let Some(tls) = &self.tls {
            write!(f, " tls {tls}")?;
        }
        Ok(())
    }
}

//============ Testing =======================================================
