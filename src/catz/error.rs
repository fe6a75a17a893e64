//! Catalog zone related errors.

use core::fmt;

use std::string::String;

use crate::base::iana::{Class, Rtype};
use crate::base::name::NameError;
use crate::zonedb::DbError;

//------------ ParseError ----------------------------------------------------

/// A record of a catalog zone could not be processed.
///
/// Most of these only cause the offending property to be ignored. Some of
/// them mark the whole catalog zone as broken. See
/// [`ParsedCatalog::process_rrset`][super::ParsedCatalog::process_rrset]
/// for details.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ParseError {
    /// The record type is not allowed for the property.
    WrongType(Rtype),

    /// The property requires exactly one record.
    MultipleRecords,

    /// The version property could not be parsed.
    BadVersion,

    /// A custom property was used without the `ext` label.
    ExtRequired,

    /// The property label is not known.
    UnknownProperty,

    /// The property doesn't allow labels in front of it.
    UnexpectedPrefix,

    /// A property refers to a member zone that doesn't exist.
    MissingEntry,

    /// A name that must not be empty or the root is.
    EmptyName,

    /// The owner name is not within the catalog zone.
    OutOfZone,

    /// The class of the records is not the class of catalog zones.
    ClassMismatch(Class),

    /// A record of this type is not allowed at the apex.
    UnexpectedApexRecord(Rtype),

    /// The property requires a newer schema version.
    VersionTooOld,

    /// A TXT record doesn't have the required shape.
    BadTxt,

    /// A name could not be created.
    BadName(NameError),
}

//--- From

impl From<NameError> for ParseError {
    fn from(err: NameError) -> Self {
        ParseError::BadName(err)
    }
}

//--- Display and Error

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ParseError::WrongType(rtype) => {
                write!(f, "unexpected record type {rtype}")
            }
            ParseError::MultipleRecords => {
                write!(f, "more than one record")
            }
            ParseError::BadVersion => write!(f, "bad version"),
            ParseError::ExtRequired => {
                write!(f, "custom property requires 'ext' label")
            }
            ParseError::UnknownProperty => write!(f, "unknown property"),
            ParseError::UnexpectedPrefix => {
                write!(f, "unexpected labels before property")
            }
            ParseError::MissingEntry => write!(f, "member zone not found"),
            ParseError::EmptyName => write!(f, "empty name"),
            ParseError::OutOfZone => write!(f, "out of zone"),
            ParseError::ClassMismatch(class) => {
                write!(f, "unexpected class {class}")
            }
            ParseError::UnexpectedApexRecord(rtype) => {
                write!(f, "unexpected record type {rtype} at apex")
            }
            ParseError::VersionTooOld => {
                write!(f, "not supported by schema version")
            }
            ParseError::BadTxt => write!(f, "malformed TXT record"),
            ParseError::BadName(err) => write!(f, "bad name: {err}"),
        }
    }
}

impl std::error::Error for ParseError {}

//------------ UpdateError ---------------------------------------------------

/// A run of the update pipeline did not result in a merge.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum UpdateError {
    /// The registry is shutting down.
    ShuttingDown,

    /// The catalog zone is not part of the registry anymore.
    NotFound,

    /// The catalog zone was replaced or deactivated during the run.
    Canceled,

    /// The catalog zone content is unusable.
    Broken,

    /// The catalog zone has no SOA record at its apex.
    NoSoa,

    /// Reading the zone database failed.
    Database(DbError),
}

//--- From

impl From<DbError> for UpdateError {
    fn from(err: DbError) -> Self {
        UpdateError::Database(err)
    }
}

//--- Display and Error

impl fmt::Display for UpdateError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            UpdateError::ShuttingDown => write!(f, "shutting down"),
            UpdateError::NotFound => write!(f, "not found"),
            UpdateError::Canceled => write!(f, "operation canceled"),
            UpdateError::Broken => write!(f, "catalog zone is broken"),
            UpdateError::NoSoa => write!(f, "no SOA record"),
            UpdateError::Database(err) => write!(f, "database: {err}"),
        }
    }
}

impl std::error::Error for UpdateError {}

//------------ HostError -----------------------------------------------------

/// The host server failed to change its zone table.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum HostError {
    /// The zone already exists.
    Exists,

    /// The zone doesn't exist.
    NotFound,

    /// Any other failure.
    Failure(String),
}

//--- Display and Error

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            HostError::Exists => write!(f, "exists"),
            HostError::NotFound => write!(f, "not found"),
            HostError::Failure(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for HostError {}

//------------ RegistryError -------------------------------------------------

/// The catalog zone registry rejected an operation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RegistryError {
    /// The registry is shutting down.
    ShuttingDown,

    /// A view with a different name was given.
    ViewMismatch,
}

//--- Display and Error

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RegistryError::ShuttingDown => write!(f, "shutting down"),
            RegistryError::ViewMismatch => write!(f, "view name mismatch"),
        }
    }
}

impl std::error::Error for RegistryError {}

//------------ ZoneConfigError -----------------------------------------------

/// The configuration of a member zone could not be generated.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ZoneConfigError {
    /// A labelled primary server has no address.
    NoPrimaryAddress,

    /// The name of the member zone is not known.
    UnnamedEntry,
}

//--- Display and Error

impl fmt::Display for ZoneConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ZoneConfigError::NoPrimaryAddress => {
                write!(f, "primary server without address")
            }
            ZoneConfigError::UnnamedEntry => {
                write!(f, "member zone without name")
            }
        }
    }
}

impl std::error::Error for ZoneConfigError {}
