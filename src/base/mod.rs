//! Handling of DNS data.
//!
//! This module provides the types the catalog zone engine is built from:
//! domain [names][name] and labels, the [IANA][iana] record type and class
//! values, [record data][rdata] for the record types used in catalog zones,
//! and [RRsets][rrset] as they are stored in a zone.

pub mod iana;
pub mod name;
pub mod rdata;
pub mod rrset;

pub use self::iana::{Class, Rtype};
pub use self::name::{Label, Name, NameError, OwnedLabel, RelativeName};
pub use self::rdata::ZoneRecordData;
pub use self::rrset::{Rrset, SharedRrset};
