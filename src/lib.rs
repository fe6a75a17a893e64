//! DNS catalog zone synchronization.
//!
//! A catalog zone is a regular DNS zone whose records describe a set of
//! other zones, the _member zones_, that a name server should provision
//! automatically. This crate provides the machinery that keeps the set of
//! member zones configured in a server in sync with the content of one or
//! more catalog zones as described in [RFC 9432].
//!
//! The crate is organised in three modules:
//!
//! * [base] contains the DNS building blocks the engine works with: domain
//!   names and labels, record types and classes, record data and RRsets.
//! * [zonedb] describes the zone database a catalog zone is read from, in
//!   the form of the [`ZoneDatabase`][zonedb::ZoneDatabase] trait, and
//!   provides a versioned in-memory implementation of it.
//! * [catz] contains the catalog zone engine proper: the parser for the
//!   catalog zone schema, the per-view registry of catalog zones, the
//!   debounced update pipeline and the algorithm that merges a freshly
//!   parsed catalog into the live one by adding, modifying and deleting
//!   member zones through a [`ZoneHost`][catz::ZoneHost].
//!
//! # Reference of Feature Flags
//!
//! * `serde`: Enables deserializing catalog zone [`Options`] from
//!   configuration data via the [serde](https://serde.rs/) crate. This
//!   feature is enabled by default.
//!
//! [RFC 9432]: https://www.rfc-editor.org/rfc/rfc9432
//! [`Options`]: catz::Options

#![no_std]
#![allow(renamed_and_removed_lints)]
#![allow(clippy::unknown_clippy_lints)]
#![cfg_attr(docsrs, feature(doc_cfg))]

#[allow(unused_imports)] // Import macros even if unused.
#[macro_use]
extern crate std;

#[macro_use]
extern crate core;

pub mod base;
pub mod catz;
pub mod zonedb;
