//! Configuration for member zones.
//!
//! A host server that provisions member zones through its regular zone
//! configuration machinery can use [`zone_config`] to produce the
//! configuration statement for a member zone and [`master_file_name`] to
//! decide where the zone's data is stored.

use core::fmt::Write;

use std::string::String;

use ring::digest;
use tracing::error;

use super::entry::Entry;
use super::error::ZoneConfigError;
use super::registry::View;
use crate::base::name::Name;

/// The longest composite name used as a file name without hashing.
const MAX_LITERAL_LEN: usize = 2 * 32 + 1;

/// Returns the name of the file to store a member zone in.
///
/// The file name is derived from the names of the view, the catalog zone
/// and the member zone. If these contain characters that are unsafe in
/// file names or are too long, their SHA-256 digest is used instead. The
/// zone directory of the entry's options is prepended if set.
pub fn master_file_name(
    view: &View,
    catz: &Name,
    entry: &Entry,
) -> Result<String, ZoneConfigError> {
    let member = entry.name().ok_or(ZoneConfigError::UnnamedEntry)?;
    let composite = format!("{}_{}_{}", view.name(), catz, member);

    let mut res = String::new();
    if let Some(dir) = &entry.options().zone_dir {
        res.push_str(dir);
        res.push('/');
    }
    res.push_str("__catz__");
    if composite.contains(['\\', '/', ':'])
        || composite.len() > MAX_LITERAL_LEN
    {
        let digest = digest::digest(&digest::SHA256, composite.as_bytes());
        for ch in digest.as_ref() {
            let _ = write!(res, "{:02x}", ch);
        }
    } else {
        res.push_str(&composite);
    }
    res.push_str(".db");
    Ok(res)
}

/// Returns the configuration statement for a member zone.
///
/// The zone is configured as a secondary zone transferred from the
/// primaries of the entry's options. Every primary must have an address.
pub fn zone_config(
    view: &View,
    catz: &Name,
    entry: &Entry,
) -> Result<String, ZoneConfigError> {
    let member = entry.name().ok_or(ZoneConfigError::UnnamedEntry)?;
    let options = entry.options();

    let mut res =
        format!("zone \"{member}\" {{ type secondary; primaries {{ ");
    for primary in &options.primaries {
        let Some(addr) = primary.addr else {
            error!(
                "catz: zone '{}' uses an invalid primary (no IP address \
                 assigned)",
                member
            );
            return Err(ZoneConfigError::NoPrimaryAddress);
        };
        let _ = write!(res, "{} port {}", addr.ip(), addr.port());
        if let Some(key) = &primary.key {
            let _ = write!(res, " key {key}");
        }
        if let Some(tls) = &primary.tls {
            let _ = write!(res, " tls {tls}");
        }
        res.push_str("; ");
    }
    res.push_str("}; ");
    if !options.in_memory {
        let file = master_file_name(view, catz, entry)?;
        let _ = write!(res, "file \"{file}\"; ");
    }
    if let Some(acl) = &options.allow_query {
        let _ = write!(res, "allow-query {{ {acl}}}; ");
    }
    if let Some(acl) = &options.allow_transfer {
        let _ = write!(res, "allow-transfer {{ {acl}}}; ");
    }
    res.push_str("};");
    Ok(res)
}

//============ Testing =======================================================
