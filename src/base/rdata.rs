//! Record data.
//!
//! The catalog zone schema only uses a handful of record types. These are
//! represented by dedicated variants of [`ZoneRecordData`]. Anything else
//! is kept as opaque octets together with its record type so it can still
//! be stored in a zone and reported when encountered.

use core::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use bytes::Bytes;
use std::vec::Vec;

use super::iana::Rtype;
use super::name::Name;

//------------ ZoneRecordData ------------------------------------------------

/// The record data of a record stored in a zone.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ZoneRecordData {
    /// An IPv4 host address.
    A(Ipv4Addr),

    /// An IPv6 host address.
    Aaaa(Ipv6Addr),

    /// An authoritative name server.
    Ns(Name),

    /// The start of a zone of authority.
    Soa(Soa),

    /// A domain name pointer.
    Ptr(Name),

    /// A sequence of character strings.
    Txt(Txt),

    /// An address prefix list.
    Apl(Apl),

    /// Data of any other record type as opaque octets.
    Other(Rtype, Bytes),
}

impl ZoneRecordData {
    /// Returns the record type of the data.
    pub fn rtype(&self) -> Rtype {
        match *self {
            ZoneRecordData::A(_) => Rtype::A,
            ZoneRecordData::Aaaa(_) => Rtype::AAAA,
            ZoneRecordData::Ns(_) => Rtype::NS,
            ZoneRecordData::Soa(_) => Rtype::SOA,
            ZoneRecordData::Ptr(_) => Rtype::PTR,
            ZoneRecordData::Txt(_) => Rtype::TXT,
            ZoneRecordData::Apl(_) => Rtype::APL,
            ZoneRecordData::Other(rtype, _) => rtype,
        }
    }
}

//--- From

impl From<Ipv4Addr> for ZoneRecordData {
    fn from(addr: Ipv4Addr) -> Self {
        ZoneRecordData::A(addr)
    }
}

impl From<Ipv6Addr> for ZoneRecordData {
    fn from(addr: Ipv6Addr) -> Self {
        ZoneRecordData::Aaaa(addr)
    }
}

impl From<Txt> for ZoneRecordData {
    fn from(txt: Txt) -> Self {
        ZoneRecordData::Txt(txt)
    }
}

impl From<Apl> for ZoneRecordData {
    fn from(apl: Apl) -> Self {
        ZoneRecordData::Apl(apl)
    }
}

//------------ Soa -----------------------------------------------------------

/// Start of a zone of authority.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Soa {
    pub mname: Name,
    pub rname: Name,
    pub serial: u32,
    pub refresh: u32,
    pub retry: u32,
    pub expire: u32,
    pub minimum: u32,
}

//------------ Txt -----------------------------------------------------------

/// TXT record data: a non-empty sequence of character strings.
///
/// Each character string is at most 255 octets long.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Txt(Vec<Bytes>);

impl Txt {
    /// Creates TXT data from a sequence of character strings.
    ///
    /// Returns `None` if there are no strings or one of them is too long.
    pub fn from_strings<I, S>(strings: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        let strings: Vec<Bytes> = strings
            .into_iter()
            .map(|s| Bytes::copy_from_slice(s.as_ref()))
            .collect();
        if strings.is_empty() || strings.iter().any(|s| s.len() > 255) {
            None
        } else {
            Some(Txt(strings))
        }
    }

    /// Returns an iterator over the character strings.
    pub fn iter(&self) -> impl Iterator<Item = &[u8]> {
        self.0.iter().map(AsRef::as_ref)
    }

    /// Returns the number of character strings.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns the content if there is exactly one character string.
    pub fn as_single(&self) -> Option<&[u8]> {
        match self.0.as_slice() {
            [single] => Some(single.as_ref()),
            _ => None,
        }
    }
}

//------------ Apl -----------------------------------------------------------

/// Address prefix list record data.
///
/// See [RFC 3123] for the definition of the record type.
///
/// [RFC 3123]: https://tools.ietf.org/html/rfc3123
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Apl(Vec<AplItem>);

impl Apl {
    pub fn new(items: Vec<AplItem>) -> Self {
        Apl(items)
    }

    pub fn items(&self) -> &[AplItem] {
        &self.0
    }
}

impl FromIterator<AplItem> for Apl {
    fn from_iter<T: IntoIterator<Item = AplItem>>(iter: T) -> Self {
        Apl(iter.into_iter().collect())
    }
}

//------------ AplItem -------------------------------------------------------

/// A single item of an address prefix list.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AplItem {
    /// The address family as registered with IANA.
    ///
    /// Family 1 is IPv4, family 2 is IPv6.
    pub family: u16,

    /// The prefix length in bits.
    pub prefix: u8,

    /// Whether the item excludes the prefix.
    pub negation: bool,

    /// The address part with trailing zero octets removed.
    pub afdpart: Bytes,
}

impl AplItem {
    /// The address family number for IPv4.
    pub const IPV4: u16 = 1;

    /// The address family number for IPv6.
    pub const IPV6: u16 = 2;

    /// Creates an IPv4 item.
    pub fn v4(addr: Ipv4Addr, prefix: u8, negation: bool) -> Self {
        Self::new(Self::IPV4, &addr.octets(), prefix, negation)
    }

    /// Creates an IPv6 item.
    pub fn v6(addr: Ipv6Addr, prefix: u8, negation: bool) -> Self {
        Self::new(Self::IPV6, &addr.octets(), prefix, negation)
    }

    fn new(family: u16, octets: &[u8], prefix: u8, negation: bool) -> Self {
        let len = octets
            .iter()
            .rposition(|&octet| octet != 0)
            .map(|pos| pos + 1)
            .unwrap_or(0);
        AplItem {
            family,
            prefix,
            negation,
            afdpart: Bytes::copy_from_slice(&octets[..len]),
        }
    }

    /// Returns the IPv4 address of an IPv4 item.
    pub fn ipv4(&self) -> Option<Ipv4Addr> {
        if self.family != Self::IPV4 {
            return None;
        }
        let mut octets = [0u8; 4];
        let len = self.afdpart.len().min(4);
        octets[..len].copy_from_slice(&self.afdpart[..len]);
        Some(octets.into())
    }

    /// Returns the IPv6 address of an IPv6 item.
    pub fn ipv6(&self) -> Option<Ipv6Addr> {
        if self.family != Self::IPV6 {
            return None;
        }
        let mut octets = [0u8; 16];
        let len = self.afdpart.len().min(16);
        octets[..len].copy_from_slice(&self.afdpart[..len]);
        Some(octets.into())
    }
}

//--- Display

impl fmt::Display for AplItem {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.negation {
            f.write_str("!")?;
        }
        match (self.ipv4(), self.ipv6()) {
            (Some(addr), _) => write!(f, "1:{}/{}", addr, self.prefix),
            (_, Some(addr)) => write!(f, "2:{}/{}", addr, self.prefix),
            _ => write!(f, "{}:/{}", self.family, self.prefix),
        }
    }
}

//============ Testing =======================================================
