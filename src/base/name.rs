//! Domain names and labels.
//!
//! Names are kept in uncompressed wire format inside a [`Bytes`] value so
//! they are cheap to clone and share between the stores of a catalog zone.
//! All comparisons and hashing ignore ASCII case, and the ordering of
//! [`Name`] is the canonical DNS ordering of [RFC 4034], section 6.1.
//!
//! [RFC 4034]: https://tools.ietf.org/html/rfc4034

use core::str::FromStr;
use core::{borrow, cmp, fmt, hash, mem, ops};

use bytes::Bytes;
use std::borrow::ToOwned;
use std::vec::Vec;

//------------ Label ---------------------------------------------------------

/// An octets slice with the content of a domain name label.
///
/// This is an unsized type wrapping the content of a valid label, i.e., at
/// most 63 octets without the preceding length octet. It is used behind a
/// reference.
///
/// Labels compare and hash ignoring ASCII case.
#[repr(transparent)]
pub struct Label([u8]);

impl Label {
    /// Domain name labels have a maximum length of 63 octets.
    pub const MAX_LEN: usize = 63;

    /// Creates a label from the underlying slice without any checking.
    ///
    /// # Safety
    ///
    /// The `slice` must be at most 63 octets long.
    unsafe fn from_slice_unchecked(slice: &[u8]) -> &Self {
        // SAFETY: Label has repr(transparent)
        mem::transmute(slice)
    }

    /// Returns a static reference to the root label.
    #[must_use]
    pub fn root() -> &'static Self {
        unsafe { Self::from_slice_unchecked(b"") }
    }

    /// Converts an octets slice into a label.
    pub fn from_slice(slice: &[u8]) -> Result<&Self, NameError> {
        if slice.len() > Label::MAX_LEN {
            Err(NameError::LongLabel)
        } else {
            Ok(unsafe { Self::from_slice_unchecked(slice) })
        }
    }

    /// Returns a reference to the underlying octets slice.
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Returns the length of the label's content.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns whether this is the root label.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns whether the label equals the ASCII string `s`, ignoring case.
    pub fn eq_str(&self, s: &str) -> bool {
        self.0.eq_ignore_ascii_case(s.as_bytes())
    }
}

//--- ToOwned

impl ToOwned for Label {
    type Owned = OwnedLabel;

    fn to_owned(&self) -> Self::Owned {
        OwnedLabel(Bytes::copy_from_slice(self.as_slice()))
    }
}

//--- PartialEq, Eq

impl PartialEq for Label {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for Label {}

//--- PartialOrd, Ord

impl PartialOrd for Label {
    /// Returns an ordering between `self` and `other`.
    ///
    /// Labels are ordered like octet strings except that the case of ASCII
    /// letters is ignored.
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Label {
    fn cmp(&self, other: &Self) -> cmp::Ordering {
        self.0
            .iter()
            .map(u8::to_ascii_lowercase)
            .cmp(other.0.iter().map(u8::to_ascii_lowercase))
    }
}

//--- Hash

impl hash::Hash for Label {
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        // Include the length so that hashing a sequence of labels is
        // unambiguous.
        (self.len() as u8).hash(state);
        for c in self.0.iter() {
            c.to_ascii_lowercase().hash(state)
        }
    }
}

//--- Display and Debug

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for &ch in self.0.iter() {
            if ch == b' ' || ch == b'.' || ch == b'\\' || ch == b'"' {
                write!(f, "\\{}", ch as char)?;
            } else if !(0x20..0x7F).contains(&ch) {
                write!(f, "\\{:03}", ch)?;
            } else {
                write!(f, "{}", (ch as char))?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Label {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("Label(")?;
        fmt::Display::fmt(self, f)?;
        f.write_str(")")
    }
}

//------------ OwnedLabel ----------------------------------------------------

/// An owned label.
///
/// This is used as the key of member zone entries, which are identified by
/// the single label below the `zones` label of a catalog zone.
#[derive(Clone)]
pub struct OwnedLabel(Bytes);

impl OwnedLabel {
    /// Creates a new owned label from an existing label.
    pub fn from_label(label: &Label) -> Self {
        label.to_owned()
    }

    /// Returns a reference to the label.
    pub fn as_label(&self) -> &Label {
        unsafe { Label::from_slice_unchecked(self.0.as_ref()) }
    }
}

//--- FromStr

impl FromStr for OwnedLabel {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut octets = Vec::new();
        let mut chars = s.bytes().peekable();
        if chars.peek().is_none() {
            return Err(NameError::EmptyLabel);
        }
        while let Some(ch) = chars.next() {
            match ch {
                b'.' => return Err(NameError::BadLabel),
                b'\\' => octets.push(parse_escape(&mut chars)?),
                _ => octets.push(ch),
            }
        }
        Label::from_slice(&octets)?;
        Ok(OwnedLabel(octets.into()))
    }
}

//--- Deref, Borrow, AsRef

impl ops::Deref for OwnedLabel {
    type Target = Label;

    fn deref(&self) -> &Self::Target {
        self.as_label()
    }
}

impl borrow::Borrow<Label> for OwnedLabel {
    fn borrow(&self) -> &Label {
        self.as_label()
    }
}

impl AsRef<Label> for OwnedLabel {
    fn as_ref(&self) -> &Label {
        self.as_label()
    }
}

//--- PartialEq, Eq, PartialOrd, Ord, Hash

impl PartialEq for OwnedLabel {
    fn eq(&self, other: &Self) -> bool {
        self.as_label().eq(other.as_label())
    }
}

impl Eq for OwnedLabel {}

impl PartialOrd for OwnedLabel {
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OwnedLabel {
    fn cmp(&self, other: &Self) -> cmp::Ordering {
        self.as_label().cmp(other.as_label())
    }
}

impl hash::Hash for OwnedLabel {
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        self.as_label().hash(state)
    }
}

//--- Display and Debug

impl fmt::Display for OwnedLabel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.as_label().fmt(f)
    }
}

impl fmt::Debug for OwnedLabel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("OwnedLabel").field(&self.as_label()).finish()
    }
}

//------------ LabelIter -----------------------------------------------------

/// An iterator over the labels of a name in wire format.
///
/// For absolute names the last item is the root label.
#[derive(Clone)]
pub struct LabelIter<'a> {
    slice: &'a [u8],
}

impl<'a> LabelIter<'a> {
    fn new(slice: &'a [u8]) -> Self {
        LabelIter { slice }
    }

    /// Returns the offset of the start of the last label in the slice.
    fn last_offset(&self) -> Option<usize> {
        let mut pos = 0;
        let mut last = None;
        while pos < self.slice.len() {
            last = Some(pos);
            pos += usize::from(self.slice[pos]) + 1;
        }
        last
    }
}

impl<'a> Iterator for LabelIter<'a> {
    type Item = &'a Label;

    fn next(&mut self) -> Option<Self::Item> {
        let (&len, rest) = self.slice.split_first()?;
        let len = usize::from(len);
        let (label, rest) = rest.split_at(len);
        self.slice = rest;
        Some(unsafe { Label::from_slice_unchecked(label) })
    }
}

impl<'a> DoubleEndedIterator for LabelIter<'a> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let start = self.last_offset()?;
        let label = &self.slice[start + 1..];
        self.slice = &self.slice[..start];
        Some(unsafe { Label::from_slice_unchecked(label) })
    }
}

//------------ Name ----------------------------------------------------------

/// An uncompressed, absolute domain name.
///
/// The type wraps a [`Bytes`] value containing the name in wire format
/// including the final root label. Use [`FromStr`] to create a name from
/// its presentation format or [`Name::from_labels`] to assemble one.
///
/// The [`Display`][fmt::Display] implementation produces the name without
/// the trailing dot, except for the root name which is displayed as a
/// single dot.
#[derive(Clone)]
pub struct Name(Bytes);

impl Name {
    /// Domain names have a maximum length of 255 octets.
    pub const MAX_LEN: usize = 255;

    /// Returns the root name.
    pub fn root() -> Self {
        Name(Bytes::from_static(b"\0"))
    }

    /// Creates a name from wire format octets.
    ///
    /// The octets must contain a correctly encoded, uncompressed absolute
    /// name with the root label as its only empty label.
    pub fn from_octets(octets: Bytes) -> Result<Self, NameError> {
        check_wire(&octets, true)?;
        Ok(Name(octets))
    }

    /// Creates a name from a sequence of labels.
    ///
    /// The root label is appended if the sequence doesn't end in it. Empty
    /// labels other than a final root label are rejected.
    pub fn from_labels<'a>(
        labels: impl IntoIterator<Item = &'a Label>,
    ) -> Result<Self, NameError> {
        let mut octets = Vec::new();
        let mut saw_root = false;
        for label in labels {
            if saw_root {
                return Err(NameError::EmptyLabel);
            }
            if label.is_root() {
                saw_root = true;
                continue;
            }
            octets.push(label.len() as u8);
            octets.extend_from_slice(label.as_slice());
        }
        octets.push(0);
        if octets.len() > Self::MAX_LEN {
            return Err(NameError::LongName);
        }
        Ok(Name(octets.into()))
    }

    /// Returns the wire format octets of the name.
    pub fn as_slice(&self) -> &[u8] {
        self.0.as_ref()
    }

    /// Returns an iterator over the labels of the name, root included.
    pub fn iter(&self) -> LabelIter {
        LabelIter::new(self.as_slice())
    }

    /// Returns the number of labels in the name, root included.
    pub fn label_count(&self) -> usize {
        self.iter().count()
    }

    /// Returns whether this is the root name.
    pub fn is_root(&self) -> bool {
        self.0.len() == 1
    }

    /// Returns whether `base` is a suffix of this name.
    pub fn ends_with(&self, base: &Name) -> bool {
        let mut own = self.iter().rev();
        for label in base.iter().rev() {
            match own.next() {
                Some(own) if own == label => {}
                _ => return false,
            }
        }
        true
    }

    /// Strips `base` off the end of this name.
    ///
    /// Returns the remaining labels as a relative name, which is empty if
    /// both names are equal, or `None` if `base` isn't a suffix.
    pub fn strip_suffix(&self, base: &Name) -> Option<RelativeName> {
        if !self.ends_with(base) {
            return None;
        }
        let keep = self.label_count() - base.label_count();
        RelativeName::from_labels(self.iter().take(keep)).ok()
    }

    /// Creates a new name by prepending `prefix` to this name.
    pub fn prepend(&self, prefix: &RelativeName) -> Result<Name, NameError> {
        Name::from_labels(prefix.iter().chain(self.iter()))
    }

    /// Returns an object that displays the name with a final dot.
    pub fn fmt_with_dot(&self) -> impl fmt::Display + '_ {
        DisplayWithDot(self)
    }
}

//--- FromStr

impl FromStr for Name {
    type Err = NameError;

    /// Parses a name from its presentation format.
    ///
    /// Relative names are treated as absolute, i.e., `"example.com"` and
    /// `"example.com."` are the same name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "." {
            return Ok(Name::root());
        }
        let mut octets = parse_presentation(s)?;
        octets.push(0);
        if octets.len() > Self::MAX_LEN {
            return Err(NameError::LongName);
        }
        Ok(Name(octets.into()))
    }
}

//--- PartialEq, Eq

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len() && self.iter().eq(other.iter())
    }
}

impl Eq for Name {}

//--- PartialOrd, Ord

impl PartialOrd for Name {
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Name {
    /// Returns the canonical ordering of two names.
    ///
    /// Names are compared label by label starting at the root.
    fn cmp(&self, other: &Self) -> cmp::Ordering {
        self.iter().rev().cmp(other.iter().rev())
    }
}

//--- Hash

impl hash::Hash for Name {
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        for label in self.iter() {
            label.hash(state)
        }
    }
}

//--- Display and Debug

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_root() {
            return f.write_str(".");
        }
        let mut first = true;
        for label in self.iter().filter(|label| !label.is_root()) {
            if !first {
                f.write_str(".")?;
            }
            first = false;
            write!(f, "{}", label)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Name({})", self.fmt_with_dot())
    }
}

struct DisplayWithDot<'a>(&'a Name);

impl fmt::Display for DisplayWithDot<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.0.is_root() {
            f.write_str(".")
        } else {
            write!(f, "{}.", self.0)
        }
    }
}

//--- Deserialize and Serialize

#[cfg(feature = "serde")]
impl serde::Serialize for Name {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.fmt_with_dot())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Name {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Self, D::Error> {
        struct Visitor;

        impl<'de> serde::de::Visitor<'de> for Visitor {
            type Value = Name;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a domain name")
            }

            fn visit_str<E: serde::de::Error>(
                self,
                v: &str,
            ) -> Result<Self::Value, E> {
                Name::from_str(v).map_err(E::custom)
            }
        }

        deserializer.deserialize_str(Visitor)
    }
}

//------------ RelativeName --------------------------------------------------

/// An uncompressed, relative domain name.
///
/// This is a sequence of non-root labels in wire format. The catalog zone
/// parser uses relative names for owner names below the catalog zone apex.
#[derive(Clone)]
pub struct RelativeName(Bytes);

impl RelativeName {
    /// Returns the empty relative name.
    pub fn empty() -> Self {
        RelativeName(Bytes::new())
    }

    /// Creates a relative name from a sequence of non-root labels.
    pub fn from_labels<'a>(
        labels: impl IntoIterator<Item = &'a Label>,
    ) -> Result<Self, NameError> {
        let mut octets = Vec::new();
        for label in labels {
            if label.is_root() {
                return Err(NameError::EmptyLabel);
            }
            octets.push(label.len() as u8);
            octets.extend_from_slice(label.as_slice());
        }
        if octets.len() >= Name::MAX_LEN {
            return Err(NameError::LongName);
        }
        Ok(RelativeName(octets.into()))
    }

    /// Returns an iterator over the labels of the name.
    pub fn iter(&self) -> LabelIter {
        LabelIter::new(self.0.as_ref())
    }

    /// Returns the number of labels in the name.
    pub fn label_count(&self) -> usize {
        self.iter().count()
    }

    /// Returns whether the name has no labels.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the right-most label of the name.
    pub fn last(&self) -> Option<&Label> {
        self.iter().next_back()
    }

    /// Splits off the right-most `count` labels.
    ///
    /// Returns the remaining left-hand labels. If the name has fewer labels
    /// than `count`, returns `None`.
    pub fn strip_last(&self, count: usize) -> Option<RelativeName> {
        let total = self.label_count();
        if count > total {
            return None;
        }
        let end: usize = self
            .iter()
            .take(total - count)
            .map(|label| label.len() + 1)
            .sum();
        Some(RelativeName(self.0.slice(..end)))
    }

    /// Returns the label `count` positions from the right-hand end.
    ///
    /// The right-most label is at position zero.
    pub fn label_from_end(&self, count: usize) -> Option<&Label> {
        self.iter().rev().nth(count)
    }
}

//--- FromStr

impl FromStr for RelativeName {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(RelativeName::empty());
        }
        let octets = parse_presentation(s.strip_suffix('.').unwrap_or(s))?;
        if octets.len() >= Name::MAX_LEN {
            return Err(NameError::LongName);
        }
        Ok(RelativeName(octets.into()))
    }
}

//--- PartialEq, Eq, Hash

impl PartialEq for RelativeName {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len() && self.iter().eq(other.iter())
    }
}

impl Eq for RelativeName {}

impl hash::Hash for RelativeName {
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        for label in self.iter() {
            label.hash(state)
        }
    }
}

//--- Display and Debug

impl fmt::Display for RelativeName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut first = true;
        for label in self.iter() {
            if !first {
                f.write_str(".")?;
            }
            first = false;
            write!(f, "{}", label)?;
        }
        Ok(())
    }
}

impl fmt::Debug for RelativeName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "RelativeName({})", self)
    }
}

//------------ Helper Functions ----------------------------------------------

/// Checks that `octets` is a valid uncompressed name in wire format.
fn check_wire(octets: &[u8], absolute: bool) -> Result<(), NameError> {
    if octets.len() > Name::MAX_LEN {
        return Err(NameError::LongName);
    }
    let mut pos = 0;
    while pos < octets.len() {
        let len = usize::from(octets[pos]);
        if len > Label::MAX_LEN {
            return Err(NameError::LongLabel);
        }
        if len == 0 {
            if absolute && pos + 1 == octets.len() {
                return Ok(());
            }
            return Err(NameError::EmptyLabel);
        }
        pos += len + 1;
    }
    if pos > octets.len() {
        return Err(NameError::ShortInput);
    }
    if absolute {
        Err(NameError::ShortInput)
    } else {
        Ok(())
    }
}

/// Parses dot separated labels into wire format without a root label.
fn parse_presentation(s: &str) -> Result<Vec<u8>, NameError> {
    let s = s.strip_suffix('.').unwrap_or(s);
    if s.is_empty() {
        return Err(NameError::EmptyLabel);
    }
    let mut octets = Vec::with_capacity(s.len() + 1);
    let mut label_start = 0;
    octets.push(0);
    let mut chars = s.bytes().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            b'.' => {
                finish_label(&mut octets, label_start)?;
                label_start = octets.len();
                octets.push(0);
            }
            b'\\' => octets.push(parse_escape(&mut chars)?),
            _ => octets.push(ch),
        }
    }
    finish_label(&mut octets, label_start)?;
    Ok(octets)
}

/// Fills in the length octet of the label starting at `start`.
fn finish_label(octets: &mut [u8], start: usize) -> Result<(), NameError> {
    let len = octets.len() - start - 1;
    if len == 0 {
        return Err(NameError::EmptyLabel);
    }
    if len > Label::MAX_LEN {
        return Err(NameError::LongLabel);
    }
    octets[start] = len as u8;
    Ok(())
}

/// Parses the remainder of an escape sequence after the backslash.
fn parse_escape(
    chars: &mut core::iter::Peekable<core::str::Bytes>,
) -> Result<u8, NameError> {
    let first = chars.next().ok_or(NameError::BadEscape)?;
    if !first.is_ascii_digit() {
        return Ok(first);
    }
    let mut value = u16::from(first - b'0');
    for _ in 0..2 {
        match chars.next() {
            Some(ch) if ch.is_ascii_digit() => {
                value = value * 10 + u16::from(ch - b'0');
            }
            _ => return Err(NameError::BadEscape),
        }
    }
    u8::try_from(value).map_err(|_| NameError::BadEscape)
}

//============ Error Types ===================================================

//------------ NameError -----------------------------------------------------

/// A domain name or label could not be created.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NameError {
    /// An empty label was encountered where it isn't allowed.
    EmptyLabel,

    /// A label was longer than 63 octets.
    LongLabel,

    /// The name was longer than 255 octets.
    LongName,

    /// An escape sequence was malformed.
    BadEscape,

    /// A single label contained a dot.
    BadLabel,

    /// The wire format data ended prematurely.
    ShortInput,
}

//--- Display and Error

impl fmt::Display for NameError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            NameError::EmptyLabel => f.write_str("empty label"),
            NameError::LongLabel => f.write_str("long label"),
            NameError::LongName => f.write_str("long domain name"),
            NameError::BadEscape => f.write_str("illegal escape sequence"),
            NameError::BadLabel => f.write_str("label contains a dot"),
            NameError::ShortInput => f.write_str("unexpected end of input"),
        }
    }
}

impl std::error::Error for NameError {}

//============ Testing =======================================================
