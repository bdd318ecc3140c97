//! Ordered, case-insensitive header table.

use crate::{
    errors::Error,
    http::types::{is_token, trim_ows},
};
use memchr::memchr;
use std::{fmt, str};

#[derive(Debug, Clone, Default)]
struct Entry {
    name: String,
    value: String,
}

/// Ordered sequence of `(name, value)` header fields.
///
/// Names compare case-insensitively
/// (per [RFC 7230](https://tools.ietf.org/html/rfc7230#section-3.2)) and keep
/// the spelling they were added with. Repeated names are kept in insertion
/// order and addressed by their index among fields of the same name.
///
/// Clearing the table keeps the string allocations of previous entries, so a
/// table reused across messages stops allocating once it has seen a message
/// of the same shape.
///
/// # Examples
/// ```
/// use maker_http::HeaderMap;
///
/// let mut headers = HeaderMap::new();
/// headers.add("Accept", "text/html").unwrap();
/// headers.add("accept", "text/plain").unwrap();
///
/// assert_eq!(headers.find("ACCEPT", 1), Some("text/plain"));
/// assert_eq!(headers.count("Accept"), 2);
/// assert!(headers.add("X-Bad", "a\r\nInjected: 1").is_err());
/// ```
#[derive(Clone, Default)]
pub struct HeaderMap {
    entries: Vec<Entry>,
    len: usize,
}

impl HeaderMap {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            len: 0,
        }
    }

    /// Appends a field.
    ///
    /// The name must be an RFC 7230 token; the value must not contain CR,
    /// LF or NUL. Surrounding whitespace of the value is kept.
    pub fn add(&mut self, name: &str, value: &str) -> Result<(), Error> {
        if !is_token(name.as_bytes()) {
            return Err(Error::InvalidHeader);
        }
        if !is_valid_value(value.as_bytes()) {
            return Err(Error::InvalidHeader);
        }

        self.push(name, value);
        Ok(())
    }

    /// Returns the value of the `index`-th field named `name`.
    #[inline]
    pub fn find(&self, name: &str, index: usize) -> Option<&str> {
        self.active()
            .iter()
            .filter(|e| e.name.eq_ignore_ascii_case(name))
            .nth(index)
            .map(|e| e.value.as_str())
    }

    /// Shorthand for `find(name, 0)`.
    #[inline]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.find(name, 0)
    }

    /// Returns all values of fields named `name`, in order.
    #[inline]
    pub fn find_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.active()
            .iter()
            .filter(move |e| e.name.eq_ignore_ascii_case(name))
            .map(|e| e.value.as_str())
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.find_all(name).next().is_some()
    }

    /// Number of fields named `name`.
    #[inline]
    pub fn count(&self, name: &str) -> usize {
        self.find_all(name).count()
    }

    /// Removes the `index`-th field named `name` and returns its value.
    pub fn remove(&mut self, name: &str, index: usize) -> Option<String> {
        let at = self
            .active()
            .iter()
            .enumerate()
            .filter(|(_, e)| e.name.eq_ignore_ascii_case(name))
            .nth(index)
            .map(|(i, _)| i)?;

        let value = std::mem::take(&mut self.entries[at].value);
        self.entries[at..self.len].rotate_left(1);
        self.len -= 1;

        Some(value)
    }

    /// Removes every field named `name`, returning how many were removed.
    pub fn remove_all(&mut self, name: &str) -> usize {
        let mut removed = 0;
        while self.remove(name, 0).is_some() {
            removed += 1;
        }
        removed
    }

    /// Replaces the value of the first field named `name`, or appends one.
    pub fn set(&mut self, name: &str, value: &str) -> Result<(), Error> {
        if !is_valid_value(value.as_bytes()) {
            return Err(Error::InvalidHeader);
        }

        let len = self.len;
        match self.entries[..len]
            .iter_mut()
            .find(|e| e.name.eq_ignore_ascii_case(name))
        {
            Some(entry) => {
                entry.value.clear();
                entry.value.push_str(value);
                Ok(())
            }
            None => self.add(name, value),
        }
    }

    /// Appends the field unless one with the same name exists.
    ///
    /// Returns `true` if the field was added.
    pub fn set_if_absent(&mut self, name: &str, value: &str) -> Result<bool, Error> {
        if self.contains(name) {
            return Ok(false);
        }

        self.add(name, value).map(|_| true)
    }

    /// Iterates over `(name, value)` in insertion order.
    #[inline]
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&str, &str)> + '_ {
        self.active()
            .iter()
            .map(|e| (e.name.as_str(), e.value.as_str()))
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Removes all fields, keeping allocations for reuse.
    #[inline]
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Writes every field as `name: value\r\n`, then the terminating blank line.
    pub fn serialize(&self, out: &mut Vec<u8>) {
        self.serialize_fields(out);
        out.extend_from_slice(b"\r\n");
    }

    pub(crate) fn serialize_fields(&self, out: &mut Vec<u8>) {
        for entry in self.active() {
            out.extend_from_slice(entry.name.as_bytes());
            out.extend_from_slice(b": ");
            out.extend_from_slice(entry.value.as_bytes());
            out.extend_from_slice(b"\r\n");
        }
    }

    /// Whether any field named `name` lists `token` in its comma-separated
    /// value (case-insensitive), as `Connection: keep-alive, Upgrade` does.
    pub fn has_token(&self, name: &str, token: &str) -> bool {
        self.find_all(name).any(|value| {
            value
                .split(',')
                .any(|item| item.trim().eq_ignore_ascii_case(token))
        })
    }
}

// Parser side
impl HeaderMap {
    #[inline(always)]
    fn active(&self) -> &[Entry] {
        &self.entries[..self.len]
    }

    /// Appends without validation, reusing a spare entry when there is one.
    pub(crate) fn push(&mut self, name: &str, value: &str) {
        match self.entries.get_mut(self.len) {
            Some(entry) => {
                entry.name.clear();
                entry.name.push_str(name);
                entry.value.clear();
                entry.value.push_str(value);
            }
            None => self.entries.push(Entry {
                name: name.to_owned(),
                value: value.to_owned(),
            }),
        }

        self.len += 1;
    }

    /// Parses one header line (CRLF already stripped) and appends it.
    ///
    /// A line starting with SP or HT continues the previous field: its
    /// trimmed content is joined to the previous value with one space.
    pub(crate) fn push_line(&mut self, line: &[u8]) -> Result<(), Error> {
        if let [b' ' | b'\t', ..] = line {
            return self.fold(line);
        }

        let (name, value) = split_line(line)?;
        self.push(name, value);
        Ok(())
    }

    fn fold(&mut self, line: &[u8]) -> Result<(), Error> {
        let Some(last) = self.len.checked_sub(1) else {
            return Err(Error::InvalidFolding);
        };

        let more = trim_ows(line);
        if !is_valid_value(more) {
            return Err(Error::InvalidHeader);
        }
        let more = simdutf8::basic::from_utf8(more).map_err(|_| Error::InvalidEncoding)?;

        if more.is_empty() {
            return Ok(());
        }

        let value = &mut self.entries[last].value;
        if !value.is_empty() {
            value.push(' ');
        }
        value.push_str(more);
        Ok(())
    }
}

/// Splits `name: value`, trimming SP/HT around the value.
pub(crate) fn split_line(line: &[u8]) -> Result<(&str, &str), Error> {
    let colon = memchr(b':', line).ok_or(Error::InvalidHeader)?;

    let name = &line[..colon];
    if !is_token(name) {
        return Err(Error::InvalidHeader);
    }

    let value = trim_ows(&line[colon + 1..]);
    if !is_valid_value(value) {
        return Err(Error::InvalidHeader);
    }

    // Token bytes are ASCII.
    let name = str::from_utf8(name).map_err(|_| Error::InvalidHeader)?;
    let value = simdutf8::basic::from_utf8(value).map_err(|_| Error::InvalidEncoding)?;

    Ok((name, value))
}

#[inline(always)]
fn is_valid_value(value: &[u8]) -> bool {
    !value.iter().any(|&b| matches!(b, b'\r' | b'\n' | 0))
}

impl PartialEq for HeaderMap {
    fn eq(&self, other: &Self) -> bool {
        self.iter().eq(other.iter())
    }
}

impl Eq for HeaderMap {}

impl fmt::Debug for HeaderMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<'a> IntoIterator for &'a HeaderMap {
    type Item = (&'a str, &'a str);
    type IntoIter = Box<dyn ExactSizeIterator<Item = (&'a str, &'a str)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}
