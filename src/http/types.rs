#![allow(rustdoc::bare_urls)]

//! Core HTTP protocol types and utilities

use crate::{errors::Error, query::Query};
use std::{borrow::Cow, fmt};

/// `tchar` from [RFC 7230, Section 3.2.6](https://tools.ietf.org/html/rfc7230#section-3.2.6).
#[inline(always)]
pub(crate) const fn is_token_byte(byte: u8) -> bool {
    matches!(
        byte,
        b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.'
            | b'^' | b'_' | b'`' | b'|' | b'~'
            | b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z'
    )
}

#[inline(always)]
pub(crate) fn is_token(src: &[u8]) -> bool {
    !src.is_empty() && src.iter().all(|&b| is_token_byte(b))
}

/// Parses an unsigned decimal, rejecting empty input, non-digits and overflow.
#[inline(always)]
pub(crate) fn slice_to_u64(bytes: &[u8]) -> Option<u64> {
    if bytes.is_empty() {
        return None;
    }

    let mut result: u64 = 0;

    for &byte in bytes {
        if !byte.is_ascii_digit() {
            return None;
        }

        result = result
            .checked_mul(10)?
            .checked_add((byte - b'0') as u64)?;
    }

    Some(result)
}

/// Parses an unsigned hexadecimal (chunk sizes), rejecting the same things
/// as [`slice_to_u64`].
#[inline(always)]
pub(crate) fn hex_to_u64(bytes: &[u8]) -> Option<u64> {
    if bytes.is_empty() {
        return None;
    }

    let mut result: u64 = 0;

    for &byte in bytes {
        result = result
            .checked_mul(16)?
            .checked_add(hex_digit(byte)? as u64)?;
    }

    Some(result)
}

#[inline(always)]
pub(crate) const fn hex_digit(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

#[inline(always)]
pub(crate) fn trim_ows(mut src: &[u8]) -> &[u8] {
    while let [b' ' | b'\t', rest @ ..] = src {
        src = rest;
    }
    while let [rest @ .., b' ' | b'\t'] = src {
        src = rest;
    }
    src
}

// METHOD

/// HTTP request methods
///
/// Well-known methods get their own variant, every other valid token is
/// preserved verbatim in [`Method::Extension`]. Only input that is not an
/// RFC 7230 token is rejected.
///
/// # References
///
/// - [RFC 7231, Section 4](https://datatracker.ietf.org/doc/html/rfc7231#section-4)
/// - [RFC 5789](https://datatracker.ietf.org/doc/html/rfc5789) (PATCH method)
/// - [RFC 4918](https://datatracker.ietf.org/doc/html/rfc4918) (WebDAV methods)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    /// [[RFC7231, Section 4.3.1](https://tools.ietf.org/html/rfc7231#section-4.3.1)]
    Get,
    /// [[RFC7231, Section 4.3.2](https://tools.ietf.org/html/rfc7231#section-4.3.2)]
    Head,
    /// [[RFC7231, Section 4.3.3](https://tools.ietf.org/html/rfc7231#section-4.3.3)]
    Post,
    /// [[RFC7231, Section 4.3.4](https://tools.ietf.org/html/rfc7231#section-4.3.4)]
    Put,
    /// [[RFC7231, Section 4.3.5](https://tools.ietf.org/html/rfc7231#section-4.3.5)]
    Delete,
    /// [[RFC7231, Section 4.3.6](https://tools.ietf.org/html/rfc7231#section-4.3.6)]
    Connect,
    /// [[RFC7231, Section 4.3.7](https://tools.ietf.org/html/rfc7231#section-4.3.7)]
    Options,
    /// [[RFC7231, Section 4.3.8](https://tools.ietf.org/html/rfc7231#section-4.3.8)]
    Trace,
    /// [[RFC5789, Section 2](https://tools.ietf.org/html/rfc5789#section-2)]
    Patch,
    /// [[RFC4918, Section 9.1](https://tools.ietf.org/html/rfc4918#section-9.1)]
    Propfind,
    /// [[RFC4918, Section 9.2](https://tools.ietf.org/html/rfc4918#section-9.2)]
    Proppatch,
    /// [[RFC4918, Section 9.3](https://tools.ietf.org/html/rfc4918#section-9.3)]
    Mkcol,
    /// [[RFC4918, Section 9.8](https://tools.ietf.org/html/rfc4918#section-9.8)]
    Copy,
    /// [[RFC4918, Section 9.9](https://tools.ietf.org/html/rfc4918#section-9.9)]
    Move,
    /// [[RFC4918, Section 9.10](https://tools.ietf.org/html/rfc4918#section-9.10)]
    Lock,
    /// [[RFC4918, Section 9.11](https://tools.ietf.org/html/rfc4918#section-9.11)]
    Unlock,
    /// Cache invalidation verb understood by most reverse proxies
    Purge,
    /// Any other method token, kept as received
    Extension(Box<str>),
}

impl Method {
    #[inline]
    pub(crate) fn from_bytes(src: &[u8]) -> Result<Self, Error> {
        let method = match src {
            b"GET" => Method::Get,
            b"HEAD" => Method::Head,
            b"POST" => Method::Post,
            b"PUT" => Method::Put,
            b"DELETE" => Method::Delete,
            b"CONNECT" => Method::Connect,
            b"OPTIONS" => Method::Options,
            b"TRACE" => Method::Trace,
            b"PATCH" => Method::Patch,
            b"PROPFIND" => Method::Propfind,
            b"PROPPATCH" => Method::Proppatch,
            b"MKCOL" => Method::Mkcol,
            b"COPY" => Method::Copy,
            b"MOVE" => Method::Move,
            b"LOCK" => Method::Lock,
            b"UNLOCK" => Method::Unlock,
            b"PURGE" => Method::Purge,
            other if is_token(other) => {
                // Token bytes are ASCII, so this never fails.
                let name = std::str::from_utf8(other).map_err(|_| Error::InvalidMethod)?;
                Method::Extension(name.into())
            }
            _ => return Err(Error::InvalidMethod),
        };

        Ok(method)
    }

    /// Returns the method token as sent on the wire.
    pub fn as_str(&self) -> &str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Connect => "CONNECT",
            Method::Options => "OPTIONS",
            Method::Trace => "TRACE",
            Method::Patch => "PATCH",
            Method::Propfind => "PROPFIND",
            Method::Proppatch => "PROPPATCH",
            Method::Mkcol => "MKCOL",
            Method::Copy => "COPY",
            Method::Move => "MOVE",
            Method::Lock => "LOCK",
            Method::Unlock => "UNLOCK",
            Method::Purge => "PURGE",
            Method::Extension(name) => name,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// VERSION

/// HTTP protocol version
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Version {
    /// HTTP/1.0 - Added headers and status codes (1996)
    ///
    /// [RFC 1945](https://tools.ietf.org/html/rfc1945)
    Http10,

    /// HTTP/1.1 - Current standard with keep-alive and chunking (1999)
    ///
    /// [RFC 7230](https://tools.ietf.org/html/rfc7230) and related
    Http11,
}

impl Version {
    /// `HTTP/1.0` and `HTTP/1.1` are accepted; any other well-formed
    /// `HTTP/x.y` is unsupported, everything else is malformed.
    #[inline(always)]
    pub(crate) const fn from_bytes(src: &[u8]) -> Result<Self, Error> {
        match src {
            b"HTTP/1.1" => Ok(Self::Http11),
            b"HTTP/1.0" => Ok(Self::Http10),
            [b'H', b'T', b'T', b'P', b'/', major, b'.', minor]
                if major.is_ascii_digit() && minor.is_ascii_digit() =>
            {
                Err(Error::UnsupportedVersion)
            }
            _ => Err(Error::InvalidVersion),
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Version::Http10 => "HTTP/1.0",
            Version::Http11 => "HTTP/1.1",
        }
    }

    /// Whether connections default to persistent for this version.
    #[inline(always)]
    pub const fn default_keep_alive(&self) -> bool {
        matches!(self, Version::Http11)
    }
}

// STATUS_CODE

macro_rules! set_status_codes {
    ($(
        $(#[$docs:meta])+
        $name:ident = ($num:expr, $str:expr);
    )+) => {
        /// HTTP status codes
        ///
        /// Represents valid HTTP status codes as defined in
        /// [RFC 7231](https://tools.ietf.org/html/rfc7231#section-6) and other standards.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum StatusCode { $(
            #[doc = concat!(stringify!($num), " ", $str)]
            $(#[$docs])+
            $name = $num,
        )+ }

        impl StatusCode {
            /// Returns the status line as bytes (e.g., `b"HTTP/1.1 200 OK\r\n"`).
            #[inline]
            pub const fn into_first_line(&self, version: Version) -> &'static [u8] {
                match (self, version) { $(
                    (StatusCode::$name, Version::Http11) => {
                        concat!("HTTP/1.1 ", $num, " ", $str, "\r\n").as_bytes()
                    },
                    (StatusCode::$name, Version::Http10) => {
                        concat!("HTTP/1.0 ", $num, " ", $str, "\r\n").as_bytes()
                    },
                )+ }
            }

            /// Returns the canonical reason phrase.
            #[inline]
            pub const fn reason(&self) -> &'static str {
                match self { $(
                    StatusCode::$name => $str,
                )+ }
            }

            /// Looks up a registered status code.
            #[inline]
            pub const fn from_u16(code: u16) -> Option<Self> {
                match code { $(
                    $num => Some(StatusCode::$name),
                )+
                    _ => None,
                }
            }
        }
    }
}

impl StatusCode {
    #[inline(always)]
    pub const fn as_u16(&self) -> u16 {
        *self as u16
    }

    /// 1xx, 204 and 304 responses never carry a body
    /// ([RFC 7230, Section 3.3.3](https://tools.ietf.org/html/rfc7230#section-3.3.3)).
    #[inline(always)]
    pub const fn forbids_body(code: u16) -> bool {
        (code >= 100 && code < 200) || code == 204 || code == 304
    }
}

set_status_codes! {
    /// [[RFC9110, Section 15.2.1](https://datatracker.ietf.org/doc/html/rfc9110#section-15.2.1)]
    Continue = (100, "Continue");
    /// [[RFC9110, Section 15.2.2](https://datatracker.ietf.org/doc/html/rfc9110#section-15.2.2)]
    SwitchingProtocols = (101, "Switching Protocols");

    /// [[RFC9110, Section 15.3.1](https://datatracker.ietf.org/doc/html/rfc9110#section-15.3.1)]
    Ok = (200, "OK");
    /// [[RFC9110, Section 15.3.2](https://datatracker.ietf.org/doc/html/rfc9110#section-15.3.2)]
    Created = (201, "Created");
    /// [[RFC9110, Section 15.3.3](https://datatracker.ietf.org/doc/html/rfc9110#section-15.3.3)]
    Accepted = (202, "Accepted");
    /// [[RFC9110, Section 15.3.5](https://datatracker.ietf.org/doc/html/rfc9110#section-15.3.5)]
    NoContent = (204, "No Content");
    /// [[RFC9110, Section 15.3.7](https://datatracker.ietf.org/doc/html/rfc9110#section-15.3.7)]
    PartialContent = (206, "Partial Content");

    /// [[RFC9110, Section 15.4.2](https://datatracker.ietf.org/doc/html/rfc9110#section-15.4.2)]
    MovedPermanently = (301, "Moved Permanently");
    /// [[RFC9110, Section 15.4.3](https://datatracker.ietf.org/doc/html/rfc9110#section-15.4.3)]
    Found = (302, "Found");
    /// [[RFC9110, Section 15.4.4](https://datatracker.ietf.org/doc/html/rfc9110#section-15.4.4)]
    SeeOther = (303, "See Other");
    /// [[RFC9110, Section 15.4.5](https://datatracker.ietf.org/doc/html/rfc9110#section-15.4.5)]
    NotModified = (304, "Not Modified");
    /// [[RFC9110, Section 15.4.8](https://datatracker.ietf.org/doc/html/rfc9110#section-15.4.8)]
    TemporaryRedirect = (307, "Temporary Redirect");
    /// [[RFC9110, Section 15.4.9](https://datatracker.ietf.org/doc/html/rfc9110#section-15.4.9)]
    PermanentRedirect = (308, "Permanent Redirect");

    /// [[RFC9110, Section 15.5.1](https://datatracker.ietf.org/doc/html/rfc9110#section-15.5.1)]
    BadRequest = (400, "Bad Request");
    /// [[RFC9110, Section 15.5.2](https://datatracker.ietf.org/doc/html/rfc9110#section-15.5.2)]
    Unauthorized = (401, "Unauthorized");
    /// [[RFC9110, Section 15.5.4](https://datatracker.ietf.org/doc/html/rfc9110#section-15.5.4)]
    Forbidden = (403, "Forbidden");
    /// [[RFC9110, Section 15.5.5](https://datatracker.ietf.org/doc/html/rfc9110#section-15.5.5)]
    NotFound = (404, "Not Found");
    /// [[RFC9110, Section 15.5.6](https://datatracker.ietf.org/doc/html/rfc9110#section-15.5.6)]
    MethodNotAllowed = (405, "Method Not Allowed");
    /// [[RFC9110, Section 15.5.9](https://datatracker.ietf.org/doc/html/rfc9110#section-15.5.9)]
    RequestTimeout = (408, "Request Timeout");
    /// [[RFC9110, Section 15.5.12](https://datatracker.ietf.org/doc/html/rfc9110#section-15.5.12)]
    LengthRequired = (411, "Length Required");
    /// [[RFC9110, Section 15.5.14](https://datatracker.ietf.org/doc/html/rfc9110#section-15.5.14)]
    PayloadTooLarge = (413, "Payload Too Large");
    /// [[RFC9110, Section 15.5.15](https://datatracker.ietf.org/doc/html/rfc9110#section-15.5.15)]
    UriTooLong = (414, "URI Too Long");
    /// [[RFC9110, Section 15.5.16](https://datatracker.ietf.org/doc/html/rfc9110#section-15.5.16)]
    UnsupportedMediaType = (415, "Unsupported Media Type");
    /// [[RFC6585, Section 4](https://datatracker.ietf.org/doc/html/rfc6585#section-4)]
    TooManyRequests = (429, "Too Many Requests");
    /// [[RFC6585, Section 5](https://datatracker.ietf.org/doc/html/rfc6585#section-5)]
    RequestHeaderFieldsTooLarge = (431, "Request Header Fields Too Large");

    /// [[RFC9110, Section 15.6.1](https://datatracker.ietf.org/doc/html/rfc9110#section-15.6.1)]
    InternalServerError = (500, "Internal Server Error");
    /// [[RFC9110, Section 15.6.2](https://datatracker.ietf.org/doc/html/rfc9110#section-15.6.2)]
    NotImplemented = (501, "Not Implemented");
    /// [[RFC9110, Section 15.6.3](https://datatracker.ietf.org/doc/html/rfc9110#section-15.6.3)]
    BadGateway = (502, "Bad Gateway");
    /// [[RFC9110, Section 15.6.4](https://datatracker.ietf.org/doc/html/rfc9110#section-15.6.4)]
    ServiceUnavailable = (503, "Service Unavailable");
    /// [[RFC9110, Section 15.6.6](https://datatracker.ietf.org/doc/html/rfc9110#section-15.6.6)]
    HttpVersionNotSupported = (505, "HTTP Version Not Supported");
}

// Url

/// A request target with its decomposed path and query.
///
/// # Components
///
/// - **Target**: Raw request target (e.g., `/api/users/123?sort=name&debug`)
/// - **Path**: Target without query string (e.g., `/api/users/123`)
/// - **Segments**: Non-empty path pieces between `/` (e.g., `["api", "users", "123"]`)
/// - **Query**: Optional query string, decoded on demand
///
/// Absolute-form targets (`http://host/path`) expose the path after the
/// authority; authority-form (`host:443`) and asterisk-form (`*`) have an
/// empty path.
#[derive(Debug, Clone, Default, Eq, PartialEq, Hash)]
pub struct Url {
    pub(crate) target: String,
    pub(crate) path: (usize, usize),
    pub(crate) parts: Vec<(usize, usize)>,
    pub(crate) query: Option<usize>,
}

impl Url {
    /// Validates and decomposes a raw request target.
    pub fn parse(target: &str) -> Result<Self, Error> {
        let mut url = Url::default();
        url.fill(target)?;
        Ok(url)
    }

    pub(crate) fn fill(&mut self, target: &str) -> Result<(), Error> {
        self.clear();

        let bytes = target.as_bytes();
        if bytes.is_empty() || bytes.iter().any(|&b| b <= b' ' || b == 0x7F) {
            return Err(Error::InvalidTarget);
        }

        self.target.push_str(target);

        let path_start = match bytes {
            [b'/', ..] => 0,
            b"*" => bytes.len(),
            _ => match memchr::memmem::find(bytes, b"://") {
                Some(scheme_end) => {
                    let authority = scheme_end + 3;
                    memchr::memchr2(b'/', b'?', &bytes[authority..])
                        .map(|i| authority + i)
                        .unwrap_or(bytes.len())
                }
                None => bytes.len(),
            },
        };

        let query = memchr::memchr(b'?', &bytes[path_start..]).map(|i| path_start + i);
        let path_end = query.unwrap_or(bytes.len());

        self.path = (path_start, path_end);
        self.query = query;

        let mut start = path_start;
        for slash in memchr::memchr_iter(b'/', &bytes[path_start..path_end]) {
            let slash = path_start + slash;
            if slash > start {
                self.parts.push((start, slash));
            }
            start = slash + 1;
        }
        if path_end > start && start >= path_start {
            self.parts.push((start, path_end));
        }

        Ok(())
    }

    #[inline(always)]
    pub(crate) fn clear(&mut self) {
        self.target.clear();
        self.path = (0, 0);
        self.parts.clear();
        self.query = None;
    }
}

// Public API
impl Url {
    /// Returns the raw request target.
    ///
    /// # Examples
    ///
    /// For target `/api/users/123?sort=name&debug`:
    /// ```text
    /// /api/users/123?sort=name&debug
    /// ```
    #[inline(always)]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Returns the path component of the URL.
    ///
    /// # Examples
    ///
    /// For target `/api/users/123?sort=name&debug`:
    /// ```text
    /// /api/users/123
    /// ```
    #[inline(always)]
    pub fn path(&self) -> &str {
        &self.target[self.path.0..self.path.1]
    }

    /// Returns the path segment at the specified index.
    ///
    /// # Examples
    ///
    /// For target `/api/users/123?sort=name&debug`:
    /// - index `0`: `Some("api")`
    /// - index `2`: `Some("123")`
    /// - index `3`: `None`
    #[inline(always)]
    pub fn path_segment(&self, index: usize) -> Option<&str> {
        self.parts
            .get(index)
            .map(|&(start, end)| &self.target[start..end])
    }

    /// Returns all path segments in order.
    ///
    /// Empty segments (`//`, trailing `/`) are skipped.
    #[inline(always)]
    pub fn path_segments(&self) -> impl ExactSizeIterator<Item = &str> + '_ {
        self.parts
            .iter()
            .map(|&(start, end)| &self.target[start..end])
    }

    /// Checks if the path segments are exactly `pattern`.
    #[inline]
    pub fn matches(&self, pattern: &[&str]) -> bool {
        self.parts.len() == pattern.len() && self.path_segments().zip(pattern).all(|(a, b)| a == *b)
    }

    /// Checks if the path segments start with `pattern`.
    #[inline]
    pub fn starts_with(&self, pattern: &[&str]) -> bool {
        self.parts.len() >= pattern.len() && self.path_segments().zip(pattern).all(|(a, b)| a == *b)
    }

    /// Checks if the path segments end with `pattern`.
    #[inline]
    pub fn ends_with(&self, pattern: &[&str]) -> bool {
        let skip = match self.parts.len().checked_sub(pattern.len()) {
            Some(skip) => skip,
            None => return false,
        };
        self.path_segments().skip(skip).zip(pattern).all(|(a, b)| a == *b)
    }

    /// Returns the raw query string including the leading `?`.
    ///
    /// # Examples
    ///
    /// For target `/api/users/123?sort=name&debug`:
    /// ```text
    /// ?sort=name&debug
    /// ```
    #[inline(always)]
    pub fn query_full(&self) -> Option<&str> {
        self.query.map(|start| &self.target[start..])
    }

    /// Returns the first decoded value for `key`.
    ///
    /// Keys are compared after decoding and case-sensitively.
    ///
    /// # Examples
    ///
    /// For target `/search?q=hello+world&debug`:
    /// - at the key `"q"`: `Some("hello world")`
    /// - at the key `"debug"`: `Some("")`
    /// - at the key `"page"`: `None`
    pub fn query(&self, key: &str) -> Option<Cow<'_, str>> {
        let query = self.query_full()?;
        Query::find(query.as_bytes(), key.as_bytes())
            .map(|value| Query::decode_lossy(value))
    }

    /// Returns every decoded `(name, value)` pair in order, duplicates kept.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        match self.query_full() {
            Some(query) => Query::decode_pairs(query.as_bytes()),
            None => Vec::new(),
        }
    }
}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.target)
    }
}
