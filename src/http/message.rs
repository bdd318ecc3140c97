//! Parsed (or hand-built) HTTP message and its wire serializer.

use crate::{
    errors::Error,
    http::{
        fields::{BasicAuth, Field, FieldName},
        headers::HeaderMap,
        multipart::Multipart,
        types::{Method, StatusCode, Url, Version},
    },
    query::Query,
};
use std::fmt::Write;

/// The start line: request line or status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Head {
    Request { method: Method, url: Url },
    Response { status: u16, reason: String },
}

/// One HTTP request or response.
///
/// Produced by [`Parser`](crate::Parser) with every field already
/// validated, or built by hand with [`Message::request`] /
/// [`Message::response`] and turned into bytes with [`Message::serialize`].
///
/// The body is always stored decoded: a chunked body holds the concatenated
/// chunk data and its trailers are merged into [`headers`](Self::headers).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub(crate) head: Head,
    pub(crate) version: Version,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Vec<u8>,

    pub(crate) keep_alive: bool,
    pub(crate) chunked: bool,
    pub(crate) content_length: Option<u64>,
    pub(crate) has_body: bool,
}

impl Message {
    pub(crate) fn empty(header_capacity: usize) -> Self {
        Self {
            head: Head::Request {
                method: Method::Get,
                url: Url::default(),
            },
            version: Version::Http11,
            headers: HeaderMap::with_capacity(header_capacity),
            body: Vec::new(),

            keep_alive: true,
            chunked: false,
            content_length: None,
            has_body: false,
        }
    }

    /// Resets to an empty request, keeping every allocation.
    pub(crate) fn clear(&mut self) {
        if let Head::Request { method, url } = &mut self.head {
            *method = Method::Get;
            url.clear();
        }
        self.version = Version::Http11;
        self.headers.clear();
        self.body.clear();

        self.keep_alive = true;
        self.chunked = false;
        self.content_length = None;
        self.has_body = false;
    }

    /// Builds a request without headers or body.
    pub fn request(method: Method, target: &str, version: Version) -> Result<Self, Error> {
        let mut message = Self::empty(8);
        message.head = Head::Request {
            method,
            url: Url::parse(target)?,
        };
        message.version = version;
        message.keep_alive = version.default_keep_alive();
        Ok(message)
    }

    /// Builds a response with an empty body.
    ///
    /// An empty `reason` uses the registered phrase of `status` when there is one.
    /// Statuses that allow a body start with `Content-Length: 0`, so the
    /// serialized response is framed even when no body is ever set.
    pub fn response(status: u16, reason: &str, version: Version) -> Result<Self, Error> {
        if !(100..=999).contains(&status) || reason.bytes().any(|b| b.is_ascii_control() && b != b'\t') {
            return Err(Error::InvalidStatus);
        }

        let reason = match (reason.is_empty(), StatusCode::from_u16(status)) {
            (true, Some(code)) => code.reason(),
            _ => reason,
        };

        let mut message = Self::empty(8);
        message.head = Head::Response {
            status,
            reason: reason.to_owned(),
        };
        message.version = version;
        message.keep_alive = version.default_keep_alive();

        if !StatusCode::forbids_body(status) {
            message.headers.push("Content-Length", "0");
            message.content_length = Some(0);
        }
        Ok(message)
    }

    /// Replaces the body and updates `Content-Length` to match.
    ///
    /// For a chunked message only the body changes, framing stays chunked.
    pub fn set_body(&mut self, body: impl Into<Vec<u8>>) {
        self.body = body.into();
        self.has_body = !self.body.is_empty();

        if !self.chunked {
            let len = self.body.len() as u64;
            let mut value = String::with_capacity(20);
            let _ = write!(value, "{len}");

            // Digits never contain CR or LF.
            let _ = self.headers.set("Content-Length", &value);
            self.content_length = Some(len);
        }
    }

    /// Switches to chunked framing: drops `Content-Length` and adds
    /// `Transfer-Encoding: chunked`.
    pub fn set_chunked(&mut self) {
        self.headers.remove_all("Content-Length");
        let _ = self.headers.set("Transfer-Encoding", "chunked");
        self.chunked = true;
        self.content_length = None;
    }

    /// Overrides persistence and writes the matching `Connection` header.
    pub fn set_keep_alive(&mut self, keep_alive: bool) {
        self.keep_alive = keep_alive;
        self.headers.remove_all("Connection");

        match (self.version, keep_alive) {
            (Version::Http11, false) | (Version::Http10, false) => {
                let _ = self.headers.add("Connection", "close");
            }
            (Version::Http10, true) => {
                let _ = self.headers.add("Connection", "keep-alive");
            }
            (Version::Http11, true) => {}
        }
    }
}

// Public API
impl Message {
    #[inline(always)]
    pub fn head(&self) -> &Head {
        &self.head
    }

    #[inline(always)]
    pub fn is_request(&self) -> bool {
        matches!(self.head, Head::Request { .. })
    }

    #[inline(always)]
    pub fn method(&self) -> Option<&Method> {
        match &self.head {
            Head::Request { method, .. } => Some(method),
            Head::Response { .. } => None,
        }
    }

    #[inline(always)]
    pub fn url(&self) -> Option<&Url> {
        match &self.head {
            Head::Request { url, .. } => Some(url),
            Head::Response { .. } => None,
        }
    }

    #[inline(always)]
    pub fn status(&self) -> Option<u16> {
        match &self.head {
            Head::Response { status, .. } => Some(*status),
            Head::Request { .. } => None,
        }
    }

    #[inline(always)]
    pub fn reason(&self) -> Option<&str> {
        match &self.head {
            Head::Response { reason, .. } => Some(reason),
            Head::Request { .. } => None,
        }
    }

    #[inline(always)]
    pub const fn version(&self) -> Version {
        self.version
    }

    #[inline(always)]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[inline(always)]
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Shorthand for `headers().get(name)`.
    #[inline(always)]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// The decoded body, empty when the message has none.
    #[inline(always)]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Takes the body out, leaving the message with an empty one.
    #[inline]
    pub fn take_body(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.body)
    }

    /// Whether the connection may carry another message after this one.
    #[inline(always)]
    pub const fn keep_alive(&self) -> bool {
        self.keep_alive
    }

    /// Whether the framing announced a non-empty body.
    #[inline(always)]
    pub const fn has_body(&self) -> bool {
        self.has_body
    }

    #[inline(always)]
    pub const fn is_chunked(&self) -> bool {
        self.chunked
    }

    /// `Content-Length`, defined only when the message is not chunked.
    #[inline(always)]
    pub const fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    /// Typed header view, see [`HeaderMap::field`].
    #[inline]
    pub fn field(&self, name: FieldName) -> Option<Field<'_>> {
        self.headers.field(name)
    }

    #[inline]
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.headers.cookie(name)
    }

    #[inline]
    pub fn basic_auth(&self) -> Option<BasicAuth> {
        self.headers.basic_auth()
    }

    /// Decoded fields of the query string followed by those of an
    /// `application/x-www-form-urlencoded` body, duplicates kept.
    pub fn form(&self) -> Vec<(String, String)> {
        let mut fields = match self.url() {
            Some(url) => url.query_pairs(),
            None => Vec::new(),
        };

        let urlencoded = self
            .headers
            .content_type()
            .is_some_and(|ct| ct.is_urlencoded());
        if urlencoded {
            fields.extend(Query::decode_pairs(&self.body));
        }

        fields
    }

    /// Splits a `multipart/form-data` body into parts.
    ///
    /// `None` when the message is not multipart or has no boundary.
    pub fn multipart(&self) -> Option<Multipart> {
        let content_type = self.headers.content_type()?;
        if !content_type.is_multipart_form_data() {
            return None;
        }

        Some(Multipart::parse(content_type.boundary()?, &self.body))
    }
}

// Serializer
impl Message {
    /// Appends the wire form of the message to `out`.
    ///
    /// Headers are written as stored. A chunked message gets its body as a
    /// single chunk followed by the last chunk; otherwise the body is
    /// written as is. Parsing the output yields an equal message.
    pub fn serialize(&self, out: &mut Vec<u8>) {
        match &self.head {
            Head::Request { method, url } => {
                out.extend_from_slice(method.as_str().as_bytes());
                out.push(b' ');
                out.extend_from_slice(url.target().as_bytes());
                out.push(b' ');
                out.extend_from_slice(self.version.as_str().as_bytes());
            }
            Head::Response { status, reason } => {
                out.extend_from_slice(self.version.as_str().as_bytes());
                let mut line = String::with_capacity(8);
                let _ = write!(line, " {status:03} ");
                out.extend_from_slice(line.as_bytes());
                out.extend_from_slice(reason.as_bytes());
            }
        }
        out.extend_from_slice(b"\r\n");

        self.headers.serialize(out);

        if self.chunked {
            if !self.body.is_empty() {
                let mut size = String::with_capacity(18);
                let _ = write!(size, "{:x}\r\n", self.body.len());
                out.extend_from_slice(size.as_bytes());
                out.extend_from_slice(&self.body);
                out.extend_from_slice(b"\r\n");
            }
            out.extend_from_slice(b"0\r\n\r\n");
        } else {
            out.extend_from_slice(&self.body);
        }
    }

    /// [`serialize`](Self::serialize) into a new buffer.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(128 + self.body.len());
        self.serialize(&mut out);
        out
    }
}
