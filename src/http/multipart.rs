//! `multipart/form-data` decoding
//! ([RFC 7578](https://tools.ietf.org/html/rfc7578),
//! [RFC 2046, Section 5.1](https://tools.ietf.org/html/rfc2046#section-5.1)).
//!
//! [`MultipartParser`] takes the body in arbitrary pieces and hands out each
//! part as soon as its closing delimiter has been seen. [`Multipart::parse`]
//! does the same for a body that is already complete.
//!
//! A missing final `--boundary--` is tolerated: the bytes after the last
//! delimiter become the last part and [`Multipart::is_complete`] is `false`.
//!
//! ```
//! use maker_http::multipart::Multipart;
//!
//! let body = b"--XyZ\r\n\
//!     Content-Disposition: form-data; name=\"title\"\r\n\r\n\
//!     Hello\r\n\
//!     --XyZ--\r\n";
//!
//! let form = Multipart::parse("XyZ", body);
//! assert!(form.is_complete());
//! assert_eq!(form.get("title").map(|p| p.body()), Some(&b"Hello"[..]));
//! ```

use crate::{
    http::{fields::ContentType, headers::HeaderMap},
    limits::ParserLimits,
};
use memchr::{memchr, memmem};
use std::{borrow::Cow, error, fmt, mem};

/// One body part: its own header table and raw content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Part {
    headers: HeaderMap,
    body: Vec<u8>,
}

impl Part {
    #[inline(always)]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[inline(always)]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    #[inline]
    pub fn into_body(self) -> Vec<u8> {
        self.body
    }

    /// The `name` parameter of `Content-Disposition`.
    pub fn name(&self) -> Option<&str> {
        self.headers.content_disposition()?.name()
    }

    /// The `filename` parameter of `Content-Disposition`, URL-decoded when
    /// it looks URL-encoded.
    pub fn filename(&self) -> Option<Cow<'_, str>> {
        self.headers.content_disposition()?.filename()
    }

    /// Defaults to `text/plain` when absent, as RFC 7578 says.
    pub fn content_type(&self) -> ContentType<'_> {
        self.headers
            .content_type()
            .unwrap_or(ContentType("text/plain"))
    }

    /// The content as text, if it is valid UTF-8.
    pub fn text(&self) -> Option<&str> {
        simdutf8::basic::from_utf8(&self.body).ok()
    }
}

/// A fully decoded multipart body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Multipart {
    parts: Vec<Part>,
    complete: bool,
}

impl Multipart {
    /// Splits `body` on `boundary`.
    ///
    /// Never fails: parsing stops at the first malformed part, and the parts
    /// before it are kept with `is_complete() == false`.
    pub fn parse(boundary: &str, body: &[u8]) -> Self {
        let mut parser = MultipartParser::new(boundary);
        let mut parts = Vec::new();

        if let Err(error) = parser.feed(body, &mut parts) {
            tracing::debug!(%error, parsed = parts.len(), "multipart body cut short");
            return Self {
                parts,
                complete: false,
            };
        }

        parts.extend(parser.finish());
        Self {
            parts,
            complete: parser.is_complete(),
        }
    }

    /// Whether the final `--boundary--` delimiter was seen.
    #[inline(always)]
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    #[inline(always)]
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    #[inline]
    pub fn into_parts(self) -> Vec<Part> {
        self.parts
    }

    /// First part whose form field name is `name`.
    pub fn get(&self, name: &str) -> Option<&Part> {
        self.parts.iter().find(|part| part.name() == Some(name))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Preamble,
    Delimiter,
    Headers,
    Body,
    Epilogue,
}

/// Streaming multipart decoder.
///
/// Part header lines are capped at
/// [`ParserLimits::header_line_size`]. After an error every call to
/// [`feed`](Self::feed) returns the same error.
#[derive(Debug)]
pub struct MultipartParser {
    /// `CRLF--boundary`
    delimiter: Vec<u8>,
    buf: Vec<u8>,
    state: State,
    /// Nothing has been discarded yet, so `buf` starts at the first body byte.
    fresh: bool,
    part: Part,
    complete: bool,
    line_limit: usize,
    failed: Option<Error>,
}

impl MultipartParser {
    pub fn new(boundary: &str) -> Self {
        Self::with_limits(boundary, &ParserLimits::default())
    }

    pub fn with_limits(boundary: &str, limits: &ParserLimits) -> Self {
        let mut delimiter = Vec::with_capacity(boundary.len() + 4);
        delimiter.extend_from_slice(b"\r\n--");
        delimiter.extend_from_slice(boundary.as_bytes());

        Self {
            delimiter,
            buf: Vec::new(),
            state: State::Preamble,
            fresh: true,
            part: Part::default(),
            complete: false,
            line_limit: limits.header_line_size,
            failed: None,
        }
    }

    /// Whether the final delimiter has been seen.
    #[inline(always)]
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Decodes the next piece of the body, appending finished parts to `parts`.
    pub fn feed(&mut self, bytes: &[u8], parts: &mut Vec<Part>) -> Result<(), Error> {
        if let Some(error) = self.failed {
            return Err(error);
        }
        self.buf.extend_from_slice(bytes);

        loop {
            let progressed = match self.state {
                State::Preamble => Ok(self.preamble()),
                State::Delimiter => self.after_delimiter(),
                State::Headers => self.header_line(),
                State::Body => Ok(self.body(parts)),
                State::Epilogue => {
                    self.buf.clear();
                    Ok(false)
                }
            };

            match progressed {
                Ok(true) => {}
                Ok(false) => return Ok(()),
                Err(error) => {
                    self.failed = Some(error);
                    self.buf.clear();
                    return Err(error);
                }
            }
        }
    }

    /// Ends the input. Returns the unterminated last part, if any.
    pub fn finish(&mut self) -> Option<Part> {
        let state = mem::replace(&mut self.state, State::Epilogue);

        match state {
            State::Body if self.failed.is_none() => {
                self.part.body.append(&mut self.buf);
                Some(mem::take(&mut self.part))
            }
            _ => {
                self.buf.clear();
                None
            }
        }
    }

    fn preamble(&mut self) -> bool {
        let first = &self.delimiter[2..];

        if self.fresh && self.buf.starts_with(first) {
            self.buf.drain(..first.len());
            self.state = State::Delimiter;
            return true;
        }
        if self.fresh && first.starts_with(&self.buf) {
            return false;
        }

        match memmem::find(&self.buf, &self.delimiter) {
            Some(at) => {
                self.buf.drain(..at + self.delimiter.len());
                self.state = State::Delimiter;
                true
            }
            None => {
                let keep = self.delimiter.len() - 1;
                if self.buf.len() > keep {
                    self.buf.drain(..self.buf.len() - keep);
                    self.fresh = false;
                }
                false
            }
        }
    }

    /// Right after `--boundary`: either `--` (the end) or optional
    /// whitespace and CRLF (a new part).
    fn after_delimiter(&mut self) -> Result<bool, Error> {
        if self.buf.len() < 2 {
            return Ok(false);
        }

        if self.buf.starts_with(b"--") {
            self.buf.clear();
            self.complete = true;
            self.state = State::Epilogue;
            return Ok(true);
        }

        let padding = self
            .buf
            .iter()
            .position(|&b| b != b' ' && b != b'\t')
            .unwrap_or(self.buf.len());

        match &self.buf[padding..] {
            [b'\r', b'\n', ..] => {
                self.buf.drain(..padding + 2);
                self.part = Part::default();
                self.state = State::Headers;
                Ok(true)
            }
            [] | [b'\r'] if padding <= self.line_limit => Ok(false),
            _ => Err(Error::Delimiter),
        }
    }

    fn header_line(&mut self) -> Result<bool, Error> {
        let Some(lf) = memchr(b'\n', &self.buf) else {
            return match self.buf.len() < self.line_limit {
                true => Ok(false),
                false => Err(Error::LineTooLong),
            };
        };
        if lf + 1 > self.line_limit {
            return Err(Error::LineTooLong);
        }

        let Some(line) = self.buf[..lf].strip_suffix(b"\r") else {
            return Err(Error::Header);
        };

        if line.is_empty() {
            self.state = State::Body;
        } else {
            self.part.headers.push_line(line).map_err(|_| Error::Header)?;
        }

        self.buf.drain(..lf + 1);
        Ok(true)
    }

    fn body(&mut self, parts: &mut Vec<Part>) -> bool {
        match memmem::find(&self.buf, &self.delimiter) {
            Some(at) => {
                self.part.body.extend_from_slice(&self.buf[..at]);
                self.buf.drain(..at + self.delimiter.len());
                parts.push(mem::take(&mut self.part));
                self.state = State::Delimiter;
                true
            }
            None => {
                // The tail may be the start of a delimiter.
                let keep = self.delimiter.len() - 1;
                if self.buf.len() > keep {
                    let ready = self.buf.len() - keep;
                    self.part.body.extend_from_slice(&self.buf[..ready]);
                    self.buf.drain(..ready);
                }
                false
            }
        }
    }
}

/// Errors of [`MultipartParser`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A boundary delimiter followed by something other than `--` or CRLF.
    Delimiter,
    /// A part header line that is not a valid `name: value` CRLF line.
    Header,
    /// A part header line longer than the configured limit.
    LineTooLong,
}

impl error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Delimiter => f.write_str("Invalid multipart delimiter line"),
            Error::Header => f.write_str("Invalid multipart part header"),
            Error::LineTooLong => f.write_str("Multipart part header line too long"),
        }
    }
}
