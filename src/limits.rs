//! Parser, connection, session and upload limits
//!
//! # Security-First Defaults
//!
//! Default limits are intentionally conservative to prevent:
//! - Resource exhaustion attacks
//! - Unbounded buffering of never-ending lines
//! - Header flooding
//! - Slowloris attacks (through [`ConnLimits::socket_read_timeout`])
//!
//! # Memory Consumption
//!
//! A parser never buffers more than
//! [`ParserLimits::start_line_size`] + [`ParserLimits::header_block_size`] +
//! [`ParserLimits::body_size`] bytes for a single message. Buffers are kept
//! between messages and shrunk back to [`ParserLimits::buffer_capacity`] when a
//! message made them grow past [`ParserLimits::max_retained_capacity`].
//!
//! # Examples
//!
//! ```
//! use maker_http::{limits::ParserLimits, Parser};
//!
//! let parser = Parser::request(&ParserLimits {
//!     header_count: 16,       // Fewer headers for internal APIs
//!     body_size: 64 * 1024,   // 64KB uploads at most
//!     ..ParserLimits::default()
//! });
//! # drop(parser);
//! ```

use std::time::Duration;

/// Limits applied by [`Parser`](crate::Parser) to every message.
///
/// Exceeding a size limit yields an error whose
/// [`kind`](crate::Error::kind) is [`Unsupported`](crate::ErrorKind::Unsupported):
/// the input may be valid HTTP, the parser just declines to buffer it.
#[derive(Debug, Clone)]
pub struct ParserLimits {
    /// Maximum length of the request line or status line, CRLF included
    /// (default: `8192`).
    pub start_line_size: usize,

    /// Maximum length of a single header line, CRLF included (default: `8192`).
    ///
    /// A folded header counts each physical line separately.
    pub header_line_size: usize,

    /// Maximum number of header fields, trailers included (default: `64`).
    pub header_count: usize,

    /// Maximum size of the whole header block (default: `64 KiB`).
    pub header_block_size: usize,

    /// Maximum decoded body size (default: `8 MiB`).
    ///
    /// Checked against `Content-Length` as soon as the headers are complete,
    /// and against the running total for chunked and read-until-close bodies.
    pub body_size: u64,

    /// Maximum length of a chunk-size line, extensions included (default: `1024`).
    pub chunk_line_size: usize,

    /// Initial capacity of the input buffer (default: `4096`).
    pub buffer_capacity: usize,

    /// Largest buffer capacity kept between messages (default: `256 KiB`).
    ///
    /// A message larger than this grows the buffer temporarily; the buffer
    /// is reallocated at [`buffer_capacity`](Self::buffer_capacity) once the
    /// message has been handed out.
    pub max_retained_capacity: usize,

    #[doc(hidden)]
    #[allow(dead_code)]
    pub _priv: (),
}

impl Default for ParserLimits {
    fn default() -> Self {
        Self {
            start_line_size: 8 * 1024,
            header_line_size: 8 * 1024,
            header_count: 64,
            header_block_size: 64 * 1024,
            body_size: 8 * 1024 * 1024,
            chunk_line_size: 1024,
            buffer_capacity: 4 * 1024,
            max_retained_capacity: 256 * 1024,

            _priv: (),
        }
    }
}

/// Connection-level limits and timeouts for [`Connection`](crate::Connection).
///
/// Default values balance performance, resource usage, and security.
#[derive(Debug, Clone)]
pub struct ConnLimits {
    /// Maximum duration to wait for reading data from the stream (default: `2 seconds`)
    ///
    /// If no data is received within this time, the connection is closed.
    /// Prevents `slowloris attacks` and frees resources from inactive clients.
    pub socket_read_timeout: Duration,

    /// Maximum duration to wait for writing a response (default: `3 seconds`)
    pub socket_write_timeout: Duration,

    /// Maximum number of requests served on one connection (default: `100`)
    pub max_requests_per_connection: usize,

    /// Size of a single read from the stream (default: `8192`)
    pub read_chunk_size: usize,

    /// Initial capacity of the response buffer (default: `4096`)
    pub response_capacity: usize,

    /// Largest response buffer kept between responses (default: `256 KiB`)
    ///
    /// A larger buffer is dropped and reallocated at
    /// [`response_capacity`](Self::response_capacity).
    pub max_response_capacity: usize,

    /// Format for error responses (default: `true`)
    ///
    /// If `true`, then on error the connection answers:
    /// ```text
    /// HTTP/1.1 400 Bad Request\r
    /// connection: close\r
    /// content-length: 55\r
    /// content-type: application/json\r
    /// \r
    /// {"error":"Invalid HTTP method","code":"INVALID_METHOD"}
    /// ```
    /// If `false`, the body is empty and `content-length: 0` is sent.
    pub json_errors: bool,

    #[doc(hidden)]
    #[allow(dead_code)]
    pub _priv: (),
}

impl Default for ConnLimits {
    #[inline(always)]
    fn default() -> Self {
        Self {
            socket_read_timeout: Duration::from_secs(2),
            socket_write_timeout: Duration::from_secs(3),
            max_requests_per_connection: 100,
            read_chunk_size: 8 * 1024,
            response_capacity: 4 * 1024,
            max_response_capacity: 256 * 1024,
            json_errors: true,

            _priv: (),
        }
    }
}

/// Settings for [`Sessions`](crate::session::Sessions).
#[derive(Debug, Clone)]
pub struct SessionLimits {
    /// Name of the cookie carrying the session token (default: `"sid"`)
    pub cookie_name: String,

    /// Value of the `path` cookie attribute (default: `"/"`)
    pub cookie_path: String,

    /// Value of the `domain` cookie attribute (default: none)
    pub cookie_domain: Option<String>,

    /// Cookie lifetime; `None` keeps the cookie until the browser exits
    /// (default: `None`)
    pub cookie_max_age: Option<Duration>,

    /// Adds the `secure` attribute (default: `false`)
    pub secure: bool,

    /// Adds the `HttpOnly` attribute (default: `true`)
    pub http_only: bool,

    /// Idle time after which [`MemoryStore::sweep`](crate::session::MemoryStore::sweep)
    /// drops a record (default: `30 minutes`)
    pub idle_timeout: Duration,

    #[doc(hidden)]
    #[allow(dead_code)]
    pub _priv: (),
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            cookie_name: "sid".to_owned(),
            cookie_path: "/".to_owned(),
            cookie_domain: None,
            cookie_max_age: None,
            secure: false,
            http_only: true,
            idle_timeout: Duration::from_secs(30 * 60),

            _priv: (),
        }
    }
}

/// Settings for [`UploadRegistry`](crate::upload::UploadRegistry).
#[derive(Debug, Clone)]
pub struct UploadLimits {
    /// Number of uploads tracked at the same time (default: `16`)
    ///
    /// When all slots are taken, new uploads are simply not tracked and a
    /// status query for them answers `starting`.
    pub slots: usize,

    /// Query parameter and header carrying the upload token
    /// (default: `"X-Progress-ID"`)
    pub token_name: String,

    #[doc(hidden)]
    #[allow(dead_code)]
    pub _priv: (),
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            slots: 16,
            token_name: "X-Progress-ID".to_owned(),

            _priv: (),
        }
    }
}
