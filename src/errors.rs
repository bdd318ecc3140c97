use crate::Version;
use std::{error, fmt};

/// Coarse classification of a parse failure.
///
/// Every [`Error`] maps to exactly one kind. `NeedMore` is not an error and
/// is reported through [`Status::NeedMore`](crate::Status::NeedMore) instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Structurally invalid input: bad start line, framing conflict, bad
    /// chunk size, numeric overflow.
    Malformed,
    /// Well-formed input using a feature or size the parser declines to handle.
    Unsupported,
    /// Resource failure in the host environment.
    Internal,
}

/// Errors produced while parsing an HTTP/1.x message.
///
/// None of these are recoverable on the same stream: once the parser reports
/// one, the future message boundaries are unknown and the connection must be
/// closed after sending [`Error::as_http`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    InvalidMethod,
    InvalidTarget,
    InvalidVersion,
    UnsupportedVersion,
    InvalidStatus,

    InvalidHeader,
    InvalidFolding,
    InvalidEncoding,
    InvalidContentLength,
    ConflictingFraming,
    UnsupportedTransferCoding,

    InvalidChunkSize,
    InvalidChunk,

    LineTooLong,
    TooManyHeaders,
    HeadersTooLarge,
    BodyTooLarge,

    UnexpectedEof,
    OutOfMemory,
}

macro_rules! http_errors {
    ($($name:ident: $status_code:expr, $len:literal => $json:literal; )*) => {
        /// Returns a complete, connection-closing HTTP response describing the error.
        ///
        /// With `json == true` the body carries a small JSON document, otherwise
        /// the response has an empty body.
        pub const fn as_http(&self, version: Version, json: bool) -> &'static [u8] {
            match (json, self, version) { $(
                (true, Self::$name { .. }, Version::Http11) => concat!(
                    "HTTP/1.1 ", $status_code, "\r\n",
                    "connection: close\r\n",
                    "content-length: ", $len, "\r\n",
                    "content-type: application/json\r\n",
                    "\r\n",
                    $json
                ),
                (false, Self::$name { .. }, Version::Http11) => concat!(
                    "HTTP/1.1 ", $status_code, "\r\n",
                    "connection: close\r\n",
                    "content-length: 0\r\n\r\n",
                ),
                (true, Self::$name { .. }, Version::Http10) => concat!(
                    "HTTP/1.0 ", $status_code, "\r\n",
                    "connection: close\r\n",
                    "content-length: ", $len, "\r\n",
                    "content-type: application/json\r\n",
                    "\r\n",
                    $json
                ),
                (false, Self::$name { .. }, Version::Http10) => concat!(
                    "HTTP/1.0 ", $status_code, "\r\n",
                    "connection: close\r\n",
                    "content-length: 0\r\n\r\n",
                ),
            )* }.as_bytes()
        }
    };
}

impl Error {
    http_errors! {
        InvalidMethod: "400 Bad Request", "55"
            => r#"{"error":"Invalid HTTP method","code":"INVALID_METHOD"}"#;
        InvalidTarget: "400 Bad Request", "58"
            => r#"{"error":"Invalid request target","code":"INVALID_TARGET"}"#;
        InvalidVersion: "400 Bad Request", "57"
            => r#"{"error":"Invalid HTTP version","code":"INVALID_VERSION"}"#;
        UnsupportedVersion: "505 HTTP Version Not Supported", "67"
            => r#"{"error":"HTTP version not supported","code":"UNSUPPORTED_VERSION"}"#;
        InvalidStatus: "400 Bad Request", "55"
            => r#"{"error":"Invalid status line","code":"INVALID_STATUS"}"#;

        InvalidHeader: "400 Bad Request", "57"
            => r#"{"error":"Invalid header format","code":"INVALID_HEADER"}"#;
        InvalidFolding: "400 Bad Request", "64"
            => r#"{"error":"Invalid header continuation","code":"INVALID_FOLDING"}"#;
        InvalidEncoding: "400 Bad Request", "61"
            => r#"{"error":"Invalid header encoding","code":"INVALID_ENCODING"}"#;
        InvalidContentLength: "400 Bad Request", "66"
            => r#"{"error":"Invalid Content-Length","code":"INVALID_CONTENT_LENGTH"}"#;
        ConflictingFraming: "400 Bad Request", "68"
            => r#"{"error":"Conflicting message framing","code":"CONFLICTING_FRAMING"}"#;
        UnsupportedTransferCoding: "501 Not Implemented", "78"
            => r#"{"error":"Transfer coding not supported","code":"UNSUPPORTED_TRANSFER_CODING"}"#;

        InvalidChunkSize: "400 Bad Request", "58"
            => r#"{"error":"Invalid chunk size","code":"INVALID_CHUNK_SIZE"}"#;
        InvalidChunk: "400 Bad Request", "56"
            => r#"{"error":"Invalid chunk framing","code":"INVALID_CHUNK"}"#;

        LineTooLong: "431 Request Header Fields Too Large", "48"
            => r#"{"error":"Line too long","code":"LINE_TOO_LONG"}"#;
        TooManyHeaders: "431 Request Header Fields Too Large", "54"
            => r#"{"error":"Too many headers","code":"TOO_MANY_HEADERS"}"#;
        HeadersTooLarge: "431 Request Header Fields Too Large", "61"
            => r#"{"error":"Header block too large","code":"HEADERS_TOO_LARGE"}"#;
        BodyTooLarge: "413 Payload Too Large", "58"
            => r#"{"error":"Request body too large","code":"BODY_TOO_LARGE"}"#;

        UnexpectedEof: "400 Bad Request", "60"
            => r#"{"error":"Unexpected end of stream","code":"UNEXPECTED_EOF"}"#;
        OutOfMemory: "503 Service Unavailable", "48"
            => r#"{"error":"Out of memory","code":"OUT_OF_MEMORY"}"#;
    }

    /// Returns the coarse classification of the error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedVersion
            | Self::UnsupportedTransferCoding
            | Self::LineTooLong
            | Self::TooManyHeaders
            | Self::HeadersTooLarge
            | Self::BodyTooLarge => ErrorKind::Unsupported,
            Self::OutOfMemory => ErrorKind::Internal,
            _ => ErrorKind::Malformed,
        }
    }

    /// Status code of the response written by [`as_http`](Self::as_http).
    pub const fn status(&self) -> u16 {
        match self {
            Self::UnsupportedVersion => 505,
            Self::UnsupportedTransferCoding => 501,
            Self::LineTooLong | Self::TooManyHeaders | Self::HeadersTooLarge => 431,
            Self::BodyTooLarge => 413,
            Self::OutOfMemory => 503,
            _ => 400,
        }
    }
}

impl error::Error for Error {}
impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ({:?})", self, self.kind())
    }
}

impl From<std::collections::TryReserveError> for Error {
    fn from(_: std::collections::TryReserveError) -> Self {
        Error::OutOfMemory
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::str_op;

    #[test]
    fn kinds() {
        #[rustfmt::skip]
        let cases = [
            (Error::InvalidMethod,             ErrorKind::Malformed),
            (Error::ConflictingFraming,        ErrorKind::Malformed),
            (Error::InvalidChunkSize,          ErrorKind::Malformed),
            (Error::InvalidContentLength,      ErrorKind::Malformed),
            (Error::UnexpectedEof,             ErrorKind::Malformed),
            (Error::UnsupportedTransferCoding, ErrorKind::Unsupported),
            (Error::UnsupportedVersion,        ErrorKind::Unsupported),
            (Error::BodyTooLarge,              ErrorKind::Unsupported),
            (Error::OutOfMemory,               ErrorKind::Internal),
        ];

        for (error, kind) in cases {
            assert_eq!(error.kind(), kind, "{error:?}");
        }
    }

    #[test]
    fn json_length_matches() {
        let all = [
            Error::InvalidMethod,
            Error::InvalidTarget,
            Error::InvalidVersion,
            Error::UnsupportedVersion,
            Error::InvalidStatus,
            Error::InvalidHeader,
            Error::InvalidFolding,
            Error::InvalidEncoding,
            Error::InvalidContentLength,
            Error::ConflictingFraming,
            Error::UnsupportedTransferCoding,
            Error::InvalidChunkSize,
            Error::InvalidChunk,
            Error::LineTooLong,
            Error::TooManyHeaders,
            Error::HeadersTooLarge,
            Error::BodyTooLarge,
            Error::UnexpectedEof,
            Error::OutOfMemory,
        ];

        for error in all {
            for version in [Version::Http10, Version::Http11] {
                let http = str_op(error.as_http(version, true));
                let (head, body) = http.split_once("\r\n\r\n").unwrap();

                let declared = head
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length: "))
                    .unwrap();
                assert_eq!(declared.parse::<usize>().unwrap(), body.len(), "{error:?}");
                assert!(head.contains("connection: close"));
            }

            let http = str_op(error.as_http(Version::Http11, false));
            assert!(http.ends_with("content-length: 0\r\n\r\n"));
            assert_eq!(&http[9..12], error.status().to_string(), "{error:?}");
        }
    }
}
