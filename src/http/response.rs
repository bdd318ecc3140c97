//! Zero-copy HTTP/1.x response builder.
//!
//! Unlike [`Message::serialize`](crate::Message::serialize), which writes a
//! message that already exists, [`Response`] writes straight into its output
//! buffer while the handler builds it.

use crate::{
    http::{
        fields::SetCookie,
        headers::HeaderMap,
        types::{StatusCode, Version},
    },
    limits::ConnLimits,
    BodyWriter, WriteBuffer,
};
use std::{borrow::Cow, rc::Rc, sync::Arc};

/// HTTP response builder.
///
/// Build responses by chaining methods in strict order:
/// [`status()`](Response::status) -> headers -> any body method.
///
/// The builder adds `content-length` and, when needed, `connection` by
/// itself. A response to a `HEAD` request keeps its `content-length` but
/// drops the body bytes; 1xx, 204 and 304 responses get neither.
///
/// [`Connection`](crate::Connection) creates one per connection and hands it
/// to [`Handler::handle`](crate::Handler::handle) for every request.
///
/// # Examples
/// ```
/// use maker_http::{Response, StatusCode, Version};
///
/// let mut resp = Response::new(Version::Http11);
/// resp.status(StatusCode::Ok)
///     .header("content-type", "text/html")
///     .body("<h1>Hello World</h1>");
///
/// assert!(resp.as_bytes().starts_with(b"HTTP/1.1 200 OK\r\n"));
/// ```
///
/// # Panics
/// All methods perform order checks in `debug` mode that panic on violations.
/// In `release` mode the checks are omitted and a misuse produces an invalid
/// response.
#[derive(Debug)]
pub struct Response {
    buffer: Vec<u8>,
    pub(crate) version: Version,
    pub(crate) keep_alive: bool,
    pub(crate) head: bool,
    no_body: bool,
    posit_length: usize,
    start_body: usize,
    state: ResponseState,
}

/// Proof that a response was finalized, returned by the body methods.
#[doc(hidden)]
pub struct Handled(());

#[derive(Debug, Clone, Copy, PartialEq)]
enum ResponseState {
    Clean,
    Headers,
    Complete,
}

impl Response {
    /// Creates an empty response for a request of the given `version`.
    pub fn new(version: Version) -> Self {
        Self::with_limits(version, &ConnLimits::default())
    }

    pub(crate) fn with_limits(version: Version, limits: &ConnLimits) -> Self {
        Self {
            buffer: Vec::with_capacity(limits.response_capacity),
            version,
            keep_alive: version.default_keep_alive(),
            head: false,
            no_body: false,
            posit_length: 0,
            start_body: 0,
            state: ResponseState::Clean,
        }
    }

    /// Prepares the builder for the response to the next request.
    pub(crate) fn reset(&mut self, version: Version, keep_alive: bool, head: bool, limits: &ConnLimits) {
        if self.buffer.capacity() > limits.max_response_capacity {
            self.buffer = Vec::with_capacity(limits.response_capacity);
        } else {
            self.buffer.clear();
        }

        self.version = version;
        self.keep_alive = keep_alive;
        self.head = head;
        self.no_body = false;
        self.posit_length = 0;
        self.start_body = 0;
        self.state = ResponseState::Clean;
    }

    /// The wire bytes written so far.
    #[inline(always)]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Whether a body method has finalized the response.
    #[inline(always)]
    pub fn is_complete(&self) -> bool {
        self.state == ResponseState::Complete
    }

    #[inline(always)]
    pub fn version(&self) -> Version {
        self.version
    }

    /// Whether the connection stays open after this response.
    #[inline(always)]
    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }

    /// Forces the connection to close after this response.
    ///
    /// # Panics
    /// Panics in `debug` mode when called after any finalizing method.
    #[inline]
    #[track_caller]
    pub fn close(&mut self) -> &mut Self {
        debug_assert!(
            self.state != ResponseState::Complete,
            "Must be called before any finalizing method",
        );

        self.keep_alive = false;
        self
    }
}

impl Response {
    /// Writes the status line.
    ///
    /// # Panics
    /// Panics in `debug` mode when called twice or after a body method.
    #[inline]
    #[track_caller]
    pub fn status(&mut self, status: StatusCode) -> &mut Self {
        debug_assert!(
            self.state == ResponseState::Clean,
            "Must be first and called only once"
        );

        self.buffer
            .extend_from_slice(status.into_first_line(self.version));
        self.no_body = StatusCode::forbids_body(status.as_u16());
        self.state = ResponseState::Headers;
        self
    }

    /// Adds a header.
    ///
    /// Do not add `content-length` (computed by the body methods) nor
    /// `connection` (use [`close()`](Response::close)). A field whose name
    /// or value contains CR, LF or NUL is dropped.
    ///
    /// ```
    /// use maker_http::{Response, StatusCode, Version};
    ///
    /// let mut resp = Response::new(Version::Http11);
    /// resp.status(StatusCode::Ok)
    ///     .header("content-type", "text/plain")        // &str, &str
    ///     .header("x-custom-id", 128)                  // &str, i32
    ///     .header("x-cache-enabled", true)             // &str, bool
    ///     .body("Done");
    /// ```
    ///
    /// # Panics
    /// Panics in `debug` mode when called before `status()` or after a body method.
    #[inline]
    #[track_caller]
    pub fn header<N: WriteBuffer, V: WriteBuffer>(&mut self, name: N, value: V) -> &mut Self {
        debug_assert!(
            self.state == ResponseState::Headers,
            "Must be called after status() and before any body method"
        );

        let start = self.buffer.len();
        name.write_to(&mut self.buffer);
        self.buffer.extend_from_slice(b": ");
        value.write_to(&mut self.buffer);
        self.end_header(start)
    }

    /// Adds one header whose values are joined with `split`.
    ///
    /// `header_multi("accept", "; ", ["text/html", "text/plain"])` writes
    /// `accept: text/html; text/plain`.
    #[inline]
    #[track_caller]
    pub fn header_multi<N, S, I, V>(&mut self, name: N, split: S, values: I) -> &mut Self
    where
        N: WriteBuffer,
        S: WriteBuffer,
        I: IntoIterator<Item = V>,
        V: WriteBuffer,
    {
        debug_assert!(
            self.state == ResponseState::Headers,
            "Must be called after status() and before any body method"
        );

        let start = self.buffer.len();
        name.write_to(&mut self.buffer);
        self.buffer.extend_from_slice(b": ");

        for (i, value) in values.into_iter().enumerate() {
            if i > 0 {
                split.write_to(&mut self.buffer);
            }
            value.write_to(&mut self.buffer);
        }

        self.end_header(start)
    }

    /// Adds one header made of `key[=value]` parameters joined with `split`,
    /// as in `cache-control: max-age=3600, must-revalidate`.
    #[inline]
    #[track_caller]
    pub fn header_params<N, S, I, K, V>(&mut self, name: N, split: S, params: I) -> &mut Self
    where
        N: WriteBuffer,
        S: WriteBuffer,
        I: IntoIterator<Item = (K, Option<V>)>,
        K: WriteBuffer,
        V: WriteBuffer,
    {
        debug_assert!(
            self.state == ResponseState::Headers,
            "Must be called after status() and before any body method"
        );

        let start = self.buffer.len();
        name.write_to(&mut self.buffer);
        self.buffer.extend_from_slice(b": ");

        for (i, (key, value)) in params.into_iter().enumerate() {
            if i > 0 {
                split.write_to(&mut self.buffer);
            }
            key.write_to(&mut self.buffer);
            if let Some(value) = value {
                self.buffer.push(b'=');
                value.write_to(&mut self.buffer);
            }
        }

        self.end_header(start)
    }

    /// Terminates the field written since `start`, or drops it when it
    /// contains CR, LF or NUL: such a field would split the head.
    fn end_header(&mut self, start: usize) -> &mut Self {
        if memchr::memchr3(b'\r', b'\n', 0, &self.buffer[start..]).is_some() {
            tracing::warn!(
                field = %String::from_utf8_lossy(&self.buffer[start..]),
                "header with line break dropped"
            );
            self.buffer.truncate(start);
        } else {
            self.buffer.extend_from_slice(b"\r\n");
        }
        self
    }

    /// Copies every field of a header table.
    #[inline]
    #[track_caller]
    pub fn headers(&mut self, headers: &HeaderMap) -> &mut Self {
        debug_assert!(
            self.state == ResponseState::Headers,
            "Must be called after status() and before any body method"
        );

        headers.serialize_fields(&mut self.buffer);
        self
    }

    /// Adds a `set-cookie` header.
    #[inline]
    #[track_caller]
    pub fn cookie(&mut self, cookie: &SetCookie<'_>) -> &mut Self {
        self.header("set-cookie", cookie.render())
    }

    /// Sets the body and finalizes the response.
    ///
    /// # Panics
    /// Panics in `debug` mode when called before `status()` or twice.
    #[inline]
    #[track_caller]
    pub fn body<T: WriteBuffer>(&mut self, data: T) -> Handled {
        debug_assert!(
            self.state == ResponseState::Headers,
            "Must be called after status() and any header methods"
        );

        self.start_body();
        data.write_to(&mut self.buffer);
        self.end_body()
    }

    /// Writes the body through a closure and finalizes the response.
    ///
    /// ```
    /// use maker_http::{Response, StatusCode, Version};
    /// use std::io::Write;
    ///
    /// let mut resp = Response::new(Version::Http11);
    /// resp.status(StatusCode::Ok)
    ///     .header("content-type", "application/json")
    ///     .body_with(|writer| {
    ///         let _ = write!(writer, r#"{{"received":{}}}"#, 42);
    ///     });
    ///
    /// assert!(resp.as_bytes().ends_with(br#"{"received":42}"#));
    /// ```
    ///
    /// # Panics
    /// Panics in `debug` mode when called before `status()` or twice.
    #[inline]
    #[track_caller]
    pub fn body_with<F: FnOnce(&mut BodyWriter)>(&mut self, f: F) -> Handled {
        debug_assert!(
            self.state == ResponseState::Headers,
            "Must be called after status() and any header methods"
        );

        self.start_body();
        f(&mut BodyWriter(&mut self.buffer));
        self.end_body()
    }
}

impl Response {
    #[inline(always)]
    #[track_caller]
    fn start_body(&mut self) {
        if let Some(value) = self.connection_header() {
            self.header("connection", value);
        }

        if self.no_body {
            self.buffer.extend_from_slice(b"\r\n");
        } else {
            self.buffer.extend_from_slice(b"content-length: ");
            self.posit_length = self.buffer.len();
            self.buffer.extend_from_slice(b"0000000000\r\n\r\n");
        }
        self.start_body = self.buffer.len();
    }

    #[inline(always)]
    fn end_body(&mut self) -> Handled {
        if !self.no_body {
            let body_len = self.buffer.len() - self.start_body;
            let (arr, _) = number_to_bytes(body_len as u128);

            let target_range = self.posit_length..self.posit_length + 10;
            self.buffer[target_range].copy_from_slice(&arr[29..39]);
        }

        if self.no_body || self.head {
            self.buffer.truncate(self.start_body);
        }
        self.state = ResponseState::Complete;

        Handled(())
    }

    #[inline(always)]
    const fn connection_header(&self) -> Option<&'static [u8]> {
        match (self.version, self.keep_alive) {
            (Version::Http11, true) => None,
            (Version::Http11, false) => Some(b"close"),
            (Version::Http10, true) => Some(b"keep-alive"),
            (Version::Http10, false) => Some(b"close"),
        }
    }
}

#[inline]
const fn number_to_bytes(mut n: u128) -> ([u8; 39], usize) {
    let mut buffer = [b'0'; 39];
    let mut i = 39;

    if n == 0 {
        return (buffer, 38);
    }

    while n > 0 {
        i -= 1;
        buffer[i] = b'0' + (n % 10) as u8;
        n /= 10;
    }

    (buffer, i)
}

pub mod write {
    use super::*;

    /// Writer for the body of a [`Response`], used in
    /// [`body_with`](Response::body_with).
    ///
    /// Accepts anything [`WriteBuffer`] through [`write`](BodyWriter::write)
    /// and formatted output through [`std::io::Write`].
    #[derive(Debug)]
    pub struct BodyWriter<'a>(pub(crate) &'a mut Vec<u8>);

    impl BodyWriter<'_> {
        /// Appends content to the body.
        #[inline]
        pub fn write<T: WriteBuffer>(&mut self, value: T) {
            value.write_to(self.0);
        }
    }

    impl std::io::Write for BodyWriter<'_> {
        #[inline]
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.extend_from_slice(buf);
            Ok(buf.len())
        }

        #[inline]
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Values that can be written into a [`Response`] buffer.
    ///
    /// Implemented for strings, bytes, booleans, chars and integers.
    /// Floating-point numbers are left out on purpose: their textual form
    /// depends on precision choices that belong to the caller.
    ///
    /// # Example
    /// ```
    /// use maker_http::WriteBuffer;
    ///
    /// struct Token(u64);
    ///
    /// impl WriteBuffer for Token {
    ///     fn write_to(&self, buffer: &mut Vec<u8>) {
    ///         buffer.extend_from_slice(b"tok-");
    ///         self.0.write_to(buffer);
    ///     }
    /// }
    /// ```
    pub trait WriteBuffer {
        /// Appends the value's wire representation to `buffer`.
        fn write_to(&self, buffer: &mut Vec<u8>);
    }

    macro_rules! impl_write_buffer {
        (bytes, $conn:expr => $($t:ty),*) => {
            $(impl WriteBuffer for $t {
                #[inline] fn write_to(&self, buffer: &mut Vec<u8>) {
                    let closure = $conn;
                    closure(self, buffer);
                }
            })*
        };
        (number($type:ty), $conn:expr => $($t:ty),*) => {
            $(impl WriteBuffer for $t {
                #[inline] fn write_to(&self, buffer: &mut Vec<u8>) {
                    $conn(*self as $type, buffer);
                }
            })*
        };
    }

    impl<T: WriteBuffer + ?Sized> WriteBuffer for &T {
        #[inline]
        fn write_to(&self, buffer: &mut Vec<u8>) {
            T::write_to(*self, buffer);
        }
    }

    impl WriteBuffer for str {
        #[inline]
        fn write_to(&self, buffer: &mut Vec<u8>) {
            buffer.extend_from_slice(self.as_bytes());
        }
    }

    impl WriteBuffer for [u8] {
        #[inline]
        fn write_to(&self, buffer: &mut Vec<u8>) {
            buffer.extend_from_slice(self);
        }
    }

    impl<const N: usize> WriteBuffer for [u8; N] {
        #[inline]
        fn write_to(&self, buffer: &mut Vec<u8>) {
            buffer.extend_from_slice(self);
        }
    }

    impl_write_buffer! {
        bytes, |value: &str, buffer: &mut Vec<u8>| {
            buffer.extend_from_slice(value.as_bytes());
        } => String, Box<str>, Cow<'_, str>, Arc<str>, Rc<str>
    }
    impl_write_buffer! {
        bytes, |value: &[u8], buffer: &mut Vec<u8>| {
            buffer.extend_from_slice(value);
        } => Vec<u8>, Box<[u8]>, Cow<'_, [u8]>, Arc<[u8]>, Rc<[u8]>
    }
    impl_write_buffer! {
        number(u128), write_u128 => u8, u16, u32, u64, u128, usize
    }
    impl_write_buffer! {
        number(i128), write_i128 => i8, i16, i32, i64, i128, isize
    }

    impl WriteBuffer for bool {
        #[inline]
        fn write_to(&self, buffer: &mut Vec<u8>) {
            buffer.extend_from_slice(match self {
                true => b"true",
                false => b"false",
            });
        }
    }

    impl WriteBuffer for char {
        #[inline]
        fn write_to(&self, buffer: &mut Vec<u8>) {
            let mut buf = [0u8; 4];
            buffer.extend_from_slice(self.encode_utf8(&mut buf).as_bytes());
        }
    }

    #[inline(always)]
    fn write_u128(value: u128, buffer: &mut Vec<u8>) {
        let (arr, start) = number_to_bytes(value);
        buffer.extend_from_slice(&arr[start..]);
    }

    #[inline(always)]
    fn write_i128(value: i128, buffer: &mut Vec<u8>) {
        if value < 0 {
            buffer.push(b'-');
        }

        let (arr, start) = number_to_bytes(value.unsigned_abs());
        buffer.extend_from_slice(&arr[start..]);
    }
}


#[cfg(test)]
mod header_tests {
    use super::*;
    use crate::tools::*;

    macro_rules! test_header {
        ($method:ident, $(($name:expr $(, $params:expr)*; $result:expr);)*) => {
           #[test] fn $method() {$(
            let mut resp = Response::new(Version::Http11);

            resp.status(StatusCode::Ok);
            assert_eq!(resp.state, ResponseState::Headers);

            resp.$method($name $(, $params)*);
            assert_eq!(str_op(&resp.as_bytes()[17..]), $result);
            assert_eq!(resp.state, ResponseState::Headers);
        )*}};
    }

    test_header! {header,
        ("name", "value"; "name: value\r\n");
        ("name", ""; "name: \r\n");

        ("name", 123; "name: 123\r\n");
        ("name", vec![35, 33, 43]; "name: #!+\r\n");
        ("name", false; "name: false\r\n");
        ("name", -123; "name: -123\r\n");
        ("name", 'ж'; "name: ж\r\n");
        ("x-user", "a\r\nSet-Cookie: evil=1"; "");
        ("x\nname", "value"; "");
        ("name", "nul\0"; "");
    }

    test_header! {header_multi,
        ("name", ", ", ["q", "w", "e"]; "name: q, w, e\r\n");
        ("name", ",", [true, false]; "name: true,false\r\n");
        ("name", "; ", [-123, 123]; "name: -123; 123\r\n");
        ("name", ", ", Vec::<&str>::new(); "name: \r\n");
        ("name", ", ", ["ok", "bad\r\n"]; "");
    }

    test_header! {header_params,
        ("name", ", ", [("name", Some("value"))]; "name: name=value\r\n");
        (
            "name", ";", [("q", Some("v1")), ("w", Some("v2")), ("e", Some("v3"))];
            "name: q=v1;w=v2;e=v3\r\n"
        );
        (
            "u128", ", ", [("min", Some(u128::MIN)), ("max", Some(u128::MAX))];
            "u128: min=0, max=340282366920938463463374607431768211455\r\n"
        );
        (
            "i128", ", ", [("min", Some(i128::MIN)), ("max", Some(i128::MAX))];
    "i128: min=-170141183460469231731687303715884105728, max=170141183460469231731687303715884105727\r\n"
        );
        (
            "cache-control", ", ", [("max-age", Some(3600)), ("must-revalidate", None)];
            "cache-control: max-age=3600, must-revalidate\r\n"
        );
        ("name", ", ", [("k", Some("v\n"))]; "");
    }

    #[test]
    fn line_breaks_dropped() {
        let mut resp = Response::new(Version::Http11);
        resp.status(StatusCode::Ok)
            .header("x-user", "a\r\nSet-Cookie: evil=1")
            .header("x-next", "kept")
            .body("ok");

        assert_eq!(
            str_op(resp.as_bytes()),
            "HTTP/1.1 200 OK\r\nx-next: kept\r\ncontent-length: 0000000002\r\n\r\nok"
        );
    }

    #[test]
    fn table_and_cookie() {
        let mut headers = HeaderMap::new();
        headers.add("X-A", "1").unwrap();
        headers.add("X-B", "2").unwrap();

        let mut resp = Response::new(Version::Http11);
        resp.status(StatusCode::Ok)
            .headers(&headers)
            .cookie(&SetCookie::new("sid", "abc").path("/").http_only(true));

        assert_eq!(
            str_op(&resp.as_bytes()[17..]),
            "X-A: 1\r\nX-B: 2\r\nset-cookie: sid=abc; path=/; HttpOnly\r\n"
        );
    }

    #[test]
    #[should_panic(expected = "Must be called after status() and before any body method")]
    fn header_before_status() {
        Response::new(Version::Http11).header("Name", "value");
    }

    #[test]
    #[should_panic(expected = "Must be called after status() and before any body method")]
    fn header_after_body() {
        let mut resp = Response::new(Version::Http11);
        resp.status(StatusCode::Ok).body("");
        resp.header("Name", "value");
    }
}
