//! Typed views over header values.
//!
//! Views are computed from the [`HeaderMap`] every time they are asked for
//! and borrow from it; nothing is cached, so editing the table is always
//! reflected by the next lookup.

use crate::{
    http::{base64, headers::HeaderMap, types::slice_to_u64},
    query::Query,
};
use std::{
    borrow::Cow,
    fmt::Write,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

/// Header fields with a typed projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldName {
    Authorization,
    WwwAuthenticate,
    Location,
    Cookie,
    ContentType,
    ContentLength,
    TransferEncoding,
    ContentDisposition,
}

impl FieldName {
    pub const fn as_str(&self) -> &'static str {
        match self {
            FieldName::Authorization => "Authorization",
            FieldName::WwwAuthenticate => "WWW-Authenticate",
            FieldName::Location => "Location",
            FieldName::Cookie => "Cookie",
            FieldName::ContentType => "Content-Type",
            FieldName::ContentLength => "Content-Length",
            FieldName::TransferEncoding => "Transfer-Encoding",
            FieldName::ContentDisposition => "Content-Disposition",
        }
    }
}

/// A parsed header value, see [`HeaderMap::field`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field<'a> {
    BasicAuth(BasicAuth),
    WwwAuthenticate(WwwAuthenticate<'a>),
    Location(&'a str),
    Cookies(Vec<Cookie<'a>>),
    ContentType(ContentType<'a>),
    ContentLength(u64),
    TransferEncoding(TransferEncoding<'a>),
    ContentDisposition(ContentDisposition<'a>),
}

impl HeaderMap {
    /// Projects the first field named `name` into its typed view.
    ///
    /// Returns `None` when the field is absent, or when it cannot be read
    /// as the requested type (an `Authorization` with a scheme other than
    /// `Basic`, a non-numeric `Content-Length`). `Cookie` gathers every
    /// `Cookie` field.
    pub fn field(&self, name: FieldName) -> Option<Field<'_>> {
        Some(match name {
            FieldName::Authorization => Field::BasicAuth(self.basic_auth()?),
            FieldName::WwwAuthenticate => Field::WwwAuthenticate(self.www_authenticate()?),
            FieldName::Location => Field::Location(self.location()?),
            FieldName::Cookie => match self.contains(name.as_str()) {
                true => Field::Cookies(self.cookies()),
                false => return None,
            },
            FieldName::ContentType => Field::ContentType(self.content_type()?),
            FieldName::ContentLength => {
                let value = self.get(name.as_str())?;
                Field::ContentLength(slice_to_u64(value.trim().as_bytes())?)
            }
            FieldName::TransferEncoding => {
                Field::TransferEncoding(TransferEncoding(self.get(name.as_str())?))
            }
            FieldName::ContentDisposition => {
                Field::ContentDisposition(self.content_disposition()?)
            }
        })
    }

    /// Basic credentials from `Authorization`.
    ///
    /// `None` without the header or with another scheme; a `Basic` value
    /// that fails to decode yields [anonymous](BasicAuth::is_anonymous)
    /// credentials instead of an error.
    pub fn basic_auth(&self) -> Option<BasicAuth> {
        BasicAuth::parse(self.get("Authorization")?)
    }

    pub fn www_authenticate(&self) -> Option<WwwAuthenticate<'_>> {
        self.get("WWW-Authenticate").map(WwwAuthenticate::parse)
    }

    /// `Location` without leading whitespace.
    #[inline]
    pub fn location(&self) -> Option<&str> {
        self.get("Location").map(str::trim_start)
    }

    /// Every cookie of every `Cookie` field, in order.
    pub fn cookies(&self) -> Vec<Cookie<'_>> {
        let mut cookies = Vec::new();
        for value in self.find_all("Cookie") {
            Cookie::parse_into(value, &mut cookies);
        }
        cookies
    }

    /// Value of the first cookie called `name` (case-sensitive).
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.find_all("Cookie").find_map(|value| {
            let mut cookies = Vec::new();
            Cookie::parse_into(value, &mut cookies);
            cookies.into_iter().find(|c| c.name == name).map(|c| c.value)
        })
    }

    /// The `index`-th cookie called `name` across every `Cookie` field,
    /// with its `$Path`, `$Domain` and `$Port` attributes.
    pub fn find_cookie(&self, name: &str, index: usize) -> Option<Cookie<'_>> {
        self.cookies().into_iter().filter(|c| c.name == name).nth(index)
    }

    /// Number of cookies called `name`.
    pub fn cookie_count(&self, name: &str) -> usize {
        self.cookies().iter().filter(|c| c.name == name).count()
    }

    pub fn content_type(&self) -> Option<ContentType<'_>> {
        self.get("Content-Type").map(ContentType)
    }

    pub fn content_disposition(&self) -> Option<ContentDisposition<'_>> {
        self.get("Content-Disposition").map(ContentDisposition)
    }
}

// AUTHORIZATION

/// Decoded `Authorization: Basic` credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BasicAuth {
    user: String,
    password: String,
}

impl BasicAuth {
    /// Parses an `Authorization` value.
    ///
    /// Returns `None` only when the scheme is not `Basic`. Undecodable
    /// payloads and payloads without `:` give empty credentials.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        let (scheme, payload) = value.split_once(' ').unwrap_or((value, ""));

        if !scheme.eq_ignore_ascii_case("basic") {
            return None;
        }

        let decoded = match base64::decode(payload.trim().as_bytes()) {
            Some(decoded) => decoded,
            None => {
                tracing::debug!("undecodable basic credentials");
                return Some(Self::default());
            }
        };

        let Ok(decoded) = String::from_utf8(decoded) else {
            return Some(Self::default());
        };

        Some(match decoded.split_once(':') {
            Some((user, password)) => Self {
                user: user.to_owned(),
                password: password.to_owned(),
            },
            None => Self::default(),
        })
    }

    /// Builds an `Authorization` value: `Basic <base64(user:password)>`.
    ///
    /// # Examples
    /// ```
    /// use maker_http::BasicAuth;
    ///
    /// assert_eq!(
    ///     BasicAuth::encode("Aladdin", "open sesame"),
    ///     "Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ=="
    /// );
    /// ```
    pub fn encode(user: &str, password: &str) -> String {
        let mut plain = String::with_capacity(user.len() + password.len() + 1);
        plain.push_str(user);
        plain.push(':');
        plain.push_str(password);

        let mut value = String::from("Basic ");
        value.push_str(&base64::encode(plain.as_bytes()));
        value
    }

    #[inline(always)]
    pub fn user(&self) -> &str {
        &self.user
    }

    #[inline(always)]
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Both user and password are empty.
    #[inline(always)]
    pub fn is_anonymous(&self) -> bool {
        self.user.is_empty() && self.password.is_empty()
    }
}

/// `WWW-Authenticate` challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WwwAuthenticate<'a> {
    scheme: &'a str,
    params: &'a str,
}

impl<'a> WwwAuthenticate<'a> {
    pub const DEFAULT_REALM: &'static str = "Protected Area";

    fn parse(value: &'a str) -> Self {
        let value = value.trim();
        let (scheme, params) = value.split_once(' ').unwrap_or((value, ""));
        Self { scheme, params }
    }

    #[inline(always)]
    pub fn scheme(&self) -> &'a str {
        self.scheme
    }

    /// The `realm` parameter, quotes removed.
    pub fn realm(&self) -> Option<&'a str> {
        params(self.params, b",")
            .find(|(name, _)| name.eq_ignore_ascii_case("realm"))
            .map(|(_, value)| value)
    }

    /// Builds a Basic challenge, `Basic realm="..."`.
    ///
    /// An empty realm falls back to [`DEFAULT_REALM`](Self::DEFAULT_REALM).
    pub fn basic(realm: &str) -> String {
        let realm = match realm.is_empty() {
            true => Self::DEFAULT_REALM,
            false => realm,
        };

        let mut value = String::with_capacity(realm.len() + 16);
        value.push_str("Basic realm=\"");
        for c in realm.chars() {
            if c == '"' || c == '\\' {
                value.push('\\');
            }
            value.push(c);
        }
        value.push('"');
        value
    }
}

// COOKIE

/// One cookie from a `Cookie` field.
///
/// `path`, `domain` and `port` come from the `$Path`, `$Domain` and `$Port`
/// attributes of [RFC 2965](https://tools.ietf.org/html/rfc2965) style
/// cookies and are `None` for the common `name=value; name2=value2` form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie<'a> {
    pub name: &'a str,
    pub value: &'a str,
    pub path: Option<&'a str>,
    pub domain: Option<&'a str>,
    pub port: Option<&'a str>,
}

impl<'a> Cookie<'a> {
    /// Parses a `Cookie` value, appending to `out`.
    ///
    /// Pairs are separated by `;` or `,`, values may be quoted. `$Version`
    /// is ignored and the other `$` attributes apply to the preceding cookie.
    pub fn parse_into(value: &'a str, out: &mut Vec<Cookie<'a>>) {
        let start = out.len();

        for (name, value) in params(value, b";,") {
            match name.strip_prefix('$') {
                Some(attr) => {
                    let Some(last) = out[start..].last_mut() else {
                        continue;
                    };

                    if attr.eq_ignore_ascii_case("path") {
                        last.path = Some(value);
                    } else if attr.eq_ignore_ascii_case("domain") {
                        last.domain = Some(value);
                    } else if attr.eq_ignore_ascii_case("port") {
                        last.port = Some(value);
                    }
                }
                None if name.is_empty() => {}
                None => out.push(Cookie {
                    name,
                    value,
                    path: None,
                    domain: None,
                    port: None,
                }),
            }
        }
    }
}

/// Builder for `Set-Cookie` values.
///
/// # Examples
/// ```
/// use maker_http::SetCookie;
/// use std::time::{Duration, UNIX_EPOCH};
///
/// let value = SetCookie::new("sid", "abc")
///     .path("/")
///     .expires(UNIX_EPOCH + Duration::from_secs(784111777))
///     .http_only(true)
///     .render();
///
/// assert_eq!(value, "sid=abc; expires=Sun, 06 Nov 1994 08:49:37 GMT; path=/; HttpOnly");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie<'a> {
    name: &'a str,
    value: &'a str,
    expires: Option<SystemTime>,
    max_age: Option<Duration>,
    path: Option<&'a str>,
    domain: Option<&'a str>,
    secure: bool,
    http_only: bool,
}

impl<'a> SetCookie<'a> {
    pub fn new(name: &'a str, value: &'a str) -> Self {
        Self {
            name,
            value,
            expires: None,
            max_age: None,
            path: None,
            domain: None,
            secure: false,
            http_only: false,
        }
    }

    /// A cookie that tells the browser to drop `name` right away.
    pub fn removal(name: &'a str) -> Self {
        Self::new(name, "")
            .expires(UNIX_EPOCH)
            .max_age(Duration::ZERO)
    }

    pub fn expires(mut self, at: SystemTime) -> Self {
        self.expires = Some(at);
        self
    }

    pub fn max_age(mut self, age: Duration) -> Self {
        self.max_age = Some(age);
        self
    }

    pub fn path(mut self, path: &'a str) -> Self {
        self.path = Some(path);
        self
    }

    pub fn domain(mut self, domain: &'a str) -> Self {
        self.domain = Some(domain);
        self
    }

    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    /// Renders `name=value; expires=...; max-age=...; path=...; domain=...; secure; HttpOnly`,
    /// omitting unset attributes.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(64);
        out.push_str(self.name);
        out.push('=');
        out.push_str(self.value);

        if let Some(at) = self.expires {
            out.push_str("; expires=");
            out.push_str(&http_date(at));
        }
        if let Some(age) = self.max_age {
            let _ = write!(out, "; max-age={}", age.as_secs());
        }
        if let Some(path) = self.path {
            out.push_str("; path=");
            out.push_str(path);
        }
        if let Some(domain) = self.domain {
            out.push_str("; domain=");
            out.push_str(domain);
        }
        if self.secure {
            out.push_str("; secure");
        }
        if self.http_only {
            out.push_str("; HttpOnly");
        }

        out
    }
}

/// Formats an IMF-fixdate ([RFC 7231, Section 7.1.1.1](https://tools.ietf.org/html/rfc7231#section-7.1.1.1)).
pub fn http_date(at: SystemTime) -> String {
    const DAYS: [&str; 7] = ["Thu", "Fri", "Sat", "Sun", "Mon", "Tue", "Wed"];
    const MONTHS: [&str; 12] = [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ];

    let secs = at
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let days = secs / 86_400;
    let (year, month, day) = civil_from_days(days);
    let time = secs % 86_400;

    format!(
        "{}, {:02} {} {} {:02}:{:02}:{:02} GMT",
        DAYS[(days % 7) as usize],
        day,
        MONTHS[(month - 1) as usize],
        year,
        time / 3600,
        time % 3600 / 60,
        time % 60,
    )
}

/// Days since 1970-01-01 to `(year, month, day)`.
fn civil_from_days(days: u64) -> (u64, u64, u64) {
    // Shift the epoch to 0000-03-01 so leap days fall at the end of a year.
    let z = days + 719_468;
    let era = z / 146_097;
    let doe = z % 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + u64::from(month <= 2);

    (year, month, day)
}

// CONTENT TYPE

/// `Content-Type` value: media type plus `;`-separated parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentType<'a>(pub &'a str);

impl<'a> ContentType<'a> {
    /// The value before the first `;`, trimmed (`text/html`).
    pub fn media_type(&self) -> &'a str {
        self.0.split(';').next().unwrap_or("").trim()
    }

    /// A parameter by case-insensitive name, quotes removed.
    pub fn param(&self, name: &str) -> Option<&'a str> {
        let rest = self.0.split_once(';').map(|(_, rest)| rest)?;
        params(rest, b";")
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }

    #[inline]
    pub fn boundary(&self) -> Option<&'a str> {
        self.param("boundary").filter(|b| !b.is_empty())
    }

    /// The `charset` parameter, `us-ascii` when absent.
    #[inline]
    pub fn charset(&self) -> &'a str {
        self.param("charset").unwrap_or("us-ascii")
    }

    #[inline]
    pub fn is_multipart_form_data(&self) -> bool {
        self.media_type().eq_ignore_ascii_case("multipart/form-data")
    }

    #[inline]
    pub fn is_urlencoded(&self) -> bool {
        self.media_type()
            .eq_ignore_ascii_case("application/x-www-form-urlencoded")
    }
}

/// `Content-Disposition` value of a multipart part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentDisposition<'a>(pub &'a str);

impl<'a> ContentDisposition<'a> {
    /// `form-data`, `attachment`, `inline`, ...
    pub fn kind(&self) -> &'a str {
        self.0.split(';').next().unwrap_or("").trim()
    }

    pub fn param(&self, name: &str) -> Option<&'a str> {
        ContentType(self.0).param(name)
    }

    #[inline]
    pub fn name(&self) -> Option<&'a str> {
        self.param("name")
    }

    /// The `filename` parameter, percent-decoded when it looks encoded.
    pub fn filename(&self) -> Option<Cow<'a, str>> {
        let raw = self.param("filename")?;

        Some(match Query::is_encoded(raw.as_bytes()) {
            true => Query::decode_lossy(raw.as_bytes()),
            false => Cow::Borrowed(raw),
        })
    }
}

/// `Transfer-Encoding` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferEncoding<'a>(pub &'a str);

impl<'a> TransferEncoding<'a> {
    /// Codings in the order they were applied.
    pub fn codings(&self) -> impl Iterator<Item = &'a str> {
        self.0.split(',').map(str::trim).filter(|c| !c.is_empty())
    }

    /// The final coding is `chunked`.
    pub fn is_chunked(&self) -> bool {
        self.codings()
            .last()
            .is_some_and(|c| c.eq_ignore_ascii_case("chunked"))
    }
}

/// Splits `a=1; b="x;y"; c` on any of `seps` outside quotes, yielding trimmed
/// `(name, value)` with quotes removed. A piece without `=` has an empty value.
pub(crate) fn params<'a>(src: &'a str, seps: &'static [u8]) -> impl Iterator<Item = (&'a str, &'a str)> {
    let mut rest = src;

    std::iter::from_fn(move || loop {
        if rest.is_empty() {
            return None;
        }

        let bytes = rest.as_bytes();
        let mut quoted = false;
        let mut end = bytes.len();
        for (i, &b) in bytes.iter().enumerate() {
            match b {
                b'"' => quoted = !quoted,
                b if seps.contains(&b) && !quoted => {
                    end = i;
                    break;
                }
                _ => {}
            }
        }

        let piece = &rest[..end];
        rest = rest.get(end + 1..).unwrap_or("");

        let piece = piece.trim();
        if piece.is_empty() {
            continue;
        }

        let (name, value) = piece.split_once('=').unwrap_or((piece, ""));
        let value = value.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(value);

        return Some((name.trim(), value));
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(fields: &[(&str, &str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in fields {
            headers.add(name, value).unwrap();
        }
        headers
    }

    #[test]
    fn basic_auth() {
        #[rustfmt::skip]
        let cases = [
            ("Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ==", Some(("Aladdin", "open sesame"))),
            ("basic   QWxhZGRpbjpvcGVuIHNlc2FtZQ==", Some(("Aladdin", "open sesame"))),
            ("Basic dXNlcjo=",                     Some(("user", ""))),
            ("Basic OnB3",                         Some(("", "pw"))),
            ("Basic bm9jb2xvbg==",                 Some(("", ""))),
            ("Basic !!!",                          Some(("", ""))),
            ("Basic",                              Some(("", ""))),
            ("Bearer abc.def",                     None),
        ];

        for (value, expected) in cases {
            let headers = table(&[("Authorization", value)]);
            let auth = headers.basic_auth();

            assert_eq!(
                auth.as_ref().map(|a| (a.user(), a.password())),
                expected,
                "{value}"
            );
        }

        assert!(table(&[("Authorization", "Basic !!!")])
            .basic_auth()
            .unwrap()
            .is_anonymous());
        assert_eq!(HeaderMap::new().basic_auth(), None);
    }

    #[test]
    fn basic_auth_round_trip() {
        let value = BasicAuth::encode("user", "p:ss");
        let auth = BasicAuth::parse(&value).unwrap();

        assert_eq!((auth.user(), auth.password()), ("user", "p:ss"));
        assert!(!auth.is_anonymous());
    }

    #[test]
    fn www_authenticate() {
        let headers = table(&[("WWW-Authenticate", r#"Basic realm="Staff Only", charset="UTF-8""#)]);
        let challenge = headers.www_authenticate().unwrap();

        assert_eq!(challenge.scheme(), "Basic");
        assert_eq!(challenge.realm(), Some("Staff Only"));

        assert_eq!(WwwAuthenticate::basic(""), r#"Basic realm="Protected Area""#);
        assert_eq!(WwwAuthenticate::basic(r#"a"b"#), r#"Basic realm="a\"b""#);
    }

    #[test]
    fn cookies() {
        let headers = table(&[("Cookie", "a=1; b=2")]);

        assert_eq!(headers.cookie("b"), Some("2"));
        assert_eq!(headers.cookie("a"), Some("1"));
        assert_eq!(headers.cookie("c"), None);
        assert_eq!(headers.cookie("A"), None);
    }

    #[test]
    fn cookies_rfc2965() {
        let headers = table(&[
            (
                "Cookie",
                r#"$Version="1"; Part_Number="Rocket_0023"; $Path="/acme/ammo", Launcher="0001"; $Path="/acme"; $Domain=".acme.com"; $Port="80""#,
            ),
            ("Cookie", "sid=xyz"),
        ]);

        let cookies = headers.cookies();
        assert_eq!(cookies.len(), 3);

        assert_eq!(cookies[0].name, "Part_Number");
        assert_eq!(cookies[0].value, "Rocket_0023");
        assert_eq!(cookies[0].path, Some("/acme/ammo"));
        assert_eq!(cookies[0].domain, None);

        assert_eq!(cookies[1].name, "Launcher");
        assert_eq!(cookies[1].path, Some("/acme"));
        assert_eq!(cookies[1].domain, Some(".acme.com"));
        assert_eq!(cookies[1].port, Some("80"));

        assert_eq!(cookies[2].name, "sid");
        assert_eq!(headers.cookie("sid"), Some("xyz"));
    }

    #[test]
    fn repeated_cookies() {
        let headers = table(&[
            ("Cookie", r#"id=1; $Path="/a"; $Domain=".a.com", other=x"#),
            ("Cookie", r#"id=2; $Path="/b"; $Port="8080""#),
        ]);

        assert_eq!(headers.cookie_count("id"), 2);
        assert_eq!(headers.cookie_count("other"), 1);
        assert_eq!(headers.cookie_count("none"), 0);

        let first = headers.find_cookie("id", 0).unwrap();
        assert_eq!(
            (first.value, first.path, first.domain, first.port),
            ("1", Some("/a"), Some(".a.com"), None)
        );

        let second = headers.find_cookie("id", 1).unwrap();
        assert_eq!(
            (second.value, second.path, second.domain, second.port),
            ("2", Some("/b"), None, Some("8080"))
        );

        assert_eq!(headers.find_cookie("id", 2), None);
        assert_eq!(headers.find_cookie("other", 0).map(|c| c.value), Some("x"));
    }

    #[test]
    fn set_cookie() {
        let value = SetCookie::new("sid", "abc")
            .path("/app")
            .domain("example.com")
            .max_age(Duration::from_secs(60))
            .secure(true)
            .http_only(true)
            .render();
        assert_eq!(
            value,
            "sid=abc; max-age=60; path=/app; domain=example.com; secure; HttpOnly"
        );

        assert_eq!(
            SetCookie::removal("sid").path("/").render(),
            "sid=; expires=Thu, 01 Jan 1970 00:00:00 GMT; max-age=0; path=/"
        );
    }

    #[test]
    fn dates() {
        #[rustfmt::skip]
        let cases = [
            (0,          "Thu, 01 Jan 1970 00:00:00 GMT"),
            (784111777,  "Sun, 06 Nov 1994 08:49:37 GMT"),
            (951782400,  "Tue, 29 Feb 2000 00:00:00 GMT"),
            (1709210096, "Thu, 29 Feb 2024 12:34:56 GMT"),
        ];

        for (secs, expected) in cases {
            assert_eq!(http_date(UNIX_EPOCH + Duration::from_secs(secs)), expected);
        }
    }

    #[test]
    fn content_type() {
        let headers = table(&[(
            "Content-Type",
            r#"multipart/form-data; boundary="----abc;def"; Charset=utf-8"#,
        )]);
        let ct = headers.content_type().unwrap();

        assert_eq!(ct.media_type(), "multipart/form-data");
        assert_eq!(ct.boundary(), Some("----abc;def"));
        assert_eq!(ct.charset(), "utf-8");
        assert!(ct.is_multipart_form_data());
        assert!(!ct.is_urlencoded());

        let form = ContentType("application/x-www-form-urlencoded");
        assert!(form.is_urlencoded());
        assert_eq!(form.charset(), "us-ascii");
        assert_eq!(form.boundary(), None);
    }

    #[test]
    fn content_disposition() {
        let cd = ContentDisposition(r#"form-data; name="upload"; filename="my%20report.pdf""#);

        assert_eq!(cd.kind(), "form-data");
        assert_eq!(cd.name(), Some("upload"));
        assert_eq!(cd.filename().as_deref(), Some("my report.pdf"));

        let plain = ContentDisposition(r#"form-data; name="f"; filename="100%.txt""#);
        assert_eq!(plain.filename().as_deref(), Some("100%.txt"));
    }

    #[test]
    fn field_views() {
        let headers = table(&[
            ("Location", "/next"),
            ("Content-Length", "42"),
            ("Transfer-Encoding", "gzip, chunked"),
            ("Cookie", "a=1"),
        ]);

        assert_eq!(headers.field(FieldName::Location), Some(Field::Location("/next")));
        assert_eq!(headers.field(FieldName::ContentLength), Some(Field::ContentLength(42)));
        assert_eq!(headers.field(FieldName::ContentType), None);

        match headers.field(FieldName::TransferEncoding) {
            Some(Field::TransferEncoding(te)) => {
                assert!(te.is_chunked());
                assert_eq!(te.codings().collect::<Vec<_>>(), ["gzip", "chunked"]);
            }
            other => panic!("unexpected {other:?}"),
        }

        match headers.field(FieldName::Cookie) {
            Some(Field::Cookies(cookies)) => assert_eq!(cookies[0].value, "1"),
            other => panic!("unexpected {other:?}"),
        }

        let mut padded = HeaderMap::new();
        padded.add("Location", "   /next").unwrap();
        assert_eq!(padded.location(), Some("/next"));
        assert_eq!(padded.field(FieldName::Location), Some(Field::Location("/next")));

        let bad = table(&[("Content-Length", "4x")]);
        assert_eq!(bad.field(FieldName::ContentLength), None);
    }
}
