//! URL query strings and `application/x-www-form-urlencoded` bodies.
//!
//! Splitting is zero-copy: [`Query::parse`] hands out raw `(name, value)`
//! slices. Percent-decoding is a separate step ([`Query::decode`]) so callers
//! only pay for it on the fields they actually read.

use memchr::memchr;
use std::{borrow::Cow, collections::HashMap, error, fmt};

/// How [`Query::decode`] treats a `%` that is not followed by two hex digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodePolicy {
    /// Copy the invalid escape through literally (`%zz` stays `%zz`).
    #[default]
    PassThrough,
    /// Fail with [`Error::InvalidEscape`].
    Reject,
}

/// URL query string and form body parser.
///
/// # Examples
/// ```rust
/// use maker_http::query::Query;
/// use std::collections::HashMap;
///
/// // Parse into Vec (preserves order)
/// let query = b"name=john&age=25&city";
/// let vec_params: Vec<(&[u8], &[u8])> = Query::parse(query, 10).unwrap();
/// assert_eq!(vec_params.len(), 3);
///
/// // Parse into HashMap (deduplicates)
/// let hash_params: HashMap<&[u8], &[u8]> = Query::parse(query, 10).unwrap();
/// assert_eq!(hash_params.len(), 3);
///
/// // Handle limits
/// let result = Query::parse::<Vec<(&[u8], &[u8])>>(b"a=1&b=2", 1);
/// assert!(result.is_err()); // Exceeds limit of 1 parameter
/// ```
/// All possible formats:
/// ```rust
/// use maker_http::query::Query;
///
/// let query = b"debug&name=&=Qwe&key=sda&&";
/// let vec_params: Vec<(&[u8], &[u8])> = Query::parse(query, 10).unwrap();
///
/// assert_eq!(vec_params.len(), 4);
/// assert!(vec_params[0] == (b"debug", b""));
/// assert!(vec_params[1] == (b"name", b""));
/// assert!(vec_params[2] == (b"", b"Qwe"));
/// assert!(vec_params[3] == (b"key", b"sda"));
/// ```
pub struct Query;

impl Query {
    /// Parses a URL query string into a new collection.
    ///
    /// # Arguments
    /// - `query`: Raw bytes of the query string
    ///   (handles optional leading `?` automatically, so `?a=1` and `a=1` are equivalent)
    /// - `limit`: Maximum number of parameters to parse
    ///
    /// # Examples
    /// ```
    /// use maker_http::query::Query;
    /// use std::collections::HashMap;
    ///
    /// // Parse into HashMap (deduplicates keys)
    /// let params: HashMap<&[u8], &[u8]> = Query::parse(b"key=1&key=2", 10).unwrap();
    /// assert_eq!(params.len(), 1); // only last value remains
    ///
    /// // Handle empty values and missing '='
    /// let params: Vec<(&[u8], &[u8])> = Query::parse(b"flag&empty=", 10).unwrap();
    /// assert!(params[0] == (b"flag", b""));
    /// assert!(params[1] == (b"empty", b""));
    /// ```
    #[inline(always)]
    pub fn parse<'a, C: QueryCollector<'a>>(query: &'a [u8], limit: usize) -> Result<C, Error> {
        let mut result = C::with_capacity(limit.min(16));
        Self::parse_into(&mut result, query, limit)?;
        Ok(result)
    }

    /// Parses a URL query string into an existing collection.
    ///
    /// Parameters are appended, so one collection can gather several sources
    /// (query string first, then the form body).
    #[inline]
    pub fn parse_into<'a, C: QueryCollector<'a>>(
        result: &mut C,
        query: &'a [u8],
        limit: usize,
    ) -> Result<(), Error> {
        for (key, value) in Self::pairs(query) {
            if result.length() >= limit {
                return Err(Error::OverLimit(limit));
            }

            result.add_param(key, value);
        }

        Ok(())
    }

    /// Iterates over raw `(name, value)` pairs.
    ///
    /// Empty segments (`a=1&&b=2`) are skipped, a segment without `=` has an
    /// empty value.
    #[inline]
    pub fn pairs(query: &[u8]) -> impl Iterator<Item = (&[u8], &[u8])> {
        let data = match query {
            [b'?', rest @ ..] => rest,
            _ => query,
        };

        data.split(|&b| b == b'&')
            .filter(|segment| !segment.is_empty())
            .map(|segment| match memchr(b'=', segment) {
                Some(i) => (&segment[..i], &segment[i + 1..]),
                None => (segment, &b""[..]),
            })
    }

    /// Returns the raw value of the first parameter whose decoded name is `key`.
    pub fn find<'a>(query: &'a [u8], key: &[u8]) -> Option<&'a [u8]> {
        Self::pairs(query)
            .find(|(name, _)| match Self::decode_bytes(name, DecodePolicy::PassThrough) {
                Ok(decoded) => decoded.as_ref() == key,
                Err(_) => false,
            })
            .map(|(_, value)| value)
    }

    /// Decodes every pair, duplicates kept in order.
    pub fn decode_pairs(query: &[u8]) -> Vec<(String, String)> {
        Self::pairs(query)
            .map(|(name, value)| {
                (
                    Self::decode_lossy(name).into_owned(),
                    Self::decode_lossy(value).into_owned(),
                )
            })
            .collect()
    }

    /// Percent-decodes a single component: `+` becomes a space, `%XX`
    /// becomes the byte `0xXX`.
    ///
    /// Borrows the input when nothing needs decoding. Decoded bytes that are
    /// not UTF-8 are replaced with `U+FFFD`.
    ///
    /// # Examples
    /// ```
    /// use maker_http::query::{DecodePolicy, Query};
    ///
    /// let decoded = Query::decode(b"a+b%2Fc", DecodePolicy::PassThrough).unwrap();
    /// assert_eq!(decoded, "a b/c");
    ///
    /// assert_eq!(Query::decode(b"100%", DecodePolicy::PassThrough).unwrap(), "100%");
    /// assert!(Query::decode(b"100%", DecodePolicy::Reject).is_err());
    /// ```
    pub fn decode(src: &[u8], policy: DecodePolicy) -> Result<Cow<'_, str>, Error> {
        Ok(match Self::decode_bytes(src, policy)? {
            Cow::Borrowed(bytes) => String::from_utf8_lossy(bytes),
            Cow::Owned(bytes) => match String::from_utf8(bytes) {
                Ok(string) => Cow::Owned(string),
                Err(e) => Cow::Owned(String::from_utf8_lossy(e.as_bytes()).into_owned()),
            },
        })
    }

    /// [`Query::decode`] with [`DecodePolicy::PassThrough`], which cannot fail.
    #[inline]
    pub fn decode_lossy(src: &[u8]) -> Cow<'_, str> {
        match Self::decode(src, DecodePolicy::PassThrough) {
            Ok(decoded) => decoded,
            Err(_) => String::from_utf8_lossy(src),
        }
    }

    /// Percent-decodes into raw bytes.
    pub fn decode_bytes(src: &[u8], policy: DecodePolicy) -> Result<Cow<'_, [u8]>, Error> {
        if memchr::memchr2(b'%', b'+', src).is_none() {
            return Ok(Cow::Borrowed(src));
        }

        let mut out = Vec::with_capacity(src.len());
        let mut i = 0;

        while i < src.len() {
            match src[i] {
                b'+' => out.push(b' '),
                b'%' => match (src.get(i + 1), src.get(i + 2)) {
                    (Some(&hi), Some(&lo)) if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit() => {
                        out.push(hex_value(hi) << 4 | hex_value(lo));
                        i += 2;
                    }
                    _ => match policy {
                        DecodePolicy::PassThrough => out.push(b'%'),
                        DecodePolicy::Reject => return Err(Error::InvalidEscape(i)),
                    },
                },
                byte => out.push(byte),
            }
            i += 1;
        }

        Ok(Cow::Owned(out))
    }

    /// Whether `src` contains anything [`Query::decode`] would change.
    #[inline]
    pub fn is_encoded(src: &[u8]) -> bool {
        src.windows(3).any(|w| {
            w[0] == b'%' && w[1].is_ascii_hexdigit() && w[2].is_ascii_hexdigit()
        }) || memchr(b'+', src).is_some()
    }
}

#[inline(always)]
const fn hex_value(byte: u8) -> u8 {
    match byte {
        b'0'..=b'9' => byte - b'0',
        b'a'..=b'f' => byte - b'a' + 10,
        _ => byte - b'A' + 10,
    }
}

/// A trait for types that can collect parsed query parameters.
///
/// This trait allows flexible storage of URL query parameters while keeping
/// parsing zero-copy. Implementors can choose how to store the key-value pairs.
///
/// # Examples
/// ```rust
/// use maker_http::query::{Query, QueryCollector};
///
/// struct Decoded(Vec<(String, String)>);
///
/// impl<'a> QueryCollector<'a> for Decoded {
///     fn add_param(&mut self, key: &'a [u8], value: &'a [u8]) {
///         self.0.push((
///             Query::decode_lossy(key).into_owned(),
///             Query::decode_lossy(value).into_owned(),
///         ));
///     }
///
///     fn length(&self) -> usize {
///         self.0.len()
///     }
///
///     fn with_capacity(capacity: usize) -> Self {
///         Decoded(Vec::with_capacity(capacity))
///     }
/// }
///
/// let params: Decoded = Query::parse(b"q=a%20b", 4).unwrap();
/// assert_eq!(params.0[0].1, "a b");
/// ```
pub trait QueryCollector<'a>
where
    Self: Sized,
{
    /// Adds a parsed parameter to the collection.
    fn add_param(&mut self, key: &'a [u8], value: &'a [u8]);

    /// Returns the current number of parameters in the collection.
    fn length(&self) -> usize;

    /// Creates a new collection with the specified capacity.
    fn with_capacity(capacity: usize) -> Self;
}

// Implementation for Vec - preserves parameter order
impl<'a> QueryCollector<'a> for Vec<(&'a [u8], &'a [u8])> {
    #[inline(always)]
    fn add_param(&mut self, key: &'a [u8], value: &'a [u8]) {
        self.push((key, value));
    }

    #[inline(always)]
    fn length(&self) -> usize {
        self.len()
    }

    #[inline(always)]
    fn with_capacity(capacity: usize) -> Self {
        Vec::with_capacity(capacity)
    }
}

// Implementation for HashMap - deduplicates parameters (last wins)
impl<'a> QueryCollector<'a> for HashMap<&'a [u8], &'a [u8]> {
    #[inline(always)]
    fn add_param(&mut self, key: &'a [u8], value: &'a [u8]) {
        self.insert(key, value);
    }

    #[inline(always)]
    fn length(&self) -> usize {
        self.len()
    }

    #[inline(always)]
    fn with_capacity(capacity: usize) -> Self {
        HashMap::with_capacity(capacity)
    }
}

/// Error types that can occur during query parsing and decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The number of parameters exceeded the specified limit.
    ///
    /// # Fields
    /// - `0`: The maximum allowed number of parameters
    OverLimit(usize),

    /// A `%` not followed by two hex digits, under [`DecodePolicy::Reject`].
    ///
    /// # Fields
    /// - `0`: Offset of the `%` in the input
    InvalidEscape(usize),
}

impl error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::OverLimit(limit) => {
                write!(f, "Query parameter limit exceeded: limit={}", limit)
            }
            Error::InvalidEscape(at) => {
                write!(f, "Invalid percent escape at offset {}", at)
            }
        }
    }
}
