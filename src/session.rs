//! Cookie-keyed session storage.
//!
//! [`SessionStore`] is the seam: any backend works as long as each call is
//! atomic and hands values out by clone. [`MemoryStore`] is the in-process
//! implementation, [`Sessions`] ties a store to the session cookie.

use crate::{fields::SetCookie, limits::SessionLimits, Message};
use parking_lot::RwLock;
use std::{
    collections::HashMap,
    hash::{BuildHasher, Hasher},
    sync::atomic::{AtomicU64, Ordering},
    time::{Instant, SystemTime, UNIX_EPOCH},
};

/// Storage of session values keyed by token.
///
/// Every operation is atomic with respect to the store and nothing borrows
/// into it, so no caller ever owns a session across two calls.
pub trait SessionStore: Send + Sync {
    type Value: Clone + Send + Sync;

    /// A copy of the value stored under `token`.
    fn get(&self, token: &str) -> Option<Self::Value>;

    /// Stores `value` under `token`, replacing any previous value.
    fn put(&self, token: &str, value: Self::Value);

    /// Removes and returns the value stored under `token`.
    fn remove(&self, token: &str) -> Option<Self::Value>;

    /// Marks the session as used now. Returns `false` for unknown tokens.
    fn touch(&self, token: &str) -> bool;
}

#[derive(Debug)]
struct Record<V> {
    value: V,
    touched: Instant,
}

/// In-memory [`SessionStore`] behind a [`parking_lot::RwLock`].
///
/// Records never expire by themselves; call [`sweep`](Self::sweep)
/// periodically to drop idle ones.
#[derive(Debug)]
pub struct MemoryStore<V> {
    records: RwLock<HashMap<String, Record<V>>>,
}

impl<V> MemoryStore<V> {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Drops every record idle for at least `ttl` and returns how many went.
    pub fn sweep(&self, ttl: std::time::Duration) -> usize {
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|_, record| record.touched.elapsed() < ttl);

        let removed = before - records.len();
        if removed > 0 {
            tracing::debug!(removed, remaining = records.len(), "idle sessions swept");
        }
        removed
    }
}

impl<V> Default for MemoryStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + Send + Sync> SessionStore for MemoryStore<V> {
    type Value = V;

    fn get(&self, token: &str) -> Option<V> {
        self.records.read().get(token).map(|record| record.value.clone())
    }

    fn put(&self, token: &str, value: V) {
        let record = Record {
            value,
            touched: Instant::now(),
        };
        self.records.write().insert(token.to_owned(), record);
    }

    fn remove(&self, token: &str) -> Option<V> {
        self.records.write().remove(token).map(|record| record.value)
    }

    fn touch(&self, token: &str) -> bool {
        match self.records.write().get_mut(token) {
            Some(record) => {
                record.touched = Instant::now();
                true
            }
            None => false,
        }
    }
}

/// A session resolved for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session<V> {
    pub token: String,
    pub value: V,
    /// The session was created for this request; its cookie must be sent.
    pub is_new: bool,
}

/// Binds a [`SessionStore`] to the session cookie.
///
/// ```
/// use maker_http::{
///     limits::SessionLimits,
///     session::{MemoryStore, SessionStore, Sessions},
///     Message, Method, Version,
/// };
///
/// let sessions = Sessions::new(MemoryStore::new(), SessionLimits::default());
///
/// let first = Message::request(Method::Get, "/", Version::Http11).unwrap();
/// let session = sessions.resolve(&first, || 0u32);
/// assert!(session.is_new);
///
/// let mut next = Message::request(Method::Get, "/", Version::Http11).unwrap();
/// next.headers_mut()
///     .add("Cookie", &format!("sid={}", session.token))
///     .unwrap();
/// sessions.store().put(&session.token, 1);
///
/// assert_eq!(sessions.load(&next).map(|s| s.value), Some(1));
/// ```
#[derive(Debug)]
pub struct Sessions<S> {
    store: S,
    limits: SessionLimits,
}

impl<S: SessionStore> Sessions<S> {
    pub fn new(store: S, limits: SessionLimits) -> Self {
        Self { store, limits }
    }

    #[inline(always)]
    pub fn store(&self) -> &S {
        &self.store
    }

    #[inline(always)]
    pub fn limits(&self) -> &SessionLimits {
        &self.limits
    }

    /// The session token carried by the request's `Cookie` header.
    #[inline]
    pub fn token<'a>(&self, message: &'a Message) -> Option<&'a str> {
        message
            .cookie(&self.limits.cookie_name)
            .filter(|token| !token.is_empty())
    }

    /// The existing session of the request, refreshed as used.
    pub fn load(&self, message: &Message) -> Option<Session<S::Value>> {
        let token = self.token(message)?;
        let value = self.store.get(token)?;
        self.store.touch(token);

        Some(Session {
            token: token.to_owned(),
            value,
            is_new: false,
        })
    }

    /// Stores `value` under a fresh token and returns the token.
    pub fn start(&self, value: S::Value) -> String {
        let token = generate_token();
        self.store.put(&token, value);

        tracing::trace!(cookie = %self.limits.cookie_name, "session started");
        token
    }

    /// Loads the request's session, starting one with `init()` when the
    /// request has none or its token is unknown.
    pub fn resolve<F>(&self, message: &Message, init: F) -> Session<S::Value>
    where
        F: FnOnce() -> S::Value,
    {
        if let Some(session) = self.load(message) {
            return session;
        }

        let value = init();
        Session {
            token: self.start(value.clone()),
            value,
            is_new: true,
        }
    }

    /// Forgets the request's session. Pair with [`removal_cookie`](Self::removal_cookie).
    pub fn end(&self, message: &Message) -> Option<S::Value> {
        let token = self.token(message)?;
        let value = self.store.remove(token);

        if value.is_some() {
            tracing::trace!(cookie = %self.limits.cookie_name, "session ended");
        }
        value
    }

    /// The `Set-Cookie` value that hands `token` to the client.
    pub fn cookie<'a>(&'a self, token: &'a str) -> SetCookie<'a> {
        let mut cookie = SetCookie::new(&self.limits.cookie_name, token)
            .path(&self.limits.cookie_path)
            .secure(self.limits.secure)
            .http_only(self.limits.http_only);

        if let Some(domain) = &self.limits.cookie_domain {
            cookie = cookie.domain(domain);
        }
        if let Some(age) = self.limits.cookie_max_age {
            cookie = cookie.max_age(age);
        }
        cookie
    }

    /// The `Set-Cookie` value that makes the client drop its token.
    pub fn removal_cookie(&self) -> SetCookie<'_> {
        SetCookie::removal(&self.limits.cookie_name).path(&self.limits.cookie_path)
    }
}

/// 32 hex digits from the process-seeded hasher, a clock and a counter.
fn generate_token() -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    let count = COUNTER.fetch_add(1, Ordering::Relaxed);

    let state = std::collections::hash_map::RandomState::new();
    let mut words = [0u64; 2];
    for (i, word) in words.iter_mut().enumerate() {
        let mut hasher = state.build_hasher();
        hasher.write_u64(nanos);
        hasher.write_u64(count);
        hasher.write_usize(i);
        *word = hasher.finish();
    }

    format!("{:016x}{:016x}", words[0], words[1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Method, Version};
    use std::{sync::Arc, time::Duration};

    fn request(cookie: Option<&str>) -> Message {
        let mut message = Message::request(Method::Get, "/", Version::Http11).unwrap();
        if let Some(cookie) = cookie {
            message.headers_mut().add("Cookie", cookie).unwrap();
        }
        message
    }

    #[test]
    fn memory_store() {
        let store = MemoryStore::new();
        assert!(store.is_empty());
        assert_eq!(store.get("a"), None);
        assert!(!store.touch("a"));

        store.put("a", vec![1]);
        store.put("b", vec![2]);
        store.put("a", vec![3]);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("a"), Some(vec![3]));
        assert!(store.touch("b"));

        assert_eq!(store.remove("b"), Some(vec![2]));
        assert_eq!(store.remove("b"), None);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn sweep() {
        let store = MemoryStore::new();
        store.put("a", 1);
        store.put("b", 2);

        assert_eq!(store.sweep(Duration::from_secs(3600)), 0);
        assert_eq!(store.sweep(Duration::ZERO), 2);
        assert!(store.is_empty());
    }

    #[test]
    fn shared_between_threads() {
        let store = Arc::new(MemoryStore::new());

        let handles: Vec<_> = (0..4)
            .map(|n| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..100 {
                        store.put(&format!("{n}-{i}"), i);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len(), 400);
        assert_eq!(store.get("3-99"), Some(99));
    }

    #[test]
    fn resolve_and_end() {
        let sessions = Sessions::new(MemoryStore::new(), SessionLimits::default());

        let fresh = sessions.resolve(&request(None), || "guest".to_owned());
        assert!(fresh.is_new);
        assert_eq!(fresh.token.len(), 32);
        assert!(fresh.token.bytes().all(|b| b.is_ascii_hexdigit()));

        let cookie = format!("theme=dark; sid={}", fresh.token);
        let known = sessions.resolve(&request(Some(&cookie)), || unreachable!());
        assert!(!known.is_new);
        assert_eq!(known.token, fresh.token);
        assert_eq!(known.value, "guest");

        let stale = sessions.resolve(&request(Some("sid=unknown")), || "other".to_owned());
        assert!(stale.is_new);
        assert_ne!(stale.token, "unknown");

        assert_eq!(sessions.end(&request(Some(&cookie))), Some("guest".to_owned()));
        assert_eq!(sessions.load(&request(Some(&cookie))), None);
        assert_eq!(sessions.end(&request(None)), None);
    }

    #[test]
    fn tokens_differ() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
    }

    #[test]
    fn cookies() {
        let limits = SessionLimits {
            cookie_name: "app".to_owned(),
            cookie_domain: Some("example.com".to_owned()),
            cookie_max_age: Some(Duration::from_secs(60)),
            secure: true,
            ..SessionLimits::default()
        };
        let sessions = Sessions::new(MemoryStore::<()>::new(), limits);

        assert_eq!(
            sessions.cookie("t0k").render(),
            "app=t0k; max-age=60; path=/; domain=example.com; secure; HttpOnly"
        );
        assert_eq!(
            sessions.removal_cookie().render(),
            "app=; expires=Thu, 01 Jan 1970 00:00:00 GMT; max-age=0; path=/"
        );

        assert_eq!(sessions.token(&request(Some("app="))), None);
        assert_eq!(sessions.token(&request(Some("sid=1; app=2"))), Some("2"));
    }
}
