//! Upload progress tracking.
//!
//! The connection that receives a request body is the only writer of its
//! entry; any number of other requests may poll it by token. All state lives
//! in atomics, so neither side ever blocks.

use crate::{limits::UploadLimits, Message};
use std::{
    borrow::Cow,
    collections::hash_map::DefaultHasher,
    fmt::Write,
    hash::{Hash, Hasher},
    sync::{
        atomic::{AtomicU16, AtomicU64, AtomicU8, Ordering},
        Arc,
    },
};

const FREE: u8 = 0;
const CLAIMED: u8 = 1;
const STARTING: u8 = 2;
const UPLOADING: u8 = 3;
const DONE: u8 = 4;
const ERROR: u8 = 5;

const UNKNOWN_SIZE: u64 = u64::MAX;

/// Where an upload stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    /// Not seen yet, or not tracked.
    Starting,
    Uploading,
    Done,
    /// Failed with the given response status.
    Error(u16),
}

/// A snapshot of one upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub state: UploadState,
    pub received: u64,
    /// Announced body size, `None` for chunked bodies.
    pub size: Option<u64>,
}

impl Progress {
    const STARTING: Self = Self {
        state: UploadState::Starting,
        received: 0,
        size: None,
    };

    /// Renders the JSON answer of a progress query.
    ///
    /// ```
    /// use maker_http::upload::{Progress, UploadState};
    ///
    /// let progress = Progress { state: UploadState::Uploading, received: 10, size: Some(40) };
    /// assert_eq!(progress.to_json(), r#"{"state":"uploading","received":10,"size":40}"#);
    /// ```
    pub fn to_json(&self) -> String {
        let mut out = String::with_capacity(64);
        let _ = match self.state {
            UploadState::Starting => write!(out, r#"{{"state":"starting"}}"#),
            UploadState::Done => write!(out, r#"{{"state":"done"}}"#),
            UploadState::Error(status) => {
                write!(out, r#"{{"state":"error","status":{status}}}"#)
            }
            UploadState::Uploading => match self.size {
                Some(size) => write!(
                    out,
                    r#"{{"state":"uploading","received":{},"size":{size}}}"#,
                    self.received
                ),
                None => write!(out, r#"{{"state":"uploading","received":{}}}"#, self.received),
            },
        };
        out
    }
}

#[derive(Debug)]
struct Slot {
    state: AtomicU8,
    key: AtomicU64,
    received: AtomicU64,
    size: AtomicU64,
    status: AtomicU16,
}

impl Slot {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(FREE),
            key: AtomicU64::new(0),
            received: AtomicU64::new(0),
            size: AtomicU64::new(UNKNOWN_SIZE),
            status: AtomicU16::new(0),
        }
    }
}

/// Fixed-capacity table of uploads in flight.
///
/// An upload that completes or fails is not deleted right away. Its entry
/// stays readable as `done` or `error` until the slot is reclaimed by a new
/// upload, so a client polling after the last byte still sees the outcome.
/// Only a cancelled upload, whose [`UploadGuard`] is dropped unfinished,
/// frees its slot immediately.
#[derive(Debug)]
pub struct UploadRegistry {
    slots: Box<[Slot]>,
    token_name: String,
}

impl UploadRegistry {
    pub fn new(limits: &UploadLimits) -> Self {
        Self {
            slots: (0..limits.slots).map(|_| Slot::new()).collect(),
            token_name: limits.token_name.clone(),
        }
    }

    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of uploads currently receiving data.
    pub fn active(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| matches!(slot.state.load(Ordering::Acquire), STARTING | UPLOADING))
            .count()
    }

    /// The upload token of a request: the query parameter first, then the header.
    pub fn token<'a>(&self, message: &'a Message) -> Option<Cow<'a, str>> {
        let from_query = message.url().and_then(|url| url.query(&self.token_name));

        from_query
            .or_else(|| message.header(&self.token_name).map(Cow::Borrowed))
            .filter(|token| !token.is_empty())
    }

    /// Starts tracking an upload of `size` bytes (`None` when unknown).
    ///
    /// Returns `None` when every slot is busy; the upload then goes
    /// untracked and queries for it answer `starting`.
    pub fn begin(self: &Arc<Self>, token: &str, size: Option<u64>) -> Option<UploadGuard> {
        let key = key_of(token);

        let index = self
            .claim(&[FREE])
            .or_else(|| self.claim(&[DONE, ERROR]))
            .or_else(|| {
                tracing::warn!(capacity = self.capacity(), "upload registry full, not tracking upload");
                None
            })?;

        let slot = &self.slots[index];
        slot.key.store(key, Ordering::Relaxed);
        slot.received.store(0, Ordering::Relaxed);
        slot.size.store(size.unwrap_or(UNKNOWN_SIZE), Ordering::Relaxed);
        slot.status.store(0, Ordering::Relaxed);
        slot.state.store(STARTING, Ordering::Release);

        tracing::trace!(slot = index, ?size, "upload tracked");
        Some(UploadGuard {
            registry: Arc::clone(self),
            index,
        })
    }

    /// A snapshot of the upload named `token`.
    pub fn progress(&self, token: &str) -> Progress {
        let key = key_of(token);

        for slot in self.slots.iter() {
            let state = slot.state.load(Ordering::Acquire);
            if state == FREE || state == CLAIMED || slot.key.load(Ordering::Relaxed) != key {
                continue;
            }

            let received = slot.received.load(Ordering::Relaxed);
            let size = slot.size.load(Ordering::Relaxed);
            let status = slot.status.load(Ordering::Relaxed);

            // The slot changed owner while being read.
            if slot.key.load(Ordering::Acquire) != key {
                continue;
            }

            return Progress {
                state: match state {
                    STARTING => UploadState::Starting,
                    UPLOADING => UploadState::Uploading,
                    DONE => UploadState::Done,
                    _ => UploadState::Error(status),
                },
                received,
                size: (size != UNKNOWN_SIZE).then_some(size),
            };
        }

        Progress::STARTING
    }

    fn claim(&self, from: &[u8]) -> Option<usize> {
        self.slots.iter().position(|slot| {
            from.iter().any(|&state| {
                slot.state
                    .compare_exchange(state, CLAIMED, Ordering::AcqRel, Ordering::Relaxed)
                    .is_ok()
            })
        })
    }
}

fn key_of(token: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    token.hash(&mut hasher);
    hasher.finish()
}

/// Write handle of one tracked upload.
///
/// Dropping the guard before [`finish`](Self::finish) or
/// [`fail`](Self::fail) frees the entry.
#[derive(Debug)]
pub struct UploadGuard {
    registry: Arc<UploadRegistry>,
    index: usize,
}

impl UploadGuard {
    #[inline(always)]
    fn slot(&self) -> &Slot {
        &self.registry.slots[self.index]
    }

    /// Records the number of body bytes received so far. Never goes back.
    pub fn update(&self, received: u64) {
        let slot = self.slot();
        slot.received.fetch_max(received, Ordering::Relaxed);
        let _ = slot
            .state
            .compare_exchange(STARTING, UPLOADING, Ordering::AcqRel, Ordering::Relaxed);
    }

    /// Marks the upload as complete.
    pub fn finish(self) {
        self.slot().state.store(DONE, Ordering::Release);
    }

    /// Marks the upload as failed with the response `status`.
    pub fn fail(self, status: u16) {
        let slot = self.slot();
        slot.status.store(status, Ordering::Relaxed);
        slot.state.store(ERROR, Ordering::Release);
    }
}

impl Drop for UploadGuard {
    fn drop(&mut self) {
        let slot = self.slot();
        let state = slot.state.load(Ordering::Acquire);

        if state == STARTING || state == UPLOADING {
            slot.key.store(0, Ordering::Relaxed);
            slot.state.store(FREE, Ordering::Release);
            tracing::trace!(slot = self.index, "upload cancelled");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Method, Version};

    fn registry(slots: usize) -> Arc<UploadRegistry> {
        Arc::new(UploadRegistry::new(&UploadLimits {
            slots,
            ..UploadLimits::default()
        }))
    }

    #[test]
    fn lifecycle() {
        let registry = registry(4);
        assert_eq!(registry.progress("a"), Progress::STARTING);

        let guard = registry.begin("a", Some(100)).unwrap();
        assert_eq!(registry.progress("a").state, UploadState::Starting);
        assert_eq!(registry.active(), 1);

        guard.update(40);
        guard.update(10);
        assert_eq!(
            registry.progress("a"),
            Progress {
                state: UploadState::Uploading,
                received: 40,
                size: Some(100),
            }
        );
        assert_eq!(
            registry.progress("a").to_json(),
            r#"{"state":"uploading","received":40,"size":100}"#
        );

        guard.update(100);
        guard.finish();
        assert_eq!(registry.progress("a").state, UploadState::Done);
        assert_eq!(registry.progress("a").to_json(), r#"{"state":"done"}"#);
        assert_eq!(registry.active(), 0);
    }

    #[test]
    fn cancel_and_fail() {
        let registry = registry(2);

        let guard = registry.begin("a", None).unwrap();
        guard.update(5);
        assert_eq!(
            registry.progress("a").to_json(),
            r#"{"state":"uploading","received":5}"#
        );
        drop(guard);
        assert_eq!(registry.progress("a"), Progress::STARTING);

        registry.begin("b", Some(9)).unwrap().fail(413);
        assert_eq!(registry.progress("b").state, UploadState::Error(413));
        assert_eq!(
            registry.progress("b").to_json(),
            r#"{"state":"error","status":413}"#
        );
    }

    #[test]
    fn full_registry() {
        let registry = registry(2);

        let a = registry.begin("a", None).unwrap();
        let b = registry.begin("b", None).unwrap();
        assert!(registry.begin("c", None).is_none());
        assert_eq!(registry.progress("c"), Progress::STARTING);

        // A finished entry is given up for a new upload.
        a.finish();
        let c = registry.begin("c", None).unwrap();
        c.update(1);
        assert_eq!(registry.progress("a"), Progress::STARTING);
        assert_eq!(registry.progress("c").received, 1);

        drop(b);
        assert!(registry.begin("d", None).is_some());
    }

    #[test]
    fn concurrent_readers() {
        let registry = registry(1);
        let guard = registry.begin("big", Some(1000)).unwrap();

        let reader = {
            let registry = Arc::clone(&registry);
            std::thread::spawn(move || {
                let mut last = 0;
                for _ in 0..1000 {
                    let progress = registry.progress("big");
                    assert!(progress.received >= last);
                    last = progress.received;
                }
            })
        };

        for received in 0..=1000 {
            guard.update(received);
        }
        reader.join().unwrap();
        guard.finish();
    }

    #[test]
    fn token_lookup() {
        let registry = registry(1);

        let by_query =
            Message::request(Method::Post, "/upload?X-Progress-ID=abc", Version::Http11).unwrap();
        assert_eq!(registry.token(&by_query).as_deref(), Some("abc"));

        let mut by_header = Message::request(Method::Post, "/upload", Version::Http11).unwrap();
        by_header.headers_mut().add("X-Progress-ID", "def").unwrap();
        assert_eq!(registry.token(&by_header).as_deref(), Some("def"));

        let none = Message::request(Method::Post, "/upload?X-Progress-ID=", Version::Http11).unwrap();
        assert_eq!(registry.token(&none), None);
    }
}
