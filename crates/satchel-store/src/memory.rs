//! In-process session store with lazy expiry.
//!
//! Useful for tests, demos, and single-instance deployments where no
//! external store is available. Every operation first drains expired
//! entries from a min-heap eviction queue, then touches the map; both happen
//! under one mutex that is never held across an `.await`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::clock::{Clock, SystemClock, after};
use crate::eviction::EvictionQueue;
use crate::{SessionStore, StoreError};

struct Stored<S> {
    value: S,
    expires: DateTime<Utc>,
}

struct Inner<S> {
    items: HashMap<String, Stored<S>>,
    evictions: EvictionQueue,
}

impl<S> Inner<S> {
    /// Removes every item whose eviction entry expired before `now`.
    ///
    /// An entry only removes the item if the item's recorded expiry is the
    /// one the entry was pushed with; entries left behind by `del` (or by a
    /// later `set` of the same key) are dropped without effect.
    fn evict(&mut self, now: DateTime<Utc>) {
        while let Some(entry) = self.evictions.pop_expired(now) {
            let live = self
                .items
                .get(&entry.key)
                .is_some_and(|item| item.expires == entry.expires);
            if live {
                self.items.remove(&entry.key);
                tracing::trace!(key = %entry.key, "evicted expired session");
            }
        }
    }
}

/// An in-memory [`SessionStore`].
///
/// # Ownership
///
/// `set` stores a clone of the session and `get` returns a clone; callers
/// never share a mutable value with the store. To share a value instead,
/// store an `Arc<T>`: clones then alias the same allocation, which is fine
/// for this in-process store but must not be relied on with a serializing
/// backend like [`KvStore`](crate::KvStore).
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use satchel_store::{MemoryStore, SessionStore, StoreError};
///
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let store = MemoryStore::<String>::new();
/// store.set("sid", &"alice".to_string(), Duration::from_secs(60)).await.unwrap();
///
/// assert_eq!(store.get("sid").await.unwrap(), "alice");
/// assert!(matches!(
///     store.set("sid", &"bob".to_string(), Duration::from_secs(60)).await,
///     Err(StoreError::Exists)
/// ));
/// # });
/// ```
pub struct MemoryStore<S> {
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner<S>>,
}

impl<S> MemoryStore<S> {
    /// Creates an empty store on the wall clock.
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }

    /// Creates an empty store that reads time from `clock`.
    pub fn with_clock(clock: impl Clock) -> Self {
        Self {
            clock: Arc::new(clock),
            inner: Mutex::new(Inner {
                items: HashMap::new(),
                evictions: EvictionQueue::new(),
            }),
        }
    }

    /// Number of live sessions, after evicting expired ones.
    pub fn len(&self) -> usize {
        let mut inner = self.inner.lock();
        inner.evict(self.clock.now());
        inner.items.len()
    }

    /// Returns `true` if no live sessions remain.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<S> Default for MemoryStore<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> std::fmt::Debug for MemoryStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("MemoryStore")
            .field("items", &inner.items.len())
            .finish_non_exhaustive()
    }
}

impl<S> SessionStore<S> for MemoryStore<S>
where
    S: Clone + Send + Sync + 'static,
{
    async fn get(&self, id: &str) -> Result<S, StoreError> {
        let mut inner = self.inner.lock();
        inner.evict(self.clock.now());
        inner
            .items
            .get(id)
            .map(|item| item.value.clone())
            .ok_or(StoreError::NotFound)
    }

    async fn set(
        &self,
        id: &str,
        session: &S,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        inner.evict(now);
        if inner.items.contains_key(id) {
            return Err(StoreError::Exists);
        }
        let expires = after(now, ttl);
        inner.items.insert(
            id.to_string(),
            Stored {
                value: session.clone(),
                expires,
            },
        );
        inner.evictions.push(id, expires);
        Ok(())
    }

    async fn del(&self, id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.evict(self.clock.now());
        // The eviction entry stays queued and is dropped when it expires.
        inner
            .items
            .remove(id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}
