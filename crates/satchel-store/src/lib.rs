//! Session storage for Satchel.
//!
//! Provides the [`SessionStore`] trait that abstracts over where sessions
//! live, plus two implementations:
//!
//! - [`MemoryStore`]: in-process map with a lazy, heap-driven expiry
//! - [`KvStore`]: serializes through a [`Codec`] into any [`KvBackend`]
//!   offering an atomic set-if-absent (Redis `SET NX`, for example)
//!
//! # Contract
//!
//! `set` is create-only: of several concurrent `set` calls for one ID,
//! exactly one succeeds and the rest see [`StoreError::Exists`]. The
//! session manager relies on this alone to resolve ID collisions; it takes
//! no locks of its own around store calls.
//!
//! # Feature Flags
//!
//! - `json` (default): [`JsonCodec`] via `serde_json`

mod clock;
mod codec;
mod error;
mod eviction;
mod kv;
mod memory;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

pub use clock::{Clock, ManualClock, SystemClock, after};
pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::StoreError;
pub use kv::{KvBackend, KvStore};
pub use memory::MemoryStore;

/// Storage for session values of type `S`, keyed by session ID.
///
/// # Trait bounds
///
/// - `Send + Sync` → one store is shared by every in-flight request.
/// - `'static` → it lives as long as the session manager that owns it.
pub trait SessionStore<S>: Send + Sync + 'static {
    /// Fetches the session stored under `id`.
    ///
    /// # Errors
    /// - [`StoreError::NotFound`]: nothing stored (or it expired)
    /// - [`StoreError::InvalidStoredData`]: stored bytes didn't decode
    /// - [`StoreError::Backend`]: the backend failed
    fn get(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<S, StoreError>> + Send;

    /// Stores `session` under `id` for `ttl`, only if `id` is unused.
    ///
    /// # Errors
    /// - [`StoreError::Exists`]: `id` is taken
    /// - [`StoreError::InvalidData`]: `session` can't be encoded
    /// - [`StoreError::Backend`]: the backend failed
    fn set(
        &self,
        id: &str,
        session: &S,
        ttl: Duration,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Removes the session stored under `id`.
    ///
    /// # Errors
    /// - [`StoreError::NotFound`]: nothing was stored
    /// - [`StoreError::Backend`]: the backend failed
    fn del(&self, id: &str) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Lets a store be shared: the session manager owns one handle while
/// tests or admin code keep another.
impl<S, T> SessionStore<S> for Arc<T>
where
    T: SessionStore<S>,
{
    fn get(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<S, StoreError>> + Send {
        (**self).get(id)
    }

    fn set(
        &self,
        id: &str,
        session: &S,
        ttl: Duration,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        (**self).set(id, session, ttl)
    }

    fn del(&self, id: &str) -> impl Future<Output = Result<(), StoreError>> + Send {
        (**self).del(id)
    }
}
