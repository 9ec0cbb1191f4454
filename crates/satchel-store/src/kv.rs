//! Session store over a remote key-value backend.
//!
//! [`KvStore`] holds the parts every remote backend shares: key
//! namespacing, encoding through a [`Codec`], and translating the
//! backend's answers into [`StoreError`]. The backend itself (a Redis
//! client, a memcached pool) only has to implement [`KvBackend`], whose
//! `set_if_absent` must be a single atomic conditional write such as
//! Redis `SET key value NX PX ttl`.

use std::future::Future;
use std::time::Duration;

use serde::{Serialize, de::DeserializeOwned};

use crate::codec::Codec;
#[cfg(feature = "json")]
use crate::codec::JsonCodec;
use crate::{SessionStore, StoreError};

/// The primitives a remote key-value service must provide.
pub trait KvBackend: Send + Sync + 'static {
    /// The backend's native error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Fetches the value at `key`, or `None` if the key doesn't exist.
    fn get(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, Self::Error>> + Send;

    /// Atomically writes `value` at `key` with the given expiry, but only
    /// if the key doesn't exist. Returns whether the write happened.
    fn set_if_absent(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> impl Future<Output = Result<bool, Self::Error>> + Send;

    /// Deletes `key`, returning how many keys were removed (0 or 1).
    fn delete(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<u64, Self::Error>> + Send;
}

/// A [`SessionStore`] that serializes sessions into a [`KvBackend`].
///
/// Keys are written as `"<prefix>:<session id>"`. Every `get` decodes a
/// fresh value, so sessions are never shared between callers.
#[derive(Debug, Clone)]
pub struct KvStore<B, C> {
    backend: B,
    codec: C,
    prefix: String,
}

#[cfg(feature = "json")]
impl<B: KvBackend> KvStore<B, JsonCodec> {
    /// Creates a store that writes JSON under `prefix`.
    pub fn json(backend: B, prefix: impl Into<String>) -> Self {
        Self::with_codec(backend, JsonCodec, prefix)
    }
}

impl<B: KvBackend, C: Codec> KvStore<B, C> {
    /// Creates a store with an explicit codec.
    pub fn with_codec(backend: B, codec: C, prefix: impl Into<String>) -> Self {
        Self {
            backend,
            codec,
            prefix: prefix.into(),
        }
    }

    /// Returns the backend key for a session ID.
    pub fn key(&self, id: &str) -> String {
        format!("{}:{id}", self.prefix)
    }

    /// Returns the wrapped backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<S, B, C> SessionStore<S> for KvStore<B, C>
where
    S: Serialize + DeserializeOwned + Send + Sync + 'static,
    B: KvBackend,
    C: Codec,
{
    async fn get(&self, id: &str) -> Result<S, StoreError> {
        let raw = self
            .backend
            .get(&self.key(id))
            .await
            .map_err(StoreError::backend)?
            .ok_or(StoreError::NotFound)?;
        self.codec.decode(&raw)
    }

    async fn set(
        &self,
        id: &str,
        session: &S,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let value = self.codec.encode(session)?;
        let written = self
            .backend
            .set_if_absent(&self.key(id), value, ttl)
            .await
            .map_err(StoreError::backend)?;
        if written { Ok(()) } else { Err(StoreError::Exists) }
    }

    async fn del(&self, id: &str) -> Result<(), StoreError> {
        let removed = self
            .backend
            .delete(&self.key(id))
            .await
            .map_err(StoreError::backend)?;
        if removed == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
