//! Codec trait and implementations for storing sessions as bytes.
//!
//! A serializing store (like [`KvStore`](crate::KvStore)) doesn't care
//! HOW sessions become bytes; it only needs something implementing
//! [`Codec`]. Encoding failures surface as
//! [`StoreError::InvalidData`] (the caller's value can't be stored, so
//! retrying is pointless) and decoding failures as
//! [`StoreError::InvalidStoredData`] (what came back is corrupt).

use serde::{Serialize, de::DeserializeOwned};

use crate::StoreError;

/// Converts session values to and from bytes.
///
/// - `Send + Sync` → shared by every request touching the store.
/// - `'static` → owns everything it needs.
///
/// `decode` requires `DeserializeOwned` so the decoded session doesn't
/// borrow from the buffer the backend handed back.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns [`StoreError::InvalidData`] if the value can't be
    /// represented in this format.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, StoreError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns [`StoreError::InvalidStoredData`] if the bytes are
    /// malformed or don't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, StoreError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// Stored sessions stay readable with ordinary backend tooling
/// (`redis-cli GET`, for instance). Behind the `json` feature, enabled by
/// default.
///
/// ```rust
/// use satchel_store::{Codec, JsonCodec};
///
/// let bytes = JsonCodec.encode(&vec![1, 2, 3]).unwrap();
/// assert_eq!(bytes, b"[1,2,3]");
/// let back: Vec<u8> = JsonCodec.decode(&bytes).unwrap();
/// assert_eq!(back, vec![1, 2, 3]);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, StoreError> {
        serde_json::to_vec(value)
            .map_err(|e| StoreError::InvalidData(e.to_string()))
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, StoreError> {
        serde_json::from_slice(data)
            .map_err(|e| StoreError::InvalidStoredData(e.to_string()))
    }
}
