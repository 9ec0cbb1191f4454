//! Authenticated token strings for Satchel.
//!
//! This crate turns arbitrary byte payloads (random session IDs, CSRF
//! nonces) into opaque strings that can be handed to a browser and later
//! checked for tampering:
//!
//! - **Codecs** ([`TokenCodec`], [`V0Codec`]): one per wire version.
//! - **Dispatch** ([`Authenticator`]): writes the current version and
//!   routes verification by the token's declared version.
//! - **Keys** ([`TokenKeys`]): separate session and CSRF keys derived
//!   from one root secret.
//!
//! # How it fits in the stack
//!
//! ```text
//! Session Layer (above)  ← mints session IDs and CSRF tokens
//!     ↕
//! Token Layer (this crate)  ← authenticates and verifies them
//! ```

mod authenticator;
mod codec;
mod error;
mod keys;
pub mod v0;

pub use authenticator::Authenticator;
pub use codec::{TokenCodec, VERSION_SEPARATOR};
pub use error::TokenError;
pub use keys::{
    CSRF_TOKEN_INFO, DERIVED_KEY_LEN, SESSION_TOKEN_INFO, TokenKeys, derive_key,
};
pub use v0::V0Codec;
