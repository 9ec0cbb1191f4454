//! Error types for the session layer.

use satchel_retry::RetryError;
use satchel_store::StoreError;
use satchel_token::TokenError;

/// Errors that can occur during session management.
///
/// Most of these never reach an end user: the middleware path turns a bad
/// cookie, a missing session or an expired one into a fresh pre-session.
/// Use [`is_server_error`](Self::is_server_error) to decide which of the
/// rest must become a 5xx response.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A session ID or CSRF token failed verification (malformed,
    /// unsupported version, or not authentic).
    #[error("token rejected: {0}")]
    Token(#[from] TokenError),

    /// The session store failed or had nothing under the given ID.
    #[error("session store: {0}")]
    Store(#[from] StoreError),

    /// The stored session's expiration has passed.
    #[error("session expired")]
    Expired,

    /// The operating system's random source failed.
    #[error("random source unavailable: {0}")]
    Entropy(String),

    /// No new session could be stored within the attempt budget.
    #[error("failed to create session: {0}")]
    CreateFailed(#[source] RetryError),

    /// An authentic CSRF token that belongs to a different (or earlier)
    /// session.
    #[error("CSRF token is not bound to this session")]
    CsrfMismatch,

    /// The root key could not be turned into session and CSRF keys.
    #[error("key derivation failed: {0}")]
    KeyDerivation(#[source] TokenError),
}

impl SessionError {
    /// Returns `true` when the request cannot be served safely.
    ///
    /// Creation failures, a broken random source, bad keys and store
    /// outages qualify. Rejected tokens, missing or expired sessions and
    /// CSRF mismatches are the client's problem, not the server's.
    pub fn is_server_error(&self) -> bool {
        match self {
            Self::CreateFailed(_) | Self::Entropy(_) | Self::KeyDerivation(_) => true,
            Self::Store(e) => matches!(
                e,
                StoreError::InvalidData(_) | StoreError::Backend(_)
            ),
            Self::Token(_) | Self::Expired | Self::CsrfMismatch => false,
        }
    }
}
