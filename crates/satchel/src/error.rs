//! Unified error type for Satchel.

use satchel_retry::RetryError;
use satchel_session::SessionError;
use satchel_store::StoreError;
use satchel_token::TokenError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `satchel` meta-crate, you deal with this single error
/// type instead of importing errors from each sub-crate. The `#[from]`
/// attribute on each variant generates the `From` impls, so `?` converts
/// sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum SatchelError {
    /// A token error (malformed, unsupported version, not authentic).
    #[error(transparent)]
    Token(#[from] TokenError),

    /// A retry policy error (misconfigured, aborted, exhausted).
    #[error(transparent)]
    Retry(#[from] RetryError),

    /// A storage error (not found, exists, bad data, backend failure).
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A session-level error (creation failure, expiry, CSRF mismatch).
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl SatchelError {
    /// Returns `true` if the request should fail with a 5xx status.
    pub fn is_server_error(&self) -> bool {
        match self {
            Self::Session(e) => e.is_server_error(),
            Self::Store(e) => matches!(e, StoreError::InvalidData(_) | StoreError::Backend(_)),
            Self::Retry(_) => true,
            Self::Token(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_token_error() {
        let err: SatchelError = TokenError::UnsupportedVersion("v9".into()).into();
        assert!(matches!(err, SatchelError::Token(_)));
        assert!(err.to_string().contains("v9"));
        assert!(!err.is_server_error());
    }

    #[test]
    fn test_from_retry_error() {
        let err: SatchelError = RetryError::Exhausted { attempts: 4 }.into();
        assert!(matches!(err, SatchelError::Retry(_)));
        assert!(err.is_server_error());
    }

    #[test]
    fn test_from_store_error() {
        let err: SatchelError = StoreError::NotFound.into();
        assert!(matches!(err, SatchelError::Store(_)));
        assert!(!err.is_server_error());
    }

    #[test]
    fn test_from_session_error() {
        let err: SatchelError = SessionError::CsrfMismatch.into();
        assert!(matches!(err, SatchelError::Session(_)));
        assert_eq!(err.to_string(), "CSRF token is not bound to this session");
    }
}
