//! Error types for the token layer.

/// Errors that can occur while creating authenticators or verifying tokens.
///
/// Callers branch on the variant: a [`Malformed`](Self::Malformed) token
/// never reached MAC comparison, an
/// [`UnsupportedVersion`](Self::UnsupportedVersion) token was well-formed
/// enough to name a version we don't speak, and [`Invalid`](Self::Invalid)
/// means the MAC did not match.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// The token string is structurally invalid: a separator is missing
    /// or repeated, the MAC footer has the wrong length, or a segment is
    /// not valid base64url.
    #[error("malformed token: {0}")]
    Malformed(String),

    /// The version prefix is not one this build can verify.
    #[error("unsupported token version {0:?}")]
    UnsupportedVersion(String),

    /// The token is well-formed but its MAC does not match the payload.
    #[error("token failed authenticity check")]
    Invalid,

    /// The key material could not be used (empty root key, or the
    /// underlying primitive rejected its length).
    #[error("invalid key: {0}")]
    InvalidKey(String),
}

impl TokenError {
    /// Returns `true` if the token was rejected before MAC comparison
    /// because of its shape.
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::Malformed(_))
    }
}
