//! The [`Authenticator`]: version dispatch in front of the token codecs.

use crate::codec::{TokenCodec, version_header};
use crate::v0::{self, V0Codec};
use crate::TokenError;

/// Creates and verifies authenticated tokens with a single key.
///
/// New tokens are always written in the current format (`v0`). Verification
/// reads the version header and routes the token to the codec that speaks
/// it; any other version is rejected with
/// [`TokenError::UnsupportedVersion`].
///
/// # Example
///
/// ```rust
/// use satchel_token::Authenticator;
///
/// let auth = Authenticator::new(b"0123456789abcdef0123456789abcdef").unwrap();
/// let token = auth.create(b"user-42");
/// assert!(token.starts_with("v0!"));
/// assert_eq!(auth.verify(&token).unwrap(), b"user-42");
/// ```
#[derive(Debug, Clone)]
pub struct Authenticator {
    v0: V0Codec,
}

impl Authenticator {
    /// Creates an authenticator keyed with `key`.
    ///
    /// # Errors
    /// Returns [`TokenError::InvalidKey`] if the MAC rejects the key.
    pub fn new(key: impl AsRef<[u8]>) -> Result<Self, TokenError> {
        Ok(Self {
            v0: V0Codec::new(key.as_ref())?,
        })
    }

    /// Returns the version identifier used for newly created tokens.
    pub fn current_version(&self) -> &'static str {
        self.v0.version()
    }

    /// Returns an authenticated token carrying `payload`.
    pub fn create(&self, payload: &[u8]) -> String {
        self.v0.create(payload)
    }

    /// Verifies `token` and returns its payload.
    ///
    /// # Errors
    /// - [`TokenError::Malformed`]: no unique version header, or the
    ///   selected codec found a structural defect
    /// - [`TokenError::UnsupportedVersion`]: no codec for the version
    /// - [`TokenError::Invalid`]: MAC mismatch
    pub fn verify(&self, token: &str) -> Result<Vec<u8>, TokenError> {
        let (version, _) = version_header(token)?;
        match version {
            v0::VERSION => self.v0.verify(token),
            other => {
                tracing::trace!(version = other, "token version not supported");
                Err(TokenError::UnsupportedVersion(other.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth() -> Authenticator {
        Authenticator::new([7u8; 32]).unwrap()
    }

    #[test]
    fn test_create_uses_current_version() {
        let a = auth();
        assert_eq!(a.current_version(), "v0");
        assert!(a.create(b"x").starts_with("v0!"));
    }

    #[test]
    fn test_verify_round_trips_payload() {
        let a = auth();
        let token = a.create(&[0, 1, 2, 254, 255]);
        assert_eq!(a.verify(&token).unwrap(), vec![0, 1, 2, 254, 255]);
    }

    #[test]
    fn test_verify_unknown_version_returns_unsupported() {
        let a = auth();
        let token = a.create(b"x").replacen("v0!", "v1!", 1);
        assert!(matches!(
            a.verify(&token),
            Err(TokenError::UnsupportedVersion(v)) if v == "v1"
        ));
    }

    #[test]
    fn test_verify_missing_header_returns_malformed() {
        assert!(auth().verify("nope").unwrap_err().is_structural());
    }

    #[test]
    fn test_verify_empty_string_returns_malformed() {
        assert!(auth().verify("").unwrap_err().is_structural());
    }
}
