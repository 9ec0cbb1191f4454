//! Role-separated keys derived from one root secret.
//!
//! Session IDs and CSRF tokens are authenticated with different keys so
//! that a token minted for one role never verifies in the other. Both keys
//! come from HKDF-SHA256 over the application's root secret, each expanded
//! with its own context string.

use hkdf::Hkdf;
use sha2::Sha256;

use crate::{Authenticator, TokenError};

/// HKDF context for the key that authenticates session IDs.
pub const SESSION_TOKEN_INFO: &str = "session-token";

/// HKDF context for the key that authenticates CSRF tokens.
pub const CSRF_TOKEN_INFO: &str = "csrf-token";

/// Length of every derived key, in bytes.
pub const DERIVED_KEY_LEN: usize = 32;

/// Derives a single 32-byte key from `root` for the given context.
///
/// HKDF-Extract runs without a salt; the `info` string alone separates
/// the outputs.
///
/// # Errors
/// Returns [`TokenError::InvalidKey`] if `root` is empty.
pub fn derive_key(
    root: &[u8],
    info: &str,
) -> Result<[u8; DERIVED_KEY_LEN], TokenError> {
    if root.is_empty() {
        return Err(TokenError::InvalidKey("root key is empty".into()));
    }
    let hk = Hkdf::<Sha256>::new(None, root);
    let mut okm = [0u8; DERIVED_KEY_LEN];
    hk.expand(info.as_bytes(), &mut okm)
        .map_err(|e| TokenError::InvalidKey(e.to_string()))?;
    Ok(okm)
}

/// The pair of authenticators a session manager needs.
#[derive(Debug, Clone)]
pub struct TokenKeys {
    session: Authenticator,
    csrf: Authenticator,
}

impl TokenKeys {
    /// Derives the session-ID and CSRF authenticators from `root`.
    ///
    /// # Errors
    /// Returns [`TokenError::InvalidKey`] if `root` is empty.
    pub fn derive(root: impl AsRef<[u8]>) -> Result<Self, TokenError> {
        let root = root.as_ref();
        Ok(Self {
            session: Authenticator::new(derive_key(root, SESSION_TOKEN_INFO)?)?,
            csrf: Authenticator::new(derive_key(root, CSRF_TOKEN_INFO)?)?,
        })
    }

    /// Authenticator for session ID tokens.
    pub fn session(&self) -> &Authenticator {
        &self.session
    }

    /// Authenticator for CSRF tokens.
    pub fn csrf(&self) -> &Authenticator {
        &self.csrf
    }
}
