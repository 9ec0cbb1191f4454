//! Version `v0` tokens: HMAC-SHA256 over a base64url payload.
//!
//! ```text
//! v0!<base64url(payload)>.<base64url(HMAC-SHA256(key, message))>
//! [<------------ message ----------->]
//! ```
//!
//! The MAC covers the version header as well as the payload, so a `v0`
//! MAC can never be replayed under another version's header.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::codec::{TokenCodec, VERSION_SEPARATOR, unique_index, version_header};
use crate::TokenError;

type HmacSha256 = Hmac<Sha256>;

/// Version identifier written in front of every `v0` token.
pub const VERSION: &str = "v0";

const MAC_SEPARATOR: char = '.';

/// Length of a padded base64url encoding of a 32-byte MAC.
const ENCODED_MAC_LEN: usize = 44;

/// [`TokenCodec`] for the `v0` format.
///
/// Holds a keyed HMAC state that is cloned for every token, so the key
/// schedule runs once per codec rather than once per request.
#[derive(Clone)]
pub struct V0Codec {
    mac: HmacSha256,
}

impl V0Codec {
    /// Creates a codec that authenticates tokens with `key`.
    ///
    /// # Errors
    /// Returns [`TokenError::InvalidKey`] if HMAC rejects the key.
    pub fn new(key: &[u8]) -> Result<Self, TokenError> {
        let mac = HmacSha256::new_from_slice(key)
            .map_err(|e| TokenError::InvalidKey(e.to_string()))?;
        Ok(Self { mac })
    }

    fn sign(&self, message: &str) -> [u8; 32] {
        let mut mac = self.mac.clone();
        mac.update(message.as_bytes());
        let mut out = [0u8; 32];
        out.copy_from_slice(&mac.finalize().into_bytes());
        out
    }
}

impl std::fmt::Debug for V0Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("V0Codec").finish_non_exhaustive()
    }
}

impl TokenCodec for V0Codec {
    fn version(&self) -> &'static str {
        VERSION
    }

    fn create(&self, payload: &[u8]) -> String {
        let message =
            format!("{VERSION}{VERSION_SEPARATOR}{}", URL_SAFE.encode(payload));
        let mac = URL_SAFE.encode(self.sign(&message));
        format!("{message}{MAC_SEPARATOR}{mac}")
    }

    fn verify(&self, token: &str) -> Result<Vec<u8>, TokenError> {
        let (version, i) = version_header(token)?;
        if version != VERSION {
            return Err(TokenError::UnsupportedVersion(version.to_string()));
        }

        let j = unique_index(token, MAC_SEPARATOR).map_err(|reason| {
            TokenError::Malformed(format!("MAC footer: {reason}"))
        })?;
        if token.len() - j != ENCODED_MAC_LEN + 1 {
            return Err(TokenError::Malformed(
                "incorrect MAC footer length".into(),
            ));
        }

        let mac = URL_SAFE.decode(&token[j + 1..]).map_err(|e| {
            TokenError::Malformed(format!("MAC footer: {e}"))
        })?;

        // Unequal lengths compare as not-equal.
        let expected = self.sign(&token[..j]);
        if !bool::from(expected.as_slice().ct_eq(&mac)) {
            return Err(TokenError::Invalid);
        }

        URL_SAFE.decode(&token[i + 1..j]).map_err(|e| {
            TokenError::Malformed(format!("payload segment: {e}"))
        })
    }
}
