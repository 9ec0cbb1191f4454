//! The [`TokenCodec`] trait: one implementation per token wire version.
//!
//! Every token starts with a version header (`<version>!`). The
//! [`Authenticator`](crate::Authenticator) reads that header and hands the
//! token to the codec registered for it, so a new format can be added
//! next to the old one without invalidating tokens already in the wild.

use crate::TokenError;

/// Separator between the version identifier and the token body.
pub const VERSION_SEPARATOR: char = '!';

/// A versioned token format bound to a single key.
///
/// - `Send + Sync` → one codec is shared by every request handler.
/// - `'static` → it owns its key material.
pub trait TokenCodec: Send + Sync + 'static {
    /// The version identifier this codec writes and accepts
    /// (the part of the token before [`VERSION_SEPARATOR`]).
    fn version(&self) -> &'static str;

    /// Wraps `payload` in an authenticated token string.
    fn create(&self, payload: &[u8]) -> String;

    /// Checks the token and returns the payload it carries.
    ///
    /// # Errors
    /// - [`TokenError::Malformed`]: the token has the wrong shape
    /// - [`TokenError::UnsupportedVersion`]: the header names another version
    /// - [`TokenError::Invalid`]: the MAC does not match
    fn verify(&self, token: &str) -> Result<Vec<u8>, TokenError>;
}

/// Finds the single occurrence of `sep` in `s`.
///
/// Returns a description of the problem when the separator is missing
/// or appears more than once.
pub(crate) fn unique_index(s: &str, sep: char) -> Result<usize, &'static str> {
    match (s.find(sep), s.rfind(sep)) {
        (Some(first), Some(last)) if first == last => Ok(first),
        (Some(_), Some(_)) => Err("separator not unique"),
        _ => Err("separator not found"),
    }
}

/// Splits off the version header, returning `(version, index of separator)`.
pub(crate) fn version_header(token: &str) -> Result<(&str, usize), TokenError> {
    let i = unique_index(token, VERSION_SEPARATOR).map_err(|reason| {
        TokenError::Malformed(format!("version header: {reason}"))
    })?;
    Ok((&token[..i], i))
}
