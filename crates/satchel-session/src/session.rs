//! Session types: the record a browser's cookie points at.
//!
//! A session carries:
//! - WHO it refers to, as an authenticated random ID (`id`)
//! - WHAT the application attached to it (`data`, absent for a pre-session)
//! - WHEN it stops being valid (`expiration`)
//! - the CSRF token bound to it (`csrf_token`)

use std::time::Duration;

use chrono::{DateTime, Utc};
use satchel_retry::Backoff;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Tunable knobs for [`SessionManager`](crate::SessionManager).
///
/// Every field has a default, so a config file only needs the ones it
/// changes:
///
/// ```rust
/// use std::time::Duration;
/// use satchel_session::SessionConfig;
///
/// let config = SessionConfig {
///     cookie_name: "__Host-session".into(),
///     ..SessionConfig::default()
/// };
/// assert_eq!(config.ttl, Duration::from_secs(30 * 60));
/// ```
///
/// There is no session renewal: a session is valid for exactly `ttl`
/// after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// How long a session is valid. Default: 30 minutes.
    pub ttl: Duration,

    /// Random bytes in each session ID and CSRF token, before the MAC and
    /// base64 are added. Default: 16.
    pub id_len: usize,

    /// Name of the session ID cookie. Default: `"session"`.
    pub cookie_name: String,

    /// Extra time the store keeps a session past `ttl`, so storage expiry
    /// never beats logical expiry. Default: 10 minutes.
    pub storage_grace: Duration,

    /// Extra time the cookie lives past `ttl`. Default: 10 minutes.
    pub cookie_grace: Duration,

    /// Attempts at storing a new session before giving up. Default: 4.
    pub create_attempts: u32,

    /// Delay schedule between creation attempts.
    pub backoff: Backoff,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(30 * 60),
            id_len: 16,
            cookie_name: "session".to_string(),
            storage_grace: Duration::from_secs(10 * 60),
            cookie_grace: Duration::from_secs(10 * 60),
            create_attempts: 4,
            backoff: Backoff::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A user session.
///
/// Sessions are values. Once stored they are never changed in place:
/// attaching new data means creating a new session (with a new ID) through
/// [`SessionManager::create`](crate::SessionManager::create).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session<D> {
    /// Authenticated random identifier. Also the store key and the session
    /// cookie's value.
    pub id: String,

    /// Application payload. `None` marks a pre-session.
    pub data: Option<D>,

    /// The instant after which the session is no longer valid.
    pub expiration: DateTime<Utc>,

    /// Authenticated random token bound to this session, for hidden form
    /// fields and similar CSRF defences.
    pub csrf_token: String,
}

impl<D> Session<D> {
    /// Returns `true` if no data is attached yet.
    pub fn is_pre_session(&self) -> bool {
        self.data.is_none()
    }

    /// Returns `true` if the session expired strictly before `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiration < now
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;

    fn session(data: Option<u32>, expiration: DateTime<Utc>) -> Session<u32> {
        Session {
            id: "sid".into(),
            data,
            expiration,
            csrf_token: "csrf".into(),
        }
    }

    #[test]
    fn test_is_pre_session_without_data_true() {
        let now = Utc::now();
        assert!(session(None, now).is_pre_session());
        assert!(!session(Some(1), now).is_pre_session());
    }

    #[test]
    fn test_is_expired_at_boundary_not_expired() {
        let now = Utc::now();
        let s = session(None, now);
        assert!(!s.is_expired_at(now - TimeDelta::seconds(1)));
        assert!(!s.is_expired_at(now));
        assert!(s.is_expired_at(now + TimeDelta::milliseconds(1)));
    }

    #[test]
    fn test_config_partial_json_keeps_defaults() {
        let config: SessionConfig =
            serde_json::from_str(r#"{"cookie_name": "sid", "id_len": 32}"#).unwrap();
        assert_eq!(config.cookie_name, "sid");
        assert_eq!(config.id_len, 32);
        assert_eq!(config.create_attempts, 4);
        assert_eq!(config.backoff, Backoff::default());
    }

    #[test]
    fn test_session_json_shape() {
        let s = session(Some(7), DateTime::<Utc>::UNIX_EPOCH);
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["id"], "sid");
        assert_eq!(json["data"], 7);
        assert_eq!(json["csrf_token"], "csrf");
        assert_eq!(json["expiration"], "1970-01-01T00:00:00Z");
    }
}
