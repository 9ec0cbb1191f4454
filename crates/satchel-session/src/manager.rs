//! The session manager: creates, finds and replaces sessions.
//!
//! This is the central piece of the session layer. It's responsible for:
//! - Minting session IDs and CSRF tokens (random bytes, authenticated)
//! - Storing new sessions, retrying ID collisions and transient failures
//! - Resolving a request's session cookie to a live session
//! - Falling back to a pre-session whenever that fails
//! - Checking that a CSRF token belongs to the current session
//!
//! # Concurrency note
//!
//! `SessionManager` holds no mutable state of its own. One instance (behind
//! an `Arc` or a `&'static`) serves every request concurrently; ID
//! collisions between concurrent creators are settled by the store's
//! create-only `set`.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::TryRngCore;
use rand::rngs::OsRng;
use satchel_retry::RetryControl;
use satchel_store::{Clock, SessionStore, StoreError, SystemClock, after};
use satchel_token::TokenKeys;
use tracing::{debug, error, info, warn};

use crate::cookies::{Cookie, CookieSink, CookieSource, strict_cookie};
use crate::{Session, SessionConfig, SessionError};

/// Builds the session ID cookie from its name, value and expiry.
pub type CookieFactory =
    Arc<dyn Fn(&str, &str, DateTime<Utc>) -> Cookie<'static> + Send + Sync>;

/// Runs after a session is created, with the response and the new session.
pub type OnCreate<D> = Arc<dyn Fn(&mut dyn CookieSink, &Session<D>) + Send + Sync>;

// ---------------------------------------------------------------------------
// SessionManager
// ---------------------------------------------------------------------------

/// Manages sessions with data of type `D`, kept in store `St`.
///
/// ## Request lifecycle
///
/// ```text
///   cookie? ──no──────────────────────────────┐
///     │yes                                    │
///     ▼                                       ▼
///   verify ──fails (warn)──────────────→ create(None) ──→ pre-session
///     │ok                                     ▲           + Set-Cookie
///     ▼                                       │
///   lookup ──missing / expired (debug)────────┘
///     │found
///     ▼
///   existing session (no Set-Cookie)
/// ```
///
/// ## Example
///
/// ```rust
/// use satchel_session::{RequestCookies, ResponseCookies, SessionManager};
/// use satchel_store::MemoryStore;
///
/// # tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(async {
/// let manager = SessionManager::<String, _>::new(MemoryStore::new(), b"root secret").unwrap();
///
/// let mut resp = ResponseCookies::new();
/// let session = manager.manage(&RequestCookies::new(), &mut resp).await.unwrap();
/// assert!(session.is_pre_session());
/// assert_eq!(resp.get("session").unwrap().value(), session.id);
/// # });
/// ```
pub struct SessionManager<D, St> {
    store: St,
    keys: TokenKeys,
    config: SessionConfig,
    clock: Arc<dyn Clock>,
    create_cookie: CookieFactory,
    on_create: Option<OnCreate<D>>,
}

impl<D, St> SessionManager<D, St>
where
    D: Clone + Send + Sync + 'static,
    St: SessionStore<Session<D>>,
{
    /// Creates a manager with the default configuration.
    ///
    /// # Errors
    /// Returns [`SessionError::KeyDerivation`] if `root_key` is empty.
    pub fn new(store: St, root_key: impl AsRef<[u8]>) -> Result<Self, SessionError> {
        Self::builder(store, root_key).build()
    }

    /// Starts a builder for options that can't live in [`SessionConfig`].
    pub fn builder(store: St, root_key: impl AsRef<[u8]>) -> SessionManagerBuilder<D, St> {
        SessionManagerBuilder::new(store, root_key)
    }

    /// The active configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The backing store.
    pub fn store(&self) -> &St {
        &self.store
    }

    // -- Lifecycle --------------------------------------------------------

    /// Fetches the session stored under `id` if it hasn't expired.
    ///
    /// # Errors
    /// - [`SessionError::Store`]: the store had nothing (or failed)
    /// - [`SessionError::Expired`]: found, but past its expiration
    pub async fn lookup(&self, id: &str) -> Result<Session<D>, SessionError> {
        let session = self.store.get(id).await?;
        if session.is_expired_at(self.clock.now()) {
            return Err(SessionError::Expired);
        }
        Ok(session)
    }

    /// Creates and stores a new session carrying `data`, then sets the
    /// session cookie on `resp`.
    ///
    /// Passing `None` creates a pre-session. Storing is retried on ID
    /// collisions and transient store failures; a value the store can't
    /// encode stops the retries at once. The session cookie is written
    /// before the post-create hook runs.
    ///
    /// # Errors
    /// Returns [`SessionError::CreateFailed`] if no attempt succeeded.
    pub async fn create(
        &self,
        resp: &mut dyn CookieSink,
        data: Option<D>,
    ) -> Result<Session<D>, SessionError> {
        let session = self
            .config
            .backoff
            .run(self.config.create_attempts, |ctl| {
                let data = data.clone();
                async move { self.try_create(data, ctl).await }
            })
            .await
            .map_err(SessionError::CreateFailed)?;

        let cookie_expires = after(
            self.clock.now(),
            self.config.ttl.saturating_add(self.config.cookie_grace),
        );
        resp.set_cookie((self.create_cookie)(
            self.config.cookie_name.as_str(),
            session.id.as_str(),
            cookie_expires,
        ));
        if let Some(hook) = &self.on_create {
            hook(resp, &session);
        }

        info!(
            expires = %session.expiration,
            pre_session = session.is_pre_session(),
            "session created"
        );
        Ok(session)
    }

    /// Replaces session `id` with a fresh pre-session, then deletes `id`.
    ///
    /// Deleting is best effort: a session that's already gone is fine, and
    /// any other failure is logged without failing the call.
    ///
    /// # Errors
    /// Returns [`SessionError::CreateFailed`] if the pre-session couldn't
    /// be created; `id` is left untouched in that case.
    pub async fn clear(
        &self,
        resp: &mut dyn CookieSink,
        id: &str,
    ) -> Result<Session<D>, SessionError> {
        let fresh = self.create(resp, None).await?;
        match self.store.del(id).await {
            Ok(()) | Err(StoreError::NotFound) => {}
            Err(e) => error!(sid = id, error = %e, "failed to delete cleared session"),
        }
        Ok(fresh)
    }

    /// Resolves the session for a request, creating a pre-session if the
    /// request has none.
    ///
    /// A missing cookie, a cookie that fails verification, and a cookie
    /// whose session is gone or expired all end the same way: a new
    /// pre-session and a new session cookie on `resp`. A request with a
    /// live session gets it back and `resp` is left alone.
    ///
    /// # Errors
    /// Returns [`SessionError::CreateFailed`] (a server error) if the
    /// pre-session couldn't be created.
    pub async fn manage(
        &self,
        req: &dyn CookieSource,
        resp: &mut dyn CookieSink,
    ) -> Result<Session<D>, SessionError> {
        if let Some(sid) = self.session_cookie(req) {
            match self.lookup(sid).await {
                Ok(session) => return Ok(session),
                Err(e) => debug!(sid, error = %e, "session lookup failed"),
            }
        }

        self.create(resp, None).await.inspect_err(|e| {
            error!(error = %e, "failed to create pre-session");
        })
    }

    /// Checks that `token` is an authentic CSRF token bound to `session`.
    ///
    /// # Errors
    /// - [`SessionError::Token`]: `token` isn't an authentic CSRF token
    /// - [`SessionError::CsrfMismatch`]: authentic, but bound to another
    ///   (or an earlier) session
    pub fn verify_session_csrf_token(
        &self,
        token: &str,
        session: &Session<D>,
    ) -> Result<(), SessionError> {
        self.keys.csrf().verify(token)?;
        if token != session.csrf_token {
            return Err(SessionError::CsrfMismatch);
        }
        Ok(())
    }

    // -- Internals --------------------------------------------------------

    /// The request's verified session ID, if it sent one.
    fn session_cookie<'r>(&self, req: &'r dyn CookieSource) -> Option<&'r str> {
        let sid = req.cookie(&self.config.cookie_name)?;
        match self.keys.session().verify(sid) {
            Ok(_) => Some(sid),
            Err(e) => {
                warn!(error = %e, "rejected session cookie");
                None
            }
        }
    }

    /// One creation attempt, reporting its outcome through `ctl`.
    async fn try_create(&self, data: Option<D>, ctl: RetryControl<Session<D>>) {
        let (id, csrf_token) = match self.mint() {
            Ok(tokens) => tokens,
            Err(e) => {
                error!(error = %e, "failed to generate session tokens");
                return;
            }
        };
        let session = Session {
            id,
            data,
            expiration: after(self.clock.now(), self.config.ttl),
            csrf_token,
        };
        let storage_ttl = self.config.ttl.saturating_add(self.config.storage_grace);

        let stored = self.store.set(&session.id, &session, storage_ttl).await;
        match stored {
            Ok(()) => ctl.done(session),
            Err(StoreError::Exists) => debug!("session ID collision, retrying"),
            Err(e @ StoreError::InvalidData(_)) => {
                error!(error = %e, "session data cannot be stored");
                ctl.abort();
            }
            Err(e) => error!(error = %e, "failed to store new session"),
        }
    }

    /// A fresh (session ID, CSRF token) pair.
    fn mint(&self) -> Result<(String, String), SessionError> {
        let id = self.keys.session().create(&self.random_bytes()?);
        let csrf = self.keys.csrf().create(&self.random_bytes()?);
        Ok((id, csrf))
    }

    fn random_bytes(&self) -> Result<Vec<u8>, SessionError> {
        let mut buf = vec![0u8; self.config.id_len];
        OsRng
            .try_fill_bytes(&mut buf)
            .map_err(|e| SessionError::Entropy(e.to_string()))?;
        Ok(buf)
    }
}

impl<D, St: fmt::Debug> fmt::Debug for SessionManager<D, St> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("store", &self.store)
            .field("config", &self.config)
            .field("on_create", &self.on_create.is_some())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// SessionManagerBuilder
// ---------------------------------------------------------------------------

/// Configures a [`SessionManager`].
///
/// ```rust
/// use std::time::Duration;
/// use satchel_session::{SessionConfig, SessionManager, strict_cookie};
/// use satchel_store::{ManualClock, MemoryStore};
///
/// let clock = ManualClock::starting_now();
/// let manager = SessionManager::<u64, _>::builder(
///     MemoryStore::with_clock(clock.clone()),
///     b"root secret",
/// )
/// .config(SessionConfig {
///     ttl: Duration::from_secs(3600),
///     ..SessionConfig::default()
/// })
/// .clock(clock)
/// .create_cookie(|name, value, expires| {
///     let mut cookie = strict_cookie(name, value, expires);
///     cookie.set_path("/");
///     cookie
/// })
/// .build()
/// .unwrap();
/// # assert_eq!(manager.config().ttl, Duration::from_secs(3600));
/// ```
pub struct SessionManagerBuilder<D, St> {
    store: St,
    root_key: Vec<u8>,
    config: SessionConfig,
    clock: Arc<dyn Clock>,
    create_cookie: CookieFactory,
    on_create: Option<OnCreate<D>>,
}

impl<D, St> SessionManagerBuilder<D, St>
where
    D: Clone + Send + Sync + 'static,
    St: SessionStore<Session<D>>,
{
    fn new(store: St, root_key: impl AsRef<[u8]>) -> Self {
        Self {
            store,
            root_key: root_key.as_ref().to_vec(),
            config: SessionConfig::default(),
            clock: Arc::new(SystemClock),
            create_cookie: Arc::new(strict_cookie),
            on_create: None,
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Reads time from `clock` instead of the wall clock.
    pub fn clock(mut self, clock: impl Clock) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Builds the session cookie with `factory` instead of
    /// [`strict_cookie`].
    pub fn create_cookie<F>(mut self, factory: F) -> Self
    where
        F: Fn(&str, &str, DateTime<Utc>) -> Cookie<'static> + Send + Sync + 'static,
    {
        self.create_cookie = Arc::new(factory);
        self
    }

    /// Runs `hook` after every successful creation, once the session
    /// cookie has been set. A common use is a readable CSRF cookie.
    pub fn on_create<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut dyn CookieSink, &Session<D>) + Send + Sync + 'static,
    {
        self.on_create = Some(Arc::new(hook));
        self
    }

    /// Derives the session and CSRF keys and builds the manager.
    ///
    /// # Errors
    /// Returns [`SessionError::KeyDerivation`] if the root key is empty.
    pub fn build(self) -> Result<SessionManager<D, St>, SessionError> {
        let keys = TokenKeys::derive(&self.root_key).map_err(SessionError::KeyDerivation)?;
        Ok(SessionManager {
            store: self.store,
            keys,
            config: self.config,
            clock: self.clock,
            create_cookie: self.create_cookie,
            on_create: self.on_create,
        })
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for the manager's internals. Request-level scenarios
    //! live in `tests/manager.rs`.

    use satchel_store::MemoryStore;

    use super::*;

    type Manager = SessionManager<String, MemoryStore<Session<String>>>;

    fn manager(config: SessionConfig) -> Manager {
        SessionManager::builder(MemoryStore::new(), b"unit test key")
            .config(config)
            .build()
            .unwrap()
    }

    #[test]
    fn test_build_empty_key_fails() {
        let result = Manager::new(MemoryStore::new(), b"");
        assert!(matches!(result, Err(SessionError::KeyDerivation(_))));
    }

    #[test]
    fn test_mint_tokens_verify_under_their_own_role_only() {
        let m = manager(SessionConfig::default());
        let (id, csrf) = m.mint().unwrap();

        assert_eq!(m.keys.session().verify(&id).unwrap().len(), 16);
        assert_eq!(m.keys.csrf().verify(&csrf).unwrap().len(), 16);
        assert!(m.keys.session().verify(&csrf).is_err());
        assert!(m.keys.csrf().verify(&id).is_err());
    }

    #[test]
    fn test_mint_respects_id_len() {
        let m = manager(SessionConfig {
            id_len: 32,
            ..SessionConfig::default()
        });
        let (id, _) = m.mint().unwrap();
        assert_eq!(m.keys.session().verify(&id).unwrap().len(), 32);
    }

    #[test]
    fn test_mint_twice_differs() {
        let m = manager(SessionConfig::default());
        assert_ne!(m.mint().unwrap(), m.mint().unwrap());
    }

    #[test]
    fn test_session_cookie_unverifiable_is_none() {
        let m = manager(SessionConfig::default());
        let req = crate::RequestCookies::new().with("session", "v0!Zm9v.bm9wZQ==");
        assert!(m.session_cookie(&req).is_none());
    }

    #[test]
    fn test_debug_hides_keys() {
        let m = manager(SessionConfig::default());
        let dbg = format!("{m:?}");
        assert!(dbg.starts_with("SessionManager {"));
        assert!(!dbg.contains("keys"));
    }
}
