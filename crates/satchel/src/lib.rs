//! # Satchel
//!
//! Server-side web sessions with authenticated session IDs and
//! session-bound CSRF tokens.
//!
//! Every request handled through Satchel ends up with a session: either
//! the one its cookie points at, or a fresh *pre-session* with no data.
//! Logging a user in means creating a new session with data; logging out
//! means [`clear`](SessionManager::clear)ing it.
//!
//! ## Quick Start
//!
//! ```rust
//! use satchel::prelude::*;
//!
//! # tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(async {
//! let manager = SessionManager::<String, _>::new(MemoryStore::new(), b"root secret")?;
//!
//! // First visit: no cookie, so a pre-session and a Set-Cookie.
//! let mut resp = ResponseCookies::new();
//! let session = manager.manage(&RequestCookies::new(), &mut resp).await?;
//! assert!(session.is_pre_session());
//!
//! // Form posts carry the CSRF token back.
//! manager.verify_session_csrf_token(&session.csrf_token, &session)?;
//! # Ok::<(), SatchelError>(())
//! # }).unwrap();
//! ```
//!
//! ## Crates
//!
//! | Module      | Crate             | Provides                              |
//! |-------------|-------------------|---------------------------------------|
//! | [`token`]   | `satchel-token`   | versioned HMAC tokens, key derivation |
//! | [`retry`]   | `satchel-retry`   | jittered exponential backoff          |
//! | [`store`]   | `satchel-store`   | store trait, memory and KV stores     |
//! | [`session`] | `satchel-session` | session manager, cookies, config      |

mod error;

pub use error::SatchelError;
pub use satchel_retry as retry;
pub use satchel_session as session;
pub use satchel_store as store;
pub use satchel_token as token;

use satchel_session::{CookieSink, CookieSource, Session, SessionManager};
use satchel_store::SessionStore;

/// Resolves the request's session, then runs `handler` with it.
///
/// The session is passed to the handler explicitly rather than stashed in
/// an ambient request context. The handler also receives the response so
/// it can replace the session (log in, log out). If no session can be
/// resolved the handler isn't run and the error is returned; check
/// [`SatchelError::is_server_error`] to pick the status code.
///
/// ```rust
/// use satchel::prelude::*;
///
/// # tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(async {
/// let manager = SessionManager::<String, _>::new(MemoryStore::new(), b"root secret")?;
/// let mut resp = ResponseCookies::new();
///
/// let greeting = with_session(&manager, &RequestCookies::new(), &mut resp, async |session, _| {
///     match session.data {
///         Some(user) => format!("welcome back, {user}"),
///         None => "hello, stranger".to_string(),
///     }
/// })
/// .await?;
/// assert_eq!(greeting, "hello, stranger");
/// # Ok::<(), SatchelError>(())
/// # }).unwrap();
/// ```
pub async fn with_session<D, St, F, R>(
    manager: &SessionManager<D, St>,
    req: &dyn CookieSource,
    resp: &mut dyn CookieSink,
    handler: F,
) -> Result<R, SatchelError>
where
    D: Clone + Send + Sync + 'static,
    St: SessionStore<Session<D>>,
    F: AsyncFnOnce(Session<D>, &mut dyn CookieSink) -> R,
{
    let session = manager.manage(req, resp).await.inspect_err(|e| {
        tracing::debug!(error = %e, "no session for request, handler skipped");
    })?;
    Ok(handler(session, resp).await)
}

/// Convenient re-exports for the common case.
pub mod prelude {
    pub use crate::{SatchelError, with_session};
    pub use satchel_retry::{Backoff, RetryError};
    pub use satchel_session::{
        Cookie, CookieSink, CookieSource, RequestCookies, ResponseCookies, SameSite, Session,
        SessionConfig, SessionError, SessionManager, strict_cookie,
    };
    #[cfg(feature = "json")]
    pub use satchel_store::JsonCodec;
    pub use satchel_store::{
        Clock, Codec, KvBackend, KvStore, ManualClock, MemoryStore, SessionStore, StoreError,
        SystemClock,
    };
    pub use satchel_token::{Authenticator, TokenError, TokenKeys};
}
