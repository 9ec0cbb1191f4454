//! Session management for Satchel.
//!
//! This crate handles the lifecycle of a browser session:
//!
//! 1. **Resolution**: turning a request's session cookie into a live
//!    [`Session`] ([`SessionManager::manage`])
//! 2. **Creation**: minting authenticated IDs and CSRF tokens and storing
//!    the session, retrying collisions ([`SessionManager::create`])
//! 3. **Replacement**: swapping a session for a fresh pre-session
//!    ([`SessionManager::clear`])
//! 4. **CSRF checks**: binding form tokens to the current session
//!    ([`SessionManager::verify_session_csrf_token`])
//!
//! Every request ends up with a session. Without one (no cookie, a forged
//! cookie, an expired session) the manager creates a *pre-session* with no
//! data, so a CSRF token is always available.
//!
//! # How it fits in the stack
//!
//! ```text
//! Application (above)  ← reads Session::data, checks CSRF tokens
//!     ↕
//! Session Layer (this crate)  ← cookies, lifecycle, retries
//!     ↕
//! Token / Retry / Store Layers (below)
//! ```

mod cookies;
mod error;
mod manager;
mod session;

pub use cookies::{
    Cookie, CookieSink, CookieSource, RequestCookies, ResponseCookies, SameSite,
    strict_cookie,
};
pub use error::SessionError;
pub use manager::{CookieFactory, OnCreate, SessionManager, SessionManagerBuilder};
pub use session::{Session, SessionConfig};
