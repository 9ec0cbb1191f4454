//! Cookie transport between the session manager and an HTTP stack.
//!
//! Satchel doesn't own a web server. It reads the session cookie through
//! [`CookieSource`] and writes cookies through [`CookieSink`]; adapting a
//! framework's request and response types means implementing those two
//! traits. [`RequestCookies`] and [`ResponseCookies`] are ready-made
//! adapters working on raw `Cookie` / `Set-Cookie` header values.
//!
//! Cookies themselves are [`cookie::Cookie`] values, re-exported here
//! together with [`SameSite`].

use chrono::{DateTime, Utc};
pub use cookie::{Cookie, SameSite};
use time::{OffsetDateTime, PrimitiveDateTime};

/// Builds a cookie with strict defaults: `Secure`, `HttpOnly` and
/// `SameSite=Strict`, with no `Domain` or `Path`.
///
/// This is the default cookie factory. Custom factories usually start
/// from it and adjust one attribute:
///
/// ```rust
/// use chrono::{DateTime, TimeZone, Utc};
/// use satchel_session::{Cookie, strict_cookie};
///
/// fn rooted(name: &str, value: &str, expires: DateTime<Utc>) -> Cookie<'static> {
///     let mut cookie = strict_cookie(name, value, expires);
///     cookie.set_path("/");
///     cookie
/// }
///
/// let expires = Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).unwrap();
/// let header = rooted("session", "v0!abc", expires).to_string();
/// assert!(header.starts_with("session=v0!abc;"));
/// assert!(header.contains("; Path=/"));
/// assert!(header.contains("; Expires=Wed, 02 Jan 2030 03:04:05 GMT"));
/// ```
pub fn strict_cookie(name: &str, value: &str, expires: DateTime<Utc>) -> Cookie<'static> {
    Cookie::build((name.to_owned(), value.to_owned()))
        .secure(true)
        .http_only(true)
        .same_site(SameSite::Strict)
        .expires(offset_datetime(expires))
        .build()
}

/// Converts to the time type `cookie` uses, at second precision.
///
/// Instants outside its range clamp to the nearest representable end.
fn offset_datetime(t: DateTime<Utc>) -> OffsetDateTime {
    let secs = t.timestamp();
    OffsetDateTime::from_unix_timestamp(secs).unwrap_or(if secs < 0 {
        PrimitiveDateTime::MIN.assume_utc()
    } else {
        PrimitiveDateTime::MAX.assume_utc()
    })
}

// ---------------------------------------------------------------------------
// Transport traits
// ---------------------------------------------------------------------------

/// Read access to the cookies of an inbound request.
pub trait CookieSource: Sync {
    /// Returns the value of the first cookie called `name`.
    fn cookie(&self, name: &str) -> Option<&str>;
}

/// Write access to the cookies of an outbound response.
pub trait CookieSink: Send {
    /// Adds a `Set-Cookie` directive to the response.
    fn set_cookie(&mut self, cookie: Cookie<'static>);
}

// ---------------------------------------------------------------------------
// RequestCookies
// ---------------------------------------------------------------------------

/// Cookies parsed from a request's `Cookie` header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestCookies {
    cookies: Vec<Cookie<'static>>,
}

impl RequestCookies {
    /// A request with no cookies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a `Cookie` header value such as `"a=1; b=2"`.
    ///
    /// Entries that don't parse as `name=value` are skipped.
    pub fn parse(header: &str) -> Self {
        let cookies = Cookie::split_parse(header.to_owned())
            .filter_map(Result::ok)
            .collect();
        Self { cookies }
    }

    /// Adds a cookie, returning `self` for chaining.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.push(Cookie::new(name.into(), value.into()));
        self
    }

    /// Number of cookies, duplicates included.
    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    /// Returns `true` if the request carried no cookies.
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }
}

impl CookieSource for RequestCookies {
    /// Values wrapped in double quotes are returned unquoted.
    fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|c| c.name() == name)
            .map(|c| c.value_trimmed())
    }
}

// ---------------------------------------------------------------------------
// ResponseCookies
// ---------------------------------------------------------------------------

/// Cookies collected for a response, in the order they were set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseCookies {
    cookies: Vec<Cookie<'static>>,
}

impl ResponseCookies {
    /// A response with no cookies.
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recently set cookie called `name`.
    pub fn get(&self, name: &str) -> Option<&Cookie<'static>> {
        self.cookies.iter().rev().find(|c| c.name() == name)
    }

    /// All cookies, in the order they were set.
    pub fn iter(&self) -> impl Iterator<Item = &Cookie<'static>> {
        self.cookies.iter()
    }

    /// One rendered `Set-Cookie` header value per cookie.
    pub fn header_values(&self) -> Vec<String> {
        self.cookies.iter().map(Cookie::to_string).collect()
    }

    /// Number of `Set-Cookie` directives.
    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    /// Returns `true` if nothing was set.
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }
}

impl CookieSink for ResponseCookies {
    fn set_cookie(&mut self, cookie: Cookie<'static>) {
        self.cookies.push(cookie);
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    // =====================================================================
    // strict_cookie()
    // =====================================================================

    #[test]
    fn test_strict_cookie_sets_strict_attributes() {
        let expires = Utc.with_ymd_and_hms(2024, 2, 29, 23, 59, 0).unwrap();
        let c = strict_cookie("n", "v", expires);

        assert_eq!((c.name(), c.value()), ("n", "v"));
        assert_eq!(c.secure(), Some(true));
        assert_eq!(c.http_only(), Some(true));
        assert_eq!(c.same_site(), Some(SameSite::Strict));
        assert_eq!(
            c.expires_datetime().map(|t| t.unix_timestamp()),
            Some(expires.timestamp())
        );
        assert!(c.path().is_none() && c.domain().is_none());
    }

    #[test]
    fn test_strict_cookie_renders_set_cookie_value() {
        let expires = Utc.with_ymd_and_hms(2024, 2, 29, 23, 59, 0).unwrap();
        let header = strict_cookie("sid", "v0!x.y=", expires).to_string();

        assert!(header.starts_with("sid=v0!x.y=;"), "{header}");
        for attr in [
            "; HttpOnly",
            "; Secure",
            "; SameSite=Strict",
            "; Expires=Thu, 29 Feb 2024 23:59:00 GMT",
        ] {
            assert!(header.contains(attr), "{header} lacks {attr}");
        }
    }

    #[test]
    fn test_offset_datetime_out_of_range_clamps() {
        let far = offset_datetime(DateTime::<Utc>::MAX_UTC);
        assert_eq!(far, PrimitiveDateTime::MAX.assume_utc());

        let past = offset_datetime(DateTime::<Utc>::MIN_UTC);
        assert_eq!(past, PrimitiveDateTime::MIN.assume_utc());
    }

    // =====================================================================
    // RequestCookies
    // =====================================================================

    #[test]
    fn test_parse_multiple_cookies_finds_each() {
        let req = RequestCookies::parse("a=1; session=v0!x.y=; b = 2");
        assert_eq!(req.cookie("a"), Some("1"));
        assert_eq!(req.cookie("session"), Some("v0!x.y="));
        assert_eq!(req.cookie("b"), Some("2"));
        assert_eq!(req.cookie("missing"), None);
    }

    #[test]
    fn test_parse_skips_malformed_entries() {
        let req = RequestCookies::parse("novalue; =orphan; ok=1");
        assert_eq!(req.len(), 1);
        assert_eq!(req.cookie("ok"), Some("1"));
    }

    #[test]
    fn test_parse_unquotes_values() {
        let req = RequestCookies::parse(r#"q="quoted""#);
        assert_eq!(req.cookie("q"), Some("quoted"));
    }

    #[test]
    fn test_cookie_duplicate_names_first_wins() {
        let req = RequestCookies::new().with("a", "first").with("a", "second");
        assert_eq!(req.cookie("a"), Some("first"));
    }

    #[test]
    fn test_parse_empty_header_is_empty() {
        assert!(RequestCookies::parse("").is_empty());
    }

    // =====================================================================
    // ResponseCookies
    // =====================================================================

    #[test]
    fn test_response_get_returns_latest() {
        let mut resp = ResponseCookies::new();
        resp.set_cookie(Cookie::new("a", "1"));
        resp.set_cookie(Cookie::new("b", "2"));
        resp.set_cookie(Cookie::new("a", "3"));

        assert_eq!(resp.len(), 3);
        assert_eq!(resp.get("a").map(|c| c.value()), Some("3"));
        assert_eq!(resp.header_values(), ["a=1", "b=2", "a=3"]);
    }
}
