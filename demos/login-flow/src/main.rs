use satchel::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

// ---------------------------------------------------------------------------
// Application types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
struct User {
    name: String,
}

type Manager = SessionManager<User, MemoryStore<Session<User>>>;

/// A form post: the CSRF token from a hidden field plus a user name.
struct LoginForm<'a> {
    csrf_token: &'a str,
    name: &'a str,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn home(m: &Manager, req: &RequestCookies) -> Result<(String, ResponseCookies), SatchelError> {
    let mut resp = ResponseCookies::new();
    let body = with_session(m, req, &mut resp, async |session, _| {
        match session.data {
            Some(user) => format!("welcome back, {}", user.name),
            None => format!("hello, stranger (csrf {})", session.csrf_token),
        }
    })
    .await?;
    Ok((body, resp))
}

async fn login(
    m: &Manager,
    req: &RequestCookies,
    form: LoginForm<'_>,
) -> Result<(Session<User>, ResponseCookies), SatchelError> {
    let mut resp = ResponseCookies::new();
    let session = with_session(m, req, &mut resp, async |session, resp| {
        m.verify_session_csrf_token(form.csrf_token, &session)?;
        let user = User {
            name: form.name.to_string(),
        };
        m.create(resp, Some(user)).await
    })
    .await??;
    Ok((session, resp))
}

async fn logout(m: &Manager, req: &RequestCookies) -> Result<ResponseCookies, SatchelError> {
    let mut resp = ResponseCookies::new();
    with_session(m, req, &mut resp, async |session, resp| {
        m.clear(resp, &session.id).await
    })
    .await??;
    Ok(resp)
}

/// The `Cookie` header a browser would send after `resp`.
fn browser_after(resp: &ResponseCookies) -> RequestCookies {
    let header = resp
        .iter()
        .map(|c| c.stripped().to_string())
        .collect::<Vec<_>>()
        .join("; ");
    RequestCookies::parse(&header)
}

fn print_set_cookies(step: &str, resp: &ResponseCookies) {
    for value in resp.header_values() {
        println!("[{step}] Set-Cookie: {value}");
    }
}

// ---------------------------------------------------------------------------
// Walkthrough
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,satchel_session=debug")),
        )
        .init();

    let root_key = std::env::var("SATCHEL_ROOT_KEY")
        .unwrap_or_else(|_| "demo root key, do not use in production".to_string());
    let manager: Manager = SessionManager::builder(MemoryStore::new(), root_key)
        .on_create(|resp: &mut dyn CookieSink, session: &Session<User>| {
            // Readable by page scripts that attach it to fetch() calls.
            let mut csrf = strict_cookie("csrf", &session.csrf_token, session.expiration);
            csrf.set_http_only(false);
            resp.set_cookie(csrf);
        })
        .build()?;

    // 1. First visit: no cookie, so a pre-session is created.
    let (body, resp) = home(&manager, &RequestCookies::new()).await?;
    println!("[visit] {body}");
    print_set_cookies("visit", &resp);
    let browser = browser_after(&resp);
    let csrf = browser.cookie("csrf").unwrap_or_default().to_string();

    // 2. A forged login form is rejected.
    let forged = LoginForm {
        csrf_token: "v0!.bm90IGEgcmVhbCB0b2tlbiBhdCBhbGwsIHNvcnJ5IQ==",
        name: "mallory",
    };
    match login(&manager, &browser, forged).await {
        Ok(_) => println!("[forged] unexpectedly accepted"),
        Err(e) => println!("[forged] rejected: {e}"),
    }

    // 3. The real form logs in, replacing the pre-session.
    let form = LoginForm {
        csrf_token: &csrf,
        name: "alice",
    };
    let (session, resp) = login(&manager, &browser, form).await?;
    info!(pre_session = session.is_pre_session(), "logged in");
    print_set_cookies("login", &resp);
    let browser = browser_after(&resp);

    // 4. Revisit: same session, no Set-Cookie.
    let (body, resp) = home(&manager, &browser).await?;
    println!("[revisit] {body} ({} Set-Cookie)", resp.len());

    // 5. Log out: back to a pre-session.
    let resp = logout(&manager, &browser).await?;
    print_set_cookies("logout", &resp);
    let (body, _) = home(&manager, &browser_after(&resp)).await?;
    println!("[after logout] {body}");

    println!("{} session(s) in the store", manager.store().len());
    Ok(())
}
