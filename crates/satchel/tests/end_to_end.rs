//! End-to-end flows through the meta crate: a browser-like cookie round
//! trip against a JSON key-value store.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use satchel::prelude::*;
use serde::{Deserialize, Serialize};

// =========================================================================
// Fake key-value backend
// =========================================================================

#[derive(Debug, thiserror::Error)]
#[error("kv backend unreachable")]
struct Unreachable;

#[derive(Debug, Clone, Default)]
struct FakeKv {
    data: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    down: Arc<AtomicBool>,
}

impl FakeKv {
    fn check(&self) -> Result<(), Unreachable> {
        if self.down.load(Ordering::SeqCst) {
            return Err(Unreachable);
        }
        Ok(())
    }

    fn raw(&self, key: &str) -> Option<Vec<u8>> {
        self.data.lock().get(key).cloned()
    }

    fn overwrite(&self, key: &str, value: &[u8]) {
        self.data.lock().insert(key.to_string(), value.to_vec());
    }
}

impl KvBackend for FakeKv {
    type Error = Unreachable;

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Unreachable> {
        self.check()?;
        Ok(self.raw(key))
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: Vec<u8>,
        _ttl: Duration,
    ) -> Result<bool, Unreachable> {
        self.check()?;
        let mut data = self.data.lock();
        if data.contains_key(key) {
            return Ok(false);
        }
        data.insert(key.to_string(), value);
        Ok(true)
    }

    async fn delete(&self, key: &str) -> Result<u64, Unreachable> {
        self.check()?;
        Ok(u64::from(self.data.lock().remove(key).is_some()))
    }
}

// =========================================================================
// Fixtures
// =========================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Greeting {
    greeting: String,
}

fn hola() -> Greeting {
    Greeting {
        greeting: "hola".into(),
    }
}

type Manager = SessionManager<Greeting, KvStore<FakeKv, JsonCodec>>;

fn setup() -> (Manager, FakeKv) {
    let kv = FakeKv::default();
    let manager = SessionManager::new(KvStore::json(kv.clone(), "sess"), b"e2e root key").unwrap();
    (manager, kv)
}

/// What a browser sends back after receiving `resp`.
fn next_request(resp: &ResponseCookies) -> RequestCookies {
    resp.iter()
        .fold(RequestCookies::new(), |req, c| req.with(c.name(), c.value()))
}

// =========================================================================
// Flows
// =========================================================================

#[tokio::test]
async fn test_login_flow_pre_session_then_hola_then_logout() {
    let (m, kv) = setup();

    // First visit.
    let mut resp = ResponseCookies::new();
    let pre = m.manage(&RequestCookies::new(), &mut resp).await.unwrap();
    assert!(pre.is_pre_session());
    let browser = next_request(&resp);

    // Revisit with the cookie: same session, no new cookie.
    let mut resp = ResponseCookies::new();
    let again = m.manage(&browser, &mut resp).await.unwrap();
    assert_eq!(again.id, pre.id);
    assert!(resp.is_empty());

    // Log in: the form carries the CSRF token.
    let mut resp = ResponseCookies::new();
    let authed = with_session(&m, &browser, &mut resp, async |session, resp| {
        m.verify_session_csrf_token(&pre.csrf_token, &session)?;
        m.create(resp, Some(hola())).await
    })
    .await
    .unwrap()
    .unwrap();
    assert_ne!(authed.id, pre.id);
    let browser = next_request(&resp);

    // The next request sees the data.
    let mut resp = ResponseCookies::new();
    let seen = m.manage(&browser, &mut resp).await.unwrap();
    assert_eq!(seen.data, Some(hola()));
    assert!(resp.is_empty());

    // Log out.
    let mut resp = ResponseCookies::new();
    let cleared = m.clear(&mut resp, &seen.id).await.unwrap();
    assert!(cleared.is_pre_session());
    assert!(kv.raw(&format!("sess:{}", seen.id)).is_none());

    // The old cookie now leads to yet another pre-session.
    let mut resp = ResponseCookies::new();
    let after = m.manage(&browser, &mut resp).await.unwrap();
    assert!(after.is_pre_session());
    assert_ne!(after.id, seen.id);
}

#[tokio::test]
async fn test_stored_record_is_json_under_prefixed_key() {
    let (m, kv) = setup();
    let mut resp = ResponseCookies::new();
    let s = m.create(&mut resp, Some(hola())).await.unwrap();

    let raw = kv.raw(&format!("sess:{}", s.id)).unwrap();
    let json: serde_json::Value = serde_json::from_slice(&raw).unwrap();

    assert_eq!(json["id"], s.id.as_str());
    assert_eq!(json["data"]["greeting"], "hola");
    assert_eq!(json["csrf_token"], s.csrf_token.as_str());
    assert!(json["expiration"].is_string());
}

#[tokio::test]
async fn test_corrupt_record_falls_back_to_pre_session() {
    let (m, kv) = setup();
    let mut resp = ResponseCookies::new();
    let s = m.create(&mut resp, Some(hola())).await.unwrap();
    let browser = next_request(&resp);
    kv.overwrite(&format!("sess:{}", s.id), b"{\"id\": 42");

    assert!(matches!(
        m.lookup(&s.id).await,
        Err(SessionError::Store(StoreError::InvalidStoredData(_)))
    ));

    let mut resp = ResponseCookies::new();
    let fresh = m.manage(&browser, &mut resp).await.unwrap();
    assert!(fresh.is_pre_session());
    assert_ne!(fresh.id, s.id);
}

#[tokio::test(start_paused = true)]
async fn test_with_session_backend_down_skips_handler() {
    let (m, kv) = setup();
    kv.down.store(true, Ordering::SeqCst);
    let mut resp = ResponseCookies::new();
    let mut ran = false;

    let result = with_session(&m, &RequestCookies::new(), &mut resp, async |_, _| {
        ran = true;
    })
    .await;

    let err = result.unwrap_err();
    assert!(err.is_server_error());
    assert!(matches!(
        err,
        SatchelError::Session(SessionError::CreateFailed(RetryError::Exhausted { attempts: 4 }))
    ));
    assert!(!ran);
    assert!(resp.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_unserializable_data_aborts_after_one_attempt() {
    use std::collections::BTreeMap;

    // JSON object keys must be strings; tuple keys can't be encoded.
    type Scores = BTreeMap<(u8, u8), u32>;

    let kv = FakeKv::default();
    let m: SessionManager<Scores, _> =
        SessionManager::new(KvStore::json(kv.clone(), "sess"), b"e2e root key").unwrap();
    let mut resp = ResponseCookies::new();

    let err = m
        .create(&mut resp, Some(BTreeMap::from([((1, 2), 3)])))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SessionError::CreateFailed(RetryError::Aborted { attempts: 1 })
    ));
    assert!(kv.data.lock().is_empty());

    // A pre-session has no data to encode and still works.
    let pre = m.create(&mut resp, None).await.unwrap();
    assert!(pre.is_pre_session());
}

#[tokio::test]
async fn test_csrf_token_of_previous_session_rejected_after_login() {
    let (m, _) = setup();
    let mut resp = ResponseCookies::new();
    let pre = m.manage(&RequestCookies::new(), &mut resp).await.unwrap();
    let authed = m.create(&mut resp, Some(hola())).await.unwrap();

    let err: SatchelError = m
        .verify_session_csrf_token(&pre.csrf_token, &authed)
        .unwrap_err()
        .into();
    assert!(matches!(err, SatchelError::Session(SessionError::CsrfMismatch)));
    assert!(!err.is_server_error());

    m.verify_session_csrf_token(&authed.csrf_token, &authed).unwrap();
}
