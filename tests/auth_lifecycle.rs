//! End-to-end exercises of the authorization-code lifecycle against a
//! simulated provider token endpoint and a scripted browser.

use axum::extract::State;
use axum::routing::post;
use axum::{Form, Json, Router};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use xero_mcp::auth::{AuthFacade, AuthStatus, HttpTokenEndpoint, TokenEndpoint, TokenRecord, TokenStore};
use xero_mcp::config::Credential;
use xero_mcp::shared::error::{AppError, AppResult};

#[derive(Clone)]
struct ProviderState {
    hits: Arc<AtomicUsize>,
    last_form: Arc<Mutex<Option<HashMap<String, String>>>>,
    response: Arc<serde_json::Value>,
}

async fn token_handler(
    State(state): State<ProviderState>,
    Form(form): Form<HashMap<String, String>>,
) -> Json<serde_json::Value> {
    state.hits.fetch_add(1, Ordering::SeqCst);
    *state.last_form.lock().expect("form lock") = Some(form);
    Json(state.response.as_ref().clone())
}

async fn spawn_token_endpoint(response: serde_json::Value) -> (String, ProviderState) {
    let state = ProviderState {
        hits: Arc::new(AtomicUsize::new(0)),
        last_form: Arc::new(Mutex::new(None)),
        response: Arc::new(response),
    };
    let app = Router::new()
        .route("/connect/token", post(token_handler))
        .with_state(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind provider");
    let addr = listener.local_addr().expect("provider addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("provider serve");
    });
    (format!("http://{addr}/connect/token"), state)
}

fn canonical_token_body() -> serde_json::Value {
    json!({
        "access_token": "live-access",
        "refresh_token": "live-refresh",
        "expires_in": 3600,
        "token_type": "Bearer",
        "scope": "x y",
    })
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_secs() as i64
}

/// Acts as the user's browser: records the consent URL, then hits the
/// loopback redirect with a code and the given (or the real) state.
fn scripted_browser(
    visited: Arc<Mutex<Vec<String>>>,
    forged_state: Option<String>,
) -> impl Fn(&str) -> AppResult<()> + Send + Sync + 'static {
    move |auth_url: &str| {
        visited.lock().expect("url lock").push(auth_url.to_string());

        let parsed = reqwest::Url::parse(auth_url)
            .map_err(|e| AppError::Internal(format!("bad auth url: {e}")))?;
        let mut state = None;
        let mut redirect_uri = None;
        for (key, value) in parsed.query_pairs() {
            match key.as_ref() {
                "state" => state = Some(value.to_string()),
                "redirect_uri" => redirect_uri = Some(value.to_string()),
                _ => {}
            }
        }
        let state = forged_state
            .clone()
            .or(state)
            .expect("state query param");
        let redirect = reqwest::Url::parse(&redirect_uri.expect("redirect_uri param"))
            .expect("redirect url");
        let port = redirect.port().expect("redirect port");

        std::thread::spawn(move || {
            use std::io::{Read, Write};
            let mut stream =
                std::net::TcpStream::connect(("127.0.0.1", port)).expect("connect callback");
            let request = format!(
                "GET /callback?code=test-code&state={state} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n"
            );
            stream.write_all(request.as_bytes()).expect("send callback");
            let mut response = Vec::new();
            let _ = stream.read_to_end(&mut response);
        });
        Ok(())
    }
}

fn facade(
    dir: &tempfile::TempDir,
    token_url: &str,
    port: u16,
    opener: impl Fn(&str) -> AppResult<()> + Send + Sync + 'static,
) -> AuthFacade {
    let credential = Credential::new("test-client-id", "test-client-secret");
    let endpoint = Arc::new(HttpTokenEndpoint::new(
        reqwest::Client::new(),
        token_url,
        credential.clone(),
    ));
    AuthFacade::new(credential, TokenStore::new(dir.path()), endpoint)
        .with_browser_opener(opener)
        .with_preferred_port(port)
        .with_callback_timeout(Duration::from_secs(10))
}

#[tokio::test]
async fn exchange_parses_canonical_token_response() {
    let (token_url, provider) = spawn_token_endpoint(canonical_token_body()).await;
    let endpoint = HttpTokenEndpoint::new(
        reqwest::Client::new(),
        token_url,
        Credential::new("test-client-id", "test-client-secret"),
    );

    let before = now_unix();
    let record = endpoint
        .exchange("code123", "http://localhost:8000/callback")
        .await
        .expect("exchange");

    assert_eq!(record.access_token, "live-access");
    assert_eq!(record.scope, vec!["x".to_string(), "y".to_string()]);
    let drift = record.expires_at - (before + 3600);
    assert!((0..=1).contains(&drift), "expires_at drift {drift}");

    let form = provider
        .last_form
        .lock()
        .expect("form lock")
        .clone()
        .expect("form");
    assert_eq!(form.get("grant_type").map(String::as_str), Some("authorization_code"));
    assert_eq!(form.get("code").map(String::as_str), Some("code123"));
    assert_eq!(
        form.get("redirect_uri").map(String::as_str),
        Some("http://localhost:8000/callback")
    );
}

#[tokio::test]
async fn auth_flow_persists_token_releases_port_and_rotates_state() {
    let (token_url, _provider) = spawn_token_endpoint(canonical_token_body()).await;
    let visited = Arc::new(Mutex::new(Vec::new()));

    let first_dir = tempfile::tempdir().expect("tempdir");
    let first = facade(
        &first_dir,
        &token_url,
        18340,
        scripted_browser(visited.clone(), None),
    );
    let status = first.start_auth_flow().await.expect("first flow");
    assert!(matches!(status, AuthStatus::Authenticated { .. }));
    assert!(first_dir.path().join("token.json").exists());

    // The flow is over, so its port must be free again.
    let rebound = tokio::net::TcpListener::bind(("127.0.0.1", 18340))
        .await
        .expect("port released");
    drop(rebound);

    let second_dir = tempfile::tempdir().expect("tempdir");
    let second = facade(
        &second_dir,
        &token_url,
        18340,
        scripted_browser(visited.clone(), None),
    );
    second.start_auth_flow().await.expect("second flow");

    let visited = visited.lock().expect("url lock");
    assert_eq!(visited.len(), 2);
    let states: Vec<String> = visited
        .iter()
        .map(|url| {
            reqwest::Url::parse(url)
                .expect("auth url")
                .query_pairs()
                .find(|(k, _)| k == "state")
                .map(|(_, v)| v.to_string())
                .expect("state param")
        })
        .collect();
    assert_ne!(states[0], states[1]);
}

#[tokio::test]
async fn forged_state_never_persists_a_token() {
    let (token_url, provider) = spawn_token_endpoint(canonical_token_body()).await;
    let visited = Arc::new(Mutex::new(Vec::new()));

    let dir = tempfile::tempdir().expect("tempdir");
    let facade = facade(
        &dir,
        &token_url,
        18350,
        scripted_browser(visited, Some("forged-state".to_string())),
    );

    let err = facade.start_auth_flow().await.expect_err("must fail");
    assert!(matches!(err, AppError::CallbackStateMismatch));

    // No exchange happened and nothing was written.
    assert_eq!(provider.hits.load(Ordering::SeqCst), 0);
    assert!(!dir.path().join("token.json").exists());
    assert_eq!(
        facade.auth_status().await.expect("status"),
        AuthStatus::Unauthenticated
    );

    // The failure path released the port too.
    let rebound = tokio::net::TcpListener::bind(("127.0.0.1", 18350))
        .await
        .expect("port released");
    drop(rebound);
}

#[tokio::test]
async fn abandoned_callback_times_out_and_frees_port() {
    let (token_url, provider) = spawn_token_endpoint(canonical_token_body()).await;

    let dir = tempfile::tempdir().expect("tempdir");
    // The "browser" opens but the user never completes the consent page.
    let abandoned = facade(&dir, &token_url, 18370, |_url| Ok(()))
        .with_callback_timeout(Duration::from_millis(200));

    let err = abandoned.start_auth_flow().await.expect_err("must time out");
    assert!(matches!(err, AppError::Listener(_)));
    assert!(err.to_string().contains("timed out"));

    // No exchange happened and nothing was written.
    assert_eq!(provider.hits.load(Ordering::SeqCst), 0);
    assert!(!dir.path().join("token.json").exists());

    // The timeout path released the port like every other exit path.
    let rebound = tokio::net::TcpListener::bind(("127.0.0.1", 18370))
        .await
        .expect("port released");
    drop(rebound);

    // A rerun can go through on the same starting port.
    let visited = Arc::new(Mutex::new(Vec::new()));
    let retry = facade(&dir, &token_url, 18370, scripted_browser(visited, None));
    let status = retry.start_auth_flow().await.expect("retry flow");
    assert!(matches!(status, AuthStatus::Authenticated { .. }));
}

#[tokio::test]
async fn expired_record_is_refreshed_once_over_http() {
    let (token_url, provider) = spawn_token_endpoint(canonical_token_body()).await;

    let dir = tempfile::tempdir().expect("tempdir");
    let store = TokenStore::new(dir.path());
    let old_expires_at = now_unix() - 60;
    store
        .save(&TokenRecord {
            access_token: "stale-access".to_string(),
            refresh_token: "stale-refresh".to_string(),
            expires_at: old_expires_at,
            token_type: "Bearer".to_string(),
            scope: vec!["x".to_string()],
        })
        .expect("seed token");

    let facade = facade(&dir, &token_url, 18360, |_url| {
        panic!("refresh must not open a browser")
    });

    let token = facade.ensure_valid_token().await.expect("token");
    assert_eq!(token, "live-access");
    let again = facade.ensure_valid_token().await.expect("token");
    assert_eq!(again, "live-access");
    assert_eq!(provider.hits.load(Ordering::SeqCst), 1);

    let form = provider
        .last_form
        .lock()
        .expect("form lock")
        .clone()
        .expect("form");
    assert_eq!(form.get("grant_type").map(String::as_str), Some("refresh_token"));
    assert_eq!(
        form.get("refresh_token").map(String::as_str),
        Some("stale-refresh")
    );

    let persisted = TokenStore::new(dir.path())
        .load()
        .expect("load")
        .expect("record");
    assert!(persisted.expires_at > old_expires_at);
}
