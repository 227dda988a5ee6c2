//! Usage: One-shot localhost callback listener for the OAuth authorization code flow.

use crate::config::CALLBACK_PATH;
use crate::shared::error::{AppError, AppResult};
use crate::shared::security::constant_time_eq;
use reqwest::Url;
use std::io::ErrorKind;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

const SUCCESS_HTML: &str =
    "<html><body><h1>Authentication successful</h1><p>You may close this window.</p></body></html>";
const ERROR_HTML: &str = "<html><body><h1>Authentication failed</h1><p>You may close this window and retry.</p></body></html>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CallbackPayload {
    pub(crate) code: Option<String>,
    pub(crate) state: Option<String>,
    pub(crate) error: Option<String>,
    pub(crate) error_description: Option<String>,
}

/// A bound listener holding the callback port until the flow completes.
/// Dropping it releases the port on every exit path.
#[derive(Debug)]
pub(crate) struct BoundCallbackListener {
    port: u16,
    listener_v4: Option<TcpListener>,
    listener_v6: Option<TcpListener>,
}

impl BoundCallbackListener {
    pub(crate) fn port(&self) -> u16 {
        self.port
    }
}

/// Bind the preferred port, walking `preferred`, `+1`, ... for `attempts`
/// ports. Only address-in-use moves to the next port; any other bind error
/// propagates immediately. The ladder stops at the end of the port space.
pub(crate) async fn bind_callback_listener(
    preferred_port: u16,
    attempts: u16,
) -> AppResult<BoundCallbackListener> {
    let attempts = attempts.max(1);
    for offset in 0..attempts {
        let Some(port) = preferred_port.checked_add(offset) else {
            break;
        };
        match try_bind_on_port(port).await {
            Ok(bound) => {
                if offset > 0 {
                    tracing::debug!(port, preferred_port, "callback port fell back");
                }
                return Ok(bound);
            }
            Err(err) if err.kind() == ErrorKind::AddrInUse && offset + 1 < attempts => {
                continue;
            }
            Err(err) => {
                return Err(AppError::Listener(format!(
                    "bind localhost:{port} failed: {err}"
                )));
            }
        }
    }
    Err(AppError::Listener(format!(
        "no callback port available starting at {preferred_port}"
    )))
}

/// The redirect URI uses `localhost`, which may resolve to either family;
/// bind both when possible, require at least one.
async fn try_bind_on_port(port: u16) -> Result<BoundCallbackListener, std::io::Error> {
    let listener_v4 = TcpListener::bind(("127.0.0.1", port)).await;
    let listener_v6 = TcpListener::bind(("::1", port)).await;

    match (listener_v4, listener_v6) {
        (Err(e4), Err(_)) => Err(e4),
        (v4, v6) => Ok(BoundCallbackListener {
            port,
            listener_v4: v4.ok(),
            listener_v6: v6.ok(),
        }),
    }
}

/// Wait for exactly one redirect request, validate it against the session
/// state, answer the browser, and release the port. The listener is consumed
/// whether the flow succeeds, fails, or times out.
pub(crate) async fn wait_for_callback(
    mut listener: BoundCallbackListener,
    expected_state: &str,
    timeout: Duration,
) -> AppResult<String> {
    let accept_future = async {
        match (listener.listener_v4.as_mut(), listener.listener_v6.as_mut()) {
            (Some(v4), Some(v6)) => {
                tokio::select! {
                    result = v4.accept() => result,
                    result = v6.accept() => result,
                }
            }
            (Some(v4), None) => v4.accept().await,
            (None, Some(v6)) => v6.accept().await,
            (None, None) => unreachable!("bind guarantees at least one listener"),
        }
    };

    let (mut socket, _) = tokio::time::timeout(timeout, accept_future)
        .await
        .map_err(|_| AppError::Listener("timed out waiting for oauth callback".to_string()))?
        .map_err(|e| AppError::Listener(format!("callback accept failed: {e}")))?;

    let mut buffer = vec![0u8; 8192];
    let size = socket
        .read(&mut buffer)
        .await
        .map_err(|e| AppError::Listener(format!("callback read failed: {e}")))?;
    if size == 0 {
        return Err(AppError::Listener("callback request is empty".to_string()));
    }

    let request = String::from_utf8_lossy(&buffer[..size]);
    let outcome = extract_request_target(request.as_ref())
        .and_then(parse_callback_target)
        .and_then(|payload| resolve_payload(payload, expected_state));

    let (status, body) = match &outcome {
        Ok(_) => ("HTTP/1.1 200 OK", SUCCESS_HTML),
        Err(_) => ("HTTP/1.1 400 Bad Request", ERROR_HTML),
    };
    let response = format!(
        "{status}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;

    outcome
}

fn extract_request_target(request: &str) -> AppResult<&str> {
    let first = request
        .lines()
        .next()
        .ok_or_else(|| AppError::Listener("malformed callback request".to_string()))?;
    let mut parts = first.split_whitespace();
    let method = parts.next().unwrap_or_default();
    let target = parts.next().unwrap_or_default();
    if method != "GET" || target.is_empty() {
        return Err(AppError::Listener("callback must be a GET".to_string()));
    }
    Ok(target)
}

pub(crate) fn parse_callback_target(target: &str) -> AppResult<CallbackPayload> {
    let url = Url::parse(&format!("http://localhost{target}"))
        .map_err(|e| AppError::Listener(format!("invalid callback target: {e}")))?;

    if url.path() != CALLBACK_PATH {
        return Err(AppError::Listener(format!(
            "unexpected callback path {}",
            url.path()
        )));
    }

    let mut payload = CallbackPayload {
        code: None,
        state: None,
        error: None,
        error_description: None,
    };
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => payload.code = Some(value.to_string()),
            "state" => payload.state = Some(value.to_string()),
            "error" => payload.error = Some(value.to_string()),
            "error_description" => payload.error_description = Some(value.to_string()),
            _ => {}
        }
    }
    Ok(payload)
}

/// State is checked before anything else; a forged or stale redirect must not
/// surface the provider's own error or code.
pub(crate) fn resolve_payload(
    payload: CallbackPayload,
    expected_state: &str,
) -> AppResult<String> {
    let state = payload
        .state
        .as_deref()
        .ok_or(AppError::CallbackStateMismatch)?;
    if !constant_time_eq(state.as_bytes(), expected_state.as_bytes()) {
        return Err(AppError::CallbackStateMismatch);
    }

    if let Some(error) = payload.error {
        return Err(AppError::ProviderDenied {
            error,
            description: payload
                .error_description
                .unwrap_or_else(|| "authorization was not granted".to_string()),
        });
    }

    payload.code.ok_or(AppError::CallbackMissingCode)
}
