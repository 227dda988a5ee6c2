//! Usage: Token record model and token endpoint grants (authorization_code + refresh_token).

use crate::config::Credential;
use crate::shared::error::{AppError, AppResult};
use crate::shared::security::mask_token;
use crate::shared::time::now_unix_seconds;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// The live token set. Replaced wholesale on every exchange or refresh;
/// `expires_at` from storage is never trusted without checking the clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
    pub token_type: String,
    #[serde(default)]
    pub scope: Vec<String>,
}

impl TokenRecord {
    pub fn is_expired(&self, now_unix: i64) -> bool {
        now_unix >= self.expires_at
    }

    pub fn expires_in(&self, now_unix: i64) -> i64 {
        self.expires_at.saturating_sub(now_unix)
    }
}

/// Seam between the facade and the provider's token endpoint so tests can
/// substitute a scripted implementation.
#[async_trait]
pub trait TokenEndpoint: Send + Sync {
    /// Trade an authorization code for a token record. Codes are single-use;
    /// callers must not retry a rejected code.
    async fn exchange(&self, code: &str, redirect_uri: &str) -> AppResult<TokenRecord>;

    /// Trade a refresh token for a replacement record.
    async fn refresh(&self, refresh_token: &str) -> AppResult<TokenRecord>;
}

/// HTTP implementation posting form-encoded grants to the provider.
pub struct HttpTokenEndpoint {
    http: reqwest::Client,
    token_url: String,
    credential: Credential,
}

impl HttpTokenEndpoint {
    pub fn new(http: reqwest::Client, token_url: impl Into<String>, credential: Credential) -> Self {
        Self {
            http,
            token_url: token_url.into(),
            credential,
        }
    }

    async fn post_grant(&self, form: &HashMap<&str, String>) -> Result<TokenRecord, String> {
        let response = self
            .http
            .post(&self.token_url)
            .form(form)
            .send()
            .await
            .map_err(|e| format!("token endpoint request failed: {e}"))?;
        parse_token_response(response).await
    }
}

#[async_trait]
impl TokenEndpoint for HttpTokenEndpoint {
    async fn exchange(&self, code: &str, redirect_uri: &str) -> AppResult<TokenRecord> {
        let mut form: HashMap<&str, String> = HashMap::new();
        form.insert("grant_type", "authorization_code".to_string());
        form.insert("code", code.trim().to_string());
        form.insert("redirect_uri", redirect_uri.trim().to_string());
        form.insert("client_id", self.credential.client_id.clone());
        form.insert("client_secret", self.credential.client_secret.clone());

        self.post_grant(&form)
            .await
            .map_err(AppError::TokenExchangeFailed)
    }

    async fn refresh(&self, refresh_token: &str) -> AppResult<TokenRecord> {
        let mut form: HashMap<&str, String> = HashMap::new();
        form.insert("grant_type", "refresh_token".to_string());
        form.insert("refresh_token", refresh_token.trim().to_string());
        form.insert("client_id", self.credential.client_id.clone());
        form.insert("client_secret", self.credential.client_secret.clone());

        self.post_grant(&form)
            .await
            .map_err(AppError::TokenRefreshFailed)
    }
}

async fn parse_token_response(response: reqwest::Response) -> Result<TokenRecord, String> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| format!("token response read failed: {e}"))?;

    if !status.is_success() {
        let (error_code, error_message) = parse_provider_error(&body);
        let mut msg = format!("token endpoint returned status={}", status.as_u16());
        if let Some(code) = error_code {
            msg.push_str(" error=");
            msg.push_str(&code);
        }
        if let Some(detail) = error_message {
            msg.push_str(" detail=");
            msg.push_str(detail.chars().take(240).collect::<String>().as_str());
        }
        msg.push_str(" body=");
        msg.push_str(&sanitize_error_body_snippet(&body));
        return Err(msg);
    }

    let value: Value =
        serde_json::from_str(&body).map_err(|e| format!("token response json invalid: {e}"))?;

    let access_token = required_str(&value, "access_token")?;
    let refresh_token = required_str(&value, "refresh_token")?;
    let token_type = value
        .get("token_type")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("Bearer")
        .to_string();
    let scope = value
        .get("scope")
        .and_then(Value::as_str)
        .map(|s| s.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default();

    let expires_in = value
        .get("expires_in")
        .and_then(parse_i64_lossy)
        .filter(|v| *v > 0)
        .ok_or_else(|| "token response missing expires_in".to_string())?;
    let expires_at = now_unix_seconds().saturating_add(expires_in);

    Ok(TokenRecord {
        access_token,
        refresh_token,
        expires_at,
        token_type,
        scope,
    })
}

fn required_str(value: &Value, key: &str) -> Result<String, String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| format!("token response missing {key}"))
}

fn parse_i64_lossy(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let key_lc = key.trim().to_ascii_lowercase();
    key_lc.contains("token") || key_lc.contains("secret") || key_lc == "authorization"
}

fn redact_sensitive_json_fields(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, nested) in map {
                if is_sensitive_key(key) {
                    if let Some(raw) = nested.as_str() {
                        *nested = Value::String(mask_token(raw));
                        continue;
                    }
                }
                redact_sensitive_json_fields(nested);
            }
        }
        Value::Array(items) => {
            for nested in items {
                redact_sensitive_json_fields(nested);
            }
        }
        _ => {}
    }
}

fn sanitize_error_body_snippet(body: &str) -> String {
    if let Ok(mut value) = serde_json::from_str::<Value>(body) {
        redact_sensitive_json_fields(&mut value);
        if let Ok(encoded) = serde_json::to_string(&value) {
            return encoded.chars().take(500).collect();
        }
    }
    body.chars().take(500).collect()
}

fn parse_provider_error(body: &str) -> (Option<String>, Option<String>) {
    let value: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(_) => return (None, None),
    };

    let code = value
        .get("error")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string);
    let message = value
        .get("error_description")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string);
    (code, message)
}
