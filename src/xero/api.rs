//! Usage: Accounting API executor: token, tenant header, GET, payload extraction.

use crate::auth::AuthFacade;
use crate::config;
use crate::shared::error::{AppError, AppResult};
use crate::xero::connections::resolve_tenant_id;
use crate::xero::operations::AccountingOperation;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;

const TENANT_HEADER: &str = "xero-tenant-id";
const IF_MODIFIED_SINCE: &str = "If-Modified-Since";

/// Executes enumerated operations against the accounting API. Every call
/// routes through the facade first, so callers never see a stale token.
pub struct XeroApi {
    http: reqwest::Client,
    facade: Arc<AuthFacade>,
    api_base: String,
    connections_url: String,
    // Resolved once per process; connections rarely change mid-session.
    tenant_id: Mutex<Option<String>>,
}

impl XeroApi {
    pub fn new(http: reqwest::Client, facade: Arc<AuthFacade>) -> Self {
        Self::with_endpoints(
            http,
            facade,
            config::ACCOUNTING_API_BASE,
            config::CONNECTIONS_URL,
        )
    }

    pub fn with_endpoints(
        http: reqwest::Client,
        facade: Arc<AuthFacade>,
        api_base: impl Into<String>,
        connections_url: impl Into<String>,
    ) -> Self {
        Self {
            http,
            facade,
            api_base: api_base.into(),
            connections_url: connections_url.into(),
            tenant_id: Mutex::new(None),
        }
    }

    pub fn facade(&self) -> &Arc<AuthFacade> {
        &self.facade
    }

    /// Run one accounting read and return the payload the response nests
    /// under the operation's key.
    pub async fn execute(&self, operation: &AccountingOperation) -> AppResult<Value> {
        let access_token = self.facade.ensure_valid_token().await?;
        let tenant_id = self.tenant_id(&access_token).await?;
        let request = operation.request();

        tracing::debug!(path = request.path, "accounting api call");
        let mut builder = self
            .http
            .get(format!("{}/{}", self.api_base, request.path))
            .bearer_auth(&access_token)
            .header(TENANT_HEADER, &tenant_id)
            .header(reqwest::header::ACCEPT, "application/json");
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(since) = &request.if_modified_since {
            builder = builder.header(IF_MODIFIED_SINCE, since);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| AppError::Api(format!("{} request failed: {e}", request.path)))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::Api(format!("{} response read failed: {e}", request.path)))?;
        if !status.is_success() {
            return Err(AppError::Api(format!(
                "{} returned status={} body={}",
                request.path,
                status.as_u16(),
                body.chars().take(500).collect::<String>()
            )));
        }

        let value: Value = serde_json::from_str(&body)
            .map_err(|e| AppError::Api(format!("{} response invalid: {e}", request.path)))?;
        extract_payload(value, request.payload_key, request.path)
    }

    async fn tenant_id(&self, access_token: &str) -> AppResult<String> {
        let mut cached = self.tenant_id.lock().await;
        if let Some(tenant_id) = cached.as_ref() {
            return Ok(tenant_id.clone());
        }
        let tenant_id =
            resolve_tenant_id(&self.http, &self.connections_url, access_token).await?;
        *cached = Some(tenant_id.clone());
        Ok(tenant_id)
    }
}

fn extract_payload(mut value: Value, payload_key: &str, path: &str) -> AppResult<Value> {
    match value.get_mut(payload_key) {
        Some(payload) => Ok(payload.take()),
        None => Err(AppError::Api(format!(
            "{path} response has no {payload_key} payload"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_payload_takes_nested_key() {
        let body = serde_json::json!({"Id": "x", "Accounts": [{"Code": "200"}]});
        let payload = extract_payload(body, "Accounts", "Accounts").expect("payload");
        assert_eq!(payload, serde_json::json!([{"Code": "200"}]));
    }

    #[test]
    fn missing_payload_key_is_an_api_error() {
        let body = serde_json::json!({"Id": "x"});
        assert!(matches!(
            extract_payload(body, "Reports", "Reports/BankSummary").expect_err("must fail"),
            AppError::Api(_)
        ));
    }
}
