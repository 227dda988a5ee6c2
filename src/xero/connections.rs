//! Usage: Tenant resolution via the connections endpoint.

use crate::shared::error::{AppError, AppResult};
use serde::Deserialize;

const ORGANISATION_TENANT_TYPE: &str = "ORGANISATION";

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Connection {
    #[serde(rename = "tenantId")]
    pub(crate) tenant_id: String,
    #[serde(rename = "tenantType")]
    pub(crate) tenant_type: String,
    #[serde(rename = "tenantName", default)]
    pub(crate) tenant_name: Option<String>,
}

/// List the connections the token grants and pick the first organisation
/// tenant. Practice tokens may also carry non-organisation entries; those are
/// never usable for accounting calls.
pub(crate) async fn resolve_tenant_id(
    http: &reqwest::Client,
    connections_url: &str,
    access_token: &str,
) -> AppResult<String> {
    let response = http
        .get(connections_url)
        .bearer_auth(access_token)
        .header(reqwest::header::ACCEPT, "application/json")
        .send()
        .await
        .map_err(|e| AppError::Api(format!("connections request failed: {e}")))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| AppError::Api(format!("connections response read failed: {e}")))?;
    if !status.is_success() {
        return Err(AppError::Api(format!(
            "connections endpoint returned status={} body={}",
            status.as_u16(),
            body.chars().take(500).collect::<String>()
        )));
    }

    let connections: Vec<Connection> = serde_json::from_str(&body)
        .map_err(|e| AppError::Api(format!("connections response invalid: {e}")))?;
    pick_organisation(&connections)
}

pub(crate) fn pick_organisation(connections: &[Connection]) -> AppResult<String> {
    let org = connections
        .iter()
        .find(|c| c.tenant_type == ORGANISATION_TENANT_TYPE)
        .ok_or_else(|| {
            AppError::Api("no organisation tenant among the token's connections".to_string())
        })?;
    tracing::debug!(
        tenant_name = org.tenant_name.as_deref().unwrap_or("<unnamed>"),
        "resolved organisation tenant"
    );
    Ok(org.tenant_id.clone())
}
