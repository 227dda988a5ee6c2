//! MCP server exposing read-only Xero accounting data over stdio, with a
//! self-contained OAuth2 authorization-code flow (localhost callback capture
//! and transparent token refresh).

pub mod app;
pub mod auth;
pub mod config;
pub mod server;
pub mod shared;
pub mod xero;

use crate::auth::{AuthFacade, HttpTokenEndpoint, TokenStore};
use crate::config::Credential;
use crate::server::McpServer;
use crate::shared::error::AppResult;
use crate::xero::XeroApi;
use std::sync::Arc;

/// Build the full stack from the environment and run the stdio loop until
/// stdin closes.
pub async fn run() -> AppResult<()> {
    let credential = Credential::from_env()?;
    let config_dir = config::config_dir()?;
    let http = app::build_http_client()?;

    let endpoint = Arc::new(HttpTokenEndpoint::new(
        http.clone(),
        config::TOKEN_URL,
        credential.clone(),
    ));
    let store = TokenStore::new(&config_dir);
    let facade = Arc::new(AuthFacade::new(credential, store, endpoint));
    let api = Arc::new(XeroApi::new(http, facade));

    tracing::info!(config_dir = %config_dir.display(), "starting server");
    McpServer::new(api).run_stdio().await
}
