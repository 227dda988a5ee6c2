//! Usage: Environment-sourced credential and config-directory resolution.

use crate::shared::error::{AppError, AppResult};
use std::path::PathBuf;

pub const AUTHORIZE_URL: &str = "https://login.xero.com/identity/connect/authorize";
pub const TOKEN_URL: &str = "https://identity.xero.com/connect/token";
pub const CONNECTIONS_URL: &str = "https://api.xero.com/connections";
pub const ACCOUNTING_API_BASE: &str = "https://api.xero.com/api.xro/2.0";

pub const DEFAULT_CALLBACK_PORT: u16 = 8000;
/// Ports tried on address-in-use: 8000, 8001, 8002.
pub const CALLBACK_PORT_ATTEMPTS: u16 = 3;
pub const CALLBACK_PATH: &str = "/callback";

pub const DEFAULT_SCOPES: &[&str] = &[
    "offline_access",
    "openid",
    "profile",
    "email",
    "accounting.transactions.read",
    "accounting.contacts.read",
    "accounting.settings.read",
    "accounting.reports.read",
];

const ENV_CLIENT_ID: &str = "XERO_CLIENT_ID";
const ENV_CLIENT_SECRET: &str = "XERO_CLIENT_SECRET";
const ENV_CONFIG_DIR: &str = "XERO_CONFIG_DIR";
const DEFAULT_CONFIG_DIRNAME: &str = ".xero-mcp";

/// OAuth client credential, fixed for the process lifetime.
#[derive(Debug, Clone)]
pub struct Credential {
    pub client_id: String,
    pub client_secret: String,
    pub scopes: Vec<String>,
}

impl Credential {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Read `XERO_CLIENT_ID` / `XERO_CLIENT_SECRET`; absence of either is a
    /// startup configuration error, not a runtime failure.
    pub fn from_env() -> AppResult<Self> {
        let client_id = read_non_empty(ENV_CLIENT_ID)?;
        let client_secret = read_non_empty(ENV_CLIENT_SECRET)?;
        Ok(Self::new(client_id, client_secret))
    }

    pub fn scope_string(&self) -> String {
        self.scopes.join(" ")
    }
}

fn read_non_empty(key: &str) -> AppResult<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            AppError::Configuration(format!(
                "missing {key}; set {ENV_CLIENT_ID} and {ENV_CLIENT_SECRET} in the environment or .env"
            ))
        })
}

/// Resolve the config directory (`XERO_CONFIG_DIR`, else `~/.xero-mcp`) and
/// create it if needed.
pub fn config_dir() -> AppResult<PathBuf> {
    let dir = match std::env::var(ENV_CONFIG_DIR).ok().filter(|v| !v.trim().is_empty()) {
        Some(dir) => PathBuf::from(dir.trim()),
        None => {
            let home = std::env::var_os("HOME")
                .or_else(|| std::env::var_os("USERPROFILE"))
                .ok_or_else(|| {
                    AppError::Configuration(
                        "cannot resolve home directory; set XERO_CONFIG_DIR".to_string(),
                    )
                })?;
            PathBuf::from(home).join(DEFAULT_CONFIG_DIRNAME)
        }
    };
    std::fs::create_dir_all(&dir)
        .map_err(|e| AppError::Configuration(format!("cannot create {}: {e}", dir.display())))?;
    Ok(dir)
}

pub fn redirect_uri(port: u16) -> String {
    format!("http://localhost:{port}{CALLBACK_PATH}")
}
