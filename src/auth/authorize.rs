//! Usage: Authorization endpoint URL construction (pure, no side effects).

use crate::config::{self, Credential};
use crate::shared::error::{AppError, AppResult};
use reqwest::Url;

pub fn build_authorize_url(
    credential: &Credential,
    state: &str,
    callback_port: u16,
) -> AppResult<String> {
    build_authorize_url_at(config::AUTHORIZE_URL, credential, state, callback_port)
}

pub(crate) fn build_authorize_url_at(
    authorize_url: &str,
    credential: &Credential,
    state: &str,
    callback_port: u16,
) -> AppResult<String> {
    let mut url = Url::parse(authorize_url)
        .map_err(|e| AppError::Internal(format!("invalid authorize url: {e}")))?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("response_type", "code");
        query.append_pair("client_id", &credential.client_id);
        query.append_pair("redirect_uri", &config::redirect_uri(callback_port));
        query.append_pair("scope", &credential.scope_string());
        query.append_pair("state", state);
    }
    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential() -> Credential {
        Credential::new("client-123", "secret-456")
    }

    #[test]
    fn authorize_url_carries_all_query_parameters() {
        let url = build_authorize_url(&credential(), "state-xyz", 8000).expect("url");
        let parsed = Url::parse(&url).expect("parse");
        let pairs: Vec<(String, String)> = parsed
            .query_pairs()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        assert!(url.starts_with("https://login.xero.com/identity/connect/authorize?"));
        assert!(pairs.contains(&("response_type".to_string(), "code".to_string())));
        assert!(pairs.contains(&("client_id".to_string(), "client-123".to_string())));
        assert!(pairs.contains(&(
            "redirect_uri".to_string(),
            "http://localhost:8000/callback".to_string()
        )));
        assert!(pairs.contains(&("state".to_string(), "state-xyz".to_string())));
    }

    #[test]
    fn scope_parameter_is_space_joined() {
        let url = build_authorize_url(&credential(), "s", 8001).expect("url");
        let parsed = Url::parse(&url).expect("parse");
        let scope = parsed
            .query_pairs()
            .find(|(k, _)| k == "scope")
            .map(|(_, v)| v.to_string())
            .expect("scope present");
        assert!(scope.contains("offline_access openid"));
    }

    #[test]
    fn client_secret_never_appears_in_url() {
        let url = build_authorize_url(&credential(), "s", 8000).expect("url");
        assert!(!url.contains("secret-456"));
    }
}
