//! Usage: Client facade for the token lifecycle (status, refresh, interactive login).
//!
//! Explicitly constructed and passed to callers; the token endpoint and
//! browser opener are injected so tests can script both sides of the flow.

use crate::auth::authorize::build_authorize_url;
use crate::auth::browser::{open_browser, BrowserOpener};
use crate::auth::callback::{bind_callback_listener, wait_for_callback};
use crate::auth::session::AuthSession;
use crate::auth::store::TokenStore;
use crate::auth::token::{TokenEndpoint, TokenRecord};
use crate::config::{self, Credential};
use crate::shared::error::{AppError, AppResult};
use crate::shared::time::now_unix_seconds;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task;

const DEFAULT_CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

/// Externally observable facade state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStatus {
    Unauthenticated,
    Authenticated { expires_in: i64 },
    Expired,
}

#[derive(Default)]
struct Inner {
    token: Option<TokenRecord>,
    loaded: bool,
}

pub struct AuthFacade {
    credential: Credential,
    store: TokenStore,
    endpoint: Arc<dyn TokenEndpoint>,
    opener: Box<BrowserOpener>,
    preferred_port: u16,
    callback_timeout: Duration,
    // Serializes all token access: at most one pending auth session per
    // process, and no two refreshes racing to overwrite the token file.
    inner: Mutex<Inner>,
}

impl AuthFacade {
    pub fn new(credential: Credential, store: TokenStore, endpoint: Arc<dyn TokenEndpoint>) -> Self {
        Self {
            credential,
            store,
            endpoint,
            opener: Box::new(|url| open_browser(url)),
            preferred_port: config::DEFAULT_CALLBACK_PORT,
            callback_timeout: DEFAULT_CALLBACK_TIMEOUT,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn with_browser_opener(
        mut self,
        opener: impl Fn(&str) -> AppResult<()> + Send + Sync + 'static,
    ) -> Self {
        self.opener = Box::new(opener);
        self
    }

    pub fn with_preferred_port(mut self, port: u16) -> Self {
        self.preferred_port = port;
        self
    }

    pub fn with_callback_timeout(mut self, timeout: Duration) -> Self {
        self.callback_timeout = timeout;
        self
    }

    pub fn token_file(&self) -> &Path {
        self.store.path()
    }

    pub async fn auth_status(&self) -> AppResult<AuthStatus> {
        let mut inner = self.inner.lock().await;
        self.load_if_needed(&mut inner)?;
        Ok(status_of(inner.token.as_ref(), now_unix_seconds()))
    }

    /// Returns the current access token with no I/O while it is unexpired.
    /// An expired record triggers exactly one refresh; a refresh failure is
    /// surfaced, never silently converted into an interactive login.
    pub async fn ensure_valid_token(&self) -> AppResult<String> {
        let mut inner = self.inner.lock().await;
        self.load_if_needed(&mut inner)?;

        let record = inner.token.as_ref().ok_or(AppError::NotAuthenticated)?;
        if !record.is_expired(now_unix_seconds()) {
            return Ok(record.access_token.clone());
        }

        tracing::debug!("access token expired; refreshing");
        let mut refreshed = self.endpoint.refresh(&record.refresh_token).await?;
        if refreshed.scope.is_empty() {
            // Providers may omit scope on refresh; the granted set is unchanged.
            refreshed.scope = record.scope.clone();
        }
        self.store.save(&refreshed)?;
        let access_token = refreshed.access_token.clone();
        inner.token = Some(refreshed);
        Ok(access_token)
    }

    /// Run the interactive authorization-code flow: bind the loopback
    /// receiver, open the consent page, wait for exactly one callback,
    /// exchange the code, persist. Holding a currently-valid token fails
    /// with `AlreadyAuthenticated`.
    pub async fn start_auth_flow(&self) -> AppResult<AuthStatus> {
        let mut inner = self.inner.lock().await;
        self.load_if_needed(&mut inner)?;

        let now = now_unix_seconds();
        if matches!(
            status_of(inner.token.as_ref(), now),
            AuthStatus::Authenticated { .. }
        ) {
            return Err(AppError::AlreadyAuthenticated);
        }

        let session = AuthSession::new();
        let listener =
            bind_callback_listener(self.preferred_port, config::CALLBACK_PORT_ATTEMPTS).await?;
        let port = listener.port();
        let redirect_uri = config::redirect_uri(port);
        let auth_url = build_authorize_url(&self.credential, session.state(), port)?;

        let expected_state = session.state().to_string();
        let timeout = self.callback_timeout;
        let callback_task =
            task::spawn(
                async move { wait_for_callback(listener, &expected_state, timeout).await },
            );
        // Let the wait task start polling the listener before the redirect can arrive.
        task::yield_now().await;

        if let Err(err) = (self.opener)(&auth_url) {
            callback_task.abort();
            return Err(err);
        }

        let code = callback_task
            .await
            .map_err(|e| AppError::Listener(format!("callback task failed: {e}")))??;

        let record = self.endpoint.exchange(&code, &redirect_uri).await?;
        self.store.save(&record)?;
        let status = status_of(Some(&record), now_unix_seconds());
        inner.token = Some(record);
        Ok(status)
    }

    fn load_if_needed(&self, inner: &mut Inner) -> AppResult<()> {
        if inner.loaded {
            return Ok(());
        }
        inner.token = self.store.load()?;
        inner.loaded = true;
        Ok(())
    }
}

fn status_of(token: Option<&TokenRecord>, now_unix: i64) -> AuthStatus {
    match token {
        None => AuthStatus::Unauthenticated,
        Some(record) if record.is_expired(now_unix) => AuthStatus::Expired,
        Some(record) => AuthStatus::Authenticated {
            expires_in: record.expires_in(now_unix),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn record(expires_at: i64) -> TokenRecord {
        TokenRecord {
            access_token: "stored-access".to_string(),
            refresh_token: "stored-refresh".to_string(),
            expires_at,
            token_type: "Bearer".to_string(),
            scope: vec!["openid".to_string()],
        }
    }

    /// Scripted endpoint counting calls; panics on exchange so tests prove
    /// `ensure_valid_token` never starts an interactive path.
    struct CountingEndpoint {
        refreshes: AtomicUsize,
        refresh_result: Box<dyn Fn() -> AppResult<TokenRecord> + Send + Sync>,
    }

    #[async_trait]
    impl TokenEndpoint for CountingEndpoint {
        async fn exchange(&self, _code: &str, _redirect_uri: &str) -> AppResult<TokenRecord> {
            panic!("exchange must not be called");
        }

        async fn refresh(&self, _refresh_token: &str) -> AppResult<TokenRecord> {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            (self.refresh_result)()
        }
    }

    fn facade_with(
        dir: &tempfile::TempDir,
        stored: Option<TokenRecord>,
        endpoint: Arc<CountingEndpoint>,
    ) -> AuthFacade {
        let store = TokenStore::new(dir.path());
        if let Some(record) = stored {
            store.save(&record).expect("seed token");
        }
        AuthFacade::new(Credential::new("id", "secret"), store, endpoint)
    }

    #[tokio::test]
    async fn valid_token_is_returned_without_refresh() {
        let dir = tempfile::tempdir().expect("tempdir");
        let endpoint = Arc::new(CountingEndpoint {
            refreshes: AtomicUsize::new(0),
            refresh_result: Box::new(|| panic!("refresh must not be called")),
        });
        let facade = facade_with(&dir, Some(record(now_unix_seconds() + 3600)), endpoint.clone());

        let token = facade.ensure_valid_token().await.expect("token");
        assert_eq!(token, "stored-access");
        assert_eq!(endpoint.refreshes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn expired_token_triggers_exactly_one_refresh() {
        let dir = tempfile::tempdir().expect("tempdir");
        let old_expires_at = now_unix_seconds() - 10;
        let endpoint = Arc::new(CountingEndpoint {
            refreshes: AtomicUsize::new(0),
            refresh_result: Box::new(|| {
                Ok(TokenRecord {
                    access_token: "new-access".to_string(),
                    refresh_token: "new-refresh".to_string(),
                    expires_at: now_unix_seconds() + 1800,
                    token_type: "Bearer".to_string(),
                    scope: vec![],
                })
            }),
        });
        let facade = facade_with(&dir, Some(record(old_expires_at)), endpoint.clone());

        let token = facade.ensure_valid_token().await.expect("token");
        assert_eq!(token, "new-access");
        assert_eq!(endpoint.refreshes.load(Ordering::SeqCst), 1);

        // A second call sees the refreshed record and does no further I/O.
        let again = facade.ensure_valid_token().await.expect("token");
        assert_eq!(again, "new-access");
        assert_eq!(endpoint.refreshes.load(Ordering::SeqCst), 1);

        // The persisted record was replaced and moved forward.
        let persisted = TokenStore::new(dir.path())
            .load()
            .expect("load")
            .expect("record");
        assert!(persisted.expires_at > old_expires_at);
        // Scope carried over from the old record when the refresh omitted it.
        assert_eq!(persisted.scope, vec!["openid".to_string()]);
    }

    #[tokio::test]
    async fn refresh_failure_is_surfaced_not_retried() {
        let dir = tempfile::tempdir().expect("tempdir");
        let endpoint = Arc::new(CountingEndpoint {
            refreshes: AtomicUsize::new(0),
            refresh_result: Box::new(|| {
                Err(AppError::TokenRefreshFailed("invalid_grant".to_string()))
            }),
        });
        let facade = facade_with(&dir, Some(record(now_unix_seconds() - 10)), endpoint.clone());

        let err = facade.ensure_valid_token().await.expect_err("must fail");
        assert!(matches!(err, AppError::TokenRefreshFailed(_)));
        assert_eq!(endpoint.refreshes.load(Ordering::SeqCst), 1);
        // The stale record stays on disk; recovery requires explicit user action.
        assert!(TokenStore::new(dir.path()).load().expect("load").is_some());
    }

    #[tokio::test]
    async fn missing_token_reports_not_authenticated() {
        let dir = tempfile::tempdir().expect("tempdir");
        let endpoint = Arc::new(CountingEndpoint {
            refreshes: AtomicUsize::new(0),
            refresh_result: Box::new(|| panic!("refresh must not be called")),
        });
        let facade = facade_with(&dir, None, endpoint);

        assert!(matches!(
            facade.ensure_valid_token().await.expect_err("must fail"),
            AppError::NotAuthenticated
        ));
        assert_eq!(
            facade.auth_status().await.expect("status"),
            AuthStatus::Unauthenticated
        );
    }

    #[tokio::test]
    async fn start_auth_flow_rejects_valid_token() {
        let dir = tempfile::tempdir().expect("tempdir");
        let endpoint = Arc::new(CountingEndpoint {
            refreshes: AtomicUsize::new(0),
            refresh_result: Box::new(|| panic!("refresh must not be called")),
        });
        let facade = facade_with(&dir, Some(record(now_unix_seconds() + 3600)), endpoint);

        assert!(matches!(
            facade.start_auth_flow().await.expect_err("must fail"),
            AppError::AlreadyAuthenticated
        ));
    }
}
