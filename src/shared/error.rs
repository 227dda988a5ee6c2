//! Usage: Unified application error model for the auth lifecycle and API surface.

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Missing or unusable startup configuration (credentials, config dir).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Callback `state` did not match the pending session's state.
    #[error("oauth callback state mismatch")]
    CallbackStateMismatch,

    /// Callback carried neither a code nor a provider error.
    #[error("oauth callback missing authorization code")]
    CallbackMissingCode,

    /// The provider redirected back with an explicit error.
    #[error("oauth provider denied authorization: {error}: {description}")]
    ProviderDenied { error: String, description: String },

    /// Code-for-token exchange failed (network, non-2xx, or malformed body).
    #[error("token exchange failed: {0}")]
    TokenExchangeFailed(String),

    /// Refresh-token grant failed; caller must decide whether to re-authenticate.
    #[error("token refresh failed: {0}")]
    TokenRefreshFailed(String),

    /// Local callback listener could not be set up or produced no request.
    #[error("callback listener error: {0}")]
    Listener(String),

    /// Token file could not be read, parsed, or written.
    #[error("token store error: {0}")]
    TokenStore(String),

    /// No token on disk or in memory; an interactive login is required.
    #[error("not authenticated: run the authenticate tool first")]
    NotAuthenticated,

    /// A login flow was requested while a valid token is already held.
    #[error("already authenticated")]
    AlreadyAuthenticated,

    /// Accounting API call failed.
    #[error("xero api error: {0}")]
    Api(String),

    /// Failures outside the above taxonomy (browser launch, protocol I/O).
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable code, used by tool results and logs.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Configuration(_) => "CONFIGURATION_ERROR",
            AppError::CallbackStateMismatch => "CALLBACK_STATE_MISMATCH",
            AppError::CallbackMissingCode => "CALLBACK_MISSING_CODE",
            AppError::ProviderDenied { .. } => "PROVIDER_DENIED",
            AppError::TokenExchangeFailed(_) => "TOKEN_EXCHANGE_FAILED",
            AppError::TokenRefreshFailed(_) => "TOKEN_REFRESH_FAILED",
            AppError::Listener(_) => "LISTENER_ERROR",
            AppError::TokenStore(_) => "TOKEN_STORE_ERROR",
            AppError::NotAuthenticated => "NOT_AUTHENTICATED",
            AppError::AlreadyAuthenticated => "ALREADY_AUTHENTICATED",
            AppError::Api(_) => "API_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}
