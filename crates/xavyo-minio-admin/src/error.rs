//! MinIO admin client error types.

use thiserror::Error;

/// Error returned by admin API calls.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Client could not be built from the supplied connection parameters.
    #[error("invalid admin client configuration: {0}")]
    InvalidConfig(String),

    /// Transport-level failure (DNS, TLS, connection reset, timeout).
    #[error("admin request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The addressed user, group or policy does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The backend refused the change because of a conflicting object.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Credentials rejected or insufficient privileges.
    #[error("authentication failed: {0}")]
    AuthError(String),

    /// Any other non-success response.
    #[error("admin API error (HTTP {status}) {code}: {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    /// The request could not be signed.
    #[error("request signing failed: {0}")]
    Signing(String),

    /// Payload encryption failed.
    #[error("payload encryption failed: {0}")]
    Encryption(String),

    /// Request body could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AdminError {
    /// Whether retrying the same call could succeed.
    ///
    /// The client never retries on its own; callers decide.
    pub fn is_transient(&self) -> bool {
        match self {
            AdminError::Http(e) => e.is_timeout() || e.is_connect(),
            AdminError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Stable classification code.
    pub fn error_code(&self) -> &'static str {
        match self {
            AdminError::InvalidConfig(_) => "INVALID_CONFIG",
            AdminError::Http(_) => "HTTP_ERROR",
            AdminError::NotFound(_) => "NOT_FOUND",
            AdminError::Conflict(_) => "CONFLICT",
            AdminError::AuthError(_) => "AUTH_FAILED",
            AdminError::Api { .. } => "API_ERROR",
            AdminError::Signing(_) => "SIGNING_FAILED",
            AdminError::Encryption(_) => "ENCRYPTION_FAILED",
            AdminError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }
}

/// Result type for admin API calls.
pub type AdminResult<T> = Result<T, AdminError>;
