//! Connection parameters and payload types.

use serde::{Deserialize, Serialize};

/// Everything needed to reach and authenticate against a MinIO admin endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    /// `host[:port]` of the MinIO server, without scheme.
    pub endpoint: String,
    /// Admin access key.
    pub access_key: String,
    /// Admin secret key.
    pub secret_key: String,
    /// Whether to use HTTPS.
    pub secure: bool,
}

impl std::fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("endpoint", &self.endpoint)
            .field("access_key", &self.access_key)
            .field("secret_key", &"[REDACTED]")
            .field("secure", &self.secure)
            .finish()
    }
}

impl ConnectionParams {
    pub fn new(
        endpoint: impl Into<String>,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
        secure: bool,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            secure,
        }
    }

    /// Base URL (`scheme://endpoint`) for admin requests.
    #[must_use]
    pub fn base_url(&self) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        format!("{scheme}://{}", self.endpoint)
    }
}

/// Account state of a MinIO user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Enabled,
}

impl std::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccountStatus::Enabled => write!(f, "enabled"),
        }
    }
}

/// Body of the `add-user` call, sent encrypted.
#[derive(Clone, Serialize)]
pub(crate) struct UserInfo<'a> {
    #[serde(rename = "secretKey")]
    pub secret_key: &'a str,
    pub status: AccountStatus,
}

/// Error document returned by the admin API on failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub(crate) struct ErrorResponse {
    pub code: String,
    pub message: String,
}
