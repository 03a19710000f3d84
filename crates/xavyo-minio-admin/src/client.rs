//! MinIO admin HTTP client (reqwest-based).
//!
//! Implements [`MinioAdmin`] against the `/minio/admin/v3` REST endpoints.
//! Every request is signed with AWS Signature V4 using the admin
//! credentials; user secrets are sent sealed (see [`crate::crypto`]).

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::crypto::encrypt_data;
use crate::error::{AdminError, AdminResult};
use crate::signing::SigV4;
use crate::traits::MinioAdmin;
use crate::types::{AccountStatus, ConnectionParams, ErrorResponse, UserInfo};

const ADMIN_PREFIX: &str = "/minio/admin/v3";

/// Default per-request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the MinIO admin API.
#[derive(Clone)]
pub struct MinioAdminClient {
    /// `scheme://host[:port]` of the server.
    base_url: Url,
    access_key: String,
    secret_key: String,
    http_client: Client,
}

impl std::fmt::Debug for MinioAdminClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MinioAdminClient")
            .field("base_url", &self.base_url.as_str())
            .field("access_key", &self.access_key)
            .finish()
    }
}

impl MinioAdminClient {
    /// Create a new admin client.
    pub fn new(params: &ConnectionParams) -> AdminResult<Self> {
        let http_client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .user_agent("xavyo-minio-admin/1.0")
            .build()
            .map_err(|e| AdminError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;

        Self::with_http_client(params, http_client)
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_http_client(params: &ConnectionParams, http_client: Client) -> AdminResult<Self> {
        if params.endpoint.is_empty() {
            return Err(AdminError::InvalidConfig("endpoint must not be empty".to_string()));
        }
        if params.access_key.is_empty() {
            return Err(AdminError::InvalidConfig(
                "access key must not be empty".to_string(),
            ));
        }

        let base_url = Url::parse(&params.base_url()).map_err(|e| {
            AdminError::InvalidConfig(format!("invalid endpoint '{}': {e}", params.endpoint))
        })?;

        Ok(Self {
            base_url,
            access_key: params.access_key.clone(),
            secret_key: params.secret_key.clone(),
            http_client,
        })
    }

    // ── Internal HTTP Methods ─────────────────────────────────────────

    fn admin_url(&self, api: &str, query: &[(&str, &str)]) -> Url {
        let mut url = self.base_url.clone();
        url.set_path(&format!("{ADMIN_PREFIX}/{api}"));
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        url
    }

    async fn execute(
        &self,
        method: Method,
        api: &str,
        query: &[(&str, &str)],
        body: Vec<u8>,
    ) -> AdminResult<()> {
        let url = self.admin_url(api, query);
        debug!(method = %method, api = api, "MinIO admin request");

        let signer = SigV4::minio(&self.access_key, &self.secret_key);
        let headers = signer.sign(method.as_str(), &url, &body, chrono::Utc::now())?;

        let mut builder = self.http_client.request(method, url);
        for (name, value) in headers {
            builder = builder.header(name, value);
        }
        let response = builder.body(body).send().await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            self.handle_error_response(api, response).await
        }
    }

    // ── Response Handling ─────────────────────────────────────────────

    async fn handle_error_response(
        &self,
        api: &str,
        response: reqwest::Response,
    ) -> AdminResult<()> {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());

        let parsed: ErrorResponse = serde_json::from_str(&body).unwrap_or_default();
        let message = if !parsed.message.is_empty() {
            parsed.message.clone()
        } else if !body.is_empty() {
            body
        } else {
            format!("HTTP {status}")
        };

        warn!(api = api, status = %status, code = %parsed.code, "MinIO admin request failed");

        match status {
            StatusCode::NOT_FOUND => Err(AdminError::NotFound(message)),
            StatusCode::CONFLICT => Err(AdminError::Conflict(message)),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(AdminError::AuthError(
                format!("{} ({}): {message}", status.as_u16(), parsed.code),
            )),
            _ => Err(AdminError::Api {
                status: status.as_u16(),
                code: parsed.code,
                message,
            }),
        }
    }
}

#[async_trait]
impl MinioAdmin for MinioAdminClient {
    async fn add_user(&self, access_key: &str, secret_key: &str) -> AdminResult<()> {
        self.set_user(access_key, secret_key, AccountStatus::Enabled)
            .await
    }

    async fn remove_user(&self, access_key: &str) -> AdminResult<()> {
        self.execute(
            Method::DELETE,
            "remove-user",
            &[("accessKey", access_key)],
            Vec::new(),
        )
        .await
    }

    async fn set_user(
        &self,
        access_key: &str,
        secret_key: &str,
        status: AccountStatus,
    ) -> AdminResult<()> {
        let info = serde_json::to_vec(&UserInfo { secret_key, status })?;
        let sealed = encrypt_data(&self.secret_key, &info)?;
        self.execute(
            Method::PUT,
            "add-user",
            &[("accessKey", access_key)],
            sealed,
        )
        .await
    }

    async fn set_policy(
        &self,
        policy_names: &str,
        user_or_group: &str,
        is_group: bool,
    ) -> AdminResult<()> {
        let is_group = if is_group { "true" } else { "false" };
        self.execute(
            Method::PUT,
            "set-user-or-group-policy",
            &[
                ("policyName", policy_names),
                ("userOrGroup", user_or_group),
                ("isGroup", is_group),
            ],
            Vec::new(),
        )
        .await
    }

    async fn add_canned_policy(&self, name: &str, policy: &[u8]) -> AdminResult<()> {
        if policy.is_empty() {
            return Err(AdminError::InvalidConfig(
                "policy document must not be empty".to_string(),
            ));
        }
        self.execute(
            Method::PUT,
            "add-canned-policy",
            &[("name", name)],
            policy.to_vec(),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> MinioAdminClient {
        MinioAdminClient::new(&ConnectionParams::new("h:9000", "root", "rootpw", true)).unwrap()
    }

    #[test]
    fn test_admin_url() {
        let url = client().admin_url("remove-user", &[("accessKey", "v-alice")]);
        assert_eq!(
            url.as_str(),
            "https://h:9000/minio/admin/v3/remove-user?accessKey=v-alice"
        );
    }

    #[test]
    fn test_new_rejects_empty_endpoint() {
        let err = MinioAdminClient::new(&ConnectionParams::new("", "root", "pw", false)).unwrap_err();
        assert!(matches!(err, AdminError::InvalidConfig(_)));
    }

    #[test]
    fn test_debug_omits_secret_key() {
        let rendered = format!("{:?}", client());
        assert!(!rendered.contains("rootpw"));
    }
}
