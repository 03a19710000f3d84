//! Host-facing database contract and the MinIO identity lifecycle.
//!
//! Create is a two-phase operation: the user is added, then the reconciled
//! policy list is bound. If binding fails the user is removed again on a
//! best-effort basis. There is no atomicity across the two phases; a crash
//! or a failed removal leaves an unbound user behind, which is logged with
//! its username.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use xavyo_minio_admin::{AccountStatus, MinioAdmin};

use crate::cancel::guarded;
use crate::config::{ConfigSnapshot, ConfigStore, MinioConfig};
use crate::error::{LifecycleStep, PluginError, PluginResult};
use crate::factory::{build_client, ClientFactory, HttpClientFactory};
use crate::reconcile::reconcile_policies;
use crate::statement::parse_statements;
use crate::template::{UsernameMetadata, UsernameTemplate};

/// Name reported by [`Database::type_name`].
pub const TYPE_NAME: &str = "minio";

// ── Requests / Responses ──────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InitializeRequest {
    /// Raw configuration supplied by the host.
    pub config: Map<String, Value>,
    /// Also build an admin client to check the connection settings.
    #[serde(default)]
    pub verify_connection: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InitializeResponse {
    /// The accepted configuration, echoed back for the host to persist.
    pub config: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewUserRequest {
    pub username_config: UsernameMetadata,
    /// Creation statements, each a JSON document.
    #[serde(default)]
    pub statements: Vec<String>,
    pub password: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUserResponse {
    pub username: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUserRequest {
    pub username: String,
    #[serde(default)]
    pub password: Option<ChangePassword>,
}

/// A password rotation and the statements to apply with it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChangePassword {
    pub new_password: String,
    #[serde(default)]
    pub statements: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateUserResponse {}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeleteUserRequest {
    pub username: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteUserResponse {}

// ── Database trait ────────────────────────────────────────────────────

/// Operations a secrets host invokes on a credential plugin.
///
/// Lifecycle operations take a cancellation token that is propagated into
/// every backend call they make.
#[async_trait]
pub trait Database: Send + Sync {
    /// Plugin type name.
    fn type_name(&self) -> &'static str;

    /// Response fields the host must redact before logging, mapped to
    /// their placeholder.
    fn secret_values(&self) -> BTreeMap<String, String>;

    /// Validate and install configuration.
    async fn initialize(&self, request: InitializeRequest) -> PluginResult<InitializeResponse>;

    /// Create a user bound to the requested policies.
    async fn new_user(
        &self,
        request: NewUserRequest,
        cancel: &CancellationToken,
    ) -> PluginResult<NewUserResponse>;

    /// Rotate a user's password.
    async fn update_user(
        &self,
        request: UpdateUserRequest,
        cancel: &CancellationToken,
    ) -> PluginResult<UpdateUserResponse>;

    /// Remove a user.
    async fn delete_user(
        &self,
        request: DeleteUserRequest,
        cancel: &CancellationToken,
    ) -> PluginResult<DeleteUserResponse>;

    /// Release resources.
    async fn close(&self) -> PluginResult<()>;
}

// ── MinioDatabase ─────────────────────────────────────────────────────

/// MinIO implementation of [`Database`].
pub struct MinioDatabase {
    store: ConfigStore,
    factory: Arc<dyn ClientFactory>,
}

impl Default for MinioDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MinioDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MinioDatabase")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl MinioDatabase {
    /// Create a database that talks to MinIO over HTTP.
    #[must_use]
    pub fn new() -> Self {
        Self::with_factory(Arc::new(HttpClientFactory))
    }

    /// Create a database using `factory` to build admin clients.
    #[must_use]
    pub fn with_factory(factory: Arc<dyn ClientFactory>) -> Self {
        Self {
            store: ConfigStore::new(),
            factory,
        }
    }

    /// The configuration store.
    #[must_use]
    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    fn client(&self, config: &MinioConfig) -> PluginResult<Arc<dyn MinioAdmin>> {
        build_client(self.factory.as_ref(), config)
    }

    /// Parse `statements` and register/collect their policies.
    async fn reconcile(
        &self,
        client: &dyn MinioAdmin,
        statements: &[String],
        cancel: &CancellationToken,
    ) -> PluginResult<Vec<String>> {
        let parsed = parse_statements(statements)?;
        reconcile_policies(client, &parsed, cancel).await
    }

    /// Best-effort removal of a user whose policy binding failed.
    ///
    /// Failures are logged, never returned.
    async fn compensate(&self, client: &dyn MinioAdmin, username: &str, cancel: &CancellationToken) {
        if cancel.is_cancelled() {
            warn!(
                username = %username,
                "Operation cancelled after user creation, user left without policies"
            );
            return;
        }

        match guarded(cancel, LifecycleStep::RemoveUser, client.remove_user(username)).await {
            Ok(()) => info!(username = %username, "Removed user after failed policy binding"),
            Err(e) => warn!(
                username = %username,
                error = %e,
                "Failed to remove user after failed policy binding, user left without policies"
            ),
        }
    }
}

#[async_trait]
impl Database for MinioDatabase {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn secret_values(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("secretKey".to_string(), "[SecretKey]".to_string()),
            ("password".to_string(), "[Password]".to_string()),
        ])
    }

    #[instrument(skip(self, request), fields(verify_connection = request.verify_connection))]
    async fn initialize(&self, request: InitializeRequest) -> PluginResult<InitializeResponse> {
        let config = MinioConfig::from_map(&request.config)?;

        let template = UsernameTemplate::compile(config.template_source())?;
        template
            .generate(&UsernameMetadata::default())
            .map_err(|e| {
                PluginError::config_field(
                    crate::config::keys::USERNAME_TEMPLATE,
                    format!("template failed self-test: {e}"),
                )
            })?;

        if request.verify_connection {
            self.client(&config)?;
        }

        let endpoint = config.url.to_string();
        let snapshot = Arc::new(ConfigSnapshot {
            config,
            template,
            raw: request.config,
        });
        let replaced = self.store.install(Arc::clone(&snapshot)).await;

        info!(
            endpoint = %endpoint,
            reinitialized = replaced.is_some(),
            "MinIO plugin initialized"
        );

        Ok(InitializeResponse {
            config: snapshot.raw.clone(),
        })
    }

    #[instrument(
        skip(self, request, cancel),
        fields(
            display_name = %request.username_config.display_name,
            role_name = %request.username_config.role_name,
            username = tracing::field::Empty,
        )
    )]
    async fn new_user(
        &self,
        request: NewUserRequest,
        cancel: &CancellationToken,
    ) -> PluginResult<NewUserResponse> {
        let snapshot = self.store.snapshot().await?;

        let username = snapshot.template.generate(&request.username_config)?;
        tracing::Span::current().record("username", username.as_str());

        let client = self.client(&snapshot.config)?;
        let policies = self
            .reconcile(client.as_ref(), &request.statements, cancel)
            .await?;

        guarded(
            cancel,
            LifecycleStep::CreateUser,
            client.add_user(&username, &request.password),
        )
        .await?;
        debug!("User created");

        let policy_list = policies.join(",");
        if let Err(e) = guarded(
            cancel,
            LifecycleStep::BindPolicies,
            client.set_policy(&policy_list, &username, false),
        )
        .await
        {
            warn!(policies = %policy_list, error = %e, "Policy binding failed, removing user");
            self.compensate(client.as_ref(), &username, cancel).await;
            return Err(e);
        }

        info!(policies = %policy_list, "User created with policies");
        Ok(NewUserResponse { username })
    }

    #[instrument(skip(self, request, cancel), fields(username = %request.username))]
    async fn update_user(
        &self,
        request: UpdateUserRequest,
        cancel: &CancellationToken,
    ) -> PluginResult<UpdateUserResponse> {
        let snapshot = self.store.snapshot().await?;

        let Some(change) = request.password else {
            debug!("No password change requested");
            return Ok(UpdateUserResponse::default());
        };

        let client = self.client(&snapshot.config)?;
        let policies = self
            .reconcile(client.as_ref(), &change.statements, cancel)
            .await?;

        guarded(
            cancel,
            LifecycleStep::RotatePassword,
            client.set_user(&request.username, &change.new_password, AccountStatus::Enabled),
        )
        .await?;

        if !policies.is_empty() {
            let policy_list = policies.join(",");
            guarded(
                cancel,
                LifecycleStep::BindPolicies,
                client.set_policy(&policy_list, &request.username, false),
            )
            .await?;
            debug!(policies = %policy_list, "Policies rebound");
        }

        info!("User password rotated");
        Ok(UpdateUserResponse::default())
    }

    #[instrument(skip(self, request, cancel), fields(username = %request.username))]
    async fn delete_user(
        &self,
        request: DeleteUserRequest,
        cancel: &CancellationToken,
    ) -> PluginResult<DeleteUserResponse> {
        let snapshot = self.store.snapshot().await?;
        let client = self.client(&snapshot.config)?;

        guarded(
            cancel,
            LifecycleStep::RemoveUser,
            client.remove_user(&request.username),
        )
        .await?;

        info!("User removed");
        Ok(DeleteUserResponse::default())
    }

    async fn close(&self) -> PluginResult<()> {
        debug!("MinIO plugin closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(config: Value) -> InitializeRequest {
        InitializeRequest {
            config: serde_json::from_value(config).unwrap(),
            verify_connection: false,
        }
    }

    #[test]
    fn test_type_and_secret_values() {
        let db = MinioDatabase::new();
        assert_eq!(db.type_name(), "minio");
        let secrets = db.secret_values();
        assert_eq!(secrets["secretKey"], "[SecretKey]");
        assert_eq!(secrets["password"], "[Password]");
    }

    #[tokio::test]
    async fn test_initialize_echoes_config() {
        let db = MinioDatabase::new();
        let config = json!({
            "url": "https://h:9000",
            "username": "root",
            "password": "rootpw",
            "extra": true
        });
        let response = db.initialize(request(config.clone())).await.unwrap();
        let installed = db.store().snapshot().await.unwrap();
        assert_eq!(installed.raw, response.config);
        assert_eq!(Value::Object(response.config), config);
    }

    #[tokio::test]
    async fn test_initialize_with_connection_check() {
        let db = MinioDatabase::new();
        let mut req = request(json!({
            "url": "https://h:9000",
            "username": "root",
            "password": "rootpw"
        }));
        req.verify_connection = true;
        assert!(db.initialize(req).await.is_ok());
    }

    #[tokio::test]
    async fn test_broken_template_is_not_installed() {
        let db = MinioDatabase::new();
        let err = db
            .initialize(request(json!({
                "url": "https://h:9000",
                "username": "root",
                "password": "rootpw",
                "username_template": "{{nope}}"
            })))
            .await
            .unwrap_err();
        assert_eq!(err.field(), Some("username_template"));
        assert!(!db.store().is_initialized().await);
    }

    #[tokio::test]
    async fn test_operations_require_initialization() {
        let db = MinioDatabase::new();
        let cancel = CancellationToken::new();
        let err = db
            .delete_user(
                DeleteUserRequest {
                    username: "v-alice".to_string(),
                },
                &cancel,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PluginError::NotInitialized));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let db = MinioDatabase::new();
        assert!(db.close().await.is_ok());
        assert!(db.close().await.is_ok());
    }
}
