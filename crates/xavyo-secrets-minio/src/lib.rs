//! # MinIO Dynamic Credentials
//!
//! Credential plugin that creates, rotates and removes MinIO users on behalf
//! of a secrets host and binds each user to exactly the policies its
//! request asks for.
//!
//! A request carries statements (JSON) that either name existing policies
//! (`SetPolicy`) or ship full policy documents to register first
//! (`EnsurePolicy`). Documents are validated, registered as canned
//! policies, and the resulting names are bound to the user in request order.
//!
//! ## Example
//!
//! ```ignore
//! use tokio_util::sync::CancellationToken;
//! use xavyo_secrets_minio::{build_plugin, Database, InitializeRequest, NewUserRequest};
//!
//! let plugin = build_plugin();
//! plugin.initialize(InitializeRequest { config, verify_connection: true }).await?;
//!
//! let cancel = CancellationToken::new();
//! let created = plugin
//!     .new_user(
//!         NewUserRequest {
//!             username_config: UsernameMetadata::new("alice", "ro"),
//!             statements: vec![r#"{"SetPolicy":["readonly"]}"#.to_string()],
//!             password: generated_password,
//!         },
//!         &cancel,
//!     )
//!     .await?;
//! ```
//!
//! ## Crate Organization
//!
//! - [`database`] - The [`Database`] contract and [`MinioDatabase`] lifecycle
//! - [`config`] - Validated configuration and the snapshot store
//! - [`factory`] - Admin client construction
//! - [`template`] - Username generation
//! - [`statement`] - Statement parsing
//! - [`policy`] - Policy documents and validation
//! - [`reconcile`] - Policy registration and binding list
//! - [`sanitizer`] - Secret scrubbing for errors
//! - [`error`] - Error types

pub mod cancel;
pub mod config;
pub mod database;
pub mod error;
pub mod factory;
pub mod policy;
pub mod reconcile;
pub mod sanitizer;
pub mod statement;
pub mod template;

pub use config::{ConfigSnapshot, ConfigStore, MinioConfig};
pub use database::{
    ChangePassword, Database, DeleteUserRequest, DeleteUserResponse, InitializeRequest,
    InitializeResponse, MinioDatabase, NewUserRequest, NewUserResponse, UpdateUserRequest,
    UpdateUserResponse,
};
pub use error::{LifecycleStep, PluginError, PluginResult, StatementFailure, StatementParseError};
pub use factory::{ClientFactory, HttpClientFactory};
pub use policy::{Effect, PolicyDocument, PolicyStatement};
pub use reconcile::reconcile_policies;
pub use sanitizer::ErrorSanitizer;
pub use statement::{parse_statements, EnsurePolicy, MinioStatement};
pub use template::{UsernameMetadata, UsernameTemplate, DEFAULT_USERNAME_TEMPLATE};

/// The plugin as served to a host: [`MinioDatabase`] behind the
/// [`ErrorSanitizer`].
#[must_use]
pub fn build_plugin() -> ErrorSanitizer<MinioDatabase> {
    ErrorSanitizer::new(MinioDatabase::new())
}
