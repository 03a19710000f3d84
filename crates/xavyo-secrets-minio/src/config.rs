//! Plugin configuration and the snapshot store shared by lifecycle operations.

use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::RwLock;
use url::Url;

use crate::error::{PluginError, PluginResult};
use crate::template::{UsernameTemplate, DEFAULT_USERNAME_TEMPLATE};

/// Configuration keys.
pub mod keys {
    pub const URL: &str = "url";
    pub const USERNAME: &str = "username";
    pub const PASSWORD: &str = "password";
    pub const USERNAME_TEMPLATE: &str = "username_template";
}

/// Validated connection and template configuration.
#[derive(Clone)]
pub struct MinioConfig {
    /// Admin endpoint, e.g. `https://minio.internal:9000`.
    pub url: Url,
    /// Admin access key.
    pub username: String,
    /// Admin secret key.
    pub password: String,
    /// Custom username template; `None` selects the default.
    pub username_template: Option<String>,
}

impl std::fmt::Debug for MinioConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MinioConfig")
            .field("url", &self.url.as_str())
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("username_template", &self.username_template)
            .finish()
    }
}

impl MinioConfig {
    /// Build from the raw map supplied by the host.
    ///
    /// `url`, `username` and `password` must be present and be strings;
    /// `username_template` is optional, and an empty one selects the default.
    pub fn from_map(raw: &Map<String, Value>) -> PluginResult<Self> {
        let url = required_string(raw, keys::URL)?;
        let username = required_string(raw, keys::USERNAME)?;
        let password = required_string(raw, keys::PASSWORD)?;

        let username_template = match raw.get(keys::USERNAME_TEMPLATE) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.is_empty() => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => {
                return Err(PluginError::config_field(
                    keys::USERNAME_TEMPLATE,
                    "must be a string",
                ))
            }
        };

        let url = Url::parse(&url)
            .map_err(|e| PluginError::config_field(keys::URL, format!("invalid URL: {e}")))?;

        Ok(Self {
            url,
            username,
            password,
            username_template,
        })
    }

    /// Template source in effect.
    #[must_use]
    pub fn template_source(&self) -> &str {
        self.username_template
            .as_deref()
            .unwrap_or(DEFAULT_USERNAME_TEMPLATE)
    }

    /// Whether the admin endpoint is reached over TLS.
    #[must_use]
    pub fn secure(&self) -> bool {
        self.url.scheme() == "https"
    }
}

fn required_string(raw: &Map<String, Value>, key: &str) -> PluginResult<String> {
    match raw.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(PluginError::config_field(key, "must be a string")),
        None => Err(PluginError::config_field(key, "is required")),
    }
}

/// Everything a lifecycle operation needs from configuration, immutable
/// once built.
#[derive(Debug)]
pub struct ConfigSnapshot {
    pub config: MinioConfig,
    pub template: UsernameTemplate,
    /// Configuration exactly as supplied by the host.
    pub raw: Map<String, Value>,
}

/// Holds the active [`ConfigSnapshot`].
///
/// Initialisation replaces the whole snapshot under the write lock.
/// Readers hold the read lock only long enough to clone the `Arc`, so
/// in-flight operations keep the snapshot they started with.
#[derive(Debug, Default)]
pub struct ConfigStore {
    current: RwLock<Option<Arc<ConfigSnapshot>>>,
}

impl ConfigStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `snapshot`, returning the one it replaced.
    pub async fn install(&self, snapshot: Arc<ConfigSnapshot>) -> Option<Arc<ConfigSnapshot>> {
        let mut current = self.current.write().await;
        current.replace(snapshot)
    }

    /// The active snapshot.
    pub async fn snapshot(&self) -> PluginResult<Arc<ConfigSnapshot>> {
        self.current
            .read()
            .await
            .clone()
            .ok_or(PluginError::NotInitialized)
    }

    pub async fn is_initialized(&self) -> bool {
        self.current.read().await.is_some()
    }
}
