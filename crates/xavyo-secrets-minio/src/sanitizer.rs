//! Error-sanitizing middleware for [`Database`] implementations.
//!
//! Errors can echo backend responses or configuration values verbatim. The
//! wrapper captures the live values of the secret configuration fields
//! named by [`Database::secret_values`] and replaces them with their
//! placeholders in every error it returns.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::database::{
    Database, DeleteUserRequest, DeleteUserResponse, InitializeRequest, InitializeResponse,
    NewUserRequest, NewUserResponse, UpdateUserRequest, UpdateUserResponse,
};
use crate::error::{PluginError, PluginResult};

/// `(secret value, placeholder)` pairs.
type Secrets = Vec<(String, String)>;

/// Wraps a [`Database`] and scrubs secret values from its errors.
#[derive(Debug)]
pub struct ErrorSanitizer<D> {
    inner: D,
    secrets: RwLock<Secrets>,
}

impl<D: Database> ErrorSanitizer<D> {
    pub fn new(inner: D) -> Self {
        Self {
            inner,
            secrets: RwLock::new(Vec::new()),
        }
    }

    /// The wrapped database.
    pub fn inner(&self) -> &D {
        &self.inner
    }

    fn collect_secrets(&self, config: &Map<String, Value>) -> Secrets {
        self.inner
            .secret_values()
            .into_iter()
            .filter_map(|(field, placeholder)| match config.get(&field) {
                Some(Value::String(value)) if !value.is_empty() => {
                    Some((value.clone(), placeholder))
                }
                _ => None,
            })
            .collect()
    }

    async fn sanitize<T>(&self, result: PluginResult<T>) -> PluginResult<T> {
        match result {
            Ok(value) => Ok(value),
            Err(err) => Err(scrub(err, &self.secrets.read().await)),
        }
    }
}

/// Replace every secret in `err`'s message with its placeholder.
///
/// Errors that contain no secret are returned untouched.
fn scrub(err: PluginError, secrets: &[(String, String)]) -> PluginError {
    let message = err.to_string();
    let mut redacted = message.clone();
    for (secret, placeholder) in secrets {
        redacted = redacted.replace(secret.as_str(), placeholder);
    }

    if redacted == message {
        err
    } else {
        PluginError::Redacted {
            code: err.error_code(),
            step: err.step(),
            message: redacted,
        }
    }
}

#[async_trait]
impl<D: Database> Database for ErrorSanitizer<D> {
    fn type_name(&self) -> &'static str {
        self.inner.type_name()
    }

    fn secret_values(&self) -> BTreeMap<String, String> {
        self.inner.secret_values()
    }

    async fn initialize(&self, request: InitializeRequest) -> PluginResult<InitializeResponse> {
        let incoming = self.collect_secrets(&request.config);

        match self.inner.initialize(request).await {
            Ok(response) => {
                *self.secrets.write().await = incoming;
                Ok(response)
            }
            Err(err) => {
                let mut secrets = self.secrets.read().await.clone();
                secrets.extend(incoming);
                Err(scrub(err, &secrets))
            }
        }
    }

    async fn new_user(
        &self,
        request: NewUserRequest,
        cancel: &CancellationToken,
    ) -> PluginResult<NewUserResponse> {
        let result = self.inner.new_user(request, cancel).await;
        self.sanitize(result).await
    }

    async fn update_user(
        &self,
        request: UpdateUserRequest,
        cancel: &CancellationToken,
    ) -> PluginResult<UpdateUserResponse> {
        let result = self.inner.update_user(request, cancel).await;
        self.sanitize(result).await
    }

    async fn delete_user(
        &self,
        request: DeleteUserRequest,
        cancel: &CancellationToken,
    ) -> PluginResult<DeleteUserResponse> {
        let result = self.inner.delete_user(request, cancel).await;
        self.sanitize(result).await
    }

    async fn close(&self) -> PluginResult<()> {
        let result = self.inner.close().await;
        self.sanitize(result).await
    }
}
