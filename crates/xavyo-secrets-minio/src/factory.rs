//! Admin client construction.
//!
//! A fresh client is built for every lifecycle operation; connection reuse
//! is left to the HTTP layer.

use std::sync::Arc;

use xavyo_minio_admin::{AdminResult, ConnectionParams, MinioAdmin, MinioAdminClient};

use crate::config::{keys, MinioConfig};
use crate::error::{LifecycleStep, PluginError, PluginResult};

/// Builds admin clients from connection parameters.
pub trait ClientFactory: Send + Sync {
    fn connect(&self, params: &ConnectionParams) -> AdminResult<Arc<dyn MinioAdmin>>;
}

/// Builds [`MinioAdminClient`]s over HTTP.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpClientFactory;

impl ClientFactory for HttpClientFactory {
    fn connect(&self, params: &ConnectionParams) -> AdminResult<Arc<dyn MinioAdmin>> {
        Ok(Arc::new(MinioAdminClient::new(params)?))
    }
}

/// Derive connection parameters from configuration.
///
/// The endpoint is `host[:port]` of `url`; an `https` scheme selects TLS.
pub fn connection_params(config: &MinioConfig) -> PluginResult<ConnectionParams> {
    let host = config
        .url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| PluginError::config_field(keys::URL, "URL has no host"))?;

    let endpoint = match config.url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };

    Ok(ConnectionParams::new(
        endpoint,
        config.username.clone(),
        config.password.clone(),
        config.secure(),
    ))
}

/// Build a client for `config` with `factory`.
pub fn build_client(
    factory: &dyn ClientFactory,
    config: &MinioConfig,
) -> PluginResult<Arc<dyn MinioAdmin>> {
    let params = connection_params(config)?;
    factory.connect(&params).map_err(|source| PluginError::Backend {
        step: LifecycleStep::BuildClient,
        source,
    })
}
