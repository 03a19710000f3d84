//! Error types for the MinIO credential engine.

use std::fmt;

use thiserror::Error;
use xavyo_minio_admin::AdminError;

/// Step of a lifecycle operation, carried by errors so callers can tell
/// which part of the protocol failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleStep {
    BuildClient,
    ParseStatements,
    ReconcilePolicies,
    CreateUser,
    BindPolicies,
    RotatePassword,
    RemoveUser,
}

impl LifecycleStep {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleStep::BuildClient => "build client",
            LifecycleStep::ParseStatements => "parse statements",
            LifecycleStep::ReconcilePolicies => "reconcile policies",
            LifecycleStep::CreateUser => "create user",
            LifecycleStep::BindPolicies => "bind policies",
            LifecycleStep::RotatePassword => "rotate password",
            LifecycleStep::RemoveUser => "remove user",
        }
    }
}

impl fmt::Display for LifecycleStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single statement that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementFailure {
    /// Zero-based position of the statement in the request.
    pub index: usize,
    pub message: String,
}

/// Every decode failure from one batch of statements.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to parse {} statement(s): {}", .failures.len(), render_failures(.failures))]
pub struct StatementParseError {
    pub failures: Vec<StatementFailure>,
}

impl StatementParseError {
    /// Indexes of the statements that failed, in request order.
    #[must_use]
    pub fn failed_indexes(&self) -> Vec<usize> {
        self.failures.iter().map(|f| f.index).collect()
    }
}

fn render_failures(failures: &[StatementFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("statement {}: {}", f.index, f.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Error returned by plugin operations.
#[derive(Debug, Error)]
pub enum PluginError {
    /// Missing or mistyped configuration, unparseable URL, or a broken
    /// username template.
    #[error("configuration error: {message}")]
    Configuration {
        field: Option<String>,
        message: String,
    },

    /// One or more request statements are malformed.
    #[error(transparent)]
    StatementParse(#[from] StatementParseError),

    /// A policy document (or its name) failed structural validation.
    #[error("invalid policy '{name}': {message}")]
    PolicyValidation { name: String, message: String },

    /// A validated policy document could not be serialized.
    #[error("failed to serialize policy '{name}': {source}")]
    Serialization {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    /// The admin backend rejected or failed a call.
    #[error("{step} failed: {source}")]
    Backend {
        step: LifecycleStep,
        #[source]
        source: AdminError,
    },

    /// The caller cancelled the operation.
    #[error("{step} cancelled")]
    Cancelled { step: LifecycleStep },

    /// A lifecycle operation ran before `initialize`.
    #[error("plugin is not initialized")]
    NotInitialized,

    /// An error whose message contained secret material and was rewritten.
    #[error("{message}")]
    Redacted {
        code: &'static str,
        step: Option<LifecycleStep>,
        message: String,
    },
}

impl PluginError {
    /// Configuration error attributed to a specific field.
    pub fn config_field(field: &str, message: impl Into<String>) -> Self {
        PluginError::Configuration {
            field: Some(field.to_string()),
            message: format!("'{field}': {}", message.into()),
        }
    }

    /// The offending configuration field, if any.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            PluginError::Configuration { field, .. } => field.as_deref(),
            _ => None,
        }
    }

    /// The lifecycle step that failed, if any.
    #[must_use]
    pub fn step(&self) -> Option<LifecycleStep> {
        match self {
            PluginError::Backend { step, .. } | PluginError::Cancelled { step } => Some(*step),
            PluginError::Redacted { step, .. } => *step,
            PluginError::StatementParse(_) => Some(LifecycleStep::ParseStatements),
            PluginError::PolicyValidation { .. } | PluginError::Serialization { .. } => {
                Some(LifecycleStep::ReconcilePolicies)
            }
            _ => None,
        }
    }

    /// Check if the underlying failure may succeed on retry.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            PluginError::Backend { source, .. } => source.is_transient(),
            _ => false,
        }
    }

    /// Get error code for logging/metrics.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            PluginError::Configuration { .. } => "CONFIGURATION_ERROR",
            PluginError::StatementParse(_) => "STATEMENT_PARSE_ERROR",
            PluginError::PolicyValidation { .. } => "POLICY_VALIDATION_ERROR",
            PluginError::Serialization { .. } => "SERIALIZATION_ERROR",
            PluginError::Backend { .. } => "BACKEND_ERROR",
            PluginError::Cancelled { .. } => "CANCELLED",
            PluginError::NotInitialized => "NOT_INITIALIZED",
            PluginError::Redacted { code, .. } => *code,
        }
    }
}

/// Result type for plugin operations.
pub type PluginResult<T> = Result<T, PluginError>;
