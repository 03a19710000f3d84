//! Command-line error types and exit codes.

use thiserror::Error;
use xavyo_secrets_minio::PluginError;

/// Exit codes
/// - 0: Success
/// - 1: General error
/// - 2: Configuration error
/// - 3: Invalid request (statements, policies)
/// - 4: Backend error
/// - 130: Cancelled
pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Cannot read configuration file '{path}': {source}")]
    ConfigFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration file: {0}")]
    ConfigFormat(String),

    #[error("Cannot write output: {0}")]
    Output(#[from] serde_json::Error),

    #[error(transparent)]
    Plugin(#[from] PluginError),
}

impl AppError {
    /// Process exit code for this error.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::ConfigFile { .. } | AppError::ConfigFormat(_) => 2,
            AppError::Output(_) => 1,
            AppError::Plugin(e) => match e.error_code() {
                "CONFIGURATION_ERROR" | "NOT_INITIALIZED" => 2,
                "STATEMENT_PARSE_ERROR" | "POLICY_VALIDATION_ERROR" | "SERIALIZATION_ERROR" => 3,
                "BACKEND_ERROR" => 4,
                "CANCELLED" => 130,
                _ => 1,
            },
        }
    }
}
