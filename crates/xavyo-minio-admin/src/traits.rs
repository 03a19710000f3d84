//! Admin API capability trait.

use async_trait::async_trait;

use crate::error::AdminResult;
use crate::types::AccountStatus;

/// Operations the credential engine needs from a MinIO deployment.
///
/// Every call is a single remote request. Implementations must not retry
/// internally; cancellation happens by dropping the returned future.
#[async_trait]
pub trait MinioAdmin: Send + Sync {
    /// Create a user with the given access key and secret key.
    ///
    /// The account is created enabled.
    async fn add_user(&self, access_key: &str, secret_key: &str) -> AdminResult<()>;

    /// Remove a user.
    async fn remove_user(&self, access_key: &str) -> AdminResult<()>;

    /// Overwrite the secret key and status of an existing user.
    async fn set_user(
        &self,
        access_key: &str,
        secret_key: &str,
        status: AccountStatus,
    ) -> AdminResult<()>;

    /// Bind a comma-separated list of canned policies to a user or group.
    async fn set_policy(
        &self,
        policy_names: &str,
        user_or_group: &str,
        is_group: bool,
    ) -> AdminResult<()>;

    /// Register (or overwrite) a canned policy under `name`.
    ///
    /// `policy` is the JSON policy document.
    async fn add_canned_policy(&self, name: &str, policy: &[u8]) -> AdminResult<()>;
}
