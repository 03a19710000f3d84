//! Turning parsed statements into registered policies and a binding list.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use xavyo_minio_admin::MinioAdmin;

use crate::cancel::guarded;
use crate::error::{LifecycleStep, PluginError, PluginResult};
use crate::statement::{EnsurePolicy, MinioStatement};

/// Register every `EnsurePolicy` document and return the names to bind.
///
/// Statements are processed in order; within a statement, `EnsurePolicy`
/// entries come first, then `SetPolicy` names. Names are neither reordered
/// nor deduplicated. The first failure aborts; policies registered before
/// it are left in place since registration is an idempotent upsert.
pub async fn reconcile_policies(
    admin: &dyn MinioAdmin,
    statements: &[MinioStatement],
    cancel: &CancellationToken,
) -> PluginResult<Vec<String>> {
    let mut policies = Vec::new();

    for statement in statements {
        for entry in &statement.ensure_policy {
            let document = validated_document(entry)?;
            guarded(
                cancel,
                LifecycleStep::ReconcilePolicies,
                admin.add_canned_policy(&entry.name, &document),
            )
            .await?;
            info!(policy = %entry.name, "Registered canned policy");
            policies.push(entry.name.clone());
        }

        policies.extend(statement.set_policy.iter().cloned());
    }

    debug!(policies = ?policies, "Reconciled policy list");
    Ok(policies)
}

/// Validate an entry and serialize its document to wire form.
fn validated_document(entry: &EnsurePolicy) -> PluginResult<Vec<u8>> {
    let invalid = |message: String| PluginError::PolicyValidation {
        name: entry.name.clone(),
        message,
    };

    if entry.name.is_empty() {
        return Err(invalid("policy name must not be empty".to_string()));
    }
    if entry.name.contains(',') {
        return Err(invalid("policy name must not contain ','".to_string()));
    }
    entry
        .policy
        .validate()
        .map_err(|e| invalid(e.to_string()))?;

    serde_json::to_vec(&entry.policy).map_err(|source| PluginError::Serialization {
        name: entry.name.clone(),
        source,
    })
}
