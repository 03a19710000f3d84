//! Running backend calls under a caller-supplied cancellation token.

use std::future::Future;

use tokio_util::sync::CancellationToken;
use xavyo_minio_admin::AdminResult;

use crate::error::{LifecycleStep, PluginError, PluginResult};

/// Drive `call` to completion unless `cancel` fires first.
///
/// A token that is already cancelled wins without polling `call`, so no
/// request is issued. Backend failures are tagged with `step`.
pub async fn guarded<T, F>(cancel: &CancellationToken, step: LifecycleStep, call: F) -> PluginResult<T>
where
    F: Future<Output = AdminResult<T>>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(PluginError::Cancelled { step }),
        result = call => result.map_err(|source| PluginError::Backend { step, source }),
    }
}
