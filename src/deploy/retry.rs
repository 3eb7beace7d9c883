// ABOUTME: Read-after-write retry for freshly written deployments.
// ABOUTME: Retries only "not found", with exponential backoff and cancellation.

use crate::config::RetryConfig;
use crate::control_plane::{DeploymentOps, DeploymentRecord};

use super::cancel::CancelToken;
use super::error::DeployError;
use super::target::DeploymentTarget;

/// Read the deployment back, waiting out control-plane lag.
///
/// "Not found" is retried up to `retry.max_attempts` calls in total; any
/// other error aborts at once. Exhausting the attempts is a timeout.
pub async fn get_after_write<D>(
    target: &DeploymentTarget,
    ops: &D,
    retry: &RetryConfig,
    cancel: &CancelToken,
) -> Result<DeploymentRecord, DeployError>
where
    D: DeploymentOps + ?Sized,
{
    let mut cancel = cancel.clone();
    let attempts = retry.max_attempts.max(1);

    for attempt in 1..=attempts {
        if cancel.is_cancelled() {
            return Err(DeployError::Cancelled);
        }

        match target.get_deployment(ops).await {
            Ok(record) => return Ok(record),
            Err(e) if e.is_not_found() => {
                tracing::debug!(deployment = %target.name(), attempt, "deployment not visible yet");
            }
            Err(e) => return Err(e.into()),
        }

        if attempt == attempts {
            break;
        }

        tokio::select! {
            _ = tokio::time::sleep(retry.delay_for(attempt)) => {}
            _ = cancel.cancelled() => return Err(DeployError::Cancelled),
        }
    }

    Err(DeployError::Timeout {
        name: target.name().clone(),
        attempts,
    })
}
