// ABOUTME: Error types returned by control-plane implementations.
// ABOUTME: NotFound is kept distinct so callers can retry or skip on it.

/// Errors from control-plane calls.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ControlPlaneError {
    /// The addressed deployment, group or resource does not exist (yet).
    #[error("not found: {0}")]
    NotFound(String),

    /// The control plane rejected or failed the deployment.
    #[error("deployment failed: {0}")]
    DeploymentFailed(String),

    /// The request failed for any other reason.
    #[error("request failed: {0}")]
    Request(String),
}

impl ControlPlaneError {
    /// True for the "does not exist" condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ControlPlaneError::NotFound(_))
    }
}
