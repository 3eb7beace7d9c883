// ABOUTME: Error types for provisioning operations.
// ABOUTME: Separates provider failures, timeouts, cancellation and missing history.

use crate::console::ConsoleError;
use crate::params::ParamError;
use crate::template::TemplateError;
use crate::types::DeploymentName;

use super::target::TargetError;

/// Errors that can occur while planning, deploying or querying a deployment.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// A control-plane call on the deployment target failed.
    #[error(transparent)]
    Target(#[from] TargetError),

    /// The control plane finished the deployment in the Failed state.
    #[error("deployment '{name}' failed: {message}")]
    DeploymentFailed {
        name: DeploymentName,
        message: String,
    },

    /// The deployment never became readable after it was written.
    #[error("timed out waiting for deployment '{name}' after {attempts} attempts")]
    Timeout { name: DeploymentName, attempts: u32 },

    /// The operation was cancelled by the caller.
    #[error("operation cancelled")]
    Cancelled,

    /// No prior deployment matches the environment.
    #[error("no deployments found for environment '{env_name}'")]
    NoDeploymentsFound { env_name: String },

    /// The project does not describe a usable target.
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Params(#[from] ParamError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Console(#[from] ConsoleError),
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployErrorKind {
    /// The provider rejected or failed the deployment.
    DeploymentFailed,
    /// Read-after-write retries were exhausted.
    Timeout,
    /// Cancelled by the caller or the user.
    Cancelled,
    /// No prior deployment for the environment.
    NoDeploymentsFound,
    /// Template, parameter or project misconfiguration.
    Configuration,
    /// Any other failure.
    Other,
}

impl DeployError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> DeployErrorKind {
        match self {
            DeployError::DeploymentFailed { .. } => DeployErrorKind::DeploymentFailed,
            DeployError::Target(e) if e.is_deployment_failure() => {
                DeployErrorKind::DeploymentFailed
            }
            DeployError::Target(_) => DeployErrorKind::Other,
            DeployError::Timeout { .. } => DeployErrorKind::Timeout,
            DeployError::Cancelled | DeployError::Console(ConsoleError::Cancelled) => {
                DeployErrorKind::Cancelled
            }
            DeployError::NoDeploymentsFound { .. } => DeployErrorKind::NoDeploymentsFound,
            DeployError::Config(_) | DeployError::Template(_) => DeployErrorKind::Configuration,
            DeployError::Params(ParamError::Console(ConsoleError::Cancelled)) => {
                DeployErrorKind::Cancelled
            }
            DeployError::Params(e) if e.is_configuration() => DeployErrorKind::Configuration,
            DeployError::Params(_) | DeployError::Console(_) => DeployErrorKind::Other,
        }
    }
}
