// ABOUTME: Application-wide error types for terrane.
// ABOUTME: Maps every module error onto the exit semantics callers act on.

use std::path::PathBuf;
use thiserror::Error;

use crate::console::ConsoleError;
use crate::control_plane::ControlPlaneError;
use crate::deploy::{DeployError, DeployErrorKind};
use crate::destroy::DestroyError;
use crate::params::ParamError;
use crate::store::StoreError;
use crate::template::TemplateError;
use crate::types::EnvNameError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration file not found in {0}")]
    ConfigNotFound(PathBuf),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid environment name: {0}")]
    EnvName(#[from] EnvNameError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Params(#[from] ParamError),

    #[error(transparent)]
    Deploy(#[from] DeployError),

    #[error(transparent)]
    Destroy(#[from] DestroyError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    ControlPlane(#[from] ControlPlaneError),

    #[error(transparent)]
    Console(#[from] ConsoleError),
}

/// Outcome classes surfaced to whoever invoked the operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A confirmation was declined.
    UserDenied,
    /// The provider failed the deployment.
    DeploymentFailed,
    /// Timed out waiting for a deployment to become readable.
    Timeout,
    /// No deployment exists for the environment.
    NoDeploymentsFound,
    /// Project, template or parameter misconfiguration.
    Configuration,
    /// Cancelled by the user or the caller.
    Cancelled,
    Other,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ConfigNotFound(_)
            | Error::InvalidConfig(_)
            | Error::Yaml(_)
            | Error::EnvName(_)
            | Error::Template(_) => ErrorKind::Configuration,
            Error::Params(ParamError::Console(ConsoleError::Cancelled)) => ErrorKind::Cancelled,
            Error::Params(e) if e.is_configuration() => ErrorKind::Configuration,
            Error::Deploy(e) => deploy_kind(e),
            Error::Destroy(e) if e.is_user_denied() => ErrorKind::UserDenied,
            Error::Destroy(e) if e.is_cancelled() => ErrorKind::Cancelled,
            Error::Destroy(DestroyError::Lookup(e)) => deploy_kind(e),
            Error::Console(ConsoleError::Cancelled) => ErrorKind::Cancelled,
            _ => ErrorKind::Other,
        }
    }
}

fn deploy_kind(error: &DeployError) -> ErrorKind {
    match error.kind() {
        DeployErrorKind::DeploymentFailed => ErrorKind::DeploymentFailed,
        DeployErrorKind::Timeout => ErrorKind::Timeout,
        DeployErrorKind::Cancelled => ErrorKind::Cancelled,
        DeployErrorKind::NoDeploymentsFound => ErrorKind::NoDeploymentsFound,
        DeployErrorKind::Configuration => ErrorKind::Configuration,
        DeployErrorKind::Other => ErrorKind::Other,
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destroy_denial_is_user_denied() {
        assert_eq!(Error::from(DestroyError::UserDenied).kind(), ErrorKind::UserDenied);
    }

    #[test]
    fn missing_history_is_distinct() {
        let err = Error::from(DestroyError::Lookup(DeployError::NoDeploymentsFound {
            env_name: "dev".into(),
        }));
        assert_eq!(err.kind(), ErrorKind::NoDeploymentsFound);
    }

    #[test]
    fn cancelled_prompt_is_cancelled() {
        assert_eq!(
            Error::from(ParamError::Console(ConsoleError::Cancelled)).kind(),
            ErrorKind::Cancelled
        );
        assert_eq!(
            Error::from(ParamError::DependencyCycle { path: "a -> a".into() }).kind(),
            ErrorKind::Configuration
        );
    }
}
