// ABOUTME: Error types for tearing down an environment.
// ABOUTME: Hard provider failures name the group or resource involved.

use crate::console::ConsoleError;
use crate::control_plane::{ControlPlaneError, SoftDeleteKind};
use crate::deploy::{DeployError, DeployErrorKind};
use crate::types::ResourceGroupName;

/// Errors that can occur while destroying an environment.
#[derive(Debug, thiserror::Error)]
pub enum DestroyError {
    /// Locating the prior deployment failed.
    #[error(transparent)]
    Lookup(#[from] DeployError),

    #[error("failed to list resources of group '{group}': {source}")]
    ListResources {
        group: ResourceGroupName,
        source: ControlPlaneError,
    },

    #[error("failed to read soft-delete settings of {kind} '{name}': {source}")]
    Inspect {
        kind: SoftDeleteKind,
        name: String,
        source: ControlPlaneError,
    },

    #[error("failed to delete resource group '{group}': {source}")]
    DeleteGroup {
        group: ResourceGroupName,
        source: ControlPlaneError,
    },

    #[error("failed to purge {kind} '{name}': {source}")]
    Purge {
        kind: SoftDeleteKind,
        name: String,
        source: ControlPlaneError,
    },

    /// The user declined the deletion.
    #[error("user denied confirmation")]
    UserDenied,

    #[error(transparent)]
    Console(#[from] ConsoleError),
}

impl DestroyError {
    pub fn is_user_denied(&self) -> bool {
        matches!(self, DestroyError::UserDenied)
    }

    pub fn is_cancelled(&self) -> bool {
        match self {
            DestroyError::Console(ConsoleError::Cancelled) => true,
            DestroyError::Lookup(e) => e.kind() == DeployErrorKind::Cancelled,
            _ => false,
        }
    }
}
