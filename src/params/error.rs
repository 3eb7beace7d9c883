// ABOUTME: Error types for parameter resolution.
// ABOUTME: Configuration errors are fatal and surface before any prompt.

use crate::console::ConsoleError;
use crate::control_plane::ControlPlaneError;

/// Errors that can occur while resolving template parameters.
#[derive(Debug, thiserror::Error)]
pub enum ParamError {
    /// Parameters reference each other in a loop.
    #[error("parameter dependency cycle: {path}")]
    DependencyCycle { path: String },

    /// Metadata references a parameter the template does not declare.
    #[error("parameter '{parameter}' references unknown parameter '{reference}'")]
    UnknownReference { parameter: String, reference: String },

    /// A metadata default is not one of the allowed values.
    #[error("default value '{value}' is not in the allowed values for parameter '{parameter}'")]
    InvalidAllowedDefault { parameter: String, value: String },

    /// An allowed value cannot be converted to the parameter's type.
    #[error("allowed value '{value}' of parameter '{parameter}' does not match its type")]
    InvalidAllowedValue { parameter: String, value: String },

    /// A metadata default has the wrong type for its parameter.
    #[error("unsupported default value for parameter '{parameter}': {reason}")]
    UnsupportedDefault { parameter: String, reason: String },

    /// The password policy cannot be satisfied.
    #[error("cannot generate value for parameter '{parameter}': {reason}")]
    Generate { parameter: String, reason: String },

    /// A quota requirement could not be parsed.
    #[error("invalid quota requirement '{requirement}': {reason}")]
    InvalidQuota { requirement: String, reason: String },

    /// No location satisfies every quota requirement.
    #[error("no location found with enough quota for {requirements}")]
    NoQuotaLocation { requirements: String },

    /// No location is left to offer.
    #[error("no allowed location available for parameter '{parameter}'")]
    NoLocations { parameter: String },

    /// An existing resource group is required but none exist.
    #[error("parameter '{parameter}' requires an existing resource group, but none were found")]
    NoResourceGroups { parameter: String },

    /// A subscription is required to list locations or groups.
    #[error("parameter '{parameter}' needs a subscription to list choices")]
    MissingSubscription { parameter: String },

    #[error(transparent)]
    Console(#[from] ConsoleError),

    #[error("control plane error: {0}")]
    ControlPlane(#[from] ControlPlaneError),
}

impl ParamError {
    /// True for errors caused by the template or parameter configuration.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ParamError::DependencyCycle { .. }
                | ParamError::UnknownReference { .. }
                | ParamError::InvalidAllowedDefault { .. }
                | ParamError::InvalidAllowedValue { .. }
                | ParamError::UnsupportedDefault { .. }
                | ParamError::Generate { .. }
                | ParamError::InvalidQuota { .. }
        )
    }
}
