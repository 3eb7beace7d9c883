// ABOUTME: Deployment name generation from environment name and timestamp.
// ABOUTME: Long names keep their rightmost characters so the timestamp survives.

use chrono::{DateTime, Utc};

use crate::types::{DeploymentName, EnvName};

/// Longest deployment name the control plane accepts.
pub const MAX_DEPLOYMENT_NAME_LENGTH: usize = 64;

/// `<env>-<unix-timestamp>`, truncated from the left to the maximum length.
pub fn deployment_name(env_name: &EnvName, at: DateTime<Utc>) -> DeploymentName {
    let full = format!("{}-{}", env_name.as_str(), at.timestamp());
    let len = full.chars().count();
    if len <= MAX_DEPLOYMENT_NAME_LENGTH {
        return DeploymentName::new(full);
    }
    DeploymentName::new(full.chars().skip(len - MAX_DEPLOYMENT_NAME_LENGTH).collect::<String>())
}
