// ABOUTME: Control-plane boundary: capability traits the orchestrator calls.
// ABOUTME: Split into deployment, resource, purge and location operations.

mod error;
mod types;

pub use error::ControlPlaneError;
pub use types::*;

use async_trait::async_trait;

use crate::types::{DeploymentName, ResourceGroupName, SubscriptionId};

/// Deployment lifecycle operations at a subscription or resource-group scope.
#[async_trait]
pub trait DeploymentOps: Send + Sync {
    /// Issue a deployment and wait for the control plane to finish it.
    async fn deploy(
        &self,
        scope: &DeploymentScope,
        name: &DeploymentName,
        artifact: &Artifact,
        parameters: &ArmParameters,
        tags: &std::collections::HashMap<String, String>,
    ) -> Result<DeploymentRecord, ControlPlaneError>;

    /// Fetch one deployment by name.
    async fn get_deployment(
        &self,
        scope: &DeploymentScope,
        name: &DeploymentName,
    ) -> Result<DeploymentRecord, ControlPlaneError>;

    /// List every deployment in the scope.
    async fn list_deployments(
        &self,
        scope: &DeploymentScope,
    ) -> Result<Vec<DeploymentRecord>, ControlPlaneError>;

    /// Compute the changes a deployment would make, without side effects.
    async fn preview(
        &self,
        scope: &DeploymentScope,
        name: &DeploymentName,
        artifact: &Artifact,
        parameters: &ArmParameters,
    ) -> Result<Vec<PreviewChange>, ControlPlaneError>;

    /// Hash of the template content as the control plane computes it.
    async fn calculate_template_hash(
        &self,
        subscription: &SubscriptionId,
        artifact: &Artifact,
    ) -> Result<String, ControlPlaneError>;

    /// List the operations of a (possibly running) deployment.
    async fn list_operations(
        &self,
        scope: &DeploymentScope,
        name: &DeploymentName,
    ) -> Result<Vec<DeploymentOperation>, ControlPlaneError>;
}

/// Resource group enumeration and deletion.
#[async_trait]
pub trait ResourceOps: Send + Sync {
    async fn list_resource_groups(
        &self,
        subscription: &SubscriptionId,
    ) -> Result<Vec<ResourceGroupName>, ControlPlaneError>;

    async fn list_resource_group_resources(
        &self,
        subscription: &SubscriptionId,
        group: &ResourceGroupName,
    ) -> Result<Vec<Resource>, ControlPlaneError>;

    /// Delete a group and everything in it.
    async fn delete_resource_group(
        &self,
        subscription: &SubscriptionId,
        group: &ResourceGroupName,
    ) -> Result<(), ControlPlaneError>;
}

/// Inspection and purge of soft-deletable resources.
#[async_trait]
pub trait PurgeOps: Send + Sync {
    /// Read the soft-delete flags of a live resource.
    async fn soft_delete_state(
        &self,
        kind: SoftDeleteKind,
        resource: &Resource,
    ) -> Result<SoftDeleteState, ControlPlaneError>;

    /// Permanently remove a soft-deleted resource so its name can be reused.
    async fn purge(&self, kind: SoftDeleteKind, resource: &Resource)
    -> Result<(), ControlPlaneError>;
}

/// Region and quota queries.
#[async_trait]
pub trait LocationOps: Send + Sync {
    async fn list_locations(
        &self,
        subscription: &SubscriptionId,
    ) -> Result<Vec<Location>, ControlPlaneError>;

    async fn list_usages(
        &self,
        subscription: &SubscriptionId,
        location: &str,
    ) -> Result<Vec<Usage>, ControlPlaneError>;
}

/// Everything the orchestrator needs from a control plane.
///
/// Implemented automatically for any type implementing all capability traits.
pub trait ControlPlane: DeploymentOps + ResourceOps + PurgeOps + LocationOps {}

impl<T> ControlPlane for T where T: DeploymentOps + ResourceOps + PurgeOps + LocationOps {}
