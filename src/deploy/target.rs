// ABOUTME: Deployment target: one named deployment at a subscription or resource-group scope.
// ABOUTME: Wraps control-plane calls with scope context and builds portal links.

use snafu::{ResultExt, Snafu};
use std::collections::HashMap;

use crate::control_plane::{
    ArmParameters, Artifact, ControlPlaneError, DeploymentOperation, DeploymentOps,
    DeploymentRecord, DeploymentScope, PreviewChange,
};
use crate::types::DeploymentName;

const DEPLOYMENT_OVERVIEW_FRAGMENT: &str = "#view/HubsExtension/DeploymentDetailsBlade/~/overview/id/";
const DEPLOYMENT_OUTPUTS_FRAGMENT: &str = "#view/HubsExtension/DeploymentDetailsBlade/~/outputs/id/";

/// Control-plane failures, tagged with the deployment and scope involved.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TargetError {
    #[snafu(display("failed to deploy '{name}' at {scope}: {source}"))]
    Deploy {
        name: DeploymentName,
        scope: String,
        source: ControlPlaneError,
    },

    #[snafu(display("failed to get deployment '{name}' at {scope}: {source}"))]
    Get {
        name: DeploymentName,
        scope: String,
        source: ControlPlaneError,
    },

    #[snafu(display("failed to list deployments at {scope}: {source}"))]
    List {
        scope: String,
        source: ControlPlaneError,
    },

    #[snafu(display("failed to preview '{name}' at {scope}: {source}"))]
    Preview {
        name: DeploymentName,
        scope: String,
        source: ControlPlaneError,
    },

    #[snafu(display("failed to list operations of '{name}': {source}"))]
    Operations {
        name: DeploymentName,
        source: ControlPlaneError,
    },
}

impl TargetError {
    /// The underlying control-plane error.
    pub fn control_plane_error(&self) -> &ControlPlaneError {
        match self {
            TargetError::Deploy { source, .. }
            | TargetError::Get { source, .. }
            | TargetError::List { source, .. }
            | TargetError::Preview { source, .. }
            | TargetError::Operations { source, .. } => source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.control_plane_error().is_not_found()
    }

    /// True when the provider rejected or failed the deployment itself.
    pub fn is_deployment_failure(&self) -> bool {
        matches!(
            self,
            TargetError::Deploy {
                source: ControlPlaneError::DeploymentFailed(_),
                ..
            }
        )
    }
}

/// A named deployment at one scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentTarget {
    scope: DeploymentScope,
    name: DeploymentName,
    portal_url: String,
}

impl DeploymentTarget {
    pub fn new(scope: DeploymentScope, name: DeploymentName) -> Self {
        Self {
            scope,
            name,
            portal_url: "https://portal.azure.com".to_string(),
        }
    }

    /// Base URL used for portal links.
    pub fn with_portal_url(mut self, portal_url: impl Into<String>) -> Self {
        self.portal_url = portal_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Same scope, different deployment name.
    pub fn renamed(&self, name: DeploymentName) -> Self {
        Self {
            scope: self.scope.clone(),
            name,
            portal_url: self.portal_url.clone(),
        }
    }

    pub fn scope(&self) -> &DeploymentScope {
        &self.scope
    }

    pub fn name(&self) -> &DeploymentName {
        &self.name
    }

    /// Fully qualified resource id of the deployment.
    pub fn deployment_id(&self) -> String {
        match &self.scope {
            DeploymentScope::Subscription { subscription, .. } => format!(
                "/subscriptions/{subscription}/providers/Microsoft.Resources/deployments/{}",
                self.name
            ),
            DeploymentScope::ResourceGroup {
                subscription,
                resource_group,
            } => format!(
                "/subscriptions/{subscription}/resourceGroups/{resource_group}/providers/Microsoft.Resources/deployments/{}",
                self.name
            ),
        }
    }

    /// Portal base URL without a trailing slash.
    pub fn portal_base(&self) -> &str {
        &self.portal_url
    }

    /// Portal link to the deployment overview.
    pub fn portal_url(&self) -> String {
        self.link(DEPLOYMENT_OVERVIEW_FRAGMENT)
    }

    /// Portal link to the deployment outputs.
    pub fn outputs_url(&self) -> String {
        self.link(DEPLOYMENT_OUTPUTS_FRAGMENT)
    }

    fn link(&self, fragment: &str) -> String {
        format!(
            "{}/{fragment}{}",
            self.portal_url,
            urlencoding::encode(&self.deployment_id())
        )
    }

    /// Issue the deployment and wait for the control plane to finish it.
    pub async fn deploy<D>(
        &self,
        ops: &D,
        artifact: &Artifact,
        parameters: &ArmParameters,
        tags: &HashMap<String, String>,
    ) -> Result<DeploymentRecord, TargetError>
    where
        D: DeploymentOps + ?Sized,
    {
        tracing::info!(deployment = %self.name, scope = %self.scope, "deploying");
        ops.deploy(&self.scope, &self.name, artifact, parameters, tags)
            .await
            .context(DeploySnafu {
                name: self.name.clone(),
                scope: self.scope.to_string(),
            })
    }

    pub async fn get_deployment<D>(&self, ops: &D) -> Result<DeploymentRecord, TargetError>
    where
        D: DeploymentOps + ?Sized,
    {
        ops.get_deployment(&self.scope, &self.name)
            .await
            .context(GetSnafu {
                name: self.name.clone(),
                scope: self.scope.to_string(),
            })
    }

    /// Every deployment at this target's scope, whatever its name.
    pub async fn list_deployments<D>(&self, ops: &D) -> Result<Vec<DeploymentRecord>, TargetError>
    where
        D: DeploymentOps + ?Sized,
    {
        ops.list_deployments(&self.scope).await.context(ListSnafu {
            scope: self.scope.to_string(),
        })
    }

    /// Proposed changes of a deployment. No side effects.
    pub async fn preview<D>(
        &self,
        ops: &D,
        artifact: &Artifact,
        parameters: &ArmParameters,
    ) -> Result<Vec<PreviewChange>, TargetError>
    where
        D: DeploymentOps + ?Sized,
    {
        ops.preview(&self.scope, &self.name, artifact, parameters)
            .await
            .context(PreviewSnafu {
                name: self.name.clone(),
                scope: self.scope.to_string(),
            })
    }

    pub async fn list_operations<D>(&self, ops: &D) -> Result<Vec<DeploymentOperation>, TargetError>
    where
        D: DeploymentOps + ?Sized,
    {
        ops.list_operations(&self.scope, &self.name)
            .await
            .context(OperationsSnafu {
                name: self.name.clone(),
            })
    }
}
