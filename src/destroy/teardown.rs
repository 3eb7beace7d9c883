// ABOUTME: Teardown state machine: locate, inventory, classify, delete, purge, preserve history.
// ABOUTME: Each method consumes self and returns the next state on success.

use std::collections::HashMap;

use chrono::Utc;
use serde_json::json;

use crate::config::RESOURCE_GROUP_ENV_KEY;
use crate::console::Console;
use crate::control_plane::{
    ControlPlaneError, DeploymentOps, DeploymentRecord, DeploymentScope, ProvisioningState, PurgeOps,
    ResourceOps, TAG_DEPLOY_REASON, TAG_ENV_NAME,
};
use crate::deploy::{DeploymentTarget, deployment_name, find_deployment};
use crate::diagnostics::{Diagnostics, Warning};
use crate::types::{EnvName, ResourceGroupName, ResourceId};

use super::error::DestroyError;
use super::purge::{self, PurgeOutcome};
use super::state::{Classified, Completed, GroupInventory, GroupsDeleted, Inventoried, Located, Purged};

const SUBSCRIPTION_TEMPLATE_SCHEMA: &str =
    "https://schema.management.azure.com/schemas/2018-05-01/subscriptionDeploymentTemplate.json#";
const RESOURCE_GROUP_TEMPLATE_SCHEMA: &str =
    "https://schema.management.azure.com/schemas/2019-04-01/deploymentTemplate.json#";
const RESOURCE_GROUP_TYPE: &str = "Microsoft.Resources/resourceGroups";

/// Value of the deploy-reason tag on history-preserving deployments.
pub const TEARDOWN_REASON: &str = "down";

/// Flags controlling confirmation and purging.
#[derive(Debug, Clone, Default)]
pub struct DestroyOptions {
    /// Delete without asking.
    pub force: bool,
    /// Purge soft-deleted resources without asking.
    pub purge: bool,
    /// Name fragment for locating the deployment.
    pub hint: Option<String>,
}

/// Result of a completed teardown.
#[derive(Debug, Clone)]
pub struct DestroyResult {
    pub deployment: DeploymentRecord,
    pub deleted_groups: Vec<ResourceGroupName>,
    pub purged: Vec<PurgeOutcome>,
    /// Environment keys that no longer describe live resources.
    pub invalidated_keys: Vec<String>,
}

/// A teardown in progress, parameterized by its current state.
#[derive(Debug)]
pub struct Teardown<S> {
    pub(crate) target: DeploymentTarget,
    pub(crate) env_name: EnvName,
    pub(crate) options: DestroyOptions,
    pub(crate) state: S,
}

impl<S> Teardown<S> {
    fn advance<T>(self, next: impl FnOnce(S) -> T) -> Teardown<T> {
        Teardown {
            target: self.target,
            env_name: self.env_name,
            options: self.options,
            state: next(self.state),
        }
    }

    pub fn target(&self) -> &DeploymentTarget {
        &self.target
    }

    fn group_link(&self, group: &ResourceGroupName) -> String {
        let id = ResourceId::for_resource_group(self.target.scope().subscription(), group);
        let escaped: Vec<String> = id
            .as_str()
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        format!(
            "{}/#@/resource{}/overview",
            self.target.portal_base(),
            escaped.join("/")
        )
    }
}

// =============================================================================
// Locate
// =============================================================================

impl Teardown<Located> {
    /// Find the environment's latest terminal deployment at the target's scope.
    pub async fn locate<D>(
        target: DeploymentTarget,
        ops: &D,
        console: &dyn Console,
        env_name: &EnvName,
        options: DestroyOptions,
    ) -> Result<Self, DestroyError>
    where
        D: DeploymentOps + ?Sized,
    {
        let deployment =
            find_deployment(&target, ops, env_name, options.hint.as_deref(), console).await?;
        tracing::info!(deployment = %deployment.name, state = %deployment.state, "destroying");

        Ok(Teardown {
            target,
            env_name: env_name.clone(),
            options,
            state: Located { deployment },
        })
    }

    pub fn deployment(&self) -> &DeploymentRecord {
        &self.state.deployment
    }

    /// Resource groups the deployment created or touched.
    ///
    /// Succeeded deployments report output resources; failed ones only
    /// report their nested dependencies.
    pub fn affected_groups(&self) -> Vec<ResourceGroupName> {
        if let DeploymentScope::ResourceGroup { resource_group, .. } = self.target.scope() {
            return vec![resource_group.clone()];
        }

        let deployment = &self.state.deployment;
        let mut groups: Vec<ResourceGroupName> = Vec::new();
        let mut push = |group: ResourceGroupName| {
            if !groups.contains(&group) {
                groups.push(group);
            }
        };

        if deployment.state == ProvisioningState::Succeeded {
            for resource in &deployment.output_resources {
                if let Some(group) = resource.resource_group() {
                    push(group.clone());
                }
            }
        } else {
            let mut pending: Vec<_> = deployment.dependencies.iter().rev().collect();
            while let Some(dependency) = pending.pop() {
                if dependency.resource_type.eq_ignore_ascii_case(RESOURCE_GROUP_TYPE) {
                    push(ResourceGroupName::new(dependency.resource_name.clone()));
                }
                pending.extend(dependency.depends_on.iter().rev());
            }
        }
        groups
    }

    /// List resources per affected group. Groups that no longer exist are dropped.
    pub async fn inventory<R>(
        self,
        ops: &R,
        diagnostics: &mut Diagnostics,
    ) -> Result<Teardown<Inventoried>, DestroyError>
    where
        R: ResourceOps + ?Sized,
    {
        let subscription = self.target.scope().subscription().clone();
        let mut groups = Vec::new();

        for name in self.affected_groups() {
            match ops.list_resource_group_resources(&subscription, &name).await {
                Ok(resources) => groups.push(GroupInventory { name, resources }),
                Err(ControlPlaneError::NotFound(_)) => {
                    diagnostics.warn(Warning::missing_resource_group(format!(
                        "resource group '{name}' was already deleted"
                    )));
                }
                Err(source) => return Err(DestroyError::ListResources { group: name, source }),
            }
        }

        Ok(self.advance(|Located { deployment }| Inventoried { deployment, groups }))
    }
}

// =============================================================================
// Inventoried -> Classified
// =============================================================================

impl Teardown<Inventoried> {
    pub fn groups(&self) -> &[GroupInventory] {
        &self.state.groups
    }

    pub fn resource_count(&self) -> usize {
        self.state.groups.iter().map(|g| g.resources.len()).sum()
    }

    /// Find the purgeable soft-deletable resources, before they are deleted.
    pub async fn classify<P>(self, ops: &P) -> Result<Teardown<Classified>, DestroyError>
    where
        P: PurgeOps + ?Sized,
    {
        let candidates = purge::classify(ops, &self.state.groups).await?;
        Ok(self.advance(|Inventoried { deployment, groups }| Classified {
            deployment,
            groups,
            candidates,
        }))
    }
}

// =============================================================================
// Classified -> GroupsDeleted
// =============================================================================

impl Teardown<Classified> {
    pub fn candidates(&self) -> &[purge::PurgeCandidate] {
        &self.state.candidates
    }

    /// Confirm, then delete every remaining group.
    pub async fn delete_groups<R>(
        self,
        ops: &R,
        console: &dyn Console,
        diagnostics: &mut Diagnostics,
    ) -> Result<Teardown<GroupsDeleted>, DestroyError>
    where
        R: ResourceOps + ?Sized,
    {
        let resource_count: usize = self.state.groups.iter().map(|g| g.resources.len()).sum();

        if !self.state.groups.is_empty() && !self.options.force {
            console.message("Resource groups to be deleted:");
            for group in &self.state.groups {
                console.message(&format!("  {}: {}", group.name, self.group_link(&group.name)));
            }
            let confirmed = console.confirm(
                &format!(
                    "This will delete {resource_count} resources, are you sure you want to continue?"
                ),
                false,
            )?;
            if !confirmed {
                return Err(DestroyError::UserDenied);
            }
        }

        let subscription = self.target.scope().subscription().clone();
        for group in &self.state.groups {
            console.show_progress(&format!("Deleting resource group {}", group.name));
            let result = ops.delete_resource_group(&subscription, &group.name).await;
            console.stop_progress();

            match result {
                Ok(()) => tracing::info!(group = %group.name, "deleted resource group"),
                Err(ControlPlaneError::NotFound(_)) => {
                    diagnostics.warn(Warning::missing_resource_group(format!(
                        "resource group '{}' was already deleted",
                        group.name
                    )));
                }
                Err(source) => {
                    return Err(DestroyError::DeleteGroup {
                        group: group.name.clone(),
                        source,
                    });
                }
            }
        }

        Ok(self.advance(|state| GroupsDeleted {
            deployment: state.deployment,
            groups: state.groups,
            candidates: state.candidates,
        }))
    }
}

// =============================================================================
// GroupsDeleted -> Purged
// =============================================================================

impl Teardown<GroupsDeleted> {
    /// Purge soft-deleted resources, asking first unless purging was requested.
    ///
    /// Declining marks every candidate skipped; the step still succeeds.
    pub async fn purge<P>(
        self,
        ops: &P,
        console: &dyn Console,
    ) -> Result<Teardown<Purged>, DestroyError>
    where
        P: PurgeOps + ?Sized,
    {
        let candidates = &self.state.candidates;

        let purged = if candidates.is_empty() {
            Vec::new()
        } else {
            let approved = self.options.purge || {
                console.message(
                    "The following resources were deleted but remain soft-deleted, which reserves their names:",
                );
                for line in purge::summarize(candidates) {
                    console.message(&format!("  {line}"));
                }
                console.confirm(
                    "Would you like to permanently delete these resources instead, allowing their names to be reused?",
                    false,
                )?
            };

            if approved {
                purge::purge_all(ops, candidates).await?
            } else {
                tracing::info!(count = candidates.len(), "skipping purge");
                purge::skip_all(candidates)
            }
        };

        Ok(self.advance(|state| Purged {
            deployment: state.deployment,
            groups: state.groups,
            purged,
        }))
    }
}

// =============================================================================
// Purged -> Completed
// =============================================================================

impl Teardown<Purged> {
    /// Write an empty deployment tagged as a teardown so history stays queryable.
    ///
    /// Failure is recorded as a warning; the resources are already gone.
    pub async fn preserve_history<D>(
        self,
        ops: &D,
        diagnostics: &mut Diagnostics,
    ) -> Teardown<Completed>
    where
        D: DeploymentOps + ?Sized,
    {
        let schema = match self.target.scope() {
            DeploymentScope::Subscription { .. } => SUBSCRIPTION_TEMPLATE_SCHEMA,
            DeploymentScope::ResourceGroup { .. } => RESOURCE_GROUP_TEMPLATE_SCHEMA,
        };
        let template = json!({
            "$schema": schema,
            "contentVersion": "1.0.0.0",
            "parameters": {},
            "variables": {},
            "resources": [],
            "outputs": {}
        });
        let tags = HashMap::from([
            (TAG_ENV_NAME.to_string(), self.env_name.to_string()),
            (TAG_DEPLOY_REASON.to_string(), TEARDOWN_REASON.to_string()),
        ]);
        let target = self
            .target
            .renamed(deployment_name(&self.env_name, Utc::now()));

        let written = match serde_json::to_vec(&template) {
            Ok(artifact) => target
                .deploy(ops, &artifact.into(), &Default::default(), &tags)
                .await
                .map(|_| ())
                .map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        if let Err(e) = written {
            diagnostics.warn(Warning::history_deployment(format!(
                "failed to write teardown deployment: {e}"
            )));
        }

        self.advance(|state| Completed {
            deployment: state.deployment,
            groups: state.groups,
            purged: state.purged,
        })
    }
}

// =============================================================================
// Completed
// =============================================================================

impl Teardown<Completed> {
    /// Report the outcome and the environment keys to scrub.
    pub fn finish(self) -> DestroyResult {
        let Completed {
            deployment,
            groups,
            purged,
        } = self.state;

        let mut invalidated_keys: Vec<String> = deployment.outputs.keys().cloned().collect();
        if let DeploymentScope::ResourceGroup { resource_group, .. } = self.target.scope()
            && groups.iter().any(|g| &g.name == resource_group)
        {
            invalidated_keys.push(RESOURCE_GROUP_ENV_KEY.to_string());
        }

        DestroyResult {
            deleted_groups: groups.into_iter().map(|g| g.name).collect(),
            deployment,
            purged,
            invalidated_keys,
        }
    }
}
