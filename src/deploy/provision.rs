// ABOUTME: Provisioner: compiles, resolves, reconciles and deploys one environment.
// ABOUTME: Also answers state and preview queries and hands teardown to the destroy module.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Notify;

use crate::config::{
    LOCATION_ENV_KEY, ParameterFile, ProgressConfig, ProjectConfig, RESOURCE_GROUP_ENV_KEY,
    RetryConfig, SUBSCRIPTION_ENV_KEY,
};
use crate::console::{Console, ConsoleError};
use crate::control_plane::{
    ControlPlane, DeploymentOutput, DeploymentRecord, DeploymentScope, PreviewChange,
    ProvisioningState, TAG_ENV_NAME, TAG_PARAM_HASH,
};
use crate::destroy::{self, DestroyError, DestroyOptions, DestroyResult};
use crate::diagnostics::{Diagnostics, Warning};
use crate::params::{ParameterResolver, ResolveContext, ResolvedParameters, SessionContext};
use crate::store::ConfigStore;
use crate::template::{Template, TemplateCache, TemplateCompiler, TargetScope};
use crate::types::{EnvName, ResourceGroupName, ResourceId, SubscriptionId};

use super::cancel::CancelToken;
use super::error::DeployError;
use super::lookup::find_deployment;
use super::naming::deployment_name;
use super::progress::report_progress;
use super::reconcile::{Decision, mismatch_reason, parameter_hash};
use super::retry::get_after_write;
use super::target::DeploymentTarget;

/// Where and how one environment is provisioned.
#[derive(Debug, Clone)]
pub struct ProvisionSettings {
    pub env_name: EnvName,
    pub subscription: Option<SubscriptionId>,
    pub location: Option<String>,
    pub resource_group: Option<ResourceGroupName>,
    pub module_path: PathBuf,
    pub parameters_path: PathBuf,
    pub portal_url: String,
    pub retry: RetryConfig,
    pub progress: ProgressConfig,
    /// Deploy even when nothing changed.
    pub force: bool,
    /// Name fragment used when no deployment is tagged for the environment.
    pub hint: Option<String>,
}

impl ProvisionSettings {
    /// Settings from the project file, overridden by environment values.
    pub fn from_project(project: &ProjectConfig, env_name: EnvName, env: &dyn ConfigStore) -> Self {
        let pick = |key: &str, fallback: &Option<String>| {
            env.get_string(key)
                .filter(|v| !v.is_empty())
                .or_else(|| fallback.clone())
        };

        Self {
            env_name,
            subscription: pick(SUBSCRIPTION_ENV_KEY, &project.subscription).map(SubscriptionId::new),
            location: pick(LOCATION_ENV_KEY, &project.location),
            resource_group: pick(RESOURCE_GROUP_ENV_KEY, &project.resource_group)
                .map(ResourceGroupName::new),
            module_path: project.module_path(),
            parameters_path: project.parameters_file_path(),
            portal_url: project.portal_url.clone(),
            retry: project.retry,
            progress: project.progress,
            force: false,
            hint: None,
        }
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Compiled template, resolved parameters and the target they deploy to.
#[derive(Debug, Clone)]
pub struct ProvisionPlan {
    pub template: Arc<Template>,
    pub parameters: ResolvedParameters,
    pub target: DeploymentTarget,
}

/// Why a deployment was not issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Template and parameters match the last successful deployment.
    StateUnchanged,
}

/// Result of [`Provisioner::deploy`].
#[derive(Debug, Clone)]
pub struct DeployResult {
    pub deployment: DeploymentRecord,
    /// Outputs keyed by the template's declared casing.
    pub outputs: BTreeMap<String, DeploymentOutput>,
    pub skipped: Option<SkipReason>,
    pub portal_url: String,
}

/// Outputs and resources of the latest terminal deployment.
#[derive(Debug, Clone)]
pub struct DeploymentState {
    pub deployment: DeploymentRecord,
    pub outputs: BTreeMap<String, DeploymentOutput>,
    pub resources: Vec<ResourceId>,
}

/// Orchestrates provisioning for one environment during one invocation.
///
/// Holds the template and parameter caches, so repeated calls compile and
/// prompt only once.
pub struct Provisioner<'a, C: ?Sized> {
    control_plane: &'a C,
    compiler: &'a dyn TemplateCompiler,
    console: &'a dyn Console,
    config: &'a mut dyn ConfigStore,
    env: &'a mut dyn ConfigStore,
    settings: ProvisionSettings,
    session: SessionContext,
    templates: TemplateCache,
    resolver: ParameterResolver,
    cancel: CancelToken,
    diagnostics: Diagnostics,
}

impl<'a, C> Provisioner<'a, C>
where
    C: ControlPlane + ?Sized,
{
    pub fn new(
        settings: ProvisionSettings,
        control_plane: &'a C,
        compiler: &'a dyn TemplateCompiler,
        console: &'a dyn Console,
        config: &'a mut dyn ConfigStore,
        env: &'a mut dyn ConfigStore,
    ) -> Self {
        let mut session = SessionContext::new(settings.subscription.clone());
        if let Some(location) = &settings.location {
            session = session.with_location(location.clone());
        }

        Self {
            control_plane,
            compiler,
            console,
            config,
            env,
            settings,
            session,
            templates: TemplateCache::new(),
            resolver: ParameterResolver::new(),
            cancel: CancelToken::default(),
            diagnostics: Diagnostics::default(),
        }
    }

    /// Abort retry waits and in-flight deployments when `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn settings(&self) -> &ProvisionSettings {
        &self.settings
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Warnings collected so far.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Compile the template and resolve its parameters.
    pub async fn plan(&mut self) -> Result<ProvisionPlan, DeployError> {
        let template = self
            .templates
            .get_or_compile(self.compiler, &self.settings.module_path)
            .await?;

        let parameter_file = ParameterFile::load(&self.settings.parameters_path, &*self.env)
            .map_err(|e| DeployError::Config(e.to_string()))?;

        let parameters = self
            .resolver
            .resolve(
                &template,
                &parameter_file,
                ResolveContext {
                    console: self.console,
                    control_plane: self.control_plane,
                    config: &mut *self.config,
                    env: &mut *self.env,
                    session: &mut self.session,
                    diagnostics: &mut self.diagnostics,
                },
            )
            .await?;

        let scope = self.scope(&template)?;
        let name = deployment_name(&self.settings.env_name, Utc::now());
        let target = DeploymentTarget::new(scope, name).with_portal_url(&self.settings.portal_url);

        Ok(ProvisionPlan {
            template,
            parameters,
            target,
        })
    }

    /// Deploy the environment unless nothing changed since the last success.
    pub async fn deploy(&mut self) -> Result<DeployResult, DeployError> {
        let plan = self.plan().await?;

        let param_hash = match self.decide(&plan).await? {
            Decision::Skip(prior) => {
                tracing::info!(deployment = %prior.name, "deployment state unchanged, skipping");
                let outputs = normalize_outputs(&plan.template, &prior.outputs);
                let portal_url = plan.target.renamed(prior.name.clone()).portal_url();
                return Ok(DeployResult {
                    deployment: *prior,
                    outputs,
                    skipped: Some(SkipReason::StateUnchanged),
                    portal_url,
                });
            }
            Decision::Deploy { param_hash } => param_hash,
        };

        let mut tags = HashMap::from([(
            TAG_ENV_NAME.to_string(),
            self.settings.env_name.to_string(),
        )]);
        if let Some(hash) = param_hash {
            tags.insert(TAG_PARAM_HASH.to_string(), hash);
        }

        let arm = plan.parameters.to_arm();
        let target = &plan.target;
        let done = Notify::new();
        let mut cancel = self.cancel.clone();

        self.console
            .message(&format!("Deployment progress: {}", target.portal_url()));

        let deployment = async {
            let result = tokio::select! {
                result = target.deploy(self.control_plane, &plan.template.artifact, &arm, &tags) => {
                    result.map_err(DeployError::from)
                }
                _ = cancel.cancelled() => Err(DeployError::Cancelled),
            };
            done.notify_one();
            result
        };
        let progress = report_progress(
            target,
            self.control_plane,
            self.console,
            &self.settings.progress,
            &done,
        );
        let (deployed, ()) = tokio::join!(deployment, progress);
        fail_on_failed_state(deployed?)?;

        let record =
            get_after_write(target, self.control_plane, &self.settings.retry, &self.cancel).await?;
        let record = fail_on_failed_state(record)?;

        let outputs = normalize_outputs(&plan.template, &record.outputs);
        Ok(DeployResult {
            deployment: record,
            outputs,
            skipped: None,
            portal_url: target.portal_url(),
        })
    }

    /// Changes the deployment would make. Nothing is written.
    pub async fn preview(&mut self) -> Result<Vec<PreviewChange>, DeployError> {
        let plan = self.plan().await?;
        let changes = plan
            .target
            .preview(
                self.control_plane,
                &plan.template.artifact,
                &plan.parameters.to_arm(),
            )
            .await?;
        Ok(changes)
    }

    /// Outputs of the latest terminal deployment of the environment.
    pub async fn state(&mut self) -> Result<DeploymentState, DeployError> {
        let template = self
            .templates
            .get_or_compile(self.compiler, &self.settings.module_path)
            .await?;
        let target = self.lookup_target(&template)?;

        let deployment = find_deployment(
            &target,
            self.control_plane,
            &self.settings.env_name,
            self.settings.hint.as_deref(),
            self.console,
        )
        .await?;

        Ok(DeploymentState {
            outputs: normalize_outputs(&template, &deployment.outputs),
            resources: deployment.output_resources.clone(),
            deployment,
        })
    }

    /// Delete the environment's resources and purge soft-deleted ones.
    pub async fn destroy(&mut self, options: DestroyOptions) -> Result<DestroyResult, DestroyError> {
        let template = self
            .templates
            .get_or_compile(self.compiler, &self.settings.module_path)
            .await
            .map_err(DeployError::from)?;
        let target = self.lookup_target(&template)?;

        let result = destroy::destroy(
            target,
            self.control_plane,
            self.console,
            &self.settings.env_name,
            &options,
            &mut self.diagnostics,
        )
        .await?;

        // the shared location stays valid; everything the deployment produced does not
        for key in &result.invalidated_keys {
            if let Err(e) = self.env.unset(key) {
                tracing::warn!(key = %key, error = %e, "failed to clear environment value");
            }
        }
        if !result.invalidated_keys.is_empty()
            && let Err(e) = self.env.save()
        {
            self.diagnostics.warn(Warning::parameter_persistence(format!(
                "failed to save environment after destroy: {e}"
            )));
        }

        Ok(result)
    }

    async fn decide(&mut self, plan: &ProvisionPlan) -> Result<Decision, DeployError> {
        let param_hash = match parameter_hash(&plan.template, &plan.parameters) {
            Ok(hash) => hash,
            Err(e) => {
                self.diagnostics.warn(Warning::state_unknown(format!(
                    "failed to hash parameters, deploying: {e}"
                )));
                return Ok(Decision::Deploy { param_hash: None });
            }
        };

        if self.settings.force {
            tracing::debug!("forced deployment, skipping state comparison");
            return Ok(Decision::Deploy {
                param_hash: Some(param_hash),
            });
        }

        let subscription = plan.target.scope().subscription();
        let template_hash = match self
            .control_plane
            .calculate_template_hash(subscription, &plan.template.artifact)
            .await
        {
            Ok(hash) => hash,
            Err(e) => {
                self.diagnostics.warn(Warning::state_unknown(format!(
                    "failed to hash template, deploying: {e}"
                )));
                return Ok(Decision::Deploy {
                    param_hash: Some(param_hash),
                });
            }
        };

        let prior = match find_deployment(
            &plan.target,
            self.control_plane,
            &self.settings.env_name,
            self.settings.hint.as_deref(),
            self.console,
        )
        .await
        {
            Ok(prior) => prior,
            Err(DeployError::NoDeploymentsFound { .. }) => {
                tracing::debug!("no prior deployment");
                return Ok(Decision::Deploy {
                    param_hash: Some(param_hash),
                });
            }
            Err(DeployError::Console(ConsoleError::Cancelled)) => {
                return Err(ConsoleError::Cancelled.into());
            }
            Err(e) => {
                self.diagnostics.warn(Warning::state_unknown(format!(
                    "cannot determine deployment state, deploying: {e}"
                )));
                return Ok(Decision::Deploy {
                    param_hash: Some(param_hash),
                });
            }
        };

        match mismatch_reason(&prior, &template_hash, &param_hash) {
            None => Ok(Decision::Skip(Box::new(prior))),
            Some(reason) => {
                tracing::debug!(deployment = %prior.name, reason, "deployment required");
                Ok(Decision::Deploy {
                    param_hash: Some(param_hash),
                })
            }
        }
    }

    fn scope(&self, template: &Template) -> Result<DeploymentScope, DeployError> {
        let subscription = self
            .session
            .subscription()
            .cloned()
            .ok_or_else(|| DeployError::Config("no subscription configured".to_string()))?;

        match template.target_scope {
            TargetScope::Subscription => {
                let location = self
                    .session
                    .shared_location()
                    .map(str::to_string)
                    .ok_or_else(|| {
                        DeployError::Config(
                            "a location is required for subscription deployments".to_string(),
                        )
                    })?;
                Ok(DeploymentScope::Subscription {
                    subscription,
                    location,
                })
            }
            TargetScope::ResourceGroup => {
                let resource_group = self.settings.resource_group.clone().ok_or_else(|| {
                    DeployError::Config(
                        "a resource group is required for resource group deployments".to_string(),
                    )
                })?;
                Ok(DeploymentScope::ResourceGroup {
                    subscription,
                    resource_group,
                })
            }
        }
    }

    /// Target used to list existing deployments; its name is never deployed.
    fn lookup_target(&self, template: &Template) -> Result<DeploymentTarget, DeployError> {
        let scope = self.scope(template)?;
        let name = deployment_name(&self.settings.env_name, Utc::now());
        Ok(DeploymentTarget::new(scope, name).with_portal_url(&self.settings.portal_url))
    }
}

fn fail_on_failed_state(record: DeploymentRecord) -> Result<DeploymentRecord, DeployError> {
    if record.state == ProvisioningState::Failed {
        return Err(DeployError::DeploymentFailed {
            message: record
                .error
                .clone()
                .unwrap_or_else(|| "the control plane reported a failed deployment".to_string()),
            name: record.name,
        });
    }
    Ok(record)
}

/// Re-key outputs to the casing the template declares.
pub fn normalize_outputs(
    template: &Template,
    outputs: &BTreeMap<String, DeploymentOutput>,
) -> BTreeMap<String, DeploymentOutput> {
    outputs
        .iter()
        .map(|(key, output)| {
            let name = template.output_casing(key).unwrap_or(key);
            (name.to_string(), output.clone())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn outputs_follow_declared_casing() {
        let template = Template::from_arm_json(
            serde_json::to_vec(&json!({"outputs": {"WEB_URI": {"type": "string"}}})).unwrap(),
        )
        .unwrap();
        let outputs = BTreeMap::from([
            (
                "web_uri".to_string(),
                DeploymentOutput {
                    output_type: "String".into(),
                    value: json!("https://web"),
                },
            ),
            (
                "extra".to_string(),
                DeploymentOutput {
                    output_type: "String".into(),
                    value: json!("x"),
                },
            ),
        ]);

        let normalized = normalize_outputs(&template, &outputs);
        assert!(normalized.contains_key("WEB_URI"));
        assert!(normalized.contains_key("extra"));
    }

    #[test]
    fn settings_prefer_environment_values() {
        use crate::store::MemoryStore;

        let project = ProjectConfig::from_yaml("subscription: sub-file\nlocation: westus\n").unwrap();
        let mut env = MemoryStore::new();
        env.set(LOCATION_ENV_KEY, json!("eastus")).unwrap();

        let settings =
            ProvisionSettings::from_project(&project, EnvName::new("dev").unwrap(), &env);
        assert_eq!(settings.location.as_deref(), Some("eastus"));
        assert_eq!(settings.subscription.unwrap().as_str(), "sub-file");
        assert!(settings.resource_group.is_none());
    }
}
