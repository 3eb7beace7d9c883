// ABOUTME: Test support utilities.
// ABOUTME: In-memory control plane, scripted console and template fixtures.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::Once;
use std::sync::atomic::{AtomicUsize, Ordering};

use terrane::console::{Console, ConsoleError, PromptOptions};
use terrane::control_plane::*;
use terrane::template::{Template, TemplateCompiler, TemplateError};
use terrane::types::{DeploymentName, ResourceGroupName, ResourceId, SubscriptionId};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env().add_directive("terrane=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub const SUBSCRIPTION: &str = "sub-1";
pub const TEMPLATE_HASH: &str = "template-hash-1";

pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

/// A terminal deployment record for seeding the fake.
pub fn record(name: &str, state: ProvisioningState, timestamp: DateTime<Utc>) -> DeploymentRecord {
    DeploymentRecord {
        id: format!("/subscriptions/{SUBSCRIPTION}/providers/Microsoft.Resources/deployments/{name}"),
        name: DeploymentName::new(name),
        state,
        timestamp,
        location: Some("eastus".into()),
        tags: HashMap::new(),
        template_hash: Some(TEMPLATE_HASH.into()),
        outputs: BTreeMap::new(),
        output_resources: Vec::new(),
        dependencies: Vec::new(),
        error: None,
    }
}

pub fn tagged(mut record: DeploymentRecord, env_name: &str) -> DeploymentRecord {
    record.tags.insert(TAG_ENV_NAME.into(), env_name.into());
    record
}

pub fn resource(group: &str, provider_type: &str, name: &str) -> Resource {
    Resource {
        id: ResourceId::parse(&format!(
            "/subscriptions/{SUBSCRIPTION}/resourceGroups/{group}/providers/{provider_type}/{name}"
        ))
        .unwrap(),
        name: name.to_string(),
        resource_type: provider_type.to_string(),
        kind: None,
        location: "eastus".into(),
    }
}

#[derive(Debug, Default)]
struct PlaneState {
    deployments: Vec<DeploymentRecord>,
    deployed_parameters: Vec<ArmParameters>,
    not_found_reads: u32,
    deploy_state: Option<ProvisioningState>,
    deploy_error: Option<String>,
    outputs: BTreeMap<String, DeploymentOutput>,
    groups: BTreeMap<String, Vec<Resource>>,
    deleted_groups: Vec<String>,
    soft_delete: HashMap<String, SoftDeleteState>,
    purged: Vec<String>,
    locations: Vec<Location>,
    usages: HashMap<String, Vec<Usage>>,
    failing_usages: HashSet<String>,
    operations: Vec<DeploymentOperation>,
    failing_operation_polls: u32,
}

/// A control plane held in memory, with call counters.
#[derive(Debug, Default)]
pub struct FakeControlPlane {
    state: Mutex<PlaneState>,
    deploy_calls: AtomicUsize,
    get_calls: AtomicUsize,
    location_queries: AtomicUsize,
    operation_polls: AtomicUsize,
}

impl FakeControlPlane {
    pub fn new() -> Self {
        let plane = Self::default();
        plane.state.lock().locations = vec![
            Location {
                name: "westus".into(),
                display_name: "West US".into(),
            },
            Location {
                name: "eastus".into(),
                display_name: "East US".into(),
            },
        ];
        plane
    }

    pub fn with_deployment(self, record: DeploymentRecord) -> Self {
        self.state.lock().deployments.push(record);
        self
    }

    pub fn with_group(self, name: &str, resources: Vec<Resource>) -> Self {
        self.state.lock().groups.insert(name.to_string(), resources);
        self
    }

    pub fn with_soft_delete(self, name: &str, state: SoftDeleteState) -> Self {
        self.state.lock().soft_delete.insert(name.to_string(), state);
        self
    }

    pub fn with_usages(self, location: &str, usages: Vec<Usage>) -> Self {
        self.state.lock().usages.insert(location.to_string(), usages);
        self
    }

    pub fn with_failing_usages(self, location: &str) -> Self {
        self.state.lock().failing_usages.insert(location.to_string());
        self
    }

    pub fn with_output(self, name: &str, value: Value) -> Self {
        self.state.lock().outputs.insert(
            name.to_string(),
            DeploymentOutput {
                output_type: "String".into(),
                value,
            },
        );
        self
    }

    pub fn with_operations(self, operations: Vec<DeploymentOperation>) -> Self {
        self.state.lock().operations = operations;
        self
    }

    /// The next `count` operation polls fail.
    pub fn operation_polls_fail_for(&self, count: u32) {
        self.state.lock().failing_operation_polls = count;
    }

    pub fn operation_polls(&self) -> usize {
        self.operation_polls.load(Ordering::SeqCst)
    }

    /// The next `count` reads of a deployment report "not found".
    pub fn not_found_for(&self, count: u32) {
        self.state.lock().not_found_reads = count;
    }

    /// Deployments finish in `state`, with `error` attached.
    pub fn deploy_finishes(&self, state: ProvisioningState, error: Option<&str>) {
        let mut plane = self.state.lock();
        plane.deploy_state = Some(state);
        plane.deploy_error = error.map(str::to_string);
    }

    pub fn deploy_calls(&self) -> usize {
        self.deploy_calls.load(Ordering::SeqCst)
    }

    pub fn location_queries(&self) -> usize {
        self.location_queries.load(Ordering::SeqCst)
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn last_parameters(&self) -> Option<ArmParameters> {
        self.state.lock().deployed_parameters.last().cloned()
    }

    pub fn deployments(&self) -> Vec<DeploymentRecord> {
        self.state.lock().deployments.clone()
    }

    pub fn deleted_groups(&self) -> Vec<String> {
        self.state.lock().deleted_groups.clone()
    }

    pub fn purged(&self) -> Vec<String> {
        self.state.lock().purged.clone()
    }
}

#[async_trait]
impl DeploymentOps for FakeControlPlane {
    async fn deploy(
        &self,
        scope: &DeploymentScope,
        name: &DeploymentName,
        _artifact: &Artifact,
        parameters: &ArmParameters,
        tags: &HashMap<String, String>,
    ) -> Result<DeploymentRecord, ControlPlaneError> {
        let count = self.deploy_calls.fetch_add(1, Ordering::SeqCst);
        let mut plane = self.state.lock();

        let mut deployed = record(
            name.as_str(),
            plane
                .deploy_state
                .clone()
                .unwrap_or(ProvisioningState::Succeeded),
            at(1_700_000_000 + count as i64 * 60),
        );
        if let DeploymentScope::Subscription { location, .. } = scope {
            deployed.location = Some(location.clone());
        }
        deployed.tags = tags.clone();
        deployed.outputs = plane.outputs.clone();
        deployed.error = plane.deploy_error.clone();

        plane.deployed_parameters.push(parameters.clone());
        plane.deployments.push(deployed.clone());
        Ok(deployed)
    }

    async fn get_deployment(
        &self,
        _scope: &DeploymentScope,
        name: &DeploymentName,
    ) -> Result<DeploymentRecord, ControlPlaneError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        let mut plane = self.state.lock();
        if plane.not_found_reads > 0 {
            plane.not_found_reads -= 1;
            return Err(ControlPlaneError::NotFound(name.to_string()));
        }
        plane
            .deployments
            .iter()
            .find(|d| &d.name == name)
            .cloned()
            .ok_or_else(|| ControlPlaneError::NotFound(name.to_string()))
    }

    async fn list_deployments(
        &self,
        _scope: &DeploymentScope,
    ) -> Result<Vec<DeploymentRecord>, ControlPlaneError> {
        Ok(self.state.lock().deployments.clone())
    }

    async fn preview(
        &self,
        _scope: &DeploymentScope,
        _name: &DeploymentName,
        _artifact: &Artifact,
        parameters: &ArmParameters,
    ) -> Result<Vec<PreviewChange>, ControlPlaneError> {
        Ok(parameters
            .keys()
            .map(|name| PreviewChange {
                change_type: ChangeType::Create,
                resource_type: "Microsoft.Web/sites".into(),
                resource_name: name.clone(),
            })
            .collect())
    }

    async fn calculate_template_hash(
        &self,
        _subscription: &SubscriptionId,
        _artifact: &Artifact,
    ) -> Result<String, ControlPlaneError> {
        Ok(TEMPLATE_HASH.to_string())
    }

    async fn list_operations(
        &self,
        _scope: &DeploymentScope,
        _name: &DeploymentName,
    ) -> Result<Vec<DeploymentOperation>, ControlPlaneError> {
        self.operation_polls.fetch_add(1, Ordering::SeqCst);
        let mut plane = self.state.lock();
        if plane.failing_operation_polls > 0 {
            plane.failing_operation_polls -= 1;
            return Err(ControlPlaneError::Request("operations temporarily unavailable".into()));
        }
        Ok(plane.operations.clone())
    }
}

#[async_trait]
impl ResourceOps for FakeControlPlane {
    async fn list_resource_groups(
        &self,
        _subscription: &SubscriptionId,
    ) -> Result<Vec<ResourceGroupName>, ControlPlaneError> {
        Ok(self
            .state
            .lock()
            .groups
            .keys()
            .map(|g| ResourceGroupName::new(g.clone()))
            .collect())
    }

    async fn list_resource_group_resources(
        &self,
        _subscription: &SubscriptionId,
        group: &ResourceGroupName,
    ) -> Result<Vec<Resource>, ControlPlaneError> {
        self.state
            .lock()
            .groups
            .get(group.as_str())
            .cloned()
            .ok_or_else(|| ControlPlaneError::NotFound(group.to_string()))
    }

    async fn delete_resource_group(
        &self,
        _subscription: &SubscriptionId,
        group: &ResourceGroupName,
    ) -> Result<(), ControlPlaneError> {
        let mut plane = self.state.lock();
        if plane.groups.remove(group.as_str()).is_none() {
            return Err(ControlPlaneError::NotFound(group.to_string()));
        }
        plane.deleted_groups.push(group.to_string());
        Ok(())
    }
}

#[async_trait]
impl PurgeOps for FakeControlPlane {
    async fn soft_delete_state(
        &self,
        _kind: SoftDeleteKind,
        resource: &Resource,
    ) -> Result<SoftDeleteState, ControlPlaneError> {
        Ok(self
            .state
            .lock()
            .soft_delete
            .get(&resource.name)
            .copied()
            .unwrap_or_default())
    }

    async fn purge(
        &self,
        _kind: SoftDeleteKind,
        resource: &Resource,
    ) -> Result<(), ControlPlaneError> {
        self.state.lock().purged.push(resource.name.clone());
        Ok(())
    }
}

#[async_trait]
impl LocationOps for FakeControlPlane {
    async fn list_locations(
        &self,
        _subscription: &SubscriptionId,
    ) -> Result<Vec<Location>, ControlPlaneError> {
        self.location_queries.fetch_add(1, Ordering::SeqCst);
        Ok(self.state.lock().locations.clone())
    }

    async fn list_usages(
        &self,
        _subscription: &SubscriptionId,
        location: &str,
    ) -> Result<Vec<Usage>, ControlPlaneError> {
        let plane = self.state.lock();
        if plane.failing_usages.contains(location) {
            return Err(ControlPlaneError::Request(format!("usages of {location}")));
        }
        Ok(plane.usages.get(location).cloned().unwrap_or_default())
    }
}

/// One scripted console answer.
#[derive(Debug, Clone)]
pub enum Answer {
    Text(&'static str),
    Select(usize),
    Confirm(bool),
}

/// Console that replays scripted answers and records what was asked.
///
/// Running out of answers, or getting the wrong kind, is an error.
#[derive(Debug, Default)]
pub struct ScriptedConsole {
    answers: Mutex<VecDeque<Answer>>,
    asked: Mutex<Vec<String>>,
    options: Mutex<Vec<Vec<String>>>,
    messages: Mutex<Vec<String>>,
}

impl ScriptedConsole {
    pub fn new(answers: impl IntoIterator<Item = Answer>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Every prompt, select and confirm message, in order.
    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().clone()
    }

    /// Options shown by each select, in order.
    pub fn select_options(&self) -> Vec<Vec<String>> {
        self.options.lock().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    pub fn remaining(&self) -> usize {
        self.answers.lock().len()
    }

    fn next(&self, message: &str) -> Result<Answer, ConsoleError> {
        self.asked.lock().push(message.to_string());
        self.answers
            .lock()
            .pop_front()
            .ok_or_else(|| ConsoleError::Unavailable(format!("no scripted answer for '{message}'")))
    }
}

impl Console for ScriptedConsole {
    fn prompt(&self, options: &PromptOptions) -> Result<String, ConsoleError> {
        match self.next(&options.message)? {
            Answer::Text(text) => Ok(text.to_string()),
            other => Err(ConsoleError::Unavailable(format!(
                "expected text for '{}', scripted {other:?}",
                options.message
            ))),
        }
    }

    fn select(&self, message: &str, options: &[String], _default: usize) -> Result<usize, ConsoleError> {
        self.options.lock().push(options.to_vec());
        match self.next(message)? {
            Answer::Select(index) => Ok(index),
            other => Err(ConsoleError::Unavailable(format!(
                "expected a selection for '{message}', scripted {other:?}"
            ))),
        }
    }

    fn confirm(&self, message: &str, _default: bool) -> Result<bool, ConsoleError> {
        match self.next(message)? {
            Answer::Confirm(yes) => Ok(yes),
            other => Err(ConsoleError::Unavailable(format!(
                "expected a confirmation for '{message}', scripted {other:?}"
            ))),
        }
    }

    fn message(&self, text: &str) {
        self.messages.lock().push(text.to_string());
    }

    fn show_progress(&self, _text: &str) {}

    fn stop_progress(&self) {}
}

/// Compiler that hands back a fixed template and counts compilations.
#[derive(Debug)]
pub struct FixedCompiler {
    template: Template,
    compiles: AtomicUsize,
}

impl FixedCompiler {
    pub fn new(template: Template) -> Self {
        Self {
            template,
            compiles: AtomicUsize::new(0),
        }
    }

    pub fn from_json(doc: Value) -> Self {
        Self::new(Template::from_arm_json(serde_json::to_vec(&doc).unwrap()).unwrap())
    }

    pub fn compiles(&self) -> usize {
        self.compiles.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TemplateCompiler for FixedCompiler {
    async fn compile(&self, _module_path: &Path) -> Result<Template, TemplateError> {
        self.compiles.fetch_add(1, Ordering::SeqCst);
        Ok(self.template.clone())
    }
}

pub const SUBSCRIPTION_SCHEMA: &str =
    "https://schema.management.azure.com/schemas/2018-05-01/subscriptionDeploymentTemplate.json#";
