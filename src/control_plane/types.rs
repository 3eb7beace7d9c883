// ABOUTME: Provider-shaped records exchanged with the control plane.
// ABOUTME: Deployments, resources, operations, locations and quota usages.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::types::{DeploymentName, ResourceGroupName, ResourceId, SubscriptionId};

/// Tag carrying the environment name on every deployment.
pub const TAG_ENV_NAME: &str = "terrane-env-name";
/// Tag carrying the parameter hash of a deployment.
pub const TAG_PARAM_HASH: &str = "terrane-provision-param-hash";
/// Tag recording why a deployment was issued.
pub const TAG_DEPLOY_REASON: &str = "terrane-deploy-reason";

/// Raw compiled template as sent to the control plane.
pub type Artifact = Bytes;

/// Parameters as sent to the control plane: name to JSON value.
pub type ArmParameters = BTreeMap<String, serde_json::Value>;

/// The scope a deployment is issued against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeploymentScope {
    Subscription {
        subscription: SubscriptionId,
        location: String,
    },
    ResourceGroup {
        subscription: SubscriptionId,
        resource_group: ResourceGroupName,
    },
}

impl DeploymentScope {
    pub fn subscription(&self) -> &SubscriptionId {
        match self {
            DeploymentScope::Subscription { subscription, .. }
            | DeploymentScope::ResourceGroup { subscription, .. } => subscription,
        }
    }
}

impl std::fmt::Display for DeploymentScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeploymentScope::Subscription { subscription, .. } => {
                write!(f, "subscription {subscription}")
            }
            DeploymentScope::ResourceGroup {
                subscription,
                resource_group,
            } => write!(f, "resource group {resource_group} in {subscription}"),
        }
    }
}

/// Provisioning state of a deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProvisioningState {
    Accepted,
    Running,
    Succeeded,
    Failed,
    Canceled,
    Deleting,
    Other(String),
}

impl ProvisioningState {
    /// Succeeded and Failed are the only terminal states.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProvisioningState::Succeeded | ProvisioningState::Failed)
    }
}

impl std::fmt::Display for ProvisioningState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProvisioningState::Accepted => write!(f, "Accepted"),
            ProvisioningState::Running => write!(f, "Running"),
            ProvisioningState::Succeeded => write!(f, "Succeeded"),
            ProvisioningState::Failed => write!(f, "Failed"),
            ProvisioningState::Canceled => write!(f, "Canceled"),
            ProvisioningState::Deleting => write!(f, "Deleting"),
            ProvisioningState::Other(s) => write!(f, "{s}"),
        }
    }
}

/// A single deployment output as reported by the control plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentOutput {
    #[serde(rename = "type")]
    pub output_type: String,
    pub value: serde_json::Value,
}

/// A nested dependency of a deployment. Failed deployments only report these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub resource_type: String,
    pub resource_name: String,
    pub depends_on: Vec<Dependency>,
}

/// A deployment attempt tracked by the control plane.
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentRecord {
    pub id: String,
    pub name: DeploymentName,
    pub state: ProvisioningState,
    pub timestamp: DateTime<Utc>,
    pub location: Option<String>,
    pub tags: HashMap<String, String>,
    pub template_hash: Option<String>,
    pub outputs: BTreeMap<String, DeploymentOutput>,
    pub output_resources: Vec<ResourceId>,
    pub dependencies: Vec<Dependency>,
    /// Error reported for a failed deployment.
    pub error: Option<String>,
}

impl DeploymentRecord {
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    pub fn env_name(&self) -> Option<&str> {
        self.tag(TAG_ENV_NAME)
    }

    pub fn param_hash(&self) -> Option<&str> {
        self.tag(TAG_PARAM_HASH)
    }
}

/// A resource living in a resource group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub id: ResourceId,
    pub name: String,
    pub resource_type: String,
    pub kind: Option<String>,
    pub location: String,
}

/// One operation within a deployment, used for progress reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentOperation {
    pub operation_id: String,
    pub resource_type: String,
    pub resource_name: String,
    pub state: ProvisioningState,
    pub timestamp: DateTime<Utc>,
}

/// A change proposed by a preview (what-if) call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewChange {
    pub change_type: ChangeType,
    pub resource_type: String,
    pub resource_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChangeType {
    Create,
    Modify,
    Delete,
    NoChange,
    Ignore,
    Deploy,
    Unsupported,
}

/// An available region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub name: String,
    pub display_name: String,
}

/// Quota usage of one named usage in a location.
#[derive(Debug, Clone, PartialEq)]
pub struct Usage {
    pub name: String,
    pub current_value: f64,
    pub limit: f64,
}

impl Usage {
    pub fn remaining(&self) -> f64 {
        self.limit - self.current_value
    }
}

/// Soft-delete related flags of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SoftDeleteState {
    pub soft_delete_enabled: bool,
    pub purge_protection_enabled: bool,
}

impl SoftDeleteState {
    /// A resource can be purged when it is soft-deleted and not purge protected.
    pub fn is_purgeable(&self) -> bool {
        self.soft_delete_enabled && !self.purge_protection_enabled
    }
}

/// Resource types that keep their name reserved after deletion until purged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SoftDeleteKind {
    KeyVault,
    ManagedHsm,
    AppConfiguration,
    ApiManagement,
    CognitiveAccount,
}

impl SoftDeleteKind {
    /// Map a provider resource type to its soft-delete kind.
    pub fn from_resource_type(resource_type: &str) -> Option<Self> {
        match resource_type.to_ascii_lowercase().as_str() {
            "microsoft.keyvault/vaults" => Some(SoftDeleteKind::KeyVault),
            "microsoft.keyvault/managedhsms" => Some(SoftDeleteKind::ManagedHsm),
            "microsoft.appconfiguration/configurationstores" => {
                Some(SoftDeleteKind::AppConfiguration)
            }
            "microsoft.apimanagement/service" => Some(SoftDeleteKind::ApiManagement),
            "microsoft.cognitiveservices/accounts" => Some(SoftDeleteKind::CognitiveAccount),
            _ => None,
        }
    }

    /// Plural, human-readable name used in confirmations.
    pub fn display_plural(&self) -> &'static str {
        match self {
            SoftDeleteKind::KeyVault => "Key Vaults",
            SoftDeleteKind::ManagedHsm => "Managed HSMs",
            SoftDeleteKind::AppConfiguration => "App Configurations",
            SoftDeleteKind::ApiManagement => "API Managements",
            SoftDeleteKind::CognitiveAccount => "Cognitive Accounts",
        }
    }
}

impl std::fmt::Display for SoftDeleteKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SoftDeleteKind::KeyVault => "key vault",
            SoftDeleteKind::ManagedHsm => "managed HSM",
            SoftDeleteKind::AppConfiguration => "app configuration",
            SoftDeleteKind::ApiManagement => "API management service",
            SoftDeleteKind::CognitiveAccount => "cognitive account",
        };
        write!(f, "{name}")
    }
}
