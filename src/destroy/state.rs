// ABOUTME: Teardown state types for the type state pattern.
// ABOUTME: Each state carries what the previous steps discovered.

use crate::control_plane::{DeploymentRecord, Resource};
use crate::types::ResourceGroupName;

use super::purge::{PurgeCandidate, PurgeOutcome};

/// Resources found in one resource group.
#[derive(Debug, Clone)]
pub struct GroupInventory {
    pub name: ResourceGroupName,
    pub resources: Vec<Resource>,
}

/// Prior deployment located.
/// Available actions: `inventory()`
#[derive(Debug, Clone)]
pub struct Located {
    pub(crate) deployment: DeploymentRecord,
}

/// Resource groups listed; already-deleted groups dropped.
/// Available actions: `classify()`
#[derive(Debug, Clone)]
pub struct Inventoried {
    pub(crate) deployment: DeploymentRecord,
    pub(crate) groups: Vec<GroupInventory>,
}

/// Soft-deletable resources identified.
/// Available actions: `delete_groups()`
#[derive(Debug, Clone)]
pub struct Classified {
    pub(crate) deployment: DeploymentRecord,
    pub(crate) groups: Vec<GroupInventory>,
    pub(crate) candidates: Vec<PurgeCandidate>,
}

/// Resource groups deleted.
/// Available actions: `purge()`
#[derive(Debug, Clone)]
pub struct GroupsDeleted {
    pub(crate) deployment: DeploymentRecord,
    pub(crate) groups: Vec<GroupInventory>,
    pub(crate) candidates: Vec<PurgeCandidate>,
}

/// Soft-deleted resources purged or marked skipped.
/// Available actions: `preserve_history()`
#[derive(Debug, Clone)]
pub struct Purged {
    pub(crate) deployment: DeploymentRecord,
    pub(crate) groups: Vec<GroupInventory>,
    pub(crate) purged: Vec<PurgeOutcome>,
}

/// History-preserving deployment written (or its failure recorded).
/// Available actions: `finish()`
#[derive(Debug, Clone)]
pub struct Completed {
    pub(crate) deployment: DeploymentRecord,
    pub(crate) groups: Vec<GroupInventory>,
    pub(crate) purged: Vec<PurgeOutcome>,
}
