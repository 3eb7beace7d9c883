// ABOUTME: Purge candidates: soft-deletable resources whose names stay reserved after deletion.
// ABOUTME: Classifies, summarises for confirmation and purges grouped by kind.

use std::collections::BTreeMap;

use crate::control_plane::{
    ControlPlaneError, PurgeOps, Resource, SoftDeleteKind, SoftDeleteState,
};

use super::error::DestroyError;
use super::state::GroupInventory;

/// A soft-deletable resource that can be purged once deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurgeCandidate {
    pub kind: SoftDeleteKind,
    pub resource: Resource,
    pub state: SoftDeleteState,
}

/// What happened to one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurgeStatus {
    Purged,
    /// The user chose to keep it soft-deleted.
    Skipped,
    /// It was already gone when the purge ran.
    AlreadyGone,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurgeOutcome {
    pub kind: SoftDeleteKind,
    pub name: String,
    pub status: PurgeStatus,
}

/// Inspect every soft-deletable resource in `groups` and keep the purgeable ones.
pub async fn classify<P>(
    ops: &P,
    groups: &[GroupInventory],
) -> Result<Vec<PurgeCandidate>, DestroyError>
where
    P: PurgeOps + ?Sized,
{
    let mut candidates = Vec::new();
    for resource in groups.iter().flat_map(|g| g.resources.iter()) {
        let Some(kind) = SoftDeleteKind::from_resource_type(&resource.resource_type) else {
            continue;
        };

        let state = ops
            .soft_delete_state(kind, resource)
            .await
            .map_err(|source| DestroyError::Inspect {
                kind,
                name: resource.name.clone(),
                source,
            })?;

        if state.is_purgeable() {
            candidates.push(PurgeCandidate {
                kind,
                resource: resource.clone(),
                state,
            });
        } else {
            tracing::debug!(resource = %resource.name, ?state, "not purgeable");
        }
    }
    Ok(candidates)
}

/// One line per kind: "2 Key Vaults".
pub fn summarize(candidates: &[PurgeCandidate]) -> Vec<String> {
    let mut counts: BTreeMap<SoftDeleteKind, usize> = BTreeMap::new();
    for candidate in candidates {
        *counts.entry(candidate.kind).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(kind, count)| format!("{count} {}", kind.display_plural()))
        .collect()
}

/// Mark every candidate skipped.
pub fn skip_all(candidates: &[PurgeCandidate]) -> Vec<PurgeOutcome> {
    candidates
        .iter()
        .map(|c| PurgeOutcome {
            kind: c.kind,
            name: c.resource.name.clone(),
            status: PurgeStatus::Skipped,
        })
        .collect()
}

/// Purge candidates grouped by kind, cognitive accounts further by account kind.
///
/// A candidate that is already gone is recorded and the batch continues; any
/// other failure aborts.
pub async fn purge_all<P>(
    ops: &P,
    candidates: &[PurgeCandidate],
) -> Result<Vec<PurgeOutcome>, DestroyError>
where
    P: PurgeOps + ?Sized,
{
    let mut batches: BTreeMap<(SoftDeleteKind, Option<&str>), Vec<&PurgeCandidate>> =
        BTreeMap::new();
    for candidate in candidates {
        let sub_kind = match candidate.kind {
            SoftDeleteKind::CognitiveAccount => candidate.resource.kind.as_deref(),
            _ => None,
        };
        batches
            .entry((candidate.kind, sub_kind))
            .or_default()
            .push(candidate);
    }

    let mut outcomes = Vec::with_capacity(candidates.len());
    for ((kind, sub_kind), batch) in batches {
        tracing::info!(%kind, sub_kind, count = batch.len(), "purging");
        for candidate in batch {
            let status = match ops.purge(kind, &candidate.resource).await {
                Ok(()) => PurgeStatus::Purged,
                Err(ControlPlaneError::NotFound(_)) => {
                    tracing::warn!(resource = %candidate.resource.name, "already purged");
                    PurgeStatus::AlreadyGone
                }
                Err(source) => {
                    return Err(DestroyError::Purge {
                        kind,
                        name: candidate.resource.name.clone(),
                        source,
                    });
                }
            };
            outcomes.push(PurgeOutcome {
                kind,
                name: candidate.resource.name.clone(),
                status,
            });
        }
    }
    Ok(outcomes)
}
