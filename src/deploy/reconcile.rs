// ABOUTME: Decides whether a deployment can be skipped because nothing changed.
// ABOUTME: Compares template and parameter hashes with the last terminal deployment.

use sha2::{Digest, Sha256};

use crate::control_plane::{DeploymentRecord, ProvisioningState};
use crate::params::ResolvedParameters;
use crate::template::Template;

/// Hash of the resolved parameter values, defaults filled in.
///
/// Only names and values contribute, so edits to descriptions or metadata
/// leave the hash unchanged.
pub fn parameter_hash(
    template: &Template,
    parameters: &ResolvedParameters,
) -> Result<String, serde_json::Error> {
    let mut pairs: Vec<(&str, serde_json::Value)> = template
        .parameters
        .iter()
        .filter_map(|def| {
            let value = match parameters.get(&def.name) {
                Some(value) => Some(value.to_json()),
                None => def.default.clone(),
            };
            value.map(|v| (def.name.as_str(), v))
        })
        .collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));

    let bytes = serde_json::to_vec(&pairs)?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}

/// Outcome of comparing the current inputs with the prior deployment.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Nothing changed; reuse the prior deployment's outputs.
    Skip(Box<DeploymentRecord>),
    /// Deploy, tagging the new attempt with `param_hash` when known.
    Deploy { param_hash: Option<String> },
}

/// Why a prior deployment cannot be reused, if it cannot.
pub fn mismatch_reason(
    prior: &DeploymentRecord,
    template_hash: &str,
    param_hash: &str,
) -> Option<&'static str> {
    if prior.state != ProvisioningState::Succeeded {
        return Some("last deployment did not succeed");
    }
    if prior.template_hash.as_deref() != Some(template_hash) {
        return Some("template changed");
    }
    if prior.param_hash() != Some(param_hash) {
        return Some("parameters changed");
    }
    None
}
