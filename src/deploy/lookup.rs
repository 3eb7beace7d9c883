// ABOUTME: Finds the most recent deployment belonging to an environment.
// ABOUTME: Tag match first, then the legacy bare name, then a name hint with disambiguation.

use crate::console::{Console, ConsoleError};
use crate::control_plane::{DeploymentOps, DeploymentRecord};
use crate::types::EnvName;

use super::error::DeployError;
use super::target::DeploymentTarget;

/// How a deployment matched the environment.
#[derive(Debug, PartialEq)]
pub enum LookupMatch<'a> {
    /// Tagged with the environment name.
    Tagged(&'a DeploymentRecord),
    /// Named exactly like the environment.
    Named(&'a DeploymentRecord),
    /// Names containing the hint, newest first. May be empty.
    Candidates(Vec<&'a DeploymentRecord>),
}

/// Match terminal deployments against the environment.
///
/// `records` must already be terminal-only and sorted newest first.
pub fn match_deployments<'a>(
    records: &'a [DeploymentRecord],
    env_name: &str,
    hint: Option<&str>,
) -> LookupMatch<'a> {
    if let Some(tagged) = records.iter().find(|r| r.env_name() == Some(env_name)) {
        return LookupMatch::Tagged(tagged);
    }

    if let Some(named) = records.iter().find(|r| r.name.as_str() == env_name) {
        return LookupMatch::Named(named);
    }

    let hint = hint.unwrap_or(env_name);
    LookupMatch::Candidates(
        records
            .iter()
            .filter(|r| r.name.as_str().contains(hint))
            .collect(),
    )
}

/// Most recent terminal deployment of `env_name` at the target's scope.
///
/// Several hint matches are resolved by asking the user.
pub async fn find_deployment<D>(
    target: &DeploymentTarget,
    ops: &D,
    env_name: &EnvName,
    hint: Option<&str>,
    console: &dyn Console,
) -> Result<DeploymentRecord, DeployError>
where
    D: DeploymentOps + ?Sized,
{
    let mut records: Vec<DeploymentRecord> = target
        .list_deployments(ops)
        .await?
        .into_iter()
        .filter(|r| r.state.is_terminal())
        .collect();
    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    let found = match match_deployments(&records, env_name.as_str(), hint) {
        LookupMatch::Tagged(record) | LookupMatch::Named(record) => record,
        LookupMatch::Candidates(candidates) => match candidates.as_slice() {
            [] => {
                return Err(DeployError::NoDeploymentsFound {
                    env_name: env_name.to_string(),
                });
            }
            [only] => *only,
            many => {
                let options: Vec<String> = many
                    .iter()
                    .map(|r| format!("{} ({})", r.name, r.timestamp.format("%Y-%m-%d %H:%M:%S UTC")))
                    .collect();
                let choice = console.select(
                    &format!("Select the deployment for environment '{env_name}':"),
                    &options,
                    0,
                )?;
                many.get(choice).copied().ok_or_else(|| {
                    ConsoleError::Unavailable(format!("selection {choice} is out of range"))
                })?
            }
        },
    };

    tracing::debug!(deployment = %found.name, state = %found.state, "found prior deployment");
    Ok(found.clone())
}
