// ABOUTME: Environment teardown using the type state pattern.
// ABOUTME: Deletes resource groups, purges soft-deleted resources and keeps deployment history.

mod error;
mod purge;
mod state;
mod teardown;

pub use error::DestroyError;
pub use purge::{PurgeCandidate, PurgeOutcome, PurgeStatus};
pub use state::{Classified, Completed, GroupInventory, GroupsDeleted, Inventoried, Located, Purged};
pub use teardown::{DestroyOptions, DestroyResult, TEARDOWN_REASON, Teardown};

use crate::console::Console;
use crate::control_plane::ControlPlane;
use crate::deploy::DeploymentTarget;
use crate::diagnostics::Diagnostics;
use crate::types::EnvName;

/// Run every teardown step in order.
///
/// Warnings are appended to `diagnostics`, also when a later step fails.
pub async fn destroy<C>(
    target: DeploymentTarget,
    control_plane: &C,
    console: &dyn Console,
    env_name: &EnvName,
    options: &DestroyOptions,
    diagnostics: &mut Diagnostics,
) -> Result<DestroyResult, DestroyError>
where
    C: ControlPlane + ?Sized,
{
    let result = Teardown::locate(target, control_plane, console, env_name, options.clone())
        .await?
        .inventory(control_plane, diagnostics)
        .await?
        .classify(control_plane)
        .await?
        .delete_groups(control_plane, console, diagnostics)
        .await?
        .purge(control_plane, console)
        .await?
        .preserve_history(control_plane, diagnostics)
        .await
        .finish();

    Ok(result)
}
