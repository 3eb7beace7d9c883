// ABOUTME: Progress reporting while a deployment is in flight.
// ABOUTME: Polls deployment operations on a timer until told the deployment returned.

use std::collections::HashSet;

use tokio::sync::Notify;

use crate::config::ProgressConfig;
use crate::console::Console;
use crate::control_plane::{DeploymentOperation, DeploymentOps, ProvisioningState};

use super::target::DeploymentTarget;

/// Poll operations of `target` and publish them until `done` is notified.
///
/// Runs beside the deployment call. Polling failures are logged and never
/// reach the caller. Each operation is reported once it reaches a terminal
/// state.
pub async fn report_progress<D>(
    target: &DeploymentTarget,
    ops: &D,
    console: &dyn Console,
    config: &ProgressConfig,
    done: &Notify,
) where
    D: DeploymentOps + ?Sized,
{
    let mut reported: HashSet<String> = HashSet::new();
    let mut delay = config.initial_delay;

    loop {
        tokio::select! {
            _ = done.notified() => break,
            _ = tokio::time::sleep(delay) => {}
        }
        delay = config.interval;

        let mut operations = match target.list_operations(ops).await {
            Ok(operations) => operations,
            Err(e) => {
                tracing::warn!(deployment = %target.name(), error = %e, "failed to poll deployment progress");
                continue;
            }
        };
        operations.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

        let mut running = 0usize;
        for op in &operations {
            if !op.state.is_terminal() {
                running += 1;
                continue;
            }
            if reported.insert(op.operation_id.clone()) {
                console.message(&describe(op));
            }
        }

        if running > 0 {
            console.show_progress(&format!("Deploying ({running} in progress)"));
        }
    }

    console.stop_progress();
}

fn describe(op: &DeploymentOperation) -> String {
    let verb = match op.state {
        ProvisioningState::Succeeded => "Done",
        _ => "Failed",
    };
    format!("  {verb}: {} {}", op.resource_type, op.resource_name)
}
