// ABOUTME: Deployment orchestration: targets, lookup, reconciliation and the provisioner.
// ABOUTME: Exports the Provisioner and the building blocks it is made of.

mod cancel;
mod error;
mod lookup;
mod naming;
mod progress;
mod provision;
mod reconcile;
mod retry;
mod target;

pub use cancel::{CancelHandle, CancelToken};
pub use error::{DeployError, DeployErrorKind};
pub use lookup::{LookupMatch, find_deployment, match_deployments};
pub use naming::{MAX_DEPLOYMENT_NAME_LENGTH, deployment_name};
pub use progress::report_progress;
pub use provision::{
    DeployResult, DeploymentState, ProvisionPlan, ProvisionSettings, Provisioner, SkipReason,
    normalize_outputs,
};
pub use reconcile::{Decision, mismatch_reason, parameter_hash};
pub use retry::get_after_write;
pub use target::{DeploymentTarget, TargetError};
