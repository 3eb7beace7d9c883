// ABOUTME: Type-safe identifiers and validated domain types.
// ABOUTME: Uses phantom types to keep subscription, group and deployment names apart.

mod env_name;
mod id;
mod resource_id;

pub use env_name::{EnvName, EnvNameError};
pub use id::{DeploymentName, Id, ResourceGroupName, SubscriptionId};
pub use resource_id::{ParseResourceIdError, ResourceId};
