// ABOUTME: Parameter resolution engine for template inputs.
// ABOUTME: Combines parameter files, saved config and ordered interactive prompts.

mod error;
mod graph;
mod password;
mod prompt;
mod quota;
mod resolver;
mod session;
mod validate;

pub use error::ParamError;
pub use graph::prompt_order;
pub use password::generate as generate_value;
pub use quota::{UsageRequirement, locations_with_quota};
pub use resolver::{ParameterResolver, ResolveContext, ResolvedParameters};
pub use session::SessionContext;
pub use validate::{validate_input, validate_length, validate_range};
