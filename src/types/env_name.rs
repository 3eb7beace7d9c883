// ABOUTME: Validated environment name.
// ABOUTME: Environment names become tag values and deployment name prefixes.

use std::fmt;
use thiserror::Error;

/// Maximum environment name length accepted by the control plane for tags and names.
const MAX_LEN: usize = 64;

#[derive(Debug, Error)]
pub enum EnvNameError {
    #[error("environment name cannot be empty")]
    Empty,

    #[error("environment name exceeds maximum length of {MAX_LEN} characters")]
    TooLong,

    #[error("invalid character in environment name: '{0}'")]
    InvalidChar(char),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnvName(String);

impl EnvName {
    pub fn new(value: &str) -> Result<Self, EnvNameError> {
        if value.is_empty() {
            return Err(EnvNameError::Empty);
        }

        if value.len() > MAX_LEN {
            return Err(EnvNameError::TooLong);
        }

        for c in value.chars() {
            if !c.is_ascii_alphanumeric() && !matches!(c, '-' | '_' | '.' | '(' | ')') {
                return Err(EnvNameError::InvalidChar(c));
            }
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EnvName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
