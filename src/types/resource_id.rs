// ABOUTME: Control-plane resource identifier parsing.
// ABOUTME: Handles /subscriptions/{id}/resourceGroups/{name}/providers/... paths.

use std::fmt;
use thiserror::Error;

use super::{ResourceGroupName, SubscriptionId};

#[derive(Debug, Error)]
pub enum ParseResourceIdError {
    #[error("resource id cannot be empty")]
    Empty,

    #[error("resource id must start with '/subscriptions/': {0}")]
    MissingSubscription(String),

    #[error("invalid resource id format: {0}")]
    InvalidFormat(String),
}

/// A parsed resource identifier.
///
/// Only the parts the orchestrator needs are extracted: the subscription, the
/// (optional) resource group and the trailing provider path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceId {
    raw: String,
    subscription: SubscriptionId,
    resource_group: Option<ResourceGroupName>,
    provider_path: Option<String>,
}

impl ResourceId {
    pub fn parse(input: &str) -> Result<Self, ParseResourceIdError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ParseResourceIdError::Empty);
        }

        let segments: Vec<&str> = input.trim_matches('/').split('/').collect();

        match segments.as_slice() {
            [kw, sub, rest @ ..] if kw.eq_ignore_ascii_case("subscriptions") => {
                if sub.is_empty() {
                    return Err(ParseResourceIdError::InvalidFormat(input.to_string()));
                }

                let (resource_group, after_group) = match rest {
                    [kw, group, tail @ ..] if kw.eq_ignore_ascii_case("resourceGroups") => {
                        if group.is_empty() {
                            return Err(ParseResourceIdError::InvalidFormat(input.to_string()));
                        }
                        (Some(ResourceGroupName::new(*group)), tail)
                    }
                    tail => (None, tail),
                };

                let provider_path = match after_group {
                    [] => None,
                    [kw, path @ ..] if kw.eq_ignore_ascii_case("providers") && !path.is_empty() => {
                        Some(path.join("/"))
                    }
                    _ => return Err(ParseResourceIdError::InvalidFormat(input.to_string())),
                };

                Ok(Self {
                    raw: input.to_string(),
                    subscription: SubscriptionId::new(*sub),
                    resource_group,
                    provider_path,
                })
            }
            _ => Err(ParseResourceIdError::MissingSubscription(input.to_string())),
        }
    }

    /// Build the id of a resource group.
    pub fn for_resource_group(subscription: &SubscriptionId, group: &ResourceGroupName) -> Self {
        Self {
            raw: format!("/subscriptions/{}/resourceGroups/{}", subscription, group),
            subscription: subscription.clone(),
            resource_group: Some(group.clone()),
            provider_path: None,
        }
    }

    pub fn subscription(&self) -> &SubscriptionId {
        &self.subscription
    }

    pub fn resource_group(&self) -> Option<&ResourceGroupName> {
        self.resource_group.as_ref()
    }

    /// Provider path after `/providers/`, e.g. `Microsoft.KeyVault/vaults/kv1`.
    pub fn provider_path(&self) -> Option<&str> {
        self.provider_path.as_deref()
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}
