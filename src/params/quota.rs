// ABOUTME: Quota requirements declared by location parameters.
// ABOUTME: Filters candidate locations to those with enough remaining capacity.

use futures::future::join_all;
use std::fmt;

use super::error::ParamError;
use crate::control_plane::{LocationOps, Usage};
use crate::types::SubscriptionId;

/// One `"<usage-name>[, <capacity>]"` entry.
#[derive(Debug, Clone, PartialEq)]
pub struct UsageRequirement {
    pub usage_name: String,
    pub capacity: f64,
}

impl UsageRequirement {
    /// Parse a requirement whose `$(p:...)` references are already substituted.
    pub fn parse(text: &str) -> Result<Self, ParamError> {
        let invalid = |reason: &str| ParamError::InvalidQuota {
            requirement: text.to_string(),
            reason: reason.to_string(),
        };

        let (name, capacity) = match text.split_once(',') {
            Some((name, capacity)) => {
                let capacity: f64 = capacity
                    .trim()
                    .parse()
                    .map_err(|_| invalid("capacity must be a number"))?;
                (name.trim(), capacity)
            }
            None => (text.trim(), 1.0),
        };

        if name.is_empty() {
            return Err(invalid("usage name is empty"));
        }
        if capacity.is_nan() || capacity <= 0.0 {
            return Err(invalid("capacity must be greater than zero"));
        }

        Ok(Self {
            usage_name: name.to_string(),
            capacity,
        })
    }

    fn satisfied_by(&self, usages: &[Usage]) -> bool {
        usages
            .iter()
            .find(|u| u.name.eq_ignore_ascii_case(&self.usage_name))
            .is_some_and(|u| u.remaining() >= self.capacity)
    }
}

impl fmt::Display for UsageRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ( Cap: {} )", self.usage_name, self.capacity)
    }
}

/// Keep the `candidates` where every requirement fits.
///
/// Usage queries run concurrently. A location whose usages cannot be listed
/// is skipped rather than failing the whole prompt.
pub async fn locations_with_quota<L>(
    ops: &L,
    subscription: &SubscriptionId,
    candidates: &[String],
    requirements: &[UsageRequirement],
) -> Result<Vec<String>, ParamError>
where
    L: LocationOps + ?Sized,
{
    if requirements.is_empty() {
        return Ok(candidates.to_vec());
    }

    let lookups = candidates.iter().map(|location| async move {
        match ops.list_usages(subscription, location).await {
            Ok(usages) => requirements
                .iter()
                .all(|r| r.satisfied_by(&usages))
                .then(|| location.clone()),
            Err(e) => {
                tracing::warn!(location = %location, error = %e, "failed to list usages");
                None
            }
        }
    });

    let qualifying: Vec<String> = join_all(lookups).await.into_iter().flatten().collect();

    if qualifying.is_empty() {
        let requirements = requirements
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        return Err(ParamError::NoQuotaLocation { requirements });
    }

    tracing::debug!(count = qualifying.len(), "locations with enough quota");
    Ok(qualifying)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_defaults_to_one() {
        let req = UsageRequirement::parse("OpenAI.S0.AccountCount").unwrap();
        assert_eq!(req.usage_name, "OpenAI.S0.AccountCount");
        assert_eq!(req.capacity, 1.0);
    }

    #[test]
    fn parses_explicit_capacity() {
        let req = UsageRequirement::parse("OpenAI.Standard.gpt-4o, 30").unwrap();
        assert_eq!(req.usage_name, "OpenAI.Standard.gpt-4o");
        assert_eq!(req.capacity, 30.0);
    }

    #[test]
    fn rejects_non_positive_or_malformed_capacity() {
        assert!(matches!(
            UsageRequirement::parse("x, 0"),
            Err(ParamError::InvalidQuota { .. })
        ));
        assert!(UsageRequirement::parse("x, -2").is_err());
        assert!(UsageRequirement::parse("x, lots").is_err());
        assert!(UsageRequirement::parse(" , 3").is_err());
    }

    #[test]
    fn requirement_matches_usage_case_insensitively() {
        let req = UsageRequirement::parse("openai.s0, 5").unwrap();
        let usages = vec![Usage {
            name: "OpenAI.S0".into(),
            current_value: 5.0,
            limit: 10.0,
        }];
        assert!(req.satisfied_by(&usages));

        let tight = UsageRequirement::parse("openai.s0, 6").unwrap();
        assert!(!tight.satisfied_by(&usages));
        assert!(!req.satisfied_by(&[]));
    }

    #[test]
    fn display_names_capacity() {
        let req = UsageRequirement::parse("OpenAI.S0, 10").unwrap();
        assert_eq!(req.to_string(), "OpenAI.S0 ( Cap: 10 )");
    }
}
