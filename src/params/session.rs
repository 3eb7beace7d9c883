// ABOUTME: Per-run session context shared across parameter resolutions.
// ABOUTME: Carries the shared location once fixed, instead of global state.

use crate::types::SubscriptionId;

/// State shared by every resolution within one run.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    subscription: Option<SubscriptionId>,
    shared_location: Option<String>,
    location_fixed_this_run: bool,
}

impl SessionContext {
    pub fn new(subscription: Option<SubscriptionId>) -> Self {
        Self {
            subscription,
            shared_location: None,
            location_fixed_this_run: false,
        }
    }

    /// Start with a location already known (e.g. from the environment store).
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.shared_location = Some(location.into());
        self
    }

    pub fn subscription(&self) -> Option<&SubscriptionId> {
        self.subscription.as_ref()
    }

    pub fn shared_location(&self) -> Option<&str> {
        self.shared_location.as_deref()
    }

    /// Fix the shared location for the rest of the run.
    pub fn fix_location(&mut self, location: impl Into<String>) {
        self.shared_location = Some(location.into());
        self.location_fixed_this_run = true;
    }

    /// True when `fix_location` was called during this run.
    pub fn location_fixed_this_run(&self) -> bool {
        self.location_fixed_this_run
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preset_location_is_not_marked_as_fixed() {
        let session = SessionContext::new(None).with_location("eastus");
        assert_eq!(session.shared_location(), Some("eastus"));
        assert!(!session.location_fixed_this_run());
    }

    #[test]
    fn fixing_location_marks_session() {
        let mut session = SessionContext::default();
        session.fix_location("westus");
        assert_eq!(session.shared_location(), Some("westus"));
        assert!(session.location_fixed_this_run());
    }
}
