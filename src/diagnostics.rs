// ABOUTME: Diagnostics accumulator for non-fatal warnings during provisioning.
// ABOUTME: Collects best-effort failures that shouldn't abort but should be shown to users.

/// Collects non-fatal warnings during provision and destroy operations.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!("{}", warning.message);
        self.warnings.push(warning);
    }

    /// Get all collected warnings.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Check if any warnings were collected.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Check whether a warning of the given kind was recorded.
    pub fn has(&self, kind: WarningKind) -> bool {
        self.warnings.iter().any(|w| w.kind == kind)
    }
}

/// A non-fatal warning collected during an operation.
#[derive(Debug, Clone)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    /// Saving resolved parameters to the configuration store failed.
    pub fn parameter_persistence(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::ParameterPersistence,
            message: message.into(),
        }
    }

    /// A saved value no longer matches its parameter's type and was dropped.
    pub fn stale_saved_value(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::StaleSavedValue,
            message: message.into(),
        }
    }

    /// Deployment state could not be determined; a full deployment follows.
    pub fn state_unknown(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::StateUnknown,
            message: message.into(),
        }
    }

    /// A resource group had already been deleted.
    pub fn missing_resource_group(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::MissingResourceGroup,
            message: message.into(),
        }
    }

    /// Writing the history-preserving empty deployment failed.
    pub fn history_deployment(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::HistoryDeployment,
            message: message.into(),
        }
    }
}

/// Categories of warnings that can occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// Resolved parameters could not be saved.
    ParameterPersistence,
    /// Saved value discarded because its type changed.
    StaleSavedValue,
    /// Previous deployment state or hashes unavailable.
    StateUnknown,
    /// Resource group already gone during destroy.
    MissingResourceGroup,
    /// Empty teardown deployment could not be written.
    HistoryDeployment,
}
