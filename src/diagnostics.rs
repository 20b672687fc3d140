// ABOUTME: Diagnostics accumulator for non-fatal warnings during a pipeline run.
// ABOUTME: Collects warnings that shouldn't fail a deployment but should be shown to users.

/// Collects non-fatal warnings during pipeline operations.
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

    /// Warning messages, for embedding in the run record.
    pub fn messages(&self) -> Vec<String> {
        self.warnings.iter().map(|w| w.message.clone()).collect()
    }
}

/// A non-fatal warning collected during a pipeline run.
#[derive(Debug, Clone)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    /// Database credential attachment failed after the service was deployed.
    pub fn database_attach(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::DatabaseAttach,
            message: message.into(),
        }
    }

    /// Cache credential attachment failed after the service was deployed.
    pub fn cache_attach(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::CacheAttach,
            message: message.into(),
        }
    }

    /// Generic secret attachment failed after the service was deployed.
    pub fn secrets_attach(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::SecretsAttach,
            message: message.into(),
        }
    }

    /// Posting the run summary to the tracking endpoint failed.
    pub fn report(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::Report,
            message: message.into(),
        }
    }
}

/// Categories of warnings that can occur during a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// Database credential object could not be created or updated.
    DatabaseAttach,
    /// Cache credential object could not be created or updated.
    CacheAttach,
    /// Generic secret object could not be created or updated.
    SecretsAttach,
    /// Run summary could not be posted to the tracking endpoint.
    Report,
}
