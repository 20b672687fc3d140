// ABOUTME: Classifies log lines against the pattern table, first match wins.
// ABOUTME: A classified error carries the fix candidates registered for its category.

use std::collections::HashMap;
use std::sync::Arc;

use super::fixes::{FixStrategy, default_fixes};
use super::patterns::{Category, ErrorPattern, default_patterns};

/// A log line classified as a known failure, with its remediation candidates.
#[derive(Debug, Clone)]
pub struct DeploymentError {
    pub pattern: Arc<ErrorPattern>,
    pub line: String,
    pub suggestions: Vec<FixStrategy>,
}

/// Matches log lines against the pattern table in priority order.
pub struct Classifier {
    patterns: Vec<Arc<ErrorPattern>>,
    fixes: HashMap<Category, Vec<FixStrategy>>,
}

impl Default for Classifier {
    fn default() -> Self {
        Classifier {
            patterns: default_patterns(),
            fixes: default_fixes(),
        }
    }
}

impl Classifier {
    pub fn new(
        patterns: Vec<Arc<ErrorPattern>>,
        fixes: HashMap<Category, Vec<FixStrategy>>,
    ) -> Self {
        Classifier { patterns, fixes }
    }

    /// Classify one line. Matching is case-insensitive and the first pattern
    /// in priority order wins; benign lines yield `None`.
    pub fn classify(&self, line: &str) -> Option<DeploymentError> {
        let lowered = line.to_lowercase();
        let pattern = self.patterns.iter().find(|p| p.matches(&lowered))?;
        let suggestions = self
            .fixes
            .get(&pattern.category)
            .cloned()
            .unwrap_or_default();

        Some(DeploymentError {
            pattern: Arc::clone(pattern),
            line: line.to_string(),
            suggestions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn benign_line_is_not_classified() {
        let classifier = Classifier::default();
        assert!(classifier.classify("build successful").is_none());
    }

    #[test]
    fn classification_is_case_insensitive() {
        let classifier = Classifier::default();
        let error = classifier.classify("ERROR: Failed To Build app").unwrap();
        assert_eq!(error.pattern.category, Category::BuildpackFailure);
        assert_eq!(error.line, "ERROR: Failed To Build app");
    }

    #[test]
    fn first_pattern_wins_on_overlap() {
        // "failed to build" (buildpack) is registered before "unauthorized".
        let classifier = Classifier::default();
        let error = classifier
            .classify("failed to build: registry said unauthorized")
            .unwrap();
        assert_eq!(error.pattern.category, Category::BuildpackFailure);
    }

    #[test]
    fn classified_error_carries_suggestions() {
        let classifier = Classifier::default();
        let error = classifier.classify("no basic auth credentials").unwrap();
        assert_eq!(error.pattern.category, Category::RegistryAuthFailed);
        assert!(!error.suggestions.is_empty());
    }
}
