// ABOUTME: Known failure signatures matched against lowercased log lines.
// ABOUTME: Pattern order is priority order: the first match wins.

use serde::Serialize;
use std::sync::Arc;

/// How urgent a detected failure is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// Failure category a pattern classifies into. Fix strategies are registered
/// per category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    BuildpackFailure,
    RegistryAuthFailed,
    RepositoryNotFound,
    RevisionMissing,
    ImagePullBackoff,
    DnsResolutionFailed,
    PermissionDenied,
    LoadBalancerPending,
}

impl Category {
    pub fn all() -> [Category; 8] {
        [
            Category::BuildpackFailure,
            Category::RegistryAuthFailed,
            Category::RepositoryNotFound,
            Category::RevisionMissing,
            Category::ImagePullBackoff,
            Category::DnsResolutionFailed,
            Category::PermissionDenied,
            Category::LoadBalancerPending,
        ]
    }
}

/// A single trigger for a pattern. Lines are lowercased before matching, so
/// substrings must be lowercase too.
#[derive(Debug, Clone)]
pub enum Matcher {
    Substring(&'static str),
    Regex(regex::Regex),
}

impl Matcher {
    pub fn matches(&self, lowered: &str) -> bool {
        match self {
            Matcher::Substring(needle) => lowered.contains(needle),
            Matcher::Regex(re) => re.is_match(lowered),
        }
    }
}

/// A named failure signature: any matcher hitting classifies the line.
#[derive(Debug, Clone)]
pub struct ErrorPattern {
    pub name: &'static str,
    pub matchers: Vec<Matcher>,
    pub severity: Severity,
    pub category: Category,
}

impl ErrorPattern {
    pub fn matches(&self, lowered: &str) -> bool {
        self.matchers.iter().any(|m| m.matches(lowered))
    }
}

fn regex(pattern: &str) -> Matcher {
    Matcher::Regex(regex::Regex::new(pattern).expect("pattern regex must compile"))
}

/// The built-in pattern table, in priority order.
pub fn default_patterns() -> Vec<Arc<ErrorPattern>> {
    vec![
        Arc::new(ErrorPattern {
            name: "buildpack_failure",
            matchers: vec![
                Matcher::Substring("failed to fetch base layers"),
                Matcher::Substring("failed to build"),
                Matcher::Substring("buildpack failure"),
            ],
            severity: Severity::High,
            category: Category::BuildpackFailure,
        }),
        Arc::new(ErrorPattern {
            name: "registry_auth_failed",
            matchers: vec![
                Matcher::Substring("authentication failed"),
                Matcher::Substring("unauthorized"),
                Matcher::Substring("no basic auth credentials"),
            ],
            severity: Severity::High,
            category: Category::RegistryAuthFailed,
        }),
        Arc::new(ErrorPattern {
            name: "repository_not_found",
            matchers: vec![
                Matcher::Substring("repository not found"),
                Matcher::Substring("no such repository"),
                Matcher::Substring("name unknown"),
            ],
            severity: Severity::Medium,
            category: Category::RepositoryNotFound,
        }),
        Arc::new(ErrorPattern {
            name: "revision_missing",
            matchers: vec![
                Matcher::Substring("revision missing"),
                Matcher::Substring("revision not found"),
            ],
            severity: Severity::Medium,
            category: Category::RevisionMissing,
        }),
        Arc::new(ErrorPattern {
            name: "image_pull_backoff",
            matchers: vec![
                Matcher::Substring("imagepullbackoff"),
                Matcher::Substring("errimagepull"),
                Matcher::Substring("failed to pull image"),
                Matcher::Substring("manifest unknown"),
            ],
            severity: Severity::High,
            category: Category::ImagePullBackoff,
        }),
        Arc::new(ErrorPattern {
            name: "dns_resolution_failed",
            matchers: vec![
                Matcher::Substring("could not resolve host"),
                Matcher::Substring("no such host"),
                Matcher::Substring("dns failed"),
            ],
            severity: Severity::Medium,
            category: Category::DnsResolutionFailed,
        }),
        Arc::new(ErrorPattern {
            name: "permission_denied",
            matchers: vec![
                Matcher::Substring("permission denied"),
                Matcher::Substring("access denied"),
                Matcher::Substring("forbidden"),
            ],
            severity: Severity::High,
            category: Category::PermissionDenied,
        }),
        Arc::new(ErrorPattern {
            name: "loadbalancer_pending",
            matchers: vec![
                Matcher::Substring("loadbalancer pending"),
                regex(r"external[-\s]+ip.*pending"),
            ],
            severity: Severity::Low,
            category: Category::LoadBalancerPending,
        }),
    ]
}
