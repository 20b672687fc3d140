// ABOUTME: Fix strategies per failure category and the confidence-based selector.
// ABOUTME: Low-confidence selections escalate to an external analyzer when configured.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::DEFAULT_CONFIDENCE_THRESHOLD;

use super::analysis::{AnalysisRequest, AnalysisResponse, Analyzer};
use super::classifier::DeploymentError;
use super::patterns::Category;

/// A candidate remediation with an a-priori confidence in [0, 1].
#[derive(Debug, Clone, Serialize)]
pub struct FixStrategy {
    pub name: String,
    pub description: String,
    pub confidence: f64,
    pub commands: Vec<String>,
}

impl FixStrategy {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        confidence: f64,
        commands: impl IntoIterator<Item = &'static str>,
    ) -> Self {
        FixStrategy {
            name: name.into(),
            description: description.into(),
            confidence: confidence.clamp(0.0, 1.0),
            commands: commands.into_iter().map(String::from).collect(),
        }
    }

    /// Build a strategy from an external analysis response, clamping the
    /// reported confidence into [0, 1].
    pub fn from_analysis(response: AnalysisResponse) -> Self {
        FixStrategy {
            name: "external_analysis".to_string(),
            description: response.description,
            confidence: response.confidence.clamp(0.0, 1.0),
            commands: response.steps,
        }
    }
}

/// The built-in fix table, keyed by failure category.
pub fn default_fixes() -> HashMap<Category, Vec<FixStrategy>> {
    let mut fixes = HashMap::new();

    fixes.insert(
        Category::BuildpackFailure,
        vec![
            FixStrategy::new(
                "dockerfile_fallback",
                "retry the build with a generated Dockerfile instead of buildpacks",
                0.9,
                ["caravel build --path ."],
            ),
            FixStrategy::new(
                "clear_build_cache",
                "clear the local builder cache and retry",
                0.5,
                ["docker builder prune -f"],
            ),
        ],
    );

    fixes.insert(
        Category::RegistryAuthFailed,
        vec![
            FixStrategy::new(
                "refresh_registry_login",
                "refresh the registry credential and log in again",
                0.85,
                [
                    "aws ecr get-login-password | docker login --username AWS --password-stdin <registry>",
                ],
            ),
            FixStrategy::new(
                "verify_cloud_credentials",
                "verify the active cloud credentials resolve an account identity",
                0.6,
                ["aws sts get-caller-identity"],
            ),
        ],
    );

    fixes.insert(
        Category::RepositoryNotFound,
        vec![FixStrategy::new(
            "create_repository",
            "create the missing image repository",
            0.9,
            ["aws ecr create-repository --repository-name <project>"],
        )],
    );

    fixes.insert(
        Category::RevisionMissing,
        vec![FixStrategy::new(
            "redeploy_service",
            "re-apply the service descriptor to stamp a fresh revision",
            0.7,
            ["caravel deploy"],
        )],
    );

    fixes.insert(
        Category::ImagePullBackoff,
        vec![
            FixStrategy::new(
                "repush_image",
                "push the image again so the cluster can pull it",
                0.8,
                ["caravel push"],
            ),
            FixStrategy::new(
                "check_image_reference",
                "verify the deployed image reference exists in the registry",
                0.55,
                ["aws ecr describe-images --repository-name <project>"],
            ),
        ],
    );

    fixes.insert(
        Category::DnsResolutionFailed,
        vec![FixStrategy::new(
            "check_cluster_dns",
            "inspect cluster DNS resolution from a debug pod",
            0.4,
            ["kubectl run dns-check --rm -it --image=busybox -- nslookup <host>"],
        )],
    );

    fixes.insert(
        Category::PermissionDenied,
        vec![FixStrategy::new(
            "review_iam_policy",
            "review the active identity's registry and cluster permissions",
            0.45,
            ["aws sts get-caller-identity", "kubectl auth can-i create services"],
        )],
    );

    fixes.insert(
        Category::LoadBalancerPending,
        vec![FixStrategy::new(
            "wait_for_loadbalancer",
            "external address provisioning can take several minutes; keep waiting",
            0.75,
            ["kubectl get svc -w"],
        )],
    );

    fixes
}

/// Picks the best fix for a classified error, escalating low-confidence
/// selections to an external analyzer when one is configured.
pub struct FixSelector {
    threshold: f64,
    analyzer: Option<Arc<dyn Analyzer>>,
}

impl Default for FixSelector {
    fn default() -> Self {
        FixSelector {
            threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            analyzer: None,
        }
    }
}

impl FixSelector {
    pub fn new(threshold: f64, analyzer: Option<Arc<dyn Analyzer>>) -> Self {
        FixSelector {
            threshold: threshold.clamp(0.0, 1.0),
            analyzer,
        }
    }

    /// Highest-confidence candidate. Ties keep the earlier candidate, so the
    /// registration order is the tie-break. Returns `None` when there is no
    /// error or no candidates.
    pub fn select_local(&self, error: Option<&DeploymentError>) -> Option<FixStrategy> {
        let error = error?;
        let mut best: Option<&FixStrategy> = None;
        for candidate in &error.suggestions {
            match best {
                Some(current) if candidate.confidence <= current.confidence => {}
                _ => best = Some(candidate),
            }
        }
        best.cloned()
    }

    /// Select a fix, consulting the analyzer when the local best falls below
    /// the confidence threshold. A successful escalation always substitutes
    /// the analyzer's fix; failures fall back to the local pick silently.
    pub async fn select(
        &self,
        error: Option<&DeploymentError>,
        context: &[String],
    ) -> Option<FixStrategy> {
        let local = self.select_local(error)?;
        if local.confidence >= self.threshold {
            return Some(local);
        }

        let Some(analyzer) = &self.analyzer else {
            return Some(local);
        };
        let error = error?;

        let request = AnalysisRequest {
            category: error.pattern.category,
            line: error.line.clone(),
            context: context.to_vec(),
        };
        match analyzer.analyze(&request).await {
            Ok(response) => Some(FixStrategy::from_analysis(response)),
            Err(e) => {
                tracing::debug!("external analysis unavailable: {e}");
                Some(local)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::patterns::default_patterns;

    fn error_with(confidences: &[f64]) -> DeploymentError {
        let pattern = default_patterns().into_iter().next().unwrap();
        DeploymentError {
            pattern,
            line: "failed to build".to_string(),
            suggestions: confidences
                .iter()
                .enumerate()
                .map(|(i, c)| FixStrategy::new(format!("fix-{i}"), "", *c, []))
                .collect(),
        }
    }

    #[test]
    fn no_error_selects_nothing() {
        let selector = FixSelector::default();
        assert!(selector.select_local(None).is_none());
    }

    #[test]
    fn no_candidates_selects_nothing() {
        let selector = FixSelector::default();
        assert!(selector.select_local(Some(&error_with(&[]))).is_none());
    }

    #[test]
    fn highest_confidence_wins() {
        let selector = FixSelector::default();
        let pick = selector
            .select_local(Some(&error_with(&[0.3, 0.9, 0.6])))
            .unwrap();
        assert_eq!(pick.name, "fix-1");
    }

    #[test]
    fn ties_keep_the_earlier_candidate() {
        let selector = FixSelector::default();
        let pick = selector
            .select_local(Some(&error_with(&[0.7, 0.7])))
            .unwrap();
        assert_eq!(pick.name, "fix-0");
    }

    #[test]
    fn every_category_has_default_fixes() {
        let fixes = default_fixes();
        for category in Category::all() {
            let candidates = fixes.get(&category).unwrap();
            assert!(!candidates.is_empty());
            for fix in candidates {
                assert!((0.0..=1.0).contains(&fix.confidence));
            }
        }
    }
}
