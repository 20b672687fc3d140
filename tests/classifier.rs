// ABOUTME: Table-driven classification tests over the built-in pattern set.
// ABOUTME: Verifies trigger phrases, benign negatives, and the priority order.

use caravel::agent::{Category, Classifier};

fn classify(line: &str) -> Option<Category> {
    Classifier::default()
        .classify(line)
        .map(|e| e.pattern.category)
}

#[test]
fn trigger_phrases_classify_into_their_category() {
    let cases: &[(&str, Category)] = &[
        ("ERROR: failed to build: exit status 51", Category::BuildpackFailure),
        ("failed to fetch base layers: denied", Category::BuildpackFailure),
        ("buildpack failure during detect phase", Category::BuildpackFailure),
        ("Error response from daemon: authentication failed", Category::RegistryAuthFailed),
        ("pull access denied, unauthorized", Category::RegistryAuthFailed),
        ("no basic auth credentials", Category::RegistryAuthFailed),
        ("repository not found in registry", Category::RepositoryNotFound),
        ("no such repository: my-app", Category::RepositoryNotFound),
        ("name unknown: The repository does not exist", Category::RepositoryNotFound),
        ("Revision missing for configuration", Category::RevisionMissing),
        ("revision not found: my-app-00001", Category::RevisionMissing),
        ("Back-off pulling image, ImagePullBackOff", Category::ImagePullBackoff),
        ("ErrImagePull on container user-container", Category::ImagePullBackoff),
        ("failed to pull image my-app:latest", Category::ImagePullBackoff),
        ("manifest unknown: requested image not found", Category::ImagePullBackoff),
        ("curl: (6) Could not resolve host: registry", Category::DnsResolutionFailed),
        ("dial tcp: lookup api: no such host", Category::DnsResolutionFailed),
        ("dns failed for cluster endpoint", Category::DnsResolutionFailed),
        ("mkdir /var/run: permission denied", Category::PermissionDenied),
        ("AccessDeniedException: access denied", Category::PermissionDenied),
        ("Error from server (Forbidden): forbidden", Category::PermissionDenied),
        ("service loadbalancer pending", Category::LoadBalancerPending),
        ("EXTERNAL-IP    <pending>", Category::LoadBalancerPending),
    ];

    for (line, expected) in cases {
        assert_eq!(
            classify(line).as_ref(),
            Some(expected),
            "line should classify as {expected:?}: {line}"
        );
    }
}

#[test]
fn benign_lines_never_classify() {
    let benign = [
        "build successful",
        "all checks passed",
        "Deploy completed without errors",
        "Service is running normally",
        "Pulling layer 3/7 done",
        "service.serving.knative.dev/my-app configured",
    ];

    for line in benign {
        assert_eq!(classify(line), None, "benign line classified: {line}");
    }
}

#[test]
fn earlier_pattern_wins_when_phrases_overlap() {
    // Buildpack failure is registered before registry auth.
    assert_eq!(
        classify("failed to build: push was unauthorized"),
        Some(Category::BuildpackFailure)
    );
}

#[test]
fn matching_ignores_case() {
    assert_eq!(
        classify("FAILED TO PULL IMAGE my-app"),
        Some(Category::ImagePullBackoff)
    );
    assert_eq!(
        classify("No Basic Auth Credentials"),
        Some(Category::RegistryAuthFailed)
    );
}
