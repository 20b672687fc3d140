// ABOUTME: Error types for pipeline stages.
// ABOUTME: Every external-command failure carries actionable remediation text.

use thiserror::Error;

/// Errors that abort a pipeline stage.
///
/// Remediation text is guidance for the operator, not logic; the root-cause
/// message is always preserved verbatim.
#[derive(Debug, Error)]
pub enum StageError {
    /// Both the buildpack path and the Dockerfile fallback failed.
    #[error("build failed: {0}")]
    BuildFailed(String),

    /// Cloud account identity could not be resolved.
    #[error(
        "failed to resolve account identity: {message}\n\
         Troubleshooting:\n\
         \x20 1. Run: aws configure\n\
         \x20 2. Ensure your credentials are valid\n\
         \x20 3. Set registry.region in caravel.yml or AWS_REGION in the environment"
    )]
    IdentityUnresolved { message: String },

    /// Registry credential could not be obtained or the login was rejected.
    #[error(
        "registry authentication failed: {message}\n\
         Troubleshooting:\n\
         \x20 1. Run: aws configure\n\
         \x20 2. Ensure your credentials are valid\n\
         \x20 3. Check that you have ECR permissions"
    )]
    RegistryAuthFailed { message: String },

    /// Re-tagging the local image for the remote registry failed.
    #[error("failed to tag image {image} for the registry: {message}")]
    RetagFailed { image: String, message: String },

    /// The target repository is absent and could not be created.
    #[error(
        "failed to ensure repository {repository}: {message}\n\
         Troubleshooting:\n\
         \x20 1. Ensure you have the ecr:CreateRepository permission\n\
         \x20 2. Verify the repository name is valid"
    )]
    RepositoryEnsureFailed { repository: String, message: String },

    /// The final image push was rejected.
    #[error(
        "failed to push image {image}: {message}\n\
         Troubleshooting:\n\
         \x20 1. Check registry permissions\n\
         \x20 2. Ensure the repository exists"
    )]
    PushFailed { image: String, message: String },

    /// Applying the service descriptor failed.
    #[error(
        "failed to apply service descriptor: {message}\n\
         Troubleshooting:\n\
         \x20 1. Verify kubectl can reach the cluster\n\
         \x20 2. Check that the namespace exists"
    )]
    ApplyFailed { message: String },

    /// An auxiliary credential object could not be created or updated.
    /// Downgraded to a warning once the primary workload is deployed.
    #[error("failed to attach {name}: {message}")]
    AttachFailed { name: String, message: String },

    /// Configuration could not be resolved into stage inputs.
    #[error("configuration error: {0}")]
    Config(String),
}
