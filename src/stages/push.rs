// ABOUTME: Push stage: registry identity resolution, retag, auth, repo ensure, push.
// ABOUTME: Each step is a hard dependency on the previous one succeeding.

use std::time::Duration;

use crate::runner::{CommandOutput, CommandRunner, CommandSpec, LogSink};
use crate::types::{ImageRef, ProjectName};

use super::error::StageError;

/// Compute the registry host for an account identity and region.
pub fn registry_host(account: &str, region: &str) -> String {
    format!("{account}.dkr.ecr.{region}.amazonaws.com")
}

/// Resolve the cloud account identity via the cloud CLI.
pub async fn resolve_account<R: CommandRunner + ?Sized>(
    runner: &R,
    sink: &dyn LogSink,
    timeout: Duration,
) -> Result<String, StageError> {
    let spec = CommandSpec::new("aws")
        .args(["sts", "get-caller-identity", "--query", "Account", "--output", "text"])
        .timeout(timeout);

    match runner.run(&spec, sink).await {
        Ok(out) if out.success() => {
            let account = out.stdout.trim().to_string();
            if account.is_empty() {
                Err(StageError::IdentityUnresolved {
                    message: "account identity is empty".to_string(),
                })
            } else {
                Ok(account)
            }
        }
        Ok(out) => Err(StageError::IdentityUnresolved {
            message: out.tail_message(),
        }),
        Err(e) => Err(StageError::IdentityUnresolved {
            message: e.to_string(),
        }),
    }
}

/// Derive an image reference for a project.
///
/// Prefers `<account>.dkr.ecr.<region>.amazonaws.com/<project>:latest`; when
/// the account identity cannot be resolved, falls back to a local
/// `<project>:latest` tag and lets the push stage retag it later.
pub async fn generate_image_ref<R: CommandRunner + ?Sized>(
    runner: &R,
    sink: &dyn LogSink,
    project: &ProjectName,
    region: &str,
    timeout: Duration,
) -> ImageRef {
    let local = ImageRef::parse(&format!("{project}:latest"))
        .expect("project name forms a valid image reference");

    match resolve_account(runner, sink, timeout).await {
        Ok(account) => {
            let remote = format!("{}/{}:latest", registry_host(&account, region), project);
            ImageRef::parse(&remote).unwrap_or(local)
        }
        Err(e) => {
            tracing::warn!(
                "could not resolve account identity, building with a local tag: {e}"
            );
            local
        }
    }
}

/// Push an image to the registry, retagging a local-only reference first.
///
/// Steps, each aborting the stage on failure: resolve identity (if the tag is
/// local) → obtain a registry credential → authenticate the image tool →
/// ensure the repository exists → push. Returns the final remote reference.
pub async fn push_image<R: CommandRunner + ?Sized>(
    runner: &R,
    sink: &dyn LogSink,
    image: &ImageRef,
    region: &str,
    timeout: Duration,
) -> Result<ImageRef, StageError> {
    let remote = if image.is_remote() {
        image.clone()
    } else {
        let account = resolve_account(runner, sink, timeout).await?;
        let remote = image.with_registry(&registry_host(&account, region));

        tracing::info!(local = %image, remote = %remote, "retagging local image");
        let tag = CommandSpec::new("docker")
            .args(["tag", &image.to_string(), &remote.to_string()])
            .timeout(timeout);
        run_step(runner, sink, &tag)
            .await
            .map_err(|message| StageError::RetagFailed {
                image: image.to_string(),
                message,
            })?;
        remote
    };

    let host = remote
        .registry()
        .expect("remote image always has a registry host")
        .to_string();

    // Obtain a short-lived registry credential. Sensitive: the password must
    // not reach the sink, the tail, or any monitor attached to them.
    let credential = CommandSpec::new("aws")
        .args(["ecr", "get-login-password", "--region", region])
        .sensitive()
        .timeout(timeout);
    let password = run_step(runner, sink, &credential)
        .await
        .map_err(|message| StageError::RegistryAuthFailed { message })?
        .stdout;

    // Authenticate the local image tool against the registry.
    let login = CommandSpec::new("docker")
        .args(["login", "--username", "AWS", "--password-stdin", &host])
        .stdin(password.trim_end().to_string())
        .timeout(timeout);
    run_step(runner, sink, &login)
        .await
        .map_err(|message| StageError::RegistryAuthFailed { message })?;

    // Lazily create the repository if absent.
    let repository = remote.name().to_string();
    let describe = CommandSpec::new("aws")
        .args([
            "ecr",
            "describe-repositories",
            "--repository-names",
            &repository,
            "--region",
            region,
        ])
        .timeout(timeout);
    if run_step(runner, sink, &describe).await.is_err() {
        tracing::info!(repository = %repository, "repository not found, creating");
        let create = CommandSpec::new("aws")
            .args([
                "ecr",
                "create-repository",
                "--repository-name",
                &repository,
                "--region",
                region,
            ])
            .timeout(timeout);
        run_step(runner, sink, &create).await.map_err(|message| {
            StageError::RepositoryEnsureFailed {
                repository: repository.clone(),
                message,
            }
        })?;
    }

    let push = CommandSpec::new("docker")
        .args(["push", &remote.to_string()])
        .timeout(timeout);
    run_step(runner, sink, &push)
        .await
        .map_err(|message| StageError::PushFailed {
            image: remote.to_string(),
            message,
        })?;

    Ok(remote)
}

/// Run one step, collapsing runner errors and non-zero exits into a message.
async fn run_step<R: CommandRunner + ?Sized>(
    runner: &R,
    sink: &dyn LogSink,
    spec: &CommandSpec,
) -> Result<CommandOutput, String> {
    match runner.run(spec, sink).await {
        Ok(out) if out.success() => Ok(out),
        Ok(out) => Err(out.tail_message()),
        Err(e) => Err(e.to_string()),
    }
}
