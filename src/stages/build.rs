// ABOUTME: Build stage: buildpack build with generated-Dockerfile fallback.
// ABOUTME: Detects the application kind from source tree markers.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::runner::{CommandRunner, CommandSpec, LogSink};
use crate::types::ImageRef;

use super::error::StageError;

/// Builder image for the primary buildpack path.
pub const BUILDER_IMAGE: &str = "paketobuildpacks/builder:tiny";

/// The fallback build always targets this platform so the image runs on the
/// deployment target regardless of the host's native architecture.
pub const FALLBACK_PLATFORM: &str = "linux/amd64";

/// Application kind detected from source tree markers.
///
/// Detection order is fixed: Node, then Python, then Go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AppKind {
    Node,
    Python,
    Go,
    Unknown,
}

impl AppKind {
    /// Inspect the source tree for language markers.
    pub fn detect(source: &Path) -> AppKind {
        if source.join("package.json").is_file() {
            AppKind::Node
        } else if source.join("requirements.txt").is_file() {
            AppKind::Python
        } else if source.join("go.mod").is_file() {
            AppKind::Go
        } else {
            AppKind::Unknown
        }
    }

    /// The templated Dockerfile for this application kind.
    pub fn dockerfile(&self) -> &'static str {
        match self {
            AppKind::Node => {
                "FROM node:18-alpine\n\
                 WORKDIR /app\n\
                 COPY package*.json ./\n\
                 RUN npm install --omit=dev\n\
                 COPY . .\n\
                 EXPOSE 8080\n\
                 CMD [\"node\", \"server.js\"]\n"
            }
            AppKind::Python => {
                "FROM python:3.11-slim\n\
                 RUN apt-get update && apt-get install -y gcc && rm -rf /var/lib/apt/lists/*\n\
                 WORKDIR /app\n\
                 COPY requirements.txt .\n\
                 RUN pip install --no-cache-dir -r requirements.txt\n\
                 COPY . .\n\
                 EXPOSE 8080\n\
                 CMD [\"gunicorn\", \"--bind\", \"0.0.0.0:8080\", \"app:app\"]\n"
            }
            AppKind::Go => {
                "FROM golang:1.21-alpine AS builder\n\
                 WORKDIR /app\n\
                 COPY go.mod ./\n\
                 RUN go mod download\n\
                 COPY . .\n\
                 RUN go build -o main .\n\
                 \n\
                 FROM alpine:latest\n\
                 RUN apk add --no-cache ca-certificates\n\
                 WORKDIR /root/\n\
                 COPY --from=builder /app/main .\n\
                 EXPOSE 8080\n\
                 CMD [\"./main\"]\n"
            }
            AppKind::Unknown => {
                "FROM alpine:latest\n\
                 WORKDIR /app\n\
                 COPY . .\n\
                 EXPOSE 8080\n\
                 CMD [\"echo\", \"no language marker detected\"]\n"
            }
        }
    }
}

impl fmt::Display for AppKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AppKind::Node => "node",
            AppKind::Python => "python",
            AppKind::Go => "go",
            AppKind::Unknown => "unknown",
        };
        write!(f, "{name}")
    }
}

/// Which path produced the locally tagged image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildPath {
    Buildpack,
    Dockerfile(AppKind),
}

impl fmt::Display for BuildPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildPath::Buildpack => write!(f, "buildpack"),
            BuildPath::Dockerfile(kind) => write!(f, "dockerfile ({kind})"),
        }
    }
}

/// Build a locally tagged image from the source tree.
///
/// Tries a buildpack build first; on tool-missing or non-zero exit falls back
/// to a generated-Dockerfile build targeting [`FALLBACK_PLATFORM`]. Both paths
/// failing is terminal for the stage; there is no further retry.
pub async fn build_image<R: CommandRunner + ?Sized>(
    runner: &R,
    sink: &dyn LogSink,
    source: &Path,
    image: &ImageRef,
    build_env: &HashMap<String, String>,
    timeout: Duration,
) -> Result<BuildPath, StageError> {
    let mut env_pairs: Vec<(&String, &String)> = build_env.iter().collect();
    env_pairs.sort();

    let mut pack = CommandSpec::new("pack")
        .args([
            "build",
            &image.to_string(),
            "--path",
            &source.display().to_string(),
            "--builder",
            BUILDER_IMAGE,
            "--pull-policy",
            "always",
            "--verbose",
        ])
        .timeout(timeout);
    for (key, value) in &env_pairs {
        pack = pack.arg("--env").arg(format!("{key}={value}"));
    }

    match runner.run(&pack, sink).await {
        Ok(out) if out.success() => {
            tracing::info!(image = %image, "buildpack build succeeded");
            return Ok(BuildPath::Buildpack);
        }
        Ok(out) => {
            tracing::warn!(
                exit_code = out.exit_code,
                "buildpack build failed, falling back to Dockerfile build"
            );
        }
        Err(e) if e.is_substitutable() => {
            tracing::info!("pack not found, falling back to Dockerfile build");
        }
        Err(e) => return Err(StageError::BuildFailed(e.to_string())),
    }

    let kind = AppKind::detect(source);
    tracing::info!(kind = %kind, "detected application kind for fallback build");

    let docker = CommandSpec::new("docker")
        .args([
            "build",
            "--platform",
            FALLBACK_PLATFORM,
            "-t",
            &image.to_string(),
            "-f",
            "-",
        ])
        .arg(source.display().to_string())
        .stdin(kind.dockerfile())
        .timeout(timeout);

    match runner.run(&docker, sink).await {
        Ok(out) if out.success() => Ok(BuildPath::Dockerfile(kind)),
        Ok(out) => Err(StageError::BuildFailed(format!(
            "dockerfile fallback failed: {}",
            out.tail_message()
        ))),
        Err(e) => Err(StageError::BuildFailed(format!(
            "dockerfile fallback unavailable: {e}"
        ))),
    }
}
