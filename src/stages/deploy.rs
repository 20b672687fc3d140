// ABOUTME: Deploy stage: renders the service descriptor and applies it idempotently.
// ABOUTME: Attachments create/update namespaced credential objects per project.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use crate::config::{CacheConfig, DatabaseConfig, EnvValue, ResourcesConfig};
use crate::runner::{CommandRunner, CommandSpec, LogSink};
use crate::types::{ImageRef, ProjectName};

use super::error::StageError;

/// Annotation guaranteeing at least one warm instance.
pub const MIN_SCALE_ANNOTATION: &str = "autoscaling.knative.dev/minScale";

const SERVICE_API_VERSION: &str = "serving.knative.dev/v1";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ServiceManifest<'a> {
    api_version: &'static str,
    kind: &'static str,
    metadata: Metadata<'a>,
    spec: ServiceSpec,
}

#[derive(Serialize)]
struct Metadata<'a> {
    name: &'a str,
    namespace: &'a str,
}

#[derive(Serialize)]
struct ServiceSpec {
    template: Template,
}

#[derive(Serialize)]
struct Template {
    metadata: TemplateMetadata,
    spec: TemplateSpec,
}

#[derive(Serialize)]
struct TemplateMetadata {
    annotations: BTreeMap<&'static str, String>,
}

#[derive(Serialize)]
struct TemplateSpec {
    containers: Vec<Container>,
}

#[derive(Serialize)]
struct Container {
    image: String,
    ports: Vec<ContainerPort>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    env: Vec<EnvVar>,
    resources: ResourceRequirements,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ContainerPort {
    container_port: u16,
    name: &'static str,
}

#[derive(Serialize)]
struct EnvVar {
    name: String,
    value: String,
}

#[derive(Serialize)]
struct ResourceRequirements {
    requests: BTreeMap<&'static str, String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SecretManifest<'a> {
    api_version: &'static str,
    kind: &'static str,
    metadata: Metadata<'a>,
    string_data: &'a BTreeMap<String, String>,
}

/// Render the declarative service descriptor.
pub fn render_service_manifest(
    project: &ProjectName,
    image: &ImageRef,
    namespace: &str,
    port: u16,
    resources: &ResourcesConfig,
    env: &HashMap<String, String>,
) -> Result<String, StageError> {
    let mut annotations = BTreeMap::new();
    annotations.insert(MIN_SCALE_ANNOTATION, "1".to_string());

    // Sorted env for deterministic rendering.
    let mut env_vars: Vec<EnvVar> = env
        .iter()
        .map(|(name, value)| EnvVar {
            name: name.clone(),
            value: value.clone(),
        })
        .collect();
    env_vars.sort_by(|a, b| a.name.cmp(&b.name));

    let mut requests = BTreeMap::new();
    requests.insert("cpu", resources.cpu.clone());
    requests.insert("memory", resources.memory.clone());

    let manifest = ServiceManifest {
        api_version: SERVICE_API_VERSION,
        kind: "Service",
        metadata: Metadata {
            name: project.as_str(),
            namespace,
        },
        spec: ServiceSpec {
            template: Template {
                metadata: TemplateMetadata { annotations },
                spec: TemplateSpec {
                    containers: vec![Container {
                        image: image.to_string(),
                        ports: vec![ContainerPort {
                            container_port: port,
                            name: "http1",
                        }],
                        env: env_vars,
                        resources: ResourceRequirements { requests },
                    }],
                },
            },
        },
    };

    serde_yaml::to_string(&manifest).map_err(|e| StageError::Config(e.to_string()))
}

/// Render a credential object holding string key/value entries.
pub fn render_secret_manifest(
    name: &str,
    namespace: &str,
    data: &BTreeMap<String, String>,
) -> Result<String, StageError> {
    let manifest = SecretManifest {
        api_version: "v1",
        kind: "Secret",
        metadata: Metadata { name, namespace },
        string_data: data,
    };
    serde_yaml::to_string(&manifest).map_err(|e| StageError::Config(e.to_string()))
}

/// Apply a manifest idempotently: create-if-absent, update-if-present.
async fn apply_manifest<R: CommandRunner + ?Sized>(
    runner: &R,
    sink: &dyn LogSink,
    manifest: String,
    timeout: Duration,
) -> Result<(), String> {
    let spec = CommandSpec::new("kubectl")
        .args(["apply", "-f", "-"])
        .stdin(manifest)
        .timeout(timeout);

    match runner.run(&spec, sink).await {
        Ok(out) if out.success() => Ok(()),
        Ok(out) => Err(out.tail_message()),
        Err(e) => Err(e.to_string()),
    }
}

/// Render and apply the service descriptor for the project.
pub async fn deploy_service<R: CommandRunner + ?Sized>(
    runner: &R,
    sink: &dyn LogSink,
    project: &ProjectName,
    image: &ImageRef,
    namespace: &str,
    port: u16,
    resources: &ResourcesConfig,
    env: &HashMap<String, String>,
    timeout: Duration,
) -> Result<(), StageError> {
    let manifest = render_service_manifest(project, image, namespace, port, resources, env)?;
    apply_manifest(runner, sink, manifest, timeout)
        .await
        .map_err(|message| StageError::ApplyFailed { message })
}

/// Attach a relational-database connection string as `<project>-db`.
pub async fn attach_database<R: CommandRunner + ?Sized>(
    runner: &R,
    sink: &dyn LogSink,
    project: &ProjectName,
    namespace: &str,
    db: &DatabaseConfig,
    timeout: Duration,
) -> Result<(), StageError> {
    let name = format!("{project}-db");
    let password = db
        .password
        .resolve()
        .map_err(|e| StageError::Config(e.to_string()))?;
    let url = format!(
        "postgres://{}:{}@{}:{}/{}",
        db.user, password, db.host, db.port, db.name
    );

    let mut data = BTreeMap::new();
    data.insert("DATABASE_URL".to_string(), url);

    apply_credential(runner, sink, &name, namespace, &data, timeout).await
}

/// Attach a cache connection string as `<project>-redis`.
pub async fn attach_cache<R: CommandRunner + ?Sized>(
    runner: &R,
    sink: &dyn LogSink,
    project: &ProjectName,
    namespace: &str,
    cache: &CacheConfig,
    timeout: Duration,
) -> Result<(), StageError> {
    let name = format!("{project}-redis");
    let password = cache
        .password
        .resolve()
        .map_err(|e| StageError::Config(e.to_string()))?;
    let url = format!("redis://:{}@{}:{}", password, cache.host, cache.port);

    let mut data = BTreeMap::new();
    data.insert("REDIS_URL".to_string(), url);

    apply_credential(runner, sink, &name, namespace, &data, timeout).await
}

/// Attach arbitrary secret pairs as `<project>-secrets`.
pub async fn attach_secrets<R: CommandRunner + ?Sized>(
    runner: &R,
    sink: &dyn LogSink,
    project: &ProjectName,
    namespace: &str,
    pairs: &HashMap<String, EnvValue>,
    timeout: Duration,
) -> Result<(), StageError> {
    let name = format!("{project}-secrets");

    let mut data = BTreeMap::new();
    for (key, value) in pairs {
        let resolved = value
            .resolve()
            .map_err(|e| StageError::Config(e.to_string()))?;
        data.insert(key.clone(), resolved);
    }

    apply_credential(runner, sink, &name, namespace, &data, timeout).await
}

async fn apply_credential<R: CommandRunner + ?Sized>(
    runner: &R,
    sink: &dyn LogSink,
    name: &str,
    namespace: &str,
    data: &BTreeMap<String, String>,
    timeout: Duration,
) -> Result<(), StageError> {
    let manifest = render_secret_manifest(name, namespace, data)?;
    apply_manifest(runner, sink, manifest, timeout)
        .await
        .map_err(|message| StageError::AttachFailed {
            name: name.to_string(),
            message,
        })
}
