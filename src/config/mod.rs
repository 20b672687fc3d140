// ABOUTME: Configuration types and parsing for caravel.yml.
// ABOUTME: Handles YAML parsing, env var interpolation, and the init template.

mod env_value;

pub use env_value::{EnvValue, resolve_env_map};

use crate::error::{Error, Result};
use crate::types::{ImageRef, ProjectName};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "caravel.yml";
pub const CONFIG_FILENAME_ALT: &str = "caravel.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".caravel/config.yml";

/// Default confidence below which the fix selector escalates to external
/// analysis, when an analysis endpoint is configured.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(deserialize_with = "deserialize_project_name")]
    pub project: ProjectName,

    /// Target image reference. When absent, one is derived from the project
    /// name and the resolved registry identity at deploy time.
    #[serde(default, deserialize_with = "deserialize_image_ref_option")]
    pub image: Option<ImageRef>,

    #[serde(default = "default_namespace")]
    pub namespace: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub resources: ResourcesConfig,

    #[serde(default)]
    pub env: HashMap<String, EnvValue>,

    #[serde(default)]
    pub registry: RegistryConfig,

    #[serde(default)]
    pub database: Option<DatabaseConfig>,

    #[serde(default)]
    pub cache: Option<CacheConfig>,

    #[serde(default)]
    pub secrets: HashMap<String, EnvValue>,

    /// Optional tracking endpoint. Run summaries are POSTed to
    /// `<report_url>/deployments`; failures never fail the pipeline.
    #[serde(default)]
    pub report_url: Option<String>,

    #[serde(default)]
    pub analysis: Option<AnalysisConfig>,

    /// Wall-clock bound for each external command (build, push, apply).
    #[serde(default = "default_command_timeout", with = "humantime_serde")]
    pub command_timeout: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResourcesConfig {
    #[serde(default = "default_cpu")]
    pub cpu: String,
    #[serde(default = "default_memory")]
    pub memory: String,
}

impl Default for ResourcesConfig {
    fn default() -> Self {
        ResourcesConfig {
            cpu: default_cpu(),
            memory: default_memory(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RegistryConfig {
    /// Registry region. Falls back to AWS_REGION, then AWS_DEFAULT_REGION,
    /// then us-east-1.
    #[serde(default)]
    pub region: Option<String>,
}

impl RegistryConfig {
    pub fn resolve_region(&self) -> String {
        if let Some(region) = &self.region {
            return region.clone();
        }
        std::env::var("AWS_REGION")
            .or_else(|_| std::env::var("AWS_DEFAULT_REGION"))
            .unwrap_or_else(|_| "us-east-1".to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    #[serde(default = "default_db_port")]
    pub port: u16,
    pub name: String,
    #[serde(default = "default_db_user")]
    pub user: String,
    #[serde(default = "default_db_password")]
    pub password: EnvValue,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    pub host: String,
    #[serde(default = "default_cache_port")]
    pub port: u16,
    #[serde(default = "default_cache_password")]
    pub password: EnvValue,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    pub endpoint: String,

    #[serde(default = "default_analysis_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

fn default_namespace() -> String {
    "default".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cpu() -> String {
    "250m".to_string()
}

fn default_memory() -> String {
    "256Mi".to_string()
}

fn default_db_port() -> u16 {
    5432
}

fn default_db_user() -> String {
    "app".to_string()
}

fn default_db_password() -> EnvValue {
    EnvValue::literal("changeme")
}

fn default_cache_port() -> u16 {
    6379
}

fn default_cache_password() -> EnvValue {
    EnvValue::literal("")
}

fn default_analysis_timeout() -> Duration {
    Duration::from_secs(15)
}

fn default_threshold() -> f64 {
    DEFAULT_CONFIDENCE_THRESHOLD
}

fn default_command_timeout() -> Duration {
    Duration::from_secs(600)
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    fn validate(&self) -> Result<()> {
        if let Some(analysis) = &self.analysis {
            if !(0.0..=1.0).contains(&analysis.threshold) {
                return Err(Error::InvalidConfig(format!(
                    "analysis threshold must be within [0, 1], got {}",
                    analysis.threshold
                )));
            }
        }
        if self.command_timeout.is_zero() {
            return Err(Error::InvalidConfig(
                "command_timeout must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn template() -> Self {
        Config {
            project: ProjectName::new("my-app").expect("template project name is valid"),
            image: None,
            namespace: default_namespace(),
            port: default_port(),
            resources: ResourcesConfig::default(),
            env: HashMap::new(),
            registry: RegistryConfig::default(),
            database: None,
            cache: None,
            secrets: HashMap::new(),
            report_url: None,
            analysis: None,
            command_timeout: default_command_timeout(),
        }
    }
}

pub fn init_config(
    dir: &Path,
    project: Option<&str>,
    image: Option<&str>,
    force: bool,
) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let mut config = Config::template();

    if let Some(p) = project {
        config.project = ProjectName::new(p).map_err(|e| Error::InvalidConfig(e.to_string()))?;
    }

    if let Some(i) = image {
        config.image =
            Some(ImageRef::parse(i).map_err(|e| Error::InvalidConfig(e.to_string()))?);
    }

    let yaml = generate_template_yaml(&config);
    std::fs::write(&config_path, yaml)?;

    Ok(())
}

fn generate_template_yaml(config: &Config) -> String {
    let image_line = match &config.image {
        Some(image) => format!("image: {image}\n"),
        None => "# image: <account>.dkr.ecr.<region>.amazonaws.com/my-app:latest\n".to_string(),
    };
    format!(
        r#"project: {}
{}namespace: {}
port: {}
resources:
  cpu: {}
  memory: {}
"#,
        config.project,
        image_line,
        config.namespace,
        config.port,
        config.resources.cpu,
        config.resources.memory,
    )
}

// Custom deserializers

fn deserialize_project_name<'de, D>(deserializer: D) -> std::result::Result<ProjectName, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    ProjectName::new(&s).map_err(serde::de::Error::custom)
}

fn deserialize_image_ref_option<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<ImageRef>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    match opt {
        None => Ok(None),
        Some(s) => ImageRef::parse(&s)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
