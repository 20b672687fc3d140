// ABOUTME: The run record: status, image, warnings, and timestamps for one pipeline run.
// ABOUTME: Serializable for JSON output and for posting to the tracking endpoint.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use crate::stages::BuildPath;
use crate::types::{ImageRef, ProjectName, RunId};

/// Lifecycle status of a pipeline run.
///
/// `Succeeded` and `Failed` are terminal; a run never leaves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Pending,
    Building,
    Pushing,
    Deploying,
    Attaching,
    Succeeded,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Succeeded | RunStatus::Failed)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunStatus::Pending => "pending",
            RunStatus::Building => "building",
            RunStatus::Pushing => "pushing",
            RunStatus::Deploying => "deploying",
            RunStatus::Attaching => "attaching",
            RunStatus::Succeeded => "succeeded",
            RunStatus::Failed => "failed",
        };
        write!(f, "{name}")
    }
}

/// Record of a single pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineRun {
    pub id: RunId,
    pub project: ProjectName,
    pub namespace: String,
    pub image: Option<ImageRef>,
    pub status: RunStatus,
    pub build_path: Option<BuildPath>,
    pub warnings: Vec<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl PipelineRun {
    pub fn new(project: ProjectName, namespace: impl Into<String>) -> Self {
        let created_at = Utc::now();
        let id = RunId::new(format!(
            "{project}:{}",
            created_at.timestamp_nanos_opt().unwrap_or_default()
        ));
        PipelineRun {
            id,
            project,
            namespace: namespace.into(),
            image: None,
            status: RunStatus::Pending,
            build_path: None,
            warnings: Vec::new(),
            error: None,
            created_at,
            finished_at: None,
        }
    }

    /// Advance the status. Terminal statuses are never overwritten.
    pub(crate) fn set_status(&mut self, status: RunStatus) {
        if self.status.is_terminal() {
            return;
        }
        self.status = status;
    }

    pub(crate) fn finish_success(&mut self) {
        self.set_status(RunStatus::Succeeded);
        self.finished_at = Some(Utc::now());
    }

    pub(crate) fn finish_failure(&mut self, error: impl Into<String>) {
        self.set_status(RunStatus::Failed);
        self.error = Some(error.into());
        self.finished_at = Some(Utc::now());
    }

    /// Human-readable one-line summary of how the run went.
    pub fn description(&self) -> String {
        match (&self.status, &self.build_path) {
            (RunStatus::Failed, _) => match &self.error {
                Some(error) => format!("failed: {error}"),
                None => "failed".to_string(),
            },
            (_, Some(path)) => format!("deployed via {path}"),
            _ => self.status.to_string(),
        }
    }

    pub fn to_report(&self) -> RunReport<'_> {
        RunReport {
            id: &self.id,
            project: &self.project,
            namespace: &self.namespace,
            image: self
                .image
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
            status: self.status,
            description: self.description(),
            created_at: self.created_at,
        }
    }
}

/// Wire shape posted to the tracking endpoint.
#[derive(Debug, Serialize)]
pub struct RunReport<'a> {
    pub id: &'a RunId,
    pub project: &'a ProjectName,
    pub namespace: &'a str,
    pub image: String,
    pub status: RunStatus,
    pub description: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_run() -> PipelineRun {
        PipelineRun::new(ProjectName::new("my-app").unwrap(), "default")
    }

    #[test]
    fn new_run_is_pending() {
        let run = sample_run();
        assert_eq!(run.status, RunStatus::Pending);
        assert!(run.finished_at.is_none());
        assert!(run.id.as_str().starts_with("my-app:"));
    }

    #[test]
    fn terminal_status_is_sticky() {
        let mut run = sample_run();
        run.finish_failure("boom");
        run.set_status(RunStatus::Building);
        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.error.as_deref(), Some("boom"));
    }

    #[test]
    fn success_records_finish_time() {
        let mut run = sample_run();
        run.finish_success();
        assert_eq!(run.status, RunStatus::Succeeded);
        assert!(run.finished_at.is_some());
    }

    #[test]
    fn description_reflects_build_path() {
        let mut run = sample_run();
        run.build_path = Some(BuildPath::Buildpack);
        run.finish_success();
        assert_eq!(run.description(), "deployed via buildpack");
    }

    #[test]
    fn description_carries_failure() {
        let mut run = sample_run();
        run.finish_failure("push rejected");
        assert_eq!(run.description(), "failed: push rejected");
    }

    #[test]
    fn report_serializes_camel_case_timestamp() {
        let run = sample_run();
        let json = serde_json::to_value(run.to_report()).unwrap();
        assert!(json.get("createdAt").is_some());
        assert_eq!(json["project"], "my-app");
        assert_eq!(json["status"], "pending");
    }
}
