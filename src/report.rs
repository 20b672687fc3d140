// ABOUTME: Posts run summaries to an optional tracking endpoint.
// ABOUTME: Failures here are surfaced as warnings, never as pipeline failures.

use std::time::Duration;

use crate::pipeline::PipelineRun;

const REPORT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("report request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("report endpoint returned status {0}")]
    Status(u16),
}

/// Client for the deployment tracking endpoint.
#[derive(Debug, Clone)]
pub struct RunReporter {
    endpoint: String,
    client: reqwest::Client,
}

impl RunReporter {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, ReportError> {
        let client = reqwest::Client::builder()
            .timeout(REPORT_TIMEOUT)
            .build()?;
        Ok(RunReporter {
            endpoint: endpoint.into(),
            client,
        })
    }

    /// POST the run summary to `<endpoint>/deployments`.
    pub async fn post(&self, run: &PipelineRun) -> Result<(), ReportError> {
        let url = format!("{}/deployments", self.endpoint.trim_end_matches('/'));
        let response = self.client.post(&url).json(&run.to_report()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReportError::Status(status.as_u16()));
        }

        tracing::debug!(url = %url, "run summary posted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_normalized() {
        let reporter = RunReporter::new("https://track.example.com/").unwrap();
        assert_eq!(reporter.endpoint, "https://track.example.com/");
        // The slash is trimmed at request time; construction keeps the input.
        assert_eq!(
            format!("{}/deployments", reporter.endpoint.trim_end_matches('/')),
            "https://track.example.com/deployments"
        );
    }
}
