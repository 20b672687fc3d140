// ABOUTME: External analysis escalation for low-confidence fix selections.
// ABOUTME: Defines the analyzer trait, its wire types, and the HTTP implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::patterns::Category;

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("analysis request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("analysis endpoint returned status {0}")]
    Status(u16),
}

/// What the selector sends when escalating: the classified category, the
/// triggering line, and recent log context.
#[derive(Debug, Serialize)]
pub struct AnalysisRequest {
    pub category: Category,
    pub line: String,
    pub context: Vec<String>,
}

/// How risky the suggested remediation is to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Safe,
    Caution,
    Dangerous,
}

#[derive(Debug, Deserialize)]
pub struct AnalysisResponse {
    pub description: String,
    #[serde(default)]
    pub steps: Vec<String>,
    pub confidence: f64,
    #[serde(default = "default_risk")]
    pub risk: RiskTier,
}

fn default_risk() -> RiskTier {
    RiskTier::Caution
}

/// Escalation target for fix selection.
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResponse, AnalysisError>;
}

/// Analyzer backed by an HTTP endpoint accepting [`AnalysisRequest`] JSON.
pub struct HttpAnalyzer {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpAnalyzer {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, AnalysisError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(HttpAnalyzer {
            endpoint: endpoint.into(),
            client,
        })
    }
}

#[async_trait]
impl Analyzer for HttpAnalyzer {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResponse, AnalysisError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AnalysisError::Status(status.as_u16()));
        }

        Ok(response.json().await?)
    }
}
