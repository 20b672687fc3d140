// ABOUTME: Log-driven error detection: classification, fix selection, and monitoring.
// ABOUTME: Watches command output for known failure signatures and suggests remediations.

mod analysis;
mod classifier;
mod fixes;
mod monitor;
mod patterns;
mod status;

pub use analysis::{
    AnalysisError, AnalysisRequest, AnalysisResponse, Analyzer, HttpAnalyzer, RiskTier,
};
pub use classifier::{Classifier, DeploymentError};
pub use fixes::{FixSelector, FixStrategy, default_fixes};
pub use monitor::LogMonitor;
pub use patterns::{Category, ErrorPattern, Matcher, Severity, default_patterns};
pub use status::{AgentPhase, AgentStatus, DEFAULT_BUFFER_CAPACITY, LogBuffer};
