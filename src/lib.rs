// ABOUTME: Library root for caravel, a build-push-deploy pipeline for containerized apps.
// ABOUTME: Exposes the pipeline state machine, stages, log monitor, and supporting types.

pub mod agent;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod report;
pub mod runner;
pub mod stages;
pub mod types;
