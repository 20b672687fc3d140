// ABOUTME: Runner error types with SNAFU pattern.
// ABOUTME: Distinguishes tool-missing from tool-failed for fallback decisions.

use snafu::Snafu;
use std::time::Duration;

/// Errors from launching or supervising an external command.
///
/// A non-zero exit is not an error here; it is reported through
/// `CommandOutput::exit_code` so stages can decide what a failure means.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum RunnerError {
    #[snafu(display("command not found: {program}"))]
    NotFound { program: String },

    #[snafu(display("failed to spawn {program}: {source}"))]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[snafu(display("i/o error while running {program}: {source}"))]
    Io {
        program: String,
        source: std::io::Error,
    },

    #[snafu(display("{program} timed out after {}s", timeout.as_secs()))]
    TimedOut { program: String, timeout: Duration },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerErrorKind {
    /// The program does not exist on PATH. Substitutable: a stage with a
    /// fallback path may take it.
    NotFound,
    /// The program exists but could not be spawned.
    Spawn,
    /// I/O failure while streaming output.
    Io,
    /// The wall-clock bound elapsed and the child was killed.
    TimedOut,
}

impl RunnerError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> RunnerErrorKind {
        match self {
            RunnerError::NotFound { .. } => RunnerErrorKind::NotFound,
            RunnerError::Spawn { .. } => RunnerErrorKind::Spawn,
            RunnerError::Io { .. } => RunnerErrorKind::Io,
            RunnerError::TimedOut { .. } => RunnerErrorKind::TimedOut,
        }
    }

    /// Whether the failure permits substituting another tool.
    pub fn is_substitutable(&self) -> bool {
        self.kind() == RunnerErrorKind::NotFound
    }
}
