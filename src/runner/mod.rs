// ABOUTME: Narrow command-runner abstraction over external tool invocation.
// ABOUTME: Defines CommandRunner, CommandSpec, CommandOutput, and LogSink.

mod error;
mod process;

pub use error::{RunnerError, RunnerErrorKind};
pub use process::ProcessRunner;

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Number of trailing output lines kept in `CommandOutput::tail` for error
/// reporting.
pub const TAIL_CAPACITY: usize = 40;

/// Receives output lines from a running command.
///
/// Takes `&self` so the same sink can be shared between concurrent reader
/// tasks and a log monitor; implementations use interior mutability.
pub trait LogSink: Send + Sync {
    fn record_line(&self, line: &str);
}

/// A sink that discards all lines.
pub struct NullSink;

impl LogSink for NullSink {
    fn record_line(&self, _line: &str) {}
}

/// Description of one external command invocation.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
    cwd: Option<PathBuf>,
    env: HashMap<String, String>,
    stdin: Option<String>,
    timeout: Option<Duration>,
    sensitive: bool,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: HashMap::new(),
            stdin: None,
            timeout: None,
            sensitive: false,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Payload written to the child's stdin, then closed.
    pub fn stdin(mut self, payload: impl Into<String>) -> Self {
        self.stdin = Some(payload.into());
        self
    }

    /// Wall-clock bound; the child is killed once it elapses.
    pub fn timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }

    /// Mark the command as producing a secret on its output streams.
    ///
    /// Output is still captured in `CommandOutput::stdout` for programmatic
    /// use, but is never streamed to the sink and never kept in the tail, so
    /// credentials cannot reach the terminal, the log buffer, or an external
    /// analyzer.
    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    pub fn env_overrides(&self) -> &HashMap<String, String> {
        &self.env
    }

    pub fn stdin_payload(&self) -> Option<&str> {
        self.stdin.as_deref()
    }

    pub fn time_limit(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn is_sensitive(&self) -> bool {
        self.sensitive
    }
}

/// Structured result of a completed command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub exit_code: i32,
    /// Full captured stdout, for commands whose output is consumed
    /// programmatically (account IDs, registry passwords).
    pub stdout: String,
    /// Rolling tail of combined stdout/stderr lines.
    pub tail: Vec<String>,
    pub elapsed: Duration,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// The tail joined into one message, for surfacing in stage errors.
    pub fn tail_message(&self) -> String {
        if self.tail.is_empty() {
            format!("exit code {}", self.exit_code)
        } else {
            self.tail.join("\n")
        }
    }
}

/// Executes external commands, streaming output lines to the sink.
///
/// The pipeline depends only on this trait so its logic is testable with a
/// fake runner, independent of the actual tools being installed.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(
        &self,
        spec: &CommandSpec,
        sink: &dyn LogSink,
    ) -> Result<CommandOutput, RunnerError>;
}
