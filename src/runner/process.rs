// ABOUTME: Real command runner backed by tokio::process.
// ABOUTME: Streams stdout/stderr lines to the sink and enforces wall-clock timeouts.

use async_trait::async_trait;
use snafu::ResultExt;
use std::collections::VecDeque;
use std::process::Stdio;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};

use super::error::{IoSnafu, RunnerError, SpawnSnafu, TimedOutSnafu};
use super::{CommandOutput, CommandRunner, CommandSpec, LogSink, TAIL_CAPACITY};

/// Runs commands as real child processes.
///
/// The child inherits the orchestrator's environment plus any per-spec
/// overrides. Stdout and stderr are consumed line by line as they arrive,
/// so an attached monitor observes output live rather than post-mortem.
#[derive(Debug, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        ProcessRunner
    }
}

struct Captured {
    stdout: String,
    tail: VecDeque<String>,
    sensitive: bool,
}

impl Captured {
    fn new(sensitive: bool) -> Self {
        Self {
            stdout: String::new(),
            tail: VecDeque::with_capacity(TAIL_CAPACITY),
            sensitive,
        }
    }

    fn record(&mut self, line: &str, from_stdout: bool, sink: &dyn LogSink) {
        if from_stdout {
            self.stdout.push_str(line);
            self.stdout.push('\n');
        }
        // Secrets stay out of the tail and away from any sink.
        if self.sensitive {
            return;
        }
        if self.tail.len() == TAIL_CAPACITY {
            self.tail.pop_front();
        }
        self.tail.push_back(line.to_string());
        sink.record_line(line);
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(
        &self,
        spec: &CommandSpec,
        sink: &dyn LogSink,
    ) -> Result<CommandOutput, RunnerError> {
        let started = Instant::now();

        let mut command = Command::new(spec.program());
        command
            .args(spec.arguments())
            .envs(spec.env_overrides())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if spec.stdin_payload().is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .kill_on_drop(true);

        if let Some(dir) = spec.working_dir() {
            command.current_dir(dir);
        }

        tracing::debug!(program = spec.program(), args = ?spec.arguments(), "spawning command");

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RunnerError::NotFound {
                    program: spec.program().to_string(),
                });
            }
            Err(e) => {
                return Err(e).context(SpawnSnafu {
                    program: spec.program(),
                });
            }
        };

        if let Some(payload) = spec.stdin_payload() {
            if let Some(mut stdin) = child.stdin.take() {
                stdin
                    .write_all(payload.as_bytes())
                    .await
                    .context(IoSnafu {
                        program: spec.program(),
                    })?;
                // Dropping the handle closes the pipe so the child sees EOF.
            }
        }

        let mut captured = Captured::new(spec.is_sensitive());

        let status = if let Some(limit) = spec.time_limit() {
            let waited =
                tokio::time::timeout(limit, drain_child(&mut child, sink, &mut captured)).await;
            match waited {
                Ok(result) => result.context(IoSnafu {
                    program: spec.program(),
                })?,
                Err(_elapsed) => {
                    let _ = child.kill().await;
                    return Err(RunnerError::TimedOut {
                        program: spec.program().to_string(),
                        timeout: limit,
                    });
                }
            }
        } else {
            drain_child(&mut child, sink, &mut captured)
                .await
                .context(IoSnafu {
                    program: spec.program(),
                })?
        };

        Ok(CommandOutput {
            exit_code: status.code().unwrap_or(-1),
            stdout: captured.stdout,
            tail: captured.tail.into_iter().collect(),
            elapsed: started.elapsed(),
        })
    }
}

/// Consume both output pipes line by line, then reap the child.
async fn drain_child(
    child: &mut Child,
    sink: &dyn LogSink,
    captured: &mut Captured,
) -> std::io::Result<std::process::ExitStatus> {
    let stdout = child.stdout.take().expect("child stdout is piped");
    let stderr = child.stderr.take().expect("child stderr is piped");

    let mut stdout_lines = BufReader::new(stdout).lines();
    let mut stderr_lines = BufReader::new(stderr).lines();
    let mut stdout_done = false;
    let mut stderr_done = false;

    while !(stdout_done && stderr_done) {
        tokio::select! {
            line = stdout_lines.next_line(), if !stdout_done => match line? {
                Some(line) => captured.record(&line, true, sink),
                None => stdout_done = true,
            },
            line = stderr_lines.next_line(), if !stderr_done => match line? {
                Some(line) => captured.record(&line, false, sink),
                None => stderr_done = true,
            },
        }
    }

    child.wait().await
}
