// ABOUTME: Scripted CommandRunner: rules match invocations and produce canned outcomes.
// ABOUTME: Applied manifests land in an in-memory cluster keyed by kind/name.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::time::Duration;

use caravel::runner::{CommandOutput, CommandRunner, CommandSpec, LogSink, RunnerError};

/// How a matched invocation behaves.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Exit with a code, emitting stdout and streaming lines to the sink.
    Exit {
        code: i32,
        stdout: &'static str,
        lines: &'static [&'static str],
    },
    /// The program is not installed.
    Missing,
}

impl Outcome {
    pub fn ok() -> Self {
        Outcome::Exit {
            code: 0,
            stdout: "",
            lines: &[],
        }
    }

    pub fn ok_stdout(stdout: &'static str) -> Self {
        Outcome::Exit {
            code: 0,
            stdout,
            lines: &[],
        }
    }

    pub fn fails(code: i32, lines: &'static [&'static str]) -> Self {
        Outcome::Exit {
            code,
            stdout: "",
            lines,
        }
    }
}

/// Matches one kind of invocation. `args_contains` matches against the
/// space-joined argument list; `stdin_contains` against the stdin payload.
#[derive(Debug, Clone)]
pub struct Rule {
    pub program: &'static str,
    pub args_contains: Option<&'static str>,
    pub stdin_contains: Option<&'static str>,
    pub outcome: Outcome,
}

impl Rule {
    pub fn new(program: &'static str, outcome: Outcome) -> Self {
        Rule {
            program,
            args_contains: None,
            stdin_contains: None,
            outcome,
        }
    }

    pub fn with_args(mut self, needle: &'static str) -> Self {
        self.args_contains = Some(needle);
        self
    }

    pub fn with_stdin(mut self, needle: &'static str) -> Self {
        self.stdin_contains = Some(needle);
        self
    }

    fn matches(&self, spec: &CommandSpec) -> bool {
        if spec.program() != self.program {
            return false;
        }
        let joined = spec.arguments().join(" ");
        if let Some(needle) = self.args_contains {
            if !joined.contains(needle) {
                return false;
            }
        }
        if let Some(needle) = self.stdin_contains {
            match spec.stdin_payload() {
                Some(payload) if payload.contains(needle) => {}
                _ => return false,
            }
        }
        true
    }
}

/// Scripted runner. First matching rule wins; unmatched invocations succeed
/// with empty output so tests only script what they assert on.
#[derive(Default)]
pub struct FakeRunner {
    rules: Vec<Rule>,
    calls: Mutex<Vec<String>>,
    cluster: Mutex<BTreeMap<String, String>>,
}

impl FakeRunner {
    pub fn new(rules: Vec<Rule>) -> Self {
        FakeRunner {
            rules,
            calls: Mutex::new(Vec::new()),
            cluster: Mutex::new(BTreeMap::new()),
        }
    }

    /// All invocations as `program arg1 arg2 ...` strings, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, needle: &str) -> usize {
        self.calls().iter().filter(|c| c.contains(needle)).count()
    }

    /// The in-memory cluster: `kind/name` to applied manifest.
    pub fn cluster(&self) -> BTreeMap<String, String> {
        self.cluster.lock().clone()
    }

    fn record_apply(&self, spec: &CommandSpec) {
        let Some(manifest) = spec.stdin_payload() else {
            return;
        };
        let Ok(doc) = serde_yaml::from_str::<serde_yaml::Value>(manifest) else {
            return;
        };
        let kind = doc["kind"].as_str().unwrap_or("Unknown").to_string();
        let name = doc["metadata"]["name"].as_str().unwrap_or("").to_string();
        self.cluster
            .lock()
            .insert(format!("{kind}/{name}"), manifest.to_string());
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(
        &self,
        spec: &CommandSpec,
        sink: &dyn LogSink,
    ) -> Result<CommandOutput, RunnerError> {
        self.calls
            .lock()
            .push(format!("{} {}", spec.program(), spec.arguments().join(" ")));

        let outcome = self
            .rules
            .iter()
            .find(|rule| rule.matches(spec))
            .map(|rule| rule.outcome.clone())
            .unwrap_or_else(Outcome::ok);

        match outcome {
            Outcome::Missing => Err(RunnerError::NotFound {
                program: spec.program().to_string(),
            }),
            Outcome::Exit {
                code,
                stdout,
                lines,
            } => {
                if !spec.is_sensitive() {
                    for line in lines {
                        sink.record_line(line);
                    }
                }
                if code == 0
                    && spec.program() == "kubectl"
                    && spec.arguments().first().map(String::as_str) == Some("apply")
                {
                    self.record_apply(spec);
                }
                let tail = if spec.is_sensitive() {
                    Vec::new()
                } else {
                    lines.iter().map(|l| l.to_string()).collect()
                };
                Ok(CommandOutput {
                    exit_code: code,
                    stdout: stdout.to_string(),
                    tail,
                    elapsed: Duration::from_millis(1),
                })
            }
        }
    }
}

/// Sink that keeps every line for assertions.
#[derive(Default)]
pub struct CollectingSink {
    lines: Mutex<Vec<String>>,
}

impl CollectingSink {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }
}

impl LogSink for CollectingSink {
    fn record_line(&self, line: &str) {
        self.lines.lock().push(line.to_string());
    }
}
