// ABOUTME: The log monitor: buffers command output, classifies lines, selects fixes.
// ABOUTME: Cheap to clone and shareable across tasks; implements LogSink for the runner.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use crate::runner::LogSink;

use super::classifier::{Classifier, DeploymentError};
use super::fixes::{FixSelector, FixStrategy};
use super::status::{AgentPhase, AgentStatus, DEFAULT_BUFFER_CAPACITY, LogBuffer};

struct State {
    phase: AgentPhase,
    last_message: Option<String>,
    buffer: LogBuffer,
    detection: Option<DeploymentError>,
}

struct Inner {
    state: Mutex<State>,
    classifier: Classifier,
    selector: FixSelector,
}

/// Observes log lines, keeping a bounded context buffer and the first
/// classified error of the session as the root cause.
#[derive(Clone)]
pub struct LogMonitor {
    inner: Arc<Inner>,
}

impl Default for LogMonitor {
    fn default() -> Self {
        LogMonitor::new(
            DEFAULT_BUFFER_CAPACITY,
            Classifier::default(),
            FixSelector::default(),
        )
    }
}

impl LogMonitor {
    pub fn new(buffer_capacity: usize, classifier: Classifier, selector: FixSelector) -> Self {
        LogMonitor {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    phase: AgentPhase::Idle,
                    last_message: None,
                    buffer: LogBuffer::new(buffer_capacity),
                    detection: None,
                }),
                classifier,
                selector,
            }),
        }
    }

    /// Observe one line. Returns whether the line classified as a known
    /// failure. Later matches keep the first detection as the root cause but
    /// refresh the status message.
    pub fn observe_line(&self, line: &str) -> bool {
        let classified = self.inner.classifier.classify(line);
        let mut state = self.inner.state.lock();
        state.buffer.push(line);
        if state.phase == AgentPhase::Idle {
            state.phase = AgentPhase::Monitoring;
        }

        match classified {
            Some(error) => {
                state.last_message = Some(error.line.clone());
                if state.detection.is_none() {
                    tracing::warn!(
                        pattern = error.pattern.name,
                        "failure signature detected in logs"
                    );
                    state.detection = Some(error);
                }
                state.phase = AgentPhase::ErrorDetected;
                true
            }
            None => false,
        }
    }

    /// Drain an async line stream through the monitor, running full fix
    /// selection (escalation allowed) for each classified line. Returns the
    /// number of lines that classified as failures.
    pub async fn watch<R>(&self, reader: R) -> std::io::Result<usize>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = BufReader::new(reader).lines();
        let mut detections = 0;
        while let Some(line) = lines.next_line().await? {
            if self.observe_line(&line) {
                detections += 1;
                self.select_fix().await;
            }
        }
        Ok(detections)
    }

    /// The first classified error of this session, if any.
    pub fn last_error(&self) -> Option<DeploymentError> {
        self.inner.state.lock().detection.clone()
    }

    /// Select a fix for the detected error, escalating through the selector's
    /// analyzer when configured. Updates the phase to reflect the outcome.
    pub async fn select_fix(&self) -> Option<FixStrategy> {
        let (detection, context) = {
            let state = self.inner.state.lock();
            (state.detection.clone(), state.buffer.snapshot())
        };

        let fix = self.inner.selector.select(detection.as_ref(), &context).await;
        self.record_selection(&fix);
        fix
    }

    /// Like [`select_fix`](Self::select_fix) but never escalates.
    pub fn select_fix_local(&self) -> Option<FixStrategy> {
        let detection = self.inner.state.lock().detection.clone();
        let fix = self.inner.selector.select_local(detection.as_ref());
        self.record_selection(&fix);
        fix
    }

    fn record_selection(&self, fix: &Option<FixStrategy>) {
        let mut state = self.inner.state.lock();
        if state.detection.is_none() {
            return;
        }
        state.phase = match fix {
            Some(fix) => {
                state.last_message = Some(fix.description.clone());
                AgentPhase::FixSelected
            }
            None => AgentPhase::FixUnavailable,
        };
    }

    pub fn status(&self) -> AgentStatus {
        let state = self.inner.state.lock();
        AgentStatus {
            phase: state.phase,
            last_message: state.last_message.clone(),
            captured_lines: state.buffer.len(),
        }
    }

    /// The most recent `count` buffered lines.
    pub fn recent_lines(&self, count: usize) -> Vec<String> {
        let state = self.inner.state.lock();
        let snapshot = state.buffer.snapshot();
        let start = snapshot.len().saturating_sub(count);
        snapshot[start..].to_vec()
    }

    /// Drop buffered lines and any detection, returning to idle.
    pub fn reset(&self) {
        let mut state = self.inner.state.lock();
        state.buffer.clear();
        state.detection = None;
        state.last_message = None;
        state.phase = AgentPhase::Idle;
    }
}

impl LogSink for LogMonitor {
    fn record_line(&self, line: &str) {
        self.observe_line(line);
    }
}
