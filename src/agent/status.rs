// ABOUTME: Monitor phase/status types and the bounded log line buffer.
// ABOUTME: The buffer evicts oldest lines so long runs stay at a fixed footprint.

use serde::Serialize;
use std::collections::VecDeque;

/// Default number of recent log lines retained for analysis context.
pub const DEFAULT_BUFFER_CAPACITY: usize = 500;

/// Where the monitor currently is in its detect-then-suggest cycle.
///
/// The monitor is advisory: it selects fixes but never applies them. The
/// terminal phases are therefore `FixSelected`/`FixUnavailable`; an agent
/// that executed its selections would report applied/failed instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentPhase {
    Idle,
    Monitoring,
    ErrorDetected,
    FixSelected,
    FixUnavailable,
}

/// Snapshot of the monitor's state.
#[derive(Debug, Clone, Serialize)]
pub struct AgentStatus {
    pub phase: AgentPhase,
    pub last_message: Option<String>,
    pub captured_lines: usize,
}

impl Default for AgentStatus {
    fn default() -> Self {
        AgentStatus {
            phase: AgentPhase::Idle,
            last_message: None,
            captured_lines: 0,
        }
    }
}

/// Fixed-capacity line buffer, evicting from the front when full.
#[derive(Debug)]
pub struct LogBuffer {
    lines: VecDeque<String>,
    capacity: usize,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        LogBuffer {
            lines: VecDeque::with_capacity(capacity.min(DEFAULT_BUFFER_CAPACITY)),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, line: impl Into<String>) {
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line.into());
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.lines.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        LogBuffer::new(DEFAULT_BUFFER_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_evicts_oldest_when_full() {
        let mut buffer = LogBuffer::new(3);
        for i in 0..5 {
            buffer.push(format!("line-{i}"));
        }
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.snapshot(), vec!["line-2", "line-3", "line-4"]);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut buffer = LogBuffer::new(0);
        buffer.push("only");
        buffer.push("latest");
        assert_eq!(buffer.snapshot(), vec!["latest"]);
    }

    #[test]
    fn clear_resets_the_buffer() {
        let mut buffer = LogBuffer::new(4);
        buffer.push("a");
        buffer.clear();
        assert!(buffer.is_empty());
    }

    #[test]
    fn default_status_is_idle() {
        let status = AgentStatus::default();
        assert_eq!(status.phase, AgentPhase::Idle);
        assert_eq!(status.captured_lines, 0);
    }
}
