//! Execution records produced by the sandbox executor

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Terminal status of one sandboxed execution.
///
/// `Completed` only means the process exited 0; whether it printed a usable
/// result is decided later by the protocol parser and the grader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecStatus {
    /// Process exited normally with status 0
    Completed,
    /// Killed because the wall-clock deadline expired
    TimedOut,
    /// Non-zero exit or fatal signal, no limit involved
    Crashed,
    /// Killed by a resource limit (CPU backstop or memory ceiling)
    LimitExceeded,
}

/// Everything observed about one sandboxed run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub status: ExecStatus,

    /// Exit code, if the process exited normally
    pub exit_code: Option<i32>,

    /// Terminating signal, if the process was killed
    pub signal: Option<i32>,

    /// Captured stdout (lossy UTF-8, capped)
    pub stdout: String,

    /// Captured stderr (lossy UTF-8, capped)
    pub stderr: String,

    /// Whether stdout exceeded the capture cap
    pub stdout_truncated: bool,

    /// Whether stderr exceeded the capture cap
    pub stderr_truncated: bool,

    /// Wall-clock duration measured by the supervisor
    pub wall_time: Duration,
}

impl ExecutionRecord {
    /// A bounded slice of stderr for diagnostics.
    #[must_use]
    pub fn stderr_excerpt(&self, max_bytes: usize) -> String {
        let mut end = self.stderr.len().min(max_bytes);
        while !self.stderr.is_char_boundary(end) {
            end -= 1;
        }
        self.stderr[..end].to_owned()
    }
}
