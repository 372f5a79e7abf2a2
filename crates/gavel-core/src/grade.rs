//! Result aggregation and verdicts

use crate::protocol::{ParseError, ResultPayload};
use crate::record::{ExecStatus, ExecutionRecord};
use crate::suite::TestSuite;
use crate::template::TemplateError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// How many bytes of stderr a diagnostic carries at most.
const STDERR_EXCERPT_BYTES: usize = 4096;

/// Outcome of one test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum CaseVerdict {
    /// Produced output deep-equals the expected output
    Pass,
    /// Produced output differs from the expected output
    Fail { expected: Value, actual: Value },
    /// A run-level failure prevented this case from being judged
    Error,
    /// The program stopped before reaching this case
    Skipped,
}

/// Overall status of one judged suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuiteStatus {
    /// Every case passed
    AllPass,
    /// At least one case failed or was skipped
    SomeFailed,
    /// No result payload could be obtained at all
    ExecutionFailed,
    /// The template was malformed; nothing was executed
    ConfigError,
}

/// Diagnostic payload attached to terminal verdicts so they explain
/// themselves without re-running the submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Human-readable description of what went wrong
    pub detail: String,
    pub exec_status: Option<ExecStatus>,
    pub exit_code: Option<i32>,
    pub signal: Option<i32>,
    pub stderr_excerpt: Option<String>,
}

/// The graded outcome of running one test suite through one submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteVerdict {
    pub status: SuiteStatus,

    /// One entry per test case, in suite order
    pub cases: Vec<CaseVerdict>,

    /// Wall-clock duration measured by the supervisor (zero when nothing ran)
    pub wall_time: Duration,

    /// Milliseconds self-reported from inside the sandbox, when available
    pub reported_runtime_ms: Option<u64>,

    pub diagnostics: Option<Diagnostics>,
}

impl SuiteVerdict {
    /// Verdict for a malformed template: nothing was executed.
    #[must_use]
    pub fn config_error(err: &TemplateError, suite_len: usize) -> Self {
        Self {
            status: SuiteStatus::ConfigError,
            cases: vec![CaseVerdict::Error; suite_len],
            wall_time: Duration::ZERO,
            reported_runtime_ms: None,
            diagnostics: Some(Diagnostics {
                detail: err.to_string(),
                exec_status: None,
                exit_code: None,
                signal: None,
                stderr_excerpt: None,
            }),
        }
    }

    /// Verdict for a run that never produced a parseable payload.
    #[must_use]
    pub fn execution_failed(detail: String, record: Option<&ExecutionRecord>, suite_len: usize) -> Self {
        Self {
            status: SuiteStatus::ExecutionFailed,
            cases: vec![CaseVerdict::Error; suite_len],
            wall_time: record.map_or(Duration::ZERO, |r| r.wall_time),
            reported_runtime_ms: None,
            diagnostics: Some(Diagnostics {
                detail,
                exec_status: record.map(|r| r.status),
                exit_code: record.and_then(|r| r.exit_code),
                signal: record.and_then(|r| r.signal),
                stderr_excerpt: record.map(|r| r.stderr_excerpt(STDERR_EXCERPT_BYTES)),
            }),
        }
    }

    /// Verdict for a completed run whose stdout violated the marker protocol.
    #[must_use]
    pub fn protocol_violation(err: &ParseError, record: &ExecutionRecord, suite_len: usize) -> Self {
        Self::execution_failed(err.to_string(), Some(record), suite_len)
    }
}

/// Compare every produced output against its expected value, positionally.
///
/// Cases beyond the end of `program_output` are marked `Skipped`: the driver
/// reports partial output when the solution raised mid-run, and the cases it
/// never reached are not failures in their own right.
#[must_use]
pub fn grade(payload: &ResultPayload, suite: &TestSuite, wall_time: Duration) -> SuiteVerdict {
    let cases: Vec<CaseVerdict> = suite
        .cases()
        .iter()
        .enumerate()
        .map(|(i, case)| match payload.program_output.get(i) {
            Some(actual) if json_eq(actual, &case.expected) => CaseVerdict::Pass,
            Some(actual) => CaseVerdict::Fail {
                expected: case.expected.clone(),
                actual: actual.clone(),
            },
            None => CaseVerdict::Skipped,
        })
        .collect();

    let status = if cases.iter().all(|c| matches!(c, CaseVerdict::Pass)) {
        SuiteStatus::AllPass
    } else {
        SuiteStatus::SomeFailed
    };

    SuiteVerdict {
        status,
        cases,
        wall_time,
        reported_runtime_ms: Some(payload.runtime),
        diagnostics: None,
    }
}

/// Deep structural equality with one canonical numeric rule: when both sides
/// are integers they compare exactly (so values beyond 2^53 are not
/// conflated); otherwise two JSON numbers are equal iff they compare equal
/// as f64, so `1` equals `1.0`. Containers compare element-wise and key-wise
/// recursively; everything else by strict equality.
#[must_use]
pub fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
                x == y
            } else if let (Some(x), Some(y)) = (x.as_u64(), y.as_u64()) {
                x == y
            } else {
                match (x.as_f64(), y.as_f64()) {
                    (Some(x), Some(y)) => x == y,
                    _ => x == y,
                }
            }
        }
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| json_eq(a, b))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter().all(|(k, v)| y.get(k).is_some_and(|w| json_eq(v, w)))
        }
        _ => a == b,
    }
}
