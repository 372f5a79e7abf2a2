//! Execution controller
//!
//! The single public entry point for judging one submission: render the
//! driver, execute it in the sandbox, parse the marker payload, grade.
//! Every stage failure short-circuits into a terminal verdict; the
//! signature is infallible because there is no failure mode the caller is
//! expected to handle differently from "here is your verdict".

use crate::config::{Limits, SandboxConfig};
use crate::executor::SandboxExecutor;
use crate::grade::{self, SuiteVerdict};
use crate::protocol;
use crate::record::ExecStatus;
use crate::suite::{Submission, TestSuite};
use crate::template;
use tokio::sync::Semaphore;

/// Judges submissions, bounding the number of simultaneous sandboxes.
#[derive(Debug)]
pub struct Judge {
    executor: SandboxExecutor,
    /// Admission gate: a permit is held for the whole sandboxed run
    gate: Semaphore,
}

impl Judge {
    #[must_use]
    pub fn new(config: SandboxConfig) -> Self {
        let gate = Semaphore::new(config.max_concurrent.max(1));
        Self {
            executor: SandboxExecutor::new(config),
            gate,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &SandboxConfig {
        self.executor.config()
    }

    /// Judge one submission against one suite under explicit limits.
    ///
    /// Pipeline with short-circuit:
    /// - render failure → `ConfigError` (nothing executed)
    /// - non-`Completed` execution → `ExecutionFailed` with status + stderr
    /// - protocol violation → `ExecutionFailed` with the parse subkind
    /// - otherwise the graded verdict
    pub async fn run(
        &self,
        submission: &Submission,
        suite: &TestSuite,
        limits: &Limits,
    ) -> SuiteVerdict {
        let n = suite.len();

        let program = match template::render(submission, suite) {
            Ok(program) => program,
            Err(e) => {
                tracing::error!(language = %submission.language, error = %e, "template rendering failed");
                return SuiteVerdict::config_error(&e, n);
            }
        };

        let record = {
            let _permit = match self.gate.acquire().await {
                Ok(permit) => permit,
                Err(e) => {
                    // Only possible if the semaphore is closed, which never
                    // happens for a live Judge; treat as a run-level failure.
                    return SuiteVerdict::execution_failed(
                        format!("admission gate closed: {e}"),
                        None,
                        n,
                    );
                }
            };

            match self.executor.execute(&program, limits).await {
                Ok(record) => record,
                Err(e) => {
                    tracing::error!(error = %e, "sandbox supervision failed");
                    return SuiteVerdict::execution_failed(e.to_string(), None, n);
                }
            }
        };

        if record.status != ExecStatus::Completed {
            tracing::info!(status = ?record.status, "execution did not complete");
            return SuiteVerdict::execution_failed(
                format!("execution ended with status {:?}", record.status),
                Some(&record),
                n,
            );
        }

        let payload = match protocol::parse(&record) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::info!(error = %e, "marker protocol violation");
                return SuiteVerdict::protocol_violation(&e, &record, n);
            }
        };

        let verdict = grade::grade(&payload, suite, record.wall_time);
        tracing::info!(
            status = ?verdict.status,
            cases = verdict.cases.len(),
            wall_ms = record.wall_time.as_millis() as u64,
            reported_ms = payload.runtime,
            "suite judged"
        );
        verdict
    }
}
