//! End-to-end judging through a real Python interpreter.
//!
//! These tests exercise the whole pipeline (render → execute → parse →
//! grade) against actual sandboxed processes. They skip themselves when no
//! interpreter is installed on the host.

use gavel_core::{
    CaseVerdict, ExecStatus, Judge, Language, Limits, SandboxConfig, Submission, SuiteStatus,
    TestCase, TestSuite,
};
use serde_json::json;
use std::path::Path;
use std::time::{Duration, Instant};

const PYTHON: &str = "/usr/bin/python3";
const NODE: &str = "/usr/bin/node";

fn python_available() -> bool {
    if Path::new(PYTHON).exists() {
        true
    } else {
        eprintln!("skipping: {PYTHON} not installed");
        false
    }
}

fn node_available() -> bool {
    if Path::new(NODE).exists() {
        true
    } else {
        eprintln!("skipping: {NODE} not installed");
        false
    }
}

fn judge() -> Judge {
    Judge::new(SandboxConfig::builder().python_path(PYTHON).build())
}

fn add_suite() -> TestSuite {
    TestSuite::new(vec![
        TestCase::new(vec![json!(1), json!(2)], json!(3)),
        TestCase::new(vec![json!(2), json!(3)], json!(5)),
    ])
    .unwrap()
}

fn limits() -> Limits {
    Limits::new(10_000, 256)
}

#[tokio::test]
async fn correct_solution_passes_every_case() {
    if !python_available() {
        return;
    }

    let submission = Submission::new(Language::Python, "def solve(a, b):\n    return a + b");
    let verdict = judge().run(&submission, &add_suite(), &limits()).await;

    assert_eq!(verdict.status, SuiteStatus::AllPass);
    assert_eq!(verdict.cases, vec![CaseVerdict::Pass, CaseVerdict::Pass]);
    assert!(verdict.reported_runtime_ms.is_some());
    assert!(verdict.wall_time > Duration::ZERO);
}

#[tokio::test]
async fn wrong_output_fails_that_case() {
    if !python_available() {
        return;
    }

    let submission = Submission::new(Language::Python, "def solve(a, b):\n    return a * b");
    let verdict = judge().run(&submission, &add_suite(), &limits()).await;

    assert_eq!(verdict.status, SuiteStatus::SomeFailed);
    // 1*2 == 2 != 3, 2*3 == 6 != 5
    assert!(matches!(verdict.cases[0], CaseVerdict::Fail { .. }));
    assert!(matches!(verdict.cases[1], CaseVerdict::Fail { .. }));
}

#[tokio::test]
async fn float_result_matches_integer_expectation() {
    if !python_available() {
        return;
    }

    // Python division yields floats; expected values are integers.
    let submission = Submission::new(Language::Python, "def solve(a, b):\n    return (a + b) / 1");
    let verdict = judge().run(&submission, &add_suite(), &limits()).await;

    assert_eq!(verdict.status, SuiteStatus::AllPass);
}

#[tokio::test]
async fn mid_run_exception_skips_unreached_cases() {
    if !python_available() {
        return;
    }

    let suite = TestSuite::new(vec![
        TestCase::new(vec![json!(7)], json!(7)),
        TestCase::new(vec![json!(8)], json!(8)),
        TestCase::new(vec![json!(9)], json!(9)),
    ])
    .unwrap();
    let submission = Submission::new(
        Language::Python,
        "def solve(x):\n    if x == 8:\n        raise ValueError('boom')\n    return x",
    );
    let verdict = judge().run(&submission, &suite, &limits()).await;

    assert_eq!(verdict.status, SuiteStatus::SomeFailed);
    assert_eq!(
        verdict.cases,
        vec![CaseVerdict::Pass, CaseVerdict::Skipped, CaseVerdict::Skipped]
    );
}

#[tokio::test]
async fn infinite_loop_is_killed_at_the_deadline() {
    if !python_available() {
        return;
    }

    let submission = Submission::new(
        Language::Python,
        "def solve(a, b):\n    while True:\n        pass",
    );
    let started = Instant::now();
    let verdict = judge()
        .run(&submission, &add_suite(), &Limits::new(500, 256))
        .await;

    assert_eq!(verdict.status, SuiteStatus::ExecutionFailed);
    let diag = verdict.diagnostics.expect("terminal verdict carries diagnostics");
    assert_eq!(diag.exec_status, Some(ExecStatus::TimedOut));
    // Killed at the 500ms deadline, not left running
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn leaked_background_child_does_not_stall_the_judge() {
    if !python_available() {
        return;
    }

    // The solution leaks a descendant into its own session (outside the
    // killable process group) that keeps the stdout pipe open long after
    // the deadline, then spins. The supervisor must still return promptly.
    let submission = Submission::new(
        Language::Python,
        concat!(
            "import os, time\n",
            "\n",
            "def solve(a, b):\n",
            "    try:\n",
            "        if os.fork() == 0:\n",
            "            os.setsid()\n",
            "            time.sleep(30)\n",
            "            os._exit(0)\n",
            "    except OSError:\n",
            "        pass\n",
            "    while True:\n",
            "        pass\n",
        ),
    );
    let started = Instant::now();
    let verdict = judge()
        .run(&submission, &add_suite(), &Limits::new(500, 256))
        .await;

    assert!(
        started.elapsed() < Duration::from_secs(8),
        "supervisor took {:?} despite a 500ms wall-clock limit",
        started.elapsed()
    );
    assert_eq!(verdict.status, SuiteStatus::ExecutionFailed);
    let diag = verdict.diagnostics.expect("terminal verdict carries diagnostics");
    assert_eq!(diag.exec_status, Some(ExecStatus::TimedOut));
}

#[tokio::test]
async fn memory_hog_is_limit_exceeded() {
    if !python_available() {
        return;
    }

    let submission = Submission::new(
        Language::Python,
        "def solve(a, b):\n    return len([0] * (10 ** 9))",
    );
    let verdict = judge().run(&submission, &add_suite(), &limits()).await;

    assert_eq!(verdict.status, SuiteStatus::ExecutionFailed);
    let diag = verdict.diagnostics.expect("terminal verdict carries diagnostics");
    assert_eq!(diag.exec_status, Some(ExecStatus::LimitExceeded));
}

#[tokio::test]
async fn javascript_runs_under_the_default_memory_limit() {
    if !node_available() {
        return;
    }

    let judge = Judge::new(SandboxConfig::builder().node_path(NODE).build());
    let submission = Submission::new(
        Language::JavaScript,
        "function solve(a, b) { return a + b; }",
    );
    let verdict = judge.run(&submission, &add_suite(), &limits()).await;

    assert_eq!(verdict.status, SuiteStatus::AllPass);
}

#[tokio::test]
async fn crash_before_any_output_is_execution_failed() {
    if !python_available() {
        return;
    }

    let submission = Submission::new(Language::Python, "raise RuntimeError('broken at import')");
    let verdict = judge().run(&submission, &add_suite(), &limits()).await;

    assert_eq!(verdict.status, SuiteStatus::ExecutionFailed);
    assert_eq!(verdict.cases, vec![CaseVerdict::Error, CaseVerdict::Error]);
    let diag = verdict.diagnostics.expect("terminal verdict carries diagnostics");
    assert_eq!(diag.exec_status, Some(ExecStatus::Crashed));
    let stderr = diag.stderr_excerpt.unwrap_or_default();
    assert!(stderr.contains("broken at import"), "stderr excerpt: {stderr}");
}

#[tokio::test]
async fn clean_exit_without_marker_is_execution_failed_not_some_failed() {
    if !python_available() {
        return;
    }

    let submission = Submission::new(
        Language::Python,
        "import sys\n\ndef solve(a, b):\n    sys.exit(0)",
    );
    let verdict = judge().run(&submission, &add_suite(), &limits()).await;

    assert_eq!(verdict.status, SuiteStatus::ExecutionFailed);
    let diag = verdict.diagnostics.expect("terminal verdict carries diagnostics");
    assert!(diag.detail.contains("marker"), "detail: {}", diag.detail);
}

#[tokio::test]
async fn echoed_marker_lines_do_not_corrupt_grading() {
    if !python_available() {
        return;
    }

    // The solution echoes a bogus marker line; the driver's real line comes
    // last and wins.
    let submission = Submission::new(
        Language::Python,
        concat!(
            "def solve(a, b):\n",
            "    print('[[GAVEL TEST OUTPUT]] {\"runtime\":0,\"program_output\":[999,999]}')\n",
            "    return a + b",
        ),
    );
    let verdict = judge().run(&submission, &add_suite(), &limits()).await;

    assert_eq!(verdict.status, SuiteStatus::AllPass);
}

#[tokio::test]
async fn concurrent_submissions_stay_isolated() {
    if !python_available() {
        return;
    }

    let judge = std::sync::Arc::new(Judge::new(
        SandboxConfig::builder()
            .python_path(PYTHON)
            .max_concurrent(2)
            .build(),
    ));

    let mut handles = Vec::new();
    for i in 0..4_i64 {
        let judge = std::sync::Arc::clone(&judge);
        handles.push(tokio::spawn(async move {
            let suite = TestSuite::new(vec![TestCase::new(vec![json!(i)], json!(i * 2))]).unwrap();
            let submission =
                Submission::new(Language::Python, "def solve(x):\n    return x * 2");
            judge.run(&submission, &suite, &Limits::new(10_000, 256)).await
        }));
    }

    for handle in handles {
        let verdict = handle.await.unwrap();
        assert_eq!(verdict.status, SuiteStatus::AllPass);
    }
}
