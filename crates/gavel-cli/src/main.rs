//! gavel CLI - judge submissions from the command line

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gavel_core::{
    CaseVerdict, Judge, Language, Limits, SandboxConfig, Submission, SuiteStatus, TestCase,
    TestSuite,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "gavel")]
#[command(author, version, about = "Sandboxed multi-language code-execution judge")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Judge a solution against a test suite
    Judge {
        /// Language of the solution (python, javascript)
        #[arg(short, long)]
        language: Language,

        /// Path to the solution source file
        #[arg(short, long)]
        solution: PathBuf,

        /// Path to the test suite JSON file
        #[arg(long)]
        suite: PathBuf,

        /// Wall-clock limit in milliseconds
        #[arg(long, default_value = "10000")]
        time_ms: u64,

        /// Memory limit in MB
        #[arg(long, default_value = "256")]
        memory_mb: u64,

        /// Print the verdict as JSON instead of a human summary
        #[arg(long)]
        json: bool,
    },

    /// Render the driver program for inspection, without executing it
    Render {
        /// Language of the solution (python, javascript)
        #[arg(short, long)]
        language: Language,

        /// Path to the solution source file
        #[arg(short, long)]
        solution: PathBuf,

        /// Path to the test suite JSON file
        #[arg(long)]
        suite: PathBuf,
    },

    /// List supported languages
    Languages,
}

/// One test case as stored in a suite file:
/// `{"args": [1, 2], "expected": 3}`
#[derive(Deserialize)]
struct SuiteFileCase {
    args: Vec<serde_json::Value>,
    expected: serde_json::Value,
}

fn load_suite(path: &Path) -> Result<TestSuite> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read suite file {}", path.display()))?;
    let cases: Vec<SuiteFileCase> = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse suite file {}", path.display()))?;

    TestSuite::new(
        cases
            .into_iter()
            .map(|c| TestCase::new(c.args, c.expected))
            .collect(),
    )
    .context("invalid test suite")
}

fn load_submission(language: Language, path: &Path) -> Result<Submission> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read solution file {}", path.display()))?;
    Ok(Submission::new(language, source))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("gavel=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Judge {
            language,
            solution,
            suite,
            time_ms,
            memory_mb,
            json,
        } => {
            let submission = load_submission(language, &solution)?;
            let suite = load_suite(&suite)?;
            let limits = Limits::new(time_ms, memory_mb);
            tracing::info!(%language, cases = suite.len(), time_ms, memory_mb, "judging submission");

            let judge = Judge::new(SandboxConfig::default());
            let verdict = judge.run(&submission, &suite, &limits).await;

            if json {
                println!("{}", serde_json::to_string_pretty(&verdict)?);
            } else {
                print_verdict(&verdict);
            }

            if verdict.status != SuiteStatus::AllPass {
                std::process::exit(1);
            }
        }

        Commands::Render {
            language,
            solution,
            suite,
        } => {
            let submission = load_submission(language, &solution)?;
            let suite = load_suite(&suite)?;
            let program = gavel_core::template::render(&submission, &suite)?;
            println!("{}", program.source);
        }

        Commands::Languages => {
            for language in Language::ALL {
                println!("{language}");
            }
        }
    }

    Ok(())
}

fn print_verdict(verdict: &gavel_core::SuiteVerdict) {
    println!("status: {:?}", verdict.status);
    for (i, case) in verdict.cases.iter().enumerate() {
        match case {
            CaseVerdict::Pass => println!("  case {i}: pass"),
            CaseVerdict::Fail { expected, actual } => {
                println!("  case {i}: fail (expected {expected}, got {actual})");
            }
            CaseVerdict::Error => println!("  case {i}: error"),
            CaseVerdict::Skipped => println!("  case {i}: skipped"),
        }
    }
    println!("wall time: {:?}", verdict.wall_time);
    if let Some(ms) = verdict.reported_runtime_ms {
        println!("in-process runtime: {ms}ms");
    }
    if let Some(diag) = &verdict.diagnostics {
        println!("failure: {}", diag.detail);
        if let Some(stderr) = diag.stderr_excerpt.as_deref().filter(|s| !s.is_empty()) {
            println!("--- stderr ---\n{stderr}");
        }
    }
}
