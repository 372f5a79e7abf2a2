//! # gavel-core
//!
//! The execution-and-result-extraction engine of a sandboxed multi-language
//! code-execution judge:
//! - per-language driver templates with a single `{{INPUTS}}` placeholder
//! - one isolated, resource-limited child process per execution
//! - a marker-line protocol for extracting structured results from stdout
//! - positional grading with canonical deep structural equality
//! - a single pipeline entry point ([`Judge::run`]) with short-circuiting
//!   failure classification and a bounded admission gate

#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod executor;
pub mod grade;
pub mod judge;
pub mod language;
pub mod protocol;
pub mod record;
pub mod suite;
pub mod template;

pub use config::{Limits, SandboxConfig};
pub use error::GavelError;
pub use grade::{CaseVerdict, SuiteStatus, SuiteVerdict};
pub use judge::Judge;
pub use language::Language;
pub use record::{ExecStatus, ExecutionRecord};
pub use suite::{Submission, TestCase, TestSuite};

/// Crate-level result type
pub type Result<T> = std::result::Result<T, GavelError>;
