//! Test cases, suites and submissions

use crate::{GavelError, Result};
use crate::language::Language;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single test case: the arguments passed to the solution for one
/// invocation, and the output it is expected to produce.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    /// Ordered argument list for one invocation of the solution
    pub args: Vec<Value>,

    /// Expected output, compared structurally against what the program produced
    pub expected: Value,
}

impl TestCase {
    #[must_use]
    pub fn new(args: Vec<Value>, expected: Value) -> Self {
        Self { args, expected }
    }
}

/// An ordered, non-empty sequence of test cases for one submission.
///
/// Order is the correlation key between inputs and the positional outputs
/// the sandboxed program reports, so it is never reordered after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuite(Vec<TestCase>);

impl TestSuite {
    /// Build a suite from test cases.
    ///
    /// # Errors
    /// Returns `GavelError::Config` if `cases` is empty.
    pub fn new(cases: Vec<TestCase>) -> Result<Self> {
        if cases.is_empty() {
            return Err(GavelError::Config("test suite must not be empty".into()));
        }
        Ok(Self(cases))
    }

    #[must_use]
    pub fn cases(&self) -> &[TestCase] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        // A constructed suite is never empty; kept for clippy's len/is_empty pairing.
        self.0.is_empty()
    }

    /// The argument lists of all cases, in suite order, as a JSON array.
    /// This is the value substituted into the template placeholder.
    #[must_use]
    pub fn input_array(&self) -> Value {
        Value::Array(self.0.iter().map(|c| Value::Array(c.args.clone())).collect())
    }
}

/// One user submission: the solution source for a given language.
///
/// The source must define the solution entry point the language template
/// invokes (`solve`); it is prepended verbatim to the rendered driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub language: Language,
    pub source: String,
}

impl Submission {
    #[must_use]
    pub fn new(language: Language, source: impl Into<String>) -> Self {
        Self {
            language,
            source: source.into(),
        }
    }
}
