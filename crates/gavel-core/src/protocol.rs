//! Marker-line output protocol
//!
//! The sandboxed program may print anything it likes to stdout; the one thing
//! the judge reads is a single line of the form
//!
//! ```text
//! [[GAVEL TEST OUTPUT]] {"runtime":12,"program_output":[...]}
//! ```
//!
//! The *last* line starting with the marker wins, so user code accidentally
//! echoing the literal earlier cannot corrupt grading. Everything else on
//! stdout is free-form debug output and is ignored here.

use crate::record::ExecutionRecord;
use serde_json::Value;
use thiserror::Error;

/// Fixed literal shared by every language template and this parser.
pub const MARKER: &str = "[[GAVEL TEST OUTPUT]]";

/// Exit code the drivers use to report that the guest hit the memory
/// ceiling, so the supervisor can classify the death as `LimitExceeded`
/// instead of an ordinary crash. Part of the driver contract alongside
/// [`MARKER`].
pub const MEMORY_LIMIT_EXIT_CODE: i32 = 87;

/// Ways a completed execution can fail to conform to the protocol.
///
/// Each subkind is reported as-is; none is ever coerced into an empty result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("no marker line found in program output")]
    MarkerMissing,

    #[error("marker payload is not a well-formed result object: {0}")]
    MalformedJson(String),

    #[error("marker payload is missing required field `{0}`")]
    MissingField(&'static str),
}

/// The structured result a conforming program reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultPayload {
    /// Milliseconds, as measured inside the sandboxed process
    pub runtime: u64,

    /// One output per test case, in suite order. May be shorter than the
    /// suite if the driver caught a mid-run exception.
    pub program_output: Vec<Value>,
}

/// Extract and decode the marker payload from a captured execution.
///
/// # Errors
/// Returns the matching [`ParseError`] subkind when the marker is absent,
/// the payload is not valid JSON, or a required field is missing.
pub fn parse(record: &ExecutionRecord) -> Result<ResultPayload, ParseError> {
    let line = record
        .stdout
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| line.starts_with(MARKER))
        .ok_or(ParseError::MarkerMissing)?;

    let body = line[MARKER.len()..].trim();
    let value: Value =
        serde_json::from_str(body).map_err(|e| ParseError::MalformedJson(e.to_string()))?;
    let object = value
        .as_object()
        .ok_or_else(|| ParseError::MalformedJson("payload is not a JSON object".into()))?;

    let runtime = object
        .get("runtime")
        .ok_or(ParseError::MissingField("runtime"))?
        .as_u64()
        .ok_or_else(|| ParseError::MalformedJson("`runtime` is not an unsigned integer".into()))?;

    let program_output = object
        .get("program_output")
        .ok_or(ParseError::MissingField("program_output"))?
        .as_array()
        .ok_or_else(|| ParseError::MalformedJson("`program_output` is not an array".into()))?
        .clone();

    Ok(ResultPayload {
        runtime,
        program_output,
    })
}
