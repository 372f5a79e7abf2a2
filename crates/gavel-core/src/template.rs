//! Template rendering
//!
//! A driver template is a per-language source skeleton carrying exactly one
//! `{{INPUTS}}` placeholder. Rendering serializes the suite's argument lists
//! to a compact JSON array, substitutes it for the placeholder, and prepends
//! the user's solution source. Pure string work; nothing is executed here.

use crate::language::Language;
use crate::suite::{Submission, TestSuite};
use thiserror::Error;

/// Placeholder token replaced with the serialized input array.
pub const PLACEHOLDER: &str = "{{INPUTS}}";

/// Template problems are operator-caused configuration errors, distinct from
/// anything the submitted code can provoke.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("template for {language} is missing the {PLACEHOLDER} placeholder")]
    PlaceholderMissing { language: Language },

    #[error("template for {language} contains {count} {PLACEHOLDER} placeholders, expected exactly one")]
    PlaceholderDuplicated { language: Language, count: usize },

    #[error("failed to serialize test inputs: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Final runnable source text for one execution.
#[derive(Debug, Clone)]
pub struct RenderedProgram {
    pub language: Language,
    pub source: String,
}

/// Render the driver for a submission: solution source first, then the
/// language template with the suite's inputs substituted in.
///
/// # Errors
/// Returns a [`TemplateError`] if the template does not carry exactly one
/// placeholder, or if the inputs fail to serialize.
pub fn render(submission: &Submission, suite: &TestSuite) -> Result<RenderedProgram, TemplateError> {
    render_with_template(submission.language.template(), submission, suite)
}

/// Render against an explicit template source, for operator-supplied
/// overrides of the embedded drivers. Same contract as [`render`].
///
/// # Errors
/// See [`render`].
pub fn render_with_template(
    template: &str,
    submission: &Submission,
    suite: &TestSuite,
) -> Result<RenderedProgram, TemplateError> {
    let language = submission.language;

    match template.matches(PLACEHOLDER).count() {
        1 => {}
        0 => return Err(TemplateError::PlaceholderMissing { language }),
        count => return Err(TemplateError::PlaceholderDuplicated { language, count }),
    }

    let inputs = serde_json::to_string(&suite.input_array())?;
    let literal = match language {
        // Read back through a raw triple-quoted string; compact JSON cannot
        // contain `"""`, so string values cannot escape the literal.
        Language::Python => inputs,
        // Re-encoded as a double-quoted string literal for JSON.parse.
        // Embedding the raw array text would let string values containing
        // backticks or `${` escape into source.
        Language::JavaScript => serde_json::to_string(&inputs)?,
    };
    let driver = template.replace(PLACEHOLDER, &literal);

    Ok(RenderedProgram {
        language,
        source: format!("{}\n\n{}", submission.source, driver),
    })
}
