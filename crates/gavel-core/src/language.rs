//! Supported languages and their driver templates
//!
//! Each language carries an embedded driver template that satisfies the same
//! marker-line contract (see [`crate::protocol`]): the template receives the
//! serialized test inputs through the `{{INPUTS}}` placeholder, invokes the
//! user's `solve` once per case, and prints a single tagged result line.

use crate::GavelError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A language the judge can execute submissions in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    JavaScript,
}

impl Language {
    /// All supported languages, in display order.
    pub const ALL: [Self; 2] = [Self::Python, Self::JavaScript];

    /// The driver template source for this language.
    #[must_use]
    pub const fn template(self) -> &'static str {
        match self {
            Self::Python => include_str!("templates/python_driver.py"),
            Self::JavaScript => include_str!("templates/javascript_driver.js"),
        }
    }

    /// Interpreter flag that takes the program source inline.
    #[must_use]
    pub const fn inline_flag(self) -> &'static str {
        match self {
            Self::Python => "-c",
            Self::JavaScript => "-e",
        }
    }

    /// Interpreter arguments that enforce the memory budget inside the
    /// runtime. V8 does not respect address-space rlimits for its heap, so
    /// node gets the budget as a heap cap; CPython needs nothing extra.
    #[must_use]
    pub fn memory_args(self, memory_bytes: u64) -> Vec<String> {
        match self {
            Self::Python => vec![],
            Self::JavaScript => {
                vec![format!("--max-old-space-size={}", memory_bytes / (1024 * 1024))]
            }
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::JavaScript => "javascript",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = GavelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "python" | "py" => Ok(Self::Python),
            "javascript" | "js" | "node" => Ok(Self::JavaScript),
            other => Err(GavelError::Config(format!("unsupported language: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::PLACEHOLDER;

    #[test]
    fn every_template_carries_exactly_one_placeholder() {
        for lang in Language::ALL {
            let count = lang.template().matches(PLACEHOLDER).count();
            assert_eq!(count, 1, "{lang} template");
        }
    }

    #[test]
    fn every_template_prints_the_marker() {
        for lang in Language::ALL {
            assert!(lang.template().contains(crate::protocol::MARKER), "{lang} template");
        }
    }

    #[test]
    fn node_gets_a_heap_cap_python_does_not() {
        assert!(Language::Python.memory_args(256 * 1024 * 1024).is_empty());
        assert_eq!(
            Language::JavaScript.memory_args(256 * 1024 * 1024),
            vec!["--max-old-space-size=256".to_owned()]
        );
    }

    #[test]
    fn aliases_parse() {
        assert_eq!("py".parse::<Language>().unwrap(), Language::Python);
        assert_eq!("node".parse::<Language>().unwrap(), Language::JavaScript);
        assert!("cobol".parse::<Language>().is_err());
    }
}
