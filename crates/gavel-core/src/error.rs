//! Error types for gavel-core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GavelError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Template(#[from] crate::template::TemplateError),

    #[error("execution error: {0}")]
    Execution(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("nix error: {0}")]
    Nix(#[from] nix::Error),
}
