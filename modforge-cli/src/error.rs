use modforge_gen::DefinitionError;
use thiserror::Error;

/// Errors surfaced by the command line
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Definition(#[from] DefinitionError),

    #[error("prompt failed: {0}")]
    Prompt(#[from] dialoguer::Error),

    #[error("schema error: {0}")]
    Schema(String),

    #[error("{0}")]
    Usage(String),
}

pub type Result<T> = std::result::Result<T, CliError>;
