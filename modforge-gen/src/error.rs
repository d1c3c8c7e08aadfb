//! Error types for module definitions and code generation
//!
//! Identity and lookup failures, persistence failures and generator failures
//! all surface through [`DefinitionError`].

use std::path::PathBuf;

/// Result alias used throughout the crate
pub type Result<T, E = DefinitionError> = std::result::Result<T, E>;

/// Error type for definition handling and code generation
#[derive(Debug, thiserror::Error)]
pub enum DefinitionError {
    /// A required identity string was empty
    #[error("{field} must not be empty")]
    EmptyIdentity {
        /// Name of the offending attribute
        field: &'static str,
    },

    /// Field name does not match `[A-Za-z_][A-Za-z0-9_]*`
    #[error("invalid field name '{0}'")]
    InvalidFieldName(String),

    /// Strict insert of a field whose name is already present
    #[error("field '{field}' already exists on model '{model}'")]
    DuplicateField {
        /// Model key
        model: String,
        /// Field name
        field: String,
    },

    /// Strict insert of a model whose key is already present
    #[error("model '{0}' already exists")]
    DuplicateModel(String),

    /// Lookup of an absent model key
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// Field type tag outside the closed set
    #[error("unknown field type '{0}'")]
    UnknownFieldType(String),

    /// Neither `module` nor `name` carried a module name
    #[error("module definition has no name")]
    MissingModuleName,

    /// Definition file does not exist
    #[error("definition file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Definition file exists but is not a valid definition document
    #[error("invalid JSON in {}: {source}", path.display())]
    InvalidJson {
        /// File that failed to parse
        path: PathBuf,
        /// Underlying decode error
        #[source]
        source: serde_json::Error,
    },

    /// A definition value has the wrong shape (e.g. a string where a list belongs)
    #[error("malformed definition: {0}")]
    InvalidShape(#[source] serde_json::Error),

    /// Serializing a definition failed
    #[error("failed to encode definition: {0}")]
    Encode(#[source] serde_json::Error),

    /// `save` called without a path and without a known source file
    #[error("no path to save module '{0}' to")]
    NoSavePath(String),

    /// Two discovered definitions declare the same module name
    #[error("duplicate module '{name}' in {}", path.display())]
    DuplicateModule {
        /// Module name
        name: String,
        /// File carrying the second occurrence
        path: PathBuf,
    },

    /// Discovery file pattern is not a valid glob
    #[error("invalid file pattern '{pattern}': {message}")]
    InvalidPattern {
        /// The pattern as given
        pattern: String,
        /// Reason reported by the glob parser
        message: String,
    },

    /// Configuration file could not be parsed
    #[error("invalid configuration in {}: {message}", path.display())]
    Config {
        /// Configuration file
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// A textual argument such as an operator or policy name was not recognized
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Code generation failed
    #[error("code generation error: {0}")]
    CodeGen(String),

    /// File system failure
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DefinitionError {
    /// Whether the error means "the definition file is missing"
    pub fn is_not_found(&self) -> bool {
        matches!(self, DefinitionError::FileNotFound(_))
    }

    /// Whether the error means "the definition file exists but is malformed"
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            DefinitionError::InvalidJson { .. } | DefinitionError::InvalidShape(_)
        )
    }
}

impl From<String> for DefinitionError {
    fn from(s: String) -> Self {
        DefinitionError::CodeGen(s)
    }
}

/// Reject an empty identity string
pub(crate) fn require_non_empty(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(DefinitionError::EmptyIdentity { field });
    }
    Ok(())
}
