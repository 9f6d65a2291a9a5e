use thiserror::Error;

/// Errors found while validating or loading a manifest.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ManifestError {
    #[error("{field} must not be empty")]
    EmptyField { field: &'static str },

    #[error("Duplicate {kind} '{name}'")]
    Duplicate { kind: &'static str, name: String },

    #[error("Table '{table}' uses provisioned capacity with zero units")]
    ZeroCapacity { table: String },

    #[error("Table '{table}' declares key attribute '{attribute}' with conflicting types")]
    ConflictingAttribute { table: String, attribute: String },

    #[error("Function '{function}': {reason}")]
    InvalidFunction { function: String, reason: String },

    #[error("Invalid resource path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("{method} {path} targets undeclared function '{function}'")]
    UnknownFunction {
        method: String,
        path: String,
        function: String,
    },

    #[error("Could not parse manifest: {0}")]
    Parse(String),
}

/// Result type for manifest operations.
pub type Result<T> = std::result::Result<T, ManifestError>;
