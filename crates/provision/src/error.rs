//! Error types for provisioning runs.

use explorespeak_core::manifest::ManifestError;
use explorespeak_core::provider::ProviderError;
use thiserror::Error;

use crate::archive::ArchiveError;

/// Result type alias for the provision crate.
pub type Result<T> = std::result::Result<T, ProvisionError>;

/// Errors that stop a phase. Per-resource failures are recorded in the
/// phase report instead.
#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("Execution role '{role_name}' not found")]
    RoleNotFound { role_name: String },

    #[error("REST API '{api_id}' not found")]
    ApiNotFound { api_id: String },

    #[error("REST API '{api_id}' has no root resource")]
    MissingRootResource { api_id: String },

    #[error("Invalid manifest: {0}")]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("{failures} step(s) failed")]
    Incomplete { failures: usize },

    #[error("Provisioning halted: {reason}")]
    Halted { reason: String },

    #[error("Operation cancelled by user")]
    UserCancelled,

    #[error("Prompt failed: {0}")]
    Prompt(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_not_found_display() {
        let error = ProvisionError::RoleNotFound {
            role_name: "explorespeak-lambda-execution-role".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Execution role 'explorespeak-lambda-execution-role' not found"
        );
    }

    #[test]
    fn test_provider_error_is_transparent() {
        let error: ProvisionError = ProviderError::Request("throttled".to_string()).into();
        assert_eq!(error.to_string(), "Request failed: throttled");
    }
}
