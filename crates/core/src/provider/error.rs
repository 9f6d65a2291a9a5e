use thiserror::Error;

/// Errors reported by a cloud provider implementation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("{kind} already exists: {id}")]
    AlreadyExists { kind: &'static str, id: String },

    #[error("{kind} '{id}' is busy: {message}")]
    Conflict {
        kind: &'static str,
        id: String,
        message: String,
    },

    #[error("Request throttled: {0}")]
    Throttled(String),

    #[error("Timed out waiting for {kind} '{id}' to become ready")]
    Timeout { kind: &'static str, id: String },

    #[error("Request failed: {0}")]
    Request(String),
}

impl ProviderError {
    /// True when the provider reports the resource is already in place.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, ProviderError::AlreadyExists { .. })
    }

    /// True when the provider reports the resource is missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::NotFound { .. })
    }
}

/// Result type for provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let error = ProviderError::NotFound {
            kind: "Table",
            id: "explorespeak-vocabulary".to_string(),
        };
        assert_eq!(error.to_string(), "Table not found: explorespeak-vocabulary");
        assert!(error.is_not_found());
        assert!(!error.is_already_exists());
    }

    #[test]
    fn test_conflict_display() {
        let error = ProviderError::Conflict {
            kind: "Function",
            id: "explorespeak-srs".to_string(),
            message: "update in progress".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Function 'explorespeak-srs' is busy: update in progress"
        );
    }

    #[test]
    fn test_timeout_display() {
        let error = ProviderError::Timeout {
            kind: "Table",
            id: "words".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Timed out waiting for Table 'words' to become ready"
        );
    }
}
