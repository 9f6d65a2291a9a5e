//! AWS SDK error mapping.
//!
//! Maps SDK errors to `ProviderError` from `explorespeak_core::provider`
//! using the service error code, so every adapter classifies failures the
//! same way.

use std::fmt::Debug;

use aws_sdk_dynamodb::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use explorespeak_core::provider::ProviderError;

/// Map an SDK error from a read or update call.
///
/// Conflicts mean the resource is busy (an update in progress).
pub fn map_sdk_error<E, R>(err: SdkError<E, R>, kind: &'static str, id: &str) -> ProviderError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: Debug,
{
    let code = err.code().map(str::to_string);
    let message = DisplayErrorContext(&err).to_string();
    classify(code.as_deref(), message, kind, id, ConflictMeaning::Busy)
}

/// Map an SDK error from a create call.
///
/// Conflicts mean the resource is already there.
pub fn map_create_error<E, R>(err: SdkError<E, R>, kind: &'static str, id: &str) -> ProviderError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: Debug,
{
    let code = err.code().map(str::to_string);
    let message = DisplayErrorContext(&err).to_string();
    classify(code.as_deref(), message, kind, id, ConflictMeaning::Exists)
}

/// Map a request builder error.
pub fn map_build_error(err: impl std::fmt::Display) -> ProviderError {
    ProviderError::Request(format!("Invalid request: {}", err))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConflictMeaning {
    Busy,
    Exists,
}

fn classify(
    code: Option<&str>,
    message: String,
    kind: &'static str,
    id: &str,
    conflict: ConflictMeaning,
) -> ProviderError {
    match code {
        Some(
            "ResourceNotFoundException" | "NotFoundException" | "NoSuchEntity"
            | "NoSuchEntityException",
        ) => ProviderError::NotFound {
            kind,
            id: id.to_string(),
        },
        Some("EntityAlreadyExists" | "ResourceAlreadyExistsException") => {
            ProviderError::AlreadyExists {
                kind,
                id: id.to_string(),
            }
        }
        Some("ConflictException" | "ResourceConflictException" | "ResourceInUseException") => {
            match conflict {
                ConflictMeaning::Exists => ProviderError::AlreadyExists {
                    kind,
                    id: id.to_string(),
                },
                ConflictMeaning::Busy => ProviderError::Conflict {
                    kind,
                    id: id.to_string(),
                    message,
                },
            }
        }
        Some(
            "TooManyRequestsException" | "ThrottlingException" | "Throttling"
            | "ProvisionedThroughputExceededException" | "RequestLimitExceeded"
            | "LimitExceededException",
        ) => ProviderError::Throttled(message),
        _ => ProviderError::Request(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn busy(code: &str) -> ProviderError {
        classify(Some(code), "msg".to_string(), "Table", "t", ConflictMeaning::Busy)
    }

    fn create(code: &str) -> ProviderError {
        classify(Some(code), "msg".to_string(), "Table", "t", ConflictMeaning::Exists)
    }

    #[test]
    fn test_not_found_codes() {
        for code in [
            "ResourceNotFoundException",
            "NotFoundException",
            "NoSuchEntity",
        ] {
            assert!(busy(code).is_not_found(), "{code}");
        }
    }

    #[test]
    fn test_conflict_depends_on_call() {
        assert!(create("ResourceInUseException").is_already_exists());
        assert!(create("ConflictException").is_already_exists());
        assert_eq!(
            busy("ResourceConflictException"),
            ProviderError::Conflict {
                kind: "Table",
                id: "t".to_string(),
                message: "msg".to_string(),
            }
        );
    }

    #[test]
    fn test_throttling_codes() {
        assert_eq!(
            busy("TooManyRequestsException"),
            ProviderError::Throttled("msg".to_string())
        );
    }

    #[test]
    fn test_unknown_code_is_request_failure() {
        assert_eq!(
            classify(None, "dispatch failure".to_string(), "Api", "x", ConflictMeaning::Busy),
            ProviderError::Request("dispatch failure".to_string())
        );
    }
}
