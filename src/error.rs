//! Error types for taskmirror
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad args, unknown task, invalid config)
//! - 4: Operation failed (I/O, decode, remote store)

use std::path::PathBuf;
use thiserror::Error;

use crate::codec::DecodeError;

/// Exit codes for the taskmirror CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for taskmirror operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Ambiguous task id '{input}': {candidates}")]
    AmbiguousTask { input: String, candidates: String },

    // Operation failures (exit code 4)
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Remote store error: {0}")]
    Remote(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidConfig(_)
            | Error::InvalidArgument(_)
            | Error::TaskNotFound(_)
            | Error::AmbiguousTask { .. } => exit_codes::USER_ERROR,

            Error::Decode(_)
            | Error::Remote(_)
            | Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_)
            | Error::LockFailed(_)
            | Error::OperationFailed(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// Structured details attached to JSON error output, when any.
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::AmbiguousTask { input, candidates } => Some(serde_json::json!({
                "input": input,
                "candidates": candidates.split(", ").collect::<Vec<_>>(),
            })),
            Error::LockFailed(path) => Some(serde_json::json!({
                "path": path.to_string_lossy(),
            })),
            _ => None,
        }
    }
}

/// Result type alias for taskmirror operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_errors_map_to_exit_code_two() {
        assert_eq!(
            Error::TaskNotFound("abc".to_string()).exit_code(),
            exit_codes::USER_ERROR
        );
        assert_eq!(
            Error::InvalidArgument("x".to_string()).exit_code(),
            exit_codes::USER_ERROR
        );
    }

    #[test]
    fn remote_errors_are_operation_failures() {
        let err = Error::Remote("connection refused".to_string());
        assert_eq!(err.exit_code(), exit_codes::OPERATION_FAILED);
        assert!(err.to_string().contains("connection refused"));
        assert!(err.details().is_none());
    }

    #[test]
    fn ambiguous_task_details_list_candidates() {
        let err = Error::AmbiguousTask {
            input: "ab".to_string(),
            candidates: "ab12, ab34".to_string(),
        };
        let details = err.details().expect("details");
        assert_eq!(details["candidates"][1], "ab34");
    }
}
