//! Error types for tasklink
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad args, not signed in, unknown id)
//! - 3: Denied (private/missing task page, ownership rejection)
//! - 4: Operation failed (store IO, lock contention)

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the tasklink CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const DENIED: i32 = 3;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for tasklink operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Not signed in")]
    NotSignedIn,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Comment not found: {0}")]
    CommentNotFound(String),

    // Denied (exit code 3)
    #[error("Access denied: task {0} is missing or private")]
    Denied(String),

    #[error("Not authorized to {action} {id}")]
    NotAuthorized { action: String, id: String },

    // Operation failures (exit code 4)
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
            // User errors
            Error::NotSignedIn
            | Error::InvalidArgument(_)
            | Error::InvalidConfig(_)
            | Error::TaskNotFound(_)
            | Error::CommentNotFound(_) => exit_codes::USER_ERROR,

            // Denied
            Error::Denied(_) | Error::NotAuthorized { .. } => exit_codes::DENIED,

            // Operation failures
            Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_)
            | Error::LockFailed(_)
            | Error::OperationFailed(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// True when the failure is a store write failure rather than a policy
    /// rejection. Engines log these and degrade to "no visible change".
    pub fn is_store_failure(&self) -> bool {
        matches!(
            self,
            Error::Io(_) | Error::Json(_) | Error::LockFailed(_) | Error::OperationFailed(_)
        )
    }

    /// Structured details for JSON error envelopes
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::NotAuthorized { action, id } => Some(serde_json::json!({
                "action": action,
                "id": id,
            })),
            Error::Denied(id) => Some(serde_json::json!({ "id": id })),
            _ => None,
        }
    }
}

/// Result type alias for tasklink operations
pub type Result<T> = std::result::Result<T, Error>;
