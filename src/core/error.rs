//! Defines the custom error type for the `core` module.

use thiserror::Error;

/// The primary error type for the `core` module.
///
/// Every failure that can reach the user while browsing the remote tree is
/// expressed as one of these variants. Payloads are plain strings so that
/// errors can be cloned into events and compared in tests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// The path no longer exists on the remote side.
    #[error("Path does not exist: {0}")]
    NotFound(String),

    /// The remote service refused access to the path.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The search endpoint rate-limited the request.
    #[error("Too many requests. Please wait and try again.")]
    Throttled,

    /// A listing, search or file operation failed for any other reason.
    #[error("{0}")]
    OperationFailed(String),

    /// User input that cannot form a valid path or name.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// The host clipboard could not be written.
    #[error("Clipboard unavailable: {0}")]
    ClipboardUnavailable(String),

    /// One or more recursive fetches failed while preparing a structure copy.
    #[error("Error copying structure: {failed} of {total} folder fetches failed ({reason})")]
    CopyAborted {
        failed: usize,
        total: usize,
        reason: String,
    },

    /// The request never produced an HTTP response.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The response body did not match the expected shape.
    #[error("Malformed response: {0}")]
    Decode(String),
}

impl CoreError {
    /// `true` for the rate-limit condition, which must not be cached and is
    /// reported as a warning rather than a failure.
    pub fn is_throttled(&self) -> bool {
        matches!(self, CoreError::Throttled)
    }

    /// The single message shown to the user for this failure.
    pub fn user_message(&self) -> String {
        match self {
            CoreError::Transport(_) | CoreError::Decode(_) => {
                format!("Operation failed: {self}")
            }
            _ => self.to_string(),
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Decode(err.to_string())
    }
}

impl From<tokio::task::JoinError> for CoreError {
    fn from(err: tokio::task::JoinError) -> Self {
        CoreError::OperationFailed(format!("Background task failed: {err}"))
    }
}
