//! The contract of the remote file-system service.
//!
//! The session only talks to the remote side through [`FileService`], so the
//! transport can be swapped for an in-memory mock in tests.

pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::path::OsKind;
use crate::core::{CoreError, Entry, Listing, RecursiveListing};

pub use http::HttpFileService;

/// A mutation requested by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum FileOperation {
    /// Creates `new_name` inside the target folder.
    CreateFolder { new_name: String },
    Rename { new_name: String },
    Delete,
    /// Moves the target into the `destination` folder.
    Move { destination: String },
    Copy { destination: String },
}

impl FileOperation {
    /// The name the operation introduces, if any.
    pub fn new_name(&self) -> Option<&str> {
        match self {
            FileOperation::CreateFolder { new_name } | FileOperation::Rename { new_name } => {
                Some(new_name)
            }
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FileOperation::CreateFolder { .. } => "create_folder",
            FileOperation::Rename { .. } => "rename",
            FileOperation::Delete => "delete",
            FileOperation::Move { .. } => "move",
            FileOperation::Copy { .. } => "copy",
        }
    }
}

/// A file operation together with the path it applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileOpRequest {
    pub path: String,
    #[serde(flatten)]
    pub operation: FileOperation,
}

/// Content returned by the preview collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum PreviewData {
    /// Raw image bytes (PNG thumbnail).
    Image(Vec<u8>),
    Text(String),
    Unsupported,
}

/// What the remote side reports about its host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SystemInfo {
    pub default_root_path: String,
    pub os_kind: OsKind,
    pub available_roots: Vec<String>,
}

/// The remote file-system service.
///
/// Every call runs to completion or failure; callers discard superseded
/// results themselves.
#[async_trait]
pub trait FileService: Send + Sync {
    /// One flat level of `path`.
    async fn list(&self, path: &str) -> Result<Listing, CoreError>;

    /// The full subtree below `path`.
    async fn list_recursive(&self, path: &str) -> Result<RecursiveListing, CoreError>;

    /// Entries below `path` whose name contains `query`. May be throttled.
    async fn search(&self, path: &str, query: &str) -> Result<Vec<Entry>, CoreError>;

    async fn preview(&self, path: &str) -> Result<PreviewData, CoreError>;

    async fn file_op(&self, request: &FileOpRequest) -> Result<(), CoreError>;

    async fn system_info(&self) -> Result<SystemInfo, CoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_op_request_is_flat_json() {
        let request: FileOpRequest = serde_json::from_value(serde_json::json!({
            "operation": "rename",
            "path": "/a/old.txt",
            "new_name": "new.txt"
        }))
        .unwrap();
        assert_eq!(request.path, "/a/old.txt");
        assert_eq!(request.operation.new_name(), Some("new.txt"));

        let delete: FileOpRequest =
            serde_json::from_str(r#"{"operation":"delete","path":"/a/x"}"#).unwrap();
        assert_eq!(delete.operation, FileOperation::Delete);
        assert_eq!(delete.operation.label(), "delete");
    }
}
