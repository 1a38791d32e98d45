//! JSON-over-HTTP transport for [`FileService`].

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use super::{FileOpRequest, FileOperation, FileService, PreviewData, SystemInfo};
use crate::core::path::OsKind;
use crate::core::{CoreError, Entry, Listing, RecursiveListing};

/// Talks to the file service at `base_url`.
///
/// `ureq` is blocking, so each request runs on Tokio's blocking pool.
#[derive(Clone)]
pub struct HttpFileService {
    agent: ureq::Agent,
    base_url: String,
}

impl std::fmt::Debug for HttpFileService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpFileService")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WirePreview {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireSystemInfo {
    default_drive: String,
    os: String,
    #[serde(default)]
    available_drives: Vec<String>,
}

impl HttpFileService {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{endpoint}", self.base_url)
    }

    /// Sends one request on the blocking pool and decodes the JSON answer.
    /// `subject` names the path in error messages.
    async fn request<T>(
        &self,
        method: &'static str,
        endpoint: &str,
        body: Option<Value>,
        subject: String,
    ) -> Result<T, CoreError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let agent = self.agent.clone();
        let url = self.url(endpoint);
        let text = tokio::task::spawn_blocking(move || {
            let request = agent.request(method, &url);
            let response = match body {
                Some(body) => request
                    .set("Content-Type", "application/json")
                    .send_string(&body.to_string()),
                None => request.call(),
            };
            match response {
                Ok(response) => response
                    .into_string()
                    .map_err(|e| CoreError::Transport(e.to_string())),
                Err(ureq::Error::Status(code, response)) => {
                    let body = response.into_string().unwrap_or_default();
                    Err(status_error(code, &body, &subject))
                }
                Err(ureq::Error::Transport(transport)) => {
                    Err(CoreError::Transport(transport.to_string()))
                }
            }
        })
        .await??;

        Ok(serde_json::from_str(&text)?)
    }

    async fn post<T>(&self, endpoint: &str, body: Value, subject: &str) -> Result<T, CoreError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.request("POST", endpoint, Some(body), subject.to_string())
            .await
    }
}

/// Maps a non-2xx response onto the error taxonomy.
pub fn status_error(code: u16, body: &str, subject: &str) -> CoreError {
    match code {
        429 => CoreError::Throttled,
        404 => CoreError::NotFound(subject.to_string()),
        403 => CoreError::PermissionDenied(subject.to_string()),
        _ => {
            let message = serde_json::from_str::<ErrorBody>(body)
                .ok()
                .and_then(|b| b.error)
                .unwrap_or_else(|| format!("Request failed with status {code}"));
            if message.contains("does not exist") {
                CoreError::NotFound(subject.to_string())
            } else {
                CoreError::OperationFailed(message)
            }
        }
    }
}

fn decode_preview(wire: WirePreview) -> Result<PreviewData, CoreError> {
    match (wire.kind.as_str(), wire.data) {
        ("image", Some(data)) => hex::decode(data)
            .map(PreviewData::Image)
            .map_err(|e| CoreError::Decode(format!("invalid image payload: {e}"))),
        ("text", Some(data)) => Ok(PreviewData::Text(data)),
        _ => Ok(PreviewData::Unsupported),
    }
}

/// Endpoint and body for a file operation.
fn file_op_body(request: &FileOpRequest) -> (&'static str, Value) {
    match &request.operation {
        FileOperation::CreateFolder { new_name } | FileOperation::Rename { new_name } => (
            "/api/fileops",
            json!({
                "operation": request.operation.label(),
                "path": request.path,
                "new_name": new_name,
            }),
        ),
        FileOperation::Delete => (
            "/api/fileops",
            json!({ "operation": "delete", "path": request.path }),
        ),
        FileOperation::Move { destination } | FileOperation::Copy { destination } => (
            "/api/files/copy-paste",
            json!({
                "source_paths": [request.path],
                "destination_path": destination,
                "operation": request.operation.label(),
            }),
        ),
    }
}

#[async_trait]
impl FileService for HttpFileService {
    async fn list(&self, path: &str) -> Result<Listing, CoreError> {
        tracing::debug!("POST /api/files {}", path);
        self.post("/api/files", json!({ "path": path }), path).await
    }

    async fn list_recursive(&self, path: &str) -> Result<RecursiveListing, CoreError> {
        tracing::debug!("POST /api/files/recursive {}", path);
        self.post("/api/files/recursive", json!({ "path": path }), path)
            .await
    }

    async fn search(&self, path: &str, query: &str) -> Result<Vec<Entry>, CoreError> {
        tracing::debug!("POST /api/files/search {} {:?}", path, query);
        self.post(
            "/api/files/search",
            json!({ "path": path, "query": query }),
            path,
        )
        .await
    }

    async fn preview(&self, path: &str) -> Result<PreviewData, CoreError> {
        let wire: WirePreview = self.post("/api/preview", json!({ "path": path }), path).await?;
        decode_preview(wire)
    }

    async fn file_op(&self, request: &FileOpRequest) -> Result<(), CoreError> {
        let (endpoint, body) = file_op_body(request);
        tracing::debug!("POST {} {:?}", endpoint, request);
        let _: Value = self.post(endpoint, body, &request.path).await?;
        Ok(())
    }

    async fn system_info(&self) -> Result<SystemInfo, CoreError> {
        let wire: WireSystemInfo = self
            .request("GET", "/api/system/drive", None, "system drive".to_string())
            .await?;
        Ok(SystemInfo {
            default_root_path: wire.default_drive,
            os_kind: OsKind::from_os_name(&wire.os),
            available_roots: wire.available_drives,
        })
    }
}
