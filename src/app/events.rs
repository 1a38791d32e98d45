//! Defines the event and message structures exchanged with the front end.

use serde::Deserialize;

use super::view_model::UiState;
use crate::backend::PreviewData;

/// Events sent from the session to the front end.
#[derive(Debug)]
pub enum UserEvent {
    /// A complete state update to re-render the UI.
    StateUpdate(Box<UiState>),
    /// Content for the preview panel.
    ShowPreview { path: String, preview: PreviewData },
    /// A failure message to be displayed to the user.
    ShowError(String),
    /// A recoverable condition, such as search throttling.
    ShowWarning(String),
    /// The structure text that was written to the clipboard.
    StructureCopied { text: String },
    /// A file operation finished successfully.
    OperationComplete(String),
}

/// A message received from the front end.
#[derive(Deserialize, Debug)]
pub struct IpcMessage {
    /// The name of the command to execute.
    pub command: String,
    /// The payload associated with the command, as a JSON value.
    #[serde(default)]
    pub payload: serde_json::Value,
}
