//! The session controller: shared state, command handlers, async tasks and
//! the view model sent to the front end.

pub mod commands;
pub mod events;
pub mod helpers;
pub mod proxy;
pub mod state;
pub mod tasks;
pub mod view_model;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::backend::FileOpRequest;
use crate::core::{CopyOptions, Entry, SortKey};
use events::{IpcMessage, UserEvent};
use proxy::EventProxy;
use state::{AppState, ViewMode};

#[derive(Deserialize)]
struct PathPayload {
    path: String,
}

#[derive(Deserialize)]
struct QueryPayload {
    query: String,
}

#[derive(Deserialize)]
struct IndexPayload {
    index: usize,
}

#[derive(Deserialize)]
struct RootPayload {
    root: String,
}

#[derive(Deserialize)]
struct ModePayload {
    mode: ViewMode,
}

#[derive(Deserialize)]
struct SortPayload {
    key: SortKey,
}

#[derive(Deserialize)]
struct SelectionPayload {
    #[serde(default)]
    entry: Option<Entry>,
    #[serde(default)]
    path: Option<String>,
    selected: bool,
}

fn parse<T: DeserializeOwned, P: EventProxy>(
    command: &str,
    payload: serde_json::Value,
    proxy: &P,
) -> Option<T> {
    match serde_json::from_value(payload) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Invalid payload for '{}': {}", command, e);
            proxy.send_event(UserEvent::ShowError(format!(
                "Invalid payload for '{command}': {e}"
            )));
            None
        }
    }
}

/// Routes one message to its command handler and waits for it to finish.
pub async fn dispatch<P: EventProxy>(msg: IpcMessage, proxy: P, state: Arc<Mutex<AppState>>) {
    let IpcMessage { command, payload } = msg;
    tracing::debug!("IPC command '{}'", command);

    match command.as_str() {
        "initialize" => commands::initialize(proxy, state).await,
        "navigate" => {
            if let Some(p) = parse::<PathPayload, _>(&command, payload, &proxy) {
                commands::navigate(p.path, proxy, state).await;
            }
        }
        "refresh" => commands::refresh(proxy, state).await,
        "go_up" => commands::go_up(proxy, state).await,
        "navigate_crumb" => {
            if let Some(p) = parse::<IndexPayload, _>(&command, payload, &proxy) {
                commands::navigate_crumb(p.index, proxy, state).await;
            }
        }
        "select_root" => {
            if let Some(p) = parse::<RootPayload, _>(&command, payload, &proxy) {
                commands::select_root(p.root, proxy, state).await;
            }
        }
        "set_view_mode" => {
            if let Some(p) = parse::<ModePayload, _>(&command, payload, &proxy) {
                commands::set_view_mode(p.mode, proxy, state).await;
            }
        }
        "expand_node" => {
            if let Some(p) = parse::<PathPayload, _>(&command, payload, &proxy) {
                commands::expand_node(p.path, proxy, state).await;
            }
        }
        "collapse_node" => {
            if let Some(p) = parse::<PathPayload, _>(&command, payload, &proxy) {
                commands::collapse_node(p.path, proxy, state);
            }
        }
        "request_sort" => {
            if let Some(p) = parse::<SortPayload, _>(&command, payload, &proxy) {
                commands::request_sort(p.key, proxy, state);
            }
        }
        "update_search" => {
            if let Some(p) = parse::<QueryPayload, _>(&command, payload, &proxy) {
                commands::update_search(p.query, proxy, state);
            }
        }
        "submit_search" => {
            if let Some(p) = parse::<QueryPayload, _>(&command, payload, &proxy) {
                commands::submit_search(p.query, proxy, state);
            }
        }
        "clear_search" => commands::clear_search(proxy, state),
        "select_search_hit" => {
            if let Some(p) = parse::<PathPayload, _>(&command, payload, &proxy) {
                commands::select_search_hit(p.path, proxy, state).await;
            }
        }
        "toggle_selection" => {
            if let Some(p) = parse::<SelectionPayload, _>(&command, payload, &proxy) {
                commands::toggle_selection(p.entry, p.path, p.selected, proxy, state);
            }
        }
        "clear_selection" => commands::clear_selection(proxy, state),
        "toggle_copy_options" => commands::toggle_copy_options(proxy, state),
        "update_copy_options" => {
            if let Some(options) = parse::<CopyOptions, _>(&command, payload, &proxy) {
                commands::update_copy_options(options, proxy, state);
            }
        }
        "copy_structure" => commands::copy_structure(proxy, state).await,
        "load_preview" => {
            if let Some(p) = parse::<PathPayload, _>(&command, payload, &proxy) {
                commands::load_preview(p.path, proxy, state).await;
            }
        }
        "file_op" => {
            if let Some(request) = parse::<FileOpRequest, _>(&command, payload, &proxy) {
                commands::file_op(request, proxy, state).await;
            }
        }
        "save_config" => commands::save_config(proxy, state),
        "export_config" => {
            if let Some(p) = parse::<PathPayload, _>(&command, payload, &proxy) {
                commands::export_config(&PathBuf::from(p.path), proxy, state);
            }
        }
        "import_config" => {
            if let Some(p) = parse::<PathPayload, _>(&command, payload, &proxy) {
                commands::import_config(&PathBuf::from(p.path), proxy, state);
            }
        }
        _ => tracing::warn!("Unknown IPC command: {}", command),
    }
}
