//! Contains all the command handlers that are callable from the front end via IPC.
//!
//! Each function in this module corresponds to a specific `IpcMessage::command`.
//! These handlers are responsible for interacting with the `AppState` and the `core`
//! logic, and for sending `UserEvent`s back to the UI. Anything that needs the
//! file service is delegated to `super::tasks`.

use std::path::Path;
use std::sync::{Arc, Mutex};

use super::events::UserEvent;
use super::helpers::{lock_state, notify, with_state_and_notify};
use super::proxy::EventProxy;
use super::state::{AppState, ViewMode};
use super::tasks::{self, SearchInput};
use crate::backend::FileOpRequest;
use crate::config;
use crate::core::{CopyOptions, CoreError, Debouncer, Entry, SortKey};

/// Asks the service for its host details and opens the starting directory.
pub async fn initialize<P: EventProxy>(proxy: P, state: Arc<Mutex<AppState>>) {
    tracing::info!("Initializing session");
    tasks::initialize(proxy, state).await;
}

/// Opens `path` in the current view mode.
pub async fn navigate<P: EventProxy>(path: String, proxy: P, state: Arc<Mutex<AppState>>) {
    let path = path.trim().to_string();
    if path.is_empty() {
        let error = CoreError::InvalidPath("path must not be empty".to_string());
        proxy.send_event(UserEvent::ShowError(error.user_message()));
        return;
    }
    tasks::load_path(path, proxy, state).await;
}

/// Re-fetches the current directory.
pub async fn refresh<P: EventProxy>(proxy: P, state: Arc<Mutex<AppState>>) {
    let current_path = lock_state(&state).current_path.clone();
    if current_path.is_empty() {
        return;
    }
    tasks::load_path(current_path, proxy, state).await;
}

/// Moves to the parent directory. Does nothing at a root.
pub async fn go_up<P: EventProxy>(proxy: P, state: Arc<Mutex<AppState>>) {
    let parent = {
        let state_guard = lock_state(&state);
        state_guard.path_model.parent(&state_guard.current_path)
    };
    match parent {
        Some(parent) => tasks::load_path(parent, proxy, state).await,
        None => tracing::debug!("Already at a root, ignoring go_up"),
    }
}

/// Jumps to the breadcrumb at `index`.
pub async fn navigate_crumb<P: EventProxy>(index: usize, proxy: P, state: Arc<Mutex<AppState>>) {
    let target = {
        let state_guard = lock_state(&state);
        state_guard
            .path_model
            .breadcrumbs(&state_guard.current_path)
            .into_iter()
            .nth(index)
            .map(|crumb| crumb.path)
    };
    match target {
        Some(path) => tasks::load_path(path, proxy, state).await,
        None => tracing::warn!("No breadcrumb at index {}", index),
    }
}

/// Switches to another root (drive) of the remote host.
pub async fn select_root<P: EventProxy>(root: String, proxy: P, state: Arc<Mutex<AppState>>) {
    let known = lock_state(&state).available_roots.contains(&root);
    if !known {
        tracing::warn!("Selecting unknown root {}", root);
    }
    navigate(root, proxy, state).await;
}

/// Changes the view mode. Entering or leaving the recursive browser reloads
/// the current directory in the shape that mode needs.
pub async fn set_view_mode<P: EventProxy>(mode: ViewMode, proxy: P, state: Arc<Mutex<AppState>>) {
    let reload = {
        let mut state_guard = lock_state(&state);
        let previous = state_guard.view_mode;
        state_guard.view_mode = mode;
        notify(&proxy, &state_guard);
        let reshaped = previous.is_recursive() != mode.is_recursive();
        (reshaped && !state_guard.current_path.is_empty()).then(|| state_guard.current_path.clone())
    };
    if let Some(path) = reload {
        tasks::load_path(path, proxy, state).await;
    }
}

pub async fn expand_node<P: EventProxy>(path: String, proxy: P, state: Arc<Mutex<AppState>>) {
    tasks::expand_node(path, proxy, state).await;
}

pub fn collapse_node<P: EventProxy>(path: String, proxy: P, state: Arc<Mutex<AppState>>) {
    with_state_and_notify(&state, &proxy, |s| s.tree.collapse(&path));
}

/// Sorts by `key`; the active key flips direction, a new key starts ascending.
pub fn request_sort<P: EventProxy>(key: SortKey, proxy: P, state: Arc<Mutex<AppState>>) {
    with_state_and_notify(&state, &proxy, |s| {
        let sort = s.tree.sort_spec().toggled(key);
        tracing::debug!("Sorting by {:?} {:?}", sort.key, sort.direction);
        s.tree.set_sort(sort);
    });
}

/// Search-as-you-type input.
pub fn update_search<P: EventProxy>(query: String, proxy: P, state: Arc<Mutex<AppState>>) {
    tasks::schedule_search(query, SearchInput::Live, proxy, state);
}

/// The explicit search bar.
pub fn submit_search<P: EventProxy>(query: String, proxy: P, state: Arc<Mutex<AppState>>) {
    tasks::schedule_search(query, SearchInput::SearchBar, proxy, state);
}

pub fn clear_search<P: EventProxy>(proxy: P, state: Arc<Mutex<AppState>>) {
    with_state_and_notify(&state, &proxy, AppState::reset_search);
}

/// Opens a search hit: folders are navigated into, files are previewed.
pub async fn select_search_hit<P: EventProxy>(path: String, proxy: P, state: Arc<Mutex<AppState>>) {
    let hit = {
        let state_guard = lock_state(&state);
        state_guard
            .search
            .results()
            .iter()
            .find(|e| e.path == path)
            .cloned()
    };
    match hit {
        Some(entry) if entry.is_folder() => {
            with_state_and_notify(&state, &proxy, AppState::reset_search);
            tasks::load_path(entry.path, proxy, state).await;
        }
        Some(entry) => tasks::load_preview(entry.path, proxy, state).await,
        None => tracing::warn!("{} is not among the search results", path),
    }
}

/// Adds or removes one entry. When only a path is given, the entry is looked
/// up among everything the session has loaded.
pub fn toggle_selection<P: EventProxy>(
    entry: Option<Entry>,
    path: Option<String>,
    selected: bool,
    proxy: P,
    state: Arc<Mutex<AppState>>,
) {
    let mut state_guard = lock_state(&state);
    let entry = entry.or_else(|| path.as_deref().and_then(|p| state_guard.find_entry(p)));
    let Some(entry) = entry else {
        tracing::warn!("Cannot toggle unknown entry {:?}", path);
        proxy.send_event(UserEvent::ShowError(
            CoreError::NotFound(path.unwrap_or_default()).user_message(),
        ));
        return;
    };
    if state_guard.selection.toggle(&entry, selected) {
        tracing::debug!("Selection now holds {} items", state_guard.selection.len());
    }
    notify(&proxy, &state_guard);
}

pub fn clear_selection<P: EventProxy>(proxy: P, state: Arc<Mutex<AppState>>) {
    with_state_and_notify(&state, &proxy, |s| {
        s.selection.clear();
    });
}

/// Opens or closes the copy options panel. It stays closed while nothing is selected.
pub fn toggle_copy_options<P: EventProxy>(proxy: P, state: Arc<Mutex<AppState>>) {
    with_state_and_notify(&state, &proxy, |s| {
        if !s.selection.toggle_options_panel() && s.selection.is_empty() {
            s.status_message = "Select items to configure the copy".to_string();
        }
    });
}

/// Replaces the copy options. `max_depth` is clamped to the supported range.
pub fn update_copy_options<P: EventProxy>(
    options: CopyOptions,
    proxy: P,
    state: Arc<Mutex<AppState>>,
) {
    with_state_and_notify(&state, &proxy, |s| {
        let clamped = options.clamped();
        if clamped.max_depth != options.max_depth {
            tracing::debug!("Clamped depth {} to {}", options.max_depth, clamped.max_depth);
        }
        s.copy_options = clamped;
        s.config.copy_options = clamped;
    });
}

pub async fn copy_structure<P: EventProxy>(proxy: P, state: Arc<Mutex<AppState>>) {
    tasks::copy_structure(proxy, state).await;
}

pub async fn load_preview<P: EventProxy>(path: String, proxy: P, state: Arc<Mutex<AppState>>) {
    tasks::load_preview(path, proxy, state).await;
}

pub async fn file_op<P: EventProxy>(request: FileOpRequest, proxy: P, state: Arc<Mutex<AppState>>) {
    tasks::run_file_op(request, proxy, state).await;
}

/// Persists the current configuration.
pub fn save_config<P: EventProxy>(proxy: P, state: Arc<Mutex<AppState>>) {
    let state_guard = lock_state(&state);
    match config::settings::save_config(&state_guard.config, None) {
        Ok(()) => proxy.send_event(UserEvent::OperationComplete(
            "Configuration saved".to_string(),
        )),
        Err(e) => {
            tracing::warn!("Failed to save config: {}", e);
            proxy.send_event(UserEvent::ShowError(format!("Failed to save config: {e}")));
        }
    }
}

/// Writes the current configuration to `path`.
pub fn export_config<P: EventProxy>(path: &Path, proxy: P, state: Arc<Mutex<AppState>>) {
    let state_guard = lock_state(&state);
    match config::settings::export_config(&state_guard.config, path) {
        Ok(()) => proxy.send_event(UserEvent::OperationComplete(format!(
            "Configuration exported to {}",
            path.display()
        ))),
        Err(e) => proxy.send_event(UserEvent::ShowError(format!("Failed to export config: {e}"))),
    }
}

/// Replaces the configuration with the one stored at `path` and applies its
/// session defaults.
pub fn import_config<P: EventProxy>(path: &Path, proxy: P, state: Arc<Mutex<AppState>>) {
    let new_config = match config::settings::import_config(path) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("Failed to import config from {}: {}", path.display(), e);
            proxy.send_event(UserEvent::ShowError(format!("Failed to import config: {e}")));
            return;
        }
    };

    with_state_and_notify(&state, &proxy, |s| {
        s.reset_search();
        s.copy_options = new_config.copy_options.clamped();
        s.tree.set_sort(new_config.default_sort);
        s.live_search = Debouncer::new(new_config.live_search_delay());
        s.search_bar = Debouncer::new(new_config.search_bar_delay());
        s.config = new_config;
        if let Err(e) = config::settings::save_config(&s.config, None) {
            tracing::warn!("Failed to save imported config: {}", e);
        }
        s.status_message = format!("Configuration imported from {}", path.display());
    });
}
