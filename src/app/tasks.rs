//! Async work that talks to the file service.
//!
//! Every task follows the same shape: take what it needs from the state under
//! the lock, release the lock, await the service, then re-lock and apply the
//! result only if its request token is still the latest for that slot.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::task::JoinSet;

use super::events::UserEvent;
use super::helpers::{lock_state, notify};
use super::proxy::EventProxy;
use super::state::AppState;
use crate::backend::{FileOpRequest, FileOperation, FileService};
use crate::core::search::SearchLookup;
use crate::core::tree_store::Expansion;
use crate::core::{CoreError, Entry, PathModel, RecursiveListing, SelectedItem, StructureSerializer};

/// Which search input produced a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchInput {
    /// Search-as-you-type.
    Live,
    /// The explicit search bar.
    SearchBar,
}

fn fail_navigation<P: EventProxy>(state: &mut AppState, path: &str, error: &CoreError, proxy: &P) {
    tracing::warn!("Failed to load {}: {}", path, error);
    let message = error.user_message();
    state.tree.fail_fetch(message.clone());
    state.is_loading = false;
    state.status_message = message.clone();
    proxy.send_event(UserEvent::ShowError(message));
}

/// Loads `path` as a flat listing and makes it the active view.
pub async fn fetch_listing<P: EventProxy>(path: String, proxy: P, state: Arc<Mutex<AppState>>) {
    let (token, backend) = {
        let mut state_guard = lock_state(&state);
        let token = state_guard.path_requests.issue();
        state_guard.tree.begin_fetch();
        state_guard.is_loading = true;
        state_guard.status_message = format!("Loading {path}...");
        notify(&proxy, &state_guard);
        (token, Arc::clone(&state_guard.backend))
    };

    tracing::info!("Fetching listing for {}", path);
    let result = backend.list(&path).await;

    let mut state_guard = lock_state(&state);
    if !state_guard.path_requests.is_latest(token) {
        tracing::debug!("Discarding superseded listing for {}", path);
        return;
    }
    match result {
        Ok(listing) => {
            tracing::info!(
                "Loaded {} ({} folders, {} files)",
                listing.path,
                listing.folders.len(),
                listing.files.len()
            );
            state_guard.apply_listing(listing);
        }
        Err(e) => fail_navigation(&mut state_guard, &path, &e, &proxy),
    }
    notify(&proxy, &state_guard);
}

/// Loads the full subtree of `path` and rebuilds the recursive browser.
pub async fn fetch_recursive_listing<P: EventProxy>(
    path: String,
    proxy: P,
    state: Arc<Mutex<AppState>>,
) {
    let (token, backend) = {
        let mut state_guard = lock_state(&state);
        let token = state_guard.path_requests.issue();
        state_guard.tree.begin_fetch();
        state_guard.is_loading = true;
        state_guard.status_message = format!("Loading tree of {path}...");
        notify(&proxy, &state_guard);
        (token, Arc::clone(&state_guard.backend))
    };

    tracing::info!("Fetching recursive listing for {}", path);
    let result = backend.list_recursive(&path).await;

    let mut state_guard = lock_state(&state);
    if !state_guard.path_requests.is_latest(token) {
        tracing::debug!("Discarding superseded tree for {}", path);
        return;
    }
    match result {
        Ok(snapshot) => {
            tracing::info!("Loaded tree of {} ({} entries)", snapshot.path, snapshot.entry_count());
            state_guard.apply_recursive_listing(snapshot);
        }
        Err(e) => fail_navigation(&mut state_guard, &path, &e, &proxy),
    }
    notify(&proxy, &state_guard);
}

/// Loads `path` in the shape the current view mode needs.
pub async fn load_path<P: EventProxy>(path: String, proxy: P, state: Arc<Mutex<AppState>>) {
    let recursive = lock_state(&state).view_mode.is_recursive();
    if recursive {
        fetch_recursive_listing(path, proxy, state).await;
    } else {
        fetch_listing(path, proxy, state).await;
    }
}

/// Expands one folder of the recursive browser, fetching its children only
/// if they are not known yet.
pub async fn expand_node<P: EventProxy>(path: String, proxy: P, state: Arc<Mutex<AppState>>) {
    let backend = {
        let mut state_guard = lock_state(&state);
        match state_guard.tree.begin_expand(&path) {
            Ok(Expansion::Started) => {
                notify(&proxy, &state_guard);
                Arc::clone(&state_guard.backend)
            }
            Ok(Expansion::Cached) => {
                tracing::debug!("{} already resolved, expanding from memory", path);
                notify(&proxy, &state_guard);
                return;
            }
            Ok(Expansion::InFlight) => return,
            Err(e) => {
                proxy.send_event(UserEvent::ShowError(e.user_message()));
                return;
            }
        }
    };

    let result = backend.list(&path).await;

    let mut state_guard = lock_state(&state);
    match result {
        Ok(listing) => {
            if let Err(e) = state_guard.tree.complete_expand(&path, listing) {
                tracing::debug!("Dropping children of {}: {}", path, e);
            }
        }
        Err(e) => {
            tracing::warn!("Failed to expand {}: {}", path, e);
            state_guard.tree.fail_expand(&path, e.user_message());
            proxy.send_event(UserEvent::ShowError(e.user_message()));
        }
    }
    notify(&proxy, &state_guard);
}

/// Records `query` and arms the debouncer of the given input. A blank query
/// clears the results at once.
pub fn schedule_search<P: EventProxy>(
    query: String,
    input: SearchInput,
    proxy: P,
    state: Arc<Mutex<AppState>>,
) {
    let mut state_guard = lock_state(&state);
    state_guard.search.set_query(query.clone());

    if query.trim().is_empty() {
        state_guard.live_search.cancel();
        state_guard.search_bar.cancel();
        state_guard.search_requests.invalidate();
        let path = state_guard.current_path.clone();
        state_guard.search.lookup(&path, &query);
        notify(&proxy, &state_guard);
        return;
    }

    let task = perform_search(query, proxy.clone(), Arc::clone(&state));
    match input {
        SearchInput::Live => state_guard.live_search.schedule(task),
        SearchInput::SearchBar => state_guard.search_bar.schedule(task),
    }
    notify(&proxy, &state_guard);
}

/// Runs `query` against the current directory, answering from the cache
/// when possible.
pub async fn perform_search<P: EventProxy>(query: String, proxy: P, state: Arc<Mutex<AppState>>) {
    let (path, token, backend) = {
        let mut state_guard = lock_state(&state);
        let path = state_guard.current_path.clone();
        match state_guard.search.lookup(&path, &query) {
            SearchLookup::Empty | SearchLookup::Cached(_) => {
                state_guard.search_requests.invalidate();
                notify(&proxy, &state_guard);
                return;
            }
            SearchLookup::Miss => {}
        }
        let token = state_guard.search_requests.issue();
        notify(&proxy, &state_guard);
        (path, token, Arc::clone(&state_guard.backend))
    };

    tracing::info!("Searching {} for {:?}", path, query);
    let result = backend.search(&path, &query).await;

    let mut state_guard = lock_state(&state);
    if !state_guard.search_requests.is_latest(token) {
        tracing::debug!("Discarding superseded results for {:?}", query);
        return;
    }
    match state_guard.search.complete(&path, &query, result) {
        Ok(results) => {
            state_guard.status_message = format!("{} results for \"{}\"", results.len(), query);
        }
        Err(e) if e.is_throttled() => {
            tracing::warn!("Search for {:?} was throttled", query);
            state_guard.status_message = e.user_message();
            proxy.send_event(UserEvent::ShowWarning(e.user_message()));
        }
        Err(e) => {
            tracing::warn!("Search for {:?} failed: {}", query, e);
            proxy.send_event(UserEvent::ShowError(format!(
                "Search failed: {}",
                e.user_message()
            )));
        }
    }
    notify(&proxy, &state_guard);
}

/// Fetches every selected folder in parallel and renders the selection.
///
/// All fetches are awaited. If any of them failed, the whole copy is aborted
/// with one aggregated error and no text is produced.
pub async fn build_structure(
    selected: &[Entry],
    backend: Arc<dyn FileService>,
    serializer: &StructureSerializer,
) -> Result<String, CoreError> {
    let mut fetches = JoinSet::new();
    for (index, entry) in selected.iter().enumerate().filter(|(_, e)| e.is_folder()) {
        let backend = Arc::clone(&backend);
        let path = entry.path.clone();
        fetches.spawn(async move { (index, backend.list_recursive(&path).await) });
    }

    let total = fetches.len();
    let mut snapshots: HashMap<usize, RecursiveListing> = HashMap::with_capacity(total);
    let mut failures: Vec<(usize, String)> = Vec::new();
    while let Some(joined) = fetches.join_next().await {
        match joined {
            Ok((index, Ok(snapshot))) => {
                snapshots.insert(index, snapshot);
            }
            Ok((index, Err(e))) => failures.push((index, e.user_message())),
            Err(e) => failures.push((usize::MAX, CoreError::from(e).user_message())),
        }
    }

    if !failures.is_empty() {
        failures.sort();
        return Err(CoreError::CopyAborted {
            failed: failures.len(),
            total,
            reason: failures.swap_remove(0).1,
        });
    }

    let items: Vec<SelectedItem> = selected
        .iter()
        .enumerate()
        .map(|(index, entry)| match snapshots.remove(&index) {
            Some(snapshot) => SelectedItem::Folder(entry.clone(), snapshot),
            None => SelectedItem::File(entry.clone()),
        })
        .collect();
    Ok(serializer.render(&items))
}

/// Renders the selection and writes it to the clipboard.
pub async fn copy_structure<P: EventProxy>(proxy: P, state: Arc<Mutex<AppState>>) {
    let (selected, backend, serializer, clipboard) = {
        let mut state_guard = lock_state(&state);
        if state_guard.selection.is_empty() {
            proxy.send_event(UserEvent::ShowWarning(
                "No items selected to copy".to_string(),
            ));
            return;
        }
        if state_guard.is_copying {
            tracing::debug!("Structure copy already running");
            return;
        }
        state_guard.is_copying = true;
        state_guard.status_message = "Copying structure...".to_string();
        notify(&proxy, &state_guard);
        (
            state_guard.selection.entries().to_vec(),
            Arc::clone(&state_guard.backend),
            state_guard.serializer(),
            Arc::clone(&state_guard.clipboard),
        )
    };

    tracing::info!("Copying structure of {} selected items", selected.len());
    let outcome = build_structure(&selected, backend, &serializer)
        .await
        .and_then(|text| clipboard.write_text(&text).map(|_| text));

    let mut state_guard = lock_state(&state);
    state_guard.is_copying = false;
    match outcome {
        Ok(text) => {
            tracing::info!("Copied structure ({} lines)", text.lines().count());
            state_guard.status_message = "Copied successfully!".to_string();
            proxy.send_event(UserEvent::StructureCopied { text });
        }
        Err(e) => {
            tracing::error!("Structure copy failed: {}", e);
            state_guard.status_message = e.user_message();
            proxy.send_event(UserEvent::ShowError(e.user_message()));
        }
    }
    notify(&proxy, &state_guard);
}

/// Fetches the preview of a file for the preview panel.
pub async fn load_preview<P: EventProxy>(path: String, proxy: P, state: Arc<Mutex<AppState>>) {
    let backend = {
        let mut state_guard = lock_state(&state);
        state_guard.previewed_path = Some(path.clone());
        Arc::clone(&state_guard.backend)
    };

    let result = backend.preview(&path).await;

    let mut state_guard = lock_state(&state);
    if state_guard.previewed_path.as_deref() != Some(path.as_str()) {
        tracing::debug!("Discarding superseded preview of {}", path);
        return;
    }
    match result {
        Ok(preview) => proxy.send_event(UserEvent::ShowPreview { path, preview }),
        Err(e) => {
            state_guard.previewed_path = None;
            proxy.send_event(UserEvent::ShowError(e.user_message()));
        }
    }
    notify(&proxy, &state_guard);
}

/// Rejects file operations whose names or targets cannot form a path.
pub fn validate_file_op(paths: &PathModel, request: &FileOpRequest) -> Result<(), CoreError> {
    if request.path.trim().is_empty() {
        return Err(CoreError::InvalidPath("path must not be empty".to_string()));
    }
    match &request.operation {
        FileOperation::CreateFolder { new_name } => paths.join(&request.path, new_name).map(|_| ()),
        FileOperation::Rename { new_name } => {
            let base = paths.parent(&request.path).unwrap_or_default();
            paths.join(&base, new_name).map(|_| ())
        }
        FileOperation::Move { destination } | FileOperation::Copy { destination } => {
            if destination.trim().is_empty() {
                Err(CoreError::InvalidPath("destination must not be empty".to_string()))
            } else {
                Ok(())
            }
        }
        FileOperation::Delete => Ok(()),
    }
}

/// Runs a file operation and reloads the current directory on success.
pub async fn run_file_op<P: EventProxy>(
    request: FileOpRequest,
    proxy: P,
    state: Arc<Mutex<AppState>>,
) {
    let (backend, current_path) = {
        let state_guard = lock_state(&state);
        if let Err(e) = validate_file_op(&state_guard.path_model, &request) {
            proxy.send_event(UserEvent::ShowError(e.user_message()));
            return;
        }
        (
            Arc::clone(&state_guard.backend),
            state_guard.current_path.clone(),
        )
    };

    tracing::info!("File operation {} on {}", request.operation.label(), request.path);
    match backend.file_op(&request).await {
        Ok(()) => {
            proxy.send_event(UserEvent::OperationComplete(format!(
                "{} succeeded: {}",
                request.operation.label(),
                request.path
            )));
            load_path(current_path, proxy, state).await;
        }
        Err(e) => {
            tracing::warn!("File operation on {} failed: {}", request.path, e);
            proxy.send_event(UserEvent::ShowError(e.user_message()));
        }
    }
}

/// Asks the service about its host, then opens the starting directory.
pub async fn initialize<P: EventProxy>(proxy: P, state: Arc<Mutex<AppState>>) {
    let backend = Arc::clone(&lock_state(&state).backend);
    let info = backend.system_info().await;

    let start = {
        let mut state_guard = lock_state(&state);
        let default_root = match info {
            Ok(info) => {
                tracing::info!("Remote host: {:?}, root {}", info.os_kind, info.default_root_path);
                state_guard.path_model = PathModel::for_os(info.os_kind);
                state_guard.available_roots = info.available_roots;
                if state_guard.available_roots.is_empty() {
                    state_guard.available_roots.push(info.default_root_path.clone());
                }
                info.default_root_path
            }
            Err(e) => {
                tracing::warn!("System info unavailable ({}), using fallback root", e);
                let fallback = state_guard.config.fallback_root.clone();
                state_guard.available_roots = vec![fallback.clone()];
                fallback
            }
        };
        match &state_guard.config.last_directory {
            Some(last) if state_guard.config.auto_load_last_directory => last.clone(),
            _ => default_root,
        }
    };

    load_path(start, proxy, state).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::PreviewData;
    use crate::config::AppConfig;
    use crate::core::path::Separator;
    use crate::core::tree_store::FetchStatus;
    use crate::core::{CopyOptions, RecursiveFolder};
    use crate::utils::test_helpers::{file, folder, MockFileService, RecordingClipboard};
    use std::time::Duration;
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    fn serializer() -> StructureSerializer {
        StructureSerializer::new(CopyOptions::default(), "%m/%d/%Y")
    }

    fn session(backend: MockFileService) -> (Arc<Mutex<AppState>>, Arc<MockFileService>) {
        let backend = Arc::new(backend);
        let state = AppState::new(
            AppConfig::default(),
            backend.clone(),
            Arc::new(RecordingClipboard::new()),
        );
        (Arc::new(Mutex::new(state)), backend)
    }

    fn drain(rx: &mut UnboundedReceiver<UserEvent>) -> Vec<UserEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn previews(events: &[UserEvent]) -> Vec<(String, PreviewData)> {
        events
            .iter()
            .filter_map(|e| match e {
                UserEvent::ShowPreview { path, preview } => Some((path.clone(), preview.clone())),
                _ => None,
            })
            .collect()
    }

    fn errors(events: &[UserEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|e| match e {
                UserEvent::ShowError(message) => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    fn lazy_tree() -> RecursiveListing {
        RecursiveListing {
            path: "/r".into(),
            folders: vec![RecursiveFolder {
                entry: folder("/r/lazy"),
                items: None,
            }],
            files: vec![],
        }
    }

    #[tokio::test]
    async fn preview_is_sent_for_current_file() {
        let (state, _) = session(
            MockFileService::new().with_preview("/w/notes.txt", PreviewData::Text("hello".into())),
        );
        let (tx, mut rx) = mpsc::unbounded_channel();

        load_preview("/w/notes.txt".into(), tx, state.clone()).await;

        let events = drain(&mut rx);
        assert_eq!(
            previews(&events),
            vec![("/w/notes.txt".to_string(), PreviewData::Text("hello".into()))]
        );
        assert_eq!(state.lock().unwrap().previewed_path.as_deref(), Some("/w/notes.txt"));
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_preview_is_dropped() {
        let (state, _) = session(
            MockFileService::new()
                .with_preview("/w/big.png", PreviewData::Image(vec![0x89, 0x50]))
                .with_preview("/w/small.txt", PreviewData::Text("tiny".into()))
                .with_delay("/w/big.png", Duration::from_millis(400)),
        );
        let (tx, mut rx) = mpsc::unbounded_channel();

        let slow = tokio::spawn(load_preview("/w/big.png".into(), tx.clone(), state.clone()));
        tokio::task::yield_now().await;
        load_preview("/w/small.txt".into(), tx, state.clone()).await;
        slow.await.unwrap();

        let events = drain(&mut rx);
        assert_eq!(
            previews(&events),
            vec![("/w/small.txt".to_string(), PreviewData::Text("tiny".into()))]
        );
        assert_eq!(state.lock().unwrap().previewed_path.as_deref(), Some("/w/small.txt"));
    }

    #[tokio::test]
    async fn failed_preview_clears_previewed_path() {
        let (state, _) = session(
            MockFileService::new()
                .with_preview_error("/w/secret", CoreError::PermissionDenied("/w/secret".into())),
        );
        let (tx, mut rx) = mpsc::unbounded_channel();

        load_preview("/w/secret".into(), tx, state.clone()).await;

        let events = drain(&mut rx);
        assert!(previews(&events).is_empty());
        assert_eq!(errors(&events), vec!["Permission denied: /w/secret"]);
        assert!(state.lock().unwrap().previewed_path.is_none());
    }

    #[tokio::test]
    async fn failed_file_op_reports_and_skips_reload() {
        let (state, backend) = session(
            MockFileService::new()
                .with_file_op_error(CoreError::PermissionDenied("/w/a.txt".into())),
        );
        state.lock().unwrap().current_path = "/w".into();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let request = FileOpRequest {
            path: "/w/a.txt".into(),
            operation: FileOperation::Delete,
        };
        run_file_op(request, tx, state.clone()).await;

        let events = drain(&mut rx);
        assert_eq!(errors(&events), vec!["Permission denied: /w/a.txt"]);
        assert!(!events.iter().any(|e| matches!(e, UserEvent::OperationComplete(_))));
        assert_eq!(backend.list_count("/w"), 0);
        assert_eq!(state.lock().unwrap().current_path, "/w");
    }

    #[tokio::test]
    async fn failed_expansion_marks_node_failed() {
        let (state, backend) = session(
            MockFileService::new()
                .with_list_error("/r/lazy", CoreError::PermissionDenied("/r/lazy".into())),
        );
        state.lock().unwrap().apply_recursive_listing(lazy_tree());
        let (tx, mut rx) = mpsc::unbounded_channel();

        expand_node("/r/lazy".into(), tx, state.clone()).await;

        let events = drain(&mut rx);
        assert_eq!(errors(&events), vec!["Permission denied: /r/lazy"]);
        assert_eq!(backend.list_count("/r/lazy"), 1);
        let state = state.lock().unwrap();
        let node = state.tree.node("/r/lazy").unwrap();
        assert_eq!(node.status, FetchStatus::Failed("Permission denied: /r/lazy".into()));
        assert!(!node.resolved);
        assert!(!state.tree.is_expanded("/r/lazy"));
    }

    #[tokio::test]
    async fn build_structure_keeps_selection_order() {
        let backend = Arc::new(
            MockFileService::new()
                .with_recursive(RecursiveListing {
                    path: "/a/b".into(),
                    folders: vec![RecursiveFolder {
                        entry: folder("/a/b/c"),
                        items: Some(RecursiveListing {
                            path: "/a/b/c".into(),
                            ..Default::default()
                        }),
                    }],
                    files: vec![],
                })
                .with_recursive(RecursiveListing {
                    path: "/a/z".into(),
                    ..Default::default()
                }),
        );
        let text = build_structure(&[folder("/a/z"), folder("/a/b")], backend.clone(), &serializer())
            .await
            .unwrap();
        assert_eq!(text, "z\n\nb\n└── c");
        assert_eq!(backend.recursive_count(), 2);
    }

    #[tokio::test]
    async fn one_failed_fetch_aborts_everything() {
        let backend = Arc::new(
            MockFileService::new()
                .with_recursive(RecursiveListing {
                    path: "/ok".into(),
                    ..Default::default()
                })
                .with_recursive_error("/denied", CoreError::PermissionDenied("/denied".into())),
        );
        let err = build_structure(
            &[folder("/ok"), folder("/denied"), file("/f.txt", 1)],
            backend.clone(),
            &serializer(),
        )
        .await
        .unwrap_err();

        assert_eq!(
            err,
            CoreError::CopyAborted {
                failed: 1,
                total: 2,
                reason: "Permission denied: /denied".into(),
            }
        );
        assert_eq!(backend.recursive_count(), 2);
    }

    #[tokio::test]
    async fn files_only_needs_no_fetch() {
        let backend = Arc::new(MockFileService::new());
        let text = build_structure(&[file("/a/f.txt", 2048)], backend.clone(), &serializer())
            .await
            .unwrap();
        assert_eq!(text, "f.txt (2.0 KB)");
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn file_op_validation() {
        let posix = PathModel::new(Separator::Slash);
        let request = |operation| FileOpRequest {
            path: "/a/old.txt".into(),
            operation,
        };

        assert!(validate_file_op(&posix, &request(FileOperation::Rename { new_name: "new.txt".into() })).is_ok());
        assert!(matches!(
            validate_file_op(&posix, &request(FileOperation::Rename { new_name: "  ".into() })),
            Err(CoreError::InvalidPath(_))
        ));
        assert!(matches!(
            validate_file_op(&posix, &request(FileOperation::CreateFolder { new_name: "x/y".into() })),
            Err(CoreError::InvalidPath(_))
        ));
        assert!(matches!(
            validate_file_op(&posix, &request(FileOperation::Move { destination: "".into() })),
            Err(CoreError::InvalidPath(_))
        ));
        assert!(validate_file_op(&posix, &request(FileOperation::Delete)).is_ok());
    }
}
