//! Responsible for transforming the `AppState` into a `UiState` view model.
//!
//! This module acts as a presentation layer: it formats sizes, marks
//! selected rows, flattens the recursive tree into visible rows and
//! decorates search hits with highlighting.

use serde::Serialize;

use super::state::{AppState, ViewMode};
use crate::core::format::{format_date, format_size};
use crate::core::path::Breadcrumb;
use crate::core::search::SearchHit;
use crate::core::tree_store::{FetchStatus, VisibleNode};
use crate::core::{CopyOptions, Entry, EntryKind, Separator, SortSpec};

/// A serializable representation of the session state for the UI.
#[derive(Serialize, Clone, Debug)]
pub struct UiState {
    pub current_path: String,
    pub breadcrumbs: Vec<Breadcrumb>,
    pub can_go_up: bool,
    pub separator: Separator,
    pub available_roots: Vec<String>,
    /// The root the current path lives under, empty before the first load.
    pub current_root: String,
    pub view_mode: ViewMode,
    pub sort: SortSpec,
    pub listing_status: FetchStatus,
    pub folders: Vec<EntryRow>,
    pub files: Vec<EntryRow>,
    /// Visible rows of the recursive browser, depth-first.
    pub tree: Vec<TreeRow>,
    pub search: SearchPanel,
    pub selected_count: usize,
    pub selected_paths: Vec<String>,
    pub options_panel_open: bool,
    pub copy_options: CopyOptions,
    pub is_loading: bool,
    pub is_copying: bool,
    pub status_message: String,
    pub previewed_path: Option<String>,
}

/// One row of the list or grid view.
#[derive(Serialize, Clone, Debug)]
pub struct EntryRow {
    pub name: String,
    pub path: String,
    pub kind: EntryKind,
    /// Human-readable size, files only.
    pub size_label: Option<String>,
    pub modified: String,
    pub is_selected: bool,
}

/// One visible row of the recursive browser.
#[derive(Serialize, Clone, Debug)]
pub struct TreeRow {
    pub depth: usize,
    pub name: String,
    pub path: String,
    pub kind: EntryKind,
    pub size_label: Option<String>,
    pub is_expanded: bool,
    pub is_loading: bool,
    pub error: Option<String>,
    pub is_selected: bool,
}

#[derive(Serialize, Clone, Debug)]
pub struct SearchPanel {
    pub query: String,
    pub is_searching: bool,
    pub hits: Vec<SearchHit>,
}

/// Creates the complete `UiState` from the current `AppState`.
pub fn generate_ui_state(state: &AppState) -> UiState {
    let view = state.tree.view();
    let date_format = state.config.date_format.as_str();
    let row = |entry: &Entry| entry_row(entry, state, date_format);

    UiState {
        current_path: state.current_path.clone(),
        breadcrumbs: state.path_model.breadcrumbs(&state.current_path),
        can_go_up: state.path_model.parent(&state.current_path).is_some(),
        separator: state.path_model.separator(),
        available_roots: state.available_roots.clone(),
        current_root: if state.current_path.is_empty() {
            String::new()
        } else {
            state.path_model.root_of(&state.current_path)
        },
        view_mode: state.view_mode,
        sort: state.tree.sort_spec(),
        listing_status: view.status.clone(),
        folders: view.folders.iter().map(row).collect(),
        files: view.files.iter().map(row).collect(),
        tree: tree_rows(state),
        search: SearchPanel {
            query: state.search.query().to_string(),
            is_searching: state.search.is_searching(),
            hits: state.search.decorated(state.path_model.separator()),
        },
        selected_count: state.selection.len(),
        selected_paths: state
            .selection
            .entries()
            .iter()
            .map(|e| e.path.clone())
            .collect(),
        options_panel_open: state.selection.options_panel_open(),
        copy_options: state.copy_options,
        is_loading: state.is_loading,
        is_copying: state.is_copying,
        status_message: state.status_message.clone(),
        previewed_path: state.previewed_path.clone(),
    }
}

fn size_label(entry: &Entry) -> Option<String> {
    if entry.is_file() {
        entry.size.map(format_size)
    } else {
        None
    }
}

fn entry_row(entry: &Entry, state: &AppState, date_format: &str) -> EntryRow {
    EntryRow {
        name: entry.name.clone(),
        path: entry.path.clone(),
        kind: entry.kind,
        size_label: size_label(entry),
        modified: format_date(&entry.modified_at, date_format),
        is_selected: state.selection.contains(&entry.path),
    }
}

fn tree_rows(state: &AppState) -> Vec<TreeRow> {
    if !state.view_mode.is_recursive() {
        return Vec::new();
    }
    state
        .tree
        .visible_nodes()
        .into_iter()
        .map(|node| match node {
            VisibleNode::Folder {
                depth,
                node,
                expanded,
            } => TreeRow {
                depth,
                name: node.entry.name.clone(),
                path: node.entry.path.clone(),
                kind: EntryKind::Folder,
                size_label: None,
                is_expanded: expanded,
                is_loading: node.status == FetchStatus::Fetching,
                error: match &node.status {
                    FetchStatus::Failed(message) => Some(message.clone()),
                    _ => None,
                },
                is_selected: state.selection.contains(&node.entry.path),
            },
            VisibleNode::File { depth, entry } => TreeRow {
                depth,
                name: entry.name.clone(),
                path: entry.path.clone(),
                kind: EntryKind::File,
                size_label: size_label(entry),
                is_expanded: false,
                is_loading: false,
                error: None,
                is_selected: state.selection.contains(&entry.path),
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::core::{RecursiveFolder, RecursiveListing};
    use crate::utils::test_helpers::{file, folder, listing, MockFileService, RecordingClipboard};
    use std::sync::Arc;

    fn state() -> AppState {
        AppState::new(
            AppConfig::default(),
            Arc::new(MockFileService::new()),
            Arc::new(RecordingClipboard::new()),
        )
    }

    #[test]
    fn rows_carry_size_labels_and_selection() {
        let mut state = state();
        state.apply_listing(listing(
            "/a",
            vec![folder("/a/b")],
            vec![file("/a/f.txt", 2048)],
        ));
        state.selection.toggle(&file("/a/f.txt", 2048), true);

        let ui = generate_ui_state(&state);
        assert_eq!(ui.folders[0].size_label, None);
        assert_eq!(ui.files[0].size_label.as_deref(), Some("2.0 KB"));
        assert_eq!(ui.files[0].modified, "1/15/2024");
        assert!(ui.files[0].is_selected);
        assert!(!ui.folders[0].is_selected);
        assert_eq!(ui.selected_count, 1);
        assert!(ui.can_go_up);
        assert!(ui.tree.is_empty());
    }

    #[test]
    fn breadcrumbs_for_posix_path() {
        let mut state = state();
        state.apply_listing(listing("/srv/data", vec![], vec![]));
        let ui = generate_ui_state(&state);
        let targets: Vec<_> = ui.breadcrumbs.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(targets, vec!["/srv", "/srv/data"]);
        assert_eq!(ui.current_root, "/");
    }

    #[test]
    fn recursive_mode_flattens_visible_tree() {
        let mut state = state();
        state.view_mode = ViewMode::Recursive;
        state.apply_recursive_listing(RecursiveListing {
            path: "/r".into(),
            folders: vec![RecursiveFolder {
                entry: folder("/r/a"),
                items: Some(RecursiveListing {
                    path: "/r/a".into(),
                    folders: vec![],
                    files: vec![file("/r/a/x.txt", 3)],
                }),
            }],
            files: vec![file("/r/top.txt", 7)],
        });

        let ui = generate_ui_state(&state);
        let rows: Vec<(usize, &str)> = ui.tree.iter().map(|r| (r.depth, r.name.as_str())).collect();
        assert_eq!(rows, vec![(0, "a"), (1, "x.txt"), (0, "top.txt")]);
        assert!(ui.tree[0].is_expanded);
    }
}
