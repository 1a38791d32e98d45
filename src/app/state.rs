//! Defines the central, mutable state of a browsing session.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::backend::FileService;
use crate::config::AppConfig;
use crate::core::path::OsKind;
use crate::core::{
    CopyOptions, Debouncer, Entry, Listing, PathModel, RecursiveListing, RequestSequence,
    SearchEngine, Selection, StructureSerializer, TreeStore,
};
use crate::utils::clipboard::Clipboard;

/// How the current directory is presented.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    #[default]
    List,
    Grid,
    /// Lazily expanded tree backed by a recursive snapshot.
    Recursive,
}

impl ViewMode {
    pub fn is_recursive(self) -> bool {
        self == ViewMode::Recursive
    }
}

/// Holds the complete, mutable state of one session.
///
/// This struct is wrapped in an `Arc<Mutex<...>>` and shared between the
/// command handlers and the async tasks they spawn. The lock is never held
/// across a request to the file service.
pub struct AppState {
    /// The application's configuration settings.
    pub config: AppConfig,
    /// The remote file service.
    pub backend: Arc<dyn FileService>,
    /// Target of structure copies.
    pub clipboard: Arc<dyn Clipboard>,
    /// The directory currently shown.
    pub current_path: String,
    /// Path rules of the remote host, set from system info.
    pub path_model: PathModel,
    pub available_roots: Vec<String>,
    pub view_mode: ViewMode,
    pub tree: TreeStore,
    pub search: SearchEngine,
    /// Debounce for search-as-you-type.
    pub live_search: Debouncer,
    /// Debounce for the explicit search bar.
    pub search_bar: Debouncer,
    /// Latest request for the path view.
    pub path_requests: RequestSequence,
    /// Latest request for the search view.
    pub search_requests: RequestSequence,
    pub selection: Selection,
    pub copy_options: CopyOptions,
    /// The file currently shown in the preview panel.
    pub previewed_path: Option<String>,
    /// `true` while a listing request for the path view is outstanding.
    pub is_loading: bool,
    /// `true` while a structure copy is being prepared.
    pub is_copying: bool,
    pub status_message: String,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        backend: Arc<dyn FileService>,
        clipboard: Arc<dyn Clipboard>,
    ) -> Self {
        Self {
            tree: TreeStore::new(config.default_sort),
            search: SearchEngine::new(config.scope_search_cache_to_path),
            live_search: Debouncer::new(config.live_search_delay()),
            search_bar: Debouncer::new(config.search_bar_delay()),
            copy_options: config.copy_options.clamped(),
            path_model: PathModel::for_os(if cfg!(windows) {
                OsKind::Nt
            } else {
                OsKind::Posix
            }),
            config,
            backend,
            clipboard,
            current_path: String::new(),
            available_roots: Vec::new(),
            view_mode: ViewMode::default(),
            path_requests: RequestSequence::new(),
            search_requests: RequestSequence::new(),
            selection: Selection::new(),
            previewed_path: None,
            is_loading: false,
            is_copying: false,
            status_message: "Ready.".to_string(),
        }
    }

    /// Clears the search view: query, results, pending timers and any
    /// outstanding search request. The result cache survives.
    pub fn reset_search(&mut self) {
        self.search.reset();
        self.live_search.cancel();
        self.search_bar.cancel();
        self.search_requests.invalidate();
    }

    /// Installs a successful flat listing as the active view.
    pub fn apply_listing(&mut self, listing: Listing) {
        let count = listing.folders.len() + listing.files.len();
        self.current_path = listing.path.clone();
        self.tree.apply_listing(listing);
        self.finish_navigation(count);
    }

    /// Installs a successful recursive snapshot as the active view.
    pub fn apply_recursive_listing(&mut self, snapshot: RecursiveListing) {
        let count = snapshot.entry_count();
        self.current_path = snapshot.path.clone();
        self.tree.apply_recursive_listing(snapshot);
        self.finish_navigation(count);
    }

    fn finish_navigation(&mut self, count: usize) {
        self.reset_search();
        self.is_loading = false;
        self.config.last_directory = Some(self.current_path.clone());
        self.status_message = format!("{} items in {}", count, self.current_path);
    }

    /// Looks up an entry by path in everything the session has materialised:
    /// the active view, the search results, the lazy tree and the selection.
    pub fn find_entry(&self, path: &str) -> Option<Entry> {
        if let Some(entry) = self.tree.view().find(path) {
            return Some(entry.clone());
        }
        if let Some(entry) = self.search.results().iter().find(|e| e.path == path) {
            return Some(entry.clone());
        }
        if let Some(node) = self.tree.node(path) {
            return Some(node.entry.clone());
        }
        if let Some(parent) = self.path_model.parent(path) {
            if let Some(entry) = self
                .tree
                .node(&parent)
                .and_then(|node| node.files.iter().find(|e| e.path == path))
            {
                return Some(entry.clone());
            }
        }
        self.selection
            .entries()
            .iter()
            .find(|e| e.path == path)
            .cloned()
    }

    /// The serializer for the current copy options.
    pub fn serializer(&self) -> StructureSerializer {
        StructureSerializer::new(self.copy_options, self.config.date_format.clone())
    }
}
