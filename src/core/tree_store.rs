//! The materialised part of the remote tree.
//!
//! `TreeStore` holds two things:
//!
//! * the active view: the folders and files of the directory the user is
//!   looking at, sorted by the current [`SortSpec`];
//! * an arena of lazily expanded folder nodes keyed by path, used by the
//!   recursive browser. Parent links are stored as paths, never as pointers.
//!
//! All methods are synchronous transitions. Requests to the remote service are
//! issued by the caller between a `begin_*` and the matching `complete_*` /
//! `fail_*` call.

use serde::Serialize;
use std::collections::{HashMap, HashSet};

use super::sort::sort_entries;
use super::{CoreError, Entry, Listing, RecursiveFolder, RecursiveListing, SortSpec};

/// Fetch lifecycle of a directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum FetchStatus {
    #[default]
    Unfetched,
    Fetching,
    Resolved,
    Failed(String),
}

/// The listing currently shown to the user.
#[derive(Debug, Clone, Default)]
pub struct ActiveView {
    pub path: String,
    pub folders: Vec<Entry>,
    pub files: Vec<Entry>,
    pub status: FetchStatus,
    /// `true` when the view was filled from a recursive snapshot.
    pub recursive: bool,
}

impl ActiveView {
    /// Folders followed by files, the order in which they are rendered.
    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.folders.iter().chain(self.files.iter())
    }

    pub fn find(&self, path: &str) -> Option<&Entry> {
        self.entries().find(|e| e.path == path)
    }
}

/// A folder in the lazily expanded tree.
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub entry: Entry,
    /// Path of the parent node, `None` for top-level folders.
    pub parent: Option<String>,
    /// Set once children have been attached. Never reset.
    pub resolved: bool,
    pub status: FetchStatus,
    /// Paths of child folder nodes, in fetch order.
    pub folders: Vec<String>,
    pub files: Vec<Entry>,
}

impl TreeNode {
    fn unresolved(entry: Entry, parent: Option<String>) -> Self {
        Self {
            entry,
            parent,
            resolved: false,
            status: FetchStatus::Unfetched,
            folders: Vec::new(),
            files: Vec::new(),
        }
    }
}

/// Result of asking the store to expand a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expansion {
    /// Children are already known; no request is needed.
    Cached,
    /// The node moved to `Fetching`; the caller must issue the request.
    Started,
    /// A request for this node is already outstanding.
    InFlight,
}

/// One visible row of the recursive browser.
#[derive(Debug, Clone, Copy)]
pub enum VisibleNode<'a> {
    Folder { depth: usize, node: &'a TreeNode, expanded: bool },
    File { depth: usize, entry: &'a Entry },
}

#[derive(Debug, Default)]
struct TreeRoot {
    path: String,
    folders: Vec<String>,
    files: Vec<Entry>,
}

/// Number of levels opened automatically when a snapshot is loaded.
const AUTO_EXPAND_LEVELS: usize = 2;

#[derive(Debug, Default)]
pub struct TreeStore {
    sort: SortSpec,
    view: ActiveView,
    root: Option<TreeRoot>,
    nodes: HashMap<String, TreeNode>,
    expanded: HashSet<String>,
}

impl TreeStore {
    pub fn new(sort: SortSpec) -> Self {
        Self {
            sort,
            ..Self::default()
        }
    }

    pub fn view(&self) -> &ActiveView {
        &self.view
    }

    pub fn sort_spec(&self) -> SortSpec {
        self.sort
    }

    /// Changes the ordering and re-sorts the active view.
    pub fn set_sort(&mut self, sort: SortSpec) {
        self.sort = sort;
        sort_entries(&mut self.view.folders, sort);
        sort_entries(&mut self.view.files, sort);
    }

    pub fn begin_fetch(&mut self) {
        self.view.status = FetchStatus::Fetching;
    }

    /// Replaces the active view with a flat listing.
    pub fn apply_listing(&mut self, listing: Listing) {
        if listing.path != self.view.path {
            self.clear_tree();
        }
        let mut folders = listing.folders;
        let mut files = listing.files;
        sort_entries(&mut folders, self.sort);
        sort_entries(&mut files, self.sort);

        self.view = ActiveView {
            path: listing.path,
            folders,
            files,
            status: FetchStatus::Resolved,
            recursive: false,
        };
    }

    /// Replaces the active view with the top level of a recursive snapshot
    /// and rebuilds the node arena from it.
    pub fn apply_recursive_listing(&mut self, snapshot: RecursiveListing) {
        self.clear_tree();

        let mut folders = snapshot.folder_entries();
        let mut files = snapshot.files.clone();
        sort_entries(&mut folders, self.sort);
        sort_entries(&mut files, self.sort);

        let mut root = TreeRoot {
            path: snapshot.path.clone(),
            folders: Vec::with_capacity(snapshot.folders.len()),
            files: snapshot.files,
        };
        for folder in snapshot.folders {
            root.folders.push(folder.entry.path.clone());
            self.insert_snapshot(folder, None, 0);
        }

        self.root = Some(root);
        self.view = ActiveView {
            path: snapshot.path,
            folders,
            files,
            status: FetchStatus::Resolved,
            recursive: true,
        };
    }

    fn insert_snapshot(&mut self, folder: RecursiveFolder, parent: Option<String>, depth: usize) {
        let path = folder.entry.path.clone();
        let mut node = TreeNode::unresolved(folder.entry, parent);

        if let Some(items) = folder.items {
            node.resolved = true;
            node.status = FetchStatus::Resolved;
            node.files = items.files;
            for child in items.folders {
                node.folders.push(child.entry.path.clone());
                self.insert_snapshot(child, Some(path.clone()), depth + 1);
            }
            if depth < AUTO_EXPAND_LEVELS {
                self.expanded.insert(path.clone());
            }
        }
        self.nodes.insert(path, node);
    }

    /// Records a failed fetch. The previous view stays untouched.
    pub fn fail_fetch(&mut self, message: impl Into<String>) {
        self.view.status = FetchStatus::Failed(message.into());
    }

    fn clear_tree(&mut self) {
        self.root = None;
        self.nodes.clear();
        self.expanded.clear();
    }

    /// Path of the recursive tree's root, if a snapshot is loaded.
    pub fn tree_root(&self) -> Option<&str> {
        self.root.as_ref().map(|r| r.path.as_str())
    }

    pub fn node(&self, path: &str) -> Option<&TreeNode> {
        self.nodes.get(path)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_expanded(&self, path: &str) -> bool {
        self.expanded.contains(path)
    }

    /// Starts expanding a folder of the recursive tree.
    ///
    /// A resolved node is returned from memory; only unresolved nodes that
    /// are not already being fetched require a request. The node counts as
    /// expanded from here on, so a collapse during the fetch sticks.
    pub fn begin_expand(&mut self, path: &str) -> Result<Expansion, CoreError> {
        let node = self
            .nodes
            .get_mut(path)
            .ok_or_else(|| CoreError::NotFound(path.to_string()))?;

        if node.resolved {
            self.expanded.insert(path.to_string());
            return Ok(Expansion::Cached);
        }
        if node.status == FetchStatus::Fetching {
            return Ok(Expansion::InFlight);
        }
        node.status = FetchStatus::Fetching;
        self.expanded.insert(path.to_string());
        Ok(Expansion::Started)
    }

    /// Attaches one fetched level of children to `path`. The node stays
    /// collapsed if it was collapsed while the fetch was running.
    ///
    /// Child nodes that already exist keep their own resolved children;
    /// children that disappeared are pruned along with their subtrees.
    pub fn complete_expand(&mut self, path: &str, listing: Listing) -> Result<&TreeNode, CoreError> {
        if !self.nodes.contains_key(path) {
            return Err(CoreError::NotFound(path.to_string()));
        }

        let previous: Vec<String> = self.nodes[path].folders.clone();
        let mut child_paths = Vec::with_capacity(listing.folders.len());
        for folder in listing.folders {
            child_paths.push(folder.path.clone());
            self.nodes
                .entry(folder.path.clone())
                .or_insert_with(|| TreeNode::unresolved(folder, Some(path.to_string())));
        }
        for stale in previous.iter().filter(|p| !child_paths.contains(p)) {
            self.prune(stale);
        }

        let node = self
            .nodes
            .get_mut(path)
            .ok_or_else(|| CoreError::NotFound(path.to_string()))?;
        node.folders = child_paths;
        node.files = listing.files;
        node.resolved = true;
        node.status = FetchStatus::Resolved;
        Ok(node)
    }

    /// Records a failed expansion. Previously attached children survive;
    /// a node that never loaded collapses again.
    pub fn fail_expand(&mut self, path: &str, message: impl Into<String>) {
        if let Some(node) = self.nodes.get_mut(path) {
            node.status = FetchStatus::Failed(message.into());
            if !node.resolved {
                self.expanded.remove(path);
            }
        }
    }

    pub fn collapse(&mut self, path: &str) {
        self.expanded.remove(path);
    }

    fn prune(&mut self, path: &str) {
        self.expanded.remove(path);
        if let Some(node) = self.nodes.remove(path) {
            for child in node.folders {
                self.prune(&child);
            }
        }
    }

    /// Depth-first walk of the rows currently visible in the recursive
    /// browser: folders before files at each level, collapsed folders hide
    /// their children.
    pub fn visible_nodes(&self) -> Vec<VisibleNode<'_>> {
        let mut rows = Vec::new();
        if let Some(root) = &self.root {
            self.walk(&root.folders, &root.files, 0, &mut rows);
        }
        rows
    }

    fn walk<'a>(
        &'a self,
        folders: &'a [String],
        files: &'a [Entry],
        depth: usize,
        rows: &mut Vec<VisibleNode<'a>>,
    ) {
        for path in folders {
            let Some(node) = self.nodes.get(path) else {
                continue;
            };
            let expanded = self.expanded.contains(path);
            rows.push(VisibleNode::Folder { depth, node, expanded });
            if expanded && node.resolved {
                self.walk(&node.folders, &node.files, depth + 1, rows);
            }
        }
        for entry in files {
            rows.push(VisibleNode::File { depth, entry });
        }
    }
}
