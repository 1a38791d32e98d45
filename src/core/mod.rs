//! Domain types and the client-side navigation engine.
//!
//! Everything in this module is synchronous state: the async orchestration
//! that talks to the remote file service lives in `crate::app::tasks`.

pub mod cache;
pub mod debounce;
pub mod error;
pub mod format;
pub mod path;
pub mod search;
pub mod selection;
pub mod sequence;
pub mod sort;
pub mod tree_generator;
pub mod tree_store;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// Whether an entry is a file or a folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Folder,
}

/// One file-system object as reported by the remote service.
///
/// Identity is the `path`: two entries with the same path compare equal
/// regardless of their other fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Byte count. Only meaningful for files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(rename = "modified")]
    pub modified_at: NaiveDateTime,
}

impl Entry {
    pub fn is_folder(&self) -> bool {
        self.kind == EntryKind::Folder
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for Entry {}

impl Hash for Entry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}

/// The flat, one-level contents of a directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    /// The resolved directory path. May differ from the requested one.
    pub path: String,
    #[serde(default)]
    pub folders: Vec<Entry>,
    #[serde(default)]
    pub files: Vec<Entry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

/// A nested snapshot of a directory and everything below it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecursiveListing {
    pub path: String,
    #[serde(default)]
    pub folders: Vec<RecursiveFolder>,
    #[serde(default)]
    pub files: Vec<Entry>,
}

/// A folder inside a [`RecursiveListing`]. `items` is `None` when the
/// service did not descend into it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecursiveFolder {
    #[serde(flatten)]
    pub entry: Entry,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<RecursiveListing>,
}

impl RecursiveListing {
    /// The top-level folder entries, without their nested contents.
    pub fn folder_entries(&self) -> Vec<Entry> {
        self.folders.iter().map(|f| f.entry.clone()).collect()
    }

    /// Total number of entries in the snapshot, at every depth.
    pub fn entry_count(&self) -> usize {
        self.files.len()
            + self
                .folders
                .iter()
                .map(|f| 1 + f.items.as_ref().map_or(0, RecursiveListing::entry_count))
                .sum::<usize>()
    }
}

/// The field a listing is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    Name,
    Size,
    ModifiedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Ordering applied independently to the folders and the files of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            key: SortKey::Name,
            direction: SortDirection::Asc,
        }
    }
}

impl SortSpec {
    /// The spec that results from the user clicking a column header:
    /// the active key flips direction, any other key starts ascending.
    pub fn toggled(self, key: SortKey) -> Self {
        let direction = if self.key == key && self.direction == SortDirection::Asc {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        };
        Self { key, direction }
    }
}

/// Rendering options for the structure export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CopyOptions {
    pub max_depth: usize,
    pub include_sizes: bool,
    pub include_dates: bool,
    pub use_colors: bool,
}

impl CopyOptions {
    pub const MIN_DEPTH: usize = 1;
    pub const MAX_DEPTH: usize = 10;

    /// Returns a copy with `max_depth` forced into the supported range.
    pub fn clamped(self) -> Self {
        Self {
            max_depth: self.max_depth.clamp(Self::MIN_DEPTH, Self::MAX_DEPTH),
            ..self
        }
    }
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            max_depth: 3,
            include_sizes: true,
            include_dates: false,
            use_colors: false,
        }
    }
}

pub use cache::ListingCache;
pub use debounce::Debouncer;
pub use error::CoreError;
pub use path::{PathModel, Separator};
pub use search::SearchEngine;
pub use selection::Selection;
pub use sequence::{RequestSequence, RequestToken};
pub use tree_generator::{SelectedItem, StructureSerializer};
pub use tree_store::TreeStore;
