//! Renders selected entries as a box-drawing tree outline.

use super::format::{format_date, format_size};
use super::{CopyOptions, Entry, RecursiveListing};

const FOLDER_COLOR: &str = "\x1b[34m";
const FILE_COLOR: &str = "\x1b[32m";
const RESET_COLOR: &str = "\x1b[0m";

/// Label of the synthetic root used when folders and files are mixed.
pub const SELECTED_ITEMS_LABEL: &str = "Selected Items";

/// One member of the selection, with folder contents already fetched.
#[derive(Debug, Clone)]
pub enum SelectedItem {
    File(Entry),
    Folder(Entry, RecursiveListing),
}

impl SelectedItem {
    pub fn entry(&self) -> &Entry {
        match self {
            SelectedItem::File(entry) | SelectedItem::Folder(entry, _) => entry,
        }
    }
}

/// A folder borrowed from the selection for rendering.
struct FolderNode<'a> {
    name: &'a str,
    entry: Option<&'a Entry>,
    folders: Vec<FolderNode<'a>>,
    files: &'a [Entry],
}

impl<'a> FolderNode<'a> {
    fn from_listing(entry: &'a Entry, listing: Option<&'a RecursiveListing>) -> Self {
        let (folders, files) = match listing {
            Some(listing) => (
                listing
                    .folders
                    .iter()
                    .map(|f| FolderNode::from_listing(&f.entry, f.items.as_ref()))
                    .collect(),
                listing.files.as_slice(),
            ),
            None => (Vec::new(), &[][..]),
        };
        Self {
            name: &entry.name,
            entry: Some(entry),
            folders,
            files,
        }
    }
}

/// Turns a selection into deterministic outline text.
///
/// * only files: one line per file, no connectors;
/// * only folders: one tree per folder, separated by a blank line;
/// * both: a single tree under a synthetic `Selected Items` root holding
///   the folders followed by the files.
///
/// `max_depth` limits how many levels below each root are printed. Deeper
/// descendants are dropped without a marker.
#[derive(Debug, Clone)]
pub struct StructureSerializer {
    options: CopyOptions,
    date_format: String,
}

impl StructureSerializer {
    pub fn new(options: CopyOptions, date_format: impl Into<String>) -> Self {
        Self {
            options: options.clamped(),
            date_format: date_format.into(),
        }
    }

    pub fn options(&self) -> CopyOptions {
        self.options
    }

    pub fn render(&self, items: &[SelectedItem]) -> String {
        let folders: Vec<FolderNode<'_>> = items
            .iter()
            .filter_map(|item| match item {
                SelectedItem::Folder(entry, listing) => {
                    Some(FolderNode::from_listing(entry, Some(listing)))
                }
                SelectedItem::File(_) => None,
            })
            .collect();
        let files: Vec<Entry> = items
            .iter()
            .filter_map(|item| match item {
                SelectedItem::File(entry) => Some(entry.clone()),
                SelectedItem::Folder(..) => None,
            })
            .collect();

        match (folders.is_empty(), files.is_empty()) {
            (true, _) => files
                .iter()
                .map(|file| self.label(file.name.as_str(), Some(file), false))
                .collect::<Vec<_>>()
                .join("\n"),
            (false, true) => folders
                .iter()
                .map(|root| {
                    let mut lines = Vec::new();
                    self.render_root(root, &mut lines);
                    lines.join("\n")
                })
                .collect::<Vec<_>>()
                .join("\n\n"),
            (false, false) => {
                let root = FolderNode {
                    name: SELECTED_ITEMS_LABEL,
                    entry: None,
                    folders,
                    files: &files,
                };
                let mut lines = Vec::new();
                self.render_root(&root, &mut lines);
                lines.join("\n")
            }
        }
    }

    fn render_root(&self, root: &FolderNode<'_>, lines: &mut Vec<String>) {
        lines.push(self.label(root.name, root.entry, true));
        self.render_children(root, "", 1, lines);
    }

    fn render_children(&self, node: &FolderNode<'_>, prefix: &str, depth: usize, lines: &mut Vec<String>) {
        if depth > self.options.max_depth {
            return;
        }
        let total = node.folders.len() + node.files.len();
        let connector = |index: usize| if index + 1 == total { "└── " } else { "├── " };

        for (index, folder) in node.folders.iter().enumerate() {
            let label = self.label(folder.name, folder.entry, true);
            lines.push(format!("{prefix}{}{label}", connector(index)));
            let continuation = if index + 1 == total { "    " } else { "│   " };
            self.render_children(folder, &format!("{prefix}{continuation}"), depth + 1, lines);
        }
        for (offset, file) in node.files.iter().enumerate() {
            let label = self.label(&file.name, Some(file), false);
            lines.push(format!("{prefix}{}{label}", connector(node.folders.len() + offset)));
        }
    }

    fn label(&self, name: &str, entry: Option<&Entry>, is_folder: bool) -> String {
        let mut line = if self.options.use_colors {
            let color = if is_folder { FOLDER_COLOR } else { FILE_COLOR };
            format!("{color}{name}{RESET_COLOR}")
        } else {
            name.to_string()
        };

        let Some(entry) = entry else {
            return line;
        };
        if self.options.include_sizes && !is_folder {
            if let Some(size) = entry.size {
                line.push_str(&format!(" ({})", format_size(size)));
            }
        }
        if self.options.include_dates {
            line.push_str(&format!(" [{}]", format_date(&entry.modified_at, &self.date_format)));
        }
        line
    }
}
