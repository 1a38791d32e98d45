//! The multi-select set and the copy-options panel that depends on it.

use std::collections::HashSet;

use super::Entry;

/// A change to the selection state.
#[derive(Debug, Clone)]
pub enum SelectionChange {
    Toggle { entry: Entry, selected: bool },
    Clear,
    ToggleOptionsPanel,
}

/// Selected entries in the order they were picked, identified by path.
///
/// Selections survive navigation, refreshes and view switches, so members may
/// refer to entries that are no longer visible. The options panel can only
/// be open while something is selected.
#[derive(Debug, Default, Clone)]
pub struct Selection {
    entries: Vec<Entry>,
    paths: HashSet<String>,
    options_panel_open: bool,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// The single transition function. Returns `true` if anything changed.
    pub fn apply(&mut self, change: SelectionChange) -> bool {
        let before = (self.paths.len(), self.options_panel_open);
        match change {
            SelectionChange::Toggle { entry, selected: true } => {
                if self.paths.insert(entry.path.clone()) {
                    self.entries.push(entry);
                }
            }
            SelectionChange::Toggle { entry, selected: false } => {
                if self.paths.remove(&entry.path) {
                    self.entries.retain(|e| e.path != entry.path);
                }
            }
            SelectionChange::Clear => {
                self.entries.clear();
                self.paths.clear();
            }
            SelectionChange::ToggleOptionsPanel => {
                self.options_panel_open = !self.options_panel_open;
            }
        }

        if self.paths.is_empty() {
            self.options_panel_open = false;
        }
        before != (self.paths.len(), self.options_panel_open)
    }

    pub fn toggle(&mut self, entry: &Entry, selected: bool) -> bool {
        self.apply(SelectionChange::Toggle {
            entry: entry.clone(),
            selected,
        })
    }

    pub fn clear(&mut self) -> bool {
        self.apply(SelectionChange::Clear)
    }

    /// Opens or closes the options panel. Returns the new state.
    pub fn toggle_options_panel(&mut self) -> bool {
        self.apply(SelectionChange::ToggleOptionsPanel);
        self.options_panel_open
    }

    pub fn options_panel_open(&self) -> bool {
        self.options_panel_open
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }
}
