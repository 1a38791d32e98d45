//! Ordering of listing entries.

use std::cmp::Ordering;

use super::{Entry, SortDirection, SortKey, SortSpec};

/// Sorts `entries` in place according to `spec`.
///
/// The sort is stable and has no secondary key: entries that compare equal
/// keep the order in which the service returned them.
pub fn sort_entries(entries: &mut [Entry], spec: SortSpec) {
    entries.sort_by(|a, b| {
        let ordering = compare(a, b, spec.key);
        match spec.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
}

/// Returns a sorted copy of `entries`.
pub fn sorted(entries: &[Entry], spec: SortSpec) -> Vec<Entry> {
    let mut copy = entries.to_vec();
    sort_entries(&mut copy, spec);
    copy
}

fn compare(a: &Entry, b: &Entry, key: SortKey) -> Ordering {
    match key {
        SortKey::Name => a.name.cmp(&b.name),
        SortKey::Size => a.size.cmp(&b.size),
        SortKey::ModifiedAt => a.modified_at.cmp(&b.modified_at),
    }
}
