//! Expanded-row tracking

use std::collections::BTreeSet;

/// Identity of a row, stable across filtering, sorting and paging
pub type RowId = String;

/// Set of expanded row ids
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpansionState {
    expanded: BTreeSet<RowId>,
}

impl ExpansionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip a row; returns whether it is now expanded
    pub fn toggle(&mut self, row_id: &str) -> bool {
        if self.expanded.remove(row_id) {
            false
        } else {
            self.expanded.insert(row_id.to_string());
            true
        }
    }

    pub fn set(&mut self, row_id: &str, expanded: bool) {
        if expanded {
            self.expanded.insert(row_id.to_string());
        } else {
            self.expanded.remove(row_id);
        }
    }

    pub fn is_expanded(&self, row_id: &str) -> bool {
        self.expanded.contains(row_id)
    }

    pub fn expand_all<'a>(&mut self, row_ids: impl IntoIterator<Item = &'a RowId>) {
        self.expanded.extend(row_ids.into_iter().cloned());
    }

    pub fn collapse_all(&mut self) {
        self.expanded.clear();
    }

    pub fn len(&self) -> usize {
        self.expanded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expanded.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RowId> {
        self.expanded.iter()
    }

    /// Drop ids for which `keep` returns false
    pub fn retain(&mut self, keep: impl Fn(&RowId) -> bool) {
        self.expanded.retain(|id| keep(id));
    }
}
