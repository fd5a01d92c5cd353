//! Row selection tracking

use super::expansion::RowId;
use std::collections::BTreeMap;

/// Whether more than one row may be selected at a time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionMode {
    Single,
    #[default]
    Multi,
}

/// Selected flags keyed by row id
///
/// Only `true` flags are stored; a missing id reads as unselected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    mode: SelectionMode,
    selected: BTreeMap<RowId, bool>,
}

impl SelectionState {
    pub fn new(mode: SelectionMode) -> Self {
        Self {
            mode,
            selected: BTreeMap::new(),
        }
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    /// Flip a row; returns whether it is now selected
    pub fn toggle(&mut self, row_id: &str) -> bool {
        let next = !self.is_selected(row_id);
        self.set(row_id, next);
        next
    }

    /// In single mode, selecting a row replaces the whole map in one step
    pub fn set(&mut self, row_id: &str, selected: bool) {
        match (self.mode, selected) {
            (SelectionMode::Single, true) => {
                self.selected = BTreeMap::from([(row_id.to_string(), true)]);
            }
            (SelectionMode::Multi, true) => {
                self.selected.insert(row_id.to_string(), true);
            }
            (_, false) => {
                self.selected.remove(row_id);
            }
        }
    }

    pub fn is_selected(&self, row_id: &str) -> bool {
        self.selected.get(row_id).copied().unwrap_or(false)
    }

    /// Select every id given; ignored in single mode
    pub fn select_all<'a>(&mut self, row_ids: impl IntoIterator<Item = &'a RowId>) -> bool {
        if self.mode == SelectionMode::Single {
            return false;
        }
        for id in row_ids {
            self.selected.insert(id.clone(), true);
        }
        true
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Selected ids in id order
    pub fn selected_ids(&self) -> Vec<&RowId> {
        self.selected
            .iter()
            .filter(|(_, on)| **on)
            .map(|(id, _)| id)
            .collect()
    }

    pub fn count(&self) -> usize {
        self.selected.values().filter(|&&on| on).count()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    pub fn retain(&mut self, keep: impl Fn(&RowId) -> bool) {
        self.selected.retain(|id, _| keep(id));
    }
}
