//! Action enum - everything the grid can be asked to do
//!
//! Components map key events to actions; `App::update` applies them to the
//! table and the UI state.

use gridview::table::FilterValue;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    // ─────────────────────────────────────────────────────────────────────────
    // App Lifecycle
    // ─────────────────────────────────────────────────────────────────────────
    /// Regular tick; drains backend responses
    Tick,
    Resize(u16, u16),
    ForceQuit,

    // ─────────────────────────────────────────────────────────────────────────
    // Cursor
    // ─────────────────────────────────────────────────────────────────────────
    CursorDown,
    CursorUp,
    FocusNextColumn,
    FocusPrevColumn,

    // ─────────────────────────────────────────────────────────────────────────
    // Sorting
    // ─────────────────────────────────────────────────────────────────────────
    /// Cycle the focused column as the only sort key
    ToggleSort,
    /// Cycle the focused column within a multi-column sort
    ToggleMultiSort,
    ClearSorting,

    // ─────────────────────────────────────────────────────────────────────────
    // Pagination
    // ─────────────────────────────────────────────────────────────────────────
    NextPage,
    PrevPage,
    FirstPage,
    LastPage,
    GrowPageSize,
    ShrinkPageSize,

    // ─────────────────────────────────────────────────────────────────────────
    // Filtering
    // ─────────────────────────────────────────────────────────────────────────
    EnterSearchMode,
    ExitSearchMode,
    SearchInput(char),
    SearchBackspace,
    /// Open the filter dialog for the focused column
    OpenFilter,
    SetColumnFilter(String, Option<FilterValue>),
    ClearFilters,

    // ─────────────────────────────────────────────────────────────────────────
    // Rows
    // ─────────────────────────────────────────────────────────────────────────
    ToggleExpansion,
    ExpandAll,
    CollapseAll,
    ToggleSelection,
    SelectPage,
    SelectAllFiltered,
    ClearSelection,
    /// Return every part of the view to its initial state
    ResetView,

    // ─────────────────────────────────────────────────────────────────────────
    // Modals
    // ─────────────────────────────────────────────────────────────────────────
    OpenQuitDialog,
    OpenHelp,
    CloseModal,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Resize(w, h) => write!(f, "Resize({}, {})", w, h),
            Action::SearchInput(c) => write!(f, "SearchInput('{}')", c),
            Action::SetColumnFilter(column, value) => {
                write!(f, "SetColumnFilter({}, {:?})", column, value)
            }
            other => write!(f, "{:?}", other),
        }
    }
}
