//! Local vs delegated pipeline stages
//!
//! Each stage of a table is chosen once, at construction. A local stage
//! computes its result in memory. A delegated stage forwards requested state
//! to the caller and trusts whatever rows come back.

use super::filtering::FilterState;
use super::sorting::SortState;

/// How a stage runs
pub enum Stage<C> {
    Local,
    Delegated(C),
}

impl<C> Default for Stage<C> {
    fn default() -> Self {
        Stage::Local
    }
}

impl<C> Stage<C> {
    pub fn is_manual(&self) -> bool {
        matches!(self, Stage::Delegated(_))
    }
}

/// Receives filter requests when filtering is delegated
pub struct FilteringCallbacks {
    pub on_column_filter_change: Box<dyn FnMut(&FilterState)>,
    pub on_global_filter_change: Box<dyn FnMut(Option<&str>)>,
}

impl FilteringCallbacks {
    pub fn new(
        on_column_filter_change: impl FnMut(&FilterState) + 'static,
        on_global_filter_change: impl FnMut(Option<&str>) + 'static,
    ) -> Self {
        Self {
            on_column_filter_change: Box::new(on_column_filter_change),
            on_global_filter_change: Box::new(on_global_filter_change),
        }
    }
}

/// Receives sort requests when sorting is delegated
pub struct SortingCallbacks {
    pub on_sorting_change: Box<dyn FnMut(&SortState)>,
}

impl SortingCallbacks {
    pub fn new(on_sorting_change: impl FnMut(&SortState) + 'static) -> Self {
        Self {
            on_sorting_change: Box::new(on_sorting_change),
        }
    }
}

/// Receives page requests when pagination is delegated
pub struct PaginationCallbacks {
    pub on_page_change: Box<dyn FnMut(usize)>,
    pub on_page_size_change: Box<dyn FnMut(usize)>,
}

impl PaginationCallbacks {
    pub fn new(
        on_page_change: impl FnMut(usize) + 'static,
        on_page_size_change: impl FnMut(usize) + 'static,
    ) -> Self {
        Self {
            on_page_change: Box::new(on_page_change),
            on_page_size_change: Box::new(on_page_size_change),
        }
    }
}
