//! Table engine
//!
//! [`Table`] owns the column schema, the rows and every piece of view state,
//! and runs the filter, sort and paginate pipeline after each operation.
//! Operations return the recomputed [`RowModel`].
//!
//! A stage built as [`Stage::Delegated`] does not touch its committed state.
//! The requested state is handed to the stage callback and held as pending
//! until the caller supplies rows through [`Table::receive_rows`], at which
//! point it becomes committed. The table renders whatever rows it received
//! last; dropping stale responses is up to the caller.

use super::column::{Column, ColumnSchema};
use super::error::{Result, TableError};
use super::expansion::{ExpansionState, RowId};
use super::filtering::{
    filter_rows, filter_rows_except, normalize_global_filter, FilterPredicateRegistry,
    FilterState, FilterValue, GlobalFilter, INCLUDES_STRING,
};
use super::pagination::{clamp_page_index, page_bounds, page_count, PaginationState};
use super::selection::{SelectionMode, SelectionState};
use super::sorting::{sort_rows, SortState, SortingRegistry};
use super::stage::{FilteringCallbacks, PaginationCallbacks, SortingCallbacks, Stage};
use log::{debug, warn};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Derives a row's identity from the record and its position
pub type RowIdFn<R> = Box<dyn Fn(&R, usize) -> RowId>;

/// Decides whether a row may be selected
pub type RowPredicate<R> = Box<dyn Fn(&R) -> bool>;

// ═══════════════════════════════════════════════════════════════════════════════
// Options & State
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub struct TableOptions {
    pub page_size: usize,
    /// Page sizes a caller may switch to
    pub page_size_options: Vec<usize>,
    pub selection_mode: SelectionMode,
    /// Predicate registry id used for the global search
    pub global_filter_fn: String,
    /// Jump back to the first page whenever filters or sorting change
    pub auto_reset_page_index: bool,
    pub max_multi_sort_columns: Option<usize>,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            page_size: 10,
            page_size_options: vec![10, 20, 50],
            selection_mode: SelectionMode::Multi,
            global_filter_fn: INCLUDES_STRING.to_string(),
            auto_reset_page_index: false,
            max_multi_sort_columns: None,
        }
    }
}

/// State a table starts from, and returns to on reset
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InitialState {
    pub column_filters: FilterState,
    pub global_filter: Option<String>,
    pub sorting: SortState,
    pub page_index: usize,
    pub expanded: Vec<RowId>,
    pub selected: Vec<RowId>,
}

/// Committed view state of a table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableState {
    pub column_filters: FilterState,
    pub global_filter: Option<String>,
    pub sorting: SortState,
    pub pagination: PaginationState,
    pub expanded: ExpansionState,
    pub selection: SelectionState,
}

/// Requested-but-uncommitted state of delegated stages
#[derive(Debug, Default)]
struct PendingRequest {
    column_filters: Option<FilterState>,
    global_filter: Option<Option<String>>,
    sorting: Option<SortState>,
    page_index: Option<usize>,
    page_size: Option<usize>,
}

impl PendingRequest {
    fn is_empty(&self) -> bool {
        self.column_filters.is_none()
            && self.global_filter.is_none()
            && self.sorting.is_none()
            && self.page_index.is_none()
            && self.page_size.is_none()
    }
}

/// Rows supplied from outside, typically one page of a server response
#[derive(Debug, Clone)]
pub struct ExternalRows<R> {
    pub rows: Vec<R>,
    /// Total matching rows on the server, when known
    pub total_rows: Option<usize>,
}

impl<R> ExternalRows<R> {
    pub fn new(rows: Vec<R>) -> Self {
        Self {
            rows,
            total_rows: None,
        }
    }

    pub fn with_total(mut self, total_rows: usize) -> Self {
        self.total_rows = Some(total_rows);
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Row Model
// ═══════════════════════════════════════════════════════════════════════════════

/// Derived pipeline output, as row indices into [`Table::rows`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowModel {
    filtered: Vec<usize>,
    sorted: Vec<usize>,
    page_start: usize,
    page_end: usize,
    page_index: usize,
    page_count: usize,
}

impl RowModel {
    /// Rows passing the filters, in original order
    pub fn filtered_rows(&self) -> &[usize] {
        &self.filtered
    }

    pub fn filtered_count(&self) -> usize {
        self.filtered.len()
    }

    /// Filtered rows in sort order
    pub fn sorted_rows(&self) -> &[usize] {
        &self.sorted
    }

    /// The current row window
    pub fn page_rows(&self) -> &[usize] {
        &self.sorted[self.page_start..self.page_end]
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }
}

/// A row of the current window, ready for rendering
#[derive(Debug)]
pub struct RowView<'a, R> {
    pub index: usize,
    pub id: &'a RowId,
    pub record: &'a R,
    pub expanded: bool,
    pub selected: bool,
}

/// Distinct value of a column with the number of rows holding it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Facet {
    pub value: String,
    pub count: usize,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Builder
// ═══════════════════════════════════════════════════════════════════════════════

pub struct TableBuilder<R> {
    columns: Vec<Column<R>>,
    rows: Vec<R>,
    total_rows: Option<usize>,
    options: TableOptions,
    initial: InitialState,
    filtering: Stage<FilteringCallbacks>,
    sorting: Stage<SortingCallbacks>,
    pagination: Stage<PaginationCallbacks>,
    get_row_id: Option<RowIdFn<R>>,
    can_select_row: Option<RowPredicate<R>>,
    sorting_registry: SortingRegistry,
    filter_registry: FilterPredicateRegistry,
}

impl<R> TableBuilder<R> {
    fn new(columns: Vec<Column<R>>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
            total_rows: None,
            options: TableOptions::default(),
            initial: InitialState::default(),
            filtering: Stage::Local,
            sorting: Stage::Local,
            pagination: Stage::Local,
            get_row_id: None,
            can_select_row: None,
            sorting_registry: SortingRegistry::default(),
            filter_registry: FilterPredicateRegistry::default(),
        }
    }

    pub fn rows(mut self, rows: Vec<R>) -> Self {
        self.rows = rows;
        self
    }

    /// Total row count for the first page of a delegated table
    pub fn total_rows(mut self, total: usize) -> Self {
        self.total_rows = Some(total);
        self
    }

    pub fn options(mut self, options: TableOptions) -> Self {
        self.options = options;
        self
    }

    pub fn initial_state(mut self, initial: InitialState) -> Self {
        self.initial = initial;
        self
    }

    pub fn manual_filtering(mut self, callbacks: FilteringCallbacks) -> Self {
        self.filtering = Stage::Delegated(callbacks);
        self
    }

    pub fn manual_sorting(mut self, callbacks: SortingCallbacks) -> Self {
        self.sorting = Stage::Delegated(callbacks);
        self
    }

    pub fn manual_pagination(mut self, callbacks: PaginationCallbacks) -> Self {
        self.pagination = Stage::Delegated(callbacks);
        self
    }

    pub fn row_id(mut self, f: impl Fn(&R, usize) -> RowId + 'static) -> Self {
        self.get_row_id = Some(Box::new(f));
        self
    }

    pub fn enable_row_selection(mut self, f: impl Fn(&R) -> bool + 'static) -> Self {
        self.can_select_row = Some(Box::new(f));
        self
    }

    pub fn sorting_registry(mut self, registry: SortingRegistry) -> Self {
        self.sorting_registry = registry;
        self
    }

    pub fn filter_registry(mut self, registry: FilterPredicateRegistry) -> Self {
        self.filter_registry = registry;
        self
    }

    pub fn build(self) -> Result<Table<R>> {
        let schema = ColumnSchema::new(self.columns)?;

        let mut options = self.options;
        if options.page_size == 0 {
            return Err(TableError::InvalidPageSize(0));
        }
        if options.page_size_options.contains(&0) {
            return Err(TableError::InvalidPageSize(0));
        }
        if !options.page_size_options.contains(&options.page_size) {
            options.page_size_options.push(options.page_size);
            options.page_size_options.sort_unstable();
        }

        let initial = self.initial;
        let mut column_filters = FilterState::new();
        for (column_id, value) in initial.column_filters.iter() {
            match schema.get(column_id) {
                Some(column) if column.can_filter() => {
                    column_filters.set(column_id.clone(), Some(value.clone()))
                }
                _ => warn!("initial filter on '{}' dropped", column_id),
            }
        }

        let mut expanded = ExpansionState::new();
        expanded.expand_all(&initial.expanded);
        let mut selection = SelectionState::new(options.selection_mode);
        for id in &initial.selected {
            selection.set(id, true);
        }

        let state = TableState {
            column_filters,
            global_filter: normalize_global_filter(initial.global_filter),
            sorting: sanitize_sorting(&schema, initial.sorting),
            pagination: PaginationState::new(initial.page_index, options.page_size),
            expanded,
            selection,
        };

        let mut table = Table {
            schema,
            rows: self.rows,
            row_ids: Vec::new(),
            row_positions: HashMap::new(),
            get_row_id: self.get_row_id,
            can_select_row: self.can_select_row,
            sorting_registry: self.sorting_registry,
            filter_registry: self.filter_registry,
            options,
            filtering: self.filtering,
            sorting: self.sorting,
            pagination: self.pagination,
            initial: state.clone(),
            state,
            pending: PendingRequest::default(),
            external_total: self.total_rows,
            open_filters: BTreeSet::new(),
            model: RowModel::default(),
        };
        table.rebuild_row_ids();
        table.recompute();
        Ok(table)
    }
}

/// Drop sort entries for unknown or unsortable columns
fn sanitize_sorting<R>(schema: &ColumnSchema<R>, mut sorting: SortState) -> SortState {
    sorting.retain(|entry| match schema.get(&entry.column_id) {
        Some(column) if column.enable_sort => true,
        _ => {
            warn!("sort on '{}' dropped; column missing or not sortable", entry.column_id);
            false
        }
    });
    sorting
}

// ═══════════════════════════════════════════════════════════════════════════════
// Table
// ═══════════════════════════════════════════════════════════════════════════════

/// A schema-driven table over records of type `R`
pub struct Table<R> {
    schema: ColumnSchema<R>,
    rows: Vec<R>,
    row_ids: Vec<RowId>,
    row_positions: HashMap<RowId, usize>,
    get_row_id: Option<RowIdFn<R>>,
    can_select_row: Option<RowPredicate<R>>,
    sorting_registry: SortingRegistry,
    filter_registry: FilterPredicateRegistry,
    options: TableOptions,
    filtering: Stage<FilteringCallbacks>,
    sorting: Stage<SortingCallbacks>,
    pagination: Stage<PaginationCallbacks>,
    state: TableState,
    initial: TableState,
    pending: PendingRequest,
    external_total: Option<usize>,
    /// Columns whose filter widget is currently shown
    open_filters: BTreeSet<String>,
    model: RowModel,
}

impl<R> Table<R> {
    pub fn builder(columns: Vec<Column<R>>) -> TableBuilder<R> {
        TableBuilder::new(columns)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn schema(&self) -> &ColumnSchema<R> {
        &self.schema
    }

    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&R> {
        self.rows.get(index)
    }

    pub fn row_id(&self, index: usize) -> Option<&RowId> {
        self.row_ids.get(index)
    }

    pub fn index_of(&self, row_id: &str) -> Option<usize> {
        self.row_positions.get(row_id).copied()
    }

    pub fn options(&self) -> &TableOptions {
        &self.options
    }

    pub fn state(&self) -> &TableState {
        &self.state
    }

    pub fn row_model(&self) -> &RowModel {
        &self.model
    }

    pub fn column_filters(&self) -> &FilterState {
        &self.state.column_filters
    }

    pub fn global_filter(&self) -> Option<&str> {
        self.state.global_filter.as_deref()
    }

    pub fn sorting(&self) -> &SortState {
        &self.state.sorting
    }

    pub fn pagination(&self) -> PaginationState {
        self.state.pagination
    }

    pub fn expansion(&self) -> &ExpansionState {
        &self.state.expanded
    }

    pub fn selection(&self) -> &SelectionState {
        &self.state.selection
    }

    pub fn is_manual_filtering(&self) -> bool {
        self.filtering.is_manual()
    }

    pub fn is_manual_sorting(&self) -> bool {
        self.sorting.is_manual()
    }

    pub fn is_manual_pagination(&self) -> bool {
        self.pagination.is_manual()
    }

    /// Whether a delegated stage is waiting for rows
    pub fn has_pending_request(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Column filters as last requested, committed or not
    pub fn requested_column_filters(&self) -> &FilterState {
        self.pending
            .column_filters
            .as_ref()
            .unwrap_or(&self.state.column_filters)
    }

    pub fn requested_global_filter(&self) -> Option<&str> {
        match &self.pending.global_filter {
            Some(value) => value.as_deref(),
            None => self.state.global_filter.as_deref(),
        }
    }

    pub fn requested_sorting(&self) -> &SortState {
        self.pending.sorting.as_ref().unwrap_or(&self.state.sorting)
    }

    pub fn requested_pagination(&self) -> PaginationState {
        PaginationState {
            page_index: self
                .pending
                .page_index
                .unwrap_or(self.state.pagination.page_index),
            page_size: self
                .pending
                .page_size
                .unwrap_or(self.state.pagination.page_size),
        }
    }

    /// Rows of the current window with their expansion and selection flags
    pub fn page_rows(&self) -> Vec<RowView<'_, R>> {
        self.model
            .page_rows()
            .iter()
            .map(|&index| {
                let id = &self.row_ids[index];
                RowView {
                    index,
                    id,
                    record: &self.rows[index],
                    expanded: self.state.expanded.is_expanded(id),
                    selected: self.state.selection.is_selected(id),
                }
            })
            .collect()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Filtering
    // ─────────────────────────────────────────────────────────────────────────

    /// Set or clear one column's filter
    pub fn set_column_filter(&mut self, column_id: &str, value: Option<FilterValue>) -> &RowModel {
        match self.schema.get(column_id) {
            Some(column) if column.can_filter() => {}
            Some(_) => {
                warn!("column '{}' is not filterable", column_id);
                return &self.model;
            }
            None => {
                warn!("filter on unknown column '{}' ignored", column_id);
                return &self.model;
            }
        }

        let mut next = self.requested_column_filters().clone();
        next.set(column_id, value);
        self.apply_column_filters(next)
    }

    /// Replace every column filter at once; unusable entries are dropped
    pub fn set_column_filters(&mut self, filters: FilterState) -> &RowModel {
        let mut next = FilterState::new();
        for (column_id, value) in filters.iter() {
            if self.schema.get(column_id).is_some_and(|c| c.can_filter()) {
                next.set(column_id.clone(), Some(value.clone()));
            } else {
                warn!("filter on '{}' dropped; column missing or not filterable", column_id);
            }
        }
        self.apply_column_filters(next)
    }

    pub fn reset_column_filters(&mut self) -> &RowModel {
        let initial = self.initial.column_filters.clone();
        self.apply_column_filters(initial)
    }

    fn apply_column_filters(&mut self, next: FilterState) -> &RowModel {
        debug!("column filters -> {:?}", next);
        if let Stage::Delegated(callbacks) = &mut self.filtering {
            (callbacks.on_column_filter_change)(&next);
            self.pending.column_filters = Some(next);
            return &self.model;
        }

        self.state.column_filters = next;
        self.after_view_change();
        &self.model
    }

    /// Set the global search; blank input clears it
    pub fn set_global_filter(&mut self, value: Option<String>) -> &RowModel {
        let next = normalize_global_filter(value);
        debug!("global filter -> {:?}", next);
        if let Stage::Delegated(callbacks) = &mut self.filtering {
            (callbacks.on_global_filter_change)(next.as_deref());
            self.pending.global_filter = Some(next);
            return &self.model;
        }

        self.state.global_filter = next;
        self.after_view_change();
        &self.model
    }

    pub fn reset_global_filter(&mut self) -> &RowModel {
        let initial = self.initial.global_filter.clone();
        self.set_global_filter(initial)
    }

    /// Distinct values of a column over rows passing every other filter
    pub fn column_facets(&self, column_id: &str) -> Vec<Facet> {
        let Some(column) = self.schema.get(column_id) else {
            return Vec::new();
        };

        let indices = if self.filtering.is_manual() {
            (0..self.rows.len()).collect()
        } else {
            let global = self
                .state
                .global_filter
                .as_deref()
                .map(|q| GlobalFilter::new(q).with_fn(&self.options.global_filter_fn));
            filter_rows_except(
                &self.rows,
                &self.schema,
                &self.state.column_filters,
                global,
                &self.filter_registry,
                Some(column_id),
            )
        };

        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for index in indices {
            let value = column.value(&self.rows[index]);
            if !value.is_null() {
                *counts.entry(value.to_text()).or_default() += 1;
            }
        }
        counts
            .into_iter()
            .map(|(value, count)| Facet { value, count })
            .collect()
    }

    /// Show or hide a column's filter widget; returns whether it is open
    pub fn toggle_filter_widget(&mut self, column_id: &str) -> bool {
        if !self.schema.get(column_id).is_some_and(|c| c.can_filter()) {
            return false;
        }
        if self.open_filters.remove(column_id) {
            false
        } else {
            self.open_filters.insert(column_id.to_string());
            true
        }
    }

    pub fn is_filter_widget_open(&self, column_id: &str) -> bool {
        self.open_filters.contains(column_id)
    }

    pub fn open_filter_widgets(&self) -> impl Iterator<Item = &str> {
        self.open_filters.iter().map(String::as_str)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Sorting
    // ─────────────────────────────────────────────────────────────────────────

    /// Replace the sort state; unknown or unsortable columns are dropped
    pub fn set_sorting(&mut self, next: SortState) -> &RowModel {
        let next = sanitize_sorting(&self.schema, next);
        self.apply_sorting(next)
    }

    /// Cycle a column through ascending, descending and unsorted
    pub fn toggle_sorting(&mut self, column_id: &str, multi: bool) -> &RowModel {
        let desc_first = match self.schema.get(column_id) {
            Some(column) if column.enable_sort => column.sort_desc_first,
            _ => {
                warn!("column '{}' is not sortable", column_id);
                return &self.model;
            }
        };
        let next = self.requested_sorting().toggled(
            column_id,
            multi,
            desc_first,
            self.options.max_multi_sort_columns,
        );
        self.apply_sorting(next)
    }

    pub fn clear_sorting(&mut self) -> &RowModel {
        self.apply_sorting(SortState::new())
    }

    pub fn reset_sorting(&mut self) -> &RowModel {
        let initial = self.initial.sorting.clone();
        self.apply_sorting(initial)
    }

    fn apply_sorting(&mut self, next: SortState) -> &RowModel {
        debug!("sorting -> {:?}", next);
        if let Stage::Delegated(callbacks) = &mut self.sorting {
            (callbacks.on_sorting_change)(&next);
            self.pending.sorting = Some(next);
            return &self.model;
        }

        self.state.sorting = next;
        self.after_view_change();
        &self.model
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Pagination
    // ─────────────────────────────────────────────────────────────────────────

    /// Go to a page; out-of-range indices land on the last page
    pub fn set_page_index(&mut self, index: usize) -> &RowModel {
        if self.pagination.is_manual() {
            let requested = self.requested_pagination();
            let index = match self.external_total {
                Some(total) => clamp_page_index(index, page_count(total, requested.page_size)),
                None => index,
            };
            debug!("page index requested -> {}", index);
            self.pending.page_index = Some(index);
            if let Stage::Delegated(callbacks) = &mut self.pagination {
                (callbacks.on_page_change)(index);
            }
            return &self.model;
        }

        let clamped = clamp_page_index(index, self.model.page_count);
        debug!("page index -> {}", clamped);
        self.state.pagination.page_index = clamped;
        self.recompute();
        &self.model
    }

    /// Change the page size; sizes outside the allowed options are ignored
    pub fn set_page_size(&mut self, size: usize) -> &RowModel {
        if !self.options.page_size_options.contains(&size) {
            warn!("page size {} is not one of {:?}", size, self.options.page_size_options);
            return &self.model;
        }

        debug!("page size -> {}", size);
        if let Stage::Delegated(callbacks) = &mut self.pagination {
            (callbacks.on_page_size_change)(size);
            self.pending.page_size = Some(size);
            return &self.model;
        }

        self.state.pagination.page_size = size;
        self.recompute();
        &self.model
    }

    pub fn can_previous_page(&self) -> bool {
        self.requested_pagination().page_index > 0
    }

    pub fn can_next_page(&self) -> bool {
        self.requested_pagination().page_index + 1 < self.model.page_count
    }

    pub fn next_page(&mut self) -> &RowModel {
        if !self.can_next_page() {
            return &self.model;
        }
        let index = self.requested_pagination().page_index + 1;
        self.set_page_index(index)
    }

    pub fn previous_page(&mut self) -> &RowModel {
        if !self.can_previous_page() {
            return &self.model;
        }
        let index = self.requested_pagination().page_index - 1;
        self.set_page_index(index)
    }

    pub fn first_page(&mut self) -> &RowModel {
        self.set_page_index(0)
    }

    pub fn last_page(&mut self) -> &RowModel {
        let last = self.model.page_count.saturating_sub(1);
        self.set_page_index(last)
    }

    pub fn reset_pagination(&mut self) -> &RowModel {
        let initial = self.initial.pagination;
        if self.requested_pagination().page_size != initial.page_size {
            self.set_page_size(initial.page_size);
        }
        self.set_page_index(initial.page_index)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expansion & Selection
    // ─────────────────────────────────────────────────────────────────────────

    pub fn toggle_expansion(&mut self, row_id: &str) -> &RowModel {
        if !self.row_positions.contains_key(row_id) {
            warn!("expansion toggle for unknown row '{}'", row_id);
            return &self.model;
        }
        let expanded = self.state.expanded.toggle(row_id);
        debug!("row '{}' expanded: {}", row_id, expanded);
        &self.model
    }

    /// Expand every row passing the current filters
    pub fn expand_all(&mut self) -> &RowModel {
        let ids = self.model.sorted.iter().map(|&i| &self.row_ids[i]);
        self.state.expanded.expand_all(ids);
        &self.model
    }

    pub fn is_expanded(&self, row_id: &str) -> bool {
        self.state.expanded.is_expanded(row_id)
    }

    pub fn expanded_count(&self) -> usize {
        self.state.expanded.len()
    }

    pub fn collapse_all(&mut self) -> &RowModel {
        self.state.expanded.collapse_all();
        &self.model
    }

    pub fn reset_expansion(&mut self) -> &RowModel {
        self.state.expanded = self.initial.expanded.clone();
        &self.model
    }

    pub fn toggle_selection(&mut self, row_id: &str) -> &RowModel {
        let Some(index) = self.index_of(row_id) else {
            warn!("selection toggle for unknown row '{}'", row_id);
            return &self.model;
        };
        if !self.is_row_selectable(index) {
            return &self.model;
        }
        let selected = self.state.selection.toggle(row_id);
        debug!("row '{}' selected: {}", row_id, selected);
        &self.model
    }

    /// Select every selectable row of the current window
    pub fn select_all_page(&mut self) -> &RowModel {
        let ids = self.selectable_ids(self.model.page_rows());
        self.state.selection.select_all(&ids);
        &self.model
    }

    /// Select every selectable row passing the current filters
    pub fn select_all_filtered(&mut self) -> &RowModel {
        let ids = self.selectable_ids(&self.model.sorted);
        self.state.selection.select_all(&ids);
        &self.model
    }

    pub fn is_selected(&self, row_id: &str) -> bool {
        self.state.selection.is_selected(row_id)
    }

    /// Selected row ids in id order
    pub fn selected_ids(&self) -> Vec<&RowId> {
        self.state.selection.selected_ids()
    }

    pub fn clear_selection(&mut self) -> &RowModel {
        self.state.selection.clear();
        &self.model
    }

    pub fn reset_selection(&mut self) -> &RowModel {
        self.state.selection = self.initial.selection.clone();
        &self.model
    }

    pub fn is_row_selectable(&self, index: usize) -> bool {
        match (&self.can_select_row, self.rows.get(index)) {
            (Some(allowed), Some(row)) => allowed(row),
            (None, Some(_)) => true,
            (_, None) => false,
        }
    }

    fn selectable_ids(&self, indices: &[usize]) -> Vec<RowId> {
        indices
            .iter()
            .filter(|&&i| self.is_row_selectable(i))
            .map(|&i| self.row_ids[i].clone())
            .collect()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Data
    // ─────────────────────────────────────────────────────────────────────────

    /// Replace the rows of a client-side table
    pub fn set_rows(&mut self, rows: Vec<R>) -> &RowModel {
        self.receive_rows(ExternalRows::new(rows))
    }

    /// Accept rows from outside and commit any pending requests
    pub fn receive_rows(&mut self, external: ExternalRows<R>) -> &RowModel {
        debug!(
            "received {} rows (total {:?})",
            external.rows.len(),
            external.total_rows
        );
        self.rows = external.rows;
        self.external_total = external.total_rows;
        self.rebuild_row_ids();

        let pending = std::mem::take(&mut self.pending);
        if let Some(filters) = pending.column_filters {
            self.state.column_filters = filters;
        }
        if let Some(global) = pending.global_filter {
            self.state.global_filter = global;
        }
        if let Some(sorting) = pending.sorting {
            self.state.sorting = sorting;
        }
        if let Some(size) = pending.page_size {
            self.state.pagination.page_size = size;
        }
        if let Some(index) = pending.page_index {
            self.state.pagination.page_index = index;
        }

        // A server that filters or pages sends only part of the data, so
        // flags are forgotten only when the rows given are all the rows
        if !self.filtering.is_manual() && !self.pagination.is_manual() {
            let positions = &self.row_positions;
            self.state.expanded.retain(|id| positions.contains_key(id));
            self.state.selection.retain(|id| positions.contains_key(id));
        }

        self.recompute();
        &self.model
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Pipeline
    // ─────────────────────────────────────────────────────────────────────────

    fn rebuild_row_ids(&mut self) {
        let ids: Vec<RowId> = self
            .rows
            .iter()
            .enumerate()
            .map(|(index, row)| match &self.get_row_id {
                Some(f) => f(row, index),
                None => index.to_string(),
            })
            .collect();

        let mut positions = HashMap::with_capacity(ids.len());
        for (index, id) in ids.iter().enumerate() {
            if positions.contains_key(id) {
                warn!("duplicate row id '{}'; keeping the first", id);
                continue;
            }
            positions.insert(id.clone(), index);
        }

        self.row_ids = ids;
        self.row_positions = positions;
    }

    fn after_view_change(&mut self) {
        if self.options.auto_reset_page_index && !self.pagination.is_manual() {
            self.state.pagination.page_index = 0;
        }
        self.recompute();
    }

    fn recompute(&mut self) {
        let filtered: Vec<usize> = if self.filtering.is_manual() {
            (0..self.rows.len()).collect()
        } else {
            let global = self
                .state
                .global_filter
                .as_deref()
                .map(|q| GlobalFilter::new(q).with_fn(&self.options.global_filter_fn));
            filter_rows(
                &self.rows,
                &self.schema,
                &self.state.column_filters,
                global,
                &self.filter_registry,
            )
        };

        let mut sorted = filtered.clone();
        if !self.sorting.is_manual() {
            sort_rows(
                &self.rows,
                &mut sorted,
                &self.schema,
                &self.state.sorting,
                &self.sorting_registry,
            );
        }

        let size = self.state.pagination.page_size;
        let (page_start, page_end, page_index, pages) = if self.pagination.is_manual() {
            let pages = match self.external_total {
                Some(total) => {
                    let pages = page_count(total, size);
                    self.state.pagination.page_index =
                        clamp_page_index(self.state.pagination.page_index, pages);
                    pages
                }
                None => {
                    let full = !sorted.is_empty() && sorted.len() >= size;
                    self.state.pagination.page_index + 1 + usize::from(full)
                }
            };
            (0, sorted.len(), self.state.pagination.page_index, pages)
        } else {
            self.state.pagination.clamp_to(sorted.len());
            let (start, end, index) = page_bounds(sorted.len(), &self.state.pagination);
            (start, end, index, page_count(sorted.len(), size))
        };

        self.model = RowModel {
            filtered,
            sorted,
            page_start,
            page_end,
            page_index,
            page_count: pages,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::column::FilterOption;
    use crate::table::sorting::{ColumnSort, TEXT};
    use crate::table::value::Value;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Clone)]
    struct Invoice {
        number: u32,
        client: &'static str,
        status: &'static str,
    }

    fn invoices(n: u32) -> Vec<Invoice> {
        (1..=n)
            .map(|number| Invoice {
                number,
                client: if number % 2 == 0 { "Acme" } else { "Globex" },
                status: if number % 3 == 0 { "paid" } else { "open" },
            })
            .collect()
    }

    fn columns() -> Vec<Column<Invoice>> {
        vec![
            Column::new("number", |i: &Invoice| Value::from(i.number)),
            Column::new("client", |i: &Invoice| Value::from(i.client))
                .text_filter()
                .sort_key(TEXT)
                .global_search(true),
            Column::new("status", |i: &Invoice| Value::from(i.status)).select_filter(vec![
                FilterOption::new("open", "Open"),
                FilterOption::new("paid", "Paid"),
            ]),
        ]
    }

    fn table(n: u32) -> Table<Invoice> {
        Table::builder(columns())
            .rows(invoices(n))
            .row_id(|i, _| format!("INV-{}", i.number))
            .build()
            .unwrap()
    }

    fn page_numbers(table: &Table<Invoice>) -> Vec<u32> {
        table.page_rows().iter().map(|r| r.record.number).collect()
    }

    #[test]
    fn test_build_rejects_zero_page_size() {
        let result = Table::builder(columns())
            .options(TableOptions {
                page_size: 0,
                ..Default::default()
            })
            .build();
        assert_eq!(result.err(), Some(TableError::InvalidPageSize(0)));
    }

    #[test]
    fn test_build_adds_page_size_to_options() {
        let table = Table::builder(columns())
            .options(TableOptions {
                page_size: 15,
                ..Default::default()
            })
            .build()
            .unwrap();
        assert_eq!(table.options().page_size_options, vec![10, 15, 20, 50]);
    }

    #[test]
    fn test_filter_then_clamp() {
        let mut table = table(30);
        table.set_page_index(2);
        assert_eq!(table.row_model().page_index(), 2);

        let model = table.set_column_filter("status", Some(FilterValue::text("paid")));
        assert_eq!(model.filtered_count(), 10);
        assert_eq!(model.page_index(), 0);
        assert_eq!(table.pagination().page_index, 0);
    }

    #[test]
    fn test_set_filter_on_unfilterable_column_is_noop() {
        let mut table = table(5);
        table.set_column_filter("number", Some(FilterValue::text("1")));
        assert!(table.column_filters().is_empty());
        table.set_column_filter("ghost", Some(FilterValue::text("1")));
        assert!(table.column_filters().is_empty());
    }

    #[test]
    fn test_page_size_change_reclamps() {
        let mut table = table(25);
        table.set_page_index(2);
        let model = table.set_page_size(20);
        assert_eq!(model.page_count(), 2);
        assert_eq!(model.page_index(), 1);
        assert_eq!(page_numbers(&table), vec![21, 22, 23, 24, 25]);
    }

    #[test]
    fn test_page_size_outside_options_ignored() {
        let mut table = table(25);
        table.set_page_size(7);
        assert_eq!(table.pagination().page_size, 10);
    }

    #[test]
    fn test_navigation_helpers() {
        let mut table = table(25);
        assert!(!table.can_previous_page());
        table.next_page();
        table.next_page();
        assert!(!table.can_next_page());
        table.next_page();
        assert_eq!(table.row_model().page_index(), 2);
        table.first_page();
        assert_eq!(table.row_model().page_index(), 0);
        table.last_page();
        assert_eq!(page_numbers(&table), vec![21, 22, 23, 24, 25]);
        table.previous_page();
        assert_eq!(table.row_model().page_index(), 1);
    }

    #[test]
    fn test_auto_reset_page_index() {
        let mut table = Table::builder(columns())
            .rows(invoices(40))
            .options(TableOptions {
                auto_reset_page_index: true,
                ..Default::default()
            })
            .build()
            .unwrap();
        table.set_page_index(3);
        table.toggle_sorting("client", false);
        assert_eq!(table.row_model().page_index(), 0);
    }

    #[test]
    fn test_expansion_survives_paging_and_filtering() {
        let mut table = table(25);
        table.toggle_expansion("INV-3");
        table.next_page();
        table.set_column_filter("client", Some(FilterValue::text("acme")));
        assert!(table.expansion().is_expanded("INV-3"));

        table.reset_column_filters();
        table.first_page();
        let row = table.page_rows().into_iter().find(|r| r.id == "INV-3").unwrap();
        assert!(row.expanded);
    }

    #[test]
    fn test_unknown_row_toggles_are_ignored() {
        let mut table = table(3);
        table.toggle_expansion("INV-99");
        table.toggle_selection("INV-99");
        assert!(table.expansion().is_empty());
        assert!(table.selection().is_empty());
    }

    #[test]
    fn test_single_selection_mode() {
        let mut table = Table::builder(columns())
            .rows(invoices(5))
            .options(TableOptions {
                selection_mode: SelectionMode::Single,
                ..Default::default()
            })
            .build()
            .unwrap();
        table.toggle_selection("0");
        table.toggle_selection("3");
        assert_eq!(table.selection().selected_ids(), vec!["3"]);
        table.select_all_page();
        assert_eq!(table.selection().count(), 1);
    }

    #[test]
    fn test_row_selection_predicate() {
        let mut table = Table::builder(columns())
            .rows(invoices(6))
            .enable_row_selection(|i: &Invoice| i.status == "open")
            .build()
            .unwrap();
        table.toggle_selection("2");
        assert!(table.selection().is_empty());
        table.select_all_filtered();
        assert_eq!(table.selection().count(), 4);
    }

    #[test]
    fn test_set_rows_prunes_missing_ids() {
        let mut table = table(5);
        table.toggle_expansion("INV-5");
        table.toggle_selection("INV-4");
        table.toggle_selection("INV-1");
        table.set_rows(invoices(3));
        assert!(table.expansion().is_empty());
        assert_eq!(table.selection().selected_ids(), vec!["INV-1"]);
    }

    #[test]
    fn test_column_facets_ignore_own_filter() {
        let mut table = table(12);
        table.set_column_filter("status", Some(FilterValue::text("paid")));
        table.set_column_filter("client", Some(FilterValue::text("acme")));
        let facets = table.column_facets("status");
        assert_eq!(
            facets,
            vec![
                Facet { value: "open".to_string(), count: 4 },
                Facet { value: "paid".to_string(), count: 2 },
            ]
        );
    }

    #[test]
    fn test_filter_widgets() {
        let mut table = table(3);
        assert!(table.toggle_filter_widget("status"));
        assert!(!table.toggle_filter_widget("number"));
        assert!(table.is_filter_widget_open("status"));
        assert_eq!(table.open_filter_widgets().collect::<Vec<_>>(), vec!["status"]);
        assert!(!table.toggle_filter_widget("status"));
    }

    #[test]
    fn test_initial_state_and_resets() {
        let mut table = Table::builder(columns())
            .rows(invoices(20))
            .initial_state(InitialState {
                sorting: SortState::new()
                    .then(ColumnSort::desc("number"))
                    .then(ColumnSort::asc("ghost")),
                global_filter: Some("  ".to_string()),
                page_index: 1,
                ..Default::default()
            })
            .build()
            .unwrap();
        assert_eq!(table.sorting().len(), 1);
        assert_eq!(table.global_filter(), None);
        assert_eq!(page_numbers(&table), vec![10, 9, 8, 7, 6, 5, 4, 3, 2, 1]);

        table.set_sorting(SortState::new());
        table.first_page();
        table.reset_sorting();
        table.reset_pagination();
        assert_eq!(page_numbers(&table), vec![10, 9, 8, 7, 6, 5, 4, 3, 2, 1]);
    }

    #[test]
    fn test_delegated_sorting_waits_for_rows() {
        let requests: Rc<RefCell<Vec<SortState>>> = Rc::default();
        let sink = Rc::clone(&requests);
        let mut table = Table::builder(columns())
            .rows(invoices(3))
            .manual_sorting(SortingCallbacks::new(move |s: &SortState| {
                sink.borrow_mut().push(s.clone())
            }))
            .build()
            .unwrap();

        table.toggle_sorting("number", false);
        table.toggle_sorting("number", false);
        assert_eq!(requests.borrow().len(), 2);
        assert_eq!(
            requests.borrow()[1].entries(),
            &[ColumnSort::desc("number")]
        );
        assert!(table.sorting().is_empty());
        assert!(table.has_pending_request());

        let mut reversed = invoices(3);
        reversed.reverse();
        table.receive_rows(ExternalRows::new(reversed));
        assert!(!table.has_pending_request());
        assert_eq!(table.sorting().entries(), &[ColumnSort::desc("number")]);
        assert_eq!(page_numbers(&table), vec![3, 2, 1]);
    }
}
