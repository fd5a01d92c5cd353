//! Column schema
//!
//! A column describes how to read one value out of a record and which
//! registry entries apply to it. The schema is static for the lifetime of a
//! table.

use super::error::{Result, TableError};
use super::filtering::{EQUALS, INCLUDES_STRING};
use super::value::Value;
use log::warn;
use std::collections::HashMap;
use std::fmt;

/// Reads a cell value out of a record
pub type Accessor<R> = Box<dyn Fn(&R) -> Value>;

/// Turns a cell value into display text
pub type Formatter = Box<dyn Fn(&Value) -> String>;

/// Which filter widget a column offers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterVariant {
    Text,
    Select,
}

/// One choice of a select filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOption {
    pub value: String,
    pub label: String,
}

impl FilterOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Width constraints for a column, in character cells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeBounds {
    pub min: u16,
    pub pref: u16,
    pub max: u16,
}

impl Default for SizeBounds {
    fn default() -> Self {
        Self {
            min: 4,
            pref: 12,
            max: 40,
        }
    }
}

impl SizeBounds {
    /// Build bounds, reordering them so that `min <= pref <= max` holds
    pub fn new(min: u16, pref: u16, max: u16) -> Self {
        let max = max.max(min);
        Self {
            min,
            pref: pref.clamp(min, max),
            max,
        }
    }

    pub fn clamp(&self, width: u16) -> u16 {
        width.clamp(self.min, self.max)
    }
}

/// Static description of a single column
pub struct Column<R> {
    pub id: String,
    pub header: String,
    accessor: Accessor<R>,
    formatter: Option<Formatter>,
    pub filter_variant: Option<FilterVariant>,
    pub filter_options: Vec<FilterOption>,
    /// Predicate registry id used by text filters
    pub filter_fn: Option<String>,
    /// Comparator registry id; `None` picks one from the data
    pub sort_key: Option<String>,
    pub enable_filter: bool,
    pub enable_sort: bool,
    pub enable_global_filter: bool,
    pub sort_desc_first: bool,
    pub size: SizeBounds,
}

impl<R> Column<R> {
    pub fn new(id: impl Into<String>, accessor: impl Fn(&R) -> Value + 'static) -> Self {
        let id = id.into();
        Self {
            header: id.clone(),
            id,
            accessor: Box::new(accessor),
            formatter: None,
            filter_variant: None,
            filter_options: Vec::new(),
            filter_fn: None,
            sort_key: None,
            enable_filter: true,
            enable_sort: true,
            enable_global_filter: false,
            sort_desc_first: false,
            size: SizeBounds::default(),
        }
    }

    pub fn header(mut self, header: impl Into<String>) -> Self {
        self.header = header.into();
        self
    }

    pub fn text_filter(mut self) -> Self {
        self.filter_variant = Some(FilterVariant::Text);
        self
    }

    pub fn select_filter(mut self, options: Vec<FilterOption>) -> Self {
        self.filter_variant = Some(FilterVariant::Select);
        self.filter_options = options;
        self
    }

    pub fn filter_fn(mut self, id: impl Into<String>) -> Self {
        self.filter_fn = Some(id.into());
        self
    }

    pub fn sort_key(mut self, id: impl Into<String>) -> Self {
        self.sort_key = Some(id.into());
        self
    }

    pub fn sortable(mut self, enabled: bool) -> Self {
        self.enable_sort = enabled;
        self
    }

    pub fn filterable(mut self, enabled: bool) -> Self {
        self.enable_filter = enabled;
        self
    }

    pub fn global_search(mut self, enabled: bool) -> Self {
        self.enable_global_filter = enabled;
        self
    }

    pub fn sort_desc_first(mut self, enabled: bool) -> Self {
        self.sort_desc_first = enabled;
        self
    }

    pub fn size(mut self, size: SizeBounds) -> Self {
        self.size = size;
        self
    }

    pub fn formatter(mut self, formatter: impl Fn(&Value) -> String + 'static) -> Self {
        self.formatter = Some(Box::new(formatter));
        self
    }

    pub fn value(&self, row: &R) -> Value {
        (self.accessor)(row)
    }

    /// Display text for a cell, through the column formatter if one is set
    pub fn render(&self, row: &R) -> String {
        let value = self.value(row);
        match &self.formatter {
            Some(format) => format(&value),
            None => value.to_string(),
        }
    }

    /// Whether a column filter on this column has any effect
    ///
    /// A select filter without options is inert.
    pub fn can_filter(&self) -> bool {
        match self.filter_variant {
            None => false,
            Some(_) if !self.enable_filter => false,
            Some(FilterVariant::Select) => !self.filter_options.is_empty(),
            Some(FilterVariant::Text) => true,
        }
    }

    /// Predicate registry id applied to this column's filter value
    pub fn effective_filter_fn(&self) -> Option<&str> {
        match self.filter_variant? {
            FilterVariant::Select => Some(EQUALS),
            FilterVariant::Text => Some(self.filter_fn.as_deref().unwrap_or(INCLUDES_STRING)),
        }
    }
}

impl<R> fmt::Debug for Column<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column")
            .field("id", &self.id)
            .field("header", &self.header)
            .field("filter_variant", &self.filter_variant)
            .field("sort_key", &self.sort_key)
            .field("enable_filter", &self.enable_filter)
            .field("enable_sort", &self.enable_sort)
            .field("enable_global_filter", &self.enable_global_filter)
            .finish_non_exhaustive()
    }
}

/// Ordered set of columns with unique ids
pub struct ColumnSchema<R> {
    columns: Vec<Column<R>>,
    positions: HashMap<String, usize>,
}

impl<R> ColumnSchema<R> {
    pub fn new(columns: Vec<Column<R>>) -> Result<Self> {
        let mut positions = HashMap::with_capacity(columns.len());
        for (index, column) in columns.iter().enumerate() {
            if positions.insert(column.id.clone(), index).is_some() {
                return Err(TableError::DuplicateColumn(column.id.clone()));
            }
            if column.filter_variant == Some(FilterVariant::Select)
                && column.filter_options.is_empty()
            {
                warn!("column '{}' has a select filter without options; filter is inert", column.id);
            }
        }
        Ok(Self { columns, positions })
    }

    pub fn get(&self, id: &str) -> Option<&Column<R>> {
        self.positions.get(id).map(|&index| &self.columns[index])
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.positions.get(id).copied()
    }

    pub fn columns(&self) -> &[Column<R>] {
        &self.columns
    }

    pub fn iter(&self) -> impl Iterator<Item = &Column<R>> {
        self.columns.iter()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Columns that take part in the global search
    pub fn global_columns(&self) -> impl Iterator<Item = &Column<R>> {
        self.columns.iter().filter(|c| c.enable_global_filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name_column() -> Column<(String, u32)> {
        Column::new("name", |r: &(String, u32)| Value::from(r.0.clone()))
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let result = ColumnSchema::new(vec![name_column(), name_column()]);
        assert_eq!(result.err(), Some(TableError::DuplicateColumn("name".to_string())));
    }

    #[test]
    fn test_select_without_options_is_inert() {
        let column = name_column().select_filter(Vec::new());
        assert!(!column.can_filter());

        let column = name_column().select_filter(vec![FilterOption::new("a", "A")]);
        assert!(column.can_filter());
        assert_eq!(column.effective_filter_fn(), Some(EQUALS));
    }

    #[test]
    fn test_text_filter_defaults_to_includes() {
        let column = name_column().text_filter();
        assert_eq!(column.effective_filter_fn(), Some(INCLUDES_STRING));

        let column = name_column().text_filter().filter_fn("regex");
        assert_eq!(column.effective_filter_fn(), Some("regex"));

        assert_eq!(name_column().effective_filter_fn(), None);
    }

    #[test]
    fn test_size_bounds_normalized() {
        let size = SizeBounds::new(10, 4, 8);
        assert_eq!(size, SizeBounds { min: 10, pref: 10, max: 10 });
        assert_eq!(SizeBounds::new(2, 6, 12).clamp(20), 12);
    }

    #[test]
    fn test_render_uses_formatter() {
        let column = Column::new("n", |r: &(String, u32)| Value::from(r.1))
            .formatter(|v| format!("#{}", v));
        let row = ("x".to_string(), 7);
        assert_eq!(column.render(&row), "#7");
        assert_eq!(column.value(&row), Value::Number(7.0));
    }
}
