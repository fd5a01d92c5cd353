//! Filtering stage
//!
//! Column filters are AND-combined. The global filter is an extra AND term
//! that passes when any globally searchable column matches. Predicates are
//! looked up by name in a [`FilterPredicateRegistry`].

use super::column::ColumnSchema;
use super::value::Value;
use log::{trace, warn};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet, HashMap};

pub const INCLUDES_STRING: &str = "includesString";
pub const INCLUDES_STRING_SENSITIVE: &str = "includesStringSensitive";
pub const EQUALS_STRING: &str = "equalsString";
pub const EQUALS: &str = "equals";
pub const WEAK_EQUALS: &str = "weakEquals";
pub const IN_NUMBER_RANGE: &str = "inNumberRange";
pub const ARR_INCLUDES: &str = "arrIncludes";
pub const REGEX: &str = "regex";

// ═══════════════════════════════════════════════════════════════════════════════
// Filter State
// ═══════════════════════════════════════════════════════════════════════════════

/// The value a column filter compares against
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Text(String),
    /// Inclusive bounds; `None` leaves that side open
    Range { min: Option<f64>, max: Option<f64> },
    OneOf(BTreeSet<String>),
}

impl FilterValue {
    pub fn text(s: impl Into<String>) -> Self {
        FilterValue::Text(s.into())
    }

    pub fn range(min: Option<f64>, max: Option<f64>) -> Self {
        FilterValue::Range { min, max }
    }

    pub fn one_of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FilterValue::OneOf(values.into_iter().map(Into::into).collect())
    }

    /// Empty values are never stored in a [`FilterState`]
    pub fn is_empty(&self) -> bool {
        match self {
            FilterValue::Text(s) => s.is_empty(),
            FilterValue::Range { min, max } => min.is_none() && max.is_none(),
            FilterValue::OneOf(set) => set.is_empty(),
        }
    }
}

/// Active column filters keyed by column id
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterState {
    filters: BTreeMap<String, FilterValue>,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or clear a column's filter. Empty values clear it.
    pub fn set(&mut self, column_id: impl Into<String>, value: Option<FilterValue>) {
        let column_id = column_id.into();
        match value {
            Some(value) if !value.is_empty() => {
                self.filters.insert(column_id, value);
            }
            _ => {
                self.filters.remove(&column_id);
            }
        }
    }

    pub fn with(mut self, column_id: impl Into<String>, value: FilterValue) -> Self {
        self.set(column_id, Some(value));
        self
    }

    pub fn get(&self, column_id: &str) -> Option<&FilterValue> {
        self.filters.get(column_id)
    }

    pub fn contains(&self, column_id: &str) -> bool {
        self.filters.contains_key(column_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FilterValue)> {
        self.filters.iter()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn clear(&mut self) {
        self.filters.clear();
    }
}

/// Normalize a global search string; blank input means no global filter
pub fn normalize_global_filter(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

// ═══════════════════════════════════════════════════════════════════════════════
// Predicate Registry
// ═══════════════════════════════════════════════════════════════════════════════

/// A predicate prepared for one filter value, applied to non-null cells
pub type Matcher = Box<dyn Fn(&Value) -> bool>;

/// Builds a [`Matcher`] from a filter value
///
/// Preparing once per pass keeps per-row work down to the comparison itself
/// (lowercasing the needle, compiling a pattern).
pub type FilterFn = fn(&FilterValue) -> Matcher;

/// Named filter predicates
#[derive(Clone)]
pub struct FilterPredicateRegistry {
    fns: HashMap<String, FilterFn>,
}

impl Default for FilterPredicateRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl FilterPredicateRegistry {
    /// An empty registry with no entries
    pub fn empty() -> Self {
        Self {
            fns: HashMap::new(),
        }
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register(INCLUDES_STRING, includes_string);
        registry.register(INCLUDES_STRING_SENSITIVE, includes_string_sensitive);
        registry.register(EQUALS_STRING, equals_string);
        registry.register(EQUALS, equals);
        registry.register(WEAK_EQUALS, weak_equals);
        registry.register(IN_NUMBER_RANGE, in_number_range);
        registry.register(ARR_INCLUDES, arr_includes);
        registry.register(REGEX, regex_match);
        registry
    }

    /// Add or replace an entry
    pub fn register(&mut self, name: impl Into<String>, f: FilterFn) {
        self.fns.insert(name.into(), f);
    }

    pub fn get(&self, name: &str) -> Option<FilterFn> {
        self.fns.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fns.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.fns.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Prepare a matcher; `None` if `name` is unknown
    fn matcher(&self, name: &str, value: &FilterValue) -> Option<Matcher> {
        let matcher = self.get(name).map(|f| f(value));
        if matcher.is_none() {
            warn!("unknown filter predicate '{}'; filter ignored", name);
        }
        matcher
    }
}

fn never() -> Matcher {
    Box::new(|_: &Value| false)
}

fn includes_string(filter: &FilterValue) -> Matcher {
    match filter {
        FilterValue::Text(needle) => {
            let needle = needle.to_lowercase();
            Box::new(move |v: &Value| v.to_text().to_lowercase().contains(&needle))
        }
        _ => never(),
    }
}

fn includes_string_sensitive(filter: &FilterValue) -> Matcher {
    match filter {
        FilterValue::Text(needle) => {
            let needle = needle.clone();
            Box::new(move |v: &Value| v.to_text().contains(&needle))
        }
        _ => never(),
    }
}

fn equals_string(filter: &FilterValue) -> Matcher {
    match filter {
        FilterValue::Text(expected) => {
            let expected = expected.to_lowercase();
            Box::new(move |v: &Value| v.to_text().to_lowercase() == expected)
        }
        _ => never(),
    }
}

fn equals(filter: &FilterValue) -> Matcher {
    match filter {
        FilterValue::Text(expected) => {
            let expected = expected.clone();
            Box::new(move |v: &Value| v.to_text() == expected)
        }
        FilterValue::OneOf(_) => arr_includes(filter),
        FilterValue::Range { .. } => never(),
    }
}

fn weak_equals(filter: &FilterValue) -> Matcher {
    match filter {
        FilterValue::Text(expected) => {
            let expected = expected.trim().to_string();
            let expected_number = expected.parse::<f64>().ok();
            Box::new(move |v: &Value| match expected_number {
                Some(n) if !v.to_number().is_nan() => v.to_number() == n,
                _ => v.to_text().trim() == expected,
            })
        }
        _ => never(),
    }
}

fn in_number_range(filter: &FilterValue) -> Matcher {
    match filter {
        FilterValue::Range { min, max } => {
            let min = min.unwrap_or(f64::NEG_INFINITY);
            let max = max.unwrap_or(f64::INFINITY);
            Box::new(move |v: &Value| {
                let n = v.to_number();
                !n.is_nan() && n >= min && n <= max
            })
        }
        _ => never(),
    }
}

fn arr_includes(filter: &FilterValue) -> Matcher {
    match filter {
        FilterValue::OneOf(set) => {
            let set = set.clone();
            Box::new(move |v: &Value| set.contains(&v.to_text()))
        }
        FilterValue::Text(single) => {
            let single = single.clone();
            Box::new(move |v: &Value| v.to_text() == single)
        }
        FilterValue::Range { .. } => never(),
    }
}

fn regex_match(filter: &FilterValue) -> Matcher {
    match filter {
        FilterValue::Text(pattern) => match Regex::new(pattern) {
            Ok(re) => Box::new(move |v: &Value| re.is_match(&v.to_text())),
            Err(e) => {
                warn!("invalid filter pattern '{}': {}", pattern, e);
                never()
            }
        },
        _ => never(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Stage
// ═══════════════════════════════════════════════════════════════════════════════

/// Global search term plus the predicate used to evaluate it
#[derive(Debug, Clone, Copy)]
pub struct GlobalFilter<'a> {
    pub query: &'a str,
    pub filter_fn: &'a str,
}

impl<'a> GlobalFilter<'a> {
    pub fn new(query: &'a str) -> Self {
        Self {
            query,
            filter_fn: INCLUDES_STRING,
        }
    }

    pub fn with_fn(mut self, filter_fn: &'a str) -> Self {
        self.filter_fn = filter_fn;
        self
    }
}

/// Indices of rows that pass every column filter and the global filter,
/// in their original order
pub fn filter_rows<R>(
    rows: &[R],
    schema: &ColumnSchema<R>,
    filters: &FilterState,
    global: Option<GlobalFilter<'_>>,
    registry: &FilterPredicateRegistry,
) -> Vec<usize> {
    filter_rows_except(rows, schema, filters, global, registry, None)
}

/// Like [`filter_rows`], ignoring the filter on `skip_column`
///
/// Used to compute the values still reachable for one column's filter.
pub fn filter_rows_except<R>(
    rows: &[R],
    schema: &ColumnSchema<R>,
    filters: &FilterState,
    global: Option<GlobalFilter<'_>>,
    registry: &FilterPredicateRegistry,
    skip_column: Option<&str>,
) -> Vec<usize> {
    let mut column_matchers = Vec::new();
    for (column_id, value) in filters.iter() {
        if Some(column_id.as_str()) == skip_column {
            continue;
        }
        let Some(column) = schema.get(column_id) else {
            warn!("filter on unknown column '{}' ignored", column_id);
            continue;
        };
        if !column.can_filter() {
            continue;
        }
        if let Some(matcher) = column
            .effective_filter_fn()
            .and_then(|name| registry.matcher(name, value))
        {
            column_matchers.push((column, matcher));
        }
    }

    let global_columns: Vec<_> = schema.global_columns().collect();
    let global_matcher = match global {
        Some(g) if !g.query.trim().is_empty() => {
            if global_columns.is_empty() {
                warn!("global filter set but no column is globally searchable");
                None
            } else {
                registry.matcher(g.filter_fn, &FilterValue::text(g.query))
            }
        }
        _ => None,
    };

    if column_matchers.is_empty() && global_matcher.is_none() {
        return (0..rows.len()).collect();
    }

    let passes = |matcher: &Matcher, value: Value| !value.is_null() && matcher(&value);

    let result: Vec<usize> = rows
        .iter()
        .enumerate()
        .filter(|(_, row)| {
            column_matchers
                .iter()
                .all(|(column, matcher)| passes(matcher, column.value(row)))
        })
        .filter(|(_, row)| match &global_matcher {
            Some(matcher) => global_columns
                .iter()
                .any(|column| passes(matcher, column.value(row))),
            None => true,
        })
        .map(|(index, _)| index)
        .collect();

    trace!("filtered {} rows down to {}", rows.len(), result.len());
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::column::{Column, FilterOption};

    struct Task {
        title: &'static str,
        status: &'static str,
        phone: Option<&'static str>,
        hours: f64,
    }

    fn tasks() -> Vec<Task> {
        vec![
            Task { title: "Invoice review", status: "open", phone: Some("555-1050"), hours: 2.0 },
            Task { title: "Payroll", status: "completed", phone: None, hours: 8.0 },
            Task { title: "Contract renewal", status: "completed", phone: Some("555-2000"), hours: 1.5 },
            Task { title: "invoice archive", status: "open", phone: Some("555-3000"), hours: 4.0 },
        ]
    }

    fn schema() -> ColumnSchema<Task> {
        ColumnSchema::new(vec![
            Column::new("title", |t: &Task| Value::from(t.title))
                .text_filter()
                .global_search(true),
            Column::new("status", |t: &Task| Value::from(t.status)).select_filter(vec![
                FilterOption::new("open", "Open"),
                FilterOption::new("completed", "Completed"),
            ]),
            Column::new("phone", |t: &Task| Value::from(t.phone))
                .text_filter()
                .global_search(true),
            Column::new("hours", |t: &Task| Value::from(t.hours))
                .text_filter()
                .filter_fn(IN_NUMBER_RANGE),
        ])
        .unwrap()
    }

    #[test]
    fn test_empty_filter_state_passes_everything() {
        let rows = tasks();
        let result = filter_rows(&rows, &schema(), &FilterState::new(), None, &Default::default());
        assert_eq!(result, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_empty_text_is_normalized_away() {
        let mut state = FilterState::new();
        state.set("title", Some(FilterValue::text("")));
        assert!(state.is_empty());

        state.set("title", Some(FilterValue::text("pay")));
        state.set("title", Some(FilterValue::range(None, None)));
        assert!(state.is_empty());
    }

    #[test]
    fn test_includes_is_case_insensitive() {
        let rows = tasks();
        let filters = FilterState::new().with("title", FilterValue::text("INVOICE"));
        let result = filter_rows(&rows, &schema(), &filters, None, &Default::default());
        assert_eq!(result, vec![0, 3]);
    }

    #[test]
    fn test_select_uses_exact_equality() {
        let rows = tasks();
        let filters = FilterState::new().with("status", FilterValue::text("complete"));
        assert!(filter_rows(&rows, &schema(), &filters, None, &Default::default()).is_empty());

        let filters = FilterState::new().with("status", FilterValue::text("completed"));
        assert_eq!(
            filter_rows(&rows, &schema(), &filters, None, &Default::default()),
            vec![1, 2]
        );
    }

    #[test]
    fn test_column_filters_are_anded() {
        let rows = tasks();
        let filters = FilterState::new()
            .with("status", FilterValue::text("completed"))
            .with("title", FilterValue::text("contract"));
        let result = filter_rows(&rows, &schema(), &filters, None, &Default::default());
        assert_eq!(result, vec![2]);
    }

    #[test]
    fn test_null_cells_never_match() {
        let rows = tasks();
        let filters = FilterState::new().with("phone", FilterValue::text("555"));
        let result = filter_rows(&rows, &schema(), &filters, None, &Default::default());
        assert_eq!(result, vec![0, 2, 3]);
    }

    #[test]
    fn test_number_range() {
        let rows = tasks();
        let filters = FilterState::new().with("hours", FilterValue::range(Some(2.0), Some(4.0)));
        let result = filter_rows(&rows, &schema(), &filters, None, &Default::default());
        assert_eq!(result, vec![0, 3]);

        let filters = FilterState::new().with("hours", FilterValue::range(Some(5.0), None));
        let result = filter_rows(&rows, &schema(), &filters, None, &Default::default());
        assert_eq!(result, vec![1]);
    }

    #[test]
    fn test_global_filter_ors_across_searchable_columns() {
        let rows = tasks();
        let result = filter_rows(
            &rows,
            &schema(),
            &FilterState::new(),
            Some(GlobalFilter::new("105")),
            &Default::default(),
        );
        assert_eq!(result, vec![0]);

        // status is not globally searchable
        let result = filter_rows(
            &rows,
            &schema(),
            &FilterState::new(),
            Some(GlobalFilter::new("completed")),
            &Default::default(),
        );
        assert!(result.is_empty());
    }

    #[test]
    fn test_global_filter_narrows_column_filters() {
        let rows = tasks();
        let filters = FilterState::new().with("status", FilterValue::text("open"));
        let result = filter_rows(
            &rows,
            &schema(),
            &filters,
            Some(GlobalFilter::new("archive")),
            &Default::default(),
        );
        assert_eq!(result, vec![3]);
    }

    #[test]
    fn test_inert_filters_pass_every_row() {
        let rows = tasks();
        let schema = ColumnSchema::new(vec![
            Column::new("title", |t: &Task| Value::from(t.title))
                .text_filter()
                .filter_fn("doesNotExist")
                .global_search(true),
            Column::new("status", |t: &Task| Value::from(t.status)).select_filter(Vec::new()),
        ])
        .unwrap();
        let registry = FilterPredicateRegistry::default();

        let filters = FilterState::new().with("title", FilterValue::text("a"));
        assert_eq!(filter_rows(&rows, &schema, &filters, None, &registry), vec![0, 1, 2, 3]);

        let filters = FilterState::new().with("status", FilterValue::text("open"));
        assert_eq!(filter_rows(&rows, &schema, &filters, None, &registry), vec![0, 1, 2, 3]);

        let global = GlobalFilter::new("zzz").with_fn("doesNotExist");
        let result = filter_rows(&rows, &schema, &FilterState::new(), Some(global), &registry);
        assert_eq!(result, vec![0, 1, 2, 3]);

        // Known predicates alongside an inert one still apply
        let filters = FilterState::new()
            .with("title", FilterValue::text("a"))
            .with("status", FilterValue::text("open"));
        let global = GlobalFilter::new("pay");
        assert_eq!(filter_rows(&rows, &schema, &filters, Some(global), &registry), vec![1]);
    }

    #[test]
    fn test_filter_on_unknown_column_is_ignored() {
        let rows = tasks();
        let filters = FilterState::new().with("missing", FilterValue::text("x"));
        let result = filter_rows(&rows, &schema(), &filters, None, &Default::default());
        assert_eq!(result.len(), 4);
    }

    #[test]
    fn test_invalid_regex_never_matches() {
        let matcher = regex_match(&FilterValue::text("(unclosed"));
        assert!(!matcher(&Value::from("(unclosed")));

        let matcher = regex_match(&FilterValue::text("^inv"));
        assert!(matcher(&Value::from("invoice")));
    }

    #[test]
    fn test_weak_equals_compares_numbers() {
        let matcher = weak_equals(&FilterValue::text("2"));
        assert!(matcher(&Value::Number(2.0)));
        assert!(matcher(&Value::from("2.0")));
        assert!(!matcher(&Value::from("two")));
    }

    #[test]
    fn test_arr_includes() {
        let matcher = arr_includes(&FilterValue::one_of(["open", "blocked"]));
        assert!(matcher(&Value::from("open")));
        assert!(!matcher(&Value::from("completed")));
    }

    #[test]
    fn test_skip_column_for_facets() {
        let rows = tasks();
        let filters = FilterState::new()
            .with("status", FilterValue::text("completed"))
            .with("title", FilterValue::text("invoice"));
        let result = filter_rows_except(
            &rows,
            &schema(),
            &filters,
            None,
            &Default::default(),
            Some("status"),
        );
        assert_eq!(result, vec![0, 3]);
    }

    #[test]
    fn test_registry_names_sorted() {
        let registry = FilterPredicateRegistry::with_builtins();
        let names = registry.names();
        assert!(names.contains(&INCLUDES_STRING));
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
    }
}
