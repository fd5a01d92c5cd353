//! Sorting stage
//!
//! Sort state is an ordered list of column sorts, primary key first.
//! Comparators are looked up by name in a [`SortingRegistry`]. The sort
//! itself is stable, so rows that tie on every key keep their input order.

use super::column::{Column, ColumnSchema};
use super::value::Value;
use log::{trace, warn};
use std::cmp::Ordering;
use std::collections::HashMap;

pub const ALPHANUMERIC: &str = "alphanumeric";
pub const TEXT: &str = "text";
pub const NUMBER: &str = "number";
pub const DATETIME: &str = "datetime";
pub const BASIC: &str = "basic";

// ═══════════════════════════════════════════════════════════════════════════════
// Sort State
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn reverse(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }

    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

/// One entry of the sort state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSort {
    pub column_id: String,
    pub direction: SortDirection,
}

impl ColumnSort {
    pub fn asc(column_id: impl Into<String>) -> Self {
        Self {
            column_id: column_id.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(column_id: impl Into<String>) -> Self {
        Self {
            column_id: column_id.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// Ordered sort keys; each column appears at most once
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortState {
    entries: Vec<ColumnSort>,
}

impl SortState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a list, keeping the first occurrence of each column
    pub fn from_entries(entries: Vec<ColumnSort>) -> Self {
        let mut state = Self::new();
        for entry in entries {
            if state.position(&entry.column_id).is_none() {
                state.entries.push(entry);
            }
        }
        state
    }

    pub fn then(mut self, entry: ColumnSort) -> Self {
        if self.position(&entry.column_id).is_none() {
            self.entries.push(entry);
        }
        self
    }

    pub fn entries(&self) -> &[ColumnSort] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn position(&self, column_id: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.column_id == column_id)
    }

    pub fn direction_of(&self, column_id: &str) -> Option<SortDirection> {
        self.entries
            .iter()
            .find(|e| e.column_id == column_id)
            .map(|e| e.direction)
    }

    /// Keep only entries accepted by `keep`
    pub fn retain(&mut self, mut keep: impl FnMut(&ColumnSort) -> bool) {
        self.entries.retain(|e| keep(e));
    }

    /// Next state after toggling `column_id`
    ///
    /// A column cycles first direction, opposite direction, removed. The
    /// first direction is ascending unless `desc_first` is set. A column
    /// already in the state is cycled in place and only that entry is ever
    /// removed, so three toggles give back the starting state. A new column
    /// goes in front as the primary key, or with `multi` at the back,
    /// dropping the oldest key once `max_multi` keys are active.
    pub fn toggled(
        &self,
        column_id: &str,
        multi: bool,
        desc_first: bool,
        max_multi: Option<usize>,
    ) -> SortState {
        let first = if desc_first {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        };
        let next = |current: SortDirection| (current == first).then(|| first.reverse());

        let mut entries = self.entries.clone();
        match self.position(column_id) {
            Some(index) => match next(entries[index].direction) {
                Some(direction) => entries[index].direction = direction,
                None => {
                    entries.remove(index);
                }
            },
            None if !multi => entries.insert(
                0,
                ColumnSort {
                    column_id: column_id.to_string(),
                    direction: first,
                },
            ),
            None => {
                if let Some(max) = max_multi {
                    while max > 0 && entries.len() >= max {
                        entries.remove(0);
                    }
                }
                entries.push(ColumnSort {
                    column_id: column_id.to_string(),
                    direction: first,
                });
            }
        }
        SortState { entries }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Comparator Registry
// ═══════════════════════════════════════════════════════════════════════════════

/// Ascending comparison of two cell values
pub type SortingFn = fn(&Value, &Value) -> Ordering;

/// Named comparators
#[derive(Clone)]
pub struct SortingRegistry {
    fns: HashMap<String, SortingFn>,
}

impl Default for SortingRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl SortingRegistry {
    pub fn empty() -> Self {
        Self {
            fns: HashMap::new(),
        }
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register(ALPHANUMERIC, alphanumeric);
        registry.register(TEXT, text);
        registry.register(NUMBER, number);
        registry.register(DATETIME, datetime);
        registry.register(BASIC, basic);
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, f: SortingFn) {
        self.fns.insert(name.into(), f);
    }

    pub fn get(&self, name: &str) -> Option<SortingFn> {
        self.fns.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fns.contains_key(name)
    }
}

/// Ordinal comparison that ignores ASCII case
pub fn alphanumeric(a: &Value, b: &Value) -> Ordering {
    a.to_text()
        .to_ascii_lowercase()
        .cmp(&b.to_text().to_ascii_lowercase())
}

/// Comparison that folds case across all of Unicode
///
/// Strings differing only in case compare equal and keep their input order.
pub fn text(a: &Value, b: &Value) -> Ordering {
    a.to_text().to_lowercase().cmp(&b.to_text().to_lowercase())
}

/// Numeric comparison; `NaN` sorts after every number
pub fn number(a: &Value, b: &Value) -> Ordering {
    let (a, b) = (a.to_number(), b.to_number());
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

/// Timestamp comparison; unparsable values count as the epoch
pub fn datetime(a: &Value, b: &Value) -> Ordering {
    a.to_timestamp_millis().cmp(&b.to_timestamp_millis())
}

/// Plain `<` / `>` comparison within a kind; kinds order null, bool,
/// number, datetime, text
pub fn basic(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::DateTime(_) => 3,
            Value::Text(_) => 4,
        }
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (Value::DateTime(x), Value::DateTime(y)) => x.cmp(y),
        (Value::Text(x), Value::Text(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Pick a comparator name from the first non-null value in a column
pub fn auto_sort_key<R>(rows: &[R], indices: &[usize], column: &Column<R>) -> &'static str {
    let sample = indices
        .iter()
        .map(|&i| column.value(&rows[i]))
        .find(|v| !v.is_null());

    match sample {
        Some(Value::Number(_)) => NUMBER,
        Some(Value::DateTime(_)) => DATETIME,
        Some(Value::Bool(_)) => BASIC,
        _ => ALPHANUMERIC,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Stage
// ═══════════════════════════════════════════════════════════════════════════════

/// Reorder `indices` by `sorting`
///
/// Entries naming unknown or unsortable columns, or an unregistered
/// comparator, are skipped.
pub fn sort_rows<R>(
    rows: &[R],
    indices: &mut Vec<usize>,
    schema: &ColumnSchema<R>,
    sorting: &SortState,
    registry: &SortingRegistry,
) {
    let mut keys: Vec<(&Column<R>, SortingFn, SortDirection)> = Vec::new();
    for entry in sorting.entries() {
        let Some(column) = schema.get(&entry.column_id) else {
            warn!("sort on unknown column '{}' ignored", entry.column_id);
            continue;
        };
        if !column.enable_sort {
            continue;
        }
        let name = match column.sort_key.as_deref() {
            Some(name) => name,
            None => auto_sort_key(rows, indices, column),
        };
        match registry.get(name) {
            Some(f) => keys.push((column, f, entry.direction)),
            None => warn!("unknown comparator '{}' on column '{}'", name, column.id),
        }
    }

    if keys.is_empty() || indices.len() < 2 {
        return;
    }

    // Read every sort key once up front instead of on each comparison
    let mut decorated: Vec<(usize, Vec<Value>)> = indices
        .iter()
        .map(|&i| {
            let values = keys.iter().map(|(column, _, _)| column.value(&rows[i])).collect();
            (i, values)
        })
        .collect();

    decorated.sort_by(|(_, a), (_, b)| {
        keys.iter()
            .zip(a.iter().zip(b.iter()))
            .map(|((_, compare, direction), (x, y))| direction.apply(compare(x, y)))
            .find(|ordering| *ordering != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    });

    indices.clear();
    indices.extend(decorated.into_iter().map(|(i, _)| i));
    trace!("sorted {} rows on {} keys", indices.len(), keys.len());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Ticket {
        title: &'static str,
        priority: &'static str,
        cost: Value,
        due: &'static str,
    }

    fn ticket(title: &'static str, priority: &'static str, cost: Value, due: &'static str) -> Ticket {
        Ticket { title, priority, cost, due }
    }

    fn tickets() -> Vec<Ticket> {
        vec![
            ticket("a", "high", Value::Number(30.0), "2024-02-01"),
            ticket("b", "low", Value::from("n/a"), "garbage"),
            ticket("c", "high", Value::Number(10.0), "2024-01-15"),
            ticket("d", "Medium", Value::Number(20.0), "2023-12-31"),
            ticket("e", "low", Value::Number(5.0), "2024-03-01"),
        ]
    }

    fn schema() -> ColumnSchema<Ticket> {
        ColumnSchema::new(vec![
            Column::new("title", |t: &Ticket| Value::from(t.title)),
            Column::new("priority", |t: &Ticket| Value::from(t.priority)).sort_key(TEXT),
            Column::new("cost", |t: &Ticket| t.cost.clone()).sort_key(NUMBER),
            Column::new("due", |t: &Ticket| Value::from(t.due)).sort_key(DATETIME),
            Column::new("locked", |t: &Ticket| Value::from(t.title)).sortable(false),
            Column::new("broken", |t: &Ticket| Value::from(t.title)).sort_key("nope"),
        ])
        .unwrap()
    }

    fn sorted_titles(sorting: SortState) -> Vec<&'static str> {
        let rows = tickets();
        let mut indices: Vec<usize> = (0..rows.len()).collect();
        sort_rows(&rows, &mut indices, &schema(), &sorting, &SortingRegistry::default());
        indices.into_iter().map(|i| rows[i].title).collect()
    }

    #[test]
    fn test_text_sort_keeps_ties_in_order() {
        let asc = sorted_titles(SortState::new().then(ColumnSort::asc("priority")));
        assert_eq!(asc, vec!["a", "c", "b", "e", "d"]);

        let desc = sorted_titles(SortState::new().then(ColumnSort::desc("priority")));
        assert_eq!(desc, vec!["d", "b", "e", "a", "c"]);
    }

    #[test]
    fn test_multi_key_tie_break() {
        let sorting = SortState::new()
            .then(ColumnSort::asc("priority"))
            .then(ColumnSort::desc("cost"));
        assert_eq!(sorted_titles(sorting), vec!["a", "c", "b", "e", "d"]);

        let sorting = SortState::new()
            .then(ColumnSort::asc("priority"))
            .then(ColumnSort::asc("cost"));
        assert_eq!(sorted_titles(sorting), vec!["c", "a", "e", "b", "d"]);
    }

    #[test]
    fn test_nan_sorts_last_ascending() {
        let asc = sorted_titles(SortState::new().then(ColumnSort::asc("cost")));
        assert_eq!(asc, vec!["e", "c", "d", "a", "b"]);
    }

    #[test]
    fn test_unparsable_dates_are_epoch() {
        let asc = sorted_titles(SortState::new().then(ColumnSort::asc("due")));
        assert_eq!(asc, vec!["b", "d", "c", "a", "e"]);
    }

    #[test]
    fn test_inert_sort_entries_are_skipped() {
        let original = vec!["a", "b", "c", "d", "e"];
        assert_eq!(sorted_titles(SortState::new().then(ColumnSort::desc("locked"))), original);
        assert_eq!(sorted_titles(SortState::new().then(ColumnSort::desc("broken"))), original);
        assert_eq!(sorted_titles(SortState::new().then(ColumnSort::desc("ghost"))), original);
    }

    #[test]
    fn test_auto_sort_key_from_data() {
        let rows = tickets();
        let indices: Vec<usize> = (0..rows.len()).collect();
        let cost = Column::new("cost", |t: &Ticket| t.cost.clone());
        assert_eq!(auto_sort_key(&rows, &indices, &cost), NUMBER);

        let title = Column::new("title", |t: &Ticket| Value::from(t.title));
        assert_eq!(auto_sort_key(&rows, &indices, &title), ALPHANUMERIC);
    }

    #[test]
    fn test_case_only_differences_tie() {
        assert_eq!(text(&Value::from("apple"), &Value::from("Apple")), Ordering::Equal);
        assert_eq!(text(&Value::from("apple"), &Value::from("Banana")), Ordering::Less);
        assert_eq!(text(&Value::from("ÉCOLE"), &Value::from("école")), Ordering::Equal);
        assert_eq!(alphanumeric(&Value::from("apple"), &Value::from("APPLE")), Ordering::Equal);
        assert_ne!(alphanumeric(&Value::from("ÉCOLE"), &Value::from("école")), Ordering::Equal);
    }

    #[test]
    fn test_basic_mixed_kinds() {
        assert_eq!(basic(&Value::Null, &Value::Number(1.0)), Ordering::Less);
        assert_eq!(basic(&Value::Number(2.0), &Value::Number(1.0)), Ordering::Greater);
        assert_eq!(basic(&Value::from("b"), &Value::from("a")), Ordering::Greater);
    }

    #[test]
    fn test_toggle_cycles_and_removes() {
        let start = SortState::new();
        let once = start.toggled("priority", false, false, None);
        assert_eq!(once.direction_of("priority"), Some(SortDirection::Asc));
        let twice = once.toggled("priority", false, false, None);
        assert_eq!(twice.direction_of("priority"), Some(SortDirection::Desc));
        let thrice = twice.toggled("priority", false, false, None);
        assert_eq!(thrice, start);
    }

    #[test]
    fn test_toggle_desc_first() {
        let once = SortState::new().toggled("cost", false, true, None);
        assert_eq!(once.direction_of("cost"), Some(SortDirection::Desc));
        let twice = once.toggled("cost", false, true, None);
        assert_eq!(twice.direction_of("cost"), Some(SortDirection::Asc));
        assert!(twice.toggled("cost", false, true, None).is_empty());
    }

    #[test]
    fn test_single_toggle_leads_and_keeps_other_keys() {
        let state = SortState::new()
            .then(ColumnSort::asc("title"))
            .then(ColumnSort::desc("cost"));
        let next = state.toggled("priority", false, false, None);
        assert_eq!(
            next.entries(),
            &[
                ColumnSort::asc("priority"),
                ColumnSort::asc("title"),
                ColumnSort::desc("cost"),
            ]
        );

        let next = next.toggled("priority", false, false, None);
        assert_eq!(next.entries()[0], ColumnSort::desc("priority"));
        assert_eq!(next.toggled("priority", false, false, None), state);
    }

    #[test]
    fn test_single_toggle_cycles_a_secondary_key_in_place() {
        let state = SortState::new()
            .then(ColumnSort::asc("title"))
            .then(ColumnSort::asc("cost"));
        let next = state.toggled("cost", false, false, None);
        assert_eq!(
            next.entries(),
            &[ColumnSort::asc("title"), ColumnSort::desc("cost")]
        );
        assert_eq!(
            next.toggled("cost", false, false, None).entries(),
            &[ColumnSort::asc("title")]
        );
    }

    #[test]
    fn test_multi_toggle_round_trip() {
        let start = SortState::new().then(ColumnSort::desc("cost"));
        let mut state = start.clone();
        for _ in 0..3 {
            state = state.toggled("priority", true, false, None);
        }
        assert_eq!(state, start);
    }

    #[test]
    fn test_multi_toggle_respects_limit() {
        let state = SortState::new()
            .then(ColumnSort::asc("title"))
            .then(ColumnSort::asc("cost"));
        let next = state.toggled("due", true, false, Some(2));
        let ids: Vec<&str> = next.entries().iter().map(|e| e.column_id.as_str()).collect();
        assert_eq!(ids, vec!["cost", "due"]);
    }

    #[test]
    fn test_from_entries_dedups() {
        let state = SortState::from_entries(vec![
            ColumnSort::asc("a"),
            ColumnSort::desc("a"),
            ColumnSort::desc("b"),
        ]);
        assert_eq!(state.len(), 2);
        assert_eq!(state.direction_of("a"), Some(SortDirection::Asc));
    }
}
