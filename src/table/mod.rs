//! Headless table engine
//!
//! Rows of any record type are described by a [`ColumnSchema`] and pushed
//! through three stages: filtering, sorting and pagination. Each stage runs
//! in memory or is delegated to the caller through callbacks. Row expansion
//! and selection are tracked by stable row id.

pub mod column;
pub mod engine;
pub mod error;
pub mod expansion;
pub mod filtering;
pub mod pagination;
pub mod selection;
pub mod sorting;
pub mod stage;
pub mod value;

pub use column::{Column, ColumnSchema, FilterOption, FilterVariant, SizeBounds};
pub use engine::{
    ExternalRows, Facet, InitialState, RowModel, RowView, Table, TableBuilder, TableOptions,
    TableState,
};
pub use error::{Result, TableError};
pub use expansion::{ExpansionState, RowId};
pub use filtering::{FilterPredicateRegistry, FilterState, FilterValue};
pub use pagination::PaginationState;
pub use selection::{SelectionMode, SelectionState};
pub use sorting::{ColumnSort, SortDirection, SortState, SortingRegistry};
pub use stage::{FilteringCallbacks, PaginationCallbacks, SortingCallbacks, Stage};
pub use value::Value;
