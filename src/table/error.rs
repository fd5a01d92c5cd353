use thiserror::Error;

/// Errors raised while assembling a table.
///
/// Only construction is fallible. Once a [`Table`](super::Table) exists,
/// every operation degrades to a no-op instead of failing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    #[error("Duplicate column id: {0}")]
    DuplicateColumn(String),

    #[error("Invalid page size: {0}")]
    InvalidPageSize(usize),
}

pub type Result<T> = std::result::Result<T, TableError>;
