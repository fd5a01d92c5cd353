//! Data sources
//!
//! - CSV and schema loading
//! - The simulated server used in manual mode

pub mod backend;
pub mod dataset;

pub use backend::{Backend, QueryChange, QueryRequest};
pub use dataset::{build_columns, infer_schema, load_csv, load_schema, CsvRecord, Dataset};
