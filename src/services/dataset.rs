//! CSV data and column schema loading
//!
//! Records are kept as raw strings; typing happens in the column accessors
//! built from a [`SchemaFile`], either read from YAML or inferred from the
//! data itself.

use anyhow::{bail, Context, Result};
use gridview::table::filtering::{INCLUDES_STRING, IN_NUMBER_RANGE};
use gridview::table::value::parse_datetime;
use gridview::table::{Column, FilterOption, SizeBounds, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::Path;

/// Select filters are inferred for text columns with at most this many
/// distinct values
const MAX_INFERRED_OPTIONS: usize = 12;

// ═══════════════════════════════════════════════════════════════════════════════
// Records
// ═══════════════════════════════════════════════════════════════════════════════

/// One CSV row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvRecord {
    /// Position in the file, starting at 0 after the header
    pub line: usize,
    pub fields: Vec<String>,
}

impl CsvRecord {
    pub fn get(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(String::as_str)
    }

    pub fn id(&self) -> String {
        self.line.to_string()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub headers: Vec<String>,
    pub records: Vec<CsvRecord>,
}

impl Dataset {
    pub fn column_index(&self, field: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == field)
    }

    fn values(&self, index: usize) -> impl Iterator<Item = &str> {
        self.records
            .iter()
            .filter_map(move |r| r.get(index))
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }
}

pub fn load_csv(path: &Path) -> Result<Dataset> {
    let file = fs::File::open(path).with_context(|| format!("Cannot read {}", path.display()))?;
    read_csv(file).with_context(|| format!("Malformed CSV in {}", path.display()))
}

pub fn read_csv<R: io::Read>(reader: R) -> Result<Dataset> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();
    if headers.is_empty() {
        bail!("CSV has no header row");
    }

    let mut records = Vec::new();
    for (line, row) in reader.records().enumerate() {
        let row = row?;
        records.push(CsvRecord {
            line,
            fields: row.iter().map(str::to_string).collect(),
        });
    }
    log::info!("loaded {} rows with {} columns", records.len(), headers.len());
    Ok(Dataset { headers, records })
}

// ═══════════════════════════════════════════════════════════════════════════════
// Schema File
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    #[default]
    Text,
    Number,
    Datetime,
    Bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    Text,
    Select,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeSpec {
    pub min: u16,
    pub pref: u16,
    pub max: u16,
}

fn yes() -> bool {
    true
}

/// One column of a schema file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub id: String,
    #[serde(default)]
    pub header: Option<String>,
    /// CSV header the column reads; defaults to `id`
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub kind: ColumnKind,
    #[serde(default)]
    pub filter: Option<FilterKind>,
    #[serde(default)]
    pub filter_fn: Option<String>,
    /// Select choices; filled from the data when left empty
    #[serde(default)]
    pub options: Vec<String>,
    /// Comparator registry id
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(default = "yes")]
    pub sortable: bool,
    #[serde(default = "yes")]
    pub filterable: bool,
    #[serde(default)]
    pub global: bool,
    #[serde(default)]
    pub desc_first: bool,
    #[serde(default)]
    pub size: Option<SizeSpec>,
}

impl ColumnSpec {
    fn new(id: &str, kind: ColumnKind) -> Self {
        Self {
            id: id.to_string(),
            header: None,
            field: None,
            kind,
            filter: None,
            filter_fn: None,
            options: Vec::new(),
            sort: None,
            sortable: true,
            filterable: true,
            global: false,
            desc_first: false,
            size: None,
        }
    }

    pub fn field(&self) -> &str {
        self.field.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaFile {
    pub columns: Vec<ColumnSpec>,
}

pub fn load_schema(path: &Path) -> Result<SchemaFile> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Cannot read {}", path.display()))?;
    parse_schema(&content).with_context(|| format!("Invalid schema in {}", path.display()))
}

pub fn parse_schema(content: &str) -> Result<SchemaFile> {
    let schema: SchemaFile = serde_yaml::from_str(content)?;
    if schema.columns.is_empty() {
        bail!("schema defines no columns");
    }
    Ok(schema)
}

/// Derive a schema from the header row and a look at every value
pub fn infer_schema(dataset: &Dataset) -> SchemaFile {
    let columns = dataset
        .headers
        .iter()
        .enumerate()
        .map(|(index, header)| {
            let values: Vec<&str> = dataset.values(index).collect();
            let kind = infer_kind(&values);
            let mut spec = ColumnSpec::new(header, kind);
            match kind {
                ColumnKind::Number => {
                    spec.filter = Some(FilterKind::Text);
                    spec.filter_fn = Some(IN_NUMBER_RANGE.to_string());
                }
                ColumnKind::Bool => spec.filter = Some(FilterKind::Select),
                ColumnKind::Datetime => spec.filter = Some(FilterKind::Text),
                ColumnKind::Text => {
                    let distinct: BTreeSet<&str> = values.iter().copied().collect();
                    if distinct.len() <= MAX_INFERRED_OPTIONS && distinct.len() * 2 <= values.len() {
                        spec.filter = Some(FilterKind::Select);
                    } else {
                        spec.filter = Some(FilterKind::Text);
                        spec.global = true;
                    }
                }
            }
            spec
        })
        .collect();
    SchemaFile { columns }
}

fn infer_kind(values: &[&str]) -> ColumnKind {
    if values.is_empty() {
        return ColumnKind::Text;
    }
    if values.iter().all(|v| v.parse::<f64>().is_ok()) {
        ColumnKind::Number
    } else if values.iter().all(|v| parse_bool(v).is_some()) {
        ColumnKind::Bool
    } else if values.iter().all(|v| parse_datetime(v).is_some()) {
        ColumnKind::Datetime
    } else {
        ColumnKind::Text
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" => Some(true),
        "false" | "no" => Some(false),
        _ => None,
    }
}

fn typed_value(raw: &str, kind: ColumnKind) -> Value {
    let raw = raw.trim();
    if raw.is_empty() {
        return Value::Null;
    }
    match kind {
        ColumnKind::Text => Value::from(raw),
        ColumnKind::Number => raw.parse::<f64>().map(Value::Number).unwrap_or(Value::Null),
        ColumnKind::Datetime => parse_datetime(raw).map(Value::DateTime).unwrap_or(Value::Null),
        ColumnKind::Bool => parse_bool(raw).map(Value::Bool).unwrap_or(Value::Null),
    }
}

/// Turn a schema into engine columns over `dataset`
///
/// Fails when a column reads a field the CSV does not have.
pub fn build_columns(schema: &SchemaFile, dataset: &Dataset) -> Result<Vec<Column<CsvRecord>>> {
    let mut columns = Vec::with_capacity(schema.columns.len());
    for spec in &schema.columns {
        let Some(index) = dataset.column_index(spec.field()) else {
            bail!("column '{}' reads unknown field '{}'", spec.id, spec.field());
        };
        let kind = spec.kind;
        let mut column = Column::new(spec.id.clone(), move |r: &CsvRecord| {
            typed_value(r.get(index).unwrap_or(""), kind)
        })
        .header(spec.header.clone().unwrap_or_else(|| spec.id.clone()))
        .sortable(spec.sortable)
        .filterable(spec.filterable)
        .global_search(spec.global)
        .sort_desc_first(spec.desc_first);

        column = match spec.filter {
            Some(FilterKind::Select) => {
                let options = if spec.options.is_empty() {
                    distinct_values(dataset, index, kind)
                } else {
                    spec.options.clone()
                };
                column.select_filter(
                    options
                        .into_iter()
                        .map(|o| FilterOption::new(o.clone(), o))
                        .collect(),
                )
            }
            Some(FilterKind::Text) => column
                .text_filter()
                .filter_fn(spec.filter_fn.clone().unwrap_or_else(|| INCLUDES_STRING.to_string())),
            None => column,
        };
        if let Some(sort) = &spec.sort {
            column = column.sort_key(sort.clone());
        }
        if let Some(size) = spec.size {
            column = column.size(SizeBounds::new(size.min, size.pref, size.max));
        }
        columns.push(column);
    }
    Ok(columns)
}

/// Display forms of a column's values, as the filter compares them
fn distinct_values(dataset: &Dataset, index: usize, kind: ColumnKind) -> Vec<String> {
    let distinct: BTreeSet<String> = dataset
        .values(index)
        .map(|raw| typed_value(raw, kind))
        .filter(|v| !v.is_null())
        .map(|v| v.to_text())
        .collect();
    distinct.into_iter().collect()
}
