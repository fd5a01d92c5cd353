//! Simulated data server for manual mode
//!
//! Table callbacks push [`QueryChange`]s; the app folds them into a full
//! [`QueryRequest`] and hands it to a worker thread, which answers with one
//! page of rows after an artificial delay. Every request carries a
//! generation number and only the answer to the newest one is accepted.

use crate::services::dataset::{build_columns, CsvRecord, Dataset, SchemaFile};
use gridview::table::{ExternalRows, FilterState, SortState, Table, TableOptions};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;
use std::time::Duration;

/// A single state change reported by a table callback
#[derive(Debug, Clone, PartialEq)]
pub enum QueryChange {
    ColumnFilters(FilterState),
    GlobalFilter(Option<String>),
    Sorting(SortState),
    PageIndex(usize),
    PageSize(usize),
}

/// Everything the server needs to produce one page
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub generation: u64,
    pub column_filters: FilterState,
    pub global_filter: Option<String>,
    pub sorting: SortState,
    pub page_index: usize,
    pub page_size: usize,
}

#[derive(Debug, Clone)]
pub struct QueryResponse {
    pub generation: u64,
    pub rows: Vec<CsvRecord>,
    /// Rows matching the request across all pages
    pub total_rows: usize,
}

impl QueryResponse {
    pub fn into_external(self) -> ExternalRows<CsvRecord> {
        ExternalRows::new(self.rows).with_total(self.total_rows)
    }
}

pub struct Backend {
    requests: Sender<QueryRequest>,
    responses: Receiver<QueryResponse>,
    generation: u64,
}

impl Backend {
    /// Start the worker thread over its own copy of the data
    pub fn spawn(
        dataset: Dataset,
        schema: SchemaFile,
        options: TableOptions,
        latency: Duration,
    ) -> Self {
        let (request_tx, request_rx) = mpsc::channel();
        let (response_tx, response_rx) = mpsc::channel();

        thread::spawn(move || {
            Self::serve(dataset, schema, options, latency, request_rx, response_tx);
        });

        Self {
            requests: request_tx,
            responses: response_rx,
            generation: 0,
        }
    }

    /// Send a request; it supersedes any still in flight
    pub fn request(&mut self, mut request: QueryRequest) -> u64 {
        self.generation += 1;
        request.generation = self.generation;
        log::debug!("backend request #{}: {:?}", request.generation, request);
        if self.requests.send(request).is_err() {
            log::warn!("backend worker is gone; request dropped");
        }
        self.generation
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Drain finished responses, returning the one for the newest request
    pub fn poll(&self) -> Option<QueryResponse> {
        let mut latest = None;
        loop {
            match self.responses.try_recv() {
                Ok(response) if response.generation == self.generation => latest = Some(response),
                Ok(stale) => {
                    log::debug!(
                        "discarding stale response #{} (current #{})",
                        stale.generation,
                        self.generation
                    );
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        latest
    }

    fn serve(
        dataset: Dataset,
        schema: SchemaFile,
        options: TableOptions,
        latency: Duration,
        requests: Receiver<QueryRequest>,
        responses: Sender<QueryResponse>,
    ) {
        let columns = match build_columns(&schema, &dataset) {
            Ok(columns) => columns,
            Err(e) => {
                log::error!("backend cannot build columns: {:#}", e);
                return;
            }
        };
        let table = Table::builder(columns)
            .rows(dataset.records)
            .row_id(|r: &CsvRecord, _| r.id())
            .options(options)
            .build();
        let mut table = match table {
            Ok(table) => table,
            Err(e) => {
                log::error!("backend cannot build table: {}", e);
                return;
            }
        };

        for request in requests {
            thread::sleep(latency);
            let response = Self::answer(&mut table, &request);
            if responses.send(response).is_err() {
                break;
            }
        }
    }

    fn answer(table: &mut Table<CsvRecord>, request: &QueryRequest) -> QueryResponse {
        table.set_column_filters(request.column_filters.clone());
        table.set_global_filter(request.global_filter.clone());
        table.set_sorting(request.sorting.clone());
        table.set_page_size(request.page_size);
        table.set_page_index(request.page_index);

        let rows = table
            .row_model()
            .page_rows()
            .iter()
            .filter_map(|&i| table.row(i).cloned())
            .collect();
        QueryResponse {
            generation: request.generation,
            rows,
            total_rows: table.row_model().filtered_count(),
        }
    }
}
