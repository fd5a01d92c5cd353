//! Root application component
//!
//! The App struct implements the Component trait, acting as the root component
//! that owns the table and delegates event handling and rendering to child
//! components. In manual mode the table's stage callbacks feed a channel; the
//! App turns what arrives into backend requests and feeds responses back.

use crate::action::Action;
use crate::args::Cli;
use crate::component::Component;
use crate::components::{
    calculate_main_layout, FilterChoice, FilterDialog, GridComponent, HelpDialog, QuitDialog,
};
use crate::config::Config;
use crate::model::{Modal, ModalStack};
use crate::services::{
    build_columns, infer_schema, load_csv, load_schema, Backend, CsvRecord, Dataset, QueryChange,
    QueryRequest,
};
use crate::services::dataset::SchemaFile;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use gridview::table::filtering::IN_NUMBER_RANGE;
use gridview::table::{
    FilterState, FilterVariant, FilteringCallbacks, PaginationCallbacks, SelectionMode,
    SortDirection, SortingCallbacks, Table, TableOptions,
};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use std::sync::mpsc::{self, Receiver};
use std::time::Duration;

/// Artificial delay of the simulated server
const BACKEND_LATENCY: Duration = Duration::from_millis(150);

// ═══════════════════════════════════════════════════════════════════════════════
// App Struct
// ═══════════════════════════════════════════════════════════════════════════════

pub struct App {
    /// The table being browsed
    pub table: Table<CsvRecord>,

    /// File name shown in the title bar
    pub source: String,

    /// Modal overlay stack
    pub modals: ModalStack,

    /// Simulated server, manual mode only
    pub backend: Option<Backend>,

    /// State changes reported by the table callbacks
    changes: Option<Receiver<QueryChange>>,

    /// Generation of the last response applied to the table
    received_generation: u64,

    /// Flag to indicate the app should quit
    pub should_quit: bool,

    /// Error message to display
    pub error: Option<String>,

    /// Status message to display
    pub status_message: Option<String>,

    // ─────────────────────────────────────────────────────────────────────────
    // Child Components
    // ─────────────────────────────────────────────────────────────────────────
    pub grid: GridComponent,
    pub filter_dialog: FilterDialog,
    pub help_dialog: HelpDialog,
    pub quit_dialog: QuitDialog,
}

impl App {
    /// Load the data file named on the command line
    pub fn new(cli: &Cli, config: &Config) -> Result<App> {
        let dataset = load_csv(&cli.data)?;
        let schema = match &cli.schema {
            Some(path) => load_schema(path)?,
            None => infer_schema(&dataset),
        };

        let mut options = config.table_options();
        if let Some(size) = cli.page_size {
            options.page_size = size;
        }
        if cli.single_select {
            options.selection_mode = SelectionMode::Single;
        }

        let source = cli
            .data
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| cli.data.display().to_string());

        Self::from_parts(dataset, schema, options, cli.manual, source)
    }

    /// Build the app around an already loaded dataset
    pub fn from_parts(
        dataset: Dataset,
        schema: SchemaFile,
        options: TableOptions,
        manual: bool,
        source: String,
    ) -> Result<App> {
        let columns = build_columns(&schema, &dataset)?;
        let mut builder = Table::builder(columns)
            .options(options.clone())
            .row_id(|r: &CsvRecord, _| r.id());

        let (backend, changes) = if manual {
            let (tx, rx) = mpsc::channel();
            let (filters_tx, global_tx, sorting_tx, page_tx, size_tx) =
                (tx.clone(), tx.clone(), tx.clone(), tx.clone(), tx);

            builder = builder
                .manual_filtering(FilteringCallbacks::new(
                    move |filters: &FilterState| {
                        let _ = filters_tx.send(QueryChange::ColumnFilters(filters.clone()));
                    },
                    move |query: Option<&str>| {
                        let _ = global_tx.send(QueryChange::GlobalFilter(query.map(str::to_string)));
                    },
                ))
                .manual_sorting(SortingCallbacks::new(move |sorting| {
                    let _ = sorting_tx.send(QueryChange::Sorting(sorting.clone()));
                }))
                .manual_pagination(PaginationCallbacks::new(
                    move |index| {
                        let _ = page_tx.send(QueryChange::PageIndex(index));
                    },
                    move |size| {
                        let _ = size_tx.send(QueryChange::PageSize(size));
                    },
                ));

            log::info!("manual mode: {} rows served by backend", dataset.records.len());
            let backend = Backend::spawn(dataset, schema, options, BACKEND_LATENCY);
            (Some(backend), Some(rx))
        } else {
            log::info!("loaded {} rows", dataset.records.len());
            builder = builder.rows(dataset.records);
            (None, None)
        };

        let mut app = App {
            table: builder.build()?,
            source,
            modals: ModalStack::new(),
            backend,
            changes,
            received_generation: 0,
            should_quit: false,
            error: None,
            status_message: None,
            grid: GridComponent::new(),
            filter_dialog: FilterDialog::new(),
            help_dialog: HelpDialog::default(),
            quit_dialog: QuitDialog::default(),
        };

        if app.backend.is_some() {
            app.send_query();
        }
        Ok(app)
    }

    /// A backend request is still unanswered
    pub fn is_loading(&self) -> bool {
        self.backend
            .as_ref()
            .is_some_and(|b| b.generation() > self.received_generation)
    }

    fn page_len(&self) -> usize {
        self.table.row_model().page_rows().len()
    }

    fn focused_column_id(&self) -> Option<String> {
        self.grid.focused_column_id(&self.table).map(str::to_string)
    }

    /// Forward callback changes to the backend as one request
    fn flush_changes(&mut self) {
        let Some(changes) = &self.changes else {
            return;
        };
        let mut changed = false;
        while let Ok(change) = changes.try_recv() {
            log::debug!("table requested {:?}", change);
            changed = true;
        }
        if changed {
            self.send_query();
        }
    }

    fn send_query(&mut self) {
        let pagination = self.table.requested_pagination();
        let request = QueryRequest {
            generation: 0,
            column_filters: self.table.requested_column_filters().clone(),
            global_filter: self.table.requested_global_filter().map(str::to_string),
            sorting: self.table.requested_sorting().clone(),
            page_index: pagination.page_index,
            page_size: pagination.page_size,
        };
        if let Some(backend) = &mut self.backend {
            backend.request(request);
        }
    }

    fn poll_backend(&mut self) {
        let Some(backend) = &self.backend else {
            return;
        };
        if let Some(response) = backend.poll() {
            self.received_generation = response.generation;
            self.table.receive_rows(response.into_external());
            self.grid.clamp_cursor(self.page_len());
        }
    }

    /// Step through the configured page sizes
    fn cycle_page_size(&mut self, grow: bool) {
        let current = self.table.requested_pagination().page_size;
        let options = &self.table.options().page_size_options;
        let next = if grow {
            options.iter().copied().find(|&s| s > current)
        } else {
            options.iter().rev().copied().find(|&s| s < current)
        };
        match next {
            Some(size) => {
                self.table.set_page_size(size);
                self.status_message = Some(format!("{} rows per page", size));
            }
            None => self.status_message = Some(format!("Page size stays at {}", current)),
        }
    }

    fn toggle_sort(&mut self, multi: bool) {
        if let Some(column_id) = self.focused_column_id() {
            self.table.toggle_sorting(&column_id, multi);
        }
    }

    /// Select the visible page, or every filtered row
    fn select_many(&mut self, all_filtered: bool) {
        if self.table.options().selection_mode == SelectionMode::Single {
            self.status_message = Some("Single selection mode".to_string());
        } else if all_filtered {
            self.table.select_all_filtered();
        } else {
            self.table.select_all_page();
        }
    }

    fn open_filter(&mut self) {
        let Some(column_id) = self.focused_column_id() else {
            return;
        };
        let Some(column) = self.table.schema().get(&column_id) else {
            return;
        };
        if !column.can_filter() {
            self.error = Some(format!("{} cannot be filtered", column.header));
            return;
        }

        let header = column.header.clone();
        let current = self.table.requested_column_filters().get(&column_id).cloned();
        match column.filter_variant {
            Some(FilterVariant::Select) => {
                // Counts are only meaningful over the full data
                let facets = if self.table.is_manual_filtering() {
                    Vec::new()
                } else {
                    self.table.column_facets(&column_id)
                };
                let choices = column
                    .filter_options
                    .iter()
                    .map(|option| FilterChoice {
                        value: option.value.clone(),
                        label: option.label.clone(),
                        count: if self.table.is_manual_filtering() {
                            None
                        } else {
                            Some(
                                facets
                                    .iter()
                                    .find(|f| f.value == option.value)
                                    .map_or(0, |f| f.count),
                            )
                        },
                    })
                    .collect();
                self.filter_dialog
                    .open_select(&column_id, &header, choices, current.as_ref());
            }
            _ => {
                let range = column.effective_filter_fn() == Some(IN_NUMBER_RANGE);
                self.filter_dialog
                    .open_text(&column_id, &header, range, current.as_ref());
            }
        }

        self.table.toggle_filter_widget(&column_id);
        self.modals.push(Modal::Filter { column_id });
    }

    fn close_modal(&mut self) {
        if let Some(Modal::Filter { column_id }) = self.modals.pop() {
            if self.table.is_filter_widget_open(&column_id) {
                self.table.toggle_filter_widget(&column_id);
            }
        }
    }

    fn reset_view(&mut self) {
        self.table.reset_column_filters();
        self.table.reset_global_filter();
        self.table.reset_sorting();
        self.table.reset_pagination();
        self.table.reset_expansion();
        self.table.reset_selection();
        self.grid.search_query.clear();
        self.grid.cursor = 0;
        self.status_message = Some("View reset".to_string());
    }

    fn apply(&mut self, action: Action) -> Result<Option<Action>> {
        match action {
            // ─────────────────────────────────────────────────────────────────
            // App Lifecycle
            // ─────────────────────────────────────────────────────────────────
            Action::Tick => self.poll_backend(),
            Action::Resize(_, _) => {}
            Action::ForceQuit => {
                log::info!("quitting");
                self.should_quit = true;
            }

            // ─────────────────────────────────────────────────────────────────
            // Cursor
            // ─────────────────────────────────────────────────────────────────
            Action::CursorDown => {
                let len = self.page_len();
                self.grid.cursor_down(len);
            }
            Action::CursorUp => self.grid.cursor_up(),
            Action::FocusNextColumn => self.grid.focus_next(self.table.schema().len()),
            Action::FocusPrevColumn => self.grid.focus_prev(),

            // ─────────────────────────────────────────────────────────────────
            // Sorting
            // ─────────────────────────────────────────────────────────────────
            Action::ToggleSort => self.toggle_sort(false),
            Action::ToggleMultiSort => self.toggle_sort(true),
            Action::ClearSorting => {
                self.table.clear_sorting();
            }

            // ─────────────────────────────────────────────────────────────────
            // Pagination
            // ─────────────────────────────────────────────────────────────────
            Action::NextPage => {
                self.table.next_page();
            }
            Action::PrevPage => {
                self.table.previous_page();
            }
            Action::FirstPage => {
                self.table.first_page();
            }
            Action::LastPage => {
                self.table.last_page();
            }
            Action::GrowPageSize => self.cycle_page_size(true),
            Action::ShrinkPageSize => self.cycle_page_size(false),

            // ─────────────────────────────────────────────────────────────────
            // Filtering
            // ─────────────────────────────────────────────────────────────────
            Action::EnterSearchMode => {
                let current = self.table.requested_global_filter().map(str::to_string);
                self.grid.enter_search_mode(current.as_deref());
            }
            Action::ExitSearchMode => self.grid.exit_search_mode(),
            Action::SearchInput(c) => {
                self.grid.search_query.push(c);
                self.table.set_global_filter(Some(self.grid.search_query.clone()));
            }
            Action::SearchBackspace => {
                self.grid.search_query.pop();
                self.table.set_global_filter(Some(self.grid.search_query.clone()));
            }
            Action::OpenFilter => self.open_filter(),
            Action::SetColumnFilter(column_id, value) => {
                self.table.set_column_filter(&column_id, value);
                self.close_modal();
            }
            Action::ClearFilters => {
                self.table.set_column_filters(FilterState::new());
                self.table.set_global_filter(None);
                self.grid.search_query.clear();
                self.status_message = Some("Filters cleared".to_string());
            }

            // ─────────────────────────────────────────────────────────────────
            // Rows
            // ─────────────────────────────────────────────────────────────────
            Action::ToggleExpansion => {
                if let Some(row_id) = self.grid.cursor_row_id(&self.table) {
                    self.table.toggle_expansion(&row_id);
                }
            }
            Action::ExpandAll => {
                self.table.expand_all();
            }
            Action::CollapseAll => {
                self.table.collapse_all();
            }
            Action::ToggleSelection => {
                if let Some(row_id) = self.grid.cursor_row_id(&self.table) {
                    self.table.toggle_selection(&row_id);
                }
            }
            Action::SelectPage => self.select_many(false),
            Action::SelectAllFiltered => self.select_many(true),
            Action::ClearSelection => {
                self.table.clear_selection();
            }
            Action::ResetView => self.reset_view(),

            // ─────────────────────────────────────────────────────────────────
            // Modals
            // ─────────────────────────────────────────────────────────────────
            Action::OpenQuitDialog => {
                self.quit_dialog.selected_rows = self.table.selection().count();
                self.modals.push(Modal::QuitConfirm);
            }
            Action::OpenHelp => {
                self.help_dialog.scroll_offset = 0;
                self.modals.push(Modal::Help);
            }
            Action::CloseModal => self.close_modal(),
        }

        self.grid.clamp_cursor(self.page_len());
        Ok(None)
    }

    fn handle_modal_key_event(&mut self, modal: &Modal, key: KeyEvent) -> Result<Option<Action>> {
        match modal {
            Modal::QuitConfirm => self.quit_dialog.handle_key_event(key),
            Modal::Filter { .. } => self.filter_dialog.handle_key_event(key),
            Modal::Help => self.help_dialog.handle_key_event(key),
        }
    }

    fn handle_search_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        let action = match key.code {
            KeyCode::Esc | KeyCode::Enter => Some(Action::ExitSearchMode),
            KeyCode::Backspace => Some(Action::SearchBackspace),
            KeyCode::Char(c) => Some(Action::SearchInput(c)),
            _ => None,
        };
        Ok(action)
    }

    fn draw_modal(&mut self, frame: &mut Frame, area: Rect, modal: &Modal) -> Result<()> {
        match modal {
            Modal::QuitConfirm => self.quit_dialog.draw(frame, area),
            Modal::Filter { .. } => self.filter_dialog.draw(frame, area),
            Modal::Help => self.help_dialog.draw(frame, area),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Bars
    // ─────────────────────────────────────────────────────────────────────────

    fn title_line(&self) -> Line<'static> {
        let dim = Style::default().fg(Color::DarkGray);
        let model = self.table.row_model();

        let mut spans = vec![
            Span::styled(
                " gridview ",
                Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!(" {} ", self.source)),
            Span::styled("│ ", dim),
        ];

        if self.table.is_manual_pagination() {
            spans.push(Span::raw(format!(
                "page {}/{} ",
                model.page_index() + 1,
                model.page_count().max(1)
            )));
        } else {
            spans.push(Span::raw(format!(
                "{} of {} rows · page {}/{} ",
                model.filtered_count(),
                self.table.rows().len(),
                model.page_index() + 1,
                model.page_count().max(1)
            )));
        }

        let sorting = self.table.sorting();
        if !sorting.is_empty() {
            let keys = sorting
                .entries()
                .iter()
                .map(|s| {
                    let arrow = match s.direction {
                        SortDirection::Asc => '▲',
                        SortDirection::Desc => '▼',
                    };
                    format!("{}{}", s.column_id, arrow)
                })
                .collect::<Vec<_>>()
                .join(", ");
            spans.push(Span::styled("│ ", dim));
            spans.push(Span::styled(format!("sort {} ", keys), Style::default().fg(Color::Yellow)));
        }

        let filters = self.table.column_filters();
        if !filters.is_empty() || self.table.global_filter().is_some() {
            let mut parts: Vec<String> = filters.iter().map(|(id, _)| id.clone()).collect();
            if let Some(query) = self.table.global_filter() {
                parts.push(format!("/{}", query));
            }
            spans.push(Span::styled("│ ", dim));
            spans.push(Span::styled(
                format!("filter {} ", parts.join(", ")),
                Style::default().fg(Color::Magenta),
            ));
        }

        let selected = self.table.selection().count();
        if selected > 0 {
            spans.push(Span::styled("│ ", dim));
            spans.push(Span::styled(
                format!("{} selected ", selected),
                Style::default().fg(Color::Green),
            ));
        }

        if self.backend.is_some() {
            spans.push(Span::styled("│ ", dim));
            spans.push(Span::styled("MANUAL ", Style::default().fg(Color::Blue)));
            if self.is_loading() {
                spans.push(Span::styled(
                    "loading… ",
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::ITALIC),
                ));
            }
        }

        Line::from(spans)
    }

    fn help_line(&self) -> Line<'static> {
        let key = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
        let pairs: &[(&str, &str)] = if self.grid.search_mode {
            &[("type", "search"), ("Enter/Esc", "done"), ("Backspace", "delete")]
        } else {
            &[
                ("j/k", "rows"),
                ("h/l", "columns"),
                ("s/S", "sort"),
                ("n/p", "page"),
                ("/", "search"),
                ("f", "filter"),
                ("Space", "select"),
                ("Enter", "expand"),
                ("?", "help"),
                ("q", "quit"),
            ]
        };

        let mut spans = Vec::new();
        if self.grid.search_mode {
            spans.push(Span::styled(
                format!(" /{}▏", self.grid.search_query),
                Style::default().fg(Color::Yellow),
            ));
        }
        for (k, label) in pairs {
            spans.push(Span::styled(format!(" {} ", k), key));
            spans.push(Span::raw(format!("{} ", label)));
        }
        Line::from(spans)
    }
}

impl Component for App {
    fn init(&mut self) -> Result<()> {
        log::info!(
            "table ready: {} columns, source {}",
            self.table.schema().len(),
            self.source
        );
        Ok(())
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        self.status_message = None;
        self.error = None;

        if let Some(modal) = self.modals.top().cloned() {
            self.handle_modal_key_event(&modal, key)
        } else if self.grid.search_mode {
            self.handle_search_key_event(key)
        } else {
            self.grid.handle_key_event(key)
        }
    }

    fn update(&mut self, action: Action) -> Result<Option<Action>> {
        if action != Action::Tick {
            log::debug!("action: {}", action);
        }
        let next = self.apply(action)?;
        self.flush_changes();
        Ok(next)
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect) -> Result<()> {
        let message = self
            .error
            .as_deref()
            .map(|e| (e.to_string(), Color::Red))
            .or_else(|| {
                self.status_message
                    .as_deref()
                    .map(|s| (s.to_string(), Color::Green))
            });
        let layout = calculate_main_layout(area, message.is_some());

        frame.render_widget(Paragraph::new(self.title_line()), layout.title);
        self.grid.draw_with_table(frame, layout.grid, &self.table);

        if let (Some(status_area), Some((text, color))) = (layout.status, message) {
            let status = Paragraph::new(Line::from(Span::styled(
                format!(" {}", text),
                Style::default().fg(color),
            )));
            frame.render_widget(status, status_area);
        }

        frame.render_widget(Paragraph::new(self.help_line()), layout.help);

        if let Some(modal) = self.modals.top().cloned() {
            self.draw_modal(frame, area, &modal)?;
        }
        Ok(())
    }
}
