//! Grid component
//!
//! Draws the current row window of the table with sort indicators, row
//! markers and expanded detail lines, and tracks the cursor and the focused
//! column.

use crate::action::Action;
use crate::component::Component;
use crate::services::CsvRecord;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use gridview::table::{RowId, SortDirection, SortState, Table};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const SEPARATOR: &str = " │ ";
/// Selection and expansion markers in front of every row
const MARKER_WIDTH: usize = 4;

#[derive(Default)]
pub struct GridComponent {
    /// Cursor position within the current page
    pub cursor: usize,
    pub focused_column: usize,
    pub search_mode: bool,
    pub search_query: String,
    scroll: usize,
}

impl GridComponent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cursor_down(&mut self, page_len: usize) {
        if self.cursor + 1 < page_len {
            self.cursor += 1;
        }
    }

    pub fn cursor_up(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    /// Keep the cursor on a row after the window changed
    pub fn clamp_cursor(&mut self, page_len: usize) {
        self.cursor = self.cursor.min(page_len.saturating_sub(1));
    }

    pub fn focus_next(&mut self, column_count: usize) {
        if self.focused_column + 1 < column_count {
            self.focused_column += 1;
        }
    }

    pub fn focus_prev(&mut self) {
        self.focused_column = self.focused_column.saturating_sub(1);
    }

    pub fn focused_column_id<'a>(&self, table: &'a Table<CsvRecord>) -> Option<&'a str> {
        table
            .schema()
            .columns()
            .get(self.focused_column)
            .map(|c| c.id.as_str())
    }

    pub fn cursor_row_id(&self, table: &Table<CsvRecord>) -> Option<RowId> {
        let index = *table.row_model().page_rows().get(self.cursor)?;
        table.row_id(index).cloned()
    }

    pub fn enter_search_mode(&mut self, current: Option<&str>) {
        self.search_mode = true;
        self.search_query = current.unwrap_or_default().to_string();
    }

    pub fn exit_search_mode(&mut self) {
        self.search_mode = false;
    }

    /// Draw the grid for `table`
    pub fn draw_with_table(&mut self, frame: &mut Frame, area: Rect, table: &Table<CsvRecord>) {
        let widths = column_widths(table);
        let columns = table.schema().columns();
        let sorting = table.sorting();

        let mut lines: Vec<Line> = Vec::new();

        let mut header = vec![Span::raw(" ".repeat(MARKER_WIDTH))];
        for (i, column) in columns.iter().enumerate() {
            let mut label = column.header.clone();
            label.push_str(&sort_indicator(sorting, &column.id));
            if table.column_filters().contains(&column.id) {
                label.push('*');
            }
            let mut style = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
            if i == self.focused_column {
                style = style.add_modifier(Modifier::REVERSED);
            }
            header.push(Span::styled(fit_cell(&label, widths[i]), style));
            header.push(Span::raw(SEPARATOR));
        }
        lines.push(Line::from(header));

        let rule = widths
            .iter()
            .map(|w| "─".repeat(*w))
            .collect::<Vec<_>>()
            .join("─┼─");
        lines.push(Line::from(Span::styled(
            format!("{}{}", "─".repeat(MARKER_WIDTH), rule),
            Style::default().fg(Color::DarkGray),
        )));

        let rows = table.page_rows();
        if rows.is_empty() {
            lines.push(Line::from(Span::styled(
                "  No rows match the current filters",
                Style::default().fg(Color::Yellow),
            )));
        }

        let mut cursor_line = 0;
        for (position, row) in rows.iter().enumerate() {
            let is_cursor = position == self.cursor;
            if is_cursor {
                cursor_line = lines.len();
            }

            let marker = format!(
                " {}{} ",
                if row.selected { '●' } else { ' ' },
                if row.expanded { '▾' } else { '▸' }
            );
            let mut spans = vec![Span::styled(marker, Style::default().fg(Color::Green))];
            for (i, column) in columns.iter().enumerate() {
                spans.push(Span::raw(fit_cell(&column.render(row.record), widths[i])));
                spans.push(Span::raw(SEPARATOR));
            }

            let mut line = Line::from(spans);
            if is_cursor {
                line = line.style(Style::default().bg(Color::Blue).fg(Color::White));
            } else if row.selected {
                line = line.style(Style::default().fg(Color::Green));
            }
            lines.push(line);

            if row.expanded {
                for column in columns {
                    lines.push(Line::from(vec![
                        Span::raw(" ".repeat(MARKER_WIDTH + 2)),
                        Span::styled(
                            format!("{}: ", column.header),
                            Style::default().fg(Color::DarkGray),
                        ),
                        Span::raw(column.render(row.record)),
                    ]));
                }
            }
        }

        let model = table.row_model();
        let first = model.page_index() * table.pagination().page_size;
        let title = if rows.is_empty() {
            " 0 rows ".to_string()
        } else if table.is_manual_pagination() {
            format!(" page {} ({} rows) ", model.page_index() + 1, rows.len())
        } else {
            format!(
                " rows {}-{} of {} ",
                first + 1,
                first + rows.len(),
                model.filtered_count()
            )
        };

        // Keep the cursor line inside the visible part of the block
        let visible = area.height.saturating_sub(2) as usize;
        if visible > 0 {
            if cursor_line < self.scroll + 2 {
                self.scroll = cursor_line.saturating_sub(2);
            } else if cursor_line >= self.scroll + visible {
                self.scroll = cursor_line + 1 - visible;
            }
        }

        let paragraph = Paragraph::new(lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::DarkGray))
                    .title(title),
            )
            .scroll((self.scroll as u16, 0));
        frame.render_widget(paragraph, area);
    }
}

impl Component for GridComponent {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        let action = match key.code {
            KeyCode::Char('j') | KeyCode::Down => Some(Action::CursorDown),
            KeyCode::Char('k') | KeyCode::Up => Some(Action::CursorUp),
            KeyCode::Char('l') | KeyCode::Right => Some(Action::FocusNextColumn),
            KeyCode::Char('h') | KeyCode::Left => Some(Action::FocusPrevColumn),

            KeyCode::Char('s') => Some(Action::ToggleSort),
            KeyCode::Char('S') => Some(Action::ToggleMultiSort),
            KeyCode::Char('c') => Some(Action::ClearSorting),

            KeyCode::Char('n') | KeyCode::PageDown => Some(Action::NextPage),
            KeyCode::Char('p') | KeyCode::PageUp => Some(Action::PrevPage),
            KeyCode::Char('g') | KeyCode::Home => Some(Action::FirstPage),
            KeyCode::Char('G') | KeyCode::End => Some(Action::LastPage),
            KeyCode::Char('+') => Some(Action::GrowPageSize),
            KeyCode::Char('-') => Some(Action::ShrinkPageSize),

            KeyCode::Char('/') => Some(Action::EnterSearchMode),
            KeyCode::Char('f') => Some(Action::OpenFilter),
            KeyCode::Char('x') => Some(Action::ClearFilters),

            KeyCode::Enter => Some(Action::ToggleExpansion),
            KeyCode::Char('e') => Some(Action::ExpandAll),
            KeyCode::Char('E') => Some(Action::CollapseAll),
            KeyCode::Char(' ') => Some(Action::ToggleSelection),
            KeyCode::Char('a') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(Action::SelectPage)
            }
            KeyCode::Char('A') => Some(Action::SelectAllFiltered),
            KeyCode::Esc => Some(Action::ClearSelection),
            KeyCode::Char('r') => Some(Action::ResetView),

            KeyCode::Char('?') => Some(Action::OpenHelp),
            KeyCode::Char('q') => Some(Action::OpenQuitDialog),
            _ => None,
        };
        Ok(action)
    }

    fn draw(&mut self, _frame: &mut Frame, _area: Rect) -> Result<()> {
        // Needs the table, see draw_with_table
        Ok(())
    }
}

/// `▲`/`▼` for sorted columns, with the key's rank when several are active
pub fn sort_indicator(sorting: &SortState, column_id: &str) -> String {
    let Some(position) = sorting.position(column_id) else {
        return String::new();
    };
    let arrow = match sorting.entries()[position].direction {
        SortDirection::Asc => '▲',
        SortDirection::Desc => '▼',
    };
    if sorting.len() > 1 {
        format!(" {}{}", arrow, position + 1)
    } else {
        format!(" {}", arrow)
    }
}

/// Display width for each column of the current window
pub fn column_widths(table: &Table<CsvRecord>) -> Vec<usize> {
    let rows = table.row_model().page_rows();
    table
        .schema()
        .iter()
        .map(|column| {
            let header = column.header.width() + sort_indicator(table.sorting(), &column.id).width() + 1;
            let widest_cell = rows
                .iter()
                .filter_map(|&i| table.row(i))
                .map(|r| column.render(r).width())
                .max()
                .unwrap_or(column.size.pref as usize);
            let natural = header.max(widest_cell).min(u16::MAX as usize) as u16;
            column.size.clamp(natural) as usize
        })
        .collect()
}

/// Pad or cut `text` to exactly `width` terminal cells
pub fn fit_cell(text: &str, width: usize) -> String {
    if text.width() <= width {
        let mut cell = text.to_string();
        cell.push_str(&" ".repeat(width - text.width()));
        return cell;
    }

    let mut cell = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        cell.push(c);
        used += w;
    }
    if width > 0 {
        cell.push('…');
        used += 1;
    }
    cell.push_str(&" ".repeat(width.saturating_sub(used)));
    cell
}
