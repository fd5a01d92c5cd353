//! Column filter dialog
//!
//! Select columns get a list of their values with row counts; several can
//! be marked at once. Text columns get an input line, read as a `min..max`
//! range for number-range columns.

use crate::action::Action;
use crate::component::Component;
use crate::components::centered_popup;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use gridview::table::FilterValue;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
    Frame,
};
use std::collections::BTreeSet;

/// One selectable value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterChoice {
    pub value: String,
    pub label: String,
    /// Matching rows, when known
    pub count: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
enum Editor {
    Select {
        choices: Vec<FilterChoice>,
        marked: BTreeSet<String>,
    },
    Text {
        input: String,
        range: bool,
    },
}

pub struct FilterDialog {
    pub column_id: String,
    header: String,
    editor: Editor,
    /// Index 0 is the "Clear filter" entry
    selected_index: usize,
    list_state: ListState,
}

impl Default for FilterDialog {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterDialog {
    pub fn new() -> Self {
        Self {
            column_id: String::new(),
            header: String::new(),
            editor: Editor::Text {
                input: String::new(),
                range: false,
            },
            selected_index: 0,
            list_state: ListState::default(),
        }
    }

    pub fn open_select(
        &mut self,
        column_id: &str,
        header: &str,
        choices: Vec<FilterChoice>,
        current: Option<&FilterValue>,
    ) {
        let marked: BTreeSet<String> = match current {
            Some(FilterValue::Text(value)) => BTreeSet::from([value.clone()]),
            Some(FilterValue::OneOf(values)) => values.clone(),
            _ => BTreeSet::new(),
        };
        self.selected_index = choices
            .iter()
            .position(|c| marked.contains(&c.value))
            .map_or(0, |i| i + 1);
        self.list_state.select(Some(self.selected_index));
        self.column_id = column_id.to_string();
        self.header = header.to_string();
        self.editor = Editor::Select { choices, marked };
    }

    pub fn open_text(&mut self, column_id: &str, header: &str, range: bool, current: Option<&FilterValue>) {
        let input = match current {
            Some(FilterValue::Text(text)) => text.clone(),
            Some(FilterValue::Range { min, max }) => format_range(*min, *max),
            _ => String::new(),
        };
        self.column_id = column_id.to_string();
        self.header = header.to_string();
        self.editor = Editor::Text { input, range };
    }

    /// Filter value the dialog would apply right now
    pub fn value(&self) -> Option<FilterValue> {
        match &self.editor {
            Editor::Select { choices, marked } => {
                if self.selected_index == 0 && marked.is_empty() {
                    None
                } else if !marked.is_empty() {
                    Some(FilterValue::OneOf(marked.clone()))
                } else {
                    choices
                        .get(self.selected_index - 1)
                        .map(|c| FilterValue::text(c.value.clone()))
                }
            }
            Editor::Text { input, range: true } => parse_range(input),
            Editor::Text { input, range: false } if input.is_empty() => None,
            Editor::Text { input, .. } => Some(FilterValue::text(input.clone())),
        }
    }

    fn select_next(&mut self) {
        if let Editor::Select { choices, .. } = &self.editor {
            if self.selected_index < choices.len() {
                self.selected_index += 1;
                self.list_state.select(Some(self.selected_index));
            }
        }
    }

    fn select_prev(&mut self) {
        if self.selected_index > 0 {
            self.selected_index -= 1;
            self.list_state.select(Some(self.selected_index));
        }
    }

    fn toggle_mark(&mut self) {
        if let Editor::Select { choices, marked } = &mut self.editor {
            if self.selected_index == 0 {
                marked.clear();
            } else if let Some(choice) = choices.get(self.selected_index - 1) {
                if !marked.remove(&choice.value) {
                    marked.insert(choice.value.clone());
                }
            }
        }
    }

    fn apply(&self) -> Action {
        Action::SetColumnFilter(self.column_id.clone(), self.value())
    }
}

impl Component for FilterDialog {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if matches!(self.editor, Editor::Select { .. }) {
            let action = match key.code {
                KeyCode::Esc | KeyCode::Char('f') => Some(Action::CloseModal),
                KeyCode::Enter => Some(self.apply()),
                KeyCode::Char(' ') => {
                    self.toggle_mark();
                    None
                }
                KeyCode::Up | KeyCode::Char('k') => {
                    self.select_prev();
                    None
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    self.select_next();
                    None
                }
                _ => None,
            };
            return Ok(action);
        }

        let action = match key.code {
            KeyCode::Esc => Some(Action::CloseModal),
            KeyCode::Enter => Some(self.apply()),
            KeyCode::Backspace => {
                if let Editor::Text { input, .. } = &mut self.editor {
                    input.pop();
                }
                None
            }
            KeyCode::Char(c) => {
                if let Editor::Text { input, .. } = &mut self.editor {
                    input.push(c);
                }
                None
            }
            _ => None,
        };
        Ok(action)
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect) -> Result<()> {
        let content_height = match &self.editor {
            Editor::Select { choices, .. } => choices.len() as u16 + 3,
            Editor::Text { .. } => 3,
        };
        let popup_width = 50u16.min(area.width.saturating_sub(4));
        let popup_height = (content_height + 6).min(area.height.saturating_sub(4)).max(9);
        let popup_area = centered_popup(area, popup_width, popup_height);
        frame.render_widget(Clear, popup_area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(3),
                Constraint::Length(3),
            ])
            .split(popup_area);

        let current = match self.value() {
            Some(value) => describe(&value),
            None => "No filter".to_string(),
        };
        let header = Paragraph::new(Line::from(Span::styled(
            current,
            Style::default().fg(Color::Cyan),
        )))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" Filter: {} ", self.header))
                .title_style(Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD)),
        );
        frame.render_widget(header, chunks[0]);

        let help = match &self.editor {
            Editor::Select { choices, marked } => {
                let mut items = vec![ListItem::new(Line::from(vec![
                    Span::styled(
                        if marked.is_empty() { "● " } else { "  " },
                        Style::default().fg(Color::Green),
                    ),
                    Span::styled("Clear filter", Style::default().fg(Color::DarkGray)),
                ]))];
                for choice in choices {
                    let is_marked = marked.contains(&choice.value);
                    let count = choice.count.map(|n| format!(" ({})", n)).unwrap_or_default();
                    items.push(ListItem::new(Line::from(vec![
                        Span::styled(
                            if is_marked { "● " } else { "  " },
                            Style::default().fg(Color::Green),
                        ),
                        Span::raw(choice.label.clone()),
                        Span::styled(count, Style::default().fg(Color::DarkGray)),
                    ])));
                }

                let list = List::new(items)
                    .block(
                        Block::default()
                            .borders(Borders::ALL)
                            .border_style(Style::default().fg(Color::DarkGray)),
                    )
                    .highlight_style(
                        Style::default()
                            .bg(Color::Blue)
                            .fg(Color::White)
                            .add_modifier(Modifier::BOLD),
                    )
                    .highlight_symbol("▶ ");
                frame.render_stateful_widget(list, chunks[1], &mut self.list_state);

                vec![
                    Span::styled(" Enter ", Style::default().fg(Color::Yellow)),
                    Span::raw("Apply  "),
                    Span::styled(" Space ", Style::default().fg(Color::Green)),
                    Span::raw("Mark  "),
                    Span::styled(" Esc ", Style::default().fg(Color::Yellow)),
                    Span::raw("Cancel"),
                ]
            }
            Editor::Text { input, range } => {
                let hint = if *range { "min..max" } else { "text" };
                let line = Paragraph::new(Line::from(vec![
                    Span::raw(input.clone()),
                    Span::styled("█", Style::default().fg(Color::Cyan)),
                ]))
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(Color::DarkGray))
                        .title(format!(" {} ", hint)),
                );
                frame.render_widget(line, chunks[1]);

                vec![
                    Span::styled(" Enter ", Style::default().fg(Color::Yellow)),
                    Span::raw("Apply  "),
                    Span::styled(" Esc ", Style::default().fg(Color::Yellow)),
                    Span::raw("Cancel"),
                ]
            }
        };

        let help = Paragraph::new(Line::from(help))
            .alignment(ratatui::layout::Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(help, chunks[2]);

        Ok(())
    }
}

/// Short human form of a filter value
pub fn describe(value: &FilterValue) -> String {
    match value {
        FilterValue::Text(text) => format!("\"{}\"", text),
        FilterValue::Range { min, max } => format_range(*min, *max),
        FilterValue::OneOf(values) => values.iter().cloned().collect::<Vec<_>>().join(" | "),
    }
}

fn format_range(min: Option<f64>, max: Option<f64>) -> String {
    let side = |v: Option<f64>| v.map(|n| n.to_string()).unwrap_or_default();
    format!("{}..{}", side(min), side(max))
}

/// Parse `min..max`, `min..`, `..max` or a single number
pub fn parse_range(input: &str) -> Option<FilterValue> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    let bound = |s: &str| -> Option<Option<f64>> {
        let s = s.trim();
        if s.is_empty() {
            Some(None)
        } else {
            s.parse::<f64>().ok().map(Some)
        }
    };
    let (min, max) = match input.split_once("..") {
        Some((lo, hi)) => (bound(lo)?, bound(hi)?),
        None => {
            let exact = bound(input)?;
            (exact, exact)
        }
    };
    let value = FilterValue::range(min, max);
    (!value.is_empty()).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn press(dialog: &mut FilterDialog, code: KeyCode) -> Option<Action> {
        dialog
            .handle_key_event(KeyEvent::new(code, KeyModifiers::NONE))
            .unwrap()
    }

    fn choices() -> Vec<FilterChoice> {
        ["open", "paid", "void"]
            .into_iter()
            .map(|v| FilterChoice {
                value: v.to_string(),
                label: v.to_string(),
                count: None,
            })
            .collect()
    }

    #[test]
    fn test_parse_range() {
        assert_eq!(parse_range("10..20"), Some(FilterValue::range(Some(10.0), Some(20.0))));
        assert_eq!(parse_range("..5"), Some(FilterValue::range(None, Some(5.0))));
        assert_eq!(parse_range("7"), Some(FilterValue::range(Some(7.0), Some(7.0))));
        assert_eq!(parse_range(".."), None);
        assert_eq!(parse_range("abc"), None);
        assert_eq!(parse_range(""), None);
    }

    #[test]
    fn test_select_single_value() {
        let mut dialog = FilterDialog::new();
        dialog.open_select("status", "Status", choices(), None);
        press(&mut dialog, KeyCode::Down);
        press(&mut dialog, KeyCode::Down);
        let action = press(&mut dialog, KeyCode::Enter);
        assert_eq!(
            action,
            Some(Action::SetColumnFilter("status".to_string(), Some(FilterValue::text("paid"))))
        );
    }

    #[test]
    fn test_select_marked_values() {
        let mut dialog = FilterDialog::new();
        dialog.open_select("status", "Status", choices(), None);
        press(&mut dialog, KeyCode::Down);
        press(&mut dialog, KeyCode::Char(' '));
        press(&mut dialog, KeyCode::Down);
        press(&mut dialog, KeyCode::Down);
        press(&mut dialog, KeyCode::Char(' '));
        assert_eq!(dialog.value(), Some(FilterValue::one_of(["open", "void"])));
    }

    #[test]
    fn test_clear_entry_resets() {
        let mut dialog = FilterDialog::new();
        dialog.open_select("status", "Status", choices(), Some(&FilterValue::text("void")));
        assert_eq!(dialog.value(), Some(FilterValue::OneOf(BTreeSet::from(["void".to_string()]))));

        for _ in 0..3 {
            press(&mut dialog, KeyCode::Up);
        }
        press(&mut dialog, KeyCode::Char(' '));
        assert_eq!(dialog.value(), None);
    }

    #[test]
    fn test_text_input() {
        let mut dialog = FilterDialog::new();
        dialog.open_text("name", "Name", false, None);
        for c in "adx".chars() {
            press(&mut dialog, KeyCode::Char(c));
        }
        press(&mut dialog, KeyCode::Backspace);
        assert_eq!(dialog.value(), Some(FilterValue::text("ad")));
        assert_eq!(press(&mut dialog, KeyCode::Esc), Some(Action::CloseModal));
    }
}
