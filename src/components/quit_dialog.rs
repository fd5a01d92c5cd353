//! Quit confirmation dialog

use crate::action::Action;
use crate::component::Component;
use crate::components::centered_popup;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

#[derive(Default)]
pub struct QuitDialog {
    /// Rows selected when the dialog opened; the selection is lost on quit
    pub selected_rows: usize,
}

impl Component for QuitDialog {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        let action = match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Char('q') => Some(Action::ForceQuit),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => Some(Action::CloseModal),
            _ => None,
        };
        Ok(action)
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect) -> Result<()> {
        let popup_area = centered_popup(area, 44, 8);
        frame.render_widget(Clear, popup_area);

        let warning = if self.selected_rows > 0 {
            Line::from(Span::styled(
                format!("{} selected rows will be discarded", self.selected_rows),
                Style::default().fg(Color::Red),
            ))
        } else {
            Line::from("")
        };

        let content = vec![
            Line::from(""),
            Line::from(Span::styled(
                "Quit gridview?",
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            )),
            warning,
            Line::from(vec![
                Span::styled(" y ", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
                Span::raw("Quit  "),
                Span::styled(" n/Esc ", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
                Span::raw("Stay"),
            ]),
        ];

        let paragraph = Paragraph::new(content)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Yellow))
                    .title(" Quit? ")
                    .title_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
            )
            .alignment(Alignment::Center);

        frame.render_widget(paragraph, popup_area);
        Ok(())
    }
}
