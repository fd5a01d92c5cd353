//! Component trait
//!
//! Screens and dialogs turn key events into [`Action`]s, apply actions to
//! their own state and render themselves. The table itself lives in the
//! root `App`; components that need it receive it when drawing.

use crate::action::Action;
use anyhow::Result;
use crossterm::event::KeyEvent;
use ratatui::{layout::Rect, Frame};

pub trait Component {
    fn init(&mut self) -> Result<()> {
        Ok(())
    }

    /// Map a key press to an action. Should not change visible state.
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        let _ = key;
        Ok(None)
    }

    /// Apply an action, optionally chaining into another
    fn update(&mut self, action: Action) -> Result<Option<Action>> {
        let _ = action;
        Ok(None)
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect) -> Result<()>;
}
