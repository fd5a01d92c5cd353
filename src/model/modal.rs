//! Modal stack for overlays drawn above the grid

#[derive(Debug, Clone, PartialEq)]
pub enum Modal {
    QuitConfirm,
    /// Filter editor for one column
    Filter { column_id: String },
    Help,
}

/// Overlays in draw order; only the top one receives keys
#[derive(Debug, Default)]
pub struct ModalStack {
    stack: Vec<Modal>,
}

impl ModalStack {
    pub fn new() -> Self {
        Self { stack: Vec::new() }
    }

    pub fn push(&mut self, modal: Modal) {
        self.stack.push(modal);
    }

    pub fn pop(&mut self) -> Option<Modal> {
        self.stack.pop()
    }

    pub fn top(&self) -> Option<&Modal> {
        self.stack.last()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }
}
