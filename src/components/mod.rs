//! UI Components
//!
//! Each component encapsulates its own state, event handling, and rendering logic.
//! Components communicate through Actions rather than direct state mutation.

pub mod filter_dialog;
pub mod grid;
pub mod help_dialog;
pub mod layout;
pub mod quit_dialog;

pub use filter_dialog::{FilterChoice, FilterDialog};
pub use grid::GridComponent;
pub use help_dialog::HelpDialog;
pub use layout::{calculate_main_layout, centered_popup};
pub use quit_dialog::QuitDialog;
