//! UI state that does not belong to a single component

pub mod modal;

pub use modal::{Modal, ModalStack};
