//! Editor-side state for the modal engine bridge: registers, clipboard,
//! positions, marks and the host editor interface.

pub mod clipboard;
pub mod document;
pub mod host;
pub mod mark;
pub mod messages;
pub mod position;
pub mod registers;
pub mod selection;
