//! The slice of a host editor the engine bridge reads and drives.

use thiserror::Error;

use crate::{
  position::Position,
  selection::Selection,
};

#[derive(Debug, Error)]
pub enum HostError {
  #[error("position {0} is outside the document")]
  OutOfBounds(Position),
  #[error("host command {0} is not supported")]
  UnsupportedCommand(&'static str),
  #[error("host error: {0}")]
  Other(String),
}

pub type Result<T> = std::result::Result<T, HostError>;

/// Named host commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCommand {
  /// Rewrite leading tabs as spaces.
  IndentationToSpaces,
  /// Rewrite leading runs of spaces as tabs.
  IndentationToTabs,
  /// Insert text over the current selection.
  Paste(String),
}

impl HostCommand {
  pub fn name(&self) -> &'static str {
    match self {
      Self::IndentationToSpaces => "indentation-to-spaces",
      Self::IndentationToTabs => "indentation-to-tabs",
      Self::Paste(_) => "paste",
    }
  }
}

pub trait HostEditor {
  /// Full buffer text, lines separated by `\n`.
  fn text(&self) -> String;
  fn line_count(&self) -> usize;
  /// Number of characters on `line`, excluding its line ending.
  fn line_max_column(&self, line: usize) -> usize;
  fn replace(&mut self, from: Position, to: Position, text: &str) -> Result<()>;
  fn selection(&self) -> Selection;
  fn set_selection(&mut self, selection: Selection) -> Result<()>;
  fn execute_command(&mut self, command: HostCommand) -> Result<()>;

  /// The span covering the whole buffer.
  fn full_range(&self) -> (Position, Position) {
    let last = self.line_count().saturating_sub(1);
    (
      Position::zero(),
      Position::new(last, self.line_max_column(last)),
    )
  }
}
