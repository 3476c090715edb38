//! Host-side state that travels across a bridge cycle.

use the_lib::{
  host::HostEditor,
  mark::Marks,
  position::Position,
  registers::{
    RegisterContent,
    RegisterMode,
    Registers,
  },
  selection::Selection,
};
use tracing::warn;

/// Cursor, selection anchor and marks as the bridge tracks them.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EditorState {
  pub cursor:       Position,
  /// Anchor of the visual selection. Equal to `cursor` when nothing is
  /// selected.
  pub cursor_start: Position,
  pub marks:        Marks,
}

impl EditorState {
  pub fn new(cursor: Position) -> Self {
    Self {
      cursor,
      cursor_start: cursor,
      marks: Marks::new(),
    }
  }

  pub fn from_selection(selection: Selection) -> Self {
    Self {
      cursor:       selection.head,
      cursor_start: selection.anchor,
      marks:        Marks::new(),
    }
  }

  pub fn with_marks(mut self, marks: Marks) -> Self {
    self.marks = marks;
    self
  }

  pub fn selection(&self) -> Selection {
    Selection::new(self.cursor_start, self.cursor)
  }

  pub fn collapse_to(&mut self, position: Position) {
    self.cursor = position;
    self.cursor_start = position;
  }
}

/// Everything one synchronization pass operates on.
pub struct SyncContext<'a> {
  pub editor:    &'a mut dyn HostEditor,
  pub state:     &'a mut EditorState,
  pub registers: &'a mut Registers,
}

impl<'a> SyncContext<'a> {
  pub fn new(
    editor: &'a mut dyn HostEditor,
    state: &'a mut EditorState,
    registers: &'a mut Registers,
  ) -> Self {
    Self {
      editor,
      state,
      registers,
    }
  }
}

/// What a pull brought back from the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PulledState {
  pub lines:    Vec<String>,
  pub cursor:   Position,
  pub register: RegisterContent,
}

/// `setreg()` type for a register mode.
pub fn regtype_code(mode: RegisterMode) -> &'static str {
  match mode {
    RegisterMode::CharacterWise => "c",
    RegisterMode::LineWise => "l",
    RegisterMode::BlockWise => "b",
  }
}

/// Mode for a `getregtype()` result. Block-wise types carry their width
/// after the leading `^V`, so only the first character is matched.
pub fn register_mode_from_regtype(regtype: &str) -> RegisterMode {
  match regtype.chars().next() {
    Some('v') => RegisterMode::CharacterWise,
    Some('V') => RegisterMode::LineWise,
    Some('\u{16}') => RegisterMode::BlockWise,
    _ => {
      warn!(regtype = ?regtype, "unknown register type, using character-wise");
      RegisterMode::CharacterWise
    },
  }
}
