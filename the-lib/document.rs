//! Rope-backed host document.
//!
//! A minimal [`HostEditor`] implementation: text, one selection and a tab
//! width for the indentation commands. Hosts embedding the bridge normally
//! adapt their own buffer type instead; this one backs the command line tool
//! and the tests.

use ropey::{
  Rope,
  RopeSlice,
};

use crate::{
  host::{
    HostCommand,
    HostEditor,
    HostError,
    Result,
  },
  position::Position,
  selection::Selection,
};

pub const DEFAULT_TAB_WIDTH: usize = 4;

#[derive(Debug, Clone)]
pub struct Document {
  text:      Rope,
  selection: Selection,
  tab_width: usize,
}

impl Default for Document {
  fn default() -> Self {
    Self::new(Rope::new())
  }
}

impl Document {
  pub fn new(text: Rope) -> Self {
    Self {
      text,
      selection: Selection::default(),
      tab_width: DEFAULT_TAB_WIDTH,
    }
  }

  pub fn from_lines<S: AsRef<str>>(lines: &[S]) -> Self {
    let text = lines
      .iter()
      .map(AsRef::as_ref)
      .collect::<Vec<_>>()
      .join("\n");
    Self::new(Rope::from_str(&text))
  }

  pub fn with_tab_width(mut self, tab_width: usize) -> Self {
    self.tab_width = tab_width.max(1);
    self
  }

  pub fn text(&self) -> &Rope {
    &self.text
  }

  pub fn lines(&self) -> Vec<String> {
    self.text.to_string().split('\n').map(String::from).collect()
  }

  pub fn tab_width(&self) -> usize {
    self.tab_width
  }

  fn line_len(line: RopeSlice<'_>) -> usize {
    let len = line.len_chars();
    if len >= 2 && line.char(len - 2) == '\r' && line.char(len - 1) == '\n' {
      len - 2
    } else if len >= 1 && line.char(len - 1) == '\n' {
      len - 1
    } else {
      len
    }
  }

  fn char_idx(&self, pos: Position) -> Result<usize> {
    if pos.row >= self.text.len_lines() || pos.col > self.line_max_column(pos.row) {
      return Err(HostError::OutOfBounds(pos));
    }
    Ok(self.text.line_to_char(pos.row) + pos.col)
  }

  fn clamp(&self, pos: Position) -> Position {
    let row = pos.row.min(self.text.len_lines().saturating_sub(1));
    Position::new(row, pos.col.min(self.line_max_column(row)))
  }

  fn clamp_selection(&mut self) {
    self.selection = Selection::new(
      self.clamp(self.selection.anchor),
      self.clamp(self.selection.head),
    );
  }

  fn map_indentation(&mut self, convert: impl Fn(usize, usize) -> String) {
    let tab_width = self.tab_width;
    let source = self.text.to_string();
    let mut out = String::with_capacity(source.len());

    for line in source.split_inclusive('\n') {
      let indent_len = line
        .find(|ch: char| ch != ' ' && ch != '\t')
        .unwrap_or_else(|| line.trim_end_matches(['\r', '\n']).len());
      let (indent, rest) = line.split_at(indent_len);

      let width = indent.chars().fold(0, |width, ch| {
        match ch {
          '\t' => (width / tab_width + 1) * tab_width,
          _ => width + 1,
        }
      });
      out.push_str(&convert(width, tab_width));
      out.push_str(rest);
    }

    self.text = Rope::from_str(&out);
    self.clamp_selection();
  }
}

/// Position reached after inserting `text` at `start`.
fn advance(start: Position, text: &str) -> Position {
  match text.rfind('\n') {
    Some(last_newline) => {
      Position::new(
        start.row + text.matches('\n').count(),
        text[last_newline + 1..].chars().count(),
      )
    },
    None => Position::new(start.row, start.col + text.chars().count()),
  }
}

impl HostEditor for Document {
  fn text(&self) -> String {
    self.text.to_string()
  }

  fn line_count(&self) -> usize {
    self.text.len_lines()
  }

  fn line_max_column(&self, line: usize) -> usize {
    if line >= self.text.len_lines() {
      return 0;
    }
    Self::line_len(self.text.line(line))
  }

  fn replace(&mut self, from: Position, to: Position, text: &str) -> Result<()> {
    let (from, to) = (from.min(to), from.max(to));
    let start = self.char_idx(from)?;
    let end = self.char_idx(to)?;

    self.text.remove(start..end);
    self.text.insert(start, text);
    self.clamp_selection();
    Ok(())
  }

  fn selection(&self) -> Selection {
    self.selection
  }

  fn set_selection(&mut self, selection: Selection) -> Result<()> {
    self.selection = Selection::new(self.clamp(selection.anchor), self.clamp(selection.head));
    Ok(())
  }

  fn execute_command(&mut self, command: HostCommand) -> Result<()> {
    match command {
      HostCommand::IndentationToSpaces => {
        self.map_indentation(|width, _| " ".repeat(width));
      },
      HostCommand::IndentationToTabs => {
        self.map_indentation(|width, tab_width| {
          let mut indent = "\t".repeat(width / tab_width);
          indent.push_str(&" ".repeat(width % tab_width));
          indent
        });
      },
      HostCommand::Paste(text) => {
        let from = self.selection.from();
        self.replace(from, self.selection.to(), &text)?;
        self.selection = Selection::point(advance(from, &text));
      },
    }
    Ok(())
  }
}
