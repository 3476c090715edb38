//! Register storage and clipboard integration.
//!
//! Registers are a small key-value store keyed by a `char`, each slot holding
//! text plus the wise-mode it was captured with. Some registers have special
//! behavior:
//!
//! - `"`: unnamed, the target when no register is given
//! - `a`-`z`: named; `A`-`Z` append to the same slot
//! - `0`: last yank
//! - `1`-`9`: delete history, newest first
//! - `-`: last small (within one line) delete
//! - `_`: black hole (discard writes, read empty)
//! - `*`, `+`: system clipboard, never stored locally
//! - `:`, `.`, `%`: read-only, recorded by the host

use std::{
  borrow::Cow,
  collections::HashMap,
  fmt,
  sync::Arc,
};

use thiserror::Error;

use crate::clipboard::{
  ClipboardError,
  ClipboardProvider,
  NoClipboard,
};

#[derive(Debug, Error)]
pub enum RegisterError {
  #[error("invalid register name {0:?}")]
  InvalidName(char),
  #[error("register {0} does not support writing")]
  WriteNotSupported(char),
  #[error(transparent)]
  Clipboard(#[from] ClipboardError),
}

pub type Result<T> = std::result::Result<T, RegisterError>;

/// Whether a span of text is a run of characters, whole lines, or a block.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterMode {
  #[default]
  CharacterWise,
  LineWise,
  BlockWise,
}

impl RegisterMode {
  /// Mode of two pieces joined by an append. Lines win over blocks, blocks
  /// over characters.
  pub fn combine(self, other: Self) -> Self {
    match (self, other) {
      (Self::LineWise, _) | (_, Self::LineWise) => Self::LineWise,
      (Self::BlockWise, _) | (_, Self::BlockWise) => Self::BlockWise,
      _ => Self::CharacterWise,
    }
  }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RegisterContent {
  pub text: String,
  pub mode: RegisterMode,
}

impl RegisterContent {
  pub fn new(text: impl Into<String>, mode: RegisterMode) -> Self {
    Self {
      text: text.into(),
      mode,
    }
  }

  pub fn empty() -> Self {
    Self::default()
  }

  /// Empty content means "nothing to paste".
  pub fn is_empty(&self) -> bool {
    self.text.is_empty()
  }

  fn append(&mut self, other: RegisterContent) {
    let separate = self.mode == RegisterMode::LineWise || other.mode == RegisterMode::LineWise;
    if separate && !self.text.is_empty() && !self.text.ends_with('\n') {
      self.text.push('\n');
    }
    self.text.push_str(&other.text);
    if other.mode == RegisterMode::LineWise && !self.text.ends_with('\n') {
      self.text.push('\n');
    }
    self.mode = self.mode.combine(other.mode);
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterName {
  Unnamed,
  /// `a`-`z`, stored lowercase. `append` is set for the upper-case spelling.
  Named { name: char, append: bool },
  /// `0`-`9`.
  Numbered(u8),
  SmallDelete,
  BlackHole,
  /// `*`
  Selection,
  /// `+`
  Clipboard,
  /// `:`
  LastCommand,
  /// `.`
  LastInserted,
  /// `%`
  FileName,
}

impl RegisterName {
  pub const UNNAMED: char = '"';

  pub fn from_char(ch: char) -> Result<Self> {
    let name = match ch {
      '"' => Self::Unnamed,
      'a'..='z' => Self::Named {
        name:   ch,
        append: false,
      },
      'A'..='Z' => Self::Named {
        name:   ch.to_ascii_lowercase(),
        append: true,
      },
      '0'..='9' => Self::Numbered(ch as u8 - b'0'),
      '-' => Self::SmallDelete,
      '_' => Self::BlackHole,
      '*' => Self::Selection,
      '+' => Self::Clipboard,
      ':' => Self::LastCommand,
      '.' => Self::LastInserted,
      '%' => Self::FileName,
      _ => return Err(RegisterError::InvalidName(ch)),
    };
    Ok(name)
  }

  /// The storage key. Append spellings share the slot of their lower-case
  /// register.
  pub fn slot(self) -> char {
    match self {
      Self::Unnamed => Self::UNNAMED,
      Self::Named { name, .. } => name,
      Self::Numbered(n) => (b'0' + n) as char,
      Self::SmallDelete => '-',
      Self::BlackHole => '_',
      Self::Selection => '*',
      Self::Clipboard => '+',
      Self::LastCommand => ':',
      Self::LastInserted => '.',
      Self::FileName => '%',
    }
  }

  pub fn is_clipboard(self) -> bool {
    matches!(self, Self::Selection | Self::Clipboard)
  }

  pub fn is_read_only(self) -> bool {
    matches!(self, Self::LastCommand | Self::LastInserted | Self::FileName)
  }
}

impl TryFrom<char> for RegisterName {
  type Error = RegisterError;

  fn try_from(ch: char) -> Result<Self> {
    Self::from_char(ch)
  }
}

impl fmt::Display for RegisterName {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Named { name, append: true } => write!(f, "{}", name.to_ascii_uppercase()),
      other => write!(f, "{}", other.slot()),
    }
  }
}

/// The register-related part of a command invocation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RegisterContext {
  /// Register named by the command (`"x`), if any.
  pub register: Option<RegisterName>,
  /// Wise-mode of the text the command operated on.
  pub mode:     RegisterMode,
}

impl RegisterContext {
  pub fn unnamed(mode: RegisterMode) -> Self {
    Self {
      register: None,
      mode,
    }
  }

  pub fn named(register: RegisterName, mode: RegisterMode) -> Self {
    Self {
      register: Some(register),
      mode,
    }
  }

  pub fn target(&self) -> RegisterName {
    self.register.unwrap_or(RegisterName::Unnamed)
  }
}

/// Completion of an operator that feeds the numbered history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterEvent {
  DeleteCompleted {
    content:         RegisterContent,
    /// The deleted span lies within one line and is shorter than it.
    within_one_line: bool,
  },
  YankCompleted {
    content: RegisterContent,
  },
}

pub struct Registers {
  inner:              HashMap<char, RegisterContent>,
  clipboard_provider: Arc<dyn ClipboardProvider>,
}

impl Default for Registers {
  fn default() -> Self {
    Self::new()
  }
}

impl fmt::Debug for Registers {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Registers")
      .field("inner", &self.inner)
      .field("clipboard_provider", &self.clipboard_provider.name())
      .finish()
  }
}

impl Registers {
  pub fn new() -> Self {
    Self::with_clipboard(Arc::new(NoClipboard))
  }

  pub fn with_clipboard(clipboard_provider: Arc<dyn ClipboardProvider>) -> Self {
    Self {
      inner: HashMap::new(),
      clipboard_provider,
    }
  }

  pub fn set_clipboard_provider(&mut self, clipboard_provider: Arc<dyn ClipboardProvider>) {
    self.clipboard_provider = clipboard_provider;
  }

  pub fn clipboard_provider_name(&self) -> Cow<'_, str> {
    self.clipboard_provider.name()
  }

  /// Contents of the register the context selects. Never fails: unwritten
  /// registers read as empty content.
  pub fn get(&self, ctx: &RegisterContext) -> RegisterContent {
    self.read(ctx.target())
  }

  /// Store `text` in the register the context selects, with `override_mode`
  /// taking precedence over the context's mode.
  pub fn put(
    &mut self,
    text: impl Into<String>,
    ctx: &RegisterContext,
    override_mode: Option<RegisterMode>,
  ) -> Result<()> {
    let content = RegisterContent::new(text, override_mode.unwrap_or(ctx.mode));
    self.write(ctx.target(), content)
  }

  pub fn read(&self, name: RegisterName) -> RegisterContent {
    match name {
      RegisterName::BlackHole => RegisterContent::empty(),
      RegisterName::Selection | RegisterName::Clipboard => self.read_clipboard(),
      name => {
        self
          .inner
          .get(&name.slot())
          .cloned()
          .unwrap_or_default()
      },
    }
  }

  pub fn write(&mut self, name: RegisterName, content: RegisterContent) -> Result<()> {
    match name {
      RegisterName::BlackHole => Ok(()),
      name if name.is_read_only() => Err(RegisterError::WriteNotSupported(name.slot())),
      RegisterName::Selection | RegisterName::Clipboard => {
        let mut text = content.text;
        if content.mode == RegisterMode::LineWise && !text.ends_with('\n') {
          text.push('\n');
        }
        self.clipboard_provider.copy(&text)?;
        Ok(())
      },
      RegisterName::Named { name, append: true } => {
        match self.inner.get_mut(&name) {
          Some(existing) => existing.append(content),
          None => {
            self.inner.insert(name, content);
          },
        }
        Ok(())
      },
      name => {
        self.inner.insert(name.slot(), content);
        Ok(())
      },
    }
  }

  /// Update the yank/delete history after an operator finished.
  pub fn record(&mut self, event: RegisterEvent) {
    match event {
      RegisterEvent::YankCompleted { content } => {
        self.inner.insert('0', content);
      },
      RegisterEvent::DeleteCompleted {
        content,
        within_one_line,
      } => {
        if within_one_line && content.mode != RegisterMode::LineWise {
          self.inner.insert('-', content);
          return;
        }

        for n in (1..9u8).rev() {
          let from = (b'0' + n) as char;
          let to = (b'0' + n + 1) as char;
          match self.inner.remove(&from) {
            Some(value) => {
              self.inner.insert(to, value);
            },
            None => {
              self.inner.remove(&to);
            },
          }
        }
        self.inner.insert('1', content);
      },
    }
  }

  /// Set one of the read-only registers on behalf of the host.
  pub fn record_special(&mut self, name: RegisterName, text: impl Into<String>) -> Result<()> {
    if !name.is_read_only() {
      return Err(RegisterError::InvalidName(name.slot()));
    }
    self.inner.insert(
      name.slot(),
      RegisterContent::new(text, RegisterMode::CharacterWise),
    );
    Ok(())
  }

  /// Whether a locally stored register has been written.
  pub fn is_set(&self, name: RegisterName) -> bool {
    self.inner.contains_key(&name.slot())
  }

  pub fn iter_preview(&self) -> impl Iterator<Item = (char, &str)> {
    let mut slots: Vec<_> = self
      .inner
      .iter()
      .map(|(name, content)| {
        let preview = content.text.lines().next().unwrap_or("<empty>");
        (*name, preview)
      })
      .collect();
    slots.sort_by_key(|(name, _)| *name);

    slots.into_iter().chain(
      [
        ('_', "<empty>"),
        ('+', "<system clipboard>"),
        ('*', "<system clipboard>"),
      ]
      .iter()
      .copied(),
    )
  }

  pub fn remove(&mut self, name: RegisterName) -> bool {
    match name {
      RegisterName::BlackHole | RegisterName::Selection | RegisterName::Clipboard => false,
      name => self.inner.remove(&name.slot()).is_some(),
    }
  }

  pub fn clear(&mut self) {
    self.inner.clear()
  }

  fn read_clipboard(&self) -> RegisterContent {
    match self.clipboard_provider.paste() {
      Ok(text) => {
        let mode = if text.ends_with('\n') {
          RegisterMode::LineWise
        } else {
          RegisterMode::CharacterWise
        };
        RegisterContent::new(text, mode)
      },
      Err(ClipboardError::ReadingNotSupported) => RegisterContent::empty(),
      Err(err) => {
        tracing::warn!("failed to read system clipboard: {err}");
        RegisterContent::empty()
      },
    }
  }
}
