//! Clipboard abstraction for `the-lib`.
//!
//! The lib only defines the interface, the error types and an in-memory
//! provider. Runtime hosts provide OS-backed implementations (see
//! `the-runtime`).

use std::borrow::Cow;

use parking_lot::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClipboardError {
  #[error(transparent)]
  Io(#[from] std::io::Error),
  #[error("could not convert provider output to UTF-8: {0}")]
  FromUtf8(#[from] std::string::FromUtf8Error),
  #[error("clipboard provider command failed")]
  CommandFailed,
  #[error("failed to write to clipboard provider's stdin")]
  StdinWriteFailed,
  #[error("clipboard provider did not return any contents")]
  MissingStdout,
  #[error("clipboard provider does not support reading")]
  ReadingNotSupported,
  #[error("clipboard error: {0}")]
  Platform(String),
}

pub type Result<T> = std::result::Result<T, ClipboardError>;

/// The system clipboard as seen by the `*` and `+` registers.
///
/// Implementations must round-trip arbitrary UTF-8, multi-byte text included.
pub trait ClipboardProvider: Send + Sync {
  fn name(&self) -> Cow<'_, str>;
  fn copy(&self, content: &str) -> Result<()>;
  fn paste(&self) -> Result<String>;
}

#[derive(Debug, Default)]
pub struct NoClipboard;

impl ClipboardProvider for NoClipboard {
  fn name(&self) -> Cow<'_, str> {
    "none".into()
  }

  fn copy(&self, _content: &str) -> Result<()> {
    Ok(())
  }

  fn paste(&self) -> Result<String> {
    Err(ClipboardError::ReadingNotSupported)
  }
}

/// Process-local clipboard, used when no OS provider is available and in
/// tests.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
  contents: Mutex<String>,
}

impl MemoryClipboard {
  pub fn new() -> Self {
    Self::default()
  }
}

impl ClipboardProvider for MemoryClipboard {
  fn name(&self) -> Cow<'_, str> {
    "memory".into()
  }

  fn copy(&self, content: &str) -> Result<()> {
    let mut contents = self.contents.lock();
    contents.clear();
    contents.push_str(content);
    Ok(())
  }

  fn paste(&self) -> Result<String> {
    Ok(self.contents.lock().clone())
  }
}
