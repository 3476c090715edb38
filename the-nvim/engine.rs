//! The calls the bridge makes against a modal engine.
//!
//! [`EngineChannel`] is the seam between the synchronizer and whatever is on
//! the other end: the msgpack-RPC client in production and an in-memory fake
//! in tests. Every method takes `&mut self`, so at most one request is in
//! flight per engine.

use std::time::Duration;

use the_lib::position::Position;
use thiserror::Error;

use crate::rpc::{
  self,
  Value,
};

/// Opaque buffer handle as returned by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferHandle(pub Value);

impl BufferHandle {
  /// Handle `0` always refers to the current buffer.
  pub fn current() -> Self {
    Self(Value::from(0))
  }
}

/// Result of `nvim_get_mode`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EngineMode {
  pub mode:     String,
  pub blocking: bool,
}

impl EngineMode {
  pub fn from_value(value: &Value) -> Result<Self, EngineError> {
    let mode = rpc::map_get(value, "mode")
      .and_then(rpc::as_text)
      .ok_or(EngineError::UnexpectedReply {
        method:   "nvim_get_mode",
        expected: "a map with a `mode` string",
      })?;
    let blocking = rpc::map_get(value, "blocking")
      .and_then(Value::as_bool)
      .unwrap_or(false);
    Ok(Self {
      mode: mode.to_string(),
      blocking,
    })
  }
}

/// A position in engine coordinates: 1-based line, 0-based byte column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnginePos {
  pub line: i64,
  pub col:  i64,
}

impl EnginePos {
  pub fn from_host(position: Position) -> Self {
    Self {
      line: position.row as i64 + 1,
      col:  position.col as i64,
    }
  }

  /// Negative coordinates clamp to the start of the buffer.
  pub fn to_host(self) -> Position {
    Position::new(
      (self.line - 1).max(0) as usize,
      self.col.max(0) as usize,
    )
  }

  /// `[bufnum, line, col, off]` as expected by `setpos()`.
  pub fn to_setpos_arg(self) -> Value {
    Value::Array(vec![
      Value::from(0),
      Value::from(self.line),
      Value::from(self.col),
      Value::from(0),
    ])
  }

  /// Parses the list returned by `getpos()`.
  pub fn from_getpos_reply(value: &Value) -> Result<Self, EngineError> {
    let unexpected = EngineError::UnexpectedReply {
      method:   "getpos",
      expected: "a list of four integers",
    };
    let parts = value.as_array().ok_or_else(|| unexpected.clone())?;
    let line = parts.get(1).and_then(Value::as_i64);
    let col = parts.get(2).and_then(Value::as_i64);
    match (line, col) {
      (Some(line), Some(col)) => Ok(Self { line, col }),
      _ => Err(unexpected),
    }
  }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ChannelError {
  #[error("engine channel is closed")]
  Closed,
  #[error("engine did not answer `{method}` within {timeout:?}")]
  Timeout {
    method:  String,
    timeout: Duration,
  },
  #[error("engine transport failed: {0}")]
  Transport(String),
  #[error("failed to read from engine: {0}")]
  Read(String),
  #[error("failed to write to engine: {0}")]
  Write(String),
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
  /// The conversation with the engine broke down.
  #[error(transparent)]
  Channel(#[from] ChannelError),
  /// The engine answered with an error.
  #[error("`{method}` failed: {message}")]
  Remote { method: String, message: String },
  #[error("unexpected reply to `{method}`, expected {expected}")]
  UnexpectedReply {
    method:   &'static str,
    expected: &'static str,
  },
}

impl EngineError {
  pub fn is_channel(&self) -> bool {
    matches!(self, Self::Channel(_))
  }
}

pub type EngineResult<T> = Result<T, EngineError>;

pub trait EngineChannel {
  fn current_buffer(&mut self) -> EngineResult<BufferHandle>;

  fn buf_set_lines(
    &mut self,
    buffer: &BufferHandle,
    start: i64,
    end: i64,
    strict: bool,
    lines: &[String],
  ) -> EngineResult<()>;

  fn buf_get_lines(
    &mut self,
    buffer: &BufferHandle,
    start: i64,
    end: i64,
    strict: bool,
  ) -> EngineResult<Vec<String>>;

  fn set_option(&mut self, name: &str, value: Value) -> EngineResult<()>;

  fn call_function(&mut self, name: &str, args: Vec<Value>) -> EngineResult<Value>;

  /// Queues raw keys, `<`-notation included. Returns the number of bytes
  /// the engine consumed.
  fn input(&mut self, keys: &str) -> EngineResult<i64>;

  fn get_mode(&mut self) -> EngineResult<EngineMode>;

  /// Releases the engine. The default does nothing.
  fn shutdown(&mut self) -> EngineResult<()> {
    Ok(())
  }

  fn set_pos(&mut self, mark: &str, pos: EnginePos) -> EngineResult<()> {
    self.call_function("setpos", vec![
      Value::from(mark),
      pos.to_setpos_arg(),
    ])?;
    Ok(())
  }

  fn get_pos(&mut self, mark: &str) -> EngineResult<EnginePos> {
    let reply = self.call_function("getpos", vec![Value::from(mark)])?;
    EnginePos::from_getpos_reply(&reply)
  }

  fn set_reg(&mut self, register: char, text: &str, regtype: &str) -> EngineResult<()> {
    self.call_function("setreg", vec![
      Value::from(register.to_string()),
      Value::from(text),
      Value::from(regtype),
    ])?;
    Ok(())
  }

  fn get_reg(&mut self, register: char) -> EngineResult<String> {
    let reply = self.call_function("getreg", vec![Value::from(register.to_string())])?;
    rpc::as_text(&reply)
      .map(String::from)
      .ok_or(EngineError::UnexpectedReply {
        method:   "getreg",
        expected: "a string",
      })
  }

  fn get_reg_type(&mut self, register: char) -> EngineResult<String> {
    let reply = self.call_function("getregtype", vec![Value::from(register.to_string())])?;
    rpc::as_text(&reply)
      .map(String::from)
      .ok_or(EngineError::UnexpectedReply {
        method:   "getregtype",
        expected: "a string",
      })
  }
}

impl<E: EngineChannel + ?Sized> EngineChannel for &mut E {
  fn current_buffer(&mut self) -> EngineResult<BufferHandle> {
    (**self).current_buffer()
  }

  fn buf_set_lines(
    &mut self,
    buffer: &BufferHandle,
    start: i64,
    end: i64,
    strict: bool,
    lines: &[String],
  ) -> EngineResult<()> {
    (**self).buf_set_lines(buffer, start, end, strict, lines)
  }

  fn buf_get_lines(
    &mut self,
    buffer: &BufferHandle,
    start: i64,
    end: i64,
    strict: bool,
  ) -> EngineResult<Vec<String>> {
    (**self).buf_get_lines(buffer, start, end, strict)
  }

  fn set_option(&mut self, name: &str, value: Value) -> EngineResult<()> {
    (**self).set_option(name, value)
  }

  fn call_function(&mut self, name: &str, args: Vec<Value>) -> EngineResult<Value> {
    (**self).call_function(name, args)
  }

  fn input(&mut self, keys: &str) -> EngineResult<i64> {
    (**self).input(keys)
  }

  fn get_mode(&mut self) -> EngineResult<EngineMode> {
    (**self).get_mode()
  }

  fn shutdown(&mut self) -> EngineResult<()> {
    (**self).shutdown()
  }
}
