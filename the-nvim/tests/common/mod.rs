//! In-memory stand-in for an embedded engine.
//!
//! Keeps a buffer, cursor, marks and registers the way the engine would
//! report them, records every call, and lets a test script what typing does.

#![allow(dead_code)]

use std::collections::HashMap;

use the_nvim::{
  engine::{
    BufferHandle,
    ChannelError,
    EngineChannel,
    EngineError,
    EngineMode,
    EnginePos,
    EngineResult,
  },
  rpc::Value,
};

#[derive(Debug, Clone)]
pub struct FakeState {
  pub lines:           Vec<String>,
  pub cursor:          EnginePos,
  pub marks:           HashMap<String, EnginePos>,
  /// Register text and the type `getregtype()` reports for it.
  pub registers:       HashMap<char, (String, String)>,
  pub options:         HashMap<String, Value>,
  /// `<Esc>` presses needed before the engine stops blocking.
  pub pending_escapes: usize,
  /// Never leaves the blocking state.
  pub stuck:           bool,
}

impl Default for FakeState {
  fn default() -> Self {
    Self {
      lines:           vec![String::new()],
      cursor:          EnginePos { line: 1, col: 0 },
      marks:           HashMap::new(),
      registers:       HashMap::new(),
      options:         HashMap::new(),
      pending_escapes: 0,
      stuck:           false,
    }
  }
}

type InputHandler = Box<dyn FnMut(&mut FakeState, &str)>;

pub struct FakeEngine {
  pub state:       FakeState,
  pub calls:       Vec<String>,
  pub inputs:      Vec<String>,
  /// Appended to every line handed back, e.g. `"\r"`.
  pub line_suffix: String,
  pub shut_down:   bool,
  on_input:        Option<InputHandler>,
  fail_on:         Option<(String, EngineError)>,
}

impl Default for FakeEngine {
  fn default() -> Self {
    Self::new()
  }
}

impl FakeEngine {
  pub fn new() -> Self {
    Self {
      state:       FakeState::default(),
      calls:       Vec::new(),
      inputs:      Vec::new(),
      line_suffix: String::new(),
      shut_down:   false,
      on_input:    None,
      fail_on:     None,
    }
  }

  pub fn on_input(mut self, handler: impl FnMut(&mut FakeState, &str) + 'static) -> Self {
    self.on_input = Some(Box::new(handler));
    self
  }

  pub fn with_line_suffix(mut self, suffix: &str) -> Self {
    self.line_suffix = suffix.to_string();
    self
  }

  /// Makes the named call fail with `err` from now on.
  pub fn fail_on(mut self, call: &str, err: EngineError) -> Self {
    self.fail_on = Some((call.to_string(), err));
    self
  }

  pub fn closed_on(self, call: &str) -> Self {
    self.fail_on(call, EngineError::Channel(ChannelError::Closed))
  }

  pub fn remote_error_on(self, call: &str, message: &str) -> Self {
    self.fail_on(call, EngineError::Remote {
      method:  call.to_string(),
      message: message.to_string(),
    })
  }

  pub fn set_register(&mut self, name: char, text: &str, regtype: &str) {
    self
      .state
      .registers
      .insert(name, (text.to_string(), regtype.to_string()));
  }

  pub fn register(&self, name: char) -> Option<(&str, &str)> {
    self
      .state
      .registers
      .get(&name)
      .map(|(text, regtype)| (text.as_str(), regtype.as_str()))
  }

  pub fn count_calls(&self, call: &str) -> usize {
    self.calls.iter().filter(|c| c.as_str() == call).count()
  }

  fn record(&mut self, call: impl Into<String>) -> EngineResult<()> {
    let call = call.into();
    self.calls.push(call.clone());
    match &self.fail_on {
      Some((failing, err)) if *failing == call => Err(err.clone()),
      _ => Ok(()),
    }
  }
}

fn string_arg(args: &[Value], index: usize) -> String {
  args
    .get(index)
    .and_then(Value::as_str)
    .unwrap_or_default()
    .to_string()
}

fn pos_arg(args: &[Value]) -> EnginePos {
  let parts = args
    .get(1)
    .and_then(Value::as_array)
    .map(Vec::as_slice)
    .unwrap_or_default();
  EnginePos {
    line: parts.get(1).and_then(Value::as_i64).unwrap_or(0),
    col:  parts.get(2).and_then(Value::as_i64).unwrap_or(0),
  }
}

fn regtype_for(code: &str, text: &str) -> String {
  match code {
    "l" => "V".to_string(),
    "b" => {
      let width = text.lines().map(|line| line.chars().count()).max().unwrap_or(0);
      format!("\u{16}{width}")
    },
    _ => "v".to_string(),
  }
}

impl EngineChannel for FakeEngine {
  fn current_buffer(&mut self) -> EngineResult<BufferHandle> {
    self.record("current_buffer")?;
    Ok(BufferHandle(Value::Ext(0, vec![1])))
  }

  fn buf_set_lines(
    &mut self,
    buffer: &BufferHandle,
    start: i64,
    end: i64,
    strict: bool,
    lines: &[String],
  ) -> EngineResult<()> {
    self.record("buf_set_lines")?;
    assert_eq!(buffer.0, Value::Ext(0, vec![1]));
    assert_eq!((start, end, strict), (0, -1, true));
    self.state.lines = lines.to_vec();
    Ok(())
  }

  fn buf_get_lines(
    &mut self,
    _buffer: &BufferHandle,
    start: i64,
    end: i64,
    strict: bool,
  ) -> EngineResult<Vec<String>> {
    self.record("buf_get_lines")?;
    assert_eq!((start, end, strict), (0, -1, false));
    Ok(
      self
        .state
        .lines
        .iter()
        .map(|line| format!("{line}{}", self.line_suffix))
        .collect(),
    )
  }

  fn set_option(&mut self, name: &str, value: Value) -> EngineResult<()> {
    self.record(format!("set_option {name}"))?;
    self.state.options.insert(name.to_string(), value);
    Ok(())
  }

  fn call_function(&mut self, name: &str, args: Vec<Value>) -> EngineResult<Value> {
    let target = string_arg(&args, 0);
    self.record(format!("{name} {target}"))?;

    match name {
      "setpos" => {
        let pos = pos_arg(&args);
        if target == "." {
          self.state.cursor = pos;
        } else {
          self.state.marks.insert(target, pos);
        }
        Ok(Value::from(0))
      },
      "getpos" => {
        let pos = if target == "." {
          self.state.cursor
        } else {
          self
            .state
            .marks
            .get(&target)
            .copied()
            .unwrap_or(EnginePos { line: 0, col: 0 })
        };
        Ok(Value::Array(vec![
          Value::from(0),
          Value::from(pos.line),
          Value::from(pos.col),
          Value::from(0),
        ]))
      },
      "setreg" => {
        let mut text = string_arg(&args, 1);
        let code = string_arg(&args, 2);
        if code == "l" && !text.ends_with('\n') {
          text.push('\n');
        }
        let regtype = regtype_for(&code, &text);
        let name = target.chars().next().unwrap_or('"');
        self.state.registers.insert(name, (text, regtype));
        Ok(Value::from(0))
      },
      "getreg" | "getregtype" => {
        let register = target.chars().next().unwrap_or('"');
        let (text, regtype) = self
          .state
          .registers
          .get(&register)
          .cloned()
          .unwrap_or_default();
        Ok(Value::from(if name == "getregtype" { regtype } else { text }))
      },
      other => panic!("unexpected engine function {other}"),
    }
  }

  fn input(&mut self, keys: &str) -> EngineResult<i64> {
    self.record("input")?;
    self.inputs.push(keys.to_string());

    if keys == "<Esc>" {
      self.state.pending_escapes = self.state.pending_escapes.saturating_sub(1);
    } else if let Some(handler) = self.on_input.as_mut() {
      handler(&mut self.state, keys);
    }
    Ok(keys.len() as i64)
  }

  fn get_mode(&mut self) -> EngineResult<EngineMode> {
    self.record("get_mode")?;
    let blocking = self.state.stuck || self.state.pending_escapes > 0;
    Ok(EngineMode {
      mode: if blocking { "r" } else { "n" }.to_string(),
      blocking,
    })
  }

  fn shutdown(&mut self) -> EngineResult<()> {
    self.shut_down = true;
    Ok(())
  }
}
