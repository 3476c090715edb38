//! Moving buffer, cursor, marks and the unnamed register between the host
//! and the engine.
//!
//! A push makes the engine look like the host; a pull makes the host look
//! like the engine. Columns are characters on the host side and bytes on the
//! engine side; lines are 0-based on the host and 1-based in the engine.

use the_core::line_ending::{
  LineEnding,
  NATIVE_LINE_ENDING,
  normalize_process_lines,
};
use the_lib::{
  host::{
    HostCommand,
    HostError,
  },
  position::Position,
  registers::{
    RegisterContent,
    RegisterError,
    RegisterName,
  },
  selection::Selection,
};
use thiserror::Error;
use tracing::{
  debug,
  warn,
};

use crate::{
  config::BridgeConfig,
  engine::{
    EngineChannel,
    EngineError,
    EnginePos,
  },
  rpc::Value,
  state::{
    PulledState,
    SyncContext,
    register_mode_from_regtype,
    regtype_code,
  },
};

const UNNAMED: char = '"';

#[derive(Debug, Error)]
pub enum SyncError {
  #[error(transparent)]
  Engine(#[from] EngineError),
  #[error(transparent)]
  Host(#[from] HostError),
  #[error(transparent)]
  Register(#[from] RegisterError),
}

impl SyncError {
  /// The engine can no longer be talked to.
  pub fn is_channel(&self) -> bool {
    matches!(self, Self::Engine(err) if err.is_channel())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateSynchronizer {
  expand_tab:        bool,
  substitute_global: bool,
  line_ending:       LineEnding,
}

impl StateSynchronizer {
  pub fn new(config: &BridgeConfig) -> Self {
    Self {
      expand_tab:        config.expand_tab,
      substitute_global: config.substitute_global_flag,
      line_ending:       NATIVE_LINE_ENDING,
    }
  }

  /// Overrides the platform line ending used to clean up pulled lines.
  pub fn with_line_ending(mut self, line_ending: LineEnding) -> Self {
    self.line_ending = line_ending;
    self
  }

  pub fn push<E: EngineChannel + ?Sized>(
    &self,
    engine: &mut E,
    ctx: &mut SyncContext<'_>,
  ) -> Result<(), SyncError> {
    if self.expand_tab {
      ctx.editor.execute_command(HostCommand::IndentationToSpaces)?;
    }

    self
      .push_engine(engine, ctx)
      .map_err(|err| self.restore_host(ctx, err))
  }

  fn push_engine<E: EngineChannel + ?Sized>(
    &self,
    engine: &mut E,
    ctx: &mut SyncContext<'_>,
  ) -> Result<(), SyncError> {
    engine.set_option("gdefault", Value::from(self.substitute_global))?;

    let lines: Vec<String> = ctx.editor.text().split('\n').map(String::from).collect();
    let buffer = engine.current_buffer()?;
    engine.buf_set_lines(&buffer, 0, -1, true, &lines)?;

    let cursor = ctx.state.cursor;
    let start = Position::earlier_of(cursor, ctx.state.cursor_start);
    let end = Position::later_of(cursor, ctx.state.cursor_start);

    engine.set_pos(".", to_engine(&lines, cursor))?;
    // FIXME: '< should probably use start.col. It takes the column of the
    // end, kept deliberately until the engine-side mappings are checked.
    let visual_start = to_engine(&lines, Position::new(start.row, end.col));
    engine.set_pos("'<", visual_start)?;
    engine.set_pos("'>", to_engine(&lines, end))?;

    for mark in ctx.state.marks.iter() {
      engine.set_pos(&format!("'{}", mark.name), to_engine(&lines, mark.position))?;
    }

    let register = ctx.registers.read(RegisterName::Unnamed);
    engine.set_reg(UNNAMED, &register.text, regtype_code(register.mode))?;

    debug!(
      lines = lines.len(),
      cursor = %cursor,
      marks = ctx.state.marks.len(),
      "pushed host state to engine"
    );
    Ok(())
  }

  pub fn pull<E: EngineChannel + ?Sized>(
    &self,
    engine: &mut E,
    ctx: &mut SyncContext<'_>,
  ) -> Result<PulledState, SyncError> {
    let (lines, cursor) = self
      .pull_text(engine, ctx)
      .map_err(|err| self.restore_host(ctx, err))?;

    if self.expand_tab {
      ctx.editor.execute_command(HostCommand::IndentationToTabs)?;
    }

    let regtype = engine.get_reg_type(UNNAMED)?;
    let text = engine.get_reg(UNNAMED)?;
    let register = RegisterContent::new(text, register_mode_from_regtype(&regtype));
    ctx
      .registers
      .write(RegisterName::Unnamed, register.clone())?;

    debug!(
      lines = lines.len(),
      cursor = %cursor,
      "pulled engine state into host"
    );
    Ok(PulledState {
      lines,
      cursor,
      register,
    })
  }

  fn pull_text<E: EngineChannel + ?Sized>(
    &self,
    engine: &mut E,
    ctx: &mut SyncContext<'_>,
  ) -> Result<(Vec<String>, Position), SyncError> {
    let buffer = engine.current_buffer()?;
    let lines = engine.buf_get_lines(&buffer, 0, -1, false)?;
    let lines = normalize_process_lines(lines, self.line_ending);

    let (from, to) = ctx.editor.full_range();
    ctx.editor.replace(from, to, &lines.join("\n"))?;

    let cursor = to_host(&lines, engine.get_pos(".")?);
    ctx.editor.set_selection(Selection::point(cursor))?;
    ctx.state.collapse_to(cursor);
    Ok((lines, cursor))
  }

  /// Undoes the host side of a push when a cycle fails before its pull could
  /// convert indentation back. Returns `err` for chaining.
  pub fn restore_host(&self, ctx: &mut SyncContext<'_>, err: SyncError) -> SyncError {
    if self.expand_tab
      && let Err(restore_err) = ctx.editor.execute_command(HostCommand::IndentationToTabs)
    {
      warn!(error = %restore_err, "failed to restore host indentation");
    }
    err
  }
}

/// Host position to engine position. Columns past the end of the line keep
/// their distance from it.
fn to_engine(lines: &[String], position: Position) -> EnginePos {
  let col = match lines.get(position.row) {
    Some(line) => char_to_byte_col(line, position.col),
    None => position.col,
  };
  EnginePos::from_host(Position::new(position.row, col))
}

fn to_host(lines: &[String], pos: EnginePos) -> Position {
  let position = pos.to_host();
  let col = match lines.get(position.row) {
    Some(line) => byte_to_char_col(line, position.col),
    None => position.col,
  };
  Position::new(position.row, col)
}

fn char_to_byte_col(line: &str, col: usize) -> usize {
  match line.char_indices().nth(col) {
    Some((byte, _)) => byte,
    None => line.len() + (col - line.chars().count()),
  }
}

fn byte_to_char_col(line: &str, col: usize) -> usize {
  if col >= line.len() {
    return line.chars().count() + (col - line.len());
  }
  line
    .char_indices()
    .take_while(|(byte, _)| *byte < col)
    .count()
}
