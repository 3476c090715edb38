use std::time::Instant;

use tracing::{
  debug,
  warn,
};

use crate::{
  engine::{
    EngineChannel,
    EngineResult,
  },
  state::{
    PulledState,
    SyncContext,
  },
  sync::{
    StateSynchronizer,
    SyncError,
  },
};

/// How many `<Esc>` presses to try before giving up on a pending prompt.
pub const MAX_CANCEL_ATTEMPTS: usize = 3;

/// Escapes `<` so the engine reads it literally instead of as key notation.
pub fn escape_keys(text: &str) -> String {
  text.replace('<', "<lt>")
}

/// Keys that run `command` on the engine's command line.
pub fn command_input(command: &str) -> String {
  format!(":{}<CR>", escape_keys(command))
}

/// Runs a full push, input, pull cycle against one engine.
pub struct CommandExecutor<E: EngineChannel> {
  engine:       E,
  synchronizer: StateSynchronizer,
}

impl<E: EngineChannel> CommandExecutor<E> {
  pub fn new(engine: E, synchronizer: StateSynchronizer) -> Self {
    Self {
      engine,
      synchronizer,
    }
  }

  pub fn engine(&self) -> &E {
    &self.engine
  }

  pub fn engine_mut(&mut self) -> &mut E {
    &mut self.engine
  }

  pub fn synchronizer(&self) -> &StateSynchronizer {
    &self.synchronizer
  }

  pub fn into_engine(self) -> E {
    self.engine
  }

  /// Runs an ex command, e.g. `s/a/b/`, as if typed after `:`.
  pub fn run_command(
    &mut self,
    ctx: &mut SyncContext<'_>,
    command: &str,
  ) -> Result<PulledState, SyncError> {
    self.cycle(ctx, &command_input(command))
  }

  /// Feeds normal-mode keys, e.g. `ysiw)`, verbatim.
  pub fn run_keystrokes(
    &mut self,
    ctx: &mut SyncContext<'_>,
    keys: &str,
  ) -> Result<PulledState, SyncError> {
    self.cycle(ctx, keys)
  }

  fn cycle(&mut self, ctx: &mut SyncContext<'_>, keys: &str) -> Result<PulledState, SyncError> {
    let started = Instant::now();

    self.synchronizer.push(&mut self.engine, ctx)?;
    if let Err(err) = self.type_keys(keys) {
      return Err(self.synchronizer.restore_host(ctx, err.into()));
    }
    let pulled = self.synchronizer.pull(&mut self.engine, ctx)?;

    debug!(
      keys = %keys,
      elapsed = ?started.elapsed(),
      "bridge cycle finished"
    );
    Ok(pulled)
  }

  fn type_keys(&mut self, keys: &str) -> EngineResult<()> {
    self.engine.input(keys)?;
    self.leave_blocking_mode()
  }

  /// Presses `<Esc>` while the engine waits for more input, so a half typed
  /// command cannot swallow the next cycle.
  pub fn leave_blocking_mode(&mut self) -> EngineResult<()> {
    for _ in 0..MAX_CANCEL_ATTEMPTS {
      let mode = self.engine.get_mode()?;
      if !mode.blocking {
        return Ok(());
      }
      debug!(mode = %mode.mode, "engine is blocked waiting for input");
      self.engine.input("<Esc>")?;
    }

    let mode = self.engine.get_mode()?;
    if mode.blocking {
      warn!(
        mode = %mode.mode,
        attempts = MAX_CANCEL_ATTEMPTS,
        "engine still blocked after cancelling"
      );
    }
    Ok(())
  }

  pub fn shutdown(&mut self) -> EngineResult<()> {
    self.engine.shutdown()
  }
}
