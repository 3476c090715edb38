//! A bridge session: one engine, its executor and the notices it produced.
//!
//! When the engine cannot be used the session keeps answering with
//! [`Execution::Native`] so the host can fall back to its own emulation.

use the_lib::messages::{
  Message,
  MessageCenter,
};
use tracing::{
  error,
  info,
  warn,
};

use crate::{
  client::NvimClient,
  config::BridgeConfig,
  engine::EngineChannel,
  executor::CommandExecutor,
  process::EngineProcess,
  state::{
    PulledState,
    SyncContext,
  },
  sync::{
    StateSynchronizer,
    SyncError,
  },
};

const NOTICE_SOURCE: &str = "nvim";

/// How a request was carried out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Execution {
  /// The engine ran it and the host now mirrors the engine.
  Bridged(PulledState),
  /// The engine path is unavailable; the host should handle it itself.
  Native,
}

impl Execution {
  pub fn is_bridged(&self) -> bool {
    matches!(self, Self::Bridged(_))
  }
}

pub struct Session<E: EngineChannel = NvimClient> {
  config:   BridgeConfig,
  executor: Option<CommandExecutor<E>>,
  disabled: Option<String>,
  messages: MessageCenter,
}

impl Session<NvimClient> {
  /// Spawns and attaches to the configured engine. Failing to do so is
  /// reported once and leaves the session on the native path.
  pub fn start(config: BridgeConfig) -> Self {
    if !config.enable {
      return Self::disabled(config, "engine bridge is disabled");
    }

    match EngineProcess::start(&config).and_then(EngineProcess::attach) {
      Ok(client) => Self::with_engine(config, client),
      Err(err) => {
        error!(error = %err, "could not start engine, using native emulation");
        let mut session = Self::disabled(config, err.to_string());
        session
          .messages
          .error(Some(NOTICE_SOURCE.to_string()), format!("failed to start engine: {err}"));
        session
      },
    }
  }
}

impl<E: EngineChannel> Session<E> {
  pub fn with_engine(config: BridgeConfig, engine: E) -> Self {
    if !config.enable {
      return Self::disabled(config, "engine bridge is disabled");
    }

    let synchronizer = StateSynchronizer::new(&config);
    info!("engine bridge ready");
    Self {
      config,
      executor: Some(CommandExecutor::new(engine, synchronizer)),
      disabled: None,
      messages: MessageCenter::default(),
    }
  }

  pub fn disabled(config: BridgeConfig, reason: impl Into<String>) -> Self {
    Self {
      config,
      executor: None,
      disabled: Some(reason.into()),
      messages: MessageCenter::default(),
    }
  }

  pub fn config(&self) -> &BridgeConfig {
    &self.config
  }

  pub fn is_enabled(&self) -> bool {
    self.executor.is_some()
  }

  pub fn disabled_reason(&self) -> Option<&str> {
    self.disabled.as_deref()
  }

  pub fn executor(&self) -> Option<&CommandExecutor<E>> {
    self.executor.as_ref()
  }

  pub fn messages(&self) -> &MessageCenter {
    &self.messages
  }

  /// Notices produced since the last call, for the host to display.
  pub fn take_notices(&mut self) -> Vec<Message> {
    self.messages.take_unseen()
  }

  pub fn run_command(
    &mut self,
    ctx: &mut SyncContext<'_>,
    command: &str,
  ) -> Result<Execution, SyncError> {
    self.run(ctx, |executor, ctx| executor.run_command(ctx, command))
  }

  pub fn run_keystrokes(
    &mut self,
    ctx: &mut SyncContext<'_>,
    keys: &str,
  ) -> Result<Execution, SyncError> {
    self.run(ctx, |executor, ctx| executor.run_keystrokes(ctx, keys))
  }

  fn run(
    &mut self,
    ctx: &mut SyncContext<'_>,
    cycle: impl FnOnce(&mut CommandExecutor<E>, &mut SyncContext<'_>) -> Result<PulledState, SyncError>,
  ) -> Result<Execution, SyncError> {
    let Some(executor) = self.executor.as_mut() else {
      return Ok(Execution::Native);
    };

    match cycle(executor, ctx) {
      Ok(pulled) => Ok(Execution::Bridged(pulled)),
      Err(err) if err.is_channel() => {
        error!(error = %err, "lost the engine, using native emulation");
        self
          .messages
          .error(Some(NOTICE_SOURCE.to_string()), format!("engine stopped responding: {err}"));
        self.disable(err.to_string());
        Err(err)
      },
      Err(err) => {
        warn!(error = %err, "engine cycle failed");
        self
          .messages
          .warning(Some(NOTICE_SOURCE.to_string()), err.to_string());
        Err(err)
      },
    }
  }

  fn disable(&mut self, reason: String) {
    if let Some(mut executor) = self.executor.take()
      && let Err(err) = executor.shutdown()
    {
      warn!(error = %err, "failed to shut the engine down");
    }
    self.disabled = Some(reason);
  }

  pub fn shutdown(&mut self) {
    if self.executor.is_some() {
      self.disable("session shut down".to_string());
    }
  }
}

impl<E: EngineChannel> Drop for Session<E> {
  fn drop(&mut self) {
    self.shutdown();
  }
}
