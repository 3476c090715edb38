use std::{
  path::{
    Path,
    PathBuf,
  },
  process::{
    Child,
    Command,
    Stdio,
  },
  time::Duration,
};

use thiserror::Error;
use tracing::{
  debug,
  info,
};

use crate::{
  client::NvimClient,
  config::BridgeConfig,
  transport::{
    StdioTransport,
    TransportError,
  },
};

/// No user config, no vi compatibility, msgpack-RPC on stdio.
pub const ENGINE_ARGS: [&str; 4] = ["-u", "NONE", "-N", "--embed"];

#[derive(Debug, Error)]
pub enum SpawnError {
  #[error("engine executable '{path}' not found: {reason}")]
  NotFound { path: String, reason: String },
  #[error("engine working directory is unusable: {0}")]
  WorkingDir(String),
  #[error("failed to spawn engine process: {0}")]
  Io(#[from] std::io::Error),
  #[error("failed to attach to engine process: {0}")]
  Attach(#[from] TransportError),
}

/// A spawned engine that has not been attached to yet.
#[derive(Debug)]
pub struct EngineProcess {
  child:       Child,
  executable:  PathBuf,
  working_dir: PathBuf,
  timeout:     Duration,
}

impl EngineProcess {
  pub fn start(config: &BridgeConfig) -> Result<Self, SpawnError> {
    let executable = the_stdx::env::which(&config.neovim_path).map_err(|err| {
      SpawnError::NotFound {
        path:   config.neovim_path.clone(),
        reason: err.to_string(),
      }
    })?;
    let working_dir = the_stdx::env::stable_process_dir(config.working_dir.as_deref())
      .map_err(|err| SpawnError::WorkingDir(err.to_string()))?;

    let child = Command::new(&executable)
      .args(ENGINE_ARGS)
      .current_dir(&working_dir)
      .stdin(Stdio::piped())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .spawn()?;

    info!(
      executable = %executable.display(),
      cwd = %working_dir.display(),
      pid = child.id(),
      "engine process started"
    );

    Ok(Self {
      child,
      executable,
      working_dir,
      timeout: config.request_timeout(),
    })
  }

  pub fn id(&self) -> u32 {
    self.child.id()
  }

  pub fn executable(&self) -> &Path {
    &self.executable
  }

  pub fn working_dir(&self) -> &Path {
    &self.working_dir
  }

  /// Starts the stdio threads and hands back a client that owns the process.
  pub fn attach(self) -> Result<NvimClient, SpawnError> {
    debug!(pid = self.child.id(), "attaching to engine process");
    let transport = StdioTransport::new(self.child)?;
    Ok(NvimClient::new(transport, self.timeout))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_executable_is_reported() {
    let config = BridgeConfig {
      neovim_path: "the-nvim-definitely-missing-binary".into(),
      ..BridgeConfig::default()
    };

    match EngineProcess::start(&config) {
      Err(SpawnError::NotFound { path, .. }) => {
        assert_eq!(path, "the-nvim-definitely-missing-binary");
      },
      other => panic!("expected NotFound, got {other:?}"),
    }
  }

  #[cfg(unix)]
  #[test]
  fn unusable_working_dir_is_reported() {
    let config = BridgeConfig {
      neovim_path: "sh".into(),
      working_dir: Some(PathBuf::from("/definitely/not/a/dir")),
      ..BridgeConfig::default()
    };

    assert!(matches!(
      EngineProcess::start(&config),
      Err(SpawnError::WorkingDir(_))
    ));
  }
}
