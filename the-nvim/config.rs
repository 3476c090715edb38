use std::{
  path::PathBuf,
  time::Duration,
};

use serde::{
  Deserialize,
  Serialize,
};

pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5000;

/// Settings for the engine bridge, read from the `[bridge]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct BridgeConfig {
  /// Route commands through the engine at all.
  pub enable:                 bool,
  pub neovim_path:            String,
  /// Convert indentation to spaces before a cycle and back to tabs after it.
  pub expand_tab:             bool,
  /// Value of the engine's `gdefault` option.
  pub substitute_global_flag: bool,
  pub request_timeout_ms:     u64,
  /// Engine working directory. Falls back to the system temp dir.
  pub working_dir:            Option<PathBuf>,
}

impl Default for BridgeConfig {
  fn default() -> Self {
    Self {
      enable:                 true,
      neovim_path:            "nvim".to_string(),
      expand_tab:             false,
      substitute_global_flag: false,
      request_timeout_ms:     DEFAULT_REQUEST_TIMEOUT_MS,
      working_dir:            None,
    }
  }
}

impl BridgeConfig {
  pub fn request_timeout(&self) -> Duration {
    Duration::from_millis(self.request_timeout_ms)
  }
}
