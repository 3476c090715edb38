use std::{
  fs,
  io::Error as IOError,
  path::Path,
};

use serde::Deserialize;
use the_nvim::BridgeConfig;
use the_runtime::clipboard::ClipboardProvider;
use thiserror::Error;
use toml::de::Error as TomlError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
  pub bridge:             BridgeConfig,
  /// Falls back to platform detection when unset.
  pub clipboard_provider: Option<ClipboardProvider>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
struct ConfigRaw {
  bridge:             BridgeConfig,
  clipboard_provider: Option<ClipboardProvider>,
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
  #[error("bad config: {0}")]
  BadConfig(#[from] TomlError),
  #[error(transparent)]
  Error(#[from] IOError),
}

impl ConfigLoadError {
  fn is_missing_file(&self) -> bool {
    matches!(self, Self::Error(err) if err.kind() == std::io::ErrorKind::NotFound)
  }
}

/// Merge two TOML documents, merging values from `right` onto `left`.
///
/// `merge_depth` sets the nesting depth up to which tables are merged instead
/// of overridden. Arrays of tables are matched up by their `name` key.
pub fn merge_toml_values(left: toml::Value, right: toml::Value, merge_depth: usize) -> toml::Value {
  use toml::Value;

  fn get_name(v: &Value) -> Option<&str> {
    v.get("name").and_then(Value::as_str)
  }

  match (left, right) {
    (Value::Array(mut left_items), Value::Array(right_items)) => {
      if merge_depth > 0 {
        left_items.reserve(right_items.len());
        for rvalue in right_items {
          let lvalue = get_name(&rvalue)
            .and_then(|rname| left_items.iter().position(|v| get_name(v) == Some(rname)))
            .map(|lpos| left_items.remove(lpos));
          let mvalue = match lvalue {
            Some(lvalue) => merge_toml_values(lvalue, rvalue, merge_depth - 1),
            None => rvalue,
          };
          left_items.push(mvalue);
        }
        Value::Array(left_items)
      } else {
        Value::Array(right_items)
      }
    },
    (Value::Table(mut left_map), Value::Table(right_map)) => {
      if merge_depth > 0 {
        for (rname, rvalue) in right_map {
          let merged = match left_map.remove(&rname) {
            Some(lvalue) => merge_toml_values(lvalue, rvalue, merge_depth - 1),
            None => rvalue,
          };
          left_map.insert(rname, merged);
        }
        Value::Table(left_map)
      } else {
        Value::Table(right_map)
      }
    },
    (_, value) => value,
  }
}

impl Config {
  /// Builds the config from the global and the workspace-local file, the
  /// local one winning key by key. A missing file is not an error as long as
  /// the other one loads.
  pub fn load(
    global: Result<String, ConfigLoadError>,
    local: Result<String, ConfigLoadError>,
  ) -> Result<Config, ConfigLoadError> {
    let parse = |file: String| toml::from_str::<toml::Value>(&file).map_err(ConfigLoadError::from);
    let global = global.and_then(parse);
    let local = local.and_then(parse);

    let merged = match (global, local) {
      (Ok(global), Ok(local)) => merge_toml_values(global, local, 3),
      (_, Err(ConfigLoadError::BadConfig(err))) | (Err(ConfigLoadError::BadConfig(err)), _) => {
        return Err(ConfigLoadError::BadConfig(err));
      },
      (Ok(config), Err(_)) | (Err(_), Ok(config)) => config,
      (Err(err), Err(_)) => return Err(err),
    };

    let raw: ConfigRaw = merged.try_into()?;
    Ok(Config {
      bridge:             raw.bridge,
      clipboard_provider: raw.clipboard_provider,
    })
  }

  /// Loads `global_file` and `local_file`, falling back to defaults when
  /// neither exists.
  pub fn load_files(global_file: &Path, local_file: &Path) -> Result<Config, ConfigLoadError> {
    let global = fs::read_to_string(global_file).map_err(ConfigLoadError::Error);
    let local = fs::read_to_string(local_file).map_err(ConfigLoadError::Error);
    match Self::load(global, local) {
      Err(err) if err.is_missing_file() => Ok(Config::default()),
      other => other,
    }
  }

  pub fn clipboard_provider(&self) -> ClipboardProvider {
    self
      .clipboard_provider
      .clone()
      .unwrap_or_else(ClipboardProvider::detect)
  }
}
