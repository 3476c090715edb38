//! Where the command line tool looks for its files.

use std::path::{
  Path,
  PathBuf,
};

use etcetera::base_strategy::{
  BaseStrategy,
  choose_base_strategy,
};
use eyre::{
  Result,
  WrapErr,
};

const APP_DIR: &str = "the-vim";

pub fn config_dir() -> Result<PathBuf> {
  if let Some(dir) = std::env::var_os("THE_VIM_CONFIG_DIR") {
    return Ok(PathBuf::from(dir));
  }
  let strategy = choose_base_strategy().wrap_err("unable to find the config directory")?;
  Ok(strategy.config_dir().join(APP_DIR))
}

pub fn cache_dir() -> Result<PathBuf> {
  if let Some(dir) = std::env::var_os("THE_VIM_CACHE_DIR") {
    return Ok(PathBuf::from(dir));
  }
  let strategy = choose_base_strategy().wrap_err("unable to find the cache directory")?;
  Ok(strategy.cache_dir().join(APP_DIR))
}

pub fn default_config_file() -> Result<PathBuf> {
  Ok(config_dir()?.join("config.toml"))
}

pub fn default_log_file() -> Result<PathBuf> {
  Ok(cache_dir()?.join("the-vim.log"))
}

/// `.the-vim/config.toml` in the workspace around `dir`.
pub fn workspace_config_file(dir: &Path) -> PathBuf {
  find_workspace_in(dir).0.join(".the-vim").join("config.toml")
}

/// Walks up from `dir` to the first directory holding `.git`, `.svn`, `.jj`
/// or `.the-vim`. Returns `(dir, true)` when there is none.
pub fn find_workspace_in(dir: impl AsRef<Path>) -> (PathBuf, bool) {
  let dir = dir.as_ref();
  for ancestor in dir.ancestors() {
    if ancestor.join(".git").exists()
      || ancestor.join(".svn").exists()
      || ancestor.join(".jj").exists()
      || ancestor.join(".the-vim").exists()
    {
      return (ancestor.to_owned(), false);
    }
  }

  (dir.to_owned(), true)
}

pub fn ensure_parent_dir(path: &Path) -> Result<()> {
  if let Some(parent) = path.parent()
    && !parent.exists()
  {
    std::fs::create_dir_all(parent)
      .wrap_err_with(|| format!("failed to create '{}'", parent.display()))?;
  }
  Ok(())
}
