//! Functions for working with the host environment.

use std::{
  ffi::OsStr,
  path::{
    Path,
    PathBuf,
  },
};

use eyre::{
  Result,
  WrapErr,
  eyre,
};
use parking_lot::RwLock;

// We keep the CWD as a static so every session spawned by this process
// resolves relative paths against the same directory.
static CWD: RwLock<Option<PathBuf>> = RwLock::new(None);

/// Get the current working directory.
/// This information is managed internally as the call to std::env::current_dir
/// might fail if the cwd has been deleted.
pub fn current_working_dir() -> Result<PathBuf> {
  if let Some(path) = &*CWD.read() {
    return Ok(path.clone());
  }

  let mut cwd = std::env::current_dir().wrap_err("failed to get current working directory")?;

  let pwd = std::env::var_os("PWD");
  #[cfg(windows)]
  let pwd = pwd.or_else(|| std::env::var_os("CD"));

  if let Some(pwd) = pwd.map(PathBuf::from)
    && pwd.canonicalize().ok().as_ref() == Some(&cwd)
  {
    cwd = pwd;
  }

  let mut dst = CWD.write();
  *dst = Some(cwd.clone());

  Ok(cwd)
}

/// Checks if the given environment variable is set.
pub fn env_var_is_set(env_var_name: &str) -> bool {
  std::env::var_os(env_var_name).is_some()
}

/// Checks if a binary with the given name exists.
pub fn binary_exists<T: AsRef<OsStr>>(binary_name: T) -> bool {
  which::which(binary_name).is_ok()
}

/// Attempts to find a binary of the given name. See [which](https://linux.die.net/man/1/which).
///
/// Paths containing a separator are checked in place instead of searched
/// for on `PATH`; either way the result must be an executable file.
pub fn which<T: AsRef<OsStr>>(binary_name: T) -> Result<PathBuf> {
  let binary_name = binary_name.as_ref();
  which::which(binary_name)
    .wrap_err_with(|| format!("command '{}' not found", binary_name.to_string_lossy()))
}

/// A directory that stays the same across sessions, for child processes
/// that do not care where they run.
pub fn stable_process_dir(preferred: Option<&Path>) -> Result<PathBuf> {
  let dir = match preferred {
    Some(dir) if dir.is_relative() => current_working_dir()?.join(dir),
    Some(dir) => dir.to_path_buf(),
    None => std::env::temp_dir(),
  };

  if !dir.is_dir() {
    return Err(eyre!("'{}' is not a directory", dir.display()));
  }

  Ok(dir)
}
