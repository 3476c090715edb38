use std::path::PathBuf;

use clap::{
  ArgAction,
  ArgGroup,
  Parser,
};

/// What to run against the file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
  /// Normal-mode keys, fed verbatim.
  Keys(String),
  /// An ex command, without the leading `:`.
  Command(String),
}

#[derive(Clone, Debug)]
pub struct CliOptions {
  pub action:      Action,
  pub file:        PathBuf,
  /// Initial cursor as 1-based `row:col`.
  pub cursor:      (usize, usize),
  pub verbosity:   u8,
  pub log_file:    Option<PathBuf>,
  pub config_file: Option<PathBuf>,
}

impl CliOptions {
  pub fn parse() -> Self {
    RawCli::parse().into()
  }
}

#[derive(Parser, Debug)]
#[command(
  name = "the-vim",
  about = "Run Vim keys or ex commands on a file through an embedded Neovim",
  version,
  group(ArgGroup::new("action").required(true).args(["keys", "command"]))
)]
struct RawCli {
  /// Normal-mode keys to feed the engine, e.g. `dd` or `ysiw)`
  #[arg(short = 'k', long = "keys", value_name = "KEYS")]
  keys: Option<String>,

  /// Ex command to run, e.g. `s/foo/bar/`
  #[arg(short = 'e', long = "command", value_name = "CMD")]
  command: Option<String>,

  /// Cursor position before running, as 1-based ROW[:COL]
  #[arg(long = "cursor", value_name = "ROW[:COL]", value_parser = parse_cursor, default_value = "1:1")]
  cursor: (usize, usize),

  /// Increase logging verbosity (repeat for more detail)
  #[arg(short = 'v', action = ArgAction::Count)]
  verbosity: u8,

  /// Save logs to a specific file
  #[arg(long = "log", value_name = "FILE")]
  log_file: Option<PathBuf>,

  /// Load configuration from a specific file
  #[arg(short = 'c', long = "config", value_name = "FILE")]
  config_file: Option<PathBuf>,

  /// File to edit in place
  #[arg(value_name = "FILE")]
  file: PathBuf,
}

impl From<RawCli> for CliOptions {
  fn from(raw: RawCli) -> Self {
    let action = match (raw.keys, raw.command) {
      (Some(keys), _) => Action::Keys(keys),
      (None, Some(command)) => Action::Command(command),
      (None, None) => Action::Keys(String::new()),
    };

    Self {
      action,
      file: raw.file,
      cursor: raw.cursor,
      verbosity: raw.verbosity,
      log_file: raw.log_file,
      config_file: raw.config_file,
    }
  }
}

fn parse_cursor(s: &str) -> Result<(usize, usize), String> {
  let (row, col) = match s.split_once(':') {
    Some((row, col)) => (row, col),
    None => (s, "1"),
  };
  let parse = |part: &str| {
    part
      .parse::<usize>()
      .ok()
      .filter(|n| *n > 0)
      .ok_or_else(|| format!("'{part}' is not a 1-based position"))
  };
  Ok((parse(row)?, parse(col)?))
}
