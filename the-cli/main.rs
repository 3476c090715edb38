mod cli;
mod config;
mod paths;

use std::{
  path::Path,
  sync::Arc,
};

use eyre::{
  Result,
  WrapErr,
  eyre,
};
use ropey::Rope;
use the_core::line_ending::{
  LineEnding,
  auto_detect_line_ending,
};
use the_lib::{
  document::Document,
  host::HostEditor,
  messages::MessageLevel,
  position::Position,
  registers::Registers,
  selection::Selection,
};
use the_nvim::{
  EditorState,
  Execution,
  Session,
  SyncContext,
};
use the_stdx::env::current_working_dir;

use crate::{
  cli::{
    Action,
    CliOptions,
  },
  config::Config,
};

fn setup_logging(verbosity: u8, log_file: &Path) -> Result<()> {
  let level = match verbosity {
    0 => log::LevelFilter::Warn,
    1 => log::LevelFilter::Info,
    2 => log::LevelFilter::Debug,
    _ => log::LevelFilter::Trace,
  };

  let file_config = fern::Dispatch::new()
    .format(|out, message, record| {
      out.finish(format_args!(
        "{} {} [{}] {}",
        chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
        record.target(),
        record.level(),
        message
      ))
    })
    .chain(fern::log_file(log_file)?);

  fern::Dispatch::new()
    .level(level)
    .chain(file_config)
    .apply()?;
  Ok(())
}

fn main() -> Result<()> {
  let options = CliOptions::parse();

  let log_file = match options.log_file.clone() {
    Some(path) => path,
    None => paths::default_log_file()?,
  };
  paths::ensure_parent_dir(&log_file)?;
  setup_logging(options.verbosity, &log_file).wrap_err("failed to set up logging")?;

  let global_config = match options.config_file.clone() {
    Some(path) => path,
    None => paths::default_config_file()?,
  };
  let local_config = paths::workspace_config_file(&current_working_dir()?);
  let config =
    Config::load_files(&global_config, &local_config).wrap_err("failed to load config")?;

  run(options, config)
}

fn run(options: CliOptions, config: Config) -> Result<()> {
  let source = std::fs::read_to_string(&options.file)
    .wrap_err_with(|| format!("failed to read '{}'", options.file.display()))?;
  let line_ending = auto_detect_line_ending(&Rope::from_str(&source)).unwrap_or(LineEnding::LF);
  let text = source.replace("\r\n", "\n");

  let mut doc = Document::new(Rope::from_str(&text));
  let (row, col) = options.cursor;
  doc.set_selection(Selection::point(Position::new(row - 1, col - 1)))?;
  let mut state = EditorState::from_selection(doc.selection());
  let mut registers = Registers::with_clipboard(Arc::new(config.clipboard_provider()));
  log::info!(
    "clipboard provider: {}",
    registers.clipboard_provider_name()
  );

  let mut session = Session::start(config.bridge);
  let result = {
    let mut ctx = SyncContext::new(&mut doc, &mut state, &mut registers);
    match &options.action {
      Action::Keys(keys) => session.run_keystrokes(&mut ctx, keys),
      Action::Command(command) => session.run_command(&mut ctx, command),
    }
  };

  for notice in session.take_notices() {
    let level = match notice.level {
      MessageLevel::Info => "info",
      MessageLevel::Warning => "warning",
      MessageLevel::Error => "error",
    };
    eprintln!("{level}: {}", notice.text);
  }
  session.shutdown();

  match result {
    Ok(Execution::Bridged(pulled)) => {
      let mut text = doc.text().to_string();
      if line_ending == LineEnding::Crlf {
        text = text.replace('\n', line_ending.as_str());
      }
      std::fs::write(&options.file, text)
        .wrap_err_with(|| format!("failed to write '{}'", options.file.display()))?;

      eprintln!(
        "{} lines, cursor {}:{}",
        pulled.lines.len(),
        pulled.cursor.row + 1,
        pulled.cursor.col + 1
      );
      Ok(())
    },
    Ok(Execution::Native) => {
      Err(eyre!(
        "engine unavailable, '{}' left unchanged",
        options.file.display()
      ))
    },
    Err(err) => Err(err).wrap_err("engine cycle failed"),
  }
}
