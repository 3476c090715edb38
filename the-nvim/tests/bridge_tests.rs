mod common;

use common::{
  FakeEngine,
  FakeState,
};
use quickcheck::TestResult;
use the_core::line_ending::LineEnding;
use the_lib::{
  document::Document,
  host::HostEditor,
  mark::Marks,
  messages::MessageLevel,
  position::Position,
  registers::{
    RegisterContent,
    RegisterContext,
    RegisterMode,
    RegisterName,
    Registers,
  },
  selection::Selection,
};
use the_nvim::{
  BridgeConfig,
  CommandExecutor,
  EditorState,
  Execution,
  Session,
  StateSynchronizer,
  SyncContext,
  engine::{
    EngineError,
    EnginePos,
  },
  executor::MAX_CANCEL_ATTEMPTS,
  rpc::Value,
};

struct Host {
  doc:       Document,
  state:     EditorState,
  registers: Registers,
}

impl Host {
  fn new(lines: &[&str], cursor: Position) -> Self {
    let mut doc = Document::from_lines(lines);
    doc.set_selection(Selection::point(cursor)).unwrap();
    Self {
      doc,
      state: EditorState::new(cursor),
      registers: Registers::new(),
    }
  }

  fn ctx(&mut self) -> SyncContext<'_> {
    SyncContext::new(&mut self.doc, &mut self.state, &mut self.registers)
  }
}

fn executor(engine: FakeEngine, config: &BridgeConfig) -> CommandExecutor<FakeEngine> {
  let synchronizer = StateSynchronizer::new(config).with_line_ending(LineEnding::LF);
  CommandExecutor::new(engine, synchronizer)
}

fn lf_synchronizer() -> StateSynchronizer {
  StateSynchronizer::new(&BridgeConfig::default()).with_line_ending(LineEnding::LF)
}

#[test]
fn test_surround_cycle_moves_cursor_past_paren() {
  let engine = FakeEngine::new().on_input(|state: &mut FakeState, keys| {
    assert_eq!(keys, "ysiw)");
    assert_eq!(state.cursor, EnginePos { line: 1, col: 8 });
    state.lines = vec!["first (line) test".to_string()];
    state.cursor = EnginePos { line: 1, col: 7 };
  });
  let mut executor = executor(engine, &BridgeConfig::default());
  let mut host = Host::new(&["first line test"], Position::new(0, 8));

  let pulled = executor.run_keystrokes(&mut host.ctx(), "ysiw)").unwrap();

  assert_eq!(pulled.lines, vec!["first (line) test"]);
  assert_eq!(pulled.cursor, Position::new(0, 7));
  assert_eq!(host.doc.lines(), vec!["first (line) test"]);
  assert_eq!(host.doc.selection(), Selection::point(Position::new(0, 7)));
  assert_eq!(host.state.cursor, Position::new(0, 7));
  assert_eq!(host.state.cursor_start, Position::new(0, 7));
}

#[test]
fn test_command_input_is_escaped() {
  let mut executor = executor(FakeEngine::new(), &BridgeConfig::default());
  let mut host = Host::new(&["<a>"], Position::zero());

  executor.run_command(&mut host.ctx(), "s/<a>/b/").unwrap();

  assert_eq!(executor.engine().inputs, vec![":s/<lt>a>/b/<CR>"]);
}

#[test]
fn test_keystrokes_are_sent_verbatim() {
  let mut executor = executor(FakeEngine::new(), &BridgeConfig::default());
  let mut host = Host::new(&["abc"], Position::zero());

  executor.run_keystrokes(&mut host.ctx(), "d<Right>").unwrap();

  assert_eq!(executor.engine().inputs, vec!["d<Right>"]);
}

#[test]
fn test_blocking_mode_is_cancelled_before_pull() {
  let engine = FakeEngine::new().on_input(|state: &mut FakeState, _| {
    state.pending_escapes = 2;
  });
  let mut executor = executor(engine, &BridgeConfig::default());
  let mut host = Host::new(&["abc"], Position::zero());

  executor.run_command(&mut host.ctx(), "s/a/b/c").unwrap();

  let engine = executor.engine();
  assert_eq!(engine.inputs, vec![":s/a/b/c<CR>", "<Esc>", "<Esc>"]);
  assert_eq!(engine.count_calls("get_mode"), 3);

  let escape_at = engine.calls.iter().rposition(|c| c == "input").unwrap();
  let pull_at = engine.calls.iter().position(|c| c == "buf_get_lines").unwrap();
  assert!(escape_at < pull_at);
}

#[test]
fn test_stuck_engine_is_cancelled_a_bounded_number_of_times() {
  let engine = FakeEngine::new().on_input(|state: &mut FakeState, _| {
    state.stuck = true;
  });
  let mut executor = executor(engine, &BridgeConfig::default());
  let mut host = Host::new(&["abc"], Position::zero());

  assert!(executor.run_keystrokes(&mut host.ctx(), "q:").is_ok());

  let escapes = executor
    .engine()
    .inputs
    .iter()
    .filter(|keys| *keys == "<Esc>")
    .count();
  assert_eq!(escapes, MAX_CANCEL_ATTEMPTS);
}

#[test]
fn test_carriage_returns_are_stripped_on_crlf_platforms() {
  let engine = FakeEngine::new().with_line_suffix("\r");
  let synchronizer =
    StateSynchronizer::new(&BridgeConfig::default()).with_line_ending(LineEnding::Crlf);
  let mut executor = CommandExecutor::new(engine, synchronizer);
  let mut host = Host::new(&["one", "two"], Position::zero());

  let pulled = executor.run_keystrokes(&mut host.ctx(), "").unwrap();

  assert_eq!(pulled.lines, vec!["one", "two"]);
  assert_eq!(host.doc.lines(), vec!["one", "two"]);
}

#[test]
fn test_lines_ending_in_carriage_return_survive_a_crlf_pull() {
  let engine = FakeEngine::new().with_line_suffix("\r");
  let synchronizer =
    StateSynchronizer::new(&BridgeConfig::default()).with_line_ending(LineEnding::Crlf);
  let mut executor = CommandExecutor::new(engine, synchronizer);
  let mut host = Host::new(&["a\r", "\r", "b"], Position::zero());

  let pulled = executor.run_keystrokes(&mut host.ctx(), "").unwrap();

  assert_eq!(pulled.lines, vec!["a\r", "\r", "b"]);
  assert_eq!(host.doc.lines(), vec!["a\r", "\r", "b"]);
}

#[test]
fn test_push_order_and_arguments() {
  let mut engine = FakeEngine::new();
  let mut host = Host::new(&["alpha", "beta"], Position::new(1, 2));

  lf_synchronizer().push(&mut engine, &mut host.ctx()).unwrap();

  assert_eq!(engine.calls, vec![
    "set_option gdefault",
    "current_buffer",
    "buf_set_lines",
    "setpos .",
    "setpos '<",
    "setpos '>",
    "setreg \"",
  ]);
  assert_eq!(engine.state.lines, vec!["alpha", "beta"]);
  assert_eq!(engine.state.cursor, EnginePos { line: 2, col: 2 });
  assert_eq!(
    engine.state.options.get("gdefault"),
    Some(&Value::Boolean(false))
  );
}

#[test]
fn test_substitute_global_flag_sets_gdefault() {
  let config = BridgeConfig {
    substitute_global_flag: true,
    ..BridgeConfig::default()
  };
  let mut engine = FakeEngine::new();
  let mut host = Host::new(&["a a"], Position::zero());

  StateSynchronizer::new(&config)
    .push(&mut engine, &mut host.ctx())
    .unwrap();

  assert_eq!(
    engine.state.options.get("gdefault"),
    Some(&Value::Boolean(true))
  );
}

#[test]
fn test_visual_marks_take_the_end_column() {
  let mut engine = FakeEngine::new();
  let mut host = Host::new(&["0123456", "abc", "xyz"], Position::new(2, 1));
  host.state.cursor_start = Position::new(0, 5);

  lf_synchronizer().push(&mut engine, &mut host.ctx()).unwrap();

  assert_eq!(engine.state.marks["'<"], EnginePos { line: 1, col: 1 });
  assert_eq!(engine.state.marks["'>"], EnginePos { line: 3, col: 1 });
  assert_eq!(engine.state.cursor, EnginePos { line: 3, col: 1 });
}

#[test]
fn test_user_marks_are_pushed() {
  let mut engine = FakeEngine::new();
  let mut host = Host::new(&["abc", "defg"], Position::zero());
  let mut marks = Marks::new();
  marks.set('a', Position::new(1, 2)).unwrap();
  marks.set('Q', Position::new(0, 1)).unwrap();
  host.state = host.state.clone().with_marks(marks);

  lf_synchronizer().push(&mut engine, &mut host.ctx()).unwrap();

  assert_eq!(engine.state.marks["'a"], EnginePos { line: 2, col: 2 });
  assert_eq!(engine.state.marks["'Q"], EnginePos { line: 1, col: 1 });
}

#[test]
fn test_default_register_is_pushed_with_its_mode() {
  let mut engine = FakeEngine::new();
  let mut host = Host::new(&["abc"], Position::zero());
  host
    .registers
    .put(
      "yanked\n",
      &RegisterContext::unnamed(RegisterMode::LineWise),
      None,
    )
    .unwrap();
  host
    .registers
    .put(
      "named",
      &RegisterContext::named(RegisterName::from_char('a').unwrap(), RegisterMode::CharacterWise),
      None,
    )
    .unwrap();

  lf_synchronizer().push(&mut engine, &mut host.ctx()).unwrap();

  assert_eq!(engine.register('"'), Some(("yanked\n", "V")));
  assert_eq!(engine.register('a'), None);
}

#[test]
fn test_blockwise_register_is_pulled() {
  let engine = FakeEngine::new().on_input(|state: &mut FakeState, _| {
    state
      .registers
      .insert('"', ("ab\ncd".to_string(), "\u{16}2".to_string()));
  });
  let mut executor = executor(engine, &BridgeConfig::default());
  let mut host = Host::new(&["abc"], Position::zero());

  let pulled = executor.run_keystrokes(&mut host.ctx(), "y").unwrap();

  let expected = RegisterContent::new("ab\ncd", RegisterMode::BlockWise);
  assert_eq!(pulled.register, expected);
  assert_eq!(host.registers.read(RegisterName::Unnamed), expected);
}

#[test]
fn test_unknown_register_type_is_characterwise() {
  let engine = FakeEngine::new().on_input(|state: &mut FakeState, _| {
    state
      .registers
      .insert('"', ("text".to_string(), "?".to_string()));
  });
  let mut executor = executor(engine, &BridgeConfig::default());
  let mut host = Host::new(&["abc"], Position::zero());

  let pulled = executor.run_keystrokes(&mut host.ctx(), "y").unwrap();

  assert_eq!(
    pulled.register,
    RegisterContent::new("text", RegisterMode::CharacterWise)
  );
}

#[test]
fn test_expand_tab_converts_indentation_around_the_cycle() {
  let config = BridgeConfig {
    expand_tab: true,
    ..BridgeConfig::default()
  };
  let engine = FakeEngine::new().on_input(|state: &mut FakeState, _| {
    assert_eq!(state.lines, vec!["    foo", "bar"]);
  });
  let mut executor = executor(engine, &config);
  let mut host = Host::new(&["\tfoo", "bar"], Position::zero());

  executor.run_keystrokes(&mut host.ctx(), "").unwrap();

  assert_eq!(host.doc.lines(), vec!["\tfoo", "bar"]);
}

#[test]
fn test_failed_push_keeps_host_indentation() {
  let config = BridgeConfig {
    expand_tab: true,
    ..BridgeConfig::default()
  };
  let engine = FakeEngine::new().closed_on("set_option gdefault");
  let mut session = Session::with_engine(config, engine);
  let mut host = Host::new(&["\tfoo", "bar"], Position::zero());

  let err = session.run_keystrokes(&mut host.ctx(), "x").unwrap_err();

  assert!(err.is_channel());
  assert!(!session.is_enabled());
  assert_eq!(host.doc.lines(), vec!["\tfoo", "bar"]);
}

#[test]
fn test_failed_input_keeps_host_indentation() {
  let config = BridgeConfig {
    expand_tab: true,
    ..BridgeConfig::default()
  };
  let mut executor = executor(FakeEngine::new().closed_on("input"), &config);
  let mut host = Host::new(&["\tfoo", "  \tbar"], Position::zero());

  assert!(executor.run_keystrokes(&mut host.ctx(), "x").is_err());
  assert_eq!(host.doc.lines(), vec!["\tfoo", "\tbar"]);
}

#[test]
fn test_failed_pull_keeps_host_indentation() {
  let config = BridgeConfig {
    expand_tab: true,
    ..BridgeConfig::default()
  };
  let mut executor = executor(FakeEngine::new().closed_on("buf_get_lines"), &config);
  let mut host = Host::new(&["\tfoo"], Position::zero());

  assert!(executor.run_keystrokes(&mut host.ctx(), "x").is_err());
  assert_eq!(host.doc.lines(), vec!["\tfoo"]);
}

#[test]
fn test_multiline_result_replaces_whole_buffer() {
  let engine = FakeEngine::new().on_input(|state: &mut FakeState, _| {
    state.lines = vec!["x".to_string(), "y".to_string(), "z".to_string()];
    state.cursor = EnginePos { line: 3, col: 0 };
  });
  let mut executor = executor(engine, &BridgeConfig::default());
  let mut host = Host::new(&["one", "two", "three"], Position::new(2, 4));

  executor.run_keystrokes(&mut host.ctx(), "").unwrap();

  assert_eq!(host.doc.lines(), vec!["x", "y", "z"]);
  assert_eq!(host.doc.selection(), Selection::point(Position::new(2, 0)));
}

#[test]
fn test_disabled_session_stays_native() {
  let mut session: Session<FakeEngine> =
    Session::disabled(BridgeConfig::default(), "engine bridge is disabled");
  let mut host = Host::new(&["abc"], Position::zero());

  let execution = session.run_keystrokes(&mut host.ctx(), "dd").unwrap();

  assert_eq!(execution, Execution::Native);
  assert!(!session.is_enabled());
  assert!(session.take_notices().is_empty());
  assert_eq!(host.doc.lines(), vec!["abc"]);
}

#[test]
fn test_config_can_disable_a_live_engine() {
  let config = BridgeConfig {
    enable: false,
    ..BridgeConfig::default()
  };
  let mut session = Session::with_engine(config, FakeEngine::new());
  let mut host = Host::new(&["abc"], Position::zero());

  assert_eq!(
    session.run_keystrokes(&mut host.ctx(), "x").unwrap(),
    Execution::Native
  );
}

#[test]
fn test_bridged_session_reports_pulled_state() {
  let engine = FakeEngine::new().on_input(|state: &mut FakeState, _| {
    state.lines = vec!["bc".to_string()];
  });
  let mut session = Session::with_engine(BridgeConfig::default(), engine);
  let mut host = Host::new(&["abc"], Position::zero());

  let execution = session.run_keystrokes(&mut host.ctx(), "x").unwrap();

  assert!(execution.is_bridged());
  assert_eq!(host.doc.lines(), vec!["bc"]);
}

#[test]
fn test_lost_channel_disables_the_bridge_once() {
  let engine = FakeEngine::new().closed_on("input");
  let mut session = Session::with_engine(BridgeConfig::default(), engine);
  let mut host = Host::new(&["abc"], Position::new(0, 1));

  let err = session.run_keystrokes(&mut host.ctx(), "x").unwrap_err();
  assert!(err.is_channel());
  assert!(!session.is_enabled());
  assert_eq!(host.doc.lines(), vec!["abc"]);

  let notices = session.take_notices();
  assert_eq!(notices.len(), 1);
  assert_eq!(notices[0].level, MessageLevel::Error);

  assert_eq!(
    session.run_keystrokes(&mut host.ctx(), "x").unwrap(),
    Execution::Native
  );
  assert!(session.take_notices().is_empty());
}

#[test]
fn test_remote_error_keeps_the_bridge_enabled() {
  let engine = FakeEngine::new().remote_error_on("getpos .", "E20: Mark not set");
  let mut session = Session::with_engine(BridgeConfig::default(), engine);
  let mut host = Host::new(&["abc"], Position::zero());

  let err = session.run_keystrokes(&mut host.ctx(), "x").unwrap_err();
  assert!(!err.is_channel());
  assert!(matches!(
    err,
    the_nvim::SyncError::Engine(EngineError::Remote { .. })
  ));
  assert!(session.is_enabled());

  let notices = session.take_notices();
  assert_eq!(notices.len(), 1);
  assert_eq!(notices[0].level, MessageLevel::Warning);
}

#[test]
fn test_spawn_failure_falls_back_to_native() {
  let config = BridgeConfig {
    neovim_path: "the-nvim-definitely-missing-binary".into(),
    ..BridgeConfig::default()
  };
  let mut session = Session::start(config);
  let mut host = Host::new(&["abc"], Position::zero());

  assert!(!session.is_enabled());
  assert!(session.disabled_reason().is_some());
  assert_eq!(
    session.run_command(&mut host.ctx(), "d").unwrap(),
    Execution::Native
  );

  let notices = session.take_notices();
  assert_eq!(notices.len(), 1);
  assert_eq!(notices[0].level, MessageLevel::Error);
  assert!(session.take_notices().is_empty());
}

fn sanitize(lines: Vec<String>) -> Vec<String> {
  let lines: Vec<String> = lines
    .into_iter()
    .map(|line| line.replace('\n', ""))
    .collect();
  if lines.is_empty() {
    vec![String::new()]
  } else {
    lines
  }
}

quickcheck::quickcheck! {
  fn push_then_pull_is_identity(lines: Vec<String>, row: usize, col: usize, register: String) -> TestResult {
    let lines = sanitize(lines);
    let row = row % lines.len();
    let col = col % (lines[row].chars().count() + 1);
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();

    let mut host = Host::new(&refs, Position::new(row, col));
    host
      .registers
      .put(register.clone(), &RegisterContext::default(), None)
      .unwrap();

    let mut executor = executor(FakeEngine::new(), &BridgeConfig::default());
    let pulled = executor.run_keystrokes(&mut host.ctx(), "").unwrap();

    TestResult::from_bool(
      pulled.lines == lines
        && host.doc.lines() == lines
        && host.state.cursor == Position::new(row, col)
        && host.registers.read(RegisterName::Unnamed)
          == RegisterContent::new(register, RegisterMode::CharacterWise),
    )
  }

  fn crlf_pull_strips_exactly_one_carriage_return(lines: Vec<String>) -> bool {
    let lines = sanitize(lines);
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    let mut host = Host::new(&refs, Position::zero());

    let synchronizer =
      StateSynchronizer::new(&BridgeConfig::default()).with_line_ending(LineEnding::Crlf);
    let mut executor = CommandExecutor::new(FakeEngine::new().with_line_suffix("\r"), synchronizer);
    let pulled = executor.run_keystrokes(&mut host.ctx(), "").unwrap();

    pulled.lines == lines && host.doc.lines() == lines
  }
}

/// Drives a real engine when one is installed.
#[test]
#[ignore]
fn test_real_engine_deletes_a_line() {
  if !the_stdx::env::binary_exists("nvim") {
    return;
  }

  let mut session = Session::start(BridgeConfig::default());
  let mut host = Host::new(&["first", "second"], Position::zero());

  let execution = session.run_keystrokes(&mut host.ctx(), "dd").unwrap();

  assert!(execution.is_bridged());
  assert_eq!(host.doc.lines(), vec!["second"]);
  assert_eq!(
    host.registers.read(RegisterName::Unnamed),
    RegisterContent::new("first\n", RegisterMode::LineWise)
  );
  session.shutdown();
}
