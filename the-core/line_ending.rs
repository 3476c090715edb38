use ropey::Rope;

#[cfg(target_os = "windows")]
pub const NATIVE_LINE_ENDING: LineEnding = LineEnding::Crlf;

#[cfg(not(target_os = "windows"))]
pub const NATIVE_LINE_ENDING: LineEnding = LineEnding::LF;

#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum LineEnding {
  /// CarriageReturn followed by LineFeed.
  Crlf,

  /// U+000A -- LineFeed
  LF,
}

impl LineEnding {
  #[inline]
  pub const fn len_chars(&self) -> usize {
    match self {
      Self::Crlf => 2,
      Self::LF => 1,
    }
  }

  #[inline]
  pub const fn as_str(&self) -> &'static str {
    match self {
      Self::Crlf => "\u{000D}\u{000A}",
      Self::LF => "\u{000A}",
    }
  }

  #[inline]
  #[allow(clippy::should_implement_trait)]
  pub fn from_str(g: &str) -> Option<LineEnding> {
    match g {
      "\u{000D}\u{000A}" => Some(LineEnding::Crlf),
      "\u{000A}" => Some(LineEnding::LF),
      _ => None,
    }
  }

  /// Whether lines that went through a child process pipe on this platform
  /// come back with a stray carriage return appended.
  #[inline]
  pub const fn appends_carriage_return(&self) -> bool {
    matches!(self, Self::Crlf)
  }
}

/// Attempts to detect what line ending the passed document uses.
pub fn auto_detect_line_ending(doc: &Rope) -> Option<LineEnding> {
  for line in doc.lines().take(100) {
    let len = line.len_chars();
    if len >= 2 && line.char(len - 2) == '\r' && line.char(len - 1) == '\n' {
      return Some(LineEnding::Crlf);
    }
    if len >= 1 && line.char(len - 1) == '\n' {
      return Some(LineEnding::LF);
    }
  }
  None
}

/// Removes a single trailing carriage return, if present.
#[inline]
pub fn strip_trailing_cr(line: &str) -> &str {
  line.strip_suffix('\r').unwrap_or(line)
}

/// Normalizes lines read back from an external process.
///
/// With a line ending that appends carriage returns every line loses exactly
/// one trailing `\r`; otherwise lines pass through untouched.
pub fn normalize_process_lines(lines: Vec<String>, line_ending: LineEnding) -> Vec<String> {
  if !line_ending.appends_carriage_return() {
    return lines;
  }

  lines
    .into_iter()
    .map(|mut line| {
      if line.ends_with('\r') {
        line.pop();
      }
      line
    })
    .collect()
}
