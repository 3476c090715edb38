use std::fmt;

/// This is a single point in a text buffer.
/// 0-indexed as all things should be.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
  pub row: usize,
  pub col: usize,
}

impl Position {
  pub const fn new(row: usize, col: usize) -> Self {
    Self { row, col }
  }

  pub const fn zero() -> Self {
    Self { row: 0, col: 0 }
  }

  pub const fn is_zero(&self) -> bool {
    self.row == 0 && self.col == 0
  }

  /// The earlier of two positions, in document order.
  pub fn earlier_of(a: Self, b: Self) -> Self {
    a.min(b)
  }

  /// The later of two positions, in document order.
  pub fn later_of(a: Self, b: Self) -> Self {
    a.max(b)
  }
}

impl From<(usize, usize)> for Position {
  fn from((row, col): (usize, usize)) -> Self {
    Self { row, col }
  }
}

impl fmt::Display for Position {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.row, self.col)
  }
}
