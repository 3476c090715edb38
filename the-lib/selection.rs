//! Single-cursor selections over line/column positions.
//!
//! A [`Selection`] has two positions: `anchor` and `head`. The `head` is where
//! the cursor visually appears, while the `anchor` is the other end of the
//! selection. When `anchor == head`, the selection is a point.
//!
//! ```text
//! anchor=0:2, head=0:7: "he[llo w]orld"  (forward selection)
//! anchor=0:7, head=0:2: "he]llo w[orld"  (backward selection)
//! anchor=0:5, head=0:5: "hello|world"    (point/cursor)
//! ```

use crate::position::Position;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Selection {
  pub anchor: Position,
  pub head:   Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
  Forward,
  Backward,
}

impl Selection {
  pub const fn new(anchor: Position, head: Position) -> Self {
    Self { anchor, head }
  }

  /// A zero-width selection at `pos`.
  pub const fn point(pos: Position) -> Self {
    Self {
      anchor: pos,
      head:   pos,
    }
  }

  /// Start of the selection, regardless of direction.
  #[inline]
  pub fn from(&self) -> Position {
    self.anchor.min(self.head)
  }

  /// End of the selection, regardless of direction.
  #[inline]
  pub fn to(&self) -> Position {
    self.anchor.max(self.head)
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.anchor == self.head
  }

  pub fn direction(&self) -> Direction {
    if self.head < self.anchor {
      Direction::Backward
    } else {
      Direction::Forward
    }
  }

  /// Collapse the selection onto its head.
  pub fn collapse(self) -> Self {
    Self::point(self.head)
  }
}
