//! User-defined marks tracked alongside the edit history.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::position::Position;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MarkError {
  #[error("{0:?} is not a user mark name")]
  InvalidName(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark {
  pub name:     char,
  pub position: Position,
}

/// Marks `a`-`z` and `A`-`Z`, iterated in name order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Marks {
  inner: BTreeMap<char, Position>,
}

impl Marks {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_user_mark(name: char) -> bool {
    name.is_ascii_alphabetic()
  }

  pub fn set(&mut self, name: char, position: Position) -> Result<(), MarkError> {
    if !Self::is_user_mark(name) {
      return Err(MarkError::InvalidName(name));
    }
    self.inner.insert(name, position);
    Ok(())
  }

  pub fn get(&self, name: char) -> Option<Position> {
    self.inner.get(&name).copied()
  }

  pub fn remove(&mut self, name: char) -> Option<Position> {
    self.inner.remove(&name)
  }

  pub fn len(&self) -> usize {
    self.inner.len()
  }

  pub fn is_empty(&self) -> bool {
    self.inner.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = Mark> + '_ {
    self
      .inner
      .iter()
      .map(|(&name, &position)| Mark { name, position })
  }
}

impl FromIterator<Mark> for Marks {
  fn from_iter<T: IntoIterator<Item = Mark>>(iter: T) -> Self {
    let inner = iter
      .into_iter()
      .filter(|mark| Self::is_user_mark(mark.name))
      .map(|mark| (mark.name, mark.position))
      .collect();
    Self { inner }
  }
}
