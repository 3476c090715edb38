use std::collections::VecDeque;

use serde::{
  Deserialize,
  Serialize,
};

pub const DEFAULT_HISTORY_LIMIT: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageLevel {
  Info,
  Warning,
  Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
  pub id:     u64,
  pub level:  MessageLevel,
  pub source: Option<String>,
  pub text:   String,
}

/// User-facing notices, kept until the host has shown them.
#[derive(Debug, Clone)]
pub struct MessageCenter {
  history:         VecDeque<Message>,
  unseen:          usize,
  next_message_id: u64,
  history_limit:   usize,
}

impl Default for MessageCenter {
  fn default() -> Self {
    Self::with_limit(DEFAULT_HISTORY_LIMIT)
  }
}

impl MessageCenter {
  pub fn with_limit(history_limit: usize) -> Self {
    Self {
      history:         VecDeque::new(),
      unseen:          0,
      next_message_id: 1,
      history_limit:   history_limit.max(1),
    }
  }

  pub fn latest(&self) -> Option<&Message> {
    self.history.back()
  }

  pub fn history_len(&self) -> usize {
    self.history.len()
  }

  pub fn history(&self) -> impl Iterator<Item = &Message> {
    self.history.iter()
  }

  pub fn publish(
    &mut self,
    level: MessageLevel,
    source: Option<String>,
    text: impl Into<String>,
  ) -> Message {
    let message = Message {
      id: self.next_message_id,
      level,
      source,
      text: text.into(),
    };
    self.next_message_id = self.next_message_id.saturating_add(1);

    self.history.push_back(message.clone());
    self.unseen += 1;
    while self.history.len() > self.history_limit {
      self.history.pop_front();
    }
    self.unseen = self.unseen.min(self.history.len());
    message
  }

  pub fn info(&mut self, source: Option<String>, text: impl Into<String>) -> Message {
    self.publish(MessageLevel::Info, source, text)
  }

  pub fn warning(&mut self, source: Option<String>, text: impl Into<String>) -> Message {
    self.publish(MessageLevel::Warning, source, text)
  }

  pub fn error(&mut self, source: Option<String>, text: impl Into<String>) -> Message {
    self.publish(MessageLevel::Error, source, text)
  }

  /// Messages published since the last call, oldest first.
  pub fn take_unseen(&mut self) -> Vec<Message> {
    let start = self.history.len() - self.unseen;
    self.unseen = 0;
    self.history.iter().skip(start).cloned().collect()
  }

  pub fn clear(&mut self) {
    self.history.clear();
    self.unseen = 0;
  }
}
