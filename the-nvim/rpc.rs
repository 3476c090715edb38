//! msgpack-RPC messages as spoken by an embedded Neovim.
//!
//! ```text
//! request:      [0, msgid, method, params]
//! response:     [1, msgid, error, result]
//! notification: [2, method, params]
//! ```
//!
//! Payloads are dynamic [`rmpv::Value`]s. Buffer, window and tabpage handles
//! arrive as msgpack ext values and are kept opaque so they can be sent back
//! as-is.

use std::fmt;

pub use rmpv::Value;
use serde::{
  Deserialize,
  Deserializer,
  Serialize,
  Serializer,
  de::{
    self,
    SeqAccess,
    Visitor,
  },
  ser::SerializeTuple,
};

const REQUEST: u8 = 0;
const RESPONSE: u8 = 1;
const NOTIFICATION: u8 = 2;

/// Strings may come over the wire as `str` or `bin`.
pub fn as_text(value: &Value) -> Option<&str> {
  match value {
    Value::String(text) => text.as_str(),
    Value::Binary(bytes) => std::str::from_utf8(bytes).ok(),
    _ => None,
  }
}

/// Look up a string key in a map value.
pub fn map_get<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
  value
    .as_map()?
    .iter()
    .find(|(k, _)| as_text(k) == Some(key))
    .map(|(_, v)| v)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
  Request {
    id:     u32,
    method: String,
    params: Vec<Value>,
  },
  Response {
    id:     u32,
    error:  Value,
    result: Value,
  },
  Notification {
    method: String,
    params: Vec<Value>,
  },
}

impl Message {
  pub fn request(id: u32, method: impl Into<String>, params: Vec<Value>) -> Self {
    Self::Request {
      id,
      method: method.into(),
      params,
    }
  }

  pub fn response_ok(id: u32, result: Value) -> Self {
    Self::Response {
      id,
      error: Value::Nil,
      result,
    }
  }

  pub fn response_err(id: u32, message: impl Into<String>) -> Self {
    let message: String = message.into();
    Self::Response {
      id,
      error: Value::Array(vec![Value::from(0), Value::from(message)]),
      result: Value::Nil,
    }
  }

  pub fn id(&self) -> Option<u32> {
    match self {
      Self::Request { id, .. } | Self::Response { id, .. } => Some(*id),
      Self::Notification { .. } => None,
    }
  }
}

/// Human readable text of a msgpack-RPC error payload, `[type, message]` for
/// Neovim.
pub fn error_message(error: &Value) -> String {
  error
    .as_array()
    .and_then(|parts| parts.get(1))
    .and_then(as_text)
    .or_else(|| as_text(error))
    .map(String::from)
    .unwrap_or_else(|| format!("{error:?}"))
}

impl Serialize for Message {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    match self {
      Self::Request { id, method, params } => {
        let mut tuple = serializer.serialize_tuple(4)?;
        tuple.serialize_element(&REQUEST)?;
        tuple.serialize_element(id)?;
        tuple.serialize_element(method)?;
        tuple.serialize_element(params)?;
        tuple.end()
      },
      Self::Response { id, error, result } => {
        let mut tuple = serializer.serialize_tuple(4)?;
        tuple.serialize_element(&RESPONSE)?;
        tuple.serialize_element(id)?;
        tuple.serialize_element(error)?;
        tuple.serialize_element(result)?;
        tuple.end()
      },
      Self::Notification { method, params } => {
        let mut tuple = serializer.serialize_tuple(3)?;
        tuple.serialize_element(&NOTIFICATION)?;
        tuple.serialize_element(method)?;
        tuple.serialize_element(params)?;
        tuple.end()
      },
    }
  }
}

struct MessageVisitor;

impl MessageVisitor {
  fn next<'de, A, T>(seq: &mut A, index: usize) -> Result<T, A::Error>
  where
    A: SeqAccess<'de>,
    T: Deserialize<'de>,
  {
    seq
      .next_element()?
      .ok_or_else(|| de::Error::invalid_length(index, &MessageVisitor))
  }
}

impl<'de> Visitor<'de> for MessageVisitor {
  type Value = Message;

  fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("a msgpack-rpc message array")
  }

  fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Message, A::Error> {
    let kind: u8 = Self::next(&mut seq, 0)?;
    let message = match kind {
      REQUEST => {
        Message::Request {
          id:     Self::next(&mut seq, 1)?,
          method: Self::next(&mut seq, 2)?,
          params: Self::next(&mut seq, 3)?,
        }
      },
      RESPONSE => {
        Message::Response {
          id:     Self::next(&mut seq, 1)?,
          error:  Self::next(&mut seq, 2)?,
          result: Self::next(&mut seq, 3)?,
        }
      },
      NOTIFICATION => {
        Message::Notification {
          method: Self::next(&mut seq, 1)?,
          params: Self::next(&mut seq, 2)?,
        }
      },
      other => {
        return Err(de::Error::invalid_value(
          de::Unexpected::Unsigned(other.into()),
          &"message type 0, 1 or 2",
        ));
      },
    };

    // Drain anything trailing so the stream stays aligned.
    while seq.next_element::<de::IgnoredAny>()?.is_some() {}
    Ok(message)
  }
}

impl<'de> Deserialize<'de> for Message {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    deserializer.deserialize_seq(MessageVisitor)
  }
}
