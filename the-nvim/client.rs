//! Blocking msgpack-RPC client over an engine's stdio.

use std::time::{
  Duration,
  Instant,
};

use tracing::{
  debug,
  trace,
  warn,
};

use crate::{
  engine::{
    BufferHandle,
    ChannelError,
    EngineChannel,
    EngineError,
    EngineMode,
    EngineResult,
  },
  rpc::{
    self,
    Message,
    Value,
  },
  transport::{
    StdioTransport,
    TransportEvent,
  },
};

pub struct NvimClient {
  transport: StdioTransport,
  next_id:   u32,
  timeout:   Duration,
  closed:    bool,
  shut_down: bool,
}

impl NvimClient {
  pub fn new(transport: StdioTransport, timeout: Duration) -> Self {
    Self {
      transport,
      next_id: 1,
      timeout,
      closed: false,
      shut_down: false,
    }
  }

  pub fn is_closed(&self) -> bool {
    self.closed
  }

  /// Sends one request and waits for its response. Anything else that
  /// arrives meanwhile is drained: notifications are logged, requests from
  /// the engine are refused and stale responses are dropped.
  pub fn request(&mut self, method: &str, params: Vec<Value>) -> EngineResult<Value> {
    if self.closed {
      return Err(ChannelError::Closed.into());
    }

    let id = self.next_id;
    self.next_id = self.next_id.wrapping_add(1);
    trace!(id, method, "engine request");

    if let Err(err) = self.transport.send(Message::request(id, method, params)) {
      return Err(self.fail(ChannelError::Write(err.to_string())));
    }

    let deadline = Instant::now() + self.timeout;
    loop {
      let remaining = deadline.saturating_duration_since(Instant::now());
      let Some(event) = self.transport.recv_timeout(remaining) else {
        return Err(
          ChannelError::Timeout {
            method:  method.to_string(),
            timeout: self.timeout,
          }
          .into(),
        );
      };

      match event {
        TransportEvent::Message(Message::Response {
          id: response_id,
          error,
          result,
        }) if response_id == id => {
          if error.is_nil() {
            return Ok(result);
          }
          return Err(EngineError::Remote {
            method:  method.to_string(),
            message: rpc::error_message(&error),
          });
        },
        TransportEvent::Message(Message::Response { id: stale, .. }) => {
          debug!(id = stale, "dropping stale engine response");
        },
        TransportEvent::Message(Message::Request {
          id: request_id,
          method: engine_method,
          ..
        }) => {
          debug!(method = %engine_method, "refusing engine request");
          let reply = Message::response_err(request_id, "requests are not supported");
          if let Err(err) = self.transport.send(reply) {
            return Err(self.fail(ChannelError::Write(err.to_string())));
          }
        },
        TransportEvent::Message(Message::Notification {
          method: notification,
          ..
        }) => {
          trace!(method = %notification, "ignoring engine notification");
        },
        TransportEvent::Stderr(line) => warn!(line = %line, "engine stderr"),
        TransportEvent::ReadError(err) => return Err(self.fail(ChannelError::Read(err))),
        TransportEvent::WriteError(err) => return Err(self.fail(ChannelError::Write(err))),
        TransportEvent::Closed => return Err(self.fail(ChannelError::Closed)),
      }
    }
  }

  fn fail(&mut self, err: ChannelError) -> EngineError {
    self.closed = true;
    err.into()
  }
}

fn expect_lines(reply: Value) -> EngineResult<Vec<String>> {
  let unexpected = || {
    EngineError::UnexpectedReply {
      method:   "nvim_buf_get_lines",
      expected: "a list of strings",
    }
  };

  let Value::Array(items) = reply else {
    return Err(unexpected());
  };
  items
    .iter()
    .map(|item| rpc::as_text(item).map(String::from).ok_or_else(unexpected))
    .collect()
}

impl EngineChannel for NvimClient {
  fn current_buffer(&mut self) -> EngineResult<BufferHandle> {
    self
      .request("nvim_get_current_buf", Vec::new())
      .map(BufferHandle)
  }

  fn buf_set_lines(
    &mut self,
    buffer: &BufferHandle,
    start: i64,
    end: i64,
    strict: bool,
    lines: &[String],
  ) -> EngineResult<()> {
    let lines = lines.iter().map(|line| Value::from(line.as_str())).collect();
    self.request("nvim_buf_set_lines", vec![
      buffer.0.clone(),
      Value::from(start),
      Value::from(end),
      Value::from(strict),
      Value::Array(lines),
    ])?;
    Ok(())
  }

  fn buf_get_lines(
    &mut self,
    buffer: &BufferHandle,
    start: i64,
    end: i64,
    strict: bool,
  ) -> EngineResult<Vec<String>> {
    let reply = self.request("nvim_buf_get_lines", vec![
      buffer.0.clone(),
      Value::from(start),
      Value::from(end),
      Value::from(strict),
    ])?;
    expect_lines(reply)
  }

  fn set_option(&mut self, name: &str, value: Value) -> EngineResult<()> {
    self.request("nvim_set_option_value", vec![
      Value::from(name),
      value,
      Value::Map(Vec::new()),
    ])?;
    Ok(())
  }

  fn call_function(&mut self, name: &str, args: Vec<Value>) -> EngineResult<Value> {
    self.request("nvim_call_function", vec![
      Value::from(name),
      Value::Array(args),
    ])
  }

  fn input(&mut self, keys: &str) -> EngineResult<i64> {
    let reply = self.request("nvim_input", vec![Value::from(keys)])?;
    reply.as_i64().ok_or(EngineError::UnexpectedReply {
      method:   "nvim_input",
      expected: "a byte count",
    })
  }

  fn get_mode(&mut self) -> EngineResult<EngineMode> {
    let reply = self.request("nvim_get_mode", Vec::new())?;
    EngineMode::from_value(&reply)
  }

  fn shutdown(&mut self) -> EngineResult<()> {
    if self.shut_down {
      return Ok(());
    }
    self.shut_down = true;
    self.closed = true;

    let exit_code = self
      .transport
      .shutdown()
      .map_err(|err| EngineError::from(ChannelError::Transport(err.to_string())))?;
    debug!(?exit_code, "engine process stopped");
    Ok(())
  }
}

impl Drop for NvimClient {
  fn drop(&mut self) {
    let _ = EngineChannel::shutdown(self);
  }
}
