use std::{
  io::{
    BufRead,
    BufReader,
    BufWriter,
    ErrorKind,
    Write,
  },
  process::{
    Child,
    ChildStderr,
    ChildStdin,
    ChildStdout,
  },
  sync::mpsc::{
    Receiver,
    RecvTimeoutError,
    Sender,
    channel,
  },
  thread::{
    self,
    JoinHandle,
  },
  time::Duration,
};

use serde::Deserialize;
use thiserror::Error;
use tracing::{
  debug,
  warn,
};

use crate::rpc::Message;

#[derive(Debug, Clone)]
pub enum TransportEvent {
  Message(Message),
  Stderr(String),
  ReadError(String),
  WriteError(String),
  Closed,
}

enum TransportOutbound {
  Message(Message),
  Shutdown,
}

/// Reader, writer and stderr threads around a spawned engine process.
pub struct StdioTransport {
  child:         Child,
  outbound_tx:   Option<Sender<TransportOutbound>>,
  event_rx:      Receiver<TransportEvent>,
  reader_thread: Option<JoinHandle<()>>,
  writer_thread: Option<JoinHandle<()>>,
  stderr_thread: Option<JoinHandle<()>>,
}

impl StdioTransport {
  /// Takes ownership of a child spawned with all three stdio streams piped.
  /// The child is killed and reaped when the transport cannot be set up.
  pub fn new(mut child: Child) -> Result<Self, TransportError> {
    let (outbound_tx, event_rx, [writer_thread, reader_thread, stderr_thread]) =
      match start_threads(&mut child) {
        Ok(started) => started,
        Err(err) => {
          kill_and_reap(&mut child);
          return Err(err);
        },
      };

    Ok(Self {
      child,
      outbound_tx: Some(outbound_tx),
      event_rx,
      reader_thread: Some(reader_thread),
      writer_thread: Some(writer_thread),
      stderr_thread: Some(stderr_thread),
    })
  }

  pub fn send(&self, message: Message) -> Result<(), TransportError> {
    let tx = self
      .outbound_tx
      .as_ref()
      .ok_or(TransportError::OutboundChannelClosed)?;
    tx.send(TransportOutbound::Message(message))
      .map_err(|_| TransportError::OutboundChannelClosed)
  }

  /// Waits up to `timeout` for the next event. A disconnected event channel
  /// means every thread is gone and is reported as [`TransportEvent::Closed`].
  pub fn recv_timeout(&self, timeout: Duration) -> Option<TransportEvent> {
    match self.event_rx.recv_timeout(timeout) {
      Ok(event) => Some(event),
      Err(RecvTimeoutError::Timeout) => None,
      Err(RecvTimeoutError::Disconnected) => Some(TransportEvent::Closed),
    }
  }

  pub fn poll_exit_code(&mut self) -> Result<Option<i32>, TransportError> {
    let status = self.child.try_wait().map_err(TransportError::Wait)?;
    Ok(status.and_then(|status| status.code()))
  }

  pub fn shutdown(&mut self) -> Result<Option<i32>, TransportError> {
    if let Some(tx) = self.outbound_tx.take() {
      let _ = tx.send(TransportOutbound::Shutdown);
    }

    let exit_code = match self.child.try_wait().map_err(TransportError::Wait)? {
      Some(status) => status.code(),
      None => {
        if let Err(err) = self.child.kill()
          && err.kind() != ErrorKind::InvalidInput
        {
          return Err(TransportError::Kill(err));
        }
        self.child.wait().map_err(TransportError::Wait)?.code()
      },
    };

    join_thread(&mut self.writer_thread)?;
    join_thread(&mut self.reader_thread)?;
    join_thread(&mut self.stderr_thread)?;

    Ok(exit_code)
  }
}

type StartedThreads = (
  Sender<TransportOutbound>,
  Receiver<TransportEvent>,
  [JoinHandle<()>; 3],
);

fn start_threads(child: &mut Child) -> Result<StartedThreads, TransportError> {
  let stdin = child
    .stdin
    .take()
    .ok_or(TransportError::MissingPipe("stdin"))?;
  let stdout = child
    .stdout
    .take()
    .ok_or(TransportError::MissingPipe("stdout"))?;
  let stderr = child
    .stderr
    .take()
    .ok_or(TransportError::MissingPipe("stderr"))?;

  let (outbound_tx, outbound_rx) = channel();
  let (event_tx, event_rx) = channel();

  let writer_thread = spawn_writer_thread(stdin, outbound_rx, event_tx.clone())?;
  let reader_thread = spawn_reader_thread(stdout, event_tx.clone())?;
  let stderr_thread = spawn_stderr_thread(stderr, event_tx)?;

  Ok((outbound_tx, event_rx, [
    writer_thread,
    reader_thread,
    stderr_thread,
  ]))
}

fn kill_and_reap(child: &mut Child) {
  if let Err(err) = child.kill()
    && err.kind() != ErrorKind::InvalidInput
  {
    warn!(pid = child.id(), error = %err, "failed to kill engine process");
    return;
  }
  if let Err(err) = child.wait() {
    warn!(pid = child.id(), error = %err, "failed to reap engine process");
  }
}

fn spawn_reader_thread(
  stdout: ChildStdout,
  event_tx: Sender<TransportEvent>,
) -> Result<JoinHandle<()>, TransportError> {
  thread::Builder::new()
    .name("the-nvim-stdout".into())
    .spawn(move || {
      let mut deserializer = rmp_serde::Deserializer::new(BufReader::new(stdout));

      loop {
        match Message::deserialize(&mut deserializer) {
          Ok(message) => {
            if event_tx.send(TransportEvent::Message(message)).is_err() {
              break;
            }
          },
          Err(err) if is_end_of_stream(&err) => {
            let _ = event_tx.send(TransportEvent::Closed);
            break;
          },
          Err(err) => {
            let _ = event_tx.send(TransportEvent::ReadError(err.to_string()));
            break;
          },
        }
      }
    })
    .map_err(TransportError::SpawnThread)
}

fn spawn_writer_thread(
  stdin: ChildStdin,
  outbound_rx: Receiver<TransportOutbound>,
  event_tx: Sender<TransportEvent>,
) -> Result<JoinHandle<()>, TransportError> {
  thread::Builder::new()
    .name("the-nvim-stdin".into())
    .spawn(move || {
      let mut writer = BufWriter::new(stdin);
      while let Ok(outbound) = outbound_rx.recv() {
        match outbound {
          TransportOutbound::Message(message) => {
            if let Err(err) = write_message(&mut writer, &message) {
              let _ = event_tx.send(TransportEvent::WriteError(err.to_string()));
              break;
            }
          },
          TransportOutbound::Shutdown => break,
        }
      }
    })
    .map_err(TransportError::SpawnThread)
}

fn spawn_stderr_thread(
  stderr: ChildStderr,
  event_tx: Sender<TransportEvent>,
) -> Result<JoinHandle<()>, TransportError> {
  thread::Builder::new()
    .name("the-nvim-stderr".into())
    .spawn(move || {
      let mut reader = BufReader::new(stderr);
      let mut line = String::new();
      loop {
        line.clear();
        match reader.read_line(&mut line) {
          Ok(0) => break,
          Ok(_) => {
            let line = line.trim_end_matches(['\r', '\n']).to_string();
            if !line.is_empty() {
              let _ = event_tx.send(TransportEvent::Stderr(line));
            }
          },
          Err(err) => {
            debug!(error = %err, "engine stderr stream closed with error");
            break;
          },
        }
      }
    })
    .map_err(TransportError::SpawnThread)
}

fn is_end_of_stream(err: &rmp_serde::decode::Error) -> bool {
  match err {
    rmp_serde::decode::Error::InvalidMarkerRead(io) => io.kind() == ErrorKind::UnexpectedEof,
    _ => false,
  }
}

fn write_message<W: Write>(writer: &mut W, message: &Message) -> Result<(), TransportError> {
  rmp_serde::encode::write(writer, message).map_err(TransportError::Encode)?;
  writer.flush().map_err(TransportError::Flush)?;
  Ok(())
}

fn join_thread(handle: &mut Option<JoinHandle<()>>) -> Result<(), TransportError> {
  if let Some(handle) = handle.take() {
    handle.join().map_err(|_| TransportError::ThreadPanicked)?;
  }
  Ok(())
}

#[derive(Debug, Error)]
pub enum TransportError {
  #[error("missing child {0} pipe")]
  MissingPipe(&'static str),
  #[error("failed to spawn transport thread: {0}")]
  SpawnThread(std::io::Error),
  #[error("transport outbound channel is closed")]
  OutboundChannelClosed,
  #[error("failed to encode msgpack-rpc message: {0}")]
  Encode(rmp_serde::encode::Error),
  #[error("failed to flush message: {0}")]
  Flush(std::io::Error),
  #[error("failed to kill engine process: {0}")]
  Kill(std::io::Error),
  #[error("failed to wait for engine process: {0}")]
  Wait(std::io::Error),
  #[error("transport thread panicked")]
  ThreadPanicked,
}
