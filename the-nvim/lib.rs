//! Bridge to an embedded Neovim used as a modal editing engine.
//!
//! The host pushes its buffer, cursor, marks and unnamed register into the
//! engine, feeds it keys or an ex command, and pulls the result back. See
//! [`session::Session`] for the entry point.

pub mod client;
pub mod config;
pub mod engine;
pub mod executor;
pub mod process;
pub mod rpc;
pub mod session;
pub mod state;
pub mod sync;
pub mod transport;

pub use client::NvimClient;
pub use config::BridgeConfig;
pub use engine::{
  ChannelError,
  EngineChannel,
  EngineError,
};
pub use executor::CommandExecutor;
pub use session::{
  Execution,
  Session,
};
pub use state::{
  EditorState,
  PulledState,
  SyncContext,
};
pub use sync::{
  StateSynchronizer,
  SyncError,
};
