//! Side-effectful runtime pieces for hosts embedding the bridge.

pub mod clipboard;
