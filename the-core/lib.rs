//! Text primitives shared by the bridge crates.

pub mod line_ending;
