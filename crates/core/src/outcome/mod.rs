//! Durable, append-only call outcome logs.
//!
//! Delivered calls go to the success log; every other terminal outcome goes
//! to the retry log, which doubles as input for a follow-up run.

mod file_sink;
mod types;

pub use file_sink::{read_outcome_log, FileOutcomeSink};
pub use types::*;
