//! # Cadence Run Log
//!
//! Durable run history. Every finalized attempt is appended as one JSON line
//! to `<home>/<job>.job.jsonl`; the most recent runs of a job are read back by
//! scanning the file from its end.

mod error;
mod file;
mod memory;
mod store;
mod tail;

pub use error::RunLogError;
pub use file::FileRunLog;
pub use memory::MemoryRunStore;
pub use store::RunStore;
pub use tail::read_last;
