//! Cutting the A/B region into a clip through the isolated cut worker.

pub mod job;
pub mod protocol;
pub mod worker;

pub use job::{CutButton, CutJobs, CutOutcome, CutSource};
pub use worker::CutterChannel;
