// src/progress.rs
use crate::core::RangeDescriptor;
use crate::crawl::scheduler::{RangeState, RunReport};

/// Lightweight progress reporting for a crawl.
/// Frontends (CLI, embedding apps) implement this to surface status to users.
pub trait Progress {
    /// Called once with the range the run starts from.
    fn begin(&mut self, _initial: RangeDescriptor) {}

    /// Free-form status line for human eyes.
    fn log(&mut self, _msg: &str) {}

    /// Called when one range leaves the queue.
    fn range_done(&mut self, _range: RangeDescriptor, _state: RangeState, _hits: u64) {}

    /// Called at the end, successful or not.
    fn finish(&mut self, _report: &RunReport) {}
}

/// A no-op progress sink.
pub struct NullProgress;
impl Progress for NullProgress {}
