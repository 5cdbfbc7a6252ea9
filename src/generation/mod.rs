//! Build domain - renders every selected scheme through every selected template
//!
//! The scheduler computes the full job matrix up front, then runs the jobs on a
//! bounded worker pool. Each job's outcome is recorded on its own, so one bad
//! scheme or one failed write never stops its siblings.

pub mod orchestrator;
pub mod types;

pub use orchestrator::*;
pub use types::*;
