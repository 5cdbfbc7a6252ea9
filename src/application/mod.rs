//! Application layer - orchestrates use cases and coordinates between domains

pub mod update;

pub use update::*;
