//! Base16 builder core library
//!
//! Scheme loading and fact expansion, template groups, workspace layout and
//! the shared error type.

pub mod config;
pub mod error;
pub mod scheme;
pub mod templates;
pub mod utils;

pub use error::{Error, Result};
