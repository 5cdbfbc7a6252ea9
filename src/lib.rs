//! base16-builder: render base16 color schemes through mustache templates
//! and inject them into existing configuration files.
#![deny(unsafe_code)]

pub mod application;
pub mod core;
pub mod generation;
pub mod infrastructure;
pub mod injection;
