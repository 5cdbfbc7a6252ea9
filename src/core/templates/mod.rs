//! Template groups for scheme rendering.
//!
//! This module loads template groups from disk, compiles their mustache bodies
//! once and renders fact tables through them. It also locates groups and scheme
//! files inside a workspace.
//!
//! The template system supports:
//! - Group manifests mapping template names to output settings
//! - Pre-compiled bodies shared read-only across concurrent renders
//! - Discovery of groups and selector-filtered scheme files

pub mod dir;
pub mod group;
pub mod manifest;

pub use dir::*;
pub use group::*;
pub use manifest::*;
