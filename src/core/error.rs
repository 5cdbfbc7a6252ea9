//! Error handling for the base16 builder.
//!
//! This module defines the main error type `Error` used throughout the library,
//! along with a convenient `Result` type alias. Variants fall into three groups:
//!
//! - configuration/resource errors that abort a whole operation before any
//!   job runs,
//! - per-job errors that the build scheduler records and keeps going,
//! - injection errors that are fatal to a single target file.
//!
//! # Examples
//!
//! ```
//! use base16_builder::core::error::{Error, Result};
//!
//! fn might_fail() -> Result<()> {
//!     Err(Error::NoResources)
//! }
//!
//! assert!(might_fail().unwrap_err().is_fatal());
//! ```

use std::path::PathBuf;

use thiserror::Error;

/// Result type for base16 builder operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for base16 builder operations
#[derive(Debug, Error)]
pub enum Error {
    /// No template groups or no schemes were resolved
    #[error("Necessary resources for building not found in the workspace")]
    NoResources,

    /// The output root cannot be created or written to
    #[error("No write permission for output directory {}", .0.display())]
    OutputPermission(PathBuf),

    /// A template group has no manifest
    #[error("Template group not found: {0}")]
    TemplateGroupNotFound(String),

    /// A manifest entry references a body file that does not exist
    #[error("Template body not found: {}", .0.display())]
    TemplateBodyNotFound(PathBuf),

    /// A manifest is not valid YAML or has the wrong shape
    #[error("Invalid manifest {}: {source}", .path.display())]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A template body could not be compiled
    #[error("Failed to parse template {}: {source}", .path.display())]
    TemplateParse {
        path: PathBuf,
        #[source]
        source: mustache::Error,
    },

    /// Two render jobs would write the same file
    #[error("Two jobs target the same destination: {}", .0.display())]
    DuplicateDestination(PathBuf),

    /// A scheme file is missing a key or carries a malformed value
    #[error("Malformed scheme {}: {reason}", .path.display())]
    MalformedPalette { path: PathBuf, reason: String },

    /// The referenced sub-template does not exist in its group
    #[error("Sub-template \"{template}\" not found in template group \"{group}\"")]
    SubTemplateNotFound { group: String, template: String },

    /// Rendering a parsed template failed
    #[error("Failed to render template \"{template}\": {source}")]
    Render {
        template: String,
        #[source]
        source: mustache::Error,
    },

    /// The target file has no valid marker pair
    #[error("\"{}\" has no valid injection marker lines", .0.display())]
    NoMarker(PathBuf),

    /// A scheme selector matched more than one scheme
    #[error("Pattern \"{selector}\" matches more than one scheme ({count} matches)")]
    AmbiguousSelector { selector: String, count: usize },

    /// A scheme selector matched nothing
    #[error("No scheme \"{0}\" found")]
    PaletteNotFound(String),

    /// The target file does not exist
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The target path is a directory
    #[error("\"{}\" is a directory, not a file", .0.display())]
    IsADirectory(PathBuf),

    /// No `git` executable on `$PATH`
    #[error("Git executable not found in $PATH")]
    GitNotFound,

    /// Source list could not be read during an update
    #[error("Source list error: {0}")]
    Sources(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Create a malformed scheme error
    pub fn malformed<P: Into<PathBuf>, S: Into<String>>(path: P, reason: S) -> Self {
        Self::MalformedPalette {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a source list error
    pub fn sources<S: Into<String>>(msg: S) -> Self {
        Self::Sources(msg.into())
    }

    /// Whether this error aborts an entire operation rather than one job.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::NoResources
                | Self::OutputPermission(_)
                | Self::TemplateGroupNotFound(_)
                | Self::TemplateBodyNotFound(_)
                | Self::ManifestParse { .. }
                | Self::TemplateParse { .. }
                | Self::AmbiguousSelector { .. }
                | Self::PaletteNotFound(_)
                | Self::GitNotFound
        )
    }
}
