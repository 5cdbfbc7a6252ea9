//! Workspace root resolution and the conventional directory layout beneath it.
//!
//! Every operation receives a [`Workspace`] explicitly instead of consulting
//! the process working directory on its own.

use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

/// Environment variable that overrides the workspace root
pub const ROOT_ENV_VAR: &str = "BASE16_BUILDER_ROOT";

/// Trait for reading the configured root, allowing dependency injection for testing
pub trait RootConfigReader {
    fn get_root(&self) -> Option<String>;
}

/// Production implementation that reads from environment variables
pub struct EnvRootConfigReader;

impl RootConfigReader for EnvRootConfigReader {
    fn get_root(&self) -> Option<String> {
        std::env::var(ROOT_ENV_VAR).ok().filter(|s| !s.is_empty())
    }
}

/// Mock implementation for testing with controlled values
#[cfg(test)]
pub struct MockRootConfigReader(Option<String>);

#[cfg(test)]
impl MockRootConfigReader {
    pub fn new(root: Option<String>) -> Self {
        Self(root)
    }
}

#[cfg(test)]
impl RootConfigReader for MockRootConfigReader {
    fn get_root(&self) -> Option<String> {
        self.0.clone()
    }
}

/// The directory holding `templates/`, `schemes/`, `sources/` and `output/`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Use `root` as the workspace root, made absolute against the current directory.
    pub fn new(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        let root = if root.is_absolute() {
            root
        } else {
            std::env::current_dir()?.join(root)
        };
        Ok(Self { root })
    }

    /// Resolve the workspace root.
    ///
    /// Resolution order:
    /// 1. `custom_root` (CLI `--root` flag)
    /// 2. `BASE16_BUILDER_ROOT` environment variable
    /// 3. the current directory
    pub fn resolve(custom_root: Option<&Path>) -> io::Result<Self> {
        Self::resolve_with_config(custom_root, &EnvRootConfigReader)
    }

    /// Resolve the workspace root with a custom config reader (for testing)
    pub fn resolve_with_config(
        custom_root: Option<&Path>,
        config_reader: &dyn RootConfigReader,
    ) -> io::Result<Self> {
        let workspace = if let Some(dir) = custom_root {
            debug!("Using custom workspace root: {}", dir.display());
            Self::new(dir)?
        } else if let Some(dir) = config_reader.get_root() {
            debug!("Using {}: {}", ROOT_ENV_VAR, dir);
            Self::new(dir)?
        } else {
            Self::new(std::env::current_dir()?)?
        };
        debug!("Resolved workspace root: {}", workspace.root.display());
        Ok(workspace)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/templates`, one subdirectory per template group
    pub fn templates_dir(&self) -> PathBuf {
        self.root.join("templates")
    }

    /// `<root>/schemes`, one subdirectory per scheme repository
    pub fn schemes_dir(&self) -> PathBuf {
        self.root.join("schemes")
    }

    /// `<root>/sources`, the scheme and template source lists
    pub fn sources_dir(&self) -> PathBuf {
        self.root.join("sources")
    }

    /// `<root>/sources.yaml`
    pub fn sources_file(&self) -> PathBuf {
        self.root.join("sources.yaml")
    }

    /// Default build output root, `<root>/output`
    pub fn default_output_dir(&self) -> PathBuf {
        self.root.join("output")
    }

    /// Directory of the template group called `name`
    pub fn group_dir(&self, name: &str) -> PathBuf {
        self.templates_dir().join(name)
    }
}
