//! Manifest file format for template groups.
//!
//! Every group keeps a `templates/config.yaml` that maps template names to
//! their output settings:
//!
//! ```yaml
//! default:
//!   extension: .vim
//!   output: colors
//! lightline:
//!   extension: .vim
//!   output: autoload/lightline/colorscheme
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::debug;

use crate::core::error::{Error, Result};

/// Directory inside a group that holds the manifest and template bodies
pub const TEMPLATES_SUBDIR: &str = "templates";

/// File name of the group manifest
pub const MANIFEST_FILE: &str = "config.yaml";

/// File extension of template bodies
pub const TEMPLATE_BODY_EXT: &str = "mustache";

/// Output settings for a single template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Output subdirectory, relative to `<output>/<group>`
    pub output: String,

    /// Extension of generated files, including the leading dot
    #[serde(default)]
    pub extension: Option<String>,
}

/// Parsed `config.yaml` of a template group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupManifest {
    pub templates: BTreeMap<String, ManifestEntry>,
}

impl GroupManifest {
    /// Path of the manifest for the group rooted at `group_dir`
    pub fn path_in(group_dir: &Path) -> PathBuf {
        group_dir.join(TEMPLATES_SUBDIR).join(MANIFEST_FILE)
    }

    /// Load the manifest of the group rooted at `group_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TemplateGroupNotFound`] if there is no manifest and
    /// [`Error::ManifestParse`] if it is not a valid name to settings mapping.
    pub async fn load_from_dir(group_dir: &Path) -> Result<Self> {
        let manifest_path = Self::path_in(group_dir);

        debug!(
            manifest_path = %manifest_path.display(),
            "Attempting to read group manifest"
        );
        let content = match fs::read_to_string(&manifest_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::TemplateGroupNotFound(
                    group_dir.display().to_string(),
                ));
            }
            Err(e) => return Err(Error::Io(e)),
        };

        Self::parse(&content, &manifest_path)
    }

    /// Parse manifest YAML read from `manifest_path`
    pub fn parse(content: &str, manifest_path: &Path) -> Result<Self> {
        // an empty manifest is a group without templates
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(content).map_err(|source| Error::ManifestParse {
            path: manifest_path.to_path_buf(),
            source,
        })
    }
}
