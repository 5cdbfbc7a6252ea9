//! Template groups and their parsed template definitions.
//!
//! A group is loaded once and then shared read-only across every render job
//! that uses it, so bodies are compiled at load time and never touched again.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tracing::{debug, info};

use super::manifest::{GroupManifest, TEMPLATE_BODY_EXT, TEMPLATES_SUBDIR};
use crate::core::error::{Error, Result};
use crate::core::scheme::FactTable;

/// Sub-template name used when a reference names only the group
pub const DEFAULT_TEMPLATE: &str = "default";

/// One template of a group: where its output goes and its compiled body
pub struct TemplateDefinition {
    /// Name, unique within the group
    pub name: String,
    /// Output subdirectory relative to `<output>/<group>`
    pub output: PathBuf,
    /// Extension of generated files; `None` means no extension
    pub extension: Option<String>,
    body: mustache::Template,
}

impl TemplateDefinition {
    /// File name of the output generated for the scheme with `slug`
    pub fn output_file_name(&self, slug: &str) -> String {
        format!("base16-{}{}", slug, self.extension.as_deref().unwrap_or(""))
    }
}

impl fmt::Debug for TemplateDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateDefinition")
            .field("name", &self.name)
            .field("output", &self.output)
            .field("extension", &self.extension)
            .finish_non_exhaustive()
    }
}

/// A named set of templates sharing one manifest
#[derive(Debug, Clone)]
pub struct TemplateGroup {
    name: String,
    path: PathBuf,
    templates: BTreeMap<String, Arc<TemplateDefinition>>,
}

impl TemplateGroup {
    /// Load the group rooted at `group_path`.
    ///
    /// Reads `<group_path>/templates/config.yaml` and compiles
    /// `<group_path>/templates/<name>.mustache` for every entry.
    ///
    /// # Errors
    ///
    /// - [`Error::TemplateGroupNotFound`] if the manifest is absent
    /// - [`Error::TemplateBodyNotFound`] if a body file is missing
    /// - [`Error::ManifestParse`] / [`Error::TemplateParse`] for malformed files
    pub async fn load(group_path: impl AsRef<Path>) -> Result<Self> {
        let group_path = group_path.as_ref();
        let name = group_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| group_path.display().to_string());

        let manifest = GroupManifest::load_from_dir(group_path).await?;
        let body_dir = group_path.join(TEMPLATES_SUBDIR);

        let mut templates = BTreeMap::new();
        for (template_name, entry) in manifest.templates {
            let body_path = body_dir.join(format!("{template_name}.{TEMPLATE_BODY_EXT}"));
            let source = match fs::read_to_string(&body_path).await {
                Ok(source) => source,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    return Err(Error::TemplateBodyNotFound(body_path));
                }
                Err(e) => return Err(Error::Io(e)),
            };
            let body = mustache::compile_str(&source).map_err(|source| Error::TemplateParse {
                path: body_path.clone(),
                source,
            })?;
            debug!(group = %name, template = %template_name, "Compiled template body");

            templates.insert(
                template_name.clone(),
                Arc::new(TemplateDefinition {
                    name: template_name,
                    output: PathBuf::from(entry.output),
                    extension: entry.extension,
                    body,
                }),
            );
        }

        info!(group = %name, templates = templates.len(), "Loaded template group");
        Ok(Self {
            name,
            path: group_path.to_path_buf(),
            templates,
        })
    }

    /// Group name, the base name of its directory
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up a template definition by name
    pub fn get(&self, template_name: &str) -> Option<&Arc<TemplateDefinition>> {
        self.templates.get(template_name)
    }

    /// Iterate over the group's definitions in name order
    pub fn templates(&self) -> impl Iterator<Item = &Arc<TemplateDefinition>> {
        self.templates.values()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Apply `facts` to a definition's body. Never touches the filesystem.
    pub fn render(&self, definition: &TemplateDefinition, facts: &FactTable) -> Result<String> {
        definition
            .body
            .render_to_string(facts)
            .map_err(|source| Error::Render {
                template: format!("{}##{}", self.name, definition.name),
                source,
            })
    }
}
