//! Injection of a rendered scheme into existing configuration files
//!
//! Each target file carries a marker pair naming a template reference. The
//! reference is resolved against the workspace's template groups, rendered with
//! the selected scheme and spliced between the markers; everything else in the
//! file is left untouched.

pub mod markers;
pub mod recipient;

pub use markers::*;
pub use recipient::*;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{error, info};

use crate::core::config::Workspace;
use crate::core::error::{Error, Result};
use crate::core::scheme::{FactTable, Scheme, expand};
use crate::core::templates::{TemplateGroup, find_scheme_files};

/// Resolve `selector` to exactly one scheme file.
///
/// # Errors
///
/// [`Error::PaletteNotFound`] when nothing matches and
/// [`Error::AmbiguousSelector`] when more than one scheme does.
pub async fn resolve_scheme(workspace: &Workspace, selector: &str) -> Result<PathBuf> {
    let mut matches = find_scheme_files(workspace, &[selector.to_string()]).await?;
    match matches.len() {
        0 => Err(Error::PaletteNotFound(selector.to_string())),
        1 => Ok(matches.remove(0)),
        count => Err(Error::AmbiguousSelector {
            selector: selector.to_string(),
            count,
        }),
    }
}

/// Render `facts` through the template a reference points at.
///
/// # Errors
///
/// [`Error::TemplateGroupNotFound`] naming the group, or
/// [`Error::SubTemplateNotFound`] naming group and sub-template.
pub async fn render_reference(
    workspace: &Workspace,
    reference: &TemplateRef,
    facts: &FactTable,
) -> Result<String> {
    let group = TemplateGroup::load(workspace.group_dir(&reference.group))
        .await
        .map_err(|e| match e {
            Error::TemplateGroupNotFound(_) => {
                Error::TemplateGroupNotFound(reference.group.clone())
            }
            other => other,
        })?;

    let template = group
        .get(&reference.template)
        .ok_or_else(|| Error::SubTemplateNotFound {
            group: reference.group.clone(),
            template: reference.template.clone(),
        })?;

    group.render(template, facts)
}

/// Locate, render, splice and persist a single file
pub async fn inject_file(
    workspace: &Workspace,
    facts: &FactTable,
    path: &Path,
) -> Result<TemplateRef> {
    let mut recipient = Recipient::load(path).await?;
    let reference = recipient.locate()?;
    let rendered = render_reference(workspace, &reference, facts).await?;
    recipient.splice(&rendered)?;
    recipient.persist().await?;
    Ok(reference)
}

/// Outcome of injecting into one file
#[derive(Debug)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub result: Result<TemplateRef>,
}

/// Aggregate result of an injection run
#[derive(Debug)]
pub struct InjectReport {
    /// The scheme file that was injected
    pub scheme: PathBuf,
    /// One outcome per distinct target, in the order given
    pub files: Vec<FileOutcome>,
}

impl InjectReport {
    pub fn failures(&self) -> usize {
        self.files.iter().filter(|f| f.result.is_err()).count()
    }

    /// True when every file was injected
    pub fn is_clean(&self) -> bool {
        self.failures() == 0
    }
}

/// Inject the scheme matched by `selector` into every file in `files`.
///
/// Files are processed concurrently; a failure in one file does not stop the
/// others and is reported in the returned [`InjectReport`].
///
/// # Errors
///
/// Fails before touching any file if the selector does not match exactly one
/// scheme or the scheme is malformed.
pub async fn inject(
    workspace: &Workspace,
    selector: &str,
    files: &[PathBuf],
) -> Result<InjectReport> {
    let scheme_path = resolve_scheme(workspace, selector).await?;
    let scheme = Scheme::load(&scheme_path).await?;
    let facts = Arc::new(expand(&scheme)?);
    info!(scheme = %scheme.name, files = files.len(), "Injecting scheme");

    let mut targets: Vec<PathBuf> = Vec::with_capacity(files.len());
    for file in files {
        if !targets.contains(file) {
            targets.push(file.clone());
        }
    }

    let mut join_set = JoinSet::new();
    for (index, path) in targets.iter().cloned().enumerate() {
        let workspace = workspace.clone();
        let facts = Arc::clone(&facts);
        join_set.spawn(async move {
            let result = inject_file(&workspace, &facts, &path).await;
            (index, FileOutcome { path, result })
        });
    }

    let mut outcomes: Vec<Option<FileOutcome>> = targets.iter().map(|_| None).collect();
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((index, outcome)) => {
                match &outcome.result {
                    Ok(reference) => {
                        info!(path = %outcome.path.display(), template = %reference, "Injected scheme")
                    }
                    Err(e) => error!(path = %outcome.path.display(), "{}", e),
                }
                outcomes[index] = Some(outcome);
            }
            Err(e) => error!(error = %e, "Injection task did not complete"),
        }
    }

    let files = outcomes
        .into_iter()
        .zip(targets)
        .map(|(outcome, path)| {
            outcome.unwrap_or_else(|| FileOutcome {
                result: Err(Error::Io(std::io::Error::other(format!(
                    "injection into {} did not complete",
                    path.display()
                )))),
                path,
            })
        })
        .collect();

    Ok(InjectReport {
        scheme: scheme_path,
        files,
    })
}
