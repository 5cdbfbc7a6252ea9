//! Core types for the build domain

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::info;

use crate::core::error::Error;
use crate::core::scheme::{FactTable, Scheme, expand};
use crate::core::templates::{TemplateDefinition, TemplateGroup};
use crate::core::utils::slugify;

/// Upper bound on concurrently running render jobs
pub const MAX_WORKERS: usize = 40;

/// What the caller asks `build` to do
#[derive(Debug, Clone, Default)]
pub struct BuildRequest {
    /// Group names under `<root>/templates`; empty means every discovered group
    pub template_groups: Vec<String>,
    /// Shell-style scheme selectors; empty means every scheme
    pub scheme_selectors: Vec<String>,
    /// Output root; `None` means `<root>/output`
    pub output_dir: Option<PathBuf>,
    /// Log every written file at info level
    pub verbose: bool,
}

/// Resolved settings shared by every job of one build
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub base_output_dir: PathBuf,
    pub template_groups: Vec<Arc<TemplateGroup>>,
    pub verbose: bool,
}

impl BuildOptions {
    /// Total number of template definitions across all groups
    pub fn template_count(&self) -> usize {
        self.template_groups.iter().map(|g| g.len()).sum()
    }
}

/// A scheme file whose fact table is computed at most once, on first use
#[derive(Debug)]
pub struct PaletteSlot {
    path: PathBuf,
    slug: String,
    facts: OnceCell<Result<Arc<FactTable>, JobFailure>>,
}

impl PaletteSlot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            slug: slugify(&path),
            path,
            facts: OnceCell::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    /// Load and expand the scheme; every later call reuses the first result.
    pub async fn facts(&self) -> Result<Arc<FactTable>, JobFailure> {
        self.facts
            .get_or_init(|| async {
                let scheme = Scheme::load(&self.path).await?;
                info!(scheme = %scheme.name, slug = %self.slug, "Building colorschemes for scheme");
                Ok(Arc::new(expand(&scheme)?))
            })
            .await
            .clone()
    }
}

/// One scheme rendered through one template into one file
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub palette: Arc<PaletteSlot>,
    pub group: Arc<TemplateGroup>,
    pub template: Arc<TemplateDefinition>,
    pub destination: PathBuf,
}

impl RenderJob {
    pub fn new(
        base_output_dir: &Path,
        palette: Arc<PaletteSlot>,
        group: Arc<TemplateGroup>,
        template: Arc<TemplateDefinition>,
    ) -> Self {
        let destination = base_output_dir
            .join(group.name())
            .join(&template.output)
            .join(template.output_file_name(palette.slug()));
        Self {
            palette,
            group,
            template,
            destination,
        }
    }

    pub fn record(&self, outcome: JobOutcome) -> JobRecord {
        JobRecord {
            scheme: self.palette.path().to_path_buf(),
            group: self.group.name().to_string(),
            template: self.template.name.clone(),
            destination: self.destination.clone(),
            outcome,
        }
    }
}

/// Why a render job produced no file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The scheme file is unreadable as YAML or lacks a valid key
    MalformedPalette,
    /// The template referenced a missing sub-template or failed to render
    Render,
    /// Reading the scheme or writing the output failed
    Io,
    /// Another job already claimed the destination path
    DuplicateDestination,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::MalformedPalette => "malformed scheme",
            FailureKind::Render => "render error",
            FailureKind::Io => "i/o error",
            FailureKind::DuplicateDestination => "duplicate destination",
        };
        f.write_str(name)
    }
}

/// A failed job's category together with its message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFailure {
    pub kind: FailureKind,
    pub reason: String,
}

impl JobFailure {
    pub fn new(kind: FailureKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }
}

impl From<Error> for JobFailure {
    fn from(error: Error) -> Self {
        let kind = match &error {
            Error::MalformedPalette { .. } | Error::Yaml(_) => FailureKind::MalformedPalette,
            Error::Render { .. } | Error::SubTemplateNotFound { .. } => FailureKind::Render,
            Error::DuplicateDestination(_) => FailureKind::DuplicateDestination,
            _ => FailureKind::Io,
        };
        Self::new(kind, error.to_string())
    }
}

impl fmt::Display for JobFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

/// Result of a single render job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Success,
    /// Written, but an existing file was overwritten
    SuccessWithWarning(String),
    Failed(JobFailure),
}

impl fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobOutcome::Success => write!(f, "ok"),
            JobOutcome::SuccessWithWarning(msg) => write!(f, "warning: {msg}"),
            JobOutcome::Failed(failure) => write!(f, "failed: {failure}"),
        }
    }
}

/// Outcome of a job together with what it was rendering
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub scheme: PathBuf,
    pub group: String,
    pub template: String,
    pub destination: PathBuf,
    pub outcome: JobOutcome,
}

/// Aggregate result of a build
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    /// Number of scheme files that took part
    pub schemes: usize,
    /// Number of template definitions across all groups
    pub templates: usize,
    pub records: Vec<JobRecord>,
}

impl BuildReport {
    /// Number of jobs that ran, `schemes * templates`
    pub fn jobs(&self) -> usize {
        self.records.len()
    }

    pub fn successes(&self) -> usize {
        self.count(|o| matches!(o, JobOutcome::Success))
    }

    pub fn warnings(&self) -> usize {
        self.count(|o| matches!(o, JobOutcome::SuccessWithWarning(_)))
    }

    pub fn failures(&self) -> usize {
        self.count(|o| matches!(o, JobOutcome::Failed(_)))
    }

    /// Failed jobs of one kind
    pub fn failures_of(&self, kind: FailureKind) -> usize {
        self.count(|o| matches!(o, JobOutcome::Failed(failure) if failure.kind == kind))
    }

    /// Files actually written, with or without a warning
    pub fn written(&self) -> usize {
        self.jobs() - self.failures()
    }

    /// True when every job succeeded without a warning
    pub fn is_clean(&self) -> bool {
        self.records
            .iter()
            .all(|r| r.outcome == JobOutcome::Success)
    }

    fn count(&self, pred: impl Fn(&JobOutcome) -> bool) -> usize {
        self.records.iter().filter(|r| pred(&r.outcome)).count()
    }
}
