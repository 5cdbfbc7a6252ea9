//! Update use case: fetch scheme and template repositories with git

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::fs;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::core::config::Workspace;
use crate::core::error::{Error, Result};
use crate::infrastructure::CommandExecutor;

/// Contents of the default `sources.yaml`
pub const DEFAULT_SOURCES: &str = "schemes: https://github.com/chriskempson/base16-schemes-source.git\n\
templates: https://github.com/chriskempson/base16-templates-source.git";

/// Upper bound for a single `git clone`
pub const DEFAULT_CLONE_TIMEOUT: Duration = Duration::from_secs(120);

/// Name of the repository list inside each source checkout
const LIST_FILE: &str = "list.yaml";

#[derive(Debug, Clone)]
pub struct UpdateRequest {
    /// Keep an existing `sources.yaml` instead of writing the default one
    pub custom_sources: bool,
    pub clone_timeout: Duration,
}

impl Default for UpdateRequest {
    fn default() -> Self {
        Self {
            custom_sources: false,
            clone_timeout: DEFAULT_CLONE_TIMEOUT,
        }
    }
}

/// A repository to clone and where to put it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloneJob {
    pub url: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct CloneOutcome {
    pub job: CloneJob,
    /// `Err` carries git's stderr or the reason the clone did not start
    pub result: std::result::Result<(), String>,
}

/// Results of every clone, grouped by phase
#[derive(Debug, Default)]
pub struct UpdateReport {
    pub sources: Vec<CloneOutcome>,
    pub templates: Vec<CloneOutcome>,
    pub schemes: Vec<CloneOutcome>,
}

impl UpdateReport {
    pub fn outcomes(&self) -> impl Iterator<Item = &CloneOutcome> {
        self.sources
            .iter()
            .chain(&self.templates)
            .chain(&self.schemes)
    }

    pub fn cloned(&self) -> usize {
        self.outcomes().filter(|o| o.result.is_ok()).count()
    }

    pub fn failures(&self) -> usize {
        self.outcomes().filter(|o| o.result.is_err()).count()
    }

    pub fn is_clean(&self) -> bool {
        self.failures() == 0
    }
}

/// Write the default `sources.yaml` to the workspace root
pub async fn write_sources_file(workspace: &Workspace) -> Result<()> {
    let path = workspace.sources_file();
    fs::write(&path, DEFAULT_SOURCES).await?;
    debug!(path = %path.display(), "Wrote sources file");
    Ok(())
}

/// Read a `name: url` mapping and turn it into clone jobs under `base_dir`.
///
/// A missing or empty list yields no jobs.
pub async fn read_clone_jobs(list: &Path, base_dir: &Path) -> Result<Vec<CloneJob>> {
    let content = match fs::read_to_string(list).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %list.display(), "Source list not found");
            return Ok(Vec::new());
        }
        Err(e) => return Err(Error::Io(e)),
    };
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    let entries: Option<BTreeMap<String, String>> = serde_yaml::from_str(&content)
        .map_err(|e| Error::sources(format!("{}: {}", list.display(), e)))?;

    Ok(entries
        .unwrap_or_default()
        .into_iter()
        .map(|(name, url)| CloneJob {
            url,
            path: base_dir.join(name),
        })
        .collect())
}

/// Clone one repository, replacing any previous checkout at the target path.
pub async fn git_clone<E: CommandExecutor + ?Sized>(
    executor: &E,
    job: &CloneJob,
    timeout: Duration,
) -> std::result::Result<(), String> {
    debug!(url = %job.url, path = %job.path.display(), "Cloning");
    if fs::try_exists(job.path.join(".git")).await.unwrap_or(false) {
        fs::remove_dir_all(&job.path)
            .await
            .map_err(|e| format!("cannot remove {}: {}", job.path.display(), e))?;
    }
    fs::create_dir_all(&job.path)
        .await
        .map_err(|e| format!("cannot create {}: {}", job.path.display(), e))?;

    let args = vec![
        "clone".to_string(),
        job.url.clone(),
        job.path.to_string_lossy().to_string(),
    ];
    let outcome = match executor.execute("git", &args, timeout).await {
        Ok(result) if result.is_success() => Ok(()),
        Ok(result) => Err(result.stderr.trim().to_string()),
        Err(e) => Err(e.to_string()),
    };

    if outcome.is_err() {
        // only an empty directory is removed; a partial checkout is left for inspection
        let _ = fs::remove_dir(&job.path).await;
    }
    outcome
}

/// Use case for updating all scheme and template repositories
pub struct UpdateSourcesUseCase<E: CommandExecutor + 'static> {
    executor: Arc<E>,
}

impl<E: CommandExecutor + 'static> UpdateSourcesUseCase<E> {
    pub fn new(executor: E) -> Self {
        Self {
            executor: Arc::new(executor),
        }
    }

    /// Clone every job concurrently and return the outcomes in job order
    pub async fn clone_all(&self, jobs: Vec<CloneJob>, timeout: Duration) -> Vec<CloneOutcome> {
        let mut join_set = JoinSet::new();
        for (index, job) in jobs.iter().cloned().enumerate() {
            let executor = Arc::clone(&self.executor);
            join_set.spawn(async move {
                let result = git_clone(executor.as_ref(), &job, timeout).await;
                (index, CloneOutcome { job, result })
            });
        }

        let mut outcomes: Vec<Option<CloneOutcome>> = jobs.iter().map(|_| None).collect();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, outcome)) => {
                    match &outcome.result {
                        Ok(()) => info!(url = %outcome.job.url, "Cloned"),
                        Err(e) => warn!(url = %outcome.job.url, "{}", e),
                    }
                    outcomes[index] = Some(outcome);
                }
                Err(e) => error!(error = %e, "Clone task did not complete"),
            }
        }

        outcomes
            .into_iter()
            .zip(jobs)
            .map(|(outcome, job)| {
                outcome.unwrap_or_else(|| CloneOutcome {
                    job,
                    result: Err("clone task did not complete".to_string()),
                })
            })
            .collect()
    }

    /// Write the sources file (unless custom), then clone the source lists,
    /// then every template and scheme repository they name.
    ///
    /// # Errors
    ///
    /// [`Error::GitNotFound`] when git is not installed, I/O errors writing
    /// the sources file, and [`Error::Sources`] for an unreadable list.
    pub async fn execute(
        &self,
        workspace: &Workspace,
        request: &UpdateRequest,
    ) -> Result<UpdateReport> {
        if !self.executor.program_available("git") {
            return Err(Error::GitNotFound);
        }

        if request.custom_sources {
            info!("Keeping existing sources.yaml");
        } else {
            info!("Creating sources.yaml");
            write_sources_file(workspace).await?;
        }

        let mut report = UpdateReport::default();

        info!("Cloning sources");
        let jobs = read_clone_jobs(&workspace.sources_file(), &workspace.sources_dir()).await?;
        report.sources = self.clone_all(jobs, request.clone_timeout).await;

        info!("Cloning templates");
        let list = workspace.sources_dir().join("templates").join(LIST_FILE);
        let jobs = read_clone_jobs(&list, &workspace.templates_dir()).await?;
        report.templates = self.clone_all(jobs, request.clone_timeout).await;

        info!("Cloning schemes");
        let list = workspace.sources_dir().join("schemes").join(LIST_FILE);
        let jobs = read_clone_jobs(&list, &workspace.schemes_dir()).await?;
        report.schemes = self.clone_all(jobs, request.clone_timeout).await;

        info!(
            cloned = report.cloned(),
            failed = report.failures(),
            "Completed updating repositories"
        );
        Ok(report)
    }
}
