//! Build orchestration - computes the job matrix and runs it on a bounded pool

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::core::config::Workspace;
use crate::core::error::{Error, Result};
use crate::core::templates::{TemplateGroup, find_scheme_files, resolve_template_groups};
use crate::generation::{
    BuildOptions, BuildReport, BuildRequest, FailureKind, JobFailure, JobOutcome, JobRecord,
    MAX_WORKERS, PaletteSlot, RenderJob,
};

/// Runs every (scheme x template) job of a build
pub struct BuildScheduler {
    options: BuildOptions,
    max_workers: usize,
}

impl BuildScheduler {
    pub fn new(options: BuildOptions) -> Self {
        Self {
            options,
            max_workers: MAX_WORKERS,
        }
    }

    /// Override the concurrency cap (at least one worker)
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// Compute the job matrix for `scheme_files`.
    ///
    /// Returns the runnable jobs and, separately, records for jobs that were
    /// refused because an earlier job already claimed their destination. No two
    /// returned jobs share a destination path.
    pub fn plan(&self, scheme_files: &[PathBuf]) -> (Vec<RenderJob>, Vec<JobRecord>) {
        let mut jobs = Vec::new();
        let mut refused = Vec::new();
        let mut claimed: HashMap<PathBuf, PathBuf> = HashMap::new();

        for file in scheme_files {
            let palette = Arc::new(PaletteSlot::new(file));
            for group in &self.options.template_groups {
                for template in group.templates() {
                    let job = RenderJob::new(
                        &self.options.base_output_dir,
                        Arc::clone(&palette),
                        Arc::clone(group),
                        Arc::clone(template),
                    );
                    if let Some(owner) = claimed.get(&job.destination) {
                        let mut failure =
                            JobFailure::from(Error::DuplicateDestination(job.destination.clone()));
                        failure.reason = format!(
                            "{} (already produced from {})",
                            failure.reason,
                            owner.display()
                        );
                        warn!(scheme = %file.display(), "{}", failure);
                        refused.push(job.record(JobOutcome::Failed(failure)));
                        continue;
                    }
                    claimed.insert(job.destination.clone(), file.clone());
                    jobs.push(job);
                }
            }
        }

        (jobs, refused)
    }

    /// Run every job for `scheme_files` and aggregate their outcomes.
    ///
    /// Job failures are recorded in the report and never abort sibling jobs.
    pub async fn run(&self, scheme_files: &[PathBuf]) -> BuildReport {
        let (jobs, mut records) = self.plan(scheme_files);
        info!(
            schemes = scheme_files.len(),
            templates = self.options.template_count(),
            jobs = jobs.len() + records.len(),
            workers = self.max_workers,
            "Starting build"
        );

        let verbose = self.options.verbose;
        let finished = run_bounded(jobs, self.max_workers, move |job: RenderJob| async move {
            let outcome = run_job(&job, verbose).await;
            job.record(outcome)
        })
        .await;

        for joined in finished {
            match joined {
                Ok(record) => records.push(record),
                Err(reason) => {
                    error!("Render job did not complete: {}", reason);
                    records.push(JobRecord {
                        scheme: PathBuf::new(),
                        group: String::new(),
                        template: String::new(),
                        destination: PathBuf::new(),
                        outcome: JobOutcome::Failed(JobFailure::new(FailureKind::Io, reason)),
                    });
                }
            }
        }

        let report = BuildReport {
            schemes: scheme_files.len(),
            templates: self.options.template_count(),
            records,
        };
        info!(
            written = report.written(),
            warnings = report.warnings(),
            failures = report.failures(),
            "Finished building process"
        );
        report
    }
}

/// Spawn `work` for every item with at most `max_workers` running at once.
///
/// Results come back in completion order. An item whose task panicked or
/// could not get a permit yields `Err` with the cause.
async fn run_bounded<I, T, F, Fut>(
    items: Vec<I>,
    max_workers: usize,
    work: F,
) -> Vec<std::result::Result<T, String>>
where
    I: Send + 'static,
    T: Send + 'static,
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = T> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(max_workers.max(1)));
    let work = Arc::new(work);
    let mut join_set = JoinSet::new();

    for item in items {
        let semaphore = Arc::clone(&semaphore);
        let work = Arc::clone(&work);
        join_set.spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|e| format!("worker pool closed: {e}"))?;
            Ok::<T, String>(work(item).await)
        });
    }

    let mut results = Vec::with_capacity(join_set.len());
    while let Some(joined) = join_set.join_next().await {
        results.push(joined.unwrap_or_else(|e| Err(format!("job did not complete: {e}"))));
    }
    results
}

/// Execute one job: expand (cached), ensure the directory, render, write.
async fn run_job(job: &RenderJob, verbose: bool) -> JobOutcome {
    match execute(job).await {
        Ok(false) => {
            if verbose {
                info!(path = %job.destination.display(), "Wrote file");
            } else {
                debug!(path = %job.destination.display(), "Wrote file");
            }
            JobOutcome::Success
        }
        Ok(true) => {
            warn!(path = %job.destination.display(), "Overwrote existing file");
            JobOutcome::SuccessWithWarning(format!(
                "overwrote existing file {}",
                job.destination.display()
            ))
        }
        Err(failure) => {
            error!(
                scheme = %job.palette.path().display(),
                template = %format!("{}##{}", job.group.name(), job.template.name),
                kind = %failure.kind,
                "{}",
                failure
            );
            JobOutcome::Failed(failure)
        }
    }
}

/// Returns whether an existing file was overwritten
async fn execute(job: &RenderJob) -> std::result::Result<bool, JobFailure> {
    let facts = job.palette.facts().await?;

    if let Some(dir) = job.destination.parent() {
        fs::create_dir_all(dir).await.map_err(|e| {
            JobFailure::new(
                FailureKind::Io,
                format!("Failed to create directory {}: {}", dir.display(), e),
            )
        })?;
    }

    let rendered = job.group.render(&job.template, &facts)?;

    let existed = fs::try_exists(&job.destination).await.unwrap_or(false);
    fs::write(&job.destination, rendered).await.map_err(|e| {
        JobFailure::new(
            FailureKind::Io,
            format!("Failed to write file {}: {}", job.destination.display(), e),
        )
    })?;

    Ok(existed)
}

/// Create the output root if needed and verify it accepts new files
pub async fn prepare_output_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).await.map_err(|e| {
        error!(path = %path.display(), error = %e, "Failed to create output directory");
        Error::OutputPermission(path.to_path_buf())
    })?;

    let dir = path.to_path_buf();
    let writable = tokio::task::spawn_blocking(move || {
        tempfile::Builder::new()
            .prefix(".base16-write-check")
            .tempfile_in(&dir)
            .is_ok()
    })
    .await
    .unwrap_or(false);

    if !writable {
        error!(path = %path.display(), "Output directory is not writable");
        return Err(Error::OutputPermission(path.to_path_buf()));
    }
    Ok(())
}

/// Build every selected scheme with every selected template group.
///
/// # Errors
///
/// Fails before any job runs with [`Error::NoResources`] when no group or no
/// scheme was resolved, [`Error::OutputPermission`] when the output root is
/// unusable, or a group loading error. Per-job failures are reported in the
/// returned [`BuildReport`] instead.
pub async fn build(workspace: &Workspace, request: BuildRequest) -> Result<BuildReport> {
    let group_dirs = resolve_template_groups(workspace, &request.template_groups).await?;
    let scheme_files = find_scheme_files(workspace, &request.scheme_selectors).await?;

    if group_dirs.is_empty() || scheme_files.is_empty() {
        error!(
            groups = group_dirs.len(),
            schemes = scheme_files.len(),
            root = %workspace.root().display(),
            "Nothing to build"
        );
        return Err(Error::NoResources);
    }

    let base_output_dir = request
        .output_dir
        .clone()
        .unwrap_or_else(|| workspace.default_output_dir());
    prepare_output_dir(&base_output_dir).await?;

    let mut template_groups = Vec::with_capacity(group_dirs.len());
    for dir in &group_dirs {
        template_groups.push(Arc::new(TemplateGroup::load(dir).await?));
    }

    let scheduler = BuildScheduler::new(BuildOptions {
        base_output_dir,
        template_groups,
        verbose: request.verbose,
    });
    Ok(scheduler.run(&scheme_files).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tracing_test::traced_test;

    async fn write_group(root: &Path, name: &str, config: &str, bodies: &[(&str, &str)]) {
        let dir = root.join("templates").join(name).join("templates");
        fs::create_dir_all(&dir).await.unwrap();
        fs::write(dir.join("config.yaml"), config).await.unwrap();
        for (template, body) in bodies {
            fs::write(dir.join(format!("{template}.mustache")), body)
                .await
                .unwrap();
        }
    }

    fn scheme_yaml(name: &str) -> String {
        let mut yaml = format!("scheme: \"{name}\"\nauthor: \"Someone\"\n");
        for i in 0..16 {
            yaml.push_str(&format!("base{i:02X}: \"{:02x}{:02x}{:02x}\"\n", i, i * 2, i * 3));
        }
        yaml
    }

    async fn workspace_with_schemes(schemes: &[(&str, String)]) -> (TempDir, Workspace) {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write_group(
            root,
            "vim",
            "default:\n  extension: .vim\n  output: colors\n",
            &[("default", "{{scheme-name}} {{base00-hex}}")],
        )
        .await;
        write_group(
            root,
            "shell",
            "default:\n  extension: .sh\n  output: scripts\nprofile:\n  output: profile\n",
            &[
                ("default", "color00={{base00-hex-r}}/{{base00-hex-g}}"),
                ("profile", "{{scheme-slug}}"),
            ],
        )
        .await;

        let dir = root.join("schemes/test");
        fs::create_dir_all(&dir).await.unwrap();
        for (file, content) in schemes {
            fs::write(dir.join(file), content).await.unwrap();
        }
        let workspace = Workspace::new(root).unwrap();
        (temp_dir, workspace)
    }

    #[tokio::test]
    async fn test_build_job_matrix() {
        let (_guard, workspace) = workspace_with_schemes(&[
            ("alpha.yaml", scheme_yaml("Alpha")),
            ("Beta Max.yaml", scheme_yaml("Beta")),
        ])
        .await;

        let report = build(&workspace, BuildRequest::default()).await.unwrap();
        assert_eq!(report.schemes, 2);
        assert_eq!(report.templates, 3);
        assert_eq!(report.jobs(), 6);
        assert!(report.is_clean());

        let output = workspace.default_output_dir();
        let vim = fs::read_to_string(output.join("vim/colors/base16-alpha.vim"))
            .await
            .unwrap();
        assert_eq!(vim, "Alpha 000000");
        let profile = fs::read_to_string(output.join("shell/profile/base16-beta-max"))
            .await
            .unwrap();
        assert_eq!(profile, "beta-max");
        assert!(output.join("shell/scripts/base16-beta-max.sh").exists());
    }

    #[tokio::test]
    async fn test_malformed_scheme_fails_only_its_jobs() {
        let broken = scheme_yaml("Broken").replace("base07: \"070e15\"\n", "");
        let (_guard, workspace) = workspace_with_schemes(&[
            ("alpha.yaml", scheme_yaml("Alpha")),
            ("broken.yaml", broken),
            ("gamma.yaml", scheme_yaml("Gamma")),
        ])
        .await;

        let report = build(&workspace, BuildRequest::default()).await.unwrap();
        assert_eq!(report.jobs(), 9);
        assert_eq!(report.failures(), 3);
        assert_eq!(report.failures_of(FailureKind::MalformedPalette), 3);
        assert_eq!(report.successes(), 6);
        assert!(!report.is_clean());
        for record in &report.records {
            if let JobOutcome::Failed(failure) = &record.outcome {
                assert!(record.scheme.ends_with("broken.yaml"));
                assert_eq!(failure.kind, FailureKind::MalformedPalette);
                assert!(failure.reason.contains("base07"));
            }
        }
        assert!(
            !workspace
                .default_output_dir()
                .join("vim/colors/base16-broken.vim")
                .exists()
        );
    }

    #[tokio::test]
    #[traced_test]
    async fn test_second_build_warns_on_every_file() {
        let (_guard, workspace) =
            workspace_with_schemes(&[("alpha.yaml", scheme_yaml("Alpha"))]).await;

        let first = build(&workspace, BuildRequest::default()).await.unwrap();
        assert!(first.is_clean());

        let target = workspace
            .default_output_dir()
            .join("vim/colors/base16-alpha.vim");
        fs::write(&target, "stale content that is longer than the render")
            .await
            .unwrap();

        let second = build(&workspace, BuildRequest::default()).await.unwrap();
        assert_eq!(second.warnings(), second.jobs());
        assert_eq!(second.failures(), 0);
        assert_eq!(fs::read_to_string(&target).await.unwrap(), "Alpha 000000");
        assert!(logs_contain("Overwrote existing file"));
    }

    #[tokio::test]
    async fn test_no_resources() {
        let (_guard, workspace) = workspace_with_schemes(&[]).await;
        let result = build(&workspace, BuildRequest::default()).await;
        assert!(matches!(result, Err(Error::NoResources)));

        let (_guard, workspace) =
            workspace_with_schemes(&[("alpha.yaml", scheme_yaml("Alpha"))]).await;
        let request = BuildRequest {
            scheme_selectors: vec!["nomatch-*".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            build(&workspace, request).await,
            Err(Error::NoResources)
        ));
        assert!(!workspace.default_output_dir().exists());
    }

    #[tokio::test]
    async fn test_output_dir_is_a_file() {
        let (guard, workspace) =
            workspace_with_schemes(&[("alpha.yaml", scheme_yaml("Alpha"))]).await;
        let blocker = guard.path().join("blocker");
        fs::write(&blocker, "").await.unwrap();

        let request = BuildRequest {
            output_dir: Some(blocker.join("out")),
            ..Default::default()
        };
        assert!(matches!(
            build(&workspace, request).await,
            Err(Error::OutputPermission(_))
        ));
    }

    #[tokio::test]
    async fn test_restrict_to_group_and_selector() {
        let (_guard, workspace) = workspace_with_schemes(&[
            ("alpha.yaml", scheme_yaml("Alpha")),
            ("beta.yaml", scheme_yaml("Beta")),
        ])
        .await;
        let request = BuildRequest {
            template_groups: vec!["vim".to_string()],
            scheme_selectors: vec!["a*".to_string()],
            ..Default::default()
        };
        let report = build(&workspace, request).await.unwrap();
        assert_eq!(report.schemes, 1);
        assert_eq!(report.templates, 1);
        assert_eq!(report.jobs(), 1);
    }

    #[tokio::test]
    async fn test_unknown_group_is_fatal() {
        let (_guard, workspace) =
            workspace_with_schemes(&[("alpha.yaml", scheme_yaml("Alpha"))]).await;
        let request = BuildRequest {
            template_groups: vec!["emacs".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            build(&workspace, request).await,
            Err(Error::TemplateGroupNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_colliding_slugs_are_refused() {
        let (guard, workspace) =
            workspace_with_schemes(&[("alpha.yaml", scheme_yaml("Alpha"))]).await;
        let other = guard.path().join("schemes/other");
        fs::create_dir_all(&other).await.unwrap();
        fs::write(other.join("Alpha.yaml"), scheme_yaml("Other Alpha"))
            .await
            .unwrap();

        let report = build(&workspace, BuildRequest::default()).await.unwrap();
        assert_eq!(report.jobs(), 6);
        assert_eq!(report.failures(), 3);
        assert_eq!(report.failures_of(FailureKind::DuplicateDestination), 3);
        assert!(report.records.iter().any(|r| matches!(
            &r.outcome,
            JobOutcome::Failed(failure) if failure.reason.contains("same destination")
        )));
    }

    #[tokio::test]
    async fn test_single_worker_still_runs_everything() {
        let temp_dir = TempDir::new().unwrap();
        let (_guard, workspace) = workspace_with_schemes(&[
            ("alpha.yaml", scheme_yaml("Alpha")),
            ("beta.yaml", scheme_yaml("Beta")),
        ])
        .await;
        let group = TemplateGroup::load(workspace.group_dir("shell"))
            .await
            .unwrap();
        let scheduler = BuildScheduler::new(BuildOptions {
            base_output_dir: temp_dir.path().to_path_buf(),
            template_groups: vec![Arc::new(group)],
            verbose: true,
        })
        .with_max_workers(1);

        let files = find_scheme_files(&workspace, &[]).await.unwrap();
        let report = scheduler.run(&files).await;
        assert_eq!(report.jobs(), 4);
        assert!(report.is_clean());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_bounded_run_never_exceeds_cap() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::time::Duration;

        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let items: Vec<usize> = (0..20).collect();

        let results = {
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            run_bounded(items, 3, move |item| {
                let in_flight = Arc::clone(&in_flight);
                let peak = Arc::clone(&peak);
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    item
                }
            })
            .await
        };

        let mut done: Vec<usize> = results.into_iter().map(|r| r.unwrap()).collect();
        done.sort_unstable();
        assert_eq!(done, (0..20).collect::<Vec<_>>());
        let peak = peak.load(Ordering::SeqCst);
        assert!(peak <= 3, "peak of {peak} concurrent jobs");
        assert!(peak > 1, "jobs never overlapped");
        assert_eq!(in_flight.load(Ordering::SeqCst), 0);
    }
}
