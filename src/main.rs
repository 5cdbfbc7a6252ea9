//! base16-builder CLI entrypoint
//! Parses command-line arguments and dispatches to the build, inject and update use cases.
#![deny(unsafe_code)]

// Internal imports (std, crate)
use base16_builder::{
    application::{UpdateRequest, UpdateSourcesUseCase},
    core::{Error, config::Workspace},
    generation::{BuildRequest, JobOutcome, build},
    infrastructure::ProcessCommandExecutor,
    injection::inject,
};
use std::future::Future;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;

// External imports (alphabetized)
use anyhow::Context;
use clap::Parser;
use tracing::{Level, debug, error, warn};
use tracing_subscriber::EnvFilter;

/// Everything succeeded
const EXIT_OK: u8 = 0;
/// Completed, but with warnings or partial failures
const EXIT_PARTIAL: u8 = 1;
/// A precondition failed and nothing (or almost nothing) was done
const EXIT_FATAL: u8 = 2;

#[derive(Parser)]
#[command(name = "base16-builder")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Workspace root holding templates/, schemes/ and sources/
    /// (defaults to $BASE16_BUILDER_ROOT, then the current directory)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Log every written file and enable debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Download all base16 scheme and template repositories
    Update {
        /// Update repositories but keep the existing sources.yaml
        #[arg(short, long)]
        custom: bool,
    },
    /// Build base16 colorschemes from templates
    Build {
        /// Restrict the build to a template group under templates/; can be given more than once
        #[arg(short, long = "template", value_name = "TEMP")]
        templates: Vec<String>,
        /// Restrict the build to matching schemes; wildcards allowed; can be given more than once
        #[arg(short, long = "scheme", value_name = "SCHEME")]
        schemes: Vec<String>,
        /// Target directory for the build output
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Inject a colorscheme into one or more files
    Inject {
        /// Scheme to inject; wildcards allowed but must match exactly one scheme
        #[arg(short, long)]
        scheme: String,
        /// File to inject into; can be given more than once
        #[arg(short, long = "file", required = true, value_name = "FILE")]
        files: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(Mutex::new(std::io::stderr()))
        .with_target(false)
        .init();

    let code = tokio::select! {
        result = run(cli) => match result {
            Ok(code) => code,
            Err(e) => {
                let fatal = e.downcast_ref::<Error>().is_none_or(Error::is_fatal);
                error!("{:#}", e);
                if fatal { EXIT_FATAL } else { EXIT_PARTIAL }
            }
        },
        () = wait_for_interrupt(tokio::signal::ctrl_c()) => {
            warn!("Interrupted, stopping outstanding work");
            EXIT_FATAL
        }
    };
    ExitCode::from(code)
}

/// Resolves once `signal` reports an interrupt. If the handler could not be
/// installed the command keeps running and this never resolves.
async fn wait_for_interrupt<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        warn!(error = %e, "Cannot listen for Ctrl-C; interrupts will not be handled");
        std::future::pending::<()>().await;
    }
}

async fn run(cli: Cli) -> anyhow::Result<u8> {
    let workspace =
        Workspace::resolve(cli.root.as_deref()).context("Failed to resolve workspace root")?;
    debug!(root = %workspace.root().display(), "Using workspace");

    match cli.command {
        Commands::Update { custom } => run_update(&workspace, custom).await,
        Commands::Build {
            templates,
            schemes,
            output,
        } => {
            run_build(
                &workspace,
                BuildRequest {
                    template_groups: templates,
                    scheme_selectors: schemes,
                    output_dir: output,
                    verbose: cli.verbose,
                },
            )
            .await
        }
        Commands::Inject { scheme, files } => run_inject(&workspace, &scheme, &files).await,
    }
}

/// Runtime handler for the build command
async fn run_build(workspace: &Workspace, request: BuildRequest) -> anyhow::Result<u8> {
    let report = build(workspace, request).await?;

    for record in &report.records {
        if let JobOutcome::Failed(failure) = &record.outcome {
            eprintln!(
                "Failed {}##{} for {} ({}): {}",
                record.group,
                record.template,
                record.scheme.display(),
                failure.kind,
                failure
            );
        }
    }
    println!(
        "Built {} of {} files from {} schemes and {} templates ({} overwritten, {} failed).",
        report.written(),
        report.jobs(),
        report.schemes,
        report.templates,
        report.warnings(),
        report.failures()
    );

    Ok(if report.is_clean() {
        EXIT_OK
    } else {
        EXIT_PARTIAL
    })
}

/// Runtime handler for the inject command
async fn run_inject(workspace: &Workspace, scheme: &str, files: &[PathBuf]) -> anyhow::Result<u8> {
    let report = inject(workspace, scheme, files).await?;

    for file in &report.files {
        match &file.result {
            Ok(reference) => println!(
                "Injected {} into \"{}\" ({}).",
                report.scheme.display(),
                file.path.display(),
                reference
            ),
            Err(e) => eprintln!("{e}"),
        }
    }

    Ok(if report.is_clean() {
        EXIT_OK
    } else {
        EXIT_PARTIAL
    })
}

/// Runtime handler for the update command
async fn run_update(workspace: &Workspace, custom: bool) -> anyhow::Result<u8> {
    let use_case = UpdateSourcesUseCase::new(ProcessCommandExecutor::new());
    let request = UpdateRequest {
        custom_sources: custom,
        ..Default::default()
    };
    let report = use_case.execute(workspace, &request).await?;

    for outcome in report.outcomes() {
        if let Err(reason) = &outcome.result {
            eprintln!("Error cloning from {}:\n{}", outcome.job.url, reason);
        }
    }
    println!(
        "Completed updating repositories ({} cloned, {} failed).",
        report.cloned(),
        report.failures()
    );

    Ok(if report.is_clean() {
        EXIT_OK
    } else {
        EXIT_PARTIAL
    })
}
