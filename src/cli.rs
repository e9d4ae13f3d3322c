use crate::{
    backend::{gh::GhChecks, git::Git, index::SimpleIndex, oc::Oc, Backends},
    batch::{BatchCoordinator, BatchResult, BatchStatus, DryRun, ProgressSink, Remediator, Workflows},
    classify::{Classifier, IssueType},
    config::Config,
    poll::SystemClock,
    rebuild::RebuildWorkflow,
    release::ReleaseWorkflow,
    report::Report,
    scanner,
};
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser, Debug)]
#[command(name = "drift-check", version)]
#[command(about = "Audit and remediate drift between the package catalog, the build system and the package index")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. If omitted, uses ./drift-check.toml if present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Report tool availability and the effective configuration.
    Doctor {
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },
    /// Classify every package and emit a JSON report.
    Scan {
        /// Repository root containing the packages directory.
        #[arg(default_value = ".")]
        path: PathBuf,
        /// Write the report here instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Parallel package classifications.
        #[arg(short, long)]
        workers: Option<usize>,
    },
    /// Rebuild or release the packages listed in a scan report.
    Remediate {
        /// Report written by `scan`.
        issues_file: PathBuf,
        /// Maximum packages per batch.
        #[arg(short, long)]
        batch_size: Option<usize>,
        /// Repository root the rebuild commits are made in.
        #[arg(long, default_value = ".")]
        root: PathBuf,
        /// Print the planned batches without changing anything.
        #[arg(long)]
        dry_run: bool,
    },
}

pub fn dispatch(args: Args) -> Result<()> {
    let loaded = match resolve_config_path(args.config.as_deref()) {
        Some(path) => Config::load(&path),
        None => Ok(Config::default()),
    };
    let (cfg, load_err) = match loaded {
        Ok(cfg) => (cfg, None),
        Err(err) => (Config::default(), Some(err)),
    };

    let _guard = init_logging(&args, &cfg)?;
    if let Some(err) = load_err {
        return Err(err);
    }
    if cfg.debug.dump_effective_config {
        debug!("effective config:\n{}", cfg.to_toml());
    }

    match &args.cmd {
        Command::Doctor { root } => doctor(&cfg, root),
        Command::Scan {
            path,
            output,
            workers,
        } => scan(&cfg, path, output.as_deref(), workers.unwrap_or(cfg.global.workers)),
        Command::Remediate {
            issues_file,
            batch_size,
            root,
            dry_run,
        } => remediate(
            &cfg,
            issues_file,
            root,
            batch_size.unwrap_or(cfg.global.batch_size),
            *dry_run,
        ),
    }
}

fn resolve_config_path(user: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = user {
        return Some(p.to_path_buf());
    }
    let default = PathBuf::from("drift-check.toml");
    default.exists().then_some(default)
}

fn init_logging(args: &Args, cfg: &Config) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout carries reports; logs go to stderr.
    let console_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    };

    let (file_layer, guard) = if cfg.logging.write_to_file && !cfg.logging.file_path.is_empty() {
        let path = Path::new(&cfg.logging.file_path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create_dir_all {}", parent.display()))?;
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("open log file: {}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

fn doctor(cfg: &Config, root: &Path) -> Result<()> {
    let report = |r: Result<String>| match r {
        Ok(v) => serde_json::json!({ "ok": true, "version": v }),
        Err(e) => serde_json::json!({ "ok": false, "error": format!("{e:#}") }),
    };
    let packages_dir = root.join(&cfg.paths.packages_dir);
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "git": report(Git::new(cfg, root).version()),
            "oc": report(Oc::new(cfg).version()),
            "gh": report(GhChecks::new(cfg).version()),
            "index_url": cfg.index.url,
            "ci_repository": cfg.ci.repository,
            "packages_dir": packages_dir,
            "packages_dir_exists": packages_dir.is_dir(),
        }))?
    );
    Ok(())
}

fn scan(cfg: &Config, root: &Path, output: Option<&Path>, workers: usize) -> Result<()> {
    let packages_dir = root.join(&cfg.paths.packages_dir);

    let git = Git::new(cfg, root);
    let index = SimpleIndex::new(cfg);
    let oc = Oc::new(cfg);
    let checks = GhChecks::new(cfg);
    let backends = Backends {
        scm: &git,
        index: &index,
        build: &oc,
        checks: &checks,
    };
    let classifier = Classifier::new(backends, &cfg.paths.requirements_file);

    let report = scanner::scan(&packages_dir, workers, &classifier)?;

    match output {
        Some(path) => {
            report.write(path)?;
            info!("results written to {}", path.display());
        }
        None => println!("{}", report.to_json()?),
    }

    if cfg.global.print_summary {
        print_scan_summary(&report);
    }
    Ok(())
}

/// Summary goes to stderr so a report on stdout stays parseable.
fn print_scan_summary(report: &Report) {
    if report.issues.is_empty() {
        eprintln!("No issues found! All packages are up to date.");
        return;
    }
    eprintln!("Found {} packages with issues", report.summary.packages_with_issues);
    for (issue_type, count) in &report.summary.issues_by_type {
        if issue_type != IssueType::NoIssue.as_str() {
            eprintln!("  {issue_type}: {count}");
        }
    }
}

fn remediate(cfg: &Config, issues_file: &Path, root: &Path, batch_size: usize, dry_run: bool) -> Result<()> {
    let report = Report::load(issues_file)?;
    if report.issues.is_empty() {
        println!("No issues found in the report. Nothing to fix!");
        return Ok(());
    }
    println!("Found {} issues to process (batch size {batch_size})", report.issues.len());

    let packages_dir = root.join(&cfg.paths.packages_dir);
    let git = Git::new(cfg, root);
    let oc = Oc::new(cfg);
    let checks = GhChecks::new(cfg);
    let clock = SystemClock;
    let workflows = Workflows {
        rebuild: RebuildWorkflow::new(cfg, &packages_dir, &git, &checks, &clock),
        release: ReleaseWorkflow::new(cfg, &oc, &clock),
    };
    let remediator: &dyn Remediator = if dry_run { &DryRun } else { &workflows };

    let sink = ConsoleSink;
    let summary = BatchCoordinator::new(remediator, &sink, batch_size).run(&report.issues);

    let failed: Vec<&BatchResult> = summary.failed().collect();
    if failed.is_empty() {
        println!("Finished processing all {} issues", report.issues.len());
        return Ok(());
    }
    for b in &failed {
        if let BatchStatus::Failed(reason) = &b.status {
            println!(
                "FAILED {} batch {} [{}]: {reason}",
                b.issue_type,
                b.number,
                b.packages.join(", ")
            );
        }
    }
    Err(anyhow!(
        "{} of {} batches failed",
        failed.len(),
        summary.batches.len()
    ))
}

/// Plain-text progress on stdout.
struct ConsoleSink;

impl ProgressSink for ConsoleSink {
    fn group_started(&self, issue_type: &IssueType, count: usize) {
        println!("\nProcessing {count} {issue_type} issues:");
    }

    fn batch_started(&self, _issue_type: &IssueType, number: usize, packages: &[String]) {
        println!("Processing batch {number} ({} packages)", packages.len());
    }

    fn batch_finished(&self, result: &BatchResult) {
        match &result.status {
            BatchStatus::Succeeded => println!("Batch {} succeeded", result.number),
            BatchStatus::Failed(reason) => println!("Batch {} failed: {reason}", result.number),
        }
    }

    fn unhandled(&self, issue_type: &IssueType, packages: &[String]) {
        println!(
            "Warning: no automatic remediation for '{issue_type}'; investigate: {}",
            packages.join(", ")
        );
    }
}
