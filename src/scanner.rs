use crate::{
    classify::{failed_record, package_name, Classifier, IssueRecord},
    error::DriftError,
    report::Report,
};
use anyhow::{Context, Result};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::time::Instant;
use tracing::{debug, error, info};

pub const DEFAULT_WORKERS: usize = 5;

/// Immediate subdirectories of `packages_dir`, sorted by path.
pub fn find_packages(packages_dir: &Path) -> Result<Vec<PathBuf>> {
    if !packages_dir.is_dir() {
        return Err(DriftError::Configuration(format!(
            "packages directory not found at {}",
            packages_dir.display()
        ))
        .into());
    }

    let mut packages = Vec::new();
    for entry in std::fs::read_dir(packages_dir)
        .with_context(|| format!("listing {}", packages_dir.display()))?
    {
        let path = entry?.path();
        if path.is_dir() {
            packages.push(path);
        }
    }
    packages.sort();
    Ok(packages)
}

pub fn scan(packages_dir: &Path, workers: usize, classifier: &Classifier<'_>) -> Result<Report> {
    let packages = find_packages(packages_dir)?;
    info!(
        packages = packages.len(),
        workers,
        "analyzing packages in {}",
        packages_dir.display()
    );

    let started = Instant::now();
    let records = classify_all(&packages, workers, |dir| classifier.classify(dir));
    debug!(elapsed_ms = started.elapsed().as_millis() as u64, "scan finished");

    Ok(Report::from_records(records))
}

/// Runs `classify` over every package on a pool of `workers` threads.
///
/// Each package keeps the index it was enumerated with; workers claim the next
/// unclaimed index and send `(index, record)` back, so the output lines up
/// with `packages` whatever order the work completes in. A panicking
/// classification becomes an `unknown` record for that package only.
pub fn classify_all<F>(packages: &[PathBuf], workers: usize, classify: F) -> Vec<IssueRecord>
where
    F: Fn(&Path) -> IssueRecord + Sync,
{
    let mut slots: Vec<Option<IssueRecord>> = (0..packages.len()).map(|_| None).collect();
    let workers = workers.max(1).min(packages.len().max(1));
    let next = AtomicUsize::new(0);
    let (tx, rx) = mpsc::channel::<(usize, IssueRecord)>();

    std::thread::scope(|s| {
        for _ in 0..workers {
            let tx = tx.clone();
            let next = &next;
            let classify = &classify;
            s.spawn(move || {
                loop {
                    let i = next.fetch_add(1, Ordering::Relaxed);
                    let Some(dir) = packages.get(i) else {
                        break;
                    };
                    let record = match catch_unwind(AssertUnwindSafe(|| classify(dir))) {
                        Ok(record) => record,
                        Err(panic) => {
                            let reason = panic_message(panic.as_ref());
                            let name = package_name(dir);
                            error!(package = %name, "classification failed: {reason}");
                            failed_record(name, &reason)
                        }
                    };
                    if tx.send((i, record)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(tx);

        for (i, record) in rx {
            debug!(package = %record.package_name, issue = %record.issue_type, "classified");
            slots[i] = Some(record);
        }
    });

    slots
        .into_iter()
        .zip(packages)
        .map(|(slot, dir)| {
            slot.unwrap_or_else(|| failed_record(package_name(dir), "worker produced no result"))
        })
        .collect()
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}
