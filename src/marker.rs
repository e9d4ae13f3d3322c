//! Rebuild-trigger markers in a package's build-argument file.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use time::{macros::format_description, OffsetDateTime};
use tracing::warn;

pub const MARKER_PREFIX: &str = "# Add comment to force rebuild";

pub fn marker_line(now: OffsetDateTime) -> String {
    let fmt = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]+00:00");
    let stamp = now
        .to_offset(time::UtcOffset::UTC)
        .format(&fmt)
        .unwrap_or_else(|_| "1970-01-01 00:00:00+00:00".to_string());
    format!("{MARKER_PREFIX}, {stamp}")
}

/// Drops every earlier marker line and appends a fresh one.
pub fn remark(content: &str, now: OffsetDateTime) -> String {
    let mut out = String::with_capacity(content.len() + 64);
    for line in content.lines() {
        if line.trim_start().starts_with(MARKER_PREFIX) {
            continue;
        }
        out.push_str(line);
        out.push('\n');
    }
    out.push_str(&marker_line(now));
    out.push('\n');
    out
}

/// An argfile rewritten with a fresh marker, with the content it had before.
#[derive(Debug, Clone)]
pub struct Marked {
    pub path: PathBuf,
    original: String,
}

/// Marks every argfile or none. All files are read before the first write; a
/// write failure puts back the files already rewritten.
pub fn mark_all(argfiles: &[PathBuf], now: OffsetDateTime) -> Result<Vec<Marked>> {
    let mut pending = Vec::with_capacity(argfiles.len());
    for path in argfiles {
        let original = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        pending.push(Marked {
            path: path.clone(),
            original,
        });
    }

    for (i, m) in pending.iter().enumerate() {
        if let Err(err) = std::fs::write(&m.path, remark(&m.original, now)) {
            if let Err(undo) = restore(&pending[..i]) {
                warn!("restoring markers after failed write: {undo:#}");
            }
            return Err(err).with_context(|| format!("writing {}", m.path.display()));
        }
    }
    Ok(pending)
}

/// Writes the pre-marking content back.
pub fn restore(marked: &[Marked]) -> Result<()> {
    for m in marked {
        std::fs::write(&m.path, &m.original)
            .with_context(|| format!("restoring {}", m.path.display()))?;
    }
    Ok(())
}

/// Rewrites `argfile` in place with a single, current marker.
pub fn mark_for_rebuild(argfile: &Path, now: OffsetDateTime) -> Result<()> {
    mark_all(&[argfile.to_path_buf()], now).map(|_| ())
}
