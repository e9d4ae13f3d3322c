//! Source-declared and index-published versions of a package.

use crate::backend::{IndexListing, PackageIndex};
use regex::{Regex, RegexBuilder};
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Index version reported when the index has never seen the package.
pub const MISSING: &str = "MISSING";

const SDIST_SUFFIX: &str = ".tar.gz";

/// Version pinned for the package named after `pkg_dir` in its compiled
/// requirements file.
pub fn source_version(pkg_dir: &Path, requirements_file: &str) -> Option<String> {
    let name = pkg_dir.file_name()?.to_str()?;
    let path = pkg_dir.join(requirements_file);
    if !path.exists() {
        return None;
    }
    match std::fs::read_to_string(&path) {
        Ok(content) => pinned_version(&content, name),
        Err(err) => {
            warn!(package = name, "reading {}: {err}", path.display());
            None
        }
    }
}

/// Finds `<name>==<version>` at the start of a line, name matched without
/// regard to case. Trailing continuation backslashes and whitespace are not
/// part of the version.
pub fn pinned_version(content: &str, name: &str) -> Option<String> {
    let pattern = format!(r"^{}==([^\\\s]+)", regex::escape(name));
    let re = RegexBuilder::new(&pattern)
        .multi_line(true)
        .case_insensitive(true)
        .build()
        .ok()?;
    let caps = re.captures(content)?;
    let version = caps[1].trim_end_matches('\\').trim();
    (!version.is_empty()).then(|| version.to_string())
}

/// Latest published version, [`MISSING`] on 404, `None` when it could not be
/// determined.
pub fn index_version(index: &dyn PackageIndex, package: &str) -> Option<String> {
    match index.listing(package) {
        Ok(IndexListing::Found(html)) => {
            let version = latest_archive_version(&html);
            if version.is_none() {
                debug!(package, "index page lists no source archives");
            }
            version
        }
        Ok(IndexListing::NotFound) => Some(MISSING.to_string()),
        Ok(IndexListing::Unavailable(code)) => {
            warn!(package, status = code, "index returned unexpected status");
            None
        }
        Err(err) => {
            warn!(package, "index query failed: {err:#}");
            None
        }
    }
}

fn archive_link() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"<a[^>]*>([^<]*\.tar\.gz)</a>").expect("static archive link pattern")
    })
}

/// Greatest version among the listed source archives. Ordering is plain
/// string ordering, so `1.9.0` sorts above `1.10.0`.
pub fn latest_archive_version(html: &str) -> Option<String> {
    archive_link()
        .captures_iter(html)
        .filter_map(|caps| {
            let stem = caps[1].strip_suffix(SDIST_SUFFIX)?;
            let (_, version) = stem.rsplit_once('-')?;
            Some(version.to_string())
        })
        .max()
}
