use thiserror::Error;

/// Failures that callers need to tell apart. Everything else travels as a
/// plain `anyhow::Error` with context attached.
#[derive(Debug, Error)]
pub enum DriftError {
    /// Missing directory or file, malformed input. Fatal to the invocation.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A read-only lookup against an external system failed.
    #[error("{system} query failed: {message}")]
    Query {
        system: &'static str,
        message: String,
    },

    /// A commit, push or release creation failed. Aborts the enclosing batch.
    #[error("{phase} failed: {message}")]
    Mutation {
        phase: &'static str,
        message: String,
    },

    #[error("no build artifact for package {package} at commit {commit}")]
    ArtifactNotFound { package: String, commit: String },

    #[error("package {0} has no recorded built commit")]
    MissingBuiltCommit(String),
}

impl DriftError {
    pub fn mutation(phase: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Mutation {
            phase,
            message: format!("{err:#}"),
        }
    }
}
