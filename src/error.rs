use thiserror::Error;

/// Failure kinds of the detection core. None of these are fatal to the
/// daemon: callers above the engine log them and fall back to "no change
/// detected for this repository this cycle".
#[derive(Debug, Error)]
pub enum DetectError {
    #[error("vcs failure for `{repo}`: {source}")]
    VcsFailure {
        repo: String,
        #[source]
        source: git2::Error,
    },

    #[error("corrupt cache entry for `{repo}`, treating as absent")]
    CacheCorruption { repo: String },

    #[error("notification delivery failed: {0}")]
    NotificationFailure(String),
}

impl DetectError {
    pub fn vcs(repo: &str, source: git2::Error) -> Self {
        Self::VcsFailure {
            repo: repo.to_string(),
            source,
        }
    }
}
