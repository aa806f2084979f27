use std::path::Path;

use git2::{Error, Repository};
use serde::{Deserialize, Serialize};

use crate::error::DetectError;

/// Opaque commit identifier. Comparison is exact identity, never
/// prefix or history containment.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommitId(String);

impl CommitId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<git2::Oid> for CommitId {
    fn from(oid: git2::Oid) -> Self {
        Self(oid.to_string())
    }
}

impl std::fmt::Display for CommitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered repository: local checkout plus the remote branch it
/// tracks. Identity (`id`) is stable for the daemon's lifetime and keys
/// the change cache.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RepoHandle {
    pub id: String,
    pub name: String,
    pub path: String,
    pub branch: String,
    pub remote: String,
}

impl RepoHandle {
    /// Builds a handle from a local checkout. Reads the current branch
    /// and the `origin` remote URL; the branch can be overridden when the
    /// operator wants to track something other than the checked-out one.
    pub fn build(path: &Path, branch: Option<String>, id: String) -> anyhow::Result<Self> {
        let repo = Repository::open(path)?;

        let head_branch = {
            let head = repo.head()?;
            head.shorthand()
                .ok_or_else(|| Error::from_str("Failed to read branch name"))?
                .to_string()
        };

        let remote = repo
            .find_remote("origin")?
            .url()
            .ok_or_else(|| Error::from_str("Remote URL 'origin' not found"))?
            .to_string();

        let name = parse_repo_name(&remote)?;

        Ok(Self {
            id,
            name,
            path: path
                .canonicalize()
                .unwrap_or_else(|_| path.to_path_buf())
                .display()
                .to_string(),
            branch: branch.unwrap_or(head_branch),
            remote,
        })
    }
}

/// Last path segment of the remote URL, `.git` suffix stripped.
pub fn parse_repo_name(remote: &str) -> anyhow::Result<String> {
    let name = remote
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .and_then(|s| s.strip_suffix(".git").or(Some(s)))
        .filter(|s| !s.is_empty())
        .ok_or_else(|| anyhow::anyhow!("Failed to parse repo name from remote URL"))?;
    Ok(name.to_string())
}

/// Whether `path` looks like a git checkout. Callers use this before
/// handing a path to the engine; the engine itself errors on
/// non-repositories instead of skipping them silently.
pub fn is_git_repo(path: &Path) -> bool {
    path.join(".git").exists()
}

/// Resolves the tip commit of the current local branch. Local-only, no
/// network.
pub fn local_tip(handle: &RepoHandle) -> Result<CommitId, DetectError> {
    let repo = Repository::open(&handle.path).map_err(|e| DetectError::vcs(&handle.name, e))?;
    let commit = repo
        .head()
        .and_then(|h| h.peel_to_commit())
        .map_err(|e| DetectError::vcs(&handle.name, e))?;
    Ok(commit.id().into())
}
