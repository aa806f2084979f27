use std::path::PathBuf;

use dirs::home_dir;
use git2::{Cred, Error, RemoteCallbacks};

use crate::{
    error::DetectError,
    git::repo::{local_tip, CommitId, RepoHandle},
};

fn find_ssh_key() -> Result<PathBuf, Error> {
    let keys_name = vec![String::from("id_ed25519"), String::from("id_rsa")];
    for k in keys_name {
        let ssh_key_path = home_dir()
            .map(|h| h.join(".ssh/").join(k))
            .ok_or_else(|| Error::from_str("Failed to find HOME directory"))?;
        if ssh_key_path.exists() {
            return Ok(ssh_key_path);
        }
    }
    Err(Error::from_str("Failed to find ssh_key on your machine :/"))
}

fn auth_callbacks<'a>() -> RemoteCallbacks<'a> {
    let mut callbacks = RemoteCallbacks::new();

    callbacks.credentials(|_url, username_from_url, allowed_types| {
        let username = username_from_url.unwrap_or("git");

        if allowed_types.contains(git2::CredentialType::SSH_KEY) {
            if let Ok(ssh_key_path) = find_ssh_key() {
                if let Ok(cred) = Cred::ssh_key(username, None, &ssh_key_path, None) {
                    return Ok(cred);
                }
            }
        }

        // Try default credentials
        if allowed_types.contains(git2::CredentialType::DEFAULT) {
            if let Ok(cred) = Cred::default() {
                return Ok(cred);
            }
        }

        // Try ssh-agent
        if allowed_types.contains(git2::CredentialType::SSH_KEY) {
            if let Ok(cred) = Cred::ssh_key_from_agent(username) {
                return Ok(cred);
            }
        }

        Err(Error::from_str("No authentication methods available"))
    });

    callbacks
}

/// Asks the remote for the tip of `branch` by listing its advertised
/// refs. Touches the network but updates nothing locally: no
/// remote-tracking refs, no working tree.
pub fn remote_tip(handle: &RepoHandle) -> Result<CommitId, DetectError> {
    remote_branch_hash(&handle.remote, &handle.branch)
        .map_err(|e| DetectError::vcs(&handle.name, e))
}

fn remote_branch_hash(url: &str, branch: &str) -> Result<CommitId, Error> {
    let mut remote = git2::Remote::create_detached(url)?;
    remote.connect_auth(git2::Direction::Fetch, Some(auth_callbacks()), None)?;

    let refs = remote.list()?;
    let ref_to_find = format!("refs/heads/{branch}");

    for r in refs {
        if r.name() == ref_to_find {
            return Ok(r.oid().into());
        }
    }

    Err(Error::from_str(&format!("Branch {branch} not found")))
}

/// Result of one remote comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteComparison {
    pub has_changes: bool,
    pub remote_commit_id: CommitId,
}

/// The network side of detection: resolve both tips and compare.
/// Carries no caching logic; the engine owns that.
pub trait RemoteProbe: Send + Sync {
    /// Resolves the remote branch tip over the network, the local tip
    /// from disk, and reports whether they differ. Exact identity
    /// comparison: a local commit not yet pushed also counts as changed.
    fn fetch_and_compare(&self, handle: &RepoHandle) -> Result<RemoteComparison, DetectError>;

    /// Local-only tip resolution, for the cache-hit path.
    fn resolve_local_tip(&self, handle: &RepoHandle) -> Result<CommitId, DetectError>;
}

impl<T: RemoteProbe + ?Sized> RemoteProbe for std::sync::Arc<T> {
    fn fetch_and_compare(&self, handle: &RepoHandle) -> Result<RemoteComparison, DetectError> {
        (**self).fetch_and_compare(handle)
    }

    fn resolve_local_tip(&self, handle: &RepoHandle) -> Result<CommitId, DetectError> {
        (**self).resolve_local_tip(handle)
    }
}

/// Probe backed by libgit2 against real repositories.
pub struct GitProbe;

impl RemoteProbe for GitProbe {
    fn fetch_and_compare(&self, handle: &RepoHandle) -> Result<RemoteComparison, DetectError> {
        let remote = remote_tip(handle)?;
        let local = local_tip(handle)?;
        Ok(RemoteComparison {
            has_changes: local != remote,
            remote_commit_id: remote,
        })
    }

    fn resolve_local_tip(&self, handle: &RepoHandle) -> Result<CommitId, DetectError> {
        local_tip(handle)
    }
}
