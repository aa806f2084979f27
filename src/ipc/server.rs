use std::{path::Path, sync::Arc};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::{
    io::{AsyncWriteExt, WriteHalf},
    net::UnixStream,
};

use crate::{
    config::{load_settings, save_settings, Settings},
    core::{
        id::short_id,
        state::{find_by_id_or_name, find_by_path, AppState},
    },
    git::repo::{is_git_repo, RepoHandle},
    notifications::Notifier,
};

#[derive(Serialize, Deserialize, Debug)]
#[serde(tag = "action")]
pub enum DaemonRequest {
    #[serde(rename = "add_repo")]
    AddRepo {
        path: String,
        branch: Option<String>,
    },

    #[serde(rename = "rm_repo")]
    RmRepo { id: String },

    #[serde(rename = "list_repos")]
    ListRepos,

    /// Lifecycle event: a repository became active in the operator's
    /// environment and should be checked now.
    #[serde(rename = "opened")]
    Opened { path: String },

    #[serde(rename = "set_config")]
    SetConfig {
        cache_enabled: Option<bool>,
        cooldown_minutes: Option<i64>,
        webhook_url: Option<String>,
    },

    #[serde(rename = "show_config")]
    ShowConfig,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct RepoInfo {
    pub id: String,
    pub name: String,
    pub branch: String,
    pub path: String,
    pub short_url: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub enum DaemonResponse {
    Success(String),
    Error(String),
    ListRepos(Vec<RepoInfo>),
    Checked { repo: String, has_changes: bool },
    Config(Settings),
}

pub async fn handle_add_repo(
    state: &AppState,
    path: String,
    branch: Option<String>,
) -> DaemonResponse {
    if !is_git_repo(Path::new(&path)) {
        return DaemonResponse::Error(format!("{path} is not a git repository"));
    }

    let handle = match RepoHandle::build(Path::new(&path), branch, short_id()) {
        Ok(h) => h,
        Err(e) => return DaemonResponse::Error(format!("Failed to read repository: {e}")),
    };

    {
        let mut guard = state.repos.write().await;
        guard.insert(handle.id.clone(), handle.clone());
    }
    if let Err(e) = state.save_to_disk().await {
        return DaemonResponse::Error(format!("Failed to save registry: {e}"));
    }

    DaemonResponse::Success(format!(
        "Watching {} ({}) with ID: {}",
        handle.name, handle.branch, handle.id
    ))
}

pub async fn handle_rm_repo(state: &AppState, key: String) -> DaemonResponse {
    let found = find_by_id_or_name(state, &key).await;
    match found {
        Some(handle) => {
            {
                let mut guard = state.repos.write().await;
                guard.remove(&handle.id);
            }
            if let Err(e) = state.save_to_disk().await {
                return DaemonResponse::Error(format!("Failed to save registry: {e}"));
            }
            DaemonResponse::Success(format!("Stopped watching {}", handle.name))
        }
        None => DaemonResponse::Error(format!("No repository found for `{key}`")),
    }
}

pub async fn handle_list_repos(state: &AppState) -> DaemonResponse {
    let guard = state.repos.read().await;
    let mut r: Vec<RepoInfo> = Vec::new();

    for handle in guard.values() {
        let short_url = if handle.remote.len() > 40 {
            format!("{}...", &handle.remote[..37])
        } else {
            handle.remote.clone()
        };

        r.push(RepoInfo {
            id: handle.id.clone(),
            name: handle.name.clone(),
            branch: handle.branch.clone(),
            path: handle.path.clone(),
            short_url,
        });
    }

    DaemonResponse::ListRepos(r)
}

/// A repository went active: run one detection pass for it, with the
/// policy re-read from disk so recent `config` edits apply. A positive
/// result triggers a single notification; failures have already been
/// logged by the engine and read as "no change".
pub async fn handle_opened(state: &AppState, path: String) -> DaemonResponse {
    if !is_git_repo(Path::new(&path)) {
        return DaemonResponse::Error(format!("{path} is not a git repository"));
    }

    // registry stores canonicalized paths
    let path = Path::new(&path)
        .canonicalize()
        .map(|p| p.display().to_string())
        .unwrap_or(path);

    let handle = match find_by_path(state, &path).await {
        Some(h) => h,
        // unregistered checkouts still get a one-off check; keyed by
        // path so repeated opens share one cache entry
        None => match RepoHandle::build(Path::new(&path), None, path.clone()) {
            Ok(h) => h,
            Err(e) => return DaemonResponse::Error(format!("Failed to read repository: {e}")),
        },
    };

    let settings = load_settings().await;
    let has_changes = state.engine.check_one(&handle, &settings.policy()).await;

    if has_changes {
        Notifier::new(settings.webhook_url.clone(), state.logger.clone())
            .notify_one(&handle)
            .await;
    }

    DaemonResponse::Checked {
        repo: handle.name,
        has_changes,
    }
}

pub async fn handle_set_config(
    cache_enabled: Option<bool>,
    cooldown_minutes: Option<i64>,
    webhook_url: Option<String>,
) -> DaemonResponse {
    let mut settings = load_settings().await;
    if let Some(enabled) = cache_enabled {
        settings.cache_enabled = enabled;
    }
    if let Some(minutes) = cooldown_minutes {
        settings.cooldown_minutes = minutes;
    }
    if let Some(url) = webhook_url {
        settings.webhook_url = if url.is_empty() { None } else { Some(url) };
    }

    match save_settings(&settings).await {
        Ok(()) => DaemonResponse::Config(settings),
        Err(e) => DaemonResponse::Error(format!("Failed to save settings: {e}")),
    }
}

pub async fn handle_request(
    req: DaemonRequest,
    state: Arc<AppState>,
    stream: &mut WriteHalf<UnixStream>,
) -> Result<()> {
    let response = match req {
        DaemonRequest::AddRepo { path, branch } => handle_add_repo(&state, path, branch).await,
        DaemonRequest::RmRepo { id } => handle_rm_repo(&state, id).await,
        DaemonRequest::ListRepos => handle_list_repos(&state).await,
        DaemonRequest::Opened { path } => handle_opened(&state, path).await,
        DaemonRequest::SetConfig {
            cache_enabled,
            cooldown_minutes,
            webhook_url,
        } => handle_set_config(cache_enabled, cooldown_minutes, webhook_url).await,
        DaemonRequest::ShowConfig => DaemonResponse::Config(load_settings().await),
    };

    let response_str = serde_json::to_string(&response)? + "\n";
    stream.write_all(response_str.as_bytes()).await?;
    stream.flush().await?;
    Ok(())
}
