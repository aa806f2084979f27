use std::{collections::HashMap, path::PathBuf, sync::Arc};

use anyhow::{Ok, Result};
use serde::{Deserialize, Serialize};
use tokio::{fs, sync::RwLock};

use crate::{
    core::{cache::ChangeCache, engine::DetectionEngine},
    git::{remote::GitProbe, repo::RepoHandle},
    logging::Logger,
};

/// Shared daemon state: registered repositories plus the engine (which
/// owns the change cache). The startup scan and socket handlers both
/// hold this behind an Arc.
pub struct AppState {
    pub repos: RwLock<HashMap<String, RepoHandle>>,
    pub engine: DetectionEngine<GitProbe>,
    pub logger: Logger,
}

impl AppState {
    pub fn new(logger: Logger) -> Self {
        Self {
            repos: RwLock::new(HashMap::new()),
            engine: DetectionEngine::new(ChangeCache::new(), GitProbe, logger.clone()),
            logger,
        }
    }

    pub async fn load_from_disk(logger: Logger) -> Result<Arc<Self>> {
        let state = Self::new(logger);
        let registry = load_registry().await?;
        {
            let mut guard = state.repos.write().await;
            for handle in registry.repos {
                guard.insert(handle.id.clone(), handle);
            }
        }
        Ok(Arc::new(state))
    }

    pub async fn save_to_disk(&self) -> Result<()> {
        let guard = self.repos.read().await;
        let registry = RepoRegistry {
            repos: guard.values().cloned().collect(),
        };
        save_registry(&registry).await?;
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Clone, Default)]
pub struct RepoRegistry {
    pub repos: Vec<RepoHandle>,
}

pub fn registry_path() -> PathBuf {
    let path = dirs::data_local_dir().unwrap_or_else(|| {
        std::env::current_dir().expect("Failed to get current directory")
    });
    path.join("vigild").join("repos.json")
}

pub async fn init_registry_file() -> Result<()> {
    let path = registry_path();
    if !fs::try_exists(&path).await? {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let empty = RepoRegistry::default();
        let json = serde_json::to_string_pretty(&empty)?;
        fs::write(path, json).await?;
    }
    Ok(())
}

pub async fn load_registry() -> Result<RepoRegistry> {
    let path = registry_path();
    let data = fs::read_to_string(&path).await?;
    let registry = serde_json::from_str(&data)?;
    Ok(registry)
}

pub async fn save_registry(registry: &RepoRegistry) -> Result<()> {
    let path = registry_path();
    let json = serde_json::to_string_pretty(registry)?;
    fs::write(path, json).await?;
    Ok(())
}

pub async fn find_by_path(state: &AppState, path: &str) -> Option<RepoHandle> {
    let guard = state.repos.read().await;
    guard.values().find(|h| h.path == path).cloned()
}

pub async fn find_by_id_or_name(state: &AppState, key: &str) -> Option<RepoHandle> {
    let guard = state.repos.read().await;
    guard
        .values()
        .find(|h| h.id == key || h.name == key)
        .cloned()
}
