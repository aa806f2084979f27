use std::path::PathBuf;

use anyhow::Result;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use tokio::fs;

/// How aggressively the engine may reuse cached remote state. Read from
/// the settings file before every check, so `vigil config` edits take
/// effect on the next check without any cache invalidation.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionPolicy {
    pub cache_enabled: bool,
    pub cooldown_minutes: i64,
}

impl DetectionPolicy {
    pub fn cooldown(&self) -> Duration {
        Duration::minutes(self.cooldown_minutes)
    }
}

impl Default for DetectionPolicy {
    // caching off and cooldown 0: every check is a real fetch until the
    // operator opts in
    fn default() -> Self {
        Self {
            cache_enabled: false,
            cooldown_minutes: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub cache_enabled: bool,
    #[serde(default)]
    pub cooldown_minutes: i64,
    #[serde(default)]
    pub webhook_url: Option<String>,
}

impl Settings {
    pub fn policy(&self) -> DetectionPolicy {
        DetectionPolicy {
            cache_enabled: self.cache_enabled,
            cooldown_minutes: self.cooldown_minutes,
        }
    }
}

pub fn settings_path() -> PathBuf {
    let base = dirs::config_dir().unwrap_or_else(|| {
        std::env::current_dir().expect("Failed to get current directory")
    });
    base.join("vigil").join("settings.json")
}

pub async fn load_settings_from(path: &std::path::Path) -> Result<Settings> {
    let data = fs::read_to_string(path).await?;
    let settings = serde_json::from_str(&data)?;
    Ok(settings)
}

/// Missing or unreadable settings fall back to defaults; a half-edited
/// file must not stop the daemon.
pub async fn load_settings() -> Settings {
    load_settings_from(&settings_path()).await.unwrap_or_default()
}

pub async fn save_settings_to(path: &std::path::Path, settings: &Settings) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    fs::write(path, json).await?;
    Ok(())
}

pub async fn save_settings(settings: &Settings) -> Result<()> {
    save_settings_to(&settings_path(), settings).await
}
