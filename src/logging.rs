use std::{path::PathBuf, sync::Arc};

use anyhow::Ok;
use chrono::Local;
use dirs::home_dir;
use tokio::{fs, io::AsyncWriteExt, sync::Mutex};

/// Timestamped append-only file logger shared by the daemon. Detection
/// failures land here instead of in front of the user.
#[derive(Clone)]
pub struct Logger {
    file: Arc<Mutex<tokio::fs::File>>,
}

pub fn log_dir() -> anyhow::Result<PathBuf> {
    let home = home_dir().ok_or_else(|| anyhow::anyhow!("Failed to find HOME directory"))?;
    Ok(home.join(".vigil").join("logs"))
}

pub async fn init_log_dir() -> anyhow::Result<PathBuf> {
    let dir = log_dir()?;
    if !fs::try_exists(&dir).await? {
        fs::create_dir_all(&dir).await?;
    }
    Ok(dir)
}

impl Logger {
    pub async fn new(path: &std::path::Path) -> anyhow::Result<Self> {
        let file = tokio::fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(path)
            .await?;
        Ok(Self {
            file: Arc::new(Mutex::new(file)),
        })
    }

    /// Daemon-wide log file under `~/.vigil/logs`.
    pub async fn open_default() -> anyhow::Result<Self> {
        let dir = init_log_dir().await?;
        Logger::new(&dir.join("vigild.log")).await
    }

    /// Sink logger for tests and one-shot commands.
    pub fn placeholder() -> Logger {
        Logger {
            file: Arc::new(Mutex::new(tokio::fs::File::from_std(
                std::fs::File::create("/dev/null").expect("failed to open /dev/null"),
            ))),
        }
    }

    pub async fn log(&self, msg: &str) -> anyhow::Result<()> {
        let mut f = self.file.lock().await;
        let now = Local::now();
        let full_msg = format!("[{}] {}\n", now.format("%Y-%m-%d %H:%M:%S"), msg);
        f.write_all(full_msg.as_bytes()).await?;
        f.flush().await?;
        Ok(())
    }

    pub async fn info(&self, msg: &str) -> anyhow::Result<()> {
        self.log(&format!("INFO: {msg}")).await
    }

    pub async fn warning(&self, msg: &str) -> anyhow::Result<()> {
        self.log(&format!("WARNING: {msg}")).await
    }

    pub async fn error(&self, msg: &str) -> anyhow::Result<()> {
        self.log(&format!("ERROR: {msg}")).await
    }
}
