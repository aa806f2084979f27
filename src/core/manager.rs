use std::{os::unix::fs::PermissionsExt, path::Path, sync::Arc};

use tokio::{
    io::{split, AsyncBufReadExt, BufReader},
    net::UnixListener,
};

use crate::{
    config::load_settings,
    core::state::AppState,
    git::repo::is_git_repo,
    ipc::server::{handle_request, DaemonRequest},
    notifications::Notifier,
};

pub const SOCKET_PATH: &str = "/tmp/vigild.sock";

/// Boot-time pass over every registered repository. Repositories whose
/// checkout disappeared since registration are skipped here (and
/// logged); everything else goes through the engine, and the flagged
/// subset is announced in one batched notification.
pub async fn startup_scan(state: Arc<AppState>) {
    let settings = load_settings().await;
    let policy = settings.policy();

    let repos: Vec<_> = {
        let guard = state.repos.read().await;
        guard.values().cloned().collect()
    };

    let mut candidates = Vec::new();
    for handle in repos {
        if is_git_repo(Path::new(&handle.path)) {
            candidates.push(handle);
        } else {
            let _ = state
                .logger
                .warning(&format!(
                    "[{}] skipped: {} is no longer a git checkout",
                    handle.name, handle.path
                ))
                .await;
        }
    }

    let _ = state
        .logger
        .info(&format!("startup scan over {} repositories", candidates.len()))
        .await;

    let flagged = state.engine.check_all(&candidates, &policy).await;

    if !flagged.is_empty() {
        Notifier::new(settings.webhook_url.clone(), state.logger.clone())
            .notify_many(&flagged)
            .await;
    }
}

pub async fn start_socket_listener(state: Arc<AppState>) -> anyhow::Result<()> {
    let sock_path = Path::new(SOCKET_PATH);
    if sock_path.exists() {
        std::fs::remove_file(sock_path)?;
    }

    let listener = UnixListener::bind(sock_path)?;
    std::fs::set_permissions(sock_path, std::fs::Permissions::from_mode(0o666))?;

    state
        .logger
        .info(&format!("vigild is listening on {sock_path:?}"))
        .await?;

    loop {
        let (stream, _) = listener.accept().await?;

        let state = Arc::clone(&state);
        tokio::spawn(async move {
            let (read_half, mut write_half) = split(stream);
            let mut reader = BufReader::new(read_half);
            let mut buf = String::new();
            if let Err(e) = reader.read_line(&mut buf).await {
                let _ = state
                    .logger
                    .error(&format!("Failed to read from stream: {e}"))
                    .await;
                return;
            }

            let parsed: Result<DaemonRequest, _> = serde_json::from_str(&buf);
            match parsed {
                Ok(req) => {
                    if let Err(e) = handle_request(req, Arc::clone(&state), &mut write_half).await {
                        let _ = state
                            .logger
                            .error(&format!("Request handling failed: {e}"))
                            .await;
                    }
                }
                Err(e) => {
                    let _ = state
                        .logger
                        .error(&format!("JSON parsing error: {e}"))
                        .await;
                }
            }
        });
    }
}
