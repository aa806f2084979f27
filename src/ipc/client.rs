use anyhow::Result;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::UnixStream,
};

use crate::{
    core::manager::SOCKET_PATH,
    ipc::server::{DaemonRequest, DaemonResponse},
};

pub async fn send_request(req: DaemonRequest) -> Result<DaemonResponse> {
    let mut stream = UnixStream::connect(SOCKET_PATH)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect with daemon => {}", e))?;

    let json = serde_json::to_string(&req)? + "\n";
    stream.write_all(json.as_bytes()).await?;
    stream.flush().await?;

    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    reader.read_line(&mut line).await?;

    let response: DaemonResponse = serde_json::from_str(&line)?;
    Ok(response)
}

pub fn print_response(response: &DaemonResponse) {
    match response {
        DaemonResponse::Success(msg) => println!("{msg}"),
        DaemonResponse::Error(msg) => eprintln!("error: {msg}"),
        DaemonResponse::Checked { repo, has_changes } => {
            if *has_changes {
                println!("{repo}: remote has new commits");
            } else {
                println!("{repo}: up to date");
            }
        }
        DaemonResponse::Config(settings) => {
            println!("cache_enabled    = {}", settings.cache_enabled);
            println!("cooldown_minutes = {}", settings.cooldown_minutes);
            println!(
                "webhook_url      = {}",
                settings.webhook_url.as_deref().unwrap_or("(none)")
            );
        }
        DaemonResponse::ListRepos(repos) => {
            if repos.is_empty() {
                println!("no repositories registered");
                return;
            }
            println!(
                "{:<14} {:<20} {:<16} {:<40}",
                "ID", "NAME", "BRANCH", "REMOTE"
            );
            for r in repos {
                println!(
                    "{:<14} {:<20} {:<16} {:<40}",
                    r.id, r.name, r.branch, r.short_url
                );
            }
        }
    }
}
