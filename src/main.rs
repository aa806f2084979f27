use clap::Parser;

use vigil_core::{
    cli::{Cli, Commands},
    ipc::{
        client::{print_response, send_request},
        server::DaemonRequest,
    },
};

fn cwd_or(path: Option<String>) -> anyhow::Result<String> {
    match path {
        Some(p) => Ok(p),
        None => Ok(std::env::current_dir()?.display().to_string()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let req = match cli.command {
        Commands::Add { path, branch } => DaemonRequest::AddRepo {
            path: cwd_or(path)?,
            branch,
        },
        Commands::Rm { id } => DaemonRequest::RmRepo { id },
        Commands::Ps => DaemonRequest::ListRepos,
        Commands::Opened { path } => DaemonRequest::Opened {
            path: cwd_or(path)?,
        },
        Commands::Config {
            cache_enabled,
            cooldown_minutes,
            webhook_url,
        } => {
            if cache_enabled.is_none() && cooldown_minutes.is_none() && webhook_url.is_none() {
                DaemonRequest::ShowConfig
            } else {
                DaemonRequest::SetConfig {
                    cache_enabled,
                    cooldown_minutes,
                    webhook_url,
                }
            }
        }
    };

    let response = send_request(req).await?;
    print_response(&response);
    Ok(())
}
