use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Register a repository to watch
    Add {
        /// Path of the checkout (defaults to the current directory)
        path: Option<String>,

        #[arg(short = 'b', long, default_value = None)]
        branch: Option<String>,
    },

    /// Stop watching a repository (by id or name)
    Rm { id: String },

    /// List watched repositories
    Ps,

    /// Report a repository as opened and check it now
    Opened {
        /// Path of the checkout (defaults to the current directory)
        path: Option<String>,
    },

    /// Show or edit detection settings
    Config {
        #[arg(long)]
        cache_enabled: Option<bool>,

        #[arg(long)]
        cooldown_minutes: Option<i64>,

        #[arg(long)]
        webhook_url: Option<String>,
    },
}
