use std::sync::Arc;

use vigil_core::{
    core::{
        manager::{start_socket_listener, startup_scan},
        state::{init_registry_file, AppState},
    },
    logging::Logger,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_registry_file().await?;

    let logger = Logger::open_default().await?;
    let state = AppState::load_from_disk(logger.clone()).await?;

    logger.info("vigild starting").await?;

    // startup scan runs alongside the listener so early `opened` events
    // are not queued behind slow fetches
    tokio::spawn(startup_scan(Arc::clone(&state)));

    start_socket_listener(state).await?;

    Ok(())
}
