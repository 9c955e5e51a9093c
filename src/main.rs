//! slircbot - IRC command bot.

use slirc_bot::auth::AccountStore;
use slirc_bot::commands::{Registry, builtin};
use slirc_bot::config::Config;
use slirc_bot::db::Database;
use slirc_bot::network::{Connection, ConnectionSettings};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// How long each connection gets to close after QUIT.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(15);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;
    config.validate()?;

    info!(
        nick = %config.bot.nickname,
        servers = config.servers.len(),
        "Starting slircbot"
    );

    let db = Database::new(&config.database.path).await?;
    let store: Arc<dyn AccountStore> = Arc::new(db);

    let mut registry = Registry::with_default_prefix(config.bot.command_prefix.clone());
    builtin::register_defaults(&mut registry)?;
    info!(commands = registry.len(), "Commands registered");
    let registry = Arc::new(registry);

    let mut connections = Vec::new();
    for server in &config.servers {
        let settings = ConnectionSettings::from_config(&config, server);
        let connected = Connection::connect(
            &server.address,
            settings,
            Arc::clone(&registry),
            Arc::clone(&store),
        )
        .await;
        match connected {
            Ok(connection) => connections.push(connection),
            Err(e) => error!(server = %server.address, error = %e, "Failed to connect"),
        }
    }

    if connections.is_empty() {
        anyhow::bail!("no server could be reached");
    }

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");

    let quit_message = config.bot.quit_message.as_deref();
    for connection in connections {
        let server = connection.server().to_string();
        match tokio::time::timeout(SHUTDOWN_GRACE, connection.quit(quit_message)).await {
            Ok(Ok(())) => info!(server = %server, "Connection closed"),
            Ok(Err(e)) => warn!(server = %server, error = %e, "Connection closed with error"),
            Err(_) => warn!(server = %server, "Server did not close the connection in time"),
        }
    }

    Ok(())
}
