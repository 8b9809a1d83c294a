//! murmur-daemon: runs a Murmur client against an in-process server.
//!
//! The round loop runs until Ctrl-C or a fatal transmitter error.

use std::sync::Arc;

use tracing::{error, info};

use murmur_daemon::{rounds, DaemonConfig, DaemonContext, LocalConnection, Transmitter};
use murmur_db::SqliteStore;
use murmur_server::{AccountManager, InMemoryAccountManager, Server, SqliteAccountManager};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("murmur=info".parse()?),
        )
        .init();

    info!("Murmur daemon starting");

    // 1. Load config
    let config = DaemonConfig::load()?;
    let data_dir = config.data_dir();
    std::fs::create_dir_all(&data_dir)?;

    // 2. Open the client store
    let store = SqliteStore::open(&data_dir.join("murmur.db"))?;
    let ctx = DaemonContext::new(Arc::new(store));

    // 3. Build the server
    let accounts: Box<dyn AccountManager> = if config.server.accounts_db.is_empty() {
        Box::new(InMemoryAccountManager::new())
    } else {
        Box::new(SqliteAccountManager::open(std::path::Path::new(
            &config.server.accounts_db,
        ))?)
    };
    let server = Server::new(
        config.pir.scheme,
        accounts,
        config.server.admission_policy(),
    )?;
    info!(scheme = ?config.pir.scheme, "server ready");
    let conn = LocalConnection::new(Arc::new(server), config.rounds.rpc_timeout());

    // 4. Start the round loop
    let transmitter = Transmitter::new(&ctx, conn, config.pir.transmitter_settings());
    let mut round_loop = tokio::spawn(rounds::run(
        transmitter,
        config.rounds.round_interval(),
        config.rounds.round_backoff(),
        ctx.shutdown_tx.subscribe(),
    ));

    let finished = tokio::select! {
        result = &mut round_loop => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };
    match finished {
        Some(Ok(Ok(()))) => info!("round loop finished"),
        Some(Ok(Err(e))) => error!("round loop stopped: {}", e),
        Some(Err(e)) => error!("round loop task failed: {}", e),
        None => {
            info!("Ctrl-C received, shutting down");
            ctx.shutdown();
            if let Err(e) = round_loop.await {
                error!("round loop task failed: {}", e);
            }
        }
    }

    info!("Daemon stopped");
    Ok(())
}
