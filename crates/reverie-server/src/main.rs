//! Reverie server binary.
//!
//! Wires together the persistence pool, kernel, session layer, WCP
//! transports, and the agent scheduler for one world, then runs until
//! interrupted. Persistence being unreachable at startup is fatal;
//! everything after that degrades per-subsystem.
//!
//! # Startup sequence
//!
//! 1. Initialize structured logging (tracing, stderr)
//! 2. Load configuration from the environment
//! 3. Connect to PostgreSQL and run migrations
//! 4. Build the kernel and session manager; start the hourly sweep
//! 5. Build the LLM router (lazy tiers)
//! 6. Start the selected WCP transport (stdio or websocket)
//! 7. Start the scheduler cycle loop
//! 8. On ctrl-c, drain the in-flight cycle, log statistics, close the pool

use std::sync::Arc;

use reverie_db::{PostgresConfig, PostgresPool};
use reverie_kernel::Kernel;
use reverie_llm::LlmRouter;
use reverie_scheduler::{CycleEngine, SchedulerConfig};
use reverie_session::SessionManager;
use reverie_wcp::WcpServer;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Default websocket port (`MCP_PORT`).
const DEFAULT_PORT: u16 = 3000;

/// Which transport carries WCP traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transport {
    Stdio,
    Websocket,
}

fn transport_from_env() -> Result<Transport, String> {
    match std::env::var("MCP_TRANSPORT") {
        Ok(raw) => match raw.to_lowercase().as_str() {
            "stdio" => Ok(Transport::Stdio),
            "websocket" => Ok(Transport::Websocket),
            other => Err(format!("unknown MCP_TRANSPORT: {other}")),
        },
        Err(_) => Ok(Transport::Stdio),
    }
}

fn port_from_env() -> Result<u16, String> {
    match std::env::var("MCP_PORT") {
        Ok(raw) if !raw.is_empty() => raw
            .parse()
            .map_err(|e| format!("invalid MCP_PORT: {e}")),
        _ => Ok(DEFAULT_PORT),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Structured logging. Logs go to stderr so the stdio transport
    //    keeps stdout clean for protocol frames.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    info!("reverie-server starting");

    // 2. Configuration.
    let db_config = PostgresConfig::from_env()?;
    let scheduler_config = SchedulerConfig::from_env()?;
    let transport = transport_from_env()?;
    let port = port_from_env()?;
    info!(
        world_id = %scheduler_config.world_id,
        cycle_interval_ms = scheduler_config.cycle_interval.as_millis() as u64,
        transport = ?transport,
        "configuration loaded"
    );

    // 3. Persistence. Unreachable database aborts the process.
    let pool = match PostgresPool::connect(&db_config).await {
        Ok(pool) => pool,
        Err(e) => {
            error!(error = %e, "cannot reach PostgreSQL, aborting");
            return Err(e.into());
        }
    };
    let applied = reverie_db::run_migrations(&pool).await?;
    if applied > 0 {
        info!(applied, "migrations applied");
    }

    // 4. Kernel and sessions.
    let kernel = Kernel::new(pool.clone());
    let sessions = Arc::new(SessionManager::new(pool.clone()));
    let sweeper = sessions.spawn_sweeper();

    // 5. LLM router (tiers initialize lazily on first use).
    let router = LlmRouter::from_env()?;

    // 6 + 7. Transports and scheduler share one shutdown signal.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let wcp = Arc::new(WcpServer::new(kernel.clone(), Arc::clone(&sessions)));
    let transport_handle = match transport {
        Transport::Stdio => {
            let server = Arc::clone(&wcp);
            let rx = shutdown_rx.clone();
            tokio::spawn(async move {
                if let Err(e) = reverie_wcp::run_stdio(server, rx).await {
                    warn!(error = %e, "stdio transport ended with error");
                }
            })
        }
        Transport::Websocket => {
            let server = Arc::clone(&wcp);
            let rx = shutdown_rx.clone();
            tokio::spawn(async move {
                if let Err(e) = reverie_wcp::run_websocket(server, port, rx).await {
                    warn!(error = %e, "websocket transport ended with error");
                }
            })
        }
    };

    let engine = CycleEngine::new(kernel, router, scheduler_config);
    let scheduler_handle = tokio::spawn(engine.run(shutdown_rx));

    // 8. Run until interrupted, then drain.
    tokio::signal::ctrl_c().await?;
    info!("interrupt received, shutting down");
    let _ = shutdown_tx.send(true);

    match scheduler_handle.await {
        Ok(_stats) => {} // run() logs its own summary
        Err(e) => warn!(error = %e, "scheduler task panicked"),
    }
    transport_handle.abort();
    sweeper.abort();
    pool.close().await;

    info!("reverie-server shutdown complete");
    Ok(())
}
