//! Arena Server - authoritative multiplayer game server
//!
//! This is the main entry point for the game server. It handles:
//! - WebSocket connections for real-time gameplay
//! - The fixed-rate arena simulation
//! - Static file serving for the browser client

use std::net::SocketAddr;

use anyhow::bail;
use tokio::net::TcpListener;
use tracing::{error, info};

use arena_server::app::AppState;
use arena_server::config::Config;
use arena_server::game::Arena;
use arena_server::http::build_router;
use arena_server::init_tracing;
use arena_server::util::time::init_server_time;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level);

    // Initialize server time tracking
    init_server_time();

    info!("Starting Arena Server");
    info!("Server address: {}", config.server_addr);

    // Spawn the arena loop
    let seed = config.arena_seed.unwrap_or_else(rand::random::<u64>);
    let (arena, arena_handle) = Arena::new(seed);
    let mut arena_task = tokio::spawn(arena.run());
    info!(seed, "Arena seeded");

    // Create application state and router
    let state = AppState::new(config.clone(), arena_handle);
    let router = build_router(state);

    // Start server
    let addr: SocketAddr = config.server_addr;
    let listener = TcpListener::bind(addr).await?;

    info!("Server listening on {}", addr);
    info!("Health check: http://{}/health", addr);
    info!("WebSocket endpoint: ws://{}/ws", addr);

    let server = axum::serve(listener, router).with_graceful_shutdown(shutdown_signal());

    // A dead arena leaves the world in an unknown state; exit and let the supervisor restart us
    tokio::select! {
        result = server => {
            result?;
        }
        result = &mut arena_task => {
            match result {
                Err(e) if e.is_panic() => error!("Arena task panicked"),
                _ => error!("Arena task exited unexpectedly"),
            }
            bail!("arena loop terminated");
        }
    }

    arena_task.abort();
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        }
    }
}
