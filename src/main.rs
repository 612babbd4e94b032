//! SparkUp chat server.
//!
//! Main entry point that wires all crates together and starts the server.

use tracing_subscriber::{EnvFilter, fmt};

use sparkup_api::{AppState, build_app};
use sparkup_cache::MembershipCache;
use sparkup_core::config::{AppConfig, DatabaseProvider};
use sparkup_core::error::AppError;
use sparkup_database::ChatStores;
use sparkup_realtime::RealtimeEngine;

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Load configuration from `config/` and the environment.
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("SPARKUP_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(&env)
}

/// Initialize tracing. `RUST_LOG` wins over `logging.level`.
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting SparkUp chat v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Store ────────────────────────────────────────────
    let stores = ChatStores::connect(&config.database).await?;
    if config.database.provider == DatabaseProvider::Memory {
        tracing::warn!("Using the in-memory store; all data is lost on shutdown");
    }

    // ── Step 2: Membership cache ─────────────────────────────────
    let cache = MembershipCache::new(&config.cache.membership, stores.members.clone());
    tracing::info!(
        interval_minutes = config.cache.membership.interval_minutes,
        max_capacity = config.cache.membership.max_capacity,
        "Membership cache initialized"
    );

    // ── Step 3: Real-time engine ─────────────────────────────────
    let realtime = RealtimeEngine::new(config.realtime.clone(), cache, stores.messages.clone());

    // ── Step 4: HTTP server ──────────────────────────────────────
    let addr = config.server.bind_address();
    let state = AppState::new(config, stores.clone(), realtime);
    let engine = state.realtime.clone();
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;
    tracing::info!(address = %addr, "SparkUp chat server listening");

    // ── Step 5: Graceful shutdown ────────────────────────────────
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            tracing::info!("Shutdown signal received, closing connections...");
            if let Err(e) = engine.shutdown().await {
                tracing::error!(error = %e, "Real-time engine shutdown failed");
            }
        })
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    stores.close().await;
    tracing::info!("SparkUp chat server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
