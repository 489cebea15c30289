//! Sensbox server: presence overlay for the device messaging fabric.
//!
//! Wires the registry, Directory Service client, change feed and overlay
//! together and serves the admin surface. Device connections are not
//! accepted here: a broker transport embeds `sensbox-overlay` and drives the
//! `Overlay` hooks through its own `MessagingEngine`. This process runs the
//! configuration fan-out and reports health and counters for it.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tokio::task::JoinHandle;
use tracing_subscriber::{EnvFilter, fmt};

use sensbox_core::config::AppConfig;
use sensbox_core::error::AppError;
use sensbox_directory::{CloudDirectory, LiveQueryFeed};
use sensbox_overlay::{LocalEngine, Overlay};
use sensbox_registry::{ConnectionRegistry, StoreManager};

/// How long shutdown waits for the fan-out task.
const FANOUT_GRACE: Duration = Duration::from_secs(5);

/// Shared state of the admin routes.
#[derive(Clone)]
struct AdminState {
    registry: ConnectionRegistry,
    overlay: Overlay,
}

#[tokio::main]
async fn main() {
    install_panic_hook();

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

/// Load configuration from files and environment
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("SENSBOX_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(&env)
}

/// Initialize tracing/logging
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

/// Any panic is fatal: log it and exit without draining.
fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        tracing::error!(panic = %info, "Unrecoverable error, exiting");
        eprintln!("{info}");
        std::process::exit(1);
    }));
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!(
        node_id = %config.server.node_id,
        "Starting Sensbox v{}",
        env!("CARGO_PKG_VERSION")
    );

    // ── Step 1: Connection registry ──────────────────────────────
    tracing::info!(provider = %config.registry.provider, "Initializing connection registry...");
    let store = StoreManager::new(&config.registry).await?;
    let registry = ConnectionRegistry::new(Arc::new(store), config.registry.session_ttl_seconds);
    tracing::info!("Connection registry initialized");

    // ── Step 2: Directory Service ────────────────────────────────
    let directory = Arc::new(CloudDirectory::new(&config.directory)?);
    tracing::info!(url = %config.directory.url, "Directory client initialized");

    // ── Step 3: Messaging engine + overlay ───────────────────────
    // In-process engine: no transport attaches to it in this binary.
    let engine = Arc::new(LocalEngine::default());
    let overlay = Overlay::new(
        registry.clone(),
        directory.clone(),
        directory,
        engine,
    );

    // ── Step 4: Configuration fan-out ────────────────────────────
    let fanout_handle = if config.feed.enabled {
        let feed = LiveQueryFeed::new(config.feed_url(), &config.directory, &config.feed);
        Some(overlay.spawn_fanout(Arc::new(feed)))
    } else {
        tracing::info!("Configuration fan-out disabled");
        None
    };

    // ── Step 5: Admin HTTP surface ───────────────────────────────
    let app = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .with_state(AdminState {
            registry,
            overlay: overlay.clone(),
        });

    let addr = format!("{}:{}", config.server.host, config.server.admin_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    tracing::info!("Admin surface listening on {}", addr);

    // ── Step 6: Shutdown ─────────────────────────────────────────
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    tracing::info!("Shutdown signal received");
    overlay.shutdown().await;
    if let Some(handle) = fanout_handle {
        await_stopped("configuration fan-out", handle, FANOUT_GRACE).await;
    }

    tracing::info!("Sensbox server shut down");
    Ok(())
}

/// Wait up to `grace` for a background task to finish; abort it otherwise.
///
/// Returns whether the task stopped on its own.
async fn await_stopped<T>(name: &str, mut handle: JoinHandle<T>, grace: Duration) -> bool {
    match tokio::time::timeout(grace, &mut handle).await {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            tracing::warn!(task = name, error = %e, "Background task ended abnormally");
            true
        }
        Err(_) => {
            tracing::warn!(
                task = name,
                grace_ms = grace.as_millis() as u64,
                "Background task did not stop in time, aborting"
            );
            handle.abort();
            false
        }
    }
}

async fn health(State(state): State<AdminState>) -> impl IntoResponse {
    match state.registry.health_check().await {
        Ok(true) => (StatusCode::OK, Json(json!({ "status": "ok" }))),
        Ok(false) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "degraded", "registry": "unreachable" })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "degraded", "registry": e.to_string() })),
        ),
    }
}

async fn metrics(State(state): State<AdminState>) -> impl IntoResponse {
    Json(state.overlay.metrics.snapshot())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
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
