use duckdb::Connection;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tripdesk::config::Config;
use tripdesk::ingest::handler::AppState;
use tripdesk::{server, storage};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tripdesk=info,tower_http=info".into()),
        )
        .init();

    let config_path = std::env::args().nth(1);
    let config = Config::load(config_path.as_deref().map(std::path::Path::new));

    tracing::info!(
        host = %config.host,
        port = config.port,
        data_dir = %config.data_dir.display(),
        window_size = config.window_size,
        utc_offset_minutes = config.utc_offset_minutes,
        "Starting tripdesk"
    );

    std::fs::create_dir_all(&config.data_dir).expect("Failed to create data directory");

    let conn = Connection::open(config.database_path()).expect("Failed to open DuckDB");
    storage::migrations::run_migrations(&conn).expect("Failed to run migrations");
    let conn = Arc::new(Mutex::new(conn));

    let state = Arc::new(
        AppState::from_config(&config, Arc::clone(&conn)).expect("Failed to initialize state"),
    );
    if state.admin_password_hash.lock().is_none() {
        tracing::warn!("No admin password configured; the first POST /api/auth/setup sets it");
    }

    // Periodic flush plus housekeeping for the limiters and session store.
    let flush_state = Arc::clone(&state);
    let flush_interval = Duration::from_secs(config.flush_interval_secs.max(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(flush_interval);
        loop {
            interval.tick().await;
            let state = Arc::clone(&flush_state);
            let result = tokio::task::spawn_blocking(move || {
                state.visit_limiter.cleanup();
                state.inquiry_limiter.cleanup();
                state.sessions.cleanup();
                state.buffer.flush()
            })
            .await;
            match result {
                Ok(Ok(count)) if count > 0 => tracing::info!(count, "Periodic flush completed"),
                Ok(Ok(_)) => {}
                Ok(Err(e)) => tracing::error!(error = %e, "Periodic flush failed"),
                Err(e) => tracing::error!(error = %e, "Periodic flush task panicked"),
            }
        }
    });

    let app = server::build_router(Arc::clone(&state));
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind to {addr}: {e}"));

    tracing::info!(addr = %addr, "Listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // Persist whatever the buffer still holds before exiting.
    let timeout = Duration::from_secs(config.shutdown_timeout_secs);
    let final_flush = tokio::task::spawn_blocking(move || state.buffer.flush());
    match tokio::time::timeout(timeout, final_flush).await {
        Ok(Ok(Ok(count))) => tracing::info!(count, "Final flush completed"),
        Ok(Ok(Err(e))) => tracing::error!(error = %e, "Final flush failed"),
        Ok(Err(e)) => tracing::error!(error = %e, "Final flush task panicked"),
        Err(_) => tracing::error!("Final flush timed out"),
    }
    tracing::info!("Shutdown complete");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
