use std::sync::Arc;
use std::time::Duration;

use forum_auth_chat::{
    auth::Authenticator,
    config::Config,
    db::{self, SqliteStore},
    error::AppError,
    logging, rpc,
    shutdown::shutdown_signal,
};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    logging::init();

    tracing::info!("Starting auth service v{}...", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded");

    let pool = db::connect(&config).await?;
    tracing::info!(database = %config.database_url, "Database connected and migrated");

    // Expired sessions are evicted lazily on validation; nothing sweeps them.
    let authenticator = Authenticator::new(
        Arc::new(SqliteStore::new(pool)),
        config.session_expiry_hours,
    );
    tracing::info!(hours = config.session_expiry_hours, "Session window configured");

    let app = rpc::create_router(authenticator, Duration::from_secs(config.request_timeout_secs));

    let addr = config.auth_address();
    tracing::info!("Auth RPC listening on http://{}", addr);
    tracing::info!("  POST {}", rpc::REGISTER_PATH);
    tracing::info!("  POST {}", rpc::LOGIN_PATH);
    tracing::info!("  POST {}", rpc::VALIDATE_TOKEN_PATH);
    tracing::info!("  POST {}", rpc::LOGOUT_PATH);
    tracing::info!("  POST {}", rpc::GET_USER_PATH);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to bind to {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("Auth service stopped");
    Ok(())
}
