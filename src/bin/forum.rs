use std::sync::Arc;
use std::time::Duration;

use forum_auth_chat::{
    api::{create_router, AppState},
    chat::{ChatService, Hub},
    config::Config,
    db::{self, SqliteStore},
    error::AppError,
    logging,
    rpc::HttpAuthClient,
    shutdown::shutdown_signal,
};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    logging::init();

    tracing::info!("Starting forum service v{}...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    tracing::info!("Configuration loaded");

    let pool = db::connect(&config).await?;
    tracing::info!(database = %config.database_url, "Database connected and migrated");

    let chat = ChatService::new(Arc::new(SqliteStore::new(pool)));
    let hub = Arc::new(Hub::new(
        chat.clone(),
        Duration::from_secs(config.ws_send_timeout_secs),
    ));

    let auth_timeout = config.auth_rpc_timeout();
    let auth = HttpAuthClient::new(config.auth_service_url.clone(), auth_timeout)?;
    match auth_timeout {
        Some(timeout) => tracing::info!(url = %config.auth_service_url, ?timeout, "Auth client configured"),
        None => tracing::warn!(
            url = %config.auth_service_url,
            "Auth client has no timeout; a hung auth service stalls gated requests"
        ),
    }

    // Spawn background task for chat retention
    if let Some(hours) = config.message_retention_hours {
        let chat = chat.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(3600)); // Every hour
            loop {
                interval.tick().await;
                match chat.delete_old_messages(chrono::Duration::hours(hours)).await {
                    Ok(removed) => tracing::debug!(removed, "Old chat messages removed"),
                    Err(e) => tracing::error!(error = %e, "Chat retention sweep failed"),
                }
            }
        });
        tracing::info!(hours, "Chat retention task started (runs hourly)");
    }

    let state = AppState {
        hub,
        chat,
        auth: Arc::new(auth),
    };

    let app = create_router(state);

    let addr = config.forum_address();
    tracing::info!("Forum listening on http://{}", addr);
    tracing::info!("  GET /api/chat/messages - Recent messages");
    tracing::info!("  GET /api/users/me      - Caller's profile (requires auth)");
    tracing::info!("  GET /ws/chat           - Chat socket (requires auth)");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to bind to {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("Forum service stopped");
    Ok(())
}
