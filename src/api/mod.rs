pub mod chat;
pub mod middleware;
pub mod state;
pub mod users;

pub use middleware::{AuthUser, Identity};
pub use state::AppState;

use axum::{
    extract::State,
    middleware as axum_middleware,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    connections: usize,
}

/// Forum-side router: chat history, the chat socket, the caller's profile and a health probe.
pub fn create_router(state: AppState) -> Router {
    let gated = Router::new()
        .route("/ws/chat", get(chat::chat_socket))
        .route("/api/users/me", get(users::me))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    let open = Router::new()
        .route("/api/chat/messages", get(chat::get_messages))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::optional_auth,
        ));

    Router::new()
        .route("/api/health", get(health))
        .merge(gated)
        .merge(open)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        connections: state.hub.connection_count().await,
    })
}
