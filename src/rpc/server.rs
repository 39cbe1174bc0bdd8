//! Authentication endpoint.
//!
//! A thin translation layer: each call invokes the authenticator exactly once.
//! Every domain error is logged and then reported with the same generic
//! failure status (500), carrying the error text in the body. Callers cannot
//! tell a wrong password from a storage outage by status alone.

use std::time::Duration;

use axum::{extract::State, http::StatusCode, routing::{get, post}, Json, Router};
use serde::Serialize;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::auth::Authenticator;
use crate::rpc::proto::{
    LoginRequest, LogoutResponse, RegisterRequest, TokenRequest, TokenResponse, UserProfile,
    UserRequest, UserResponse, ValidateTokenResponse,
};
use crate::rpc::{GET_USER_PATH, LOGIN_PATH, LOGOUT_PATH, REGISTER_PATH, VALIDATE_TOKEN_PATH};

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

pub fn create_router(authenticator: Authenticator, request_timeout: Duration) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route(REGISTER_PATH, post(register))
        .route(LOGIN_PATH, post(login))
        .route(VALIDATE_TOKEN_PATH, post(validate_token))
        .route(LOGOUT_PATH, post(logout))
        .route(GET_USER_PATH, post(get_user))
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, request_timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(authenticator)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn register(
    State(auth): State<Authenticator>,
    Json(req): Json<RegisterRequest>,
) -> (StatusCode, Json<TokenResponse>) {
    match auth.register(&req.username, &req.email, &req.password).await {
        Ok(token) => (StatusCode::OK, Json(TokenResponse::ok(token))),
        Err(err) => {
            tracing::error!(error = %err, username = %req.username, "failed to register user");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(TokenResponse::failure(err)))
        }
    }
}

async fn login(
    State(auth): State<Authenticator>,
    Json(req): Json<LoginRequest>,
) -> (StatusCode, Json<TokenResponse>) {
    match auth.login(&req.username, &req.password).await {
        Ok(token) => (StatusCode::OK, Json(TokenResponse::ok(token))),
        Err(err) => {
            tracing::error!(error = %err, username = %req.username, "failed to login user");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(TokenResponse::failure(err)))
        }
    }
}

async fn validate_token(
    State(auth): State<Authenticator>,
    Json(req): Json<TokenRequest>,
) -> (StatusCode, Json<ValidateTokenResponse>) {
    match auth.validate_token(&req.token).await {
        Ok(user_id) => (StatusCode::OK, Json(ValidateTokenResponse::ok(user_id))),
        Err(err) => {
            tracing::error!(error = %err, "failed to validate token");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(ValidateTokenResponse::failure(err)))
        }
    }
}

async fn logout(
    State(auth): State<Authenticator>,
    Json(req): Json<TokenRequest>,
) -> (StatusCode, Json<LogoutResponse>) {
    match auth.logout(&req.token).await {
        Ok(()) => (StatusCode::OK, Json(LogoutResponse::ok())),
        Err(err) => {
            tracing::error!(error = %err, "failed to logout");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(LogoutResponse::failure(err)))
        }
    }
}

async fn get_user(
    State(auth): State<Authenticator>,
    Json(req): Json<UserRequest>,
) -> (StatusCode, Json<UserResponse>) {
    match auth.get_user(req.user_id).await {
        Ok(user) => (StatusCode::OK, Json(UserResponse::ok(UserProfile::from(user)))),
        Err(err) => {
            tracing::error!(error = %err, user_id = req.user_id, "failed to get user");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(UserResponse::failure(err)))
        }
    }
}
