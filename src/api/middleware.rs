//! Auth gate for the chat routes.
//!
//! Both modes extract `Authorization: Bearer <token>` and resolve it through
//! the remote auth service, blocking the request until the call returns.
//! Any failure, whether a bad header, an unknown token or an unreachable
//! backend, is treated alike: [`require_auth`] rejects with 401,
//! [`optional_auth`] lets the request through as anonymous.
//!
//! Handlers receive the outcome as typed extractors, [`AuthUser`] or
//! [`Identity`], rather than digging through request extensions.

use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::api::state::AppState;
use crate::error::AppError;

/// A caller whose bearer token was validated. Only present behind [`require_auth`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser(pub i64);

/// The caller's resolved user id, if any.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Identity(pub Option<i64>);

impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .copied()
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Identity {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Identity>().copied().unwrap_or_default())
    }
}

/// Strict gate: reject before the handler runs unless the token validates.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers());
    let user_id = resolve_user(&state, token).await.map_err(|err| {
        tracing::debug!(error = %err, path = %request.uri().path(), "rejecting unauthenticated request");
        AppError::Unauthorized("Invalid or missing credentials".to_string())
    })?;

    request.extensions_mut().insert(AuthUser(user_id));
    request.extensions_mut().insert(Identity(Some(user_id)));

    Ok(next.run(request).await)
}

/// Permissive gate: same validation, but failures fall through anonymously.
pub async fn optional_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = bearer_token(request.headers());
    let identity = match resolve_user(&state, token).await {
        Ok(user_id) => Identity(Some(user_id)),
        Err(err) => {
            tracing::trace!(error = %err, "continuing anonymously");
            Identity(None)
        }
    };

    request.extensions_mut().insert(identity);
    next.run(request).await
}

// Takes the already-extracted token so no borrow of the request is held
// across the remote call.
async fn resolve_user(state: &AppState, token: Result<String, AppError>) -> Result<i64, AppError> {
    state.auth.validate_token(&token?).await
}

/// Extract the token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<String, AppError> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".to_string()))?;

    match header.strip_prefix("Bearer ") {
        Some(token) if !token.is_empty() && !token.contains(char::is_whitespace) => {
            Ok(token.to_string())
        }
        _ => Err(AppError::Unauthorized("Invalid Authorization format".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_extraction() {
        assert_eq!(bearer_token(&headers("Bearer abc123")).unwrap(), "abc123");

        assert!(bearer_token(&HeaderMap::new()).is_err());
        assert!(bearer_token(&headers("Basic abc123")).is_err());
        assert!(bearer_token(&headers("Bearer")).is_err());
        assert!(bearer_token(&headers("Bearer ")).is_err());
        assert!(bearer_token(&headers("Bearer a b")).is_err());
        assert!(bearer_token(&headers("bearer abc123")).is_err());
    }
}
