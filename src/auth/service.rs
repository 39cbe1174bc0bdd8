//! Session authentication: registration, login, token validation and revocation.
//!
//! All durable state lives behind [`CredentialStore`]; the authenticator itself
//! holds nothing mutable and is cheap to clone into request handlers.

use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::auth::validation::{normalize_username, validate_email, validate_password};
use crate::crypto::{generate_token, hash_password, verify_password};
use crate::db::{CredentialStore, Session, User};
use crate::error::AppError;
use crate::logging::token_hint;

pub const DEFAULT_SESSION_TTL_HOURS: i64 = 24;

#[derive(Clone)]
pub struct Authenticator {
    store: Arc<dyn CredentialStore>,
    session_ttl: Duration,
}

impl Authenticator {
    pub fn new(store: Arc<dyn CredentialStore>, session_expiry_hours: i64) -> Self {
        Self::with_session_ttl(store, Duration::hours(session_expiry_hours))
    }

    pub fn with_session_ttl(store: Arc<dyn CredentialStore>, session_ttl: Duration) -> Self {
        Self { store, session_ttl }
    }

    /// Create a user and their first session, returning its token.
    ///
    /// User and session creation are not atomic. If the second step fails the
    /// user exists without a session and can recover through [`login`](Self::login).
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<String, AppError> {
        let username = normalize_username(username)?;
        let email = validate_email(email)?;
        validate_password(password)?;

        // Fast path; the unique index still decides under concurrent registration.
        if self.store.get_user_by_username(&username).await?.is_some() {
            return Err(AppError::Validation("Username already exists".to_string()));
        }

        let password = password.to_owned();
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password)).await??;

        let user = self.store.create_user(&username, &email, &password_hash).await?;
        tracing::info!(user_id = user.id, username = %user.username, "user registered");

        let session = self.issue_session(user.id).await?;
        Ok(session.token)
    }

    /// Verify credentials and mint a new session. Earlier sessions stay valid.
    pub async fn login(&self, username: &str, password: &str) -> Result<String, AppError> {
        // A malformed name cannot belong to anyone; don't reveal why it failed.
        let username = normalize_username(username).map_err(|_| AppError::InvalidCredentials)?;

        let user = self
            .store
            .get_user_by_username(&username)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let password = password.to_owned();
        let stored_hash = user.password_hash.clone();
        let matches =
            tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash)).await??;

        if !matches {
            tracing::debug!(user_id = user.id, "password mismatch");
            return Err(AppError::InvalidCredentials);
        }

        let session = self.issue_session(user.id).await?;
        Ok(session.token)
    }

    /// Resolve a token to its owning user id.
    ///
    /// An expired session is deleted on the spot, so the next lookup of the
    /// same token reports `NotFound` rather than `Expired`.
    pub async fn validate_token(&self, token: &str) -> Result<i64, AppError> {
        let session = self
            .store
            .get_session_by_token(token)
            .await?
            .ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;

        if session.is_expired_at(Utc::now().timestamp()) {
            if let Err(err) = self.store.delete_session(token).await {
                tracing::warn!(error = %err, session_id = session.id, "failed to evict expired session");
            } else {
                tracing::debug!(session_id = session.id, "evicted expired session");
            }
            return Err(AppError::Expired);
        }

        Ok(session.user_id)
    }

    /// Revoke a session immediately.
    pub async fn logout(&self, token: &str) -> Result<(), AppError> {
        if !self.store.delete_session(token).await? {
            return Err(AppError::NotFound("Session not found".to_string()));
        }

        tracing::info!(token = %token_hint(token), "session revoked");
        Ok(())
    }

    pub async fn get_user(&self, id: i64) -> Result<User, AppError> {
        self.store
            .get_user_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))
    }

    async fn issue_session(&self, user_id: i64) -> Result<Session, AppError> {
        let token = generate_token();
        let expires_at = (Utc::now() + self.session_ttl).timestamp();

        let session = self.store.create_session(user_id, &token, expires_at).await?;
        tracing::debug!(user_id, session_id = session.id, expires_at, "session issued");

        Ok(session)
    }
}
