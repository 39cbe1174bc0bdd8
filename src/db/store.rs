//! Storage capabilities consumed by the services, and their SQLite implementation.

use async_trait::async_trait;
use sqlx::{Pool, Sqlite};

use crate::db::models::{Message, Session, User};
use crate::db::{MessageRepository, ParticipantRepository, SessionRepository, UserRepository};
use crate::error::AppError;

/// Users and sessions, as needed by the session authenticator.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Fails with `AppError::Validation` when the username is taken.
    async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, AppError>;

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, AppError>;

    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>, AppError>;

    async fn create_session(
        &self,
        user_id: i64,
        token: &str,
        expires_at: i64,
    ) -> Result<Session, AppError>;

    async fn get_session_by_token(&self, token: &str) -> Result<Option<Session>, AppError>;

    /// Returns whether a session was removed.
    async fn delete_session(&self, token: &str) -> Result<bool, AppError>;
}

/// Chat history and membership.
#[async_trait]
pub trait ChatRepository: Send + Sync {
    async fn save_message(&self, user_id: i64, content: &str) -> Result<Message, AppError>;

    async fn recent_messages(&self, limit: i64) -> Result<Vec<Message>, AppError>;

    async fn delete_messages_before(&self, cutoff: i64) -> Result<u64, AppError>;

    async fn add_participant(&self, user_id: i64) -> Result<(), AppError>;

    async fn remove_participant(&self, user_id: i64) -> Result<(), AppError>;

    async fn is_participant(&self, user_id: i64) -> Result<bool, AppError>;
}

#[derive(Clone)]
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

#[async_trait]
impl CredentialStore for SqliteStore {
    async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, AppError> {
        UserRepository::create(&self.pool, username, email, password_hash).await
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        UserRepository::get_by_username(&self.pool, username).await
    }

    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        UserRepository::get_by_id(&self.pool, id).await
    }

    async fn create_session(
        &self,
        user_id: i64,
        token: &str,
        expires_at: i64,
    ) -> Result<Session, AppError> {
        SessionRepository::create(&self.pool, user_id, token, expires_at).await
    }

    async fn get_session_by_token(&self, token: &str) -> Result<Option<Session>, AppError> {
        SessionRepository::get_by_token(&self.pool, token).await
    }

    async fn delete_session(&self, token: &str) -> Result<bool, AppError> {
        SessionRepository::delete(&self.pool, token).await
    }
}

#[async_trait]
impl ChatRepository for SqliteStore {
    async fn save_message(&self, user_id: i64, content: &str) -> Result<Message, AppError> {
        MessageRepository::create(&self.pool, user_id, content).await
    }

    async fn recent_messages(&self, limit: i64) -> Result<Vec<Message>, AppError> {
        MessageRepository::get_recent(&self.pool, limit).await
    }

    async fn delete_messages_before(&self, cutoff: i64) -> Result<u64, AppError> {
        MessageRepository::delete_before(&self.pool, cutoff).await
    }

    async fn add_participant(&self, user_id: i64) -> Result<(), AppError> {
        ParticipantRepository::add(&self.pool, user_id).await
    }

    async fn remove_participant(&self, user_id: i64) -> Result<(), AppError> {
        ParticipantRepository::remove(&self.pool, user_id).await
    }

    async fn is_participant(&self, user_id: i64) -> Result<bool, AppError> {
        ParticipantRepository::exists(&self.pool, user_id).await
    }
}
