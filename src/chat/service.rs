use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::db::{ChatRepository, Message};
use crate::error::AppError;

pub const DEFAULT_HISTORY_LIMIT: i64 = 50;
pub const MAX_HISTORY_LIMIT: i64 = 100;
pub const MAX_MESSAGE_CHARS: usize = 4096;

#[derive(Clone)]
pub struct ChatService {
    repo: Arc<dyn ChatRepository>,
}

impl ChatService {
    pub fn new(repo: Arc<dyn ChatRepository>) -> Self {
        Self { repo }
    }

    pub async fn send_message(&self, user_id: i64, content: &str) -> Result<Message, AppError> {
        if content.trim().is_empty() || content.chars().count() > MAX_MESSAGE_CHARS {
            return Err(AppError::Validation(format!(
                "Message must be 1-{} characters",
                MAX_MESSAGE_CHARS
            )));
        }

        self.repo.save_message(user_id, content).await
    }

    /// Up to `limit` most recent messages, newest first. `limit` is clamped to 1..=100.
    pub async fn get_messages(&self, limit: i64) -> Result<Vec<Message>, AppError> {
        self.repo.recent_messages(limit.clamp(1, MAX_HISTORY_LIMIT)).await
    }

    /// Drop messages older than `max_age`; returns how many were removed.
    pub async fn delete_old_messages(&self, max_age: Duration) -> Result<u64, AppError> {
        let cutoff = (Utc::now() - max_age).timestamp();
        self.repo.delete_messages_before(cutoff).await
    }

    pub async fn join_chat(&self, user_id: i64) -> Result<(), AppError> {
        self.repo.add_participant(user_id).await
    }

    pub async fn leave_chat(&self, user_id: i64) -> Result<(), AppError> {
        self.repo.remove_participant(user_id).await
    }

    pub async fn is_participant(&self, user_id: i64) -> Result<bool, AppError> {
        self.repo.is_participant(user_id).await
    }
}
