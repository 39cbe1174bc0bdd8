use sqlx::{Pool, Sqlite};
use crate::error::AppError;

pub struct ParticipantRepository;

impl ParticipantRepository {
    /// Idempotent: joining twice keeps the original `joined_at`.
    pub async fn add(pool: &Pool<Sqlite>, user_id: i64) -> Result<(), AppError> {
        let joined_at = chrono::Utc::now().timestamp();

        sqlx::query("INSERT OR IGNORE INTO chat_participants (user_id, joined_at) VALUES (?, ?)")
            .bind(user_id)
            .bind(joined_at)
            .execute(pool)
            .await?;

        Ok(())
    }

    pub async fn remove(pool: &Pool<Sqlite>, user_id: i64) -> Result<(), AppError> {
        sqlx::query("DELETE FROM chat_participants WHERE user_id = ?")
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(())
    }

    pub async fn exists(pool: &Pool<Sqlite>, user_id: i64) -> Result<bool, AppError> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM chat_participants WHERE user_id = ?")
                .bind(user_id)
                .fetch_optional(pool)
                .await?;

        Ok(row.is_some())
    }
}
