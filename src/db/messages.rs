use sqlx::{Pool, Sqlite};
use crate::db::models::Message;
use crate::error::AppError;

pub struct MessageRepository;

impl MessageRepository {
    pub async fn create(
        pool: &Pool<Sqlite>,
        user_id: i64,
        content: &str,
    ) -> Result<Message, AppError> {
        let created_at = chrono::Utc::now().timestamp();

        let message = sqlx::query_as::<_, Message>(
            r#"
INSERT INTO messages (user_id, content, created_at)
VALUES (?, ?, ?)
RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(content)
        .bind(created_at)
        .fetch_one(pool)
        .await?;

        Ok(message)
    }

    /// Most recent first. Ties on the second-resolution timestamp fall back to id.
    pub async fn get_recent(
        pool: &Pool<Sqlite>,
        limit: i64,
    ) -> Result<Vec<Message>, AppError> {
        let messages = sqlx::query_as::<_, Message>(
            r#"
SELECT id, user_id, content, created_at
FROM messages
ORDER BY created_at DESC, id DESC
LIMIT ?
            "#
        )
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(messages)
    }

    pub async fn delete_before(
        pool: &Pool<Sqlite>,
        cutoff: i64,
    ) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM messages WHERE created_at < ?")
            .bind(cutoff)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }
}
