use sqlx::{Pool, Sqlite};
use crate::db::models::Session;
use crate::error::AppError;

pub struct SessionRepository;

impl SessionRepository {
    pub async fn create(
        pool: &Pool<Sqlite>,
        user_id: i64,
        token: &str,
        expires_at: i64,
    ) -> Result<Session, AppError> {
        let created_at = chrono::Utc::now().timestamp();

        let session = sqlx::query_as::<_, Session>(
            r#"
INSERT INTO sessions (user_id, token, expires_at, created_at)
VALUES (?, ?, ?, ?)
RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(token)
        .bind(expires_at)
        .bind(created_at)
        .fetch_one(pool)
        .await?;

        Ok(session)
    }

    /// Fetches regardless of expiry; the caller decides what an old session means.
    pub async fn get_by_token(
        pool: &Pool<Sqlite>,
        token: &str,
    ) -> Result<Option<Session>, AppError> {
        let session = sqlx::query_as::<_, Session>(
            "SELECT * FROM sessions WHERE token = ?"
        )
        .bind(token)
        .fetch_optional(pool)
        .await?;

        Ok(session)
    }

    /// Returns whether a row was removed.
    pub async fn delete(
        pool: &Pool<Sqlite>,
        token: &str,
    ) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
