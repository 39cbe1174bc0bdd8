use sqlx::{Pool, Sqlite};
use crate::db::models::User;
use crate::error::AppError;

pub struct UserRepository;

impl UserRepository {
    /// Insert a user. A taken username surfaces as `AppError::Validation`.
    pub async fn create(
        pool: &Pool<Sqlite>,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, AppError> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query_as::<_, User>(
            r#"
INSERT INTO users (username, email, password_hash, created_at, updated_at)
VALUES (?, ?, ?, ?, ?)
RETURNING *
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await;

        match result {
            Ok(user) => Ok(user),
            Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
                Err(AppError::Validation("Username already exists".to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn get_by_username(
        pool: &Pool<Sqlite>,
        username: &str,
    ) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE username = ?"
        )
        .bind(username)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    pub async fn get_by_id(
        pool: &Pool<Sqlite>,
        id: i64,
    ) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE id = ?"
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }
}
