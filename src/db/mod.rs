pub mod models;
pub mod users;
pub mod sessions;
pub mod messages;
pub mod participants;
pub mod store;

use std::time::Duration;

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite};

use crate::config::Config;
use crate::error::AppError;

pub use models::{User, Session, Message};
pub use users::UserRepository;
pub use sessions::SessionRepository;
pub use messages::MessageRepository;
pub use participants::ParticipantRepository;
pub use store::{ChatRepository, CredentialStore, SqliteStore};

/// Open the configured pool and bring the schema up to date.
pub async fn connect(config: &Config) -> Result<Pool<Sqlite>, AppError> {
    let pool = SqlitePoolOptions::new()
        .max_connections(config.db_max_connections)
        .min_connections(config.db_min_connections)
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(&config.database_url)
        .await?;

    migrate(&pool).await?;
    Ok(pool)
}

/// Single-connection in-memory database. Each call is a fresh, empty schema.
pub async fn connect_in_memory() -> Result<Pool<Sqlite>, AppError> {
    // Every connection to :memory: is its own database, so pin the pool to one
    // connection and never recycle it.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;

    migrate(&pool).await?;
    Ok(pool)
}

pub async fn migrate(pool: &Pool<Sqlite>) -> Result<(), AppError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
