use std::time::Duration;

use crate::error::AppError;

#[derive(Clone, Debug)]
pub struct Config {
    pub auth_host: String,
    pub auth_port: u16,
    pub forum_host: String,
    pub forum_port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub session_expiry_hours: i64,
    pub request_timeout_secs: u64,
    pub auth_service_url: String,
    /// No timeout when unset: a hung auth backend stalls every gated request.
    pub auth_rpc_timeout_secs: Option<u64>,
    pub ws_send_timeout_secs: u64,
    pub message_retention_hours: Option<i64>,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Config {
            auth_host: var_or("AUTH_HOST", "127.0.0.1"),
            auth_port: parse_var("AUTH_PORT", "50051")?,
            forum_host: var_or("FORUM_HOST", "127.0.0.1"),
            forum_port: parse_var("FORUM_PORT", "8080")?,
            database_url: var_or("DATABASE_URL", "sqlite://forum_auth_chat.db?mode=rwc"),
            db_max_connections: parse_var("DB_MAX_CONNECTIONS", "20")?,
            db_min_connections: parse_var("DB_MIN_CONNECTIONS", "1")?,
            session_expiry_hours: parse_var("SESSION_EXPIRY_HOURS", "24")?,
            request_timeout_secs: parse_var("REQUEST_TIMEOUT_SECS", "30")?,
            auth_service_url: var_or("AUTH_SERVICE_URL", "http://127.0.0.1:50051"),
            auth_rpc_timeout_secs: parse_optional_var("AUTH_RPC_TIMEOUT_SECS")?,
            ws_send_timeout_secs: parse_var("WS_SEND_TIMEOUT_SECS", "10")?,
            message_retention_hours: parse_optional_var("MESSAGE_RETENTION_HOURS")?,
        })
    }

    pub fn auth_address(&self) -> String {
        format!("{}:{}", self.auth_host, self.auth_port)
    }

    pub fn forum_address(&self) -> String {
        format!("{}:{}", self.forum_host, self.forum_port)
    }

    pub fn auth_rpc_timeout(&self) -> Option<Duration> {
        self.auth_rpc_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

fn var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_var<T>(key: &str, default: &str) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    var_or(key, default)
        .parse()
        .map_err(|e| AppError::Config(format!("Invalid {}: {}", key, e)))
}

fn parse_optional_var<T>(key: &str) -> Result<Option<T>, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| AppError::Config(format!("Invalid {}: {}", key, e))),
        _ => Ok(None),
    }
}
