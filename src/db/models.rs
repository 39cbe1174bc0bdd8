use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Clone, FromRow, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: i64,
    pub updated_at: i64,
}

// Hand-written so the hash never reaches a log line.
impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub id: i64,
    pub user_id: i64,
    pub token: String,
    pub expires_at: i64,
    pub created_at: i64,
}

impl Session {
    /// A session is valid iff `now` is strictly before its expiry.
    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub user_id: i64,
    pub content: String,
    pub created_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_boundary() {
        let session = Session {
            id: 1,
            user_id: 1,
            token: "t".into(),
            expires_at: 100,
            created_at: 0,
        };

        assert!(!session.is_expired_at(99));
        assert!(session.is_expired_at(100));
        assert!(session.is_expired_at(101));
    }

    #[test]
    fn test_user_debug_redacts_hash() {
        let user = User {
            id: 7,
            username: "alice".into(),
            email: "a@x.com".into(),
            password_hash: "$argon2id$secret".into(),
            created_at: 0,
            updated_at: 0,
        };

        let rendered = format!("{:?}", user);
        assert!(!rendered.contains("secret"));

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
    }
}
