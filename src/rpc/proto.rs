use serde::{Deserialize, Serialize};

use crate::db::User;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRequest {
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRequest {
    pub user_id: i64,
}

/// Public profile of a user. Never carries the password hash.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub created_at: i64,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            created_at: user.created_at,
        }
    }
}

/// Response to Register and Login.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenResponse {
    pub success: bool,
    pub token: String,
    pub error: String,
}

impl TokenResponse {
    pub fn ok(token: String) -> Self {
        Self { success: true, token, error: String::new() }
    }

    pub fn failure(error: impl ToString) -> Self {
        Self { success: false, token: String::new(), error: error.to_string() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidateTokenResponse {
    pub valid: bool,
    pub user_id: i64,
    pub error: String,
}

impl ValidateTokenResponse {
    pub fn ok(user_id: i64) -> Self {
        Self { valid: true, user_id, error: String::new() }
    }

    pub fn failure(error: impl ToString) -> Self {
        Self { valid: false, user_id: 0, error: error.to_string() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogoutResponse {
    pub success: bool,
    pub error: String,
}

impl LogoutResponse {
    pub fn ok() -> Self {
        Self { success: true, error: String::new() }
    }

    pub fn failure(error: impl ToString) -> Self {
        Self { success: false, error: error.to_string() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserResponse {
    pub success: bool,
    pub user: Option<UserProfile>,
    pub error: String,
}

impl UserResponse {
    pub fn ok(user: UserProfile) -> Self {
        Self { success: true, user: Some(user), error: String::new() }
    }

    pub fn failure(error: impl ToString) -> Self {
        Self { success: false, user: None, error: error.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_default() {
        let resp: ValidateTokenResponse = serde_json::from_str(r#"{"valid":false}"#).unwrap();
        assert_eq!(resp, ValidateTokenResponse { valid: false, user_id: 0, error: String::new() });
    }

    #[test]
    fn test_profile_drops_password_hash() {
        let user = User {
            id: 4,
            username: "alice".into(),
            email: "a@x.com".into(),
            password_hash: "$argon2id$secret".into(),
            created_at: 10,
            updated_at: 10,
        };

        let json = serde_json::to_string(&UserResponse::ok(user.into())).unwrap();
        assert!(!json.contains("argon2id"));
        assert!(json.contains(r#""username":"alice""#));
    }

    #[test]
    fn test_failure_has_empty_payload() {
        let resp = TokenResponse::failure("Invalid credentials");
        assert!(!resp.success);
        assert!(resp.token.is_empty());
        assert_eq!(resp.error, "Invalid credentials");
    }
}
