use crate::error::AppError;

pub const MIN_PASSWORD_LEN: usize = 8;

/// Validate and normalise a username: trimmed, lowercased, 3-32 chars of
/// alphanumerics, underscore or hyphen.
pub fn normalize_username(username: &str) -> Result<String, AppError> {
    let trimmed = username.trim();

    if trimmed.len() < 3 || trimmed.len() > 32 {
        return Err(AppError::Validation("Username must be 3-32 characters".to_string()));
    }

    if !trimmed.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        return Err(AppError::Validation(
            "Username must be alphanumeric, underscore, or hyphen".to_string(),
        ));
    }

    Ok(trimmed.to_lowercase())
}

pub fn validate_email(email: &str) -> Result<String, AppError> {
    let trimmed = email.trim();

    match trimmed.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {
            Ok(trimmed.to_string())
        }
        _ => Err(AppError::Validation("Email address is malformed".to_string())),
    }
}

pub fn validate_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_rules() {
        assert_eq!(normalize_username("  Alice_01 ").unwrap(), "alice_01");
        assert!(normalize_username("ab").is_err());
        assert!(normalize_username(&"a".repeat(33)).is_err());
        assert!(normalize_username("bad name").is_err());
        assert!(normalize_username("drop;table").is_err());
    }

    #[test]
    fn test_email_rules() {
        assert_eq!(validate_email(" a@x.com ").unwrap(), "a@x.com");
        assert!(validate_email("ax.com").is_err());
        assert!(validate_email("@x.com").is_err());
        assert!(validate_email("a@").is_err());
        assert!(validate_email("a@b@c").is_err());
    }

    #[test]
    fn test_password_rules() {
        assert!(validate_password("pw123456").is_ok());
        assert!(validate_password("short").is_err());
    }
}
