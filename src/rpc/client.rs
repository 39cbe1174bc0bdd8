use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

use crate::auth::Authenticator;
use crate::error::AppError;
use crate::rpc::proto::{
    LoginRequest, LogoutResponse, RegisterRequest, TokenRequest, TokenResponse, UserProfile,
    UserRequest, UserResponse, ValidateTokenResponse,
};
use crate::rpc::{GET_USER_PATH, LOGIN_PATH, LOGOUT_PATH, REGISTER_PATH, VALIDATE_TOKEN_PATH};

/// Caller's view of the authentication service.
#[async_trait]
pub trait AuthClient: Send + Sync {
    async fn register(&self, username: &str, email: &str, password: &str)
        -> Result<String, AppError>;

    async fn login(&self, username: &str, password: &str) -> Result<String, AppError>;

    async fn validate_token(&self, token: &str) -> Result<i64, AppError>;

    async fn logout(&self, token: &str) -> Result<(), AppError>;

    async fn get_user(&self, user_id: i64) -> Result<UserProfile, AppError>;
}

/// Talks to a remote auth service over HTTP+JSON.
///
/// Network, timeout and decode failures are `Transport`; a well-formed
/// failure response becomes `Unauthorized` with the remote error text.
#[derive(Clone)]
pub struct HttpAuthClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpAuthClient {
    /// `timeout` bounds each call end to end. `None` waits indefinitely.
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, AppError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: builder.build()?,
        })
    }

    async fn call<Req, Resp>(&self, path: &str, request: &Req) -> Result<Resp, AppError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        // Failures come back as 500 with a decodable body, so the status is not checked here.
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(request)
            .send()
            .await?;

        Ok(response.json::<Resp>().await?)
    }
}

#[async_trait]
impl AuthClient for HttpAuthClient {
    async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<String, AppError> {
        let request = RegisterRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };

        let response: TokenResponse = self.call(REGISTER_PATH, &request).await?;
        if !response.success {
            return Err(AppError::Unauthorized(response.error));
        }
        Ok(response.token)
    }

    async fn login(&self, username: &str, password: &str) -> Result<String, AppError> {
        let request = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };

        let response: TokenResponse = self.call(LOGIN_PATH, &request).await?;
        if !response.success {
            return Err(AppError::Unauthorized(response.error));
        }
        Ok(response.token)
    }

    async fn validate_token(&self, token: &str) -> Result<i64, AppError> {
        let request = TokenRequest { token: token.to_string() };

        let response: ValidateTokenResponse = self.call(VALIDATE_TOKEN_PATH, &request).await?;
        if !response.valid {
            return Err(AppError::Unauthorized(response.error));
        }
        Ok(response.user_id)
    }

    async fn logout(&self, token: &str) -> Result<(), AppError> {
        let request = TokenRequest { token: token.to_string() };

        let response: LogoutResponse = self.call(LOGOUT_PATH, &request).await?;
        if !response.success {
            return Err(AppError::Unauthorized(response.error));
        }
        Ok(())
    }

    async fn get_user(&self, user_id: i64) -> Result<UserProfile, AppError> {
        let request = UserRequest { user_id };

        let response: UserResponse = self.call(GET_USER_PATH, &request).await?;
        if !response.success {
            return Err(AppError::Unauthorized(response.error));
        }
        response
            .user
            .ok_or_else(|| AppError::Transport("user missing from response".to_string()))
    }
}

/// In-process client for single-binary deployments and tests.
#[derive(Clone)]
pub struct LocalAuthClient {
    authenticator: Authenticator,
}

impl LocalAuthClient {
    pub fn new(authenticator: Authenticator) -> Self {
        Self { authenticator }
    }
}

#[async_trait]
impl AuthClient for LocalAuthClient {
    async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<String, AppError> {
        self.authenticator.register(username, email, password).await
    }

    async fn login(&self, username: &str, password: &str) -> Result<String, AppError> {
        self.authenticator.login(username, password).await
    }

    async fn validate_token(&self, token: &str) -> Result<i64, AppError> {
        self.authenticator.validate_token(token).await
    }

    async fn logout(&self, token: &str) -> Result<(), AppError> {
        self.authenticator.logout(token).await
    }

    async fn get_user(&self, user_id: i64) -> Result<UserProfile, AppError> {
        self.authenticator.get_user(user_id).await.map(UserProfile::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_backend_is_transport_error() {
        // Port 9 (discard) on loopback is closed in any sane test environment.
        let client =
            HttpAuthClient::new("http://127.0.0.1:9/", Some(Duration::from_secs(2))).unwrap();

        let err = client.validate_token("anything").await.unwrap_err();
        assert!(matches!(err, AppError::Transport(_)));
    }

    #[test]
    fn test_base_url_is_normalised() {
        let client = HttpAuthClient::new("http://auth.local:50051///", None).unwrap();
        assert_eq!(client.base_url, "http://auth.local:50051");
    }
}
