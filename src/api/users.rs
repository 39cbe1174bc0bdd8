use axum::{extract::State, Json};

use crate::api::middleware::AuthUser;
use crate::api::state::AppState;
use crate::error::AppError;
use crate::rpc::proto::UserProfile;

/// GET /api/users/me (requires auth)
pub async fn me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<UserProfile>, AppError> {
    let profile = state.auth.get_user(user_id).await?;
    Ok(Json(profile))
}
