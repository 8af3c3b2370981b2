//! User listing and removal.

use axum::{extract::State, Json};
use std::sync::Arc;

use super::error::ApiError;
use super::extract::ApiPath;
use crate::db::{MessageResponse, UserResponse};
use crate::AppState;

/// List every account (credentials are never included)
pub async fn list_users(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = sqlx::query_as::<_, UserResponse>(
        "SELECT user_id, first_name, last_name, email, role FROM users ORDER BY user_id",
    )
    .fetch_all(&state.db)
    .await?;

    Ok(Json(users))
}

pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    ApiPath(user_id): ApiPath<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    let result = sqlx::query("DELETE FROM users WHERE user_id = ?")
        .bind(user_id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("User not found"));
    }

    tracing::info!(user_id, "User deleted");
    Ok(Json(MessageResponse::new("User deleted")))
}
