//! User Handlers

use axum::{
    extract::{Extension, Query, State},
    Json,
};

use crate::application::dto::request::UsersQuery;
use crate::application::dto::response::UserListResponse;
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::startup::AppState;

/// User directory, excluding the caller
pub async fn list_users(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<UsersQuery>,
) -> Result<Json<UserListResponse>, AppError> {
    let directory = state.users.list_users(auth.user_id, query.into()).await?;

    Ok(Json(directory.into()))
}
