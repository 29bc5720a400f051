use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};

use crate::auth::extract::{AdminUser, CurrentUser};
use crate::models::user::Role;
use crate::state::AppState;
use crate::utils::error::AppError;

pub async fn global_analytics(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> Result<Response, AppError> {
    let stats = state.store.global_stats().await?;
    Ok(Json(stats).into_response())
}

/// Per-event sales and a claims-per-day timeline. Organizers see their own
/// events; admins see everything.
pub async fn organizer_analytics(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Response, AppError> {
    let scope = match user.role {
        Role::Organizer => Some(user.id),
        Role::Admin => None,
        Role::Student => {
            return Err(AppError::Forbidden("Organizer access required".to_string()));
        }
    };

    let stats = state.store.organizer_stats(scope).await?;
    Ok(Json(stats).into_response())
}
