use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::extract::AdminUser;
use crate::models::audit::{AuditAction, AuditLog};
use crate::models::event::ApprovalState;
use crate::models::user::UserStatus;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;

pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> Result<Response, AppError> {
    let users = state.store.list_users().await?;
    Ok(success(users, "Users retrieved").into_response())
}

#[derive(Deserialize)]
pub struct ManageUserPayload {
    pub email: String,
    pub status: UserStatus,
}

/// Moves an account between pending, active and suspended. Every change is
/// written to the audit log.
pub async fn manage_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(payload): Json<ManageUserPayload>,
) -> Result<Response, AppError> {
    let target = state
        .store
        .user_by_email(&payload.email)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let user = state.store.set_user_status(target.id, payload.status).await?;

    let action = match payload.status {
        UserStatus::Active => AuditAction::ApproveUser,
        UserStatus::Suspended => AuditAction::SuspendUser,
        UserStatus::Pending => AuditAction::PendingUser,
    };
    state
        .store
        .record_audit(AuditLog::new(admin.id, action).on_user(user.id))
        .await?;

    tracing::info!(admin = %admin.id, user = %user.id, status = ?payload.status, "user status changed");
    Ok(success(user, "User updated").into_response())
}

pub async fn approve_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(user_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let user = state
        .store
        .set_user_status(user_id, UserStatus::Active)
        .await?;
    state
        .store
        .record_audit(AuditLog::new(admin.id, AuditAction::ApproveUser).on_user(user.id))
        .await?;

    tracing::info!(admin = %admin.id, user = %user.id, "user approved");
    Ok(success(user, "User approved").into_response())
}

#[derive(Deserialize)]
pub struct ManageEventPayload {
    pub status: ApprovalState,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Admin moderation of a submitted event. Only approved and rejected are
/// valid decisions here.
pub async fn manage_event(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(event_id): Path<Uuid>,
    Json(payload): Json<ManageEventPayload>,
) -> Result<Response, AppError> {
    let (action, message) = match payload.status {
        ApprovalState::Approved => (AuditAction::ApproveEvent, "Event approved"),
        ApprovalState::Rejected => (AuditAction::RejectEvent, "Event rejected"),
        ApprovalState::Pending => {
            return Err(AppError::ValidationError("Invalid status".to_string()));
        }
    };

    let event = state
        .store
        .set_event_approval(event_id, payload.status, admin.id)
        .await?;
    state
        .store
        .record_audit(
            AuditLog::new(admin.id, action)
                .on_event(event.id)
                .with_notes(payload.notes),
        )
        .await?;

    tracing::info!(admin = %admin.id, event = %event.id, decision = ?payload.status, "event moderated");
    Ok(success(event, message).into_response())
}

pub async fn list_audit(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> Result<Response, AppError> {
    let entries = state.store.list_audit().await?;
    Ok(success(entries, "Audit log retrieved").into_response())
}
