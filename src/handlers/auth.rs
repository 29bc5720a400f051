use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::auth::jwt::{decode_token, issue_token, TokenKind};
use crate::auth::password::{hash_password, verify_password};
use crate::models::user::{Role, User, UserStatus};
use crate::state::AppState;
use crate::utils::error::AppError;

#[derive(Deserialize)]
pub struct SignupPayload {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<Role>,
}

pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupPayload>,
) -> Result<Response, AppError> {
    let name = payload.name.trim().to_string();
    let email = payload.email.trim().to_lowercase();
    if name.is_empty() || email.is_empty() || payload.password.is_empty() {
        return Err(AppError::ValidationError(
            "Name, email and password are required".to_string(),
        ));
    }
    if !email.contains('@') {
        return Err(AppError::ValidationError(
            "A valid email address is required".to_string(),
        ));
    }

    let role = payload.role.unwrap_or(Role::Student);
    if role == Role::Admin {
        return Err(AppError::ValidationError(
            "Admin accounts cannot be self-registered".to_string(),
        ));
    }

    let password_hash = hash_password(&payload.password)
        .map_err(|_| AppError::InternalServerError("Failed to hash password".to_string()))?;
    let user = state
        .store
        .create_user(User::new(name, email, password_hash, role))
        .await?;

    tracing::info!(user = %user.id, role = ?user.role, status = ?user.status, "account created");
    Ok((StatusCode::CREATED, Json(user)).into_response())
}

#[derive(Deserialize)]
pub struct LoginPayload {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

fn login_rejection(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<Response, AppError> {
    let (Some(email), Some(password)) = (payload.email, payload.password) else {
        return Ok(login_rejection("Email and password are required"));
    };
    if email.is_empty() || password.is_empty() {
        return Ok(login_rejection("Email and password are required"));
    }

    let Some(user) = state.store.user_by_email(&email.to_lowercase()).await? else {
        return Ok(login_rejection("Invalid Credentials"));
    };
    if !verify_password(&password, &user.password_hash) {
        return Ok(login_rejection("Invalid Credentials"));
    }
    if user.status != UserStatus::Active {
        return Ok(login_rejection(
            "Account not active. Please wait for admin approval.",
        ));
    }

    let access = issue_token(&state.jwt_secret, user.id, user.role, TokenKind::Access)
        .map_err(|_| AppError::InternalServerError("Failed to issue token".to_string()))?;
    let refresh = issue_token(&state.jwt_secret, user.id, user.role, TokenKind::Refresh)
        .map_err(|_| AppError::InternalServerError("Failed to issue token".to_string()))?;

    tracing::debug!(user = %user.id, "login succeeded");
    Ok(Json(json!({
        "access": access,
        "refresh": refresh,
        "user": {
            "id": user.id,
            "email": user.email,
            "name": user.name,
            "role": user.role,
            "status": user.status,
        },
    }))
    .into_response())
}

#[derive(Deserialize)]
pub struct RefreshPayload {
    pub refresh: String,
}

pub async fn refresh_token(
    State(state): State<AppState>,
    Json(payload): Json<RefreshPayload>,
) -> Result<Response, AppError> {
    let claims = decode_token(&state.jwt_secret, &payload.refresh)
        .map_err(|_| AppError::AuthError("Invalid or expired refresh token".to_string()))?;
    if claims.kind != TokenKind::Refresh {
        return Err(AppError::AuthError(
            "Invalid or expired refresh token".to_string(),
        ));
    }

    let user = state
        .store
        .user_by_id(claims.sub)
        .await?
        .ok_or_else(|| AppError::AuthError("Invalid or expired refresh token".to_string()))?;
    if user.status != UserStatus::Active {
        return Err(AppError::AuthError(
            "Account not active. Please wait for admin approval.".to_string(),
        ));
    }

    let access = issue_token(&state.jwt_secret, user.id, user.role, TokenKind::Access)
        .map_err(|_| AppError::InternalServerError("Failed to issue token".to_string()))?;
    Ok(Json(json!({ "access": access })).into_response())
}
