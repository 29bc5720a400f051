use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use crate::auth::jwt::{decode_token, TokenKind};
use crate::models::user::{User, UserStatus};
use crate::state::AppState;
use crate::utils::error::AppError;

/// Extracts the authenticated account from the `Authorization: Bearer`
/// header. Rejects refresh tokens and accounts that are not active.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::AuthError("Missing authorization header".to_string()))?;
        let token = header_value
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::AuthError("Invalid authorization header".to_string()))?;

        let claims = decode_token(&state.jwt_secret, token)
            .map_err(|_| AppError::AuthError("Invalid or expired token".to_string()))?;
        if claims.kind != TokenKind::Access {
            return Err(AppError::AuthError("Access token required".to_string()));
        }

        let user = state
            .store
            .user_by_id(claims.sub)
            .await?
            .ok_or_else(|| AppError::AuthError("Invalid or expired token".to_string()))?;
        if user.status != UserStatus::Active {
            return Err(AppError::AuthError(
                "Account not active. Please wait for admin approval.".to_string(),
            ));
        }

        Ok(CurrentUser(user))
    }
}

/// Admin-only variant of [`CurrentUser`].
pub struct AdminUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(AppError::Forbidden("Admin access required".to_string()));
        }
        Ok(AdminUser(user))
    }
}
