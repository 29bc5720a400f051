use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    Json,
};
use uuid::Uuid;

use crate::auth::extract::CurrentUser;
use crate::models::feedback::{Feedback, NewFeedback};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

/// One rating per user per event, and only from users who hold a ticket.
pub async fn submit_feedback(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(event_id): Path<Uuid>,
    Json(payload): Json<NewFeedback>,
) -> Result<Response, AppError> {
    if !(1..=5).contains(&payload.rating) {
        return Err(AppError::ValidationError(
            "Rating must be between 1 and 5".to_string(),
        ));
    }

    let event = state
        .store
        .event_by_id(event_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

    let holds_ticket = state
        .store
        .tickets_by_user(user.id)
        .await?
        .iter()
        .any(|ticket| ticket.event_id == event.id && ticket.counts_against_capacity());
    if !holds_ticket {
        return Err(AppError::Forbidden(
            "You can only leave feedback for events you have a ticket to".to_string(),
        ));
    }

    let feedback = state
        .store
        .create_feedback(Feedback::new(event.id, user.id, payload.rating, payload.comment))
        .await?;
    Ok(created(feedback, "Feedback submitted").into_response())
}

pub async fn my_feedback(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Response, AppError> {
    let entries = state.store.feedback_by_user(user.id).await?;
    Ok(success(entries, "Feedback retrieved").into_response())
}

pub async fn event_feedback(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(event_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let event = state
        .store
        .event_by_id(event_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;
    if event.organizer_id != user.id && !user.is_admin() {
        return Err(AppError::Forbidden(
            "You do not manage this event".to_string(),
        ));
    }

    let entries = state.store.feedback_by_event(event.id).await?;
    Ok(success(entries, "Feedback retrieved").into_response())
}
