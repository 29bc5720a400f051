use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::extract::CurrentUser;
use crate::models::ticket::CheckInOutcome;
use crate::state::AppState;
use crate::ticketing::token;
use crate::utils::error::AppError;
use crate::utils::response::success;

fn claim_rejection(status: StatusCode, detail: &str) -> Response {
    (status, Json(json!({ "detail": detail }))).into_response()
}

fn checkin_rejection(status: StatusCode, error: &str) -> Response {
    (status, Json(json!({ "error": error }))).into_response()
}

/// Claims one ticket for the calling user. At most one non-cancelled ticket
/// per user per event; the last units are handed out first come first served.
pub async fn claim_ticket(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<Value>,
) -> Result<Response, AppError> {
    let event_value = payload
        .get("event")
        .and_then(Value::as_str)
        .unwrap_or_default();
    if event_value.is_empty() {
        return Ok(claim_rejection(
            StatusCode::BAD_REQUEST,
            "Event id is required",
        ));
    }
    let Ok(event_id) = Uuid::parse_str(event_value) else {
        return Ok(claim_rejection(StatusCode::NOT_FOUND, "Event not found"));
    };

    match state.store.claim_ticket(event_id, user.id).await {
        Ok(ticket) => Ok((StatusCode::CREATED, Json(ticket)).into_response()),
        Err(AppError::NotFound(detail)) => {
            Ok(claim_rejection(StatusCode::NOT_FOUND, &detail))
        }
        Err(
            AppError::ValidationError(detail)
            | AppError::DuplicateClaim(detail)
            | AppError::CapacityExhausted(detail),
        ) => Ok(claim_rejection(StatusCode::BAD_REQUEST, &detail)),
        Err(other) => Err(other),
    }
}

pub async fn my_tickets(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Response, AppError> {
    let tickets = state.store.tickets_by_user(user.id).await?;
    Ok(success(tickets, "Tickets retrieved").into_response())
}

/// Releases a ticket back to the event's pool. Only active tickets can be
/// cancelled; a used or already-cancelled ticket is a conflict.
pub async fn cancel_ticket(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(ticket_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let ticket = state
        .store
        .ticket_by_id(ticket_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Ticket not found".to_string()))?;
    if ticket.user_id != user.id && !user.is_admin() {
        return Err(AppError::Forbidden(
            "You do not own this ticket".to_string(),
        ));
    }

    let cancelled = state.store.cancel_ticket(ticket_id).await?;
    Ok(success(cancelled, "Ticket cancelled").into_response())
}

/// Gate scan. The QR payload is decoded first, so a malformed code is a 400
/// while a well-formed code that matches no ticket is a 404. Re-scanning a
/// used ticket reports already-used without touching `used_at`.
pub async fn check_in(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<Value>,
) -> Result<Response, AppError> {
    let qr_code = payload
        .get("qr_code")
        .and_then(Value::as_str)
        .unwrap_or_default();
    if qr_code.is_empty() {
        return Ok(checkin_rejection(
            StatusCode::BAD_REQUEST,
            "QR code is required",
        ));
    }

    let Ok(token) = token::decode(qr_code) else {
        return Ok(checkin_rejection(
            StatusCode::BAD_REQUEST,
            "Invalid QR code format",
        ));
    };

    let Some(ticket) = state.store.ticket_by_id(token.ticket_id).await? else {
        return Ok(checkin_rejection(StatusCode::NOT_FOUND, "Invalid QR code"));
    };
    if ticket.event_id != token.event_id || ticket.user_id != token.user_id {
        tracing::warn!(
            ticket = %ticket.id,
            "check-in token does not match the stored ticket"
        );
        return Ok(checkin_rejection(StatusCode::NOT_FOUND, "Invalid QR code"));
    }

    let event = state
        .store
        .event_by_id(ticket.event_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;
    if !user.is_admin() && event.organizer_id != user.id {
        return Ok(checkin_rejection(
            StatusCode::FORBIDDEN,
            "You are not authorized to check in tickets for this event",
        ));
    }

    match state.store.check_in_ticket(ticket.id).await {
        Ok((ticket, CheckInOutcome::CheckedIn)) => {
            let holder = state
                .store
                .user_by_id(ticket.user_id)
                .await?
                .map(|holder| holder.name)
                .unwrap_or_default();
            tracing::info!(ticket = %ticket.id, event = %event.id, "ticket checked in");
            Ok(Json(json!({
                "message": "Check-in successful",
                "user": holder,
                "event": event.title,
                "checked_in_at": ticket.used_at,
            }))
            .into_response())
        }
        Ok((_, CheckInOutcome::AlreadyUsed)) => Ok(Json(json!({
            "message": "This ticket has already been used"
        }))
        .into_response()),
        Err(AppError::InvalidTransition(message)) => Ok(checkin_rejection(
            StatusCode::CONFLICT,
            &message,
        )),
        Err(AppError::NotFound(_)) => {
            Ok(checkin_rejection(StatusCode::NOT_FOUND, "Invalid QR code"))
        }
        Err(other) => Err(other),
    }
}
