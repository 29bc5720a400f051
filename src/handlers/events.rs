use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use uuid::Uuid;

use crate::auth::extract::CurrentUser;
use crate::models::event::{ApprovalState, Event, EventQuery, EventUpdate, NewEvent};
use crate::models::user::{Role, User};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, empty_success, success};

fn can_view(event: &Event, user: &User) -> bool {
    event.approval_state == ApprovalState::Approved
        || event.organizer_id == user.id
        || user.is_admin()
}

fn can_manage(event: &Event, user: &User) -> bool {
    event.organizer_id == user.id || user.is_admin()
}

pub async fn list_events(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<EventQuery>,
) -> Result<Response, AppError> {
    let events = match user.role {
        Role::Admin => state.store.list_events(&query, None).await?,
        Role::Student => {
            state
                .store
                .list_events(&query, Some(ApprovalState::Approved))
                .await?
        }
        Role::Organizer => {
            let mut events = state.store.list_events(&query, None).await?;
            events.retain(|event| {
                event.approval_state == ApprovalState::Approved || event.organizer_id == user.id
            });
            events
        }
    };

    Ok(success(events, "Events retrieved").into_response())
}

pub async fn get_event(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(event_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let event = state
        .store
        .event_by_id(event_id)
        .await?
        .filter(|event| can_view(event, &user))
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

    Ok(success(event, "Event retrieved").into_response())
}

pub async fn create_event(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<NewEvent>,
) -> Result<Response, AppError> {
    if user.role != Role::Organizer {
        return Err(AppError::Forbidden(
            "Only organizers can create events".to_string(),
        ));
    }
    if payload.title.trim().is_empty() {
        return Err(AppError::ValidationError("Title is required".to_string()));
    }
    if payload.capacity < 1 {
        return Err(AppError::ValidationError(
            "Capacity must be at least 1".to_string(),
        ));
    }

    let event = state
        .store
        .create_event(Event::create(user.id, payload))
        .await?;
    tracing::info!(event = %event.id, organizer = %user.id, "event submitted for approval");
    Ok(created(event, "Event submitted for approval").into_response())
}

pub async fn organizer_events(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Response, AppError> {
    if user.role != Role::Organizer {
        return Err(AppError::Forbidden(
            "Only organizers can list their events".to_string(),
        ));
    }

    let events = state.store.events_by_organizer(user.id).await?;
    Ok(success(events, "Events retrieved").into_response())
}

pub async fn update_event(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(event_id): Path<Uuid>,
    Json(payload): Json<EventUpdate>,
) -> Result<Response, AppError> {
    let mut event = state
        .store
        .event_by_id(event_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;
    if !can_manage(&event, &user) {
        return Err(AppError::Forbidden(
            "You do not manage this event".to_string(),
        ));
    }
    if let Some(capacity) = payload.capacity {
        if capacity < 1 {
            return Err(AppError::ValidationError(
                "Capacity must be at least 1".to_string(),
            ));
        }
    }

    event.apply_update(&payload);
    let mut updated = state.store.update_event_details(&event).await?;
    if let Some(capacity) = payload.capacity {
        updated = state.store.resize_event_capacity(event_id, capacity).await?;
    }

    tracing::info!(event = %event_id, editor = %user.id, "event updated");
    Ok(success(updated, "Event updated").into_response())
}

pub async fn delete_event(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(event_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let event = state
        .store
        .event_by_id(event_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;
    if !can_manage(&event, &user) {
        return Err(AppError::Forbidden(
            "You do not manage this event".to_string(),
        ));
    }

    state.store.delete_event(event_id).await?;
    tracing::info!(event = %event_id, editor = %user.id, "event deleted");
    Ok(empty_success("Event deleted").into_response())
}

fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Attendee list as CSV, one row per non-cancelled ticket.
pub async fn export_attendees(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(event_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let event = state
        .store
        .event_by_id(event_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;
    if !can_manage(&event, &user) {
        return Err(AppError::Forbidden(
            "You do not manage this event".to_string(),
        ));
    }

    let tickets = state.store.tickets_by_event(event_id).await?;
    let mut csv = String::from("name,email,status,claimed_at,used_at\n");
    for ticket in tickets
        .iter()
        .filter(|ticket| ticket.counts_against_capacity())
    {
        let Some(holder) = state.store.user_by_id(ticket.user_id).await? else {
            continue;
        };
        let used_at = ticket
            .used_at
            .map(|at| at.to_rfc3339())
            .unwrap_or_default();
        csv.push_str(&format!(
            "{},{},{},{},{}\n",
            csv_field(&holder.name),
            csv_field(&holder.email),
            ticket.status,
            ticket.claimed_at.to_rfc3339(),
            used_at,
        ));
    }

    let headers = [
        (header::CONTENT_TYPE, "text/csv".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"attendees-{}.csv\"", event.id),
        ),
    ];
    Ok((headers, csv).into_response())
}
