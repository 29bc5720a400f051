use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::audit::AuditLog;
use crate::models::event::{ApprovalState, Event, EventQuery};
use crate::models::feedback::Feedback;
use crate::models::ticket::{CheckInOutcome, InvalidTransition, Ticket, TicketStatus};
use crate::models::user::{User, UserStatus};
use crate::store::{
    AnalyticsStore, AuditStore, EventStat, EventStore, FeedbackStore, GlobalStats, OrganizerStats,
    StoreResult, TicketStore, TimelinePoint, UserStore,
};
use crate::ticketing::ledger::CapacityTooSmall;
use crate::utils::error::AppError;

/// Postgres backend. The compound ticket operations run inside a
/// transaction that locks the event row (`SELECT ... FOR UPDATE`), which
/// serializes claims and cancellations per event while leaving other events
/// free to proceed.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_unique_violation(err: sqlx::Error, constraint: &str, message: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.constraint() == Some(constraint) => {
            AppError::ValidationError(message.to_string())
        }
        _ => AppError::from(err),
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, user: User) -> StoreResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, name, email, password_hash, role, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role)
        .bind(user.status)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            map_unique_violation(e, "users_email_key", "An account with this email already exists")
        })
    }

    async fn user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at")
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn set_user_status(&self, id: Uuid, status: UserStatus) -> StoreResult<User> {
        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET status = $2, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?;
        user.ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }
}

#[async_trait]
impl EventStore for PgStore {
    async fn create_event(&self, event: Event) -> StoreResult<Event> {
        let event = sqlx::query_as::<_, Event>(
            r#"
            INSERT INTO events (
                id, organizer_id, title, description, location, category, organization,
                date, start_time, end_time, capacity_total, capacity_remaining,
                approval_state, approved_by, approved_at, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            RETURNING *
            "#,
        )
        .bind(event.id)
        .bind(event.organizer_id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.location)
        .bind(&event.category)
        .bind(&event.organization)
        .bind(event.date)
        .bind(event.start_time)
        .bind(event.end_time)
        .bind(event.capacity_total)
        .bind(event.capacity_remaining)
        .bind(event.approval_state)
        .bind(event.approved_by)
        .bind(event.approved_at)
        .bind(event.created_at)
        .bind(event.updated_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(event)
    }

    async fn event_by_id(&self, id: Uuid) -> StoreResult<Option<Event>> {
        let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(event)
    }

    async fn list_events(
        &self,
        query: &EventQuery,
        approval: Option<ApprovalState>,
    ) -> StoreResult<Vec<Event>> {
        let mut qb = sqlx::QueryBuilder::new("SELECT * FROM events WHERE 1=1");
        if let Some(state) = approval {
            qb.push(" AND approval_state = ").push_bind(state);
        }
        if let Some(category) = &query.category {
            qb.push(" AND LOWER(category) = LOWER(")
                .push_bind(category)
                .push(")");
        }
        if let Some(organization) = &query.organization {
            qb.push(" AND LOWER(organization) = LOWER(")
                .push_bind(organization)
                .push(")");
        }
        if let Some(date) = query.date {
            qb.push(" AND date = ").push_bind(date);
        }
        qb.push(" ORDER BY date DESC, start_time");

        let events = qb.build_query_as::<Event>().fetch_all(&self.pool).await?;
        Ok(events)
    }

    async fn events_by_organizer(&self, organizer_id: Uuid) -> StoreResult<Vec<Event>> {
        let events = sqlx::query_as::<_, Event>(
            "SELECT * FROM events WHERE organizer_id = $1 ORDER BY date DESC, start_time",
        )
        .bind(organizer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }

    async fn update_event_details(&self, event: &Event) -> StoreResult<Event> {
        let updated = sqlx::query_as::<_, Event>(
            r#"
            UPDATE events
            SET title = $2, description = $3, location = $4, category = $5,
                organization = $6, date = $7, start_time = $8, end_time = $9,
                updated_at = $10
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(event.id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.location)
        .bind(&event.category)
        .bind(&event.organization)
        .bind(event.date)
        .bind(event.start_time)
        .bind(event.end_time)
        .bind(event.updated_at)
        .fetch_optional(&self.pool)
        .await?;
        updated.ok_or_else(|| AppError::NotFound("Event not found".to_string()))
    }

    async fn resize_event_capacity(&self, event_id: Uuid, new_total: i32) -> StoreResult<Event> {
        let mut tx = self.pool.begin().await?;

        let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1 FOR UPDATE")
            .bind(event_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

        let sold = event.capacity_total - event.capacity_remaining;
        if new_total < sold {
            return Err(CapacityTooSmall {
                requested: new_total,
                sold,
            }
            .into());
        }

        let updated = sqlx::query_as::<_, Event>(
            r#"
            UPDATE events
            SET capacity_total = $2, capacity_remaining = $3, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(event_id)
        .bind(new_total)
        .bind(new_total - sold)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn set_event_approval(
        &self,
        event_id: Uuid,
        state: ApprovalState,
        admin_id: Uuid,
    ) -> StoreResult<Event> {
        let event = match state {
            ApprovalState::Approved => {
                sqlx::query_as::<_, Event>(
                    r#"
                    UPDATE events
                    SET approval_state = $2, approved_by = $3, approved_at = now(),
                        updated_at = now()
                    WHERE id = $1
                    RETURNING *
                    "#,
                )
                .bind(event_id)
                .bind(state)
                .bind(admin_id)
                .fetch_optional(&self.pool)
                .await?
            }
            _ => {
                sqlx::query_as::<_, Event>(
                    r#"
                    UPDATE events
                    SET approval_state = $2, updated_at = now()
                    WHERE id = $1
                    RETURNING *
                    "#,
                )
                .bind(event_id)
                .bind(state)
                .fetch_optional(&self.pool)
                .await?
            }
        };
        event.ok_or_else(|| AppError::NotFound("Event not found".to_string()))
    }

    async fn delete_event(&self, event_id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(event_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Event not found".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl TicketStore for PgStore {
    async fn claim_ticket(&self, event_id: Uuid, user_id: Uuid) -> StoreResult<Ticket> {
        let mut tx = self.pool.begin().await?;

        // Row lock: claims and cancellations for this event queue up here.
        let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1 FOR UPDATE")
            .bind(event_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

        if !event.is_claimable() {
            return Err(AppError::ValidationError(
                "This event is not open for ticket claims".to_string(),
            ));
        }

        let existing: Option<(Uuid,)> = sqlx::query_as(
            "SELECT id FROM tickets WHERE event_id = $1 AND user_id = $2 AND status <> 'cancelled'",
        )
        .bind(event_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;
        if existing.is_some() {
            return Err(AppError::DuplicateClaim(
                "You have already claimed a ticket for this event".to_string(),
            ));
        }

        let reserved = sqlx::query(
            r#"
            UPDATE events
            SET capacity_remaining = capacity_remaining - 1, updated_at = now()
            WHERE id = $1 AND capacity_remaining > 0
            "#,
        )
        .bind(event_id)
        .execute(&mut *tx)
        .await?;
        if reserved.rows_affected() == 0 {
            return Err(AppError::CapacityExhausted(
                "This event is fully booked".to_string(),
            ));
        }

        let ticket = Ticket::issue(event_id, user_id, Utc::now());
        sqlx::query(
            r#"
            INSERT INTO tickets (id, event_id, user_id, status, check_in_token, claimed_at, used_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(ticket.id)
        .bind(ticket.event_id)
        .bind(ticket.user_id)
        .bind(ticket.status)
        .bind(&ticket.check_in_token)
        .bind(ticket.claimed_at)
        .bind(ticket.used_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::debug!(ticket = %ticket.id, event = %event_id, user = %user_id, "ticket claimed");
        Ok(ticket)
    }

    async fn cancel_ticket(&self, ticket_id: Uuid) -> StoreResult<Ticket> {
        let mut tx = self.pool.begin().await?;

        let found: Option<(Uuid,)> = sqlx::query_as("SELECT event_id FROM tickets WHERE id = $1")
            .bind(ticket_id)
            .fetch_optional(&mut *tx)
            .await?;
        let (event_id,) =
            found.ok_or_else(|| AppError::NotFound("Ticket not found".to_string()))?;

        // Same lock order as claim: event row first, then the ticket.
        let _: (Uuid,) = sqlx::query_as("SELECT id FROM events WHERE id = $1 FOR UPDATE")
            .bind(event_id)
            .fetch_one(&mut *tx)
            .await?;

        let cancelled = sqlx::query_as::<_, Ticket>(
            "UPDATE tickets SET status = 'cancelled' WHERE id = $1 AND status = 'active' RETURNING *",
        )
        .bind(ticket_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(ticket) = cancelled else {
            // The one-shot transition failed, so the ticket is terminal.
            let current = sqlx::query_as::<_, Ticket>("SELECT * FROM tickets WHERE id = $1")
                .bind(ticket_id)
                .fetch_one(&mut *tx)
                .await?;
            return Err(InvalidTransition {
                from: current.status,
                to: TicketStatus::Cancelled,
            }
            .into());
        };

        // The credit is tied to the transition above running exactly once,
        // clamped so the pool never exceeds its total.
        sqlx::query(
            r#"
            UPDATE events
            SET capacity_remaining = LEAST(capacity_remaining + 1, capacity_total),
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(event_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::debug!(ticket = %ticket_id, event = %event_id, "ticket cancelled");
        Ok(ticket)
    }

    async fn check_in_ticket(&self, ticket_id: Uuid) -> StoreResult<(Ticket, CheckInOutcome)> {
        // Single conditional transition; capacity is unaffected by
        // active -> used, so no event lock is needed.
        let updated = sqlx::query_as::<_, Ticket>(
            "UPDATE tickets SET status = 'used', used_at = $2 WHERE id = $1 AND status = 'active' RETURNING *",
        )
        .bind(ticket_id)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;
        if let Some(ticket) = updated {
            return Ok((ticket, CheckInOutcome::CheckedIn));
        }

        let ticket = sqlx::query_as::<_, Ticket>("SELECT * FROM tickets WHERE id = $1")
            .bind(ticket_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Ticket not found".to_string()))?;
        match ticket.status {
            TicketStatus::Used => Ok((ticket, CheckInOutcome::AlreadyUsed)),
            _ => Err(InvalidTransition {
                from: ticket.status,
                to: TicketStatus::Used,
            }
            .into()),
        }
    }

    async fn ticket_by_id(&self, id: Uuid) -> StoreResult<Option<Ticket>> {
        let ticket = sqlx::query_as::<_, Ticket>("SELECT * FROM tickets WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(ticket)
    }

    async fn tickets_by_user(&self, user_id: Uuid) -> StoreResult<Vec<Ticket>> {
        let tickets = sqlx::query_as::<_, Ticket>(
            "SELECT * FROM tickets WHERE user_id = $1 ORDER BY claimed_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(tickets)
    }

    async fn tickets_by_event(&self, event_id: Uuid) -> StoreResult<Vec<Ticket>> {
        let tickets = sqlx::query_as::<_, Ticket>(
            "SELECT * FROM tickets WHERE event_id = $1 ORDER BY claimed_at DESC",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(tickets)
    }
}

#[async_trait]
impl AuditStore for PgStore {
    async fn record_audit(&self, entry: AuditLog) -> StoreResult<AuditLog> {
        let entry = sqlx::query_as::<_, AuditLog>(
            r#"
            INSERT INTO audit_log (id, admin_id, target_user_id, target_event_id, action, notes, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(entry.id)
        .bind(entry.admin_id)
        .bind(entry.target_user_id)
        .bind(entry.target_event_id)
        .bind(entry.action)
        .bind(&entry.notes)
        .bind(entry.created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(entry)
    }

    async fn list_audit(&self) -> StoreResult<Vec<AuditLog>> {
        let entries =
            sqlx::query_as::<_, AuditLog>("SELECT * FROM audit_log ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await?;
        Ok(entries)
    }
}

#[async_trait]
impl FeedbackStore for PgStore {
    async fn create_feedback(&self, feedback: Feedback) -> StoreResult<Feedback> {
        sqlx::query_as::<_, Feedback>(
            r#"
            INSERT INTO feedback (id, event_id, user_id, rating, comment, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(feedback.id)
        .bind(feedback.event_id)
        .bind(feedback.user_id)
        .bind(feedback.rating)
        .bind(&feedback.comment)
        .bind(feedback.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            map_unique_violation(
                e,
                "feedback_event_id_user_id_key",
                "You have already submitted feedback for this event",
            )
        })
    }

    async fn feedback_by_event(&self, event_id: Uuid) -> StoreResult<Vec<Feedback>> {
        let entries = sqlx::query_as::<_, Feedback>(
            "SELECT * FROM feedback WHERE event_id = $1 ORDER BY created_at DESC",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    async fn feedback_by_user(&self, user_id: Uuid) -> StoreResult<Vec<Feedback>> {
        let entries = sqlx::query_as::<_, Feedback>(
            "SELECT * FROM feedback WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }
}

#[async_trait]
impl AnalyticsStore for PgStore {
    async fn global_stats(&self) -> StoreResult<GlobalStats> {
        let (total_users,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        let (total_events,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM events")
            .fetch_one(&self.pool)
            .await?;
        let (tickets_issued,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM tickets WHERE status <> 'cancelled'")
                .fetch_one(&self.pool)
                .await?;
        let (tickets_used,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM tickets WHERE status = 'used'")
                .fetch_one(&self.pool)
                .await?;

        Ok(GlobalStats {
            total_users,
            total_events,
            tickets_issued,
            tickets_used,
        })
    }

    async fn organizer_stats(&self, organizer_id: Option<Uuid>) -> StoreResult<OrganizerStats> {
        let rows: Vec<(String, i64, i64, i64)> = match organizer_id {
            Some(id) => {
                sqlx::query_as(
                    r#"
                    SELECT title,
                           (capacity_total - capacity_remaining)::BIGINT,
                           capacity_total::BIGINT,
                           capacity_remaining::BIGINT
                    FROM events
                    WHERE organizer_id = $1
                    ORDER BY date, created_at
                    "#,
                )
                .bind(id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as(
                    r#"
                    SELECT title,
                           (capacity_total - capacity_remaining)::BIGINT,
                           capacity_total::BIGINT,
                           capacity_remaining::BIGINT
                    FROM events
                    ORDER BY date, created_at
                    "#,
                )
                .fetch_all(&self.pool)
                .await?
            }
        };
        let per_event = rows
            .into_iter()
            .map(|(title, sold, capacity, remaining)| EventStat {
                title,
                sold,
                capacity,
                remaining,
            })
            .collect();

        let days: Vec<(NaiveDate, i64)> = match organizer_id {
            Some(id) => {
                sqlx::query_as(
                    r#"
                    SELECT t.claimed_at::date AS day, COUNT(*)
                    FROM tickets t
                    JOIN events e ON e.id = t.event_id
                    WHERE t.status <> 'cancelled' AND e.organizer_id = $1
                    GROUP BY day
                    ORDER BY day
                    "#,
                )
                .bind(id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as(
                    r#"
                    SELECT t.claimed_at::date AS day, COUNT(*)
                    FROM tickets t
                    WHERE t.status <> 'cancelled'
                    GROUP BY day
                    ORDER BY day
                    "#,
                )
                .fetch_all(&self.pool)
                .await?
            }
        };
        let timeline = days
            .into_iter()
            .map(|(date, sold)| TimelinePoint { date, sold })
            .collect();

        Ok(OrganizerStats {
            per_event,
            timeline,
        })
    }
}
