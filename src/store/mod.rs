use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::models::audit::AuditLog;
use crate::models::event::{ApprovalState, Event, EventQuery};
use crate::models::feedback::Feedback;
use crate::models::ticket::{CheckInOutcome, Ticket};
use crate::models::user::{User, UserStatus};
use crate::utils::error::AppError;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub type StoreResult<T> = Result<T, AppError>;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Persists a new account. Fails with a validation error when the email
    /// is already taken.
    async fn create_user(&self, user: User) -> StoreResult<User>;
    async fn user_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn list_users(&self) -> StoreResult<Vec<User>>;
    async fn set_user_status(&self, id: Uuid, status: UserStatus) -> StoreResult<User>;
}

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn create_event(&self, event: Event) -> StoreResult<Event>;
    async fn event_by_id(&self, id: Uuid) -> StoreResult<Option<Event>>;
    /// Lists events newest-first, optionally narrowed to one approval state
    /// and by the discovery filters.
    async fn list_events(
        &self,
        query: &EventQuery,
        approval: Option<ApprovalState>,
    ) -> StoreResult<Vec<Event>>;
    async fn events_by_organizer(&self, organizer_id: Uuid) -> StoreResult<Vec<Event>>;
    /// Writes the descriptive fields of an event. Capacity and approval are
    /// deliberately not written here; they change only through
    /// `resize_event_capacity` and `set_event_approval`.
    async fn update_event_details(&self, event: &Event) -> StoreResult<Event>;
    /// Atomically resizes the capacity pool, keeping the sold count intact.
    /// Rejects totals below the number of tickets already out.
    async fn resize_event_capacity(&self, event_id: Uuid, new_total: i32) -> StoreResult<Event>;
    async fn set_event_approval(
        &self,
        event_id: Uuid,
        state: ApprovalState,
        admin_id: Uuid,
    ) -> StoreResult<Event>;
    /// Removes the event and everything hanging off it (tickets, feedback).
    async fn delete_event(&self, event_id: Uuid) -> StoreResult<()>;
}

/// Ticket operations. The three compound operations are the atomic unit of
/// the claim/cancel/check-in flows: each backend serializes them per event,
/// so the duplicate check, the capacity counter and the status transition
/// cannot interleave with a concurrent claim for the same event. Callers do
/// authorization before calling in; these operations trust the caller.
#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Claims one ticket for `user_id` against `event_id`: verifies the
    /// event exists and is claimable, that the user holds no live ticket for
    /// it, reserves one capacity unit and mints the ticket. All-or-nothing.
    async fn claim_ticket(&self, event_id: Uuid, user_id: Uuid) -> StoreResult<Ticket>;
    /// Cancels an active ticket and hands its capacity unit back exactly
    /// once. Used and already-cancelled tickets are rejected.
    async fn cancel_ticket(&self, ticket_id: Uuid) -> StoreResult<Ticket>;
    /// Flips an active ticket to used. A second check-in reports
    /// `AlreadyUsed` without touching the ticket.
    async fn check_in_ticket(&self, ticket_id: Uuid) -> StoreResult<(Ticket, CheckInOutcome)>;
    async fn ticket_by_id(&self, id: Uuid) -> StoreResult<Option<Ticket>>;
    async fn tickets_by_user(&self, user_id: Uuid) -> StoreResult<Vec<Ticket>>;
    async fn tickets_by_event(&self, event_id: Uuid) -> StoreResult<Vec<Ticket>>;
}

#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn record_audit(&self, entry: AuditLog) -> StoreResult<AuditLog>;
    async fn list_audit(&self) -> StoreResult<Vec<AuditLog>>;
}

#[async_trait]
pub trait FeedbackStore: Send + Sync {
    /// Persists a rating. Fails with a validation error when the user
    /// already rated this event.
    async fn create_feedback(&self, feedback: Feedback) -> StoreResult<Feedback>;
    async fn feedback_by_event(&self, event_id: Uuid) -> StoreResult<Vec<Feedback>>;
    async fn feedback_by_user(&self, user_id: Uuid) -> StoreResult<Vec<Feedback>>;
}

#[async_trait]
pub trait AnalyticsStore: Send + Sync {
    async fn global_stats(&self) -> StoreResult<GlobalStats>;
    /// Per-event sales and a claims-per-day timeline, over one organizer's
    /// events or over everything when `organizer_id` is `None`.
    async fn organizer_stats(&self, organizer_id: Option<Uuid>) -> StoreResult<OrganizerStats>;
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalStats {
    pub total_users: i64,
    pub total_events: i64,
    pub tickets_issued: i64,
    pub tickets_used: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventStat {
    pub title: String,
    pub sold: i64,
    pub capacity: i64,
    pub remaining: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimelinePoint {
    pub date: NaiveDate,
    pub sold: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizerStats {
    pub per_event: Vec<EventStat>,
    pub timeline: Vec<TimelinePoint>,
}

/// Everything the handlers need from persistence, behind one object so the
/// app can run against Postgres or the in-memory fallback interchangeably.
pub trait Store:
    UserStore + EventStore + TicketStore + AuditStore + FeedbackStore + AnalyticsStore
{
}

impl<T> Store for T where
    T: UserStore + EventStore + TicketStore + AuditStore + FeedbackStore + AnalyticsStore
{
}
