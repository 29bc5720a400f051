use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::models::audit::AuditLog;
use crate::models::event::{ApprovalState, Event, EventQuery};
use crate::models::feedback::Feedback;
use crate::models::ticket::{CheckInOutcome, Ticket, TicketStatus};
use crate::models::user::{User, UserStatus};
use crate::store::{
    AnalyticsStore, AuditStore, EventStat, EventStore, FeedbackStore, GlobalStats, OrganizerStats,
    StoreResult, TicketStore, TimelinePoint, UserStore,
};
use crate::ticketing::ledger::CapacityLedger;
use crate::utils::error::AppError;

/// An event with its capacity ledger and tickets, guarded by one mutex so
/// claims, cancellations and check-ins for the same event serialize while
/// other events stay untouched.
struct EventSlot {
    event: Event,
    ledger: CapacityLedger,
    tickets: HashMap<Uuid, Ticket>,
}

impl EventSlot {
    fn new(event: Event) -> Self {
        let ledger = CapacityLedger::new(event.capacity_total);
        Self {
            event,
            ledger,
            tickets: HashMap::new(),
        }
    }

    /// The ledger owns the capacity numbers; the stored event row is
    /// refreshed from it whenever it leaves the slot.
    fn snapshot(&self) -> Event {
        let mut event = self.event.clone();
        event.capacity_total = self.ledger.total();
        event.capacity_remaining = self.ledger.remaining();
        event
    }
}

/// In-memory backend. Used by the test suite and as the fallback when no
/// database is configured; nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<Uuid, User>>,
    events: RwLock<HashMap<Uuid, Arc<Mutex<EventSlot>>>>,
    // ticket id -> owning event id
    ticket_index: RwLock<HashMap<Uuid, Uuid>>,
    audit: RwLock<Vec<AuditLog>>,
    feedback: RwLock<Vec<Feedback>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn event_slot(&self, event_id: Uuid) -> Option<Arc<Mutex<EventSlot>>> {
        self.events.read().await.get(&event_id).cloned()
    }

    async fn all_slots(&self) -> Vec<Arc<Mutex<EventSlot>>> {
        self.events.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, user: User) -> StoreResult<User> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(AppError::ValidationError(
                "An account with this email already exists".to_string(),
            ));
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let mut users: Vec<User> = self.users.read().await.values().cloned().collect();
        users.sort_by_key(|u| u.created_at);
        Ok(users)
    }

    async fn set_user_status(&self, id: Uuid, status: UserStatus) -> StoreResult<User> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        user.status = status;
        user.updated_at = Utc::now();
        Ok(user.clone())
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn create_event(&self, event: Event) -> StoreResult<Event> {
        let slot = EventSlot::new(event.clone());
        self.events
            .write()
            .await
            .insert(event.id, Arc::new(Mutex::new(slot)));
        Ok(event)
    }

    async fn event_by_id(&self, id: Uuid) -> StoreResult<Option<Event>> {
        match self.event_slot(id).await {
            Some(slot) => Ok(Some(slot.lock().await.snapshot())),
            None => Ok(None),
        }
    }

    async fn list_events(
        &self,
        query: &EventQuery,
        approval: Option<ApprovalState>,
    ) -> StoreResult<Vec<Event>> {
        let mut events = Vec::new();
        for slot in self.all_slots().await {
            let event = slot.lock().await.snapshot();
            if let Some(state) = approval {
                if event.approval_state != state {
                    continue;
                }
            }
            if let Some(category) = &query.category {
                if !event
                    .category
                    .as_deref()
                    .is_some_and(|c| c.eq_ignore_ascii_case(category))
                {
                    continue;
                }
            }
            if let Some(organization) = &query.organization {
                if !event
                    .organization
                    .as_deref()
                    .is_some_and(|o| o.eq_ignore_ascii_case(organization))
                {
                    continue;
                }
            }
            if let Some(date) = query.date {
                if event.date != date {
                    continue;
                }
            }
            events.push(event);
        }
        events.sort_by(|a, b| b.date.cmp(&a.date).then(a.start_time.cmp(&b.start_time)));
        Ok(events)
    }

    async fn events_by_organizer(&self, organizer_id: Uuid) -> StoreResult<Vec<Event>> {
        let mut events = Vec::new();
        for slot in self.all_slots().await {
            let event = slot.lock().await.snapshot();
            if event.organizer_id == organizer_id {
                events.push(event);
            }
        }
        events.sort_by(|a, b| b.date.cmp(&a.date).then(a.start_time.cmp(&b.start_time)));
        Ok(events)
    }

    async fn update_event_details(&self, event: &Event) -> StoreResult<Event> {
        let slot = self
            .event_slot(event.id)
            .await
            .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;
        let mut slot = slot.lock().await;

        // Descriptive fields only; capacity lives in the ledger and approval
        // has its own operation.
        slot.event.title = event.title.clone();
        slot.event.description = event.description.clone();
        slot.event.location = event.location.clone();
        slot.event.category = event.category.clone();
        slot.event.organization = event.organization.clone();
        slot.event.date = event.date;
        slot.event.start_time = event.start_time;
        slot.event.end_time = event.end_time;
        slot.event.updated_at = event.updated_at;

        Ok(slot.snapshot())
    }

    async fn resize_event_capacity(&self, event_id: Uuid, new_total: i32) -> StoreResult<Event> {
        let slot = self
            .event_slot(event_id)
            .await
            .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;
        let mut slot = slot.lock().await;
        slot.ledger.resize(new_total)?;
        slot.event.updated_at = Utc::now();
        Ok(slot.snapshot())
    }

    async fn set_event_approval(
        &self,
        event_id: Uuid,
        state: ApprovalState,
        admin_id: Uuid,
    ) -> StoreResult<Event> {
        let slot = self
            .event_slot(event_id)
            .await
            .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;
        let mut slot = slot.lock().await;
        slot.event.approval_state = state;
        if state == ApprovalState::Approved {
            slot.event.approved_by = Some(admin_id);
            slot.event.approved_at = Some(Utc::now());
        }
        slot.event.updated_at = Utc::now();
        Ok(slot.snapshot())
    }

    async fn delete_event(&self, event_id: Uuid) -> StoreResult<()> {
        let slot = self
            .events
            .write()
            .await
            .remove(&event_id)
            .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

        let slot = slot.lock().await;
        let mut index = self.ticket_index.write().await;
        for ticket_id in slot.tickets.keys() {
            index.remove(ticket_id);
        }
        self.feedback
            .write()
            .await
            .retain(|f| f.event_id != event_id);
        Ok(())
    }
}

#[async_trait]
impl TicketStore for MemoryStore {
    async fn claim_ticket(&self, event_id: Uuid, user_id: Uuid) -> StoreResult<Ticket> {
        let slot = self
            .event_slot(event_id)
            .await
            .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;
        let mut slot = slot.lock().await;

        if !slot.event.is_claimable() {
            return Err(AppError::ValidationError(
                "This event is not open for ticket claims".to_string(),
            ));
        }
        if slot
            .tickets
            .values()
            .any(|t| t.user_id == user_id && t.counts_against_capacity())
        {
            return Err(AppError::DuplicateClaim(
                "You have already claimed a ticket for this event".to_string(),
            ));
        }
        slot.ledger.reserve().map_err(|_| {
            AppError::CapacityExhausted("This event is fully booked".to_string())
        })?;

        let ticket = Ticket::issue(event_id, user_id, Utc::now());
        slot.tickets.insert(ticket.id, ticket.clone());
        self.ticket_index.write().await.insert(ticket.id, event_id);

        tracing::debug!(
            ticket = %ticket.id,
            event = %event_id,
            user = %user_id,
            remaining = slot.ledger.remaining(),
            "ticket claimed"
        );
        Ok(ticket)
    }

    async fn cancel_ticket(&self, ticket_id: Uuid) -> StoreResult<Ticket> {
        let event_id = self
            .ticket_index
            .read()
            .await
            .get(&ticket_id)
            .copied()
            .ok_or_else(|| AppError::NotFound("Ticket not found".to_string()))?;
        let slot = self
            .event_slot(event_id)
            .await
            .ok_or_else(|| AppError::NotFound("Ticket not found".to_string()))?;
        let mut slot = slot.lock().await;

        let ticket = slot
            .tickets
            .get_mut(&ticket_id)
            .ok_or_else(|| AppError::NotFound("Ticket not found".to_string()))?;
        ticket.cancel()?;
        let ticket = ticket.clone();

        let credited = slot.ledger.release(ticket_id);
        tracing::debug!(
            ticket = %ticket_id,
            event = %event_id,
            credited,
            remaining = slot.ledger.remaining(),
            "ticket cancelled"
        );
        Ok(ticket)
    }

    async fn check_in_ticket(&self, ticket_id: Uuid) -> StoreResult<(Ticket, CheckInOutcome)> {
        let event_id = self
            .ticket_index
            .read()
            .await
            .get(&ticket_id)
            .copied()
            .ok_or_else(|| AppError::NotFound("Ticket not found".to_string()))?;
        let slot = self
            .event_slot(event_id)
            .await
            .ok_or_else(|| AppError::NotFound("Ticket not found".to_string()))?;
        let mut slot = slot.lock().await;

        let ticket = slot
            .tickets
            .get_mut(&ticket_id)
            .ok_or_else(|| AppError::NotFound("Ticket not found".to_string()))?;
        let outcome = ticket.check_in(Utc::now())?;
        Ok((ticket.clone(), outcome))
    }

    async fn ticket_by_id(&self, id: Uuid) -> StoreResult<Option<Ticket>> {
        let Some(event_id) = self.ticket_index.read().await.get(&id).copied() else {
            return Ok(None);
        };
        let Some(slot) = self.event_slot(event_id).await else {
            return Ok(None);
        };
        let slot = slot.lock().await;
        Ok(slot.tickets.get(&id).cloned())
    }

    async fn tickets_by_user(&self, user_id: Uuid) -> StoreResult<Vec<Ticket>> {
        let mut tickets = Vec::new();
        for slot in self.all_slots().await {
            let slot = slot.lock().await;
            tickets.extend(slot.tickets.values().filter(|t| t.user_id == user_id).cloned());
        }
        tickets.sort_by(|a, b| b.claimed_at.cmp(&a.claimed_at));
        Ok(tickets)
    }

    async fn tickets_by_event(&self, event_id: Uuid) -> StoreResult<Vec<Ticket>> {
        let Some(slot) = self.event_slot(event_id).await else {
            return Ok(Vec::new());
        };
        let slot = slot.lock().await;
        let mut tickets: Vec<Ticket> = slot.tickets.values().cloned().collect();
        tickets.sort_by(|a, b| b.claimed_at.cmp(&a.claimed_at));
        Ok(tickets)
    }
}

#[async_trait]
impl AuditStore for MemoryStore {
    async fn record_audit(&self, entry: AuditLog) -> StoreResult<AuditLog> {
        self.audit.write().await.push(entry.clone());
        Ok(entry)
    }

    async fn list_audit(&self) -> StoreResult<Vec<AuditLog>> {
        let mut entries = self.audit.read().await.clone();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entries)
    }
}

#[async_trait]
impl FeedbackStore for MemoryStore {
    async fn create_feedback(&self, feedback: Feedback) -> StoreResult<Feedback> {
        let mut entries = self.feedback.write().await;
        if entries
            .iter()
            .any(|f| f.event_id == feedback.event_id && f.user_id == feedback.user_id)
        {
            return Err(AppError::ValidationError(
                "You have already submitted feedback for this event".to_string(),
            ));
        }
        entries.push(feedback.clone());
        Ok(feedback)
    }

    async fn feedback_by_event(&self, event_id: Uuid) -> StoreResult<Vec<Feedback>> {
        let mut entries: Vec<Feedback> = self
            .feedback
            .read()
            .await
            .iter()
            .filter(|f| f.event_id == event_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entries)
    }

    async fn feedback_by_user(&self, user_id: Uuid) -> StoreResult<Vec<Feedback>> {
        let mut entries: Vec<Feedback> = self
            .feedback
            .read()
            .await
            .iter()
            .filter(|f| f.user_id == user_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entries)
    }
}

#[async_trait]
impl AnalyticsStore for MemoryStore {
    async fn global_stats(&self) -> StoreResult<GlobalStats> {
        let total_users = self.users.read().await.len() as i64;

        let mut total_events = 0i64;
        let mut tickets_issued = 0i64;
        let mut tickets_used = 0i64;
        for slot in self.all_slots().await {
            let slot = slot.lock().await;
            total_events += 1;
            for ticket in slot.tickets.values() {
                if ticket.counts_against_capacity() {
                    tickets_issued += 1;
                }
                if ticket.status == TicketStatus::Used {
                    tickets_used += 1;
                }
            }
        }

        Ok(GlobalStats {
            total_users,
            total_events,
            tickets_issued,
            tickets_used,
        })
    }

    async fn organizer_stats(&self, organizer_id: Option<Uuid>) -> StoreResult<OrganizerStats> {
        let mut per_event = Vec::new();
        let mut by_day: BTreeMap<chrono::NaiveDate, i64> = BTreeMap::new();

        let mut events = Vec::new();
        for slot in self.all_slots().await {
            let slot = slot.lock().await;
            if organizer_id.is_some_and(|id| slot.event.organizer_id != id) {
                continue;
            }
            let event = slot.snapshot();
            let tickets: Vec<Ticket> = slot.tickets.values().cloned().collect();
            events.push((event, tickets));
        }
        events.sort_by(|a, b| a.0.date.cmp(&b.0.date).then(a.0.created_at.cmp(&b.0.created_at)));

        for (event, tickets) in events {
            per_event.push(EventStat {
                title: event.title.clone(),
                sold: event.tickets_sold() as i64,
                capacity: event.capacity_total as i64,
                remaining: event.capacity_remaining as i64,
            });
            for ticket in tickets.iter().filter(|t| t.counts_against_capacity()) {
                *by_day.entry(ticket.claimed_at.date_naive()).or_insert(0) += 1;
            }
        }

        let timeline = by_day
            .into_iter()
            .map(|(date, sold)| TimelinePoint { date, sold })
            .collect();

        Ok(OrganizerStats {
            per_event,
            timeline,
        })
    }
}
