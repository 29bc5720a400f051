use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ApprovalState {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: Uuid,
    pub organizer_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub location: String,
    pub category: Option<String>,
    pub organization: Option<String>,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: Option<NaiveTime>,
    pub capacity_total: i32,
    pub capacity_remaining: i32,
    pub approval_state: ApprovalState,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub fn create(organizer_id: Uuid, payload: NewEvent) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            organizer_id,
            title: payload.title,
            description: payload.description,
            location: payload.location,
            category: payload.category,
            organization: payload.organization,
            date: payload.date,
            start_time: payload.start_time,
            end_time: payload.end_time,
            capacity_total: payload.capacity,
            capacity_remaining: payload.capacity,
            approval_state: ApprovalState::Pending,
            approved_by: None,
            approved_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Tickets may only be claimed against events an admin has approved.
    pub fn is_claimable(&self) -> bool {
        self.approval_state == ApprovalState::Approved
    }

    /// Count of tickets currently held against this event (active or used).
    pub fn tickets_sold(&self) -> i32 {
        self.capacity_total - self.capacity_remaining
    }

    /// Applies an edit to the descriptive fields only. Capacity and approval
    /// changes go through their own store operations.
    pub fn apply_update(&mut self, update: &EventUpdate) {
        if let Some(title) = &update.title {
            self.title = title.clone();
        }
        if let Some(description) = &update.description {
            self.description = Some(description.clone());
        }
        if let Some(location) = &update.location {
            self.location = location.clone();
        }
        if let Some(category) = &update.category {
            self.category = Some(category.clone());
        }
        if let Some(organization) = &update.organization {
            self.organization = Some(organization.clone());
        }
        if let Some(date) = update.date {
            self.date = date;
        }
        if let Some(start_time) = update.start_time {
            self.start_time = start_time;
        }
        if let Some(end_time) = update.end_time {
            self.end_time = Some(end_time);
        }
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewEvent {
    pub title: String,
    pub description: Option<String>,
    pub location: String,
    pub category: Option<String>,
    pub organization: Option<String>,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: Option<NaiveTime>,
    pub capacity: i32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub category: Option<String>,
    pub organization: Option<String>,
    pub date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub capacity: Option<i32>,
}

/// Query-string filters for the event listing, matching the discovery page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventQuery {
    pub category: Option<String>,
    pub organization: Option<String>,
    pub date: Option<NaiveDate>,
}
