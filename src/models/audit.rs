use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    ApproveEvent,
    RejectEvent,
    ApproveUser,
    SuspendUser,
    PendingUser,
}

/// One admin moderation action, written whenever an admin approves or
/// rejects an event or changes an account's status.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AuditLog {
    pub id: Uuid,
    pub admin_id: Uuid,
    pub target_user_id: Option<Uuid>,
    pub target_event_id: Option<Uuid>,
    pub action: AuditAction,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AuditLog {
    pub fn new(admin_id: Uuid, action: AuditAction) -> Self {
        Self {
            id: Uuid::new_v4(),
            admin_id,
            target_user_id: None,
            target_event_id: None,
            action,
            notes: None,
            created_at: Utc::now(),
        }
    }

    pub fn on_user(mut self, user_id: Uuid) -> Self {
        self.target_user_id = Some(user_id);
        self
    }

    pub fn on_event(mut self, event_id: Uuid) -> Self {
        self.target_event_id = Some(event_id);
        self
    }

    pub fn with_notes(mut self, notes: Option<String>) -> Self {
        self.notes = notes;
        self
    }
}
