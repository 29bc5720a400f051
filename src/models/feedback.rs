use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Post-event rating left by an attendee. One entry per user per event,
/// and only ticket holders may submit one.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Feedback {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub rating: i16,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Feedback {
    pub fn new(event_id: Uuid, user_id: Uuid, rating: i16, comment: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_id,
            user_id,
            rating,
            comment,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewFeedback {
    pub rating: i16,
    pub comment: Option<String>,
}
