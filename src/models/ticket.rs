use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use uuid::Uuid;

use crate::ticketing::token;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Active,
    Used,
    Cancelled,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Active => "active",
            TicketStatus::Used => "used",
            TicketStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("ticket cannot move from {from} to {to}")]
pub struct InvalidTransition {
    pub from: TicketStatus,
    pub to: TicketStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckInOutcome {
    CheckedIn,
    AlreadyUsed,
}

/// One user's claim against one event. Tickets are only ever created through
/// a claim and only ever mutated through `check_in` and `cancel`; they are
/// never deleted, a cancelled ticket stays around as a terminal record.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Ticket {
    pub id: Uuid,
    #[serde(rename = "event")]
    pub event_id: Uuid,
    #[serde(rename = "user")]
    pub user_id: Uuid,
    pub status: TicketStatus,
    #[serde(rename = "qr_code")]
    pub check_in_token: String,
    pub claimed_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
}

impl Ticket {
    /// Mints a fresh active ticket with its scannable check-in code.
    pub fn issue(event_id: Uuid, user_id: Uuid, now: DateTime<Utc>) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            event_id,
            user_id,
            status: TicketStatus::Active,
            check_in_token: token::encode(id, user_id, event_id),
            claimed_at: now,
            used_at: None,
        }
    }

    /// Marks the ticket used at the door. Scanning an already-used ticket is
    /// a no-op success so double scans never punish the attendee; `used_at`
    /// keeps the timestamp of the first scan.
    pub fn check_in(&mut self, now: DateTime<Utc>) -> Result<CheckInOutcome, InvalidTransition> {
        match self.status {
            TicketStatus::Active => {
                self.status = TicketStatus::Used;
                self.used_at = Some(now);
                Ok(CheckInOutcome::CheckedIn)
            }
            TicketStatus::Used => Ok(CheckInOutcome::AlreadyUsed),
            TicketStatus::Cancelled => Err(InvalidTransition {
                from: self.status,
                to: TicketStatus::Used,
            }),
        }
    }

    /// Releases the claim. Only active tickets can be cancelled; a used
    /// ticket is a completed attendance record and stays used.
    pub fn cancel(&mut self) -> Result<(), InvalidTransition> {
        match self.status {
            TicketStatus::Active => {
                self.status = TicketStatus::Cancelled;
                Ok(())
            }
            _ => Err(InvalidTransition {
                from: self.status,
                to: TicketStatus::Cancelled,
            }),
        }
    }

    /// Active and used tickets both occupy a capacity unit; cancelled
    /// tickets have handed theirs back.
    pub fn counts_against_capacity(&self) -> bool {
        matches!(self.status, TicketStatus::Active | TicketStatus::Used)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn active_ticket() -> Ticket {
        Ticket::issue(Uuid::new_v4(), Uuid::new_v4(), Utc::now())
    }

    #[test]
    fn test_check_in_marks_used_once() {
        let mut ticket = active_ticket();
        let outcome = ticket.check_in(Utc::now()).unwrap();
        assert_eq!(outcome, CheckInOutcome::CheckedIn);
        assert_eq!(ticket.status, TicketStatus::Used);
        assert!(ticket.used_at.is_some());
    }

    #[test]
    fn test_second_check_in_is_noop_and_keeps_used_at() {
        let mut ticket = active_ticket();
        ticket.check_in(Utc::now()).unwrap();
        let first_used_at = ticket.used_at;

        let outcome = ticket
            .check_in(Utc::now() + chrono::Duration::minutes(5))
            .unwrap();
        assert_eq!(outcome, CheckInOutcome::AlreadyUsed);
        assert_eq!(ticket.used_at, first_used_at);
    }

    #[test]
    fn test_cancelled_ticket_cannot_check_in() {
        let mut ticket = active_ticket();
        ticket.cancel().unwrap();
        let err = ticket.check_in(Utc::now()).unwrap_err();
        assert_eq!(err.from, TicketStatus::Cancelled);
        assert_eq!(err.to, TicketStatus::Used);
    }

    #[test]
    fn test_used_ticket_cannot_cancel() {
        let mut ticket = active_ticket();
        ticket.check_in(Utc::now()).unwrap();
        let err = ticket.cancel().unwrap_err();
        assert_eq!(err.from, TicketStatus::Used);
    }

    #[test]
    fn test_cancel_twice_rejected() {
        let mut ticket = active_ticket();
        ticket.cancel().unwrap();
        assert!(ticket.cancel().is_err());
    }

    #[test]
    fn test_capacity_accounting_by_status() {
        let mut ticket = active_ticket();
        assert!(ticket.counts_against_capacity());
        ticket.check_in(Utc::now()).unwrap();
        assert!(ticket.counts_against_capacity());

        let mut cancelled = active_ticket();
        cancelled.cancel().unwrap();
        assert!(!cancelled.counts_against_capacity());
    }

    #[test]
    fn test_issued_ticket_embeds_its_ids_in_the_code() {
        let event_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let ticket = Ticket::issue(event_id, user_id, Utc::now());
        let parsed = crate::ticketing::token::decode(&ticket.check_in_token).unwrap();
        assert_eq!(parsed.ticket_id, ticket.id);
        assert_eq!(parsed.user_id, user_id);
        assert_eq!(parsed.event_id, event_id);
    }

    #[test]
    fn test_wire_shape_uses_qr_code_field() {
        let ticket = active_ticket();
        let json = serde_json::to_value(&ticket).unwrap();
        assert!(json.get("qr_code").is_some());
        assert!(json.get("event").is_some());
        assert!(json.get("user").is_some());
        assert!(json.get("check_in_token").is_none());
    }
}
