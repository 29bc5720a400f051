use thiserror::Error;
use uuid::Uuid;

const TICKET_PREFIX: &str = "ticket_";
const USER_SEPARATOR: &str = "_user_";
const EVENT_SEPARATOR: &str = "_event_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("check-in code does not match the expected format")]
pub struct MalformedToken;

/// Decoded form of a scanned check-in code.
///
/// Only `ticket_id` is trusted for lookup; the user and event ids ride along
/// so a human reading a code can tell what it belongs to, and so mismatches
/// can be flagged in logs. They carry no authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckInToken {
    pub ticket_id: Uuid,
    pub user_id: Uuid,
    pub event_id: Uuid,
}

pub fn encode(ticket_id: Uuid, user_id: Uuid, event_id: Uuid) -> String {
    format!("ticket_{ticket_id}_user_{user_id}_event_{event_id}")
}

pub fn decode(raw: &str) -> Result<CheckInToken, MalformedToken> {
    let rest = raw.strip_prefix(TICKET_PREFIX).ok_or(MalformedToken)?;
    let (ticket_part, rest) = rest.split_once(USER_SEPARATOR).ok_or(MalformedToken)?;
    let (user_part, event_part) = rest.split_once(EVENT_SEPARATOR).ok_or(MalformedToken)?;

    Ok(CheckInToken {
        ticket_id: ticket_part.parse().map_err(|_| MalformedToken)?,
        user_id: user_part.parse().map_err(|_| MalformedToken)?,
        event_id: event_part.parse().map_err(|_| MalformedToken)?,
    })
}
