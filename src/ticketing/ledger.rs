use std::collections::HashSet;

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no capacity remaining")]
pub struct CapacityExhausted;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("capacity {requested} is below the {sold} tickets already issued")]
pub struct CapacityTooSmall {
    pub requested: i32,
    pub sold: i32,
}

/// Remaining-capacity counter for a single event.
///
/// Every unit consumed by a claim comes back through `release`, which is
/// keyed by ticket id so a ticket can credit the pool at most once no matter
/// how many code paths try to return it. The counter is not synchronized by
/// itself; callers serialize access per event.
#[derive(Debug, Clone)]
pub struct CapacityLedger {
    total: i32,
    remaining: i32,
    released: HashSet<Uuid>,
}

impl CapacityLedger {
    pub fn new(total: i32) -> Self {
        Self {
            total,
            remaining: total,
            released: HashSet::new(),
        }
    }

    pub fn total(&self) -> i32 {
        self.total
    }

    pub fn remaining(&self) -> i32 {
        self.remaining
    }

    /// Takes one unit for a new ticket. Fails without side effects when the
    /// event is sold out.
    pub fn reserve(&mut self) -> Result<(), CapacityExhausted> {
        if self.remaining == 0 {
            return Err(CapacityExhausted);
        }
        self.remaining -= 1;
        Ok(())
    }

    /// Hands one unit back for a cancelled ticket. Returns whether the pool
    /// was actually credited: repeat releases for the same ticket are no-ops,
    /// and the counter never climbs above the total.
    pub fn release(&mut self, ticket_id: Uuid) -> bool {
        if !self.released.insert(ticket_id) {
            return false;
        }
        if self.remaining >= self.total {
            return false;
        }
        self.remaining += 1;
        true
    }

    /// Grows or shrinks the pool. The new total must still cover every
    /// ticket already out there; remaining shifts by the same delta.
    pub fn resize(&mut self, new_total: i32) -> Result<(), CapacityTooSmall> {
        let sold = self.total - self.remaining;
        if new_total < sold {
            return Err(CapacityTooSmall {
                requested: new_total,
                sold,
            });
        }
        self.total = new_total;
        self.remaining = new_total - sold;
        Ok(())
    }
}
