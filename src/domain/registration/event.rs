//! Event and member views consumed by the registration lifecycle.
//!
//! Both are owned by other parts of the association's system; this crate
//! only reads them, apart from the event's attendee counter.

use crate::domain::foundation::{BusinessType, EventId, MemberId, Money};
use serde::{Deserialize, Serialize};

/// Event a member registers for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub name: String,

    /// Zero means the event is free.
    pub fee: Money,

    /// None means unlimited.
    pub max_attendees: Option<i32>,

    pub current_attendees: i32,
}

impl Event {
    pub fn is_free(&self) -> bool {
        self.fee.is_zero()
    }

    /// Returns true if another attendee fits.
    pub fn has_capacity(&self) -> bool {
        match self.max_attendees {
            Some(max) => self.current_attendees < max,
            None => true,
        }
    }
}

/// Member of the association.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub name: String,

    /// Contact number as entered, not yet normalized.
    pub phone: String,

    pub business_type: Option<BusinessType>,
}
