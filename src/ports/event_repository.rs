//! Event catalog and capacity ports.

use crate::domain::foundation::{DomainError, EventId, MemberId};
use crate::domain::registration::{Event, Member};
use async_trait::async_trait;

/// Read access to events.
#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn find_by_id(&self, id: EventId) -> Result<Option<Event>, DomainError>;
}

/// Read access to members.
#[async_trait]
pub trait MemberDirectory: Send + Sync {
    async fn find_by_id(&self, id: MemberId) -> Result<Option<Member>, DomainError>;
}

/// Atomic attendee counter per event.
///
/// Implementations must perform each operation as a single atomic
/// read-modify-write so concurrent callers can never push
/// `current_attendees` past `max_attendees` or below zero.
#[async_trait]
pub trait CapacityController: Send + Sync {
    /// Takes a seat if one is free. Unlimited events always succeed.
    ///
    /// Returns false when the event is full. Unknown events are an
    /// `EventNotFound` error.
    async fn try_reserve(&self, event_id: EventId) -> Result<bool, DomainError>;

    /// Gives a seat back. Floors at zero.
    async fn release(&self, event_id: EventId) -> Result<(), DomainError>;

    /// Non-reserving check used at intake.
    async fn has_capacity(&self, event_id: EventId) -> Result<bool, DomainError>;
}
