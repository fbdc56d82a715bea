//! In-memory events with an atomic attendee counter, and a member directory.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::lock_state;
use crate::domain::foundation::{DomainError, ErrorCode, EventId, MemberId};
use crate::domain::registration::{Event, Member};
use crate::ports::{CapacityController, EventRepository, MemberDirectory};

/// Events keyed by id. Also acts as the capacity controller: each counter
/// change is a read-modify-write under the state lock.
#[derive(Default)]
pub struct InMemoryEventStore {
    events: Mutex<HashMap<EventId, Event>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an event.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn add_event(&self, event: Event) {
        self.events
            .lock()
            .expect("InMemoryEventStore: events lock poisoned")
            .insert(event.id, event);
    }

    /// Current attendee count, zero for unknown events.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn current_attendees(&self, event_id: EventId) -> i32 {
        self.events
            .lock()
            .expect("InMemoryEventStore: events lock poisoned")
            .get(&event_id)
            .map(|e| e.current_attendees)
            .unwrap_or(0)
    }
}

fn event_not_found(event_id: EventId) -> DomainError {
    DomainError::new(ErrorCode::EventNotFound, format!("Event {} not found", event_id))
        .with_detail("id", event_id.to_string())
}

#[async_trait]
impl EventRepository for InMemoryEventStore {
    async fn find_by_id(&self, id: EventId) -> Result<Option<Event>, DomainError> {
        Ok(lock_state(&self.events, "InMemoryEventStore")?
            .get(&id)
            .cloned())
    }
}

#[async_trait]
impl CapacityController for InMemoryEventStore {
    async fn try_reserve(&self, event_id: EventId) -> Result<bool, DomainError> {
        let mut events = lock_state(&self.events, "InMemoryEventStore")?;
        let event = events
            .get_mut(&event_id)
            .ok_or_else(|| event_not_found(event_id))?;
        if !event.has_capacity() {
            return Ok(false);
        }
        event.current_attendees += 1;
        Ok(true)
    }

    async fn release(&self, event_id: EventId) -> Result<(), DomainError> {
        let mut events = lock_state(&self.events, "InMemoryEventStore")?;
        match events.get_mut(&event_id) {
            Some(event) => event.current_attendees = (event.current_attendees - 1).max(0),
            None => tracing::warn!(event_id = %event_id, "Seat release for unknown event ignored"),
        }
        Ok(())
    }

    async fn has_capacity(&self, event_id: EventId) -> Result<bool, DomainError> {
        let events = lock_state(&self.events, "InMemoryEventStore")?;
        let event = events.get(&event_id).ok_or_else(|| event_not_found(event_id))?;
        Ok(event.has_capacity())
    }
}

/// Read-only member lookup.
#[derive(Default)]
pub struct InMemoryMemberDirectory {
    members: Mutex<HashMap<MemberId, Member>>,
}

impl InMemoryMemberDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn add_member(&self, member: Member) {
        self.members
            .lock()
            .expect("InMemoryMemberDirectory: members lock poisoned")
            .insert(member.id, member);
    }

    /// Simulates a member being deleted elsewhere.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn remove_member(&self, id: MemberId) {
        self.members
            .lock()
            .expect("InMemoryMemberDirectory: members lock poisoned")
            .remove(&id);
    }
}

#[async_trait]
impl MemberDirectory for InMemoryMemberDirectory {
    async fn find_by_id(&self, id: MemberId) -> Result<Option<Member>, DomainError> {
        Ok(lock_state(&self.members, "InMemoryMemberDirectory")?
            .get(&id)
            .cloned())
    }
}
