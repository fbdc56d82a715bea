//! In-memory registration rows with the delivery marker embedded.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::lock_state;
use crate::domain::foundation::{
    DomainError, ErrorCode, EventId, MemberId, RegistrationId, Timestamp,
};
use crate::domain::registration::{DeliveryLock, DeliveryState, NewRegistration, Registration};
use crate::ports::{DeliveryLockStore, LockAttempt, MarkSent, RegistrationRepository};

const ADAPTER: &str = "InMemoryRegistrationStore";

#[derive(Default)]
struct State {
    rows: HashMap<RegistrationId, Registration>,
    next_id: i64,
}

/// Registration store implementing both the repository and the delivery
/// lock store over the same rows.
///
/// Lifecycle writes (`update_if_version`) never touch the delivery marker
/// and marker writes never touch the version, mirroring the SQL adapter.
#[derive(Default)]
pub struct InMemoryRegistrationStore {
    state: Mutex<State>,
}

impl InMemoryRegistrationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows, cancelled ones included.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn len(&self) -> usize {
        self.state
            .lock()
            .expect("InMemoryRegistrationStore: state lock poisoned")
            .rows
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RegistrationRepository for InMemoryRegistrationStore {
    async fn find_by_id(&self, id: RegistrationId) -> Result<Option<Registration>, DomainError> {
        Ok(lock_state(&self.state, ADAPTER)?.rows.get(&id).cloned())
    }

    async fn find_by_order_id(&self, order_id: &str) -> Result<Option<Registration>, DomainError> {
        Ok(lock_state(&self.state, ADAPTER)?
            .rows
            .values()
            .find(|r| r.payment_order_id.as_deref() == Some(order_id))
            .cloned())
    }

    async fn find_live_by_event_member(
        &self,
        event_id: EventId,
        member_id: MemberId,
    ) -> Result<Option<Registration>, DomainError> {
        Ok(lock_state(&self.state, ADAPTER)?
            .rows
            .values()
            .find(|r| r.event_id == event_id && r.member_id == Some(member_id) && r.is_live())
            .cloned())
    }

    async fn insert(&self, registration: NewRegistration) -> Result<Registration, DomainError> {
        let mut state = lock_state(&self.state, ADAPTER)?;

        let duplicate = state.rows.values().any(|r| {
            r.event_id == registration.event_id
                && r.member_id == Some(registration.member_id)
                && r.is_live()
        });
        if duplicate {
            return Err(DomainError::new(
                ErrorCode::AlreadyRegistered,
                "A live registration already exists for this event and member",
            )
            .with_detail("event_id", registration.event_id.to_string())
            .with_detail("member_id", registration.member_id.to_string()));
        }

        state.next_id += 1;
        let id = RegistrationId::new(state.next_id);
        let stored = registration.into_registration(id);
        state.rows.insert(id, stored.clone());
        Ok(stored)
    }

    async fn update_if_version(&self, registration: &Registration) -> Result<bool, DomainError> {
        let mut state = lock_state(&self.state, ADAPTER)?;
        let Some(current) = state.rows.get_mut(&registration.id) else {
            return Ok(false);
        };
        if current.version != registration.version {
            return Ok(false);
        }

        let delivery = std::mem::take(&mut current.delivery);
        *current = registration.clone();
        current.delivery = delivery;
        current.version = registration.version + 1;
        Ok(true)
    }
}

#[async_trait]
impl DeliveryLockStore for InMemoryRegistrationStore {
    async fn delivery_state(
        &self,
        id: RegistrationId,
    ) -> Result<Option<DeliveryState>, DomainError> {
        Ok(lock_state(&self.state, ADAPTER)?
            .rows
            .get(&id)
            .map(|r| r.delivery.clone()))
    }

    async fn try_acquire(
        &self,
        id: RegistrationId,
        owner: &str,
        now: Timestamp,
        stale_before: Option<Timestamp>,
    ) -> Result<LockAttempt, DomainError> {
        let mut state = lock_state(&self.state, ADAPTER)?;
        let Some(row) = state.rows.get_mut(&id) else {
            return Ok(LockAttempt::Missing);
        };

        if let Some(sent_at) = row.delivery.sent_at {
            return Ok(LockAttempt::AlreadySent { sent_at });
        }
        if row.delivery.is_locked(stale_before) {
            return Ok(LockAttempt::Held);
        }

        row.delivery.lock = Some(DeliveryLock {
            owner: owner.to_string(),
            acquired_at: now,
        });
        Ok(LockAttempt::Acquired)
    }

    async fn mark_sent(
        &self,
        id: RegistrationId,
        owner: &str,
        sent_at: Timestamp,
    ) -> Result<MarkSent, DomainError> {
        let mut state = lock_state(&self.state, ADAPTER)?;
        let Some(row) = state.rows.get_mut(&id) else {
            return Ok(MarkSent {
                updated: false,
                sent_at: None,
            });
        };

        if row.delivery.sent_at.is_none() && row.delivery.is_held_by(owner) {
            row.delivery.sent_at = Some(sent_at);
            row.delivery.lock = None;
            return Ok(MarkSent {
                updated: true,
                sent_at: Some(sent_at),
            });
        }

        Ok(MarkSent {
            updated: false,
            sent_at: row.delivery.sent_at,
        })
    }

    async fn release(&self, id: RegistrationId, owner: &str) -> Result<bool, DomainError> {
        let mut state = lock_state(&self.state, ADAPTER)?;
        match state.rows.get_mut(&id) {
            Some(row) if row.delivery.is_held_by(owner) => {
                row.delivery.lock = None;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn force_release(&self, id: RegistrationId) -> Result<bool, DomainError> {
        let mut state = lock_state(&self.state, ADAPTER)?;
        match state.rows.get_mut(&id) {
            Some(row) if row.delivery.sent_at.is_none() && row.delivery.lock.is_some() => {
                row.delivery.lock = None;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::Money;

    fn pending(member: i64) -> NewRegistration {
        NewRegistration::pending(
            EventId::new(1),
            MemberId::new(member),
            Money::from_minor(50_000).unwrap(),
            format!("order_{}", member),
        )
    }

    #[tokio::test]
    async fn insert_assigns_sequential_ids() {
        let store = InMemoryRegistrationStore::new();
        let a = store.insert(pending(1)).await.unwrap();
        let b = store.insert(pending(2)).await.unwrap();
        assert_eq!(b.id.value(), a.id.value() + 1);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn duplicate_live_pair_is_rejected() {
        let store = InMemoryRegistrationStore::new();
        store.insert(pending(1)).await.unwrap();
        let err = store.insert(pending(1)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::AlreadyRegistered);
    }

    #[tokio::test]
    async fn cancelled_row_frees_the_pair() {
        let store = InMemoryRegistrationStore::new();
        let mut reg = store.insert(pending(1)).await.unwrap();
        reg.cancel(Timestamp::now()).unwrap();
        assert!(store.update_if_version(&reg).await.unwrap());

        assert!(store.insert(pending(1)).await.is_ok());
    }

    #[tokio::test]
    async fn stale_version_is_not_written() {
        let store = InMemoryRegistrationStore::new();
        let reg = store.insert(pending(1)).await.unwrap();

        let mut first = reg.clone();
        first.cancel(Timestamp::now()).unwrap();
        assert!(store.update_if_version(&first).await.unwrap());

        let mut second = reg;
        second.check_in(Timestamp::now()).ok();
        assert!(!store.update_if_version(&second).await.unwrap());
    }

    #[tokio::test]
    async fn lifecycle_write_keeps_delivery_marker() {
        let store = InMemoryRegistrationStore::new();
        let mut reg = store
            .insert(NewRegistration::free(EventId::new(1), MemberId::new(1)))
            .await
            .unwrap();
        let now = Timestamp::now();
        store.try_acquire(reg.id, "owner", now, None).await.unwrap();
        store.mark_sent(reg.id, "owner", now).await.unwrap();

        reg.check_in(Timestamp::now()).unwrap();
        assert!(store.update_if_version(&reg).await.unwrap());

        let state = store.delivery_state(reg.id).await.unwrap().unwrap();
        assert_eq!(state.sent_at, Some(now));
    }

    #[tokio::test]
    async fn mark_sent_requires_current_owner() {
        let store = InMemoryRegistrationStore::new();
        let reg = store.insert(pending(1)).await.unwrap();
        let now = Timestamp::now();

        store.try_acquire(reg.id, "a", now, None).await.unwrap();
        let lost = store.mark_sent(reg.id, "b", now).await.unwrap();
        assert!(!lost.updated);

        let won = store.mark_sent(reg.id, "a", now).await.unwrap();
        assert!(won.updated);
        assert_eq!(
            store.try_acquire(reg.id, "c", now, None).await.unwrap(),
            LockAttempt::AlreadySent { sent_at: now }
        );
    }

    #[tokio::test]
    async fn stale_lock_can_be_taken_over() {
        let store = InMemoryRegistrationStore::new();
        let reg = store.insert(pending(1)).await.unwrap();
        let old = Timestamp::now().minus_secs(600);

        store.try_acquire(reg.id, "a", old, None).await.unwrap();
        let now = Timestamp::now();
        assert_eq!(
            store.try_acquire(reg.id, "b", now, None).await.unwrap(),
            LockAttempt::Held
        );
        assert_eq!(
            store
                .try_acquire(reg.id, "b", now, Some(now.minus_secs(300)))
                .await
                .unwrap(),
            LockAttempt::Acquired
        );
    }

    #[tokio::test]
    async fn force_release_leaves_sent_rows_alone() {
        let store = InMemoryRegistrationStore::new();
        let reg = store.insert(pending(1)).await.unwrap();
        let now = Timestamp::now();

        store.try_acquire(reg.id, "a", now, None).await.unwrap();
        assert!(store.force_release(reg.id).await.unwrap());
        assert!(!store.force_release(reg.id).await.unwrap());

        store.try_acquire(reg.id, "b", now, None).await.unwrap();
        store.mark_sent(reg.id, "b", now).await.unwrap();
        assert!(!store.force_release(reg.id).await.unwrap());
    }
}
