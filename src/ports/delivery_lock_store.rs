//! Delivery lock store port.
//!
//! Backs the row-embedded delivery marker. Each operation must be a single
//! conditional write so that, across every process and every trigger, at
//! most one caller holds the lock and `sent_at` is written at most once.

use crate::domain::foundation::{DomainError, RegistrationId, Timestamp};
use crate::domain::registration::DeliveryState;
use async_trait::async_trait;

/// Outcome of a conditional lock acquisition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockAttempt {
    /// The caller now holds the lock.
    Acquired,

    /// Delivery already completed.
    AlreadySent { sent_at: Timestamp },

    /// Someone else holds a live lock.
    Held,

    /// No such registration.
    Missing,
}

/// Outcome of marking a delivery as sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkSent {
    /// True if this call wrote `sent_at`.
    pub updated: bool,

    /// The stored `sent_at`, whoever wrote it.
    pub sent_at: Option<Timestamp>,
}

#[async_trait]
pub trait DeliveryLockStore: Send + Sync {
    /// Current delivery marker, used for cheap pre-checks.
    async fn delivery_state(
        &self,
        id: RegistrationId,
    ) -> Result<Option<DeliveryState>, DomainError>;

    /// Sets the lock to `owner` if nothing was sent and no live lock exists.
    ///
    /// Locks acquired before `stale_before` are treated as abandoned. `None`
    /// means locks never expire.
    async fn try_acquire(
        &self,
        id: RegistrationId,
        owner: &str,
        now: Timestamp,
        stale_before: Option<Timestamp>,
    ) -> Result<LockAttempt, DomainError>;

    /// Writes `sent_at` and clears the lock, only if `owner` still holds it.
    async fn mark_sent(
        &self,
        id: RegistrationId,
        owner: &str,
        sent_at: Timestamp,
    ) -> Result<MarkSent, DomainError>;

    /// Clears the lock if `owner` holds it. Returns true if cleared.
    async fn release(&self, id: RegistrationId, owner: &str) -> Result<bool, DomainError>;

    /// Clears any lock on an unsent registration. Returns true if cleared.
    async fn force_release(&self, id: RegistrationId) -> Result<bool, DomainError>;
}
