//! DeliveryLockManager - at most one in-flight and at most one completed
//! delivery per registration.
//!
//! Every caller that wants to send a pass (inline dispatch, queue worker,
//! operator resend) goes through `acquire` first. The lock lives on the
//! registration row and is only ever changed by single conditional writes
//! in the store.
//!
//! ## Expiry
//!
//! Locks never expire unless `stale_after` is configured. A crashed holder
//! therefore blocks delivery until an operator calls `force_release`.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::domain::foundation::{RegistrationId, Timestamp};
use crate::domain::registration::{DeliveryState, RegistrationError};
use crate::ports::{DeliveryLockStore, LockAttempt, MarkSent};

/// Proof that the caller holds the delivery lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryLease {
    pub registration_id: RegistrationId,
    pub owner: String,
    pub acquired_at: Timestamp,
}

/// Result of trying to take the lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acquisition {
    Acquired(DeliveryLease),
    AlreadySent { sent_at: Timestamp },
    Locked,
}

impl Acquisition {
    pub fn acquired(&self) -> bool {
        matches!(self, Acquisition::Acquired(_))
    }

    /// Short label for logs.
    pub fn reason(&self) -> &'static str {
        match self {
            Acquisition::Acquired(_) => "acquired",
            Acquisition::AlreadySent { .. } => "already_sent",
            Acquisition::Locked => "locked",
        }
    }
}

pub struct DeliveryLockManager {
    store: Arc<dyn DeliveryLockStore>,
    stale_after: Option<Duration>,
}

impl DeliveryLockManager {
    /// Creates a manager whose locks never expire.
    pub fn new(store: Arc<dyn DeliveryLockStore>) -> Self {
        Self {
            store,
            stale_after: None,
        }
    }

    /// Treat locks older than `ttl` as abandoned.
    pub fn with_stale_after(mut self, ttl: Option<Duration>) -> Self {
        self.stale_after = ttl;
        self
    }

    /// Cutoff before which a lock counts as stale, if expiry is enabled.
    pub fn stale_before(&self, now: Timestamp) -> Option<Timestamp> {
        self.stale_after.map(|ttl| now.minus_secs(ttl.as_secs()))
    }

    /// Reads the marker without changing it.
    pub async fn peek(
        &self,
        registration_id: RegistrationId,
    ) -> Result<DeliveryState, RegistrationError> {
        self.store
            .delivery_state(registration_id)
            .await?
            .ok_or_else(|| RegistrationError::registration_not_found(registration_id))
    }

    /// Returns true if nothing was sent and no live lock exists.
    pub async fn is_free(&self, registration_id: RegistrationId) -> Result<bool, RegistrationError> {
        let state = self.peek(registration_id).await?;
        Ok(!state.is_sent() && !state.is_locked(self.stale_before(Timestamp::now())))
    }

    /// Tries to take the lock with a fresh owner token.
    pub async fn acquire(
        &self,
        registration_id: RegistrationId,
    ) -> Result<Acquisition, RegistrationError> {
        let owner = Uuid::new_v4().to_string();
        let now = Timestamp::now();
        let attempt = self
            .store
            .try_acquire(registration_id, &owner, now, self.stale_before(now))
            .await?;

        let acquisition = match attempt {
            LockAttempt::Acquired => Acquisition::Acquired(DeliveryLease {
                registration_id,
                owner,
                acquired_at: now,
            }),
            LockAttempt::AlreadySent { sent_at } => Acquisition::AlreadySent { sent_at },
            LockAttempt::Held => Acquisition::Locked,
            LockAttempt::Missing => {
                return Err(RegistrationError::registration_not_found(registration_id))
            }
        };

        tracing::debug!(
            registration_id = %registration_id,
            outcome = acquisition.reason(),
            "Delivery lock acquisition"
        );
        Ok(acquisition)
    }

    /// Records a completed send. `updated == false` means the lease was lost
    /// and someone else resolved this registration.
    pub async fn mark_sent(&self, lease: &DeliveryLease) -> Result<MarkSent, RegistrationError> {
        let result = self
            .store
            .mark_sent(lease.registration_id, &lease.owner, Timestamp::now())
            .await?;
        if !result.updated {
            tracing::warn!(
                registration_id = %lease.registration_id,
                "Delivery lease lost before marking sent"
            );
        }
        Ok(result)
    }

    /// Gives the lock back without marking anything sent.
    pub async fn release(&self, lease: &DeliveryLease) -> Result<bool, RegistrationError> {
        let released = self
            .store
            .release(lease.registration_id, &lease.owner)
            .await?;
        tracing::debug!(registration_id = %lease.registration_id, released, "Delivery lock released");
        Ok(released)
    }

    /// Operator action: clears any lock on an unsent registration.
    pub async fn force_release(
        &self,
        registration_id: RegistrationId,
    ) -> Result<bool, RegistrationError> {
        let released = self.store.force_release(registration_id).await?;
        tracing::info!(registration_id = %registration_id, released, "Delivery lock force-released");
        Ok(released)
    }
}
