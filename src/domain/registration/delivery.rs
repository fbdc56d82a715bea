//! Pass delivery marker embedded in each registration.
//!
//! The marker has two parts: a permanent `sent_at` stamp written once a send
//! fully succeeded, and an ephemeral lock held by whichever caller is
//! currently attempting the send.

use crate::domain::foundation::Timestamp;
use serde::{Deserialize, Serialize};

/// Ephemeral lock over a delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryLock {
    /// Opaque token identifying the holder.
    pub owner: String,

    /// When the holder acquired the lock.
    pub acquired_at: Timestamp,
}

impl DeliveryLock {
    /// A lock is stale when acquired strictly before the cutoff.
    pub fn is_stale(&self, stale_before: Option<Timestamp>) -> bool {
        match stale_before {
            Some(cutoff) => self.acquired_at.is_before(&cutoff),
            None => false,
        }
    }
}

/// Delivery state of a registration's pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryState {
    /// Set once, never cleared.
    pub sent_at: Option<Timestamp>,

    pub lock: Option<DeliveryLock>,
}

impl DeliveryState {
    pub fn is_sent(&self) -> bool {
        self.sent_at.is_some()
    }

    /// Returns true if a live (non-stale) lock is held by anyone.
    pub fn is_locked(&self, stale_before: Option<Timestamp>) -> bool {
        self.lock
            .as_ref()
            .map(|lock| !lock.is_stale(stale_before))
            .unwrap_or(false)
    }

    /// Returns true if the given owner currently holds the lock.
    pub fn is_held_by(&self, owner: &str) -> bool {
        self.lock.as_ref().map(|l| l.owner == owner).unwrap_or(false)
    }
}
