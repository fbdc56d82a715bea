//! Registration repository port.
//!
//! Persists Registration aggregates. Every lifecycle write is a
//! compare-and-set on `version`; the delivery marker has its own port
//! (`DeliveryLockStore`) and is never touched here.

use crate::domain::foundation::{DomainError, EventId, MemberId, RegistrationId};
use crate::domain::registration::{NewRegistration, Registration};
use async_trait::async_trait;

/// Repository port for Registration aggregate persistence.
#[async_trait]
pub trait RegistrationRepository: Send + Sync {
    /// Find a registration by its ID.
    async fn find_by_id(&self, id: RegistrationId) -> Result<Option<Registration>, DomainError>;

    /// Find the registration that owns a payment order.
    async fn find_by_order_id(&self, order_id: &str) -> Result<Option<Registration>, DomainError>;

    /// Find the non-cancelled registration of a member for an event.
    async fn find_live_by_event_member(
        &self,
        event_id: EventId,
        member_id: MemberId,
    ) -> Result<Option<Registration>, DomainError>;

    /// Store a new registration and return it with its assigned id.
    ///
    /// # Errors
    ///
    /// - `AlreadyRegistered` if a live registration already exists for the pair
    /// - `DatabaseError` on persistence failure
    async fn insert(&self, registration: NewRegistration) -> Result<Registration, DomainError>;

    /// Write lifecycle and payment fields if the stored version still equals
    /// `registration.version`. The stored version is incremented on success.
    ///
    /// Returns false when another writer got there first.
    async fn update_if_version(&self, registration: &Registration) -> Result<bool, DomainError>;
}
