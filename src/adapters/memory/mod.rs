//! In-memory adapters for tests and local runs.
//!
//! Each adapter keeps its state behind a mutex and performs every
//! conditional write while holding it, so the atomicity guarantees of the
//! ports hold exactly as they do against PostgreSQL and Redis.
//!
//! Not durable. Everything is lost when the process exits.

mod event_store;
mod job_queue;
mod messaging_gateway;
mod payment_gateway;
mod registration_store;

pub use event_store::{InMemoryEventStore, InMemoryMemberDirectory};
pub use job_queue::InMemoryJobQueue;
pub use messaging_gateway::InMemoryMessagingGateway;
pub use payment_gateway::InMemoryPaymentGateway;
pub use registration_store::InMemoryRegistrationStore;

use std::sync::{Mutex, MutexGuard};

use crate::domain::foundation::DomainError;

/// Locks adapter state, reporting a poisoned mutex as a storage failure.
fn lock_state<'a, T>(mutex: &'a Mutex<T>, adapter: &str) -> Result<MutexGuard<'a, T>, DomainError> {
    mutex
        .lock()
        .map_err(|_| DomainError::database(format!("{}: state lock poisoned", adapter)))
}
