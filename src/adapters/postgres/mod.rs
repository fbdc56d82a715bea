//! PostgreSQL adapters - Database implementations for storage ports.
//!
//! - `PostgresRegistrationRepository` - Registration rows with versioned writes
//! - `PostgresDeliveryLockStore` - Conditional updates on the delivery columns
//! - `PostgresEventRepository` - Events and the atomic attendee counter
//! - `PostgresMemberDirectory` - Member lookups
//!
//! The schema lives in `migrations/` and is applied with `sqlx::migrate!`.

mod delivery_lock_store;
mod event_repository;
mod registration_repository;

pub use delivery_lock_store::PostgresDeliveryLockStore;
pub use event_repository::{PostgresEventRepository, PostgresMemberDirectory};
pub use registration_repository::PostgresRegistrationRepository;
