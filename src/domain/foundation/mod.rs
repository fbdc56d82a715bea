//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, enums, and error types
//! that form the vocabulary of the registration domain.

mod business_type;
mod errors;
mod ids;
mod money;
mod state_machine;
mod timestamp;

pub use business_type::BusinessType;
pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{EventId, MemberId, RegistrationId};
pub use money::Money;
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
