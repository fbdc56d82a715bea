//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, errors)
//! - `registration` - Registration lifecycle, statuses, delivery marker
//! - `pass` - Signed pass tokens

pub mod foundation;
pub mod pass;
pub mod registration;
