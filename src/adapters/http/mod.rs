//! HTTP adapters - REST API implementations.

pub mod registration;

pub use registration::{registration_router, RegistrationAppState};
