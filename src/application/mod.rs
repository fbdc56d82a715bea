//! Application layer - Commands, Handlers, and the delivery pipeline.
//!
//! This layer orchestrates domain operations and coordinates between ports.

pub mod delivery;
pub mod handlers;
pub mod payment_verifier;

pub use payment_verifier::{sign_callback, PaymentVerifier};
