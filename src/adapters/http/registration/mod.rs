//! HTTP adapter for registration endpoints.
//!
//! Exposes the registration lifecycle via REST API:
//! - `POST /api/events/:event_id/registrations` - Register a member
//! - `POST /api/payments/callback` - Confirm a payment
//! - `POST /api/registrations/:id/check-in` - Check in by id
//! - `POST /api/check-in/scan` - Check in by pass token
//! - `POST /api/registrations/:id/cancel` - Cancel with optional refund
//! - `POST /api/registrations/:id/pass/resend` - Resend the pass
//! - `POST /api/registrations/:id/pass/unlock` - Release a stuck delivery lock
//! - `GET /health` - Liveness

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::*;
pub use handlers::{RegistrationApiError, RegistrationAppState};
pub use routes::{registration_router, registration_routes};
