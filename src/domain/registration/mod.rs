//! Registration domain module.
//!
//! Handles the registration lifecycle: intake, payment, check-in,
//! cancellation, and the pass delivery marker.
//!
//! # Module Structure
//!
//! - `aggregate` - Registration aggregate entity
//! - `status` - Attendance and payment state machines
//! - `delivery` - Delivery lock and sent marker
//! - `event` - Event and member views
//! - `errors` - RegistrationError

mod aggregate;
mod delivery;
mod errors;
mod event;
mod status;

pub use aggregate::{CheckIn, NewRegistration, Registration};
pub use delivery::{DeliveryLock, DeliveryState};
pub use errors::{GatewayFailure, RegistrationError};
pub use event::{Event, Member};
pub use status::{AttendanceStatus, PaymentStatus};
