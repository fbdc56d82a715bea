//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Storage Ports
//!
//! - `RegistrationRepository` - Registration aggregates with versioned writes
//! - `EventRepository`, `MemberDirectory` - Read access to events and members
//! - `CapacityController` - Atomic attendee counter
//! - `DeliveryLockStore` - Row-embedded delivery marker
//!
//! ## External Service Ports
//!
//! - `PaymentGateway` - Orders and refunds
//! - `MessagingGateway` - Document delivery to chat recipients
//! - `PassRenderer` - Pass document generation
//! - `JobQueue` - Optional offload queue for deliveries

mod delivery_lock_store;
mod event_repository;
mod job_queue;
mod messaging_gateway;
mod pass_renderer;
mod payment_gateway;
mod registration_repository;

pub use delivery_lock_store::{DeliveryLockStore, LockAttempt, MarkSent};
pub use event_repository::{CapacityController, EventRepository, MemberDirectory};
pub use job_queue::{ClaimedJob, DeliveryJob, JobQueue, QueueError};
pub use messaging_gateway::{DeliveryReceipt, DocumentMessage, MessagingError, MessagingGateway};
pub use pass_renderer::{PassContent, PassDocument, PassRenderer, RenderError};
pub use payment_gateway::{
    CreateOrderRequest, Order, PaymentError, PaymentErrorCode, PaymentGateway, Refund,
    RefundRequest,
};
pub use registration_repository::RegistrationRepository;
