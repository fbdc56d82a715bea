//! Registration handlers.
//!
//! Command handlers for the registration lifecycle:
//!
//! ## Commands
//! - Registering a member for an event (paid or free)
//! - Confirming a payment from a gateway callback
//! - Checking in by id or by scanning a pass token
//! - Cancelling with an optional refund
//! - Operator pass resend and lock release

mod cancel_registration;
mod check_in;
mod confirm_payment;
mod register;
mod resend_pass;
mod scan_pass;
mod unlock_pass;

pub use cancel_registration::{
    CancelRegistrationCommand, CancelRegistrationHandler, CancelRegistrationResult, RefundOutcome,
};
pub use check_in::{CheckInCommand, CheckInHandler, CheckInResult};
pub use confirm_payment::{ConfirmPaymentCommand, ConfirmPaymentHandler, ConfirmPaymentResult};
pub use register::{RegisterCommand, RegisterHandler, RegisterResult};
pub use resend_pass::{ResendPassCommand, ResendPassHandler, ResendPassResult};
pub use scan_pass::{ScanPassCommand, ScanPassHandler};
pub use unlock_pass::{UnlockPassCommand, UnlockPassHandler, UnlockPassResult};

use crate::domain::foundation::RegistrationId;
use crate::domain::registration::RegistrationError;

/// A versioned write lost to another writer.
pub(crate) fn concurrent_modification(
    id: RegistrationId,
    attempted: &str,
) -> RegistrationError {
    tracing::warn!(registration_id = %id, attempted, "Concurrent modification detected");
    RegistrationError::invalid_state("modified concurrently", attempted)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;
    use std::time::Duration;

    use secrecy::SecretString;

    use super::*;
    use crate::adapters::memory::{
        InMemoryEventStore, InMemoryMemberDirectory, InMemoryMessagingGateway,
        InMemoryPaymentGateway, InMemoryRegistrationStore,
    };
    use crate::adapters::pass::TextPassRenderer;
    use crate::application::delivery::{
        DeliveryExecutor, DeliveryLockManager, DispatcherConfig, NotificationDispatcher,
        QueueHandle,
    };
    use crate::application::{sign_callback, PaymentVerifier};
    use crate::domain::foundation::{EventId, MemberId, Money};
    use crate::domain::pass::PassTokenService;
    use crate::domain::registration::{Event, Member, Registration};
    use crate::ports::RegistrationRepository;

    pub const CALLBACK_SECRET: &str = "callback-secret";

    /// Every handler wired to in-memory adapters, delivering inline.
    pub struct Harness {
        pub registrations: Arc<InMemoryRegistrationStore>,
        pub events: Arc<InMemoryEventStore>,
        pub members: Arc<InMemoryMemberDirectory>,
        pub payment_gateway: Arc<InMemoryPaymentGateway>,
        pub messaging: Arc<InMemoryMessagingGateway>,
        pub payments: Arc<PaymentVerifier>,
        pub tokens: PassTokenService,
        pub locks: Arc<DeliveryLockManager>,
        pub dispatcher: Arc<NotificationDispatcher>,
        pub register: Arc<RegisterHandler>,
        pub confirm_payment: Arc<ConfirmPaymentHandler>,
        pub check_in: Arc<CheckInHandler>,
        pub scan_pass: Arc<ScanPassHandler>,
        pub cancel: Arc<CancelRegistrationHandler>,
        pub resend_pass: Arc<ResendPassHandler>,
        pub unlock_pass: Arc<UnlockPassHandler>,
    }

    impl Harness {
        pub fn new() -> Self {
            let registrations = Arc::new(InMemoryRegistrationStore::new());
            let events = Arc::new(InMemoryEventStore::new());
            let members = Arc::new(InMemoryMemberDirectory::new());
            let payment_gateway = Arc::new(InMemoryPaymentGateway::new());
            let messaging = Arc::new(InMemoryMessagingGateway::new());
            let tokens = PassTokenService::new(b"pass-token-secret").unwrap();

            let payments = Arc::new(PaymentVerifier::new(
                payment_gateway.clone(),
                SecretString::new(CALLBACK_SECRET.to_string()),
                "INR",
            ));
            let locks = Arc::new(DeliveryLockManager::new(registrations.clone()));
            let executor = Arc::new(DeliveryExecutor::new(
                locks.clone(),
                messaging.clone(),
                Duration::from_secs(5),
            ));
            let dispatcher = Arc::new(NotificationDispatcher::new(
                registrations.clone(),
                events.clone(),
                members.clone(),
                tokens.clone(),
                Arc::new(TextPassRenderer::new()),
                QueueHandle::unavailable("not configured"),
                locks.clone(),
                executor,
                DispatcherConfig::default(),
            ));

            Self {
                register: Arc::new(RegisterHandler::new(
                    registrations.clone(),
                    events.clone(),
                    members.clone(),
                    events.clone(),
                    payments.clone(),
                    dispatcher.clone(),
                )),
                confirm_payment: Arc::new(ConfirmPaymentHandler::new(
                    registrations.clone(),
                    events.clone(),
                    payments.clone(),
                    dispatcher.clone(),
                )),
                check_in: Arc::new(CheckInHandler::new(registrations.clone())),
                scan_pass: Arc::new(ScanPassHandler::new(tokens.clone(), registrations.clone())),
                cancel: Arc::new(CancelRegistrationHandler::new(
                    registrations.clone(),
                    events.clone(),
                    payments.clone(),
                )),
                resend_pass: Arc::new(ResendPassHandler::new(
                    registrations.clone(),
                    locks.clone(),
                    dispatcher.clone(),
                )),
                unlock_pass: Arc::new(UnlockPassHandler::new(locks.clone())),
                registrations,
                events,
                members,
                payment_gateway,
                messaging,
                payments,
                tokens,
                locks,
                dispatcher,
            }
        }

        pub fn add_event(&self, id: i64, fee_major: f64, max_attendees: Option<i32>) {
            self.events.add_event(Event {
                id: EventId::new(id),
                name: format!("Event {}", id),
                fee: Money::from_minor((fee_major * 100.0).round() as i64).unwrap(),
                max_attendees,
                current_attendees: 0,
            });
        }

        pub fn add_member(&self, id: i64, phone: &str) {
            self.members.add_member(Member {
                id: MemberId::new(id),
                name: format!("Member {}", id),
                phone: phone.to_string(),
                business_type: None,
            });
        }

        pub async fn register(
            &self,
            event_id: i64,
            member_id: i64,
        ) -> Result<RegisterResult, RegistrationError> {
            self.register
                .handle(RegisterCommand {
                    event_id: EventId::new(event_id),
                    member_id: MemberId::new(member_id),
                })
                .await
        }

        pub async fn confirm(
            &self,
            registration: &Registration,
            payment_id: &str,
        ) -> Result<ConfirmPaymentResult, RegistrationError> {
            let order_id = registration.payment_order_id.clone().unwrap_or_default();
            self.confirm_order(&order_id, payment_id).await
        }

        pub async fn confirm_order(
            &self,
            order_id: &str,
            payment_id: &str,
        ) -> Result<ConfirmPaymentResult, RegistrationError> {
            self.confirm_payment
                .handle(ConfirmPaymentCommand {
                    order_id: order_id.to_string(),
                    payment_id: payment_id.to_string(),
                    signature: sign_callback(CALLBACK_SECRET, order_id, payment_id),
                })
                .await
        }

        pub async fn registration(&self, id: RegistrationId) -> Registration {
            self.registrations.find_by_id(id).await.unwrap().unwrap()
        }

        /// Waits for the background dispatch to mark the pass sent.
        pub async fn wait_for_delivery(&self, id: RegistrationId) {
            for _ in 0..200 {
                if self.locks.peek(id).await.unwrap().is_sent() {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            panic!("pass for registration {} was never delivered", id);
        }
    }
}
