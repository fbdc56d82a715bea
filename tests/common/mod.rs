//! Shared wiring for the integration tests.
//!
//! Every handler runs against the in-memory adapters, the same way the
//! server wires the Postgres and Redis ones.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;

use registration_desk::adapters::memory::{
    InMemoryEventStore, InMemoryMemberDirectory, InMemoryMessagingGateway, InMemoryPaymentGateway,
    InMemoryRegistrationStore,
};
use registration_desk::adapters::pass::TextPassRenderer;
use registration_desk::application::delivery::{
    DeliveryExecutor, DeliveryLockManager, DispatcherConfig, NotificationDispatcher, QueueHandle,
};
use registration_desk::application::handlers::registration::{
    CancelRegistrationCommand, CancelRegistrationHandler, CancelRegistrationResult,
    ConfirmPaymentCommand, ConfirmPaymentHandler, ConfirmPaymentResult, RegisterCommand,
    RegisterHandler, RegisterResult,
};
use registration_desk::application::{sign_callback, PaymentVerifier};
use registration_desk::domain::foundation::{EventId, MemberId, Money, RegistrationId};
use registration_desk::domain::pass::PassTokenService;
use registration_desk::domain::registration::{Event, Member, Registration, RegistrationError};
use registration_desk::ports::RegistrationRepository;

pub const CALLBACK_SECRET: &str = "integration-callback-secret";

pub struct Desk {
    pub registrations: Arc<InMemoryRegistrationStore>,
    pub events: Arc<InMemoryEventStore>,
    pub members: Arc<InMemoryMemberDirectory>,
    pub payment_gateway: Arc<InMemoryPaymentGateway>,
    pub messaging: Arc<InMemoryMessagingGateway>,
    pub locks: Arc<DeliveryLockManager>,
    pub executor: Arc<DeliveryExecutor>,
    pub dispatcher: Arc<NotificationDispatcher>,
    pub register: Arc<RegisterHandler>,
    pub confirm_payment: Arc<ConfirmPaymentHandler>,
    pub cancel: Arc<CancelRegistrationHandler>,
}

impl Desk {
    /// Inline delivery, instant messaging gateway.
    pub fn new() -> Self {
        Self::build(
            QueueHandle::unavailable("not configured"),
            InMemoryMessagingGateway::new(),
        )
    }

    pub fn build(queue: QueueHandle, messaging: InMemoryMessagingGateway) -> Self {
        let registrations = Arc::new(InMemoryRegistrationStore::new());
        let events = Arc::new(InMemoryEventStore::new());
        let members = Arc::new(InMemoryMemberDirectory::new());
        let payment_gateway = Arc::new(InMemoryPaymentGateway::new());
        let messaging = Arc::new(messaging);
        let tokens = PassTokenService::new(b"integration-pass-secret").unwrap();

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
            tokens,
            Arc::new(TextPassRenderer::new()),
            queue,
            locks.clone(),
            executor.clone(),
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
            cancel: Arc::new(CancelRegistrationHandler::new(
                registrations.clone(),
                events.clone(),
                payments,
            )),
            registrations,
            events,
            members,
            payment_gateway,
            messaging,
            locks,
            executor,
            dispatcher,
        }
    }

    pub fn add_event(&self, id: i64, fee_minor: i64, max_attendees: Option<i32>) {
        self.events.add_event(Event {
            id: EventId::new(id),
            name: format!("Chapter meet {}", id),
            fee: Money::from_minor(fee_minor).unwrap(),
            max_attendees,
            current_attendees: 0,
        });
    }

    pub fn add_member(&self, id: i64) {
        self.members.add_member(Member {
            id: MemberId::new(id),
            name: format!("Member {}", id),
            phone: format!("98450{:05}", id),
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
        self.confirm_payment
            .handle(confirm_command(registration, payment_id))
            .await
    }

    pub async fn cancel(
        &self,
        id: RegistrationId,
        refund_amount: Option<f64>,
    ) -> Result<CancelRegistrationResult, RegistrationError> {
        self.cancel
            .handle(CancelRegistrationCommand {
                registration_id: id,
                refund_amount,
                reason: Some("member request".to_string()),
            })
            .await
    }

    pub fn attendees(&self, event_id: i64) -> i32 {
        self.events.current_attendees(EventId::new(event_id))
    }

    pub async fn registration(&self, id: RegistrationId) -> Registration {
        self.registrations.find_by_id(id).await.unwrap().unwrap()
    }

    /// Waits until the pass is recorded as sent.
    pub async fn wait_for_delivery(&self, id: RegistrationId) {
        for _ in 0..400 {
            if self.locks.peek(id).await.unwrap().is_sent() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("pass for registration {} was never delivered", id);
    }
}

/// A correctly signed gateway callback for the registration's order.
pub fn confirm_command(registration: &Registration, payment_id: &str) -> ConfirmPaymentCommand {
    let order_id = registration.payment_order_id.clone().unwrap_or_default();
    ConfirmPaymentCommand {
        signature: sign_callback(CALLBACK_SECRET, &order_id, payment_id),
        order_id,
        payment_id: payment_id.to_string(),
    }
}
