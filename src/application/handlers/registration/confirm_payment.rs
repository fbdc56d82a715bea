//! ConfirmPaymentHandler - Command handler for payment gateway callbacks.
//!
//! Callbacks may arrive more than once and concurrently. The versioned
//! write from pending to paid picks a single winner; only the winner
//! reserves a seat, and every other caller reports the stored outcome.
//! When the event is full the winner writes the row back to pending.

use std::sync::Arc;

use crate::application::delivery::NotificationDispatcher;
use crate::application::PaymentVerifier;
use crate::domain::registration::{PaymentStatus, Registration, RegistrationError};
use crate::ports::{CapacityController, RegistrationRepository};

use super::concurrent_modification;

const REVERT_ATTEMPTS: usize = 3;

/// Command carrying a payment callback.
#[derive(Debug, Clone)]
pub struct ConfirmPaymentCommand {
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
}

/// Result of a confirmation.
#[derive(Debug, Clone)]
pub struct ConfirmPaymentResult {
    pub registration: Registration,

    /// False when the payment had already been recorded.
    pub newly_confirmed: bool,
}

pub struct ConfirmPaymentHandler {
    registrations: Arc<dyn RegistrationRepository>,
    capacity: Arc<dyn CapacityController>,
    payments: Arc<PaymentVerifier>,
    dispatcher: Arc<NotificationDispatcher>,
}

impl ConfirmPaymentHandler {
    pub fn new(
        registrations: Arc<dyn RegistrationRepository>,
        capacity: Arc<dyn CapacityController>,
        payments: Arc<PaymentVerifier>,
        dispatcher: Arc<NotificationDispatcher>,
    ) -> Self {
        Self {
            registrations,
            capacity,
            payments,
            dispatcher,
        }
    }

    pub async fn handle(
        &self,
        cmd: ConfirmPaymentCommand,
    ) -> Result<ConfirmPaymentResult, RegistrationError> {
        // 1. Verify the callback before touching anything
        if !self
            .payments
            .verify_callback(&cmd.order_id, &cmd.payment_id, &cmd.signature)
        {
            tracing::warn!(order_id = %cmd.order_id, "Payment callback signature rejected");
            return Err(RegistrationError::PaymentSignature);
        }

        // 2. Load the registration that owns the order
        let mut registration = self.load(&cmd.order_id).await?;

        // 3. Duplicate callback
        if let Some(result) = already_confirmed(&registration, &cmd) {
            return Ok(result);
        }
        if !registration.is_live() {
            return Err(RegistrationError::invalid_state(
                registration.status.as_str(),
                "confirm payment for",
            ));
        }
        if registration.payment_status != PaymentStatus::Pending {
            return Err(RegistrationError::invalid_state(
                format!("payment {}", registration.payment_status),
                "confirm payment for",
            ));
        }

        // 4. Record the payment; only the caller whose versioned write
        //    lands goes on to take a seat
        let event_id = registration.event_id;
        let amount = registration.amount_due;
        registration.confirm_payment(cmd.payment_id.clone(), amount)?;
        if !self.registrations.update_if_version(&registration).await? {
            let current = self.load(&cmd.order_id).await?;
            return already_confirmed(&current, &cmd)
                .ok_or_else(|| concurrent_modification(current.id, "confirm payment for"));
        }
        registration.mark_committed();

        // 5. Take a seat, or put the row back to pending
        let reserved = match self.capacity.try_reserve(event_id).await {
            Ok(reserved) => reserved,
            Err(err) => {
                self.revert(registration).await?;
                return Err(err.into());
            }
        };
        if !reserved {
            tracing::warn!(
                registration_id = %registration.id,
                payment_id = %cmd.payment_id,
                "Payment captured for a full event"
            );
            self.revert(registration).await?;
            return Err(RegistrationError::capacity_exceeded(event_id));
        }

        tracing::info!(
            registration_id = %registration.id,
            event_id = %event_id,
            amount = %amount,
            "Payment confirmed"
        );

        // 6. Deliver the pass in the background
        self.dispatcher.spawn(registration.id);

        Ok(ConfirmPaymentResult {
            registration,
            newly_confirmed: true,
        })
    }

    /// Undoes a committed confirmation that never got a seat.
    ///
    /// A cancellation that lands between the confirmation and the reserve
    /// has already released a seat on this registration's behalf, so the
    /// seat is taken back instead of reverting the row.
    async fn revert(&self, mut registration: Registration) -> Result<(), RegistrationError> {
        for _ in 0..REVERT_ATTEMPTS {
            if !registration.is_live() {
                if !self.capacity.try_reserve(registration.event_id).await? {
                    tracing::error!(
                        registration_id = %registration.id,
                        event_id = %registration.event_id,
                        "Attendee count is one low after a cancelled confirmation"
                    );
                }
                return Ok(());
            }
            registration.revert_payment()?;
            if self.registrations.update_if_version(&registration).await? {
                tracing::info!(
                    registration_id = %registration.id,
                    "Confirmation reverted to pending"
                );
                return Ok(());
            }
            registration = self
                .registrations
                .find_by_id(registration.id)
                .await?
                .ok_or_else(|| RegistrationError::registration_not_found(registration.id))?;
        }
        Err(concurrent_modification(registration.id, "revert payment for"))
    }

    async fn load(&self, order_id: &str) -> Result<Registration, RegistrationError> {
        self.registrations
            .find_by_order_id(order_id)
            .await?
            .ok_or_else(|| RegistrationError::order_not_found(order_id))
    }
}

fn already_confirmed(
    registration: &Registration,
    cmd: &ConfirmPaymentCommand,
) -> Option<ConfirmPaymentResult> {
    if registration.payment_status != PaymentStatus::Paid {
        return None;
    }
    if registration.payment_id.as_deref() != Some(cmd.payment_id.as_str()) {
        tracing::warn!(
            registration_id = %registration.id,
            payment_id = %cmd.payment_id,
            "Second payment reported for an already paid order"
        );
    }
    Some(ConfirmPaymentResult {
        registration: registration.clone(),
        newly_confirmed: false,
    })
}
