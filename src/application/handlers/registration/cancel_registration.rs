//! CancelRegistrationHandler - Command handler for cancellation with an
//! optional refund.
//!
//! Only the caller whose versioned cancel write wins may release the seat
//! and issue the refund, so concurrent cancellations never double-refund.

use std::collections::HashMap;
use std::sync::Arc;

use crate::application::PaymentVerifier;
use crate::domain::foundation::{Money, RegistrationId, Timestamp};
use crate::domain::registration::{AttendanceStatus, Registration, RegistrationError};
use crate::ports::{CapacityController, Refund, RegistrationRepository};

use super::concurrent_modification;

/// Command to cancel a registration.
#[derive(Debug, Clone)]
pub struct CancelRegistrationCommand {
    pub registration_id: RegistrationId,

    /// Refund in major units. None means no refund.
    pub refund_amount: Option<f64>,

    pub reason: Option<String>,
}

/// What happened to the requested refund.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefundOutcome {
    NotRequested,
    Processed(Refund),

    /// The registration is cancelled but the refund did not go through.
    /// `retryable` is set when the gateway was unreachable rather than
    /// refusing.
    Failed { reason: String, retryable: bool },
}

#[derive(Debug, Clone)]
pub struct CancelRegistrationResult {
    pub registration: Registration,
    pub refund: RefundOutcome,
}

pub struct CancelRegistrationHandler {
    registrations: Arc<dyn RegistrationRepository>,
    capacity: Arc<dyn CapacityController>,
    payments: Arc<PaymentVerifier>,
}

impl CancelRegistrationHandler {
    pub fn new(
        registrations: Arc<dyn RegistrationRepository>,
        capacity: Arc<dyn CapacityController>,
        payments: Arc<PaymentVerifier>,
    ) -> Self {
        Self {
            registrations,
            capacity,
            payments,
        }
    }

    pub async fn handle(
        &self,
        cmd: CancelRegistrationCommand,
    ) -> Result<CancelRegistrationResult, RegistrationError> {
        let id = cmd.registration_id;
        let mut registration = self
            .registrations
            .find_by_id(id)
            .await?
            .ok_or_else(|| RegistrationError::registration_not_found(id))?;

        // 1. Validate the refund before any state changes
        let refund = match cmd.refund_amount {
            None => None,
            Some(requested) => {
                let requested = Money::from_major(requested)?;
                let paid = registration.refundable_amount().ok_or_else(|| {
                    RegistrationError::refund_not_allowed("registration has no captured payment")
                })?;
                if requested > paid {
                    return Err(RegistrationError::refund_exceeds_paid(requested, paid));
                }
                Some((requested, paid))
            }
        };

        // 2. Win the cancel transition
        let was_counted = registration.cancel(Timestamp::now())?;
        if !self.registrations.update_if_version(&registration).await? {
            let current = self.registrations.find_by_id(id).await?;
            if current.map(|r| r.status) == Some(AttendanceStatus::Cancelled) {
                return Err(RegistrationError::invalid_state("cancelled", "cancel"));
            }
            return Err(concurrent_modification(id, "cancel"));
        }
        registration.mark_committed();

        // 3. Give the seat back
        if was_counted {
            self.capacity.release(registration.event_id).await?;
        }
        tracing::info!(registration_id = %id, was_counted, "Registration cancelled");

        // 4. Refund, as the sole winner
        let outcome = match refund {
            None => RefundOutcome::NotRequested,
            Some((amount, paid)) => self.refund(&mut registration, amount, paid, &cmd).await?,
        };

        Ok(CancelRegistrationResult {
            registration,
            refund: outcome,
        })
    }

    async fn refund(
        &self,
        registration: &mut Registration,
        amount: Money,
        paid: Money,
        cmd: &CancelRegistrationCommand,
    ) -> Result<RefundOutcome, RegistrationError> {
        let Some(payment_id) = registration.payment_id.clone() else {
            return Ok(RefundOutcome::Failed {
                reason: "payment id missing".to_string(),
                retryable: false,
            });
        };

        let mut notes = HashMap::new();
        notes.insert("registration_id".to_string(), registration.id.to_string());
        if let Some(reason) = &cmd.reason {
            notes.insert("reason".to_string(), reason.clone());
        }

        let refund = match self.payments.refund(&payment_id, amount, paid, notes).await {
            Ok(refund) => refund,
            Err(err) => {
                tracing::error!(
                    registration_id = %registration.id,
                    error = %err,
                    "Refund failed after cancellation"
                );
                return Ok(RefundOutcome::Failed {
                    reason: err.message(),
                    retryable: err.is_retryable(),
                });
            }
        };

        registration.record_refund(refund.id.clone(), refund.amount)?;
        if self.registrations.update_if_version(registration).await? {
            registration.mark_committed();
        } else {
            tracing::error!(
                registration_id = %registration.id,
                refund_id = %refund.id,
                "Refund processed but not recorded"
            );
        }
        tracing::info!(registration_id = %registration.id, refund_id = %refund.id, amount = %refund.amount, "Refund processed");

        Ok(RefundOutcome::Processed(refund))
    }
}
