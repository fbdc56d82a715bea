//! Registration aggregate entity.
//!
//! A Registration binds one member to one event. It moves through the
//! attendance and payment state machines and carries the pass delivery
//! marker.
//!
//! # Design Decisions
//!
//! - **Never deleted**: cancellation is a state, rows stay for audit
//! - **Money in minor units**: all amounts are `Money` (paise)
//! - **Optimistic concurrency**: `version` guards every lifecycle write;
//!   delivery marker writes go through their own conditional updates

use crate::domain::foundation::{
    DomainError, ErrorCode, EventId, MemberId, Money, RegistrationId, StateMachine, Timestamp,
};
use serde::{Deserialize, Serialize};

use super::{AttendanceStatus, DeliveryState, PaymentStatus};

/// Registration aggregate.
///
/// # Invariants
///
/// - `cancelled` is terminal for attendance, `refunded` for payment
/// - `amount_paid` and `payment_id` are set once, on the first confirmation
/// - `delivery.sent_at` once set is never cleared
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub id: RegistrationId,
    pub event_id: EventId,

    /// None once the member record has been removed.
    pub member_id: Option<MemberId>,

    pub status: AttendanceStatus,
    pub payment_status: PaymentStatus,

    /// Fee quoted when the order was created.
    pub amount_due: Money,
    pub amount_paid: Option<Money>,
    pub payment_order_id: Option<String>,
    pub payment_id: Option<String>,
    pub refund_id: Option<String>,
    pub amount_refunded: Option<Money>,

    pub registered_at: Timestamp,
    pub attended_at: Option<Timestamp>,
    pub cancelled_at: Option<Timestamp>,

    pub delivery: DeliveryState,

    /// Optimistic concurrency counter.
    pub version: i64,
}

/// A registration that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRegistration {
    pub event_id: EventId,
    pub member_id: MemberId,
    pub payment_status: PaymentStatus,
    pub amount_due: Money,
    pub payment_order_id: Option<String>,
    pub registered_at: Timestamp,
}

impl NewRegistration {
    /// Registration awaiting payment of `amount_due` against `order_id`.
    pub fn pending(
        event_id: EventId,
        member_id: MemberId,
        amount_due: Money,
        order_id: impl Into<String>,
    ) -> Self {
        Self {
            event_id,
            member_id,
            payment_status: PaymentStatus::Pending,
            amount_due,
            payment_order_id: Some(order_id.into()),
            registered_at: Timestamp::now(),
        }
    }

    /// Registration for a free event, settled immediately.
    pub fn free(event_id: EventId, member_id: MemberId) -> Self {
        Self {
            event_id,
            member_id,
            payment_status: PaymentStatus::Free,
            amount_due: Money::ZERO,
            payment_order_id: None,
            registered_at: Timestamp::now(),
        }
    }

    /// Materializes the stored aggregate once the store assigned an id.
    pub fn into_registration(self, id: RegistrationId) -> Registration {
        Registration {
            id,
            event_id: self.event_id,
            member_id: Some(self.member_id),
            status: AttendanceStatus::Registered,
            payment_status: self.payment_status,
            amount_due: self.amount_due,
            amount_paid: None,
            payment_order_id: self.payment_order_id,
            payment_id: None,
            refund_id: None,
            amount_refunded: None,
            registered_at: self.registered_at,
            attended_at: None,
            cancelled_at: None,
            delivery: DeliveryState::default(),
            version: 1,
        }
    }
}

/// Result of a check-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckIn {
    pub attended_at: Timestamp,

    /// True when the registration was already checked in before this call.
    pub already_checked_in: bool,
}

impl Registration {
    /// Returns true unless the registration was cancelled.
    pub fn is_live(&self) -> bool {
        self.status != AttendanceStatus::Cancelled
    }

    /// Returns true if this registration currently occupies a seat.
    pub fn is_counted(&self) -> bool {
        self.is_live() && self.payment_status.counts_toward_capacity()
    }

    /// Replaces the payment order of a live pending registration.
    ///
    /// # Errors
    ///
    /// Returns error unless the registration is live and pending.
    pub fn reissue_order(
        &mut self,
        order_id: impl Into<String>,
        amount_due: Money,
    ) -> Result<(), DomainError> {
        self.ensure_live("reissue an order for")?;
        if self.payment_status != PaymentStatus::Pending {
            return Err(self.payment_state_error("reissue an order for"));
        }
        self.payment_order_id = Some(order_id.into());
        self.amount_due = amount_due;
        Ok(())
    }

    /// Settles a live pending registration whose event turned out to be free.
    pub fn settle_free(&mut self) -> Result<(), DomainError> {
        self.ensure_live("settle")?;
        self.transition_payment(PaymentStatus::Free, "settle")?;
        self.amount_due = Money::ZERO;
        self.payment_order_id = None;
        Ok(())
    }

    /// Records a verified payment.
    ///
    /// # Errors
    ///
    /// Returns error if cancelled or if payment is not pending.
    pub fn confirm_payment(
        &mut self,
        payment_id: impl Into<String>,
        amount: Money,
    ) -> Result<(), DomainError> {
        self.ensure_live("confirm payment for")?;
        self.transition_payment(PaymentStatus::Paid, "confirm payment for")?;
        self.payment_id = Some(payment_id.into());
        self.amount_paid = Some(amount);
        Ok(())
    }

    /// Puts a confirmed payment back to pending when no seat could be
    /// taken for it. This steps outside the payment state machine and is
    /// only valid before any refund or check-in.
    ///
    /// # Errors
    ///
    /// Returns error unless the payment is paid and nothing has followed it.
    pub fn revert_payment(&mut self) -> Result<(), DomainError> {
        if self.payment_status != PaymentStatus::Paid
            || self.refund_id.is_some()
            || self.status != AttendanceStatus::Registered
        {
            return Err(self.payment_state_error("revert payment for"));
        }
        self.payment_status = PaymentStatus::Pending;
        self.payment_id = None;
        self.amount_paid = None;
        Ok(())
    }

    /// Checks the attendee in. Idempotent: a second call returns the
    /// original check-in time.
    ///
    /// # Errors
    ///
    /// Returns error if cancelled or if the fee was never settled.
    pub fn check_in(&mut self, at: Timestamp) -> Result<CheckIn, DomainError> {
        if self.status == AttendanceStatus::Attended {
            if let Some(attended_at) = self.attended_at {
                return Ok(CheckIn {
                    attended_at,
                    already_checked_in: true,
                });
            }
        }
        self.ensure_live("check in")?;
        if !self.payment_status.counts_toward_capacity() {
            return Err(self.payment_state_error("check in"));
        }
        self.transition_attendance(AttendanceStatus::Attended, "check in")?;
        self.attended_at = Some(at);
        Ok(CheckIn {
            attended_at: at,
            already_checked_in: false,
        })
    }

    /// Cancels the registration.
    ///
    /// Returns true if the registration occupied a seat before the call, in
    /// which case the caller must release it.
    pub fn cancel(&mut self, at: Timestamp) -> Result<bool, DomainError> {
        let was_counted = self.is_counted();
        self.transition_attendance(AttendanceStatus::Cancelled, "cancel")?;
        self.cancelled_at = Some(at);
        Ok(was_counted)
    }

    /// Amount that can be refunded, if a valid payment exists.
    pub fn refundable_amount(&self) -> Option<Money> {
        match (self.payment_status, &self.payment_id, self.amount_paid) {
            (PaymentStatus::Paid, Some(_), Some(paid)) if !paid.is_zero() => Some(paid),
            _ => None,
        }
    }

    /// Records a processed refund.
    pub fn record_refund(
        &mut self,
        refund_id: impl Into<String>,
        amount: Money,
    ) -> Result<(), DomainError> {
        self.transition_payment(PaymentStatus::Refunded, "refund")?;
        self.refund_id = Some(refund_id.into());
        self.amount_refunded = Some(amount);
        Ok(())
    }

    /// Advances the version after a successful conditional write.
    pub fn mark_committed(&mut self) {
        self.version += 1;
    }

    fn ensure_live(&self, attempted: &str) -> Result<(), DomainError> {
        if self.is_live() {
            Ok(())
        } else {
            Err(DomainError::new(ErrorCode::InvalidStateTransition, attempted)
                .with_detail("current", self.status.as_str()))
        }
    }

    fn payment_state_error(&self, attempted: &str) -> DomainError {
        DomainError::new(ErrorCode::InvalidStateTransition, attempted)
            .with_detail("current", format!("payment {}", self.payment_status))
    }

    fn transition_attendance(
        &mut self,
        target: AttendanceStatus,
        attempted: &str,
    ) -> Result<(), DomainError> {
        self.status = self.status.transition_to(target).map_err(|_| {
            DomainError::new(ErrorCode::InvalidStateTransition, attempted)
                .with_detail("current", self.status.as_str())
        })?;
        Ok(())
    }

    fn transition_payment(
        &mut self,
        target: PaymentStatus,
        attempted: &str,
    ) -> Result<(), DomainError> {
        self.payment_status = self
            .payment_status
            .transition_to(target)
            .map_err(|_| self.payment_state_error(attempted))?;
        Ok(())
    }
}
