//! Data Transfer Objects for registration endpoints.
//!
//! Amounts leave the service in both minor units and major units so
//! clients never have to know the currency exponent.

use serde::{Deserialize, Serialize};

use crate::application::handlers::registration::{
    CheckInResult, RefundOutcome, ResendPassResult, UnlockPassResult,
};
use crate::domain::foundation::{Money, Timestamp};
use crate::domain::registration::Registration;
use crate::ports::Order;

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Request to register a member for an event.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub member_id: i64,
}

/// Payment gateway callback after checkout.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentCallbackRequest {
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
}

/// Check-in by scanning a pass.
#[derive(Debug, Clone, Deserialize)]
pub struct ScanPassRequest {
    pub token: String,
}

/// Request to cancel a registration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CancelRegistrationRequest {
    /// Refund in major units. Omit to cancel without refunding.
    #[serde(default)]
    pub refund_amount: Option<f64>,

    #[serde(default)]
    pub reason: Option<String>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Amount in both unit systems.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AmountResponse {
    pub minor: i64,
    pub major: f64,
}

impl From<Money> for AmountResponse {
    fn from(money: Money) -> Self {
        Self {
            minor: money.minor_units(),
            major: money.major_units(),
        }
    }
}

/// Registration as seen by clients.
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationResponse {
    pub id: i64,
    pub event_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_id: Option<i64>,
    pub status: String,
    pub payment_status: String,
    pub amount_due: AmountResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_paid: Option<AmountResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_refunded: Option<AmountResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_order_id: Option<String>,
    pub registered_at: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attended_at: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pass_sent_at: Option<Timestamp>,
}

impl From<&Registration> for RegistrationResponse {
    fn from(registration: &Registration) -> Self {
        Self {
            id: registration.id.value(),
            event_id: registration.event_id.value(),
            member_id: registration.member_id.map(|m| m.value()),
            status: registration.status.as_str().to_string(),
            payment_status: registration.payment_status.as_str().to_string(),
            amount_due: registration.amount_due.into(),
            amount_paid: registration.amount_paid.map(AmountResponse::from),
            amount_refunded: registration.amount_refunded.map(AmountResponse::from),
            payment_order_id: registration.payment_order_id.clone(),
            registered_at: registration.registered_at,
            attended_at: registration.attended_at,
            cancelled_at: registration.cancelled_at,
            pass_sent_at: registration.delivery.sent_at,
        }
    }
}

/// Gateway order the client completes checkout against.
#[derive(Debug, Clone, Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub amount: AmountResponse,
    pub currency: String,
    pub status: String,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.clone(),
            amount: order.amount.into(),
            currency: order.currency.clone(),
            status: order.status.clone(),
        }
    }
}

/// Response for a new or reused registration.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterResponse {
    pub registration: RegistrationResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<OrderResponse>,
    pub reused: bool,
}

/// Response for a payment callback.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentCallbackResponse {
    pub registration: RegistrationResponse,
    pub newly_confirmed: bool,
}

/// Response for check-in by id or by pass scan.
#[derive(Debug, Clone, Serialize)]
pub struct CheckInResponse {
    pub registration_id: i64,
    pub attended_at: Timestamp,
    pub already_checked_in: bool,
}

impl From<CheckInResult> for CheckInResponse {
    fn from(result: CheckInResult) -> Self {
        Self {
            registration_id: result.registration_id.value(),
            attended_at: result.attended_at,
            already_checked_in: result.already_checked_in,
        }
    }
}

/// Refund part of a cancellation response.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RefundResponse {
    NotRequested,
    Processed { id: String, amount: AmountResponse },
    Failed { reason: String, retryable: bool },
}

impl From<&RefundOutcome> for RefundResponse {
    fn from(outcome: &RefundOutcome) -> Self {
        match outcome {
            RefundOutcome::NotRequested => RefundResponse::NotRequested,
            RefundOutcome::Processed(refund) => RefundResponse::Processed {
                id: refund.id.clone(),
                amount: refund.amount.into(),
            },
            RefundOutcome::Failed { reason, retryable } => RefundResponse::Failed {
                reason: reason.clone(),
                retryable: *retryable,
            },
        }
    }
}

/// Response for a cancellation.
#[derive(Debug, Clone, Serialize)]
pub struct CancelRegistrationResponse {
    pub registration: RegistrationResponse,
    pub refund: RefundResponse,
}

/// Response for an accepted pass resend.
#[derive(Debug, Clone, Serialize)]
pub struct ResendPassResponse {
    pub registration_id: i64,
    pub accepted: bool,
}

impl From<ResendPassResult> for ResendPassResponse {
    fn from(result: ResendPassResult) -> Self {
        Self {
            registration_id: result.registration_id.value(),
            accepted: result.accepted,
        }
    }
}

/// Response for an operator lock release.
#[derive(Debug, Clone, Serialize)]
pub struct UnlockPassResponse {
    pub registration_id: i64,
    pub released: bool,
}

impl From<UnlockPassResult> for UnlockPassResponse {
    fn from(result: UnlockPassResult) -> Self {
        Self {
            registration_id: result.registration_id.value(),
            released: result.released,
        }
    }
}

/// Liveness response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub queue_available: bool,
}

/// Error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional details (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(
        error_code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            details: Some(details),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{EventId, MemberId};
    use crate::domain::registration::NewRegistration;
    use crate::ports::Refund;

    fn pending_registration() -> Registration {
        NewRegistration::pending(
            EventId::new(3),
            MemberId::new(9),
            Money::from_minor(50_000).unwrap(),
            "order_000001".to_string(),
        )
        .into_registration(crate::domain::foundation::RegistrationId::new(12))
    }

    #[test]
    fn cancel_request_defaults_to_no_refund() {
        let request: CancelRegistrationRequest = serde_json::from_str("{}").unwrap();
        assert!(request.refund_amount.is_none());
        assert!(request.reason.is_none());
    }

    #[test]
    fn registration_response_carries_both_units() {
        let response = RegistrationResponse::from(&pending_registration());
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["id"], 12);
        assert_eq!(json["payment_status"], "pending");
        assert_eq!(json["amount_due"]["minor"], 50_000);
        assert_eq!(json["amount_due"]["major"], 500.0);
        assert!(json.get("amount_paid").is_none());
        assert!(json.get("pass_sent_at").is_none());
    }

    #[test]
    fn refund_response_is_tagged_by_status() {
        let processed = RefundResponse::from(&RefundOutcome::Processed(Refund {
            id: "rfnd_000001".to_string(),
            amount: Money::from_minor(20_000).unwrap(),
            status: "processed".to_string(),
        }));
        let json = serde_json::to_value(&processed).unwrap();
        assert_eq!(json["status"], "processed");
        assert_eq!(json["amount"]["minor"], 20_000);

        let skipped = serde_json::to_value(RefundResponse::from(&RefundOutcome::NotRequested))
            .unwrap();
        assert_eq!(skipped["status"], "not_requested");

        let failed = serde_json::to_value(RefundResponse::from(&RefundOutcome::Failed {
            reason: "gateway timeout".to_string(),
            retryable: true,
        }))
        .unwrap();
        assert_eq!(failed["status"], "failed");
        assert_eq!(failed["retryable"], true);
    }

    #[test]
    fn error_response_serializes_without_details_when_none() {
        let response = ErrorResponse::new("NOT_FOUND", "Not found");
        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("details"));
    }
}
