//! Payment gateway port.
//!
//! Defines the contract for the order-based payment gateway: create an
//! order the payer settles out of band, and refund a settled payment.
//! Callback signature verification happens locally and is not part of
//! this port.

use crate::domain::foundation::{DomainError, Money};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Port for payment gateway integrations.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a payment order for `amount` (minor units).
    async fn create_order(&self, request: CreateOrderRequest) -> Result<Order, PaymentError>;

    /// Refund `amount` (minor units) of a settled payment.
    async fn refund(&self, request: RefundRequest) -> Result<Refund, PaymentError>;
}

/// Request to create an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub amount: Money,
    pub currency: String,

    /// Merchant-side reference shown on the gateway dashboard.
    pub receipt: String,
}

/// Order created by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub amount: Money,
    pub currency: String,
    pub status: String,
}

/// Request to refund a payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundRequest {
    pub payment_id: String,
    pub amount: Money,
    pub notes: HashMap<String, String>,
}

/// Refund processed by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Refund {
    pub id: String,
    pub amount: Money,
    pub status: String,
}

/// Errors from payment gateway operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentError {
    /// Error code for categorization.
    pub code: PaymentErrorCode,

    /// Human-readable message.
    pub message: String,

    /// Gateway's error code (if available).
    pub provider_code: Option<String>,

    /// Whether the operation can be retried.
    pub retryable: bool,
}

impl PaymentError {
    pub fn new(code: PaymentErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
            retryable: code.is_retryable(),
        }
    }

    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    /// Transport failure: the gateway may or may not have seen the request.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::NetworkError, message)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::AuthenticationError, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::InvalidRequest, message)
    }

    /// The gateway answered and refused the operation.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::GatewayRejected, message)
    }

    /// Returns true if the failure was reported by the gateway itself.
    pub fn is_gateway_reported(&self) -> bool {
        !matches!(self.code, PaymentErrorCode::NetworkError)
    }
}

impl std::fmt::Display for PaymentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for PaymentError {}

impl From<PaymentError> for DomainError {
    fn from(err: PaymentError) -> Self {
        use crate::domain::foundation::ErrorCode;

        let mut domain = DomainError::new(ErrorCode::PaymentGatewayError, err.message)
            .with_detail("payment_error", err.code.to_string());
        if let Some(provider_code) = err.provider_code {
            domain = domain.with_detail("provider_code", provider_code);
        }
        domain
    }
}

/// Payment error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentErrorCode {
    /// Network connectivity issue.
    NetworkError,

    /// API authentication failed.
    AuthenticationError,

    /// Request rejected as malformed.
    InvalidRequest,

    /// Gateway refused the operation (e.g. refund above captured amount).
    GatewayRejected,

    /// Rate limit exceeded.
    RateLimitExceeded,

    /// Unknown error.
    Unknown,
}

impl PaymentErrorCode {
    /// Check if this error type is typically retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentErrorCode::NetworkError | PaymentErrorCode::RateLimitExceeded
        )
    }
}

impl std::fmt::Display for PaymentErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentErrorCode::NetworkError => "network_error",
            PaymentErrorCode::AuthenticationError => "authentication_error",
            PaymentErrorCode::InvalidRequest => "invalid_request",
            PaymentErrorCode::GatewayRejected => "gateway_rejected",
            PaymentErrorCode::RateLimitExceeded => "rate_limit_exceeded",
            PaymentErrorCode::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::ErrorCode;

    #[test]
    fn payment_gateway_is_object_safe() {
        fn _accepts_dyn(_gateway: &dyn PaymentGateway) {}
    }

    #[test]
    fn network_errors_are_retryable_and_not_gateway_reported() {
        let err = PaymentError::network("connection reset");
        assert!(err.retryable);
        assert!(!err.is_gateway_reported());
    }

    #[test]
    fn rejected_errors_are_gateway_reported() {
        let err = PaymentError::rejected("amount exceeds captured").with_provider_code("BAD_REQUEST_ERROR");
        assert!(!err.retryable);
        assert!(err.is_gateway_reported());
        assert_eq!(err.to_string(), "gateway_rejected: amount exceeds captured");
    }

    #[test]
    fn converts_to_domain_error_with_details() {
        let domain: DomainError = PaymentError::rejected("nope")
            .with_provider_code("BAD_REQUEST_ERROR")
            .into();
        assert_eq!(domain.code, ErrorCode::PaymentGatewayError);
        assert_eq!(
            domain.details.get("provider_code").map(String::as_str),
            Some("BAD_REQUEST_ERROR")
        );
    }
}
