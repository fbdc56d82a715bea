//! PaymentVerifier - order creation, callback verification, and refunds.
//!
//! Wraps the payment gateway port with the local checks that must happen
//! before any money moves: amount validation, callback signature
//! verification, and the refund ceiling.

use std::collections::HashMap;
use std::sync::Arc;

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::domain::foundation::Money;
use crate::domain::registration::RegistrationError;
use crate::ports::{CreateOrderRequest, Order, PaymentError, PaymentGateway, Refund, RefundRequest};

/// Verifies and brokers payment operations.
pub struct PaymentVerifier {
    gateway: Arc<dyn PaymentGateway>,
    callback_secret: SecretString,
    currency: String,
}

impl PaymentVerifier {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        callback_secret: SecretString,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            gateway,
            callback_secret,
            currency: currency.into(),
        }
    }

    /// Creates an order for an amount given in major units (e.g. rupees).
    ///
    /// # Errors
    ///
    /// - `Validation` if the amount is not a positive finite number
    /// - `Gateway` if the gateway call fails
    pub async fn create_order(
        &self,
        amount_major: f64,
        reference: &str,
    ) -> Result<Order, RegistrationError> {
        let amount = Money::from_major(amount_major)?;
        self.gateway
            .create_order(CreateOrderRequest {
                amount,
                currency: self.currency.clone(),
                receipt: reference.to_string(),
            })
            .await
            .map_err(|e| {
                tracing::warn!(reference, error = %e, "Payment order creation failed");
                gateway_error("order creation", e)
            })
    }

    /// Verifies a payment callback signature.
    ///
    /// The signature is hex HMAC-SHA256 over `order_id|payment_id`. Any
    /// missing field fails verification.
    pub fn verify_callback(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        if order_id.is_empty() || payment_id.is_empty() || signature.is_empty() {
            return false;
        }
        let Ok(provided) = hex::decode(signature.trim()) else {
            return false;
        };
        let Some(expected) =
            callback_mac(self.callback_secret.expose_secret(), order_id, payment_id)
        else {
            return false;
        };
        constant_time_compare(&expected, &provided)
    }

    /// Refunds `amount` of a payment of `paid`.
    ///
    /// The ceiling is enforced before the gateway is contacted.
    ///
    /// # Errors
    ///
    /// - `RefundExceedsPaidAmount` if `amount > paid`
    /// - `Validation` for a zero amount
    /// - `Gateway` with `GatewayFailure::Rejected` if the gateway refuses
    ///   the refund, `GatewayFailure::Unreachable` if it never answered
    pub async fn refund(
        &self,
        payment_id: &str,
        amount: Money,
        paid: Money,
        notes: HashMap<String, String>,
    ) -> Result<Refund, RegistrationError> {
        if amount.is_zero() {
            return Err(RegistrationError::validation(
                "refund_amount",
                "must be greater than zero",
            ));
        }
        if amount > paid {
            return Err(RegistrationError::refund_exceeds_paid(amount, paid));
        }

        self.gateway
            .refund(RefundRequest {
                payment_id: payment_id.to_string(),
                amount,
                notes,
            })
            .await
            .map_err(|e| {
                tracing::warn!(payment_id, error = %e, gateway_reported = e.is_gateway_reported(), "Refund failed");
                gateway_error("refund", e)
            })
    }
}

fn gateway_error(operation: &str, err: PaymentError) -> RegistrationError {
    let message = format!("{}: {}", operation, err.message);
    if err.is_gateway_reported() {
        RegistrationError::gateway_rejected(message)
    } else {
        RegistrationError::gateway_unreachable(message)
    }
}

fn callback_mac(secret: &str, order_id: &str, payment_id: &str) -> Option<Vec<u8>> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(order_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());
    Some(mac.finalize().into_bytes().to_vec())
}

/// Constant-time comparison to prevent timing attacks.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Computes the hex callback signature the gateway would send.
///
/// Used by the in-memory gateway and by tests to simulate callbacks.
pub fn sign_callback(secret: &str, order_id: &str, payment_id: &str) -> String {
    callback_mac(secret, order_id, payment_id)
        .map(hex::encode)
        .unwrap_or_default()
}
