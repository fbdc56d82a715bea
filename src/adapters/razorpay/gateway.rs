//! Razorpay payment gateway adapter.
//!
//! Implements the `PaymentGateway` trait over the Razorpay REST API with
//! HTTP basic auth. Callback signatures are verified by `PaymentVerifier`,
//! not here.
//!
//! # Security
//!
//! - Key secret held in `secrecy::SecretString`, exposed only for the auth header

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::domain::foundation::Money;
use crate::ports::{
    CreateOrderRequest, Order, PaymentError, PaymentErrorCode, PaymentGateway, Refund,
    RefundRequest,
};

use super::wire_types::{ErrorEnvelope, OrderBody, OrderResponse, RefundBody, RefundResponse};

/// Razorpay API configuration.
#[derive(Clone)]
pub struct RazorpayConfig {
    key_id: String,
    key_secret: SecretString,

    /// Base URL for the API (default: https://api.razorpay.com).
    api_base_url: String,

    request_timeout: Duration,
}

impl RazorpayConfig {
    pub fn new(key_id: impl Into<String>, key_secret: SecretString) -> Self {
        Self {
            key_id: key_id.into(),
            key_secret,
            api_base_url: "https://api.razorpay.com".to_string(),
            request_timeout: Duration::from_secs(15),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Razorpay payment gateway adapter.
pub struct RazorpayGateway {
    config: RazorpayConfig,
    http_client: reqwest::Client,
}

impl RazorpayGateway {
    pub fn new(config: RazorpayConfig) -> Result<Self, PaymentError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| PaymentError::new(PaymentErrorCode::Unknown, e.to_string()))?;
        Ok(Self {
            config,
            http_client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url, path)
    }

    async fn post<B: serde::Serialize + ?Sized>(
        &self,
        operation: &str,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response, PaymentError> {
        let response = self
            .http_client
            .post(self.url(path))
            .basic_auth(&self.config.key_id, Some(self.config.key_secret.expose_secret()))
            .json(body)
            .send()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_text = response.text().await.unwrap_or_default();
        tracing::error!(operation, status = status.as_u16(), error = %error_text, "Razorpay call failed");
        Err(map_error(status.as_u16(), &error_text))
    }
}

/// Maps a non-success response to a payment error.
fn map_error(status: u16, body: &str) -> PaymentError {
    let parsed = serde_json::from_str::<ErrorEnvelope>(body).ok();
    let description = parsed
        .as_ref()
        .and_then(|e| e.error.description.clone())
        .unwrap_or_else(|| format!("Razorpay API error (HTTP {})", status));

    let code = match status {
        401 | 403 => PaymentErrorCode::AuthenticationError,
        429 => PaymentErrorCode::RateLimitExceeded,
        400 | 404 | 422 => PaymentErrorCode::GatewayRejected,
        500..=599 => PaymentErrorCode::Unknown,
        _ => PaymentErrorCode::InvalidRequest,
    };

    let mut err = PaymentError::new(code, description);
    if let Some(provider_code) = parsed.and_then(|e| e.error.code) {
        err = err.with_provider_code(provider_code);
    }
    err
}

fn parse_amount(minor: i64) -> Result<Money, PaymentError> {
    Money::from_minor(minor).map_err(|e| {
        PaymentError::new(
            PaymentErrorCode::Unknown,
            format!("Razorpay returned an invalid amount: {}", e),
        )
    })
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    async fn create_order(&self, request: CreateOrderRequest) -> Result<Order, PaymentError> {
        let body = OrderBody {
            amount: request.amount.minor_units(),
            currency: &request.currency,
            receipt: &request.receipt,
        };
        let response = self.post("create_order", "/v1/orders", &body).await?;

        let order: OrderResponse = response.json().await.map_err(|e| {
            PaymentError::new(
                PaymentErrorCode::Unknown,
                format!("Failed to parse Razorpay order: {}", e),
            )
        })?;

        tracing::info!(order_id = %order.id, receipt = %request.receipt, "Razorpay order created");
        Ok(Order {
            id: order.id,
            amount: parse_amount(order.amount)?,
            currency: order.currency,
            status: order.status,
        })
    }

    async fn refund(&self, request: RefundRequest) -> Result<Refund, PaymentError> {
        let body = RefundBody {
            amount: request.amount.minor_units(),
            notes: &request.notes,
        };
        let path = format!("/v1/payments/{}/refund", request.payment_id);
        let response = self.post("refund", &path, &body).await?;

        let refund: RefundResponse = response.json().await.map_err(|e| {
            PaymentError::new(
                PaymentErrorCode::Unknown,
                format!("Failed to parse Razorpay refund: {}", e),
            )
        })?;

        tracing::info!(payment_id = %request.payment_id, refund_id = %refund.id, "Razorpay refund created");
        Ok(Refund {
            id: refund.id,
            amount: parse_amount(refund.amount)?,
            status: refund.status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_request_is_gateway_rejection_with_provider_code() {
        let body = r#"{"error":{"code":"BAD_REQUEST_ERROR","description":"The amount must be atleast INR 1.00"}}"#;
        let err = map_error(400, body);
        assert_eq!(err.code, PaymentErrorCode::GatewayRejected);
        assert_eq!(err.provider_code.as_deref(), Some("BAD_REQUEST_ERROR"));
        assert!(err.message.contains("atleast"));
        assert!(err.is_gateway_reported());
    }

    #[test]
    fn unauthorized_maps_to_authentication_error() {
        let err = map_error(401, "");
        assert_eq!(err.code, PaymentErrorCode::AuthenticationError);
        assert!(err.message.contains("401"));
    }

    #[test]
    fn rate_limit_is_retryable() {
        assert!(map_error(429, "{}").retryable);
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let config = RazorpayConfig::new("rzp_test", SecretString::new("s".to_string()))
            .with_base_url("http://localhost:9000/");
        let gateway = RazorpayGateway::new(config).unwrap();
        assert_eq!(gateway.url("/v1/orders"), "http://localhost:9000/v1/orders");
    }

    #[test]
    fn order_body_uses_minor_units() {
        let body = OrderBody {
            amount: Money::from_major(500.0).unwrap().minor_units(),
            currency: "INR",
            receipt: "evt1-mem2",
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["amount"], 50_000);
        assert_eq!(json["receipt"], "evt1-mem2");
    }
}
