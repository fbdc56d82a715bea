//! Payment configuration (Razorpay)

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Payment gateway configuration
#[derive(Debug, Deserialize)]
pub struct PaymentConfig {
    /// Razorpay key id (`rzp_test_...` or `rzp_live_...`)
    pub key_id: String,

    /// Razorpay key secret, used for API basic auth
    pub key_secret: SecretString,

    /// Secret the checkout callback signature is computed with.
    /// Razorpay uses the key secret here; a separate value is allowed.
    #[serde(default)]
    pub callback_secret: Option<SecretString>,

    /// ISO 4217 currency for new orders
    #[serde(default = "default_currency")]
    pub currency: String,

    /// API base URL, overridable for sandboxes
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Gateway request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl PaymentConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Check if using Razorpay test mode
    pub fn is_test_mode(&self) -> bool {
        self.key_id.starts_with("rzp_test_")
    }

    /// Secret for verifying checkout callbacks.
    pub fn callback_secret(&self) -> SecretString {
        let secret = self
            .callback_secret
            .as_ref()
            .unwrap_or(&self.key_secret)
            .expose_secret()
            .clone();
        SecretString::new(secret)
    }

    /// Validate payment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.key_id.is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT__KEY_ID"));
        }
        if self.key_secret.expose_secret().is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT__KEY_SECRET"));
        }
        if !self.key_id.starts_with("rzp_") {
            return Err(ValidationError::InvalidRazorpayKey);
        }
        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(ValidationError::InvalidCurrency(self.currency.clone()));
        }
        if self.timeout_secs == 0 || self.timeout_secs > 120 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

fn default_currency() -> String {
    "INR".to_string()
}

fn default_api_base_url() -> String {
    "https://api.razorpay.com".to_string()
}

fn default_timeout() -> u64 {
    15
}
