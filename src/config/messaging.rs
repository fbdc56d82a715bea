//! Messaging gateway configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use super::server::Environment;

/// Chat messaging gateway configuration
#[derive(Debug, Deserialize)]
pub struct MessagingConfig {
    /// Send-document endpoint
    pub api_url: String,

    /// Bearer token for the gateway
    pub api_token: SecretString,

    /// Display name shown as the pass sender
    #[serde(default = "default_sender_name")]
    pub sender_name: String,

    /// Prefixed to bare national numbers
    #[serde(default = "default_country_code")]
    pub default_country_code: String,

    /// Upper bound on a single send, in seconds
    #[serde(default = "default_send_timeout")]
    pub send_timeout_secs: u64,
}

impl MessagingConfig {
    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_secs)
    }

    /// Validate messaging configuration
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if self.api_url.is_empty() {
            return Err(ValidationError::MissingRequired("MESSAGING__API_URL"));
        }
        if self.api_token.expose_secret().is_empty() {
            return Err(ValidationError::MissingRequired("MESSAGING__API_TOKEN"));
        }
        if *environment == Environment::Production && !self.api_url.starts_with("https://") {
            return Err(ValidationError::MessagingUrlMustBeHttps);
        }
        let code = &self.default_country_code;
        if code.is_empty() || code.len() > 3 || !code.chars().all(|c| c.is_ascii_digit()) {
            return Err(ValidationError::InvalidCountryCode(code.clone()));
        }
        if self.send_timeout_secs == 0 || self.send_timeout_secs > 120 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

fn default_sender_name() -> String {
    "Registration Desk".to_string()
}

fn default_country_code() -> String {
    "91".to_string()
}

fn default_send_timeout() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(api_url: &str) -> MessagingConfig {
        MessagingConfig {
            api_url: api_url.to_string(),
            api_token: SecretString::new("token".to_string()),
            sender_name: default_sender_name(),
            default_country_code: default_country_code(),
            send_timeout_secs: default_send_timeout(),
        }
    }

    #[test]
    fn test_plain_http_allowed_outside_production() {
        let cfg = config("http://localhost:3001/send");
        assert!(cfg.validate(&Environment::Development).is_ok());
        assert_eq!(
            cfg.validate(&Environment::Production),
            Err(ValidationError::MessagingUrlMustBeHttps)
        );
    }

    #[test]
    fn test_country_code_must_be_digits() {
        let mut cfg = config("https://chat.example.com/send");
        cfg.default_country_code = "+91".to_string();
        assert!(matches!(
            cfg.validate(&Environment::Development),
            Err(ValidationError::InvalidCountryCode(_))
        ));
    }

    #[test]
    fn test_send_timeout_bounds() {
        let mut cfg = config("https://chat.example.com/send");
        cfg.send_timeout_secs = 0;
        assert_eq!(
            cfg.validate(&Environment::Development),
            Err(ValidationError::InvalidTimeout)
        );
        cfg.send_timeout_secs = 10;
        assert_eq!(cfg.send_timeout(), Duration::from_secs(10));
    }
}
