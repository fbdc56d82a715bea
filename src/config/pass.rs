//! Pass token configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;

/// Shortest accepted token secret, in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// Pass configuration
#[derive(Debug, Deserialize)]
pub struct PassConfig {
    /// HMAC key for pass tokens. Rotating it invalidates issued passes.
    pub token_secret: SecretString,

    /// Heading printed on rendered passes
    #[serde(default = "default_title")]
    pub title: String,
}

impl PassConfig {
    /// Validate pass configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        let secret = self.token_secret.expose_secret();
        if secret.is_empty() {
            return Err(ValidationError::MissingRequired("PASS__TOKEN_SECRET"));
        }
        if secret.len() < MIN_SECRET_LEN {
            return Err(ValidationError::PassSecretTooShort(MIN_SECRET_LEN));
        }
        Ok(())
    }
}

fn default_title() -> String {
    "EVENT PASS".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(secret: &str) -> PassConfig {
        PassConfig {
            token_secret: SecretString::new(secret.to_string()),
            title: default_title(),
        }
    }

    #[test]
    fn test_short_secret_rejected() {
        assert_eq!(
            config("short").validate(),
            Err(ValidationError::PassSecretTooShort(MIN_SECRET_LEN))
        );
        assert_eq!(
            config("").validate(),
            Err(ValidationError::MissingRequired("PASS__TOKEN_SECRET"))
        );
    }

    #[test]
    fn test_long_secret_accepted() {
        assert!(config(&"k".repeat(MIN_SECRET_LEN)).validate().is_ok());
    }
}
