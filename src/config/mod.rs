//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables using the
//! `config` and `dotenvy` crates. Variables use the `REGISTRATION_DESK`
//! prefix and `__` between nested names.
//!
//! # Example
//!
//! ```no_run
//! use registration_desk::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod database;
mod delivery;
mod error;
mod messaging;
mod pass;
mod payment;
mod redis;
mod server;

pub use database::DatabaseConfig;
pub use delivery::DeliveryConfig;
pub use error::{ConfigError, ValidationError};
pub use messaging::MessagingConfig;
pub use pass::PassConfig;
pub use payment::PaymentConfig;
pub use redis::RedisConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment, logging)
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration (PostgreSQL connection)
    pub database: DatabaseConfig,

    /// Redis configuration (optional delivery queue)
    #[serde(default)]
    pub redis: RedisConfig,

    /// Payment gateway configuration (Razorpay)
    pub payment: PaymentConfig,

    /// Chat messaging gateway configuration
    pub messaging: MessagingConfig,

    /// Pass token configuration
    pub pass: PassConfig,

    /// Delivery pipeline tuning
    #[serde(default)]
    pub delivery: DeliveryConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `REGISTRATION_DESK` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    ///
    /// # Environment Variable Format
    ///
    /// - `REGISTRATION_DESK__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `REGISTRATION_DESK__PAYMENT__KEY_ID=...` -> `payment.key_id = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// cannot be parsed into the expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("REGISTRATION_DESK")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns the first `ValidationError` found, section by section.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.redis.validate()?;
        self.payment.validate()?;
        self.messaging.validate(&self.server.environment)?;
        self.pass.validate()?;
        self.delivery.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}
