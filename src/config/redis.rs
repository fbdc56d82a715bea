//! Redis configuration
//!
//! Redis backs the optional delivery job queue. Leaving the URL unset runs
//! the service with every delivery inline.

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Redis configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL. None disables the queue.
    #[serde(default)]
    pub url: Option<String>,

    /// Prefix for the pending, processing and dead-letter list keys
    #[serde(default = "default_queue_prefix")]
    pub queue_prefix: String,

    /// Connection timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl RedisConfig {
    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn is_enabled(&self) -> bool {
        self.url.as_deref().is_some_and(|url| !url.trim().is_empty())
    }

    /// Validate Redis configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        let Some(url) = self.url.as_deref().filter(|u| !u.trim().is_empty()) else {
            return Ok(());
        };
        if !url.starts_with("redis://") && !url.starts_with("rediss://") {
            return Err(ValidationError::InvalidRedisUrl);
        }
        if self.queue_prefix.trim().is_empty() {
            return Err(ValidationError::MissingRequired("REDIS__QUEUE_PREFIX"));
        }
        Ok(())
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: None,
            queue_prefix: default_queue_prefix(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_queue_prefix() -> String {
    "registration-desk:passes".to_string()
}

fn default_timeout() -> u64 {
    5
}
