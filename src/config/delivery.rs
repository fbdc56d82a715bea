//! Pass delivery configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Delivery pipeline configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryConfig {
    /// Age after which a delivery lock may be taken over. Unset means a
    /// lock is only ever cleared by its owner or an operator.
    #[serde(default)]
    pub lock_stale_after_secs: Option<u64>,

    /// Dispatches allowed to run at once
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// How long the queue worker blocks on one consume, in seconds
    #[serde(default = "default_poll_wait")]
    pub worker_poll_wait_secs: u64,

    /// Pause after a queue backend error, in seconds
    #[serde(default = "default_error_backoff")]
    pub worker_error_backoff_secs: u64,
}

impl DeliveryConfig {
    pub fn lock_stale_after(&self) -> Option<Duration> {
        self.lock_stale_after_secs.map(Duration::from_secs)
    }

    pub fn worker_poll_wait(&self) -> Duration {
        Duration::from_secs(self.worker_poll_wait_secs)
    }

    pub fn worker_error_backoff(&self) -> Duration {
        Duration::from_secs(self.worker_error_backoff_secs)
    }

    /// Validate delivery configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_concurrent == 0 || self.max_concurrent > 256 {
            return Err(ValidationError::InvalidDeliveryConcurrency);
        }
        if self.lock_stale_after_secs == Some(0) {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            lock_stale_after_secs: None,
            max_concurrent: default_max_concurrent(),
            worker_poll_wait_secs: default_poll_wait(),
            worker_error_backoff_secs: default_error_backoff(),
        }
    }
}

fn default_max_concurrent() -> usize {
    16
}

fn default_poll_wait() -> u64 {
    1
}

fn default_error_backoff() -> u64 {
    2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_never_expire_locks() {
        let config = DeliveryConfig::default();
        assert_eq!(config.lock_stale_after(), None);
        assert_eq!(config.max_concurrent, 16);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_stale_after_converts_to_duration() {
        let config = DeliveryConfig {
            lock_stale_after_secs: Some(600),
            ..Default::default()
        };
        assert_eq!(config.lock_stale_after(), Some(Duration::from_secs(600)));
    }

    #[test]
    fn test_zero_values_rejected() {
        let config = DeliveryConfig {
            max_concurrent: 0,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::InvalidDeliveryConcurrency)
        );

        let config = DeliveryConfig {
            lock_stale_after_secs: Some(0),
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidTimeout));
    }
}
