//! Database configuration

use serde::Deserialize;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

use super::error::ValidationError;

const MAX_POOL_SIZE: u32 = 100;

/// PostgreSQL connection settings.
///
/// Request handlers and background pass deliveries share one pool, so
/// `max_connections` should cover `delivery.max_concurrent` plus the
/// expected request load.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `postgres://` or `postgresql://` URL
    pub url: String,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Seconds to wait for a free connection before failing the query
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Close connections idle for this many seconds. Unset keeps the
    /// driver default.
    #[serde(default)]
    pub idle_timeout_secs: Option<u64>,

    /// Apply `migrations/` on startup
    #[serde(default)]
    pub run_migrations: bool,
}

impl DatabaseConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Pool settings for `PgPoolOptions::connect`.
    pub fn pool_options(&self) -> PgPoolOptions {
        let options = PgPoolOptions::new()
            .min_connections(self.min_connections)
            .max_connections(self.max_connections)
            .acquire_timeout(self.connect_timeout());
        match self.idle_timeout_secs {
            Some(secs) => options.idle_timeout(Duration::from_secs(secs)),
            None => options,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.url.trim().is_empty() {
            return Err(ValidationError::MissingRequired("DATABASE__URL"));
        }
        match self.url.split_once("://") {
            Some(("postgres" | "postgresql", rest)) if !rest.is_empty() => {}
            _ => return Err(ValidationError::InvalidDatabaseUrl),
        }
        if self.max_connections == 0 || self.min_connections > self.max_connections {
            return Err(ValidationError::InvalidPoolSize);
        }
        if self.max_connections > MAX_POOL_SIZE {
            return Err(ValidationError::PoolSizeTooLarge);
        }
        if self.connect_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            min_connections: default_min_connections(),
            max_connections: default_max_connections(),
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: None,
            run_migrations: false,
        }
    }
}

fn default_min_connections() -> u32 {
    1
}

fn default_max_connections() -> u32 {
    20
}

fn default_connect_timeout() -> u64 {
    5
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_url(url: &str) -> DatabaseConfig {
        DatabaseConfig {
            url: url.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn defaults_leave_room_for_background_deliveries() {
        let config = DatabaseConfig::default();
        assert_eq!(config.min_connections, 1);
        assert_eq!(config.max_connections, 20);
        assert_eq!(config.connect_timeout(), Duration::from_secs(5));
        assert!(config.idle_timeout_secs.is_none());
        assert!(!config.run_migrations);
    }

    #[test]
    fn accepts_both_postgres_schemes() {
        assert!(with_url("postgres://desk@localhost/registrations").validate().is_ok());
        assert!(with_url("postgresql://desk@db:5432/registrations").validate().is_ok());
    }

    #[test]
    fn rejects_missing_or_foreign_urls() {
        assert_eq!(
            with_url("  ").validate(),
            Err(ValidationError::MissingRequired("DATABASE__URL"))
        );
        assert_eq!(
            with_url("mysql://localhost/registrations").validate(),
            Err(ValidationError::InvalidDatabaseUrl)
        );
        assert_eq!(
            with_url("postgres://").validate(),
            Err(ValidationError::InvalidDatabaseUrl)
        );
    }

    #[test]
    fn rejects_inverted_or_oversized_pools() {
        let inverted = DatabaseConfig {
            min_connections: 8,
            max_connections: 4,
            ..with_url("postgres://localhost/registrations")
        };
        assert_eq!(inverted.validate(), Err(ValidationError::InvalidPoolSize));

        let oversized = DatabaseConfig {
            max_connections: 250,
            ..with_url("postgres://localhost/registrations")
        };
        assert_eq!(oversized.validate(), Err(ValidationError::PoolSizeTooLarge));
    }

    #[test]
    fn rejects_zero_connect_timeout() {
        let config = DatabaseConfig {
            connect_timeout_secs: 0,
            ..with_url("postgres://localhost/registrations")
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidTimeout));
    }
}
