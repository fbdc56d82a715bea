//! PostgreSQL implementation of DeliveryLockStore.
//!
//! The lock lives in three columns of the registration row. Acquisition,
//! mark-sent and release are each one conditional UPDATE, so the database
//! serializes competing callers. Follow-up SELECTs only classify a lost
//! race for logging and never decide ownership.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, RegistrationId, Timestamp};
use crate::domain::registration::{DeliveryLock, DeliveryState};
use crate::ports::{DeliveryLockStore, LockAttempt, MarkSent};

pub struct PostgresDeliveryLockStore {
    pool: PgPool,
}

impl PostgresDeliveryLockStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct DeliveryRow {
    delivery_sent_at: Option<DateTime<Utc>>,
    delivery_lock_owner: Option<String>,
    delivery_locked_at: Option<DateTime<Utc>>,
}

impl From<DeliveryRow> for DeliveryState {
    fn from(row: DeliveryRow) -> Self {
        let lock = match (row.delivery_lock_owner, row.delivery_locked_at) {
            (Some(owner), Some(acquired_at)) => Some(DeliveryLock {
                owner,
                acquired_at: Timestamp::from_datetime(acquired_at),
            }),
            _ => None,
        };
        DeliveryState {
            sent_at: row.delivery_sent_at.map(Timestamp::from_datetime),
            lock,
        }
    }
}

fn db_error(action: &str, e: sqlx::Error) -> DomainError {
    DomainError::database(format!("Failed to {}: {}", action, e))
}

impl PostgresDeliveryLockStore {
    async fn read(&self, id: RegistrationId) -> Result<Option<DeliveryState>, DomainError> {
        let row: Option<DeliveryRow> = sqlx::query_as(
            r#"
            SELECT delivery_sent_at, delivery_lock_owner, delivery_locked_at
            FROM registrations
            WHERE id = $1
            "#,
        )
        .bind(id.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("read delivery state", e))?;

        Ok(row.map(DeliveryState::from))
    }
}

#[async_trait]
impl DeliveryLockStore for PostgresDeliveryLockStore {
    async fn delivery_state(
        &self,
        id: RegistrationId,
    ) -> Result<Option<DeliveryState>, DomainError> {
        self.read(id).await
    }

    async fn try_acquire(
        &self,
        id: RegistrationId,
        owner: &str,
        now: Timestamp,
        stale_before: Option<Timestamp>,
    ) -> Result<LockAttempt, DomainError> {
        let acquired: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE registrations SET
                delivery_lock_owner = $2,
                delivery_locked_at = $3
            WHERE id = $1
              AND delivery_sent_at IS NULL
              AND (
                    delivery_lock_owner IS NULL
                 OR ($4::timestamptz IS NOT NULL AND delivery_locked_at < $4)
              )
            RETURNING id
            "#,
        )
        .bind(id.value())
        .bind(owner)
        .bind(now.as_datetime())
        .bind(stale_before.map(|t| *t.as_datetime()))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("acquire delivery lock", e))?;

        if acquired.is_some() {
            return Ok(LockAttempt::Acquired);
        }

        Ok(match self.read(id).await? {
            None => LockAttempt::Missing,
            Some(DeliveryState {
                sent_at: Some(sent_at),
                ..
            }) => LockAttempt::AlreadySent { sent_at },
            Some(_) => LockAttempt::Held,
        })
    }

    async fn mark_sent(
        &self,
        id: RegistrationId,
        owner: &str,
        sent_at: Timestamp,
    ) -> Result<MarkSent, DomainError> {
        let written: Option<DateTime<Utc>> = sqlx::query_scalar(
            r#"
            UPDATE registrations SET
                delivery_sent_at = $3,
                delivery_lock_owner = NULL,
                delivery_locked_at = NULL
            WHERE id = $1
              AND delivery_lock_owner = $2
              AND delivery_sent_at IS NULL
            RETURNING delivery_sent_at
            "#,
        )
        .bind(id.value())
        .bind(owner)
        .bind(sent_at.as_datetime())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("mark delivery sent", e))?;

        if let Some(written) = written {
            return Ok(MarkSent {
                updated: true,
                sent_at: Some(Timestamp::from_datetime(written)),
            });
        }

        let current = self.read(id).await?.and_then(|s| s.sent_at);
        Ok(MarkSent {
            updated: false,
            sent_at: current,
        })
    }

    async fn release(&self, id: RegistrationId, owner: &str) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE registrations SET
                delivery_lock_owner = NULL,
                delivery_locked_at = NULL
            WHERE id = $1 AND delivery_lock_owner = $2
            "#,
        )
        .bind(id.value())
        .bind(owner)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("release delivery lock", e))?;

        Ok(result.rows_affected() == 1)
    }

    async fn force_release(&self, id: RegistrationId) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE registrations SET
                delivery_lock_owner = NULL,
                delivery_locked_at = NULL
            WHERE id = $1
              AND delivery_sent_at IS NULL
              AND delivery_lock_owner IS NOT NULL
            "#,
        )
        .bind(id.value())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("force-release delivery lock", e))?;

        Ok(result.rows_affected() == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_with_owner_and_time_is_locked() {
        let now = Utc::now();
        let state = DeliveryState::from(DeliveryRow {
            delivery_sent_at: None,
            delivery_lock_owner: Some("owner".to_string()),
            delivery_locked_at: Some(now),
        });
        assert!(state.is_held_by("owner"));
        assert!(!state.is_sent());
    }

    #[test]
    fn owner_without_timestamp_is_not_a_lock() {
        let state = DeliveryState::from(DeliveryRow {
            delivery_sent_at: Some(Utc::now()),
            delivery_lock_owner: Some("owner".to_string()),
            delivery_locked_at: None,
        });
        assert!(state.lock.is_none());
        assert!(state.is_sent());
    }
}
