//! Redis list-backed delivery job queue.
//!
//! Three lists per queue:
//! 1. `pending` - producers LPUSH, so the oldest job sits at the right end
//! 2. `processing` - a consumer moves a job here atomically with BRPOPLPUSH
//! 3. `dead` - failed jobs with their reason, for operators to inspect
//!
//! A job stays in `processing` until it is acked or failed, so a worker
//! crash leaves it visible instead of silently losing it.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use serde::Serialize;

use crate::domain::foundation::Timestamp;
use crate::ports::{ClaimedJob, DeliveryJob, JobQueue, QueueError};

/// Key names for one queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisQueueKeys {
    pub pending: String,
    pub processing: String,
    pub dead: String,
}

impl RedisQueueKeys {
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            pending: format!("{}:pending", prefix),
            processing: format!("{}:processing", prefix),
            dead: format!("{}:dead", prefix),
        }
    }
}

#[derive(Serialize)]
struct DeadLetter<'a> {
    job_id: &'a str,
    registration_id: i64,
    reason: &'a str,
    failed_at: Timestamp,
    payload: &'a str,
}

/// Delivery job queue on Redis lists.
///
/// Producers and the consumer use separate connections because a blocking
/// pop stalls every other command multiplexed on the same connection.
#[derive(Clone)]
pub struct RedisJobQueue {
    producer: MultiplexedConnection,
    consumer: MultiplexedConnection,
    keys: RedisQueueKeys,
}

impl RedisJobQueue {
    /// Opens the producer and consumer connections.
    pub async fn connect(client: &redis::Client, keys: RedisQueueKeys) -> Result<Self, QueueError> {
        let producer = client
            .get_multiplexed_tokio_connection()
            .await
            .map_err(unavailable)?;
        let consumer = client
            .get_multiplexed_tokio_connection()
            .await
            .map_err(unavailable)?;
        Ok(Self {
            producer,
            consumer,
            keys,
        })
    }

    pub fn keys(&self) -> &RedisQueueKeys {
        &self.keys
    }

    /// Number of jobs waiting to be consumed.
    pub async fn pending_len(&self) -> Result<usize, QueueError> {
        let mut conn = self.producer.clone();
        conn.llen(&self.keys.pending).await.map_err(backend)
    }
}

fn unavailable(e: redis::RedisError) -> QueueError {
    QueueError::Unavailable(e.to_string())
}

fn backend(e: redis::RedisError) -> QueueError {
    if e.is_connection_dropped() || e.is_connection_refusal() || e.is_io_error() {
        QueueError::Unavailable(e.to_string())
    } else {
        QueueError::Backend(e.to_string())
    }
}

/// BRPOPLPUSH treats 0 as "block forever", so sub-second waits round up.
fn blocking_secs(wait: Duration) -> u64 {
    wait.as_secs().max(1)
}

#[async_trait]
impl JobQueue for RedisJobQueue {
    async fn enqueue(&self, job: &DeliveryJob) -> Result<String, QueueError> {
        let payload =
            serde_json::to_string(job).map_err(|e| QueueError::Serialization(e.to_string()))?;
        let mut conn = self.producer.clone();
        conn.lpush::<_, _, ()>(&self.keys.pending, payload)
            .await
            .map_err(backend)?;
        tracing::debug!(job_id = %job.job_id, "Delivery job enqueued");
        Ok(job.job_id.clone())
    }

    async fn consume(&self, wait: Duration) -> Result<Option<ClaimedJob>, QueueError> {
        let mut conn = self.consumer.clone();
        let payload: Option<String> = if wait.is_zero() {
            redis::cmd("RPOPLPUSH")
                .arg(&self.keys.pending)
                .arg(&self.keys.processing)
                .query_async(&mut conn)
                .await
                .map_err(backend)?
        } else {
            redis::cmd("BRPOPLPUSH")
                .arg(&self.keys.pending)
                .arg(&self.keys.processing)
                .arg(blocking_secs(wait))
                .query_async(&mut conn)
                .await
                .map_err(backend)?
        };

        let Some(payload) = payload else {
            return Ok(None);
        };

        match serde_json::from_str::<DeliveryJob>(&payload) {
            Ok(job) => Ok(Some(ClaimedJob {
                job,
                receipt: payload,
            })),
            Err(e) => {
                // Unreadable payloads go straight to the dead list.
                tracing::error!(error = %e, "Undecodable delivery job moved to dead-letter list");
                redis::pipe()
                    .atomic()
                    .lrem(&self.keys.processing, 1, &payload)
                    .ignore()
                    .lpush(&self.keys.dead, &payload)
                    .ignore()
                    .query_async::<_, ()>(&mut conn)
                    .await
                    .map_err(backend)?;
                Err(QueueError::Serialization(e.to_string()))
            }
        }
    }

    async fn ack(&self, job: &ClaimedJob) -> Result<(), QueueError> {
        let mut conn = self.producer.clone();
        conn.lrem::<_, _, ()>(&self.keys.processing, 1, &job.receipt)
            .await
            .map_err(backend)
    }

    async fn fail(&self, job: &ClaimedJob, reason: &str) -> Result<(), QueueError> {
        let entry = serde_json::to_string(&DeadLetter {
            job_id: &job.job.job_id,
            registration_id: job.job.registration_id.value(),
            reason,
            failed_at: Timestamp::now(),
            payload: &job.receipt,
        })
        .map_err(|e| QueueError::Serialization(e.to_string()))?;

        let mut conn = self.producer.clone();
        redis::pipe()
            .atomic()
            .lrem(&self.keys.processing, 1, &job.receipt)
            .ignore()
            .lpush(&self.keys.dead, entry)
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(backend)?;

        tracing::warn!(job_id = %job.job.job_id, reason, "Delivery job dead-lettered");
        Ok(())
    }
}
