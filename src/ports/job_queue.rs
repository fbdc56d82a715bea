//! Delivery job queue port.
//!
//! The queue is optional infrastructure. Producers must cope with
//! `QueueError::Unavailable` by delivering inline instead.

use crate::domain::foundation::{EventId, RegistrationId, Timestamp};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// One pass delivery attempt, consumed by exactly one worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryJob {
    pub job_id: String,
    pub registration_id: RegistrationId,
    pub event_id: EventId,
    pub recipient: String,
    pub sender_name: String,
    pub caption: String,

    /// Rendered pass, base64 on the wire.
    #[serde(with = "base64_bytes")]
    pub document: Vec<u8>,

    pub file_name: String,
    pub created_at: Timestamp,
}

impl DeliveryJob {
    /// Tracing id of the form `pass-{registration_id}-{created_at_millis}`.
    pub fn job_id_for(registration_id: RegistrationId, created_at: Timestamp) -> String {
        format!("pass-{}-{}", registration_id, created_at.as_unix_millis())
    }
}

/// A job taken off the queue, with the handle needed to ack or fail it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimedJob {
    pub job: DeliveryJob,

    /// Backend-specific receipt (the raw payload for list-backed queues).
    pub receipt: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("job queue unavailable: {0}")]
    Unavailable(String),

    #[error("job payload could not be encoded: {0}")]
    Serialization(String),

    #[error("job queue backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Adds a job and returns its id.
    async fn enqueue(&self, job: &DeliveryJob) -> Result<String, QueueError>;

    /// Waits up to `wait` for the next job.
    async fn consume(&self, wait: Duration) -> Result<Option<ClaimedJob>, QueueError>;

    /// Marks a claimed job as done.
    async fn ack(&self, job: &ClaimedJob) -> Result<(), QueueError>;

    /// Moves a claimed job to the dead-letter list with a reason.
    async fn fail(&self, job: &ClaimedJob, reason: &str) -> Result<(), QueueError>;
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}
