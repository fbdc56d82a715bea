//! In-memory delivery job queue.
//!
//! Jobs are stored as JSON, exactly as the Redis queue stores them, so the
//! wire format is exercised in tests too.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::ports::{ClaimedJob, DeliveryJob, JobQueue, QueueError};

#[derive(Default)]
struct State {
    pending: VecDeque<String>,
    processing: Vec<String>,
    dead_letters: Vec<(DeliveryJob, String)>,
    acked: usize,
}

/// Job queue fake with a pending list, a processing list and a dead-letter
/// list.
///
/// # Panics
///
/// Test helper methods panic if the internal lock is poisoned.
#[derive(Default)]
pub struct InMemoryJobQueue {
    state: Mutex<State>,
    notify: Notify,
    unavailable: Option<String>,
}

impl InMemoryJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// A queue whose every call fails with `QueueError::Unavailable`.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            unavailable: Some(reason.into()),
            ..Self::default()
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, State>, QueueError> {
        if let Some(reason) = &self.unavailable {
            return Err(QueueError::Unavailable(reason.clone()));
        }
        self.state
            .lock()
            .map_err(|_| QueueError::Backend("state lock poisoned".to_string()))
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state
            .lock()
            .expect("InMemoryJobQueue: state lock poisoned")
    }

    pub fn pending_count(&self) -> usize {
        self.state().pending.len()
    }

    pub fn acked_count(&self) -> usize {
        self.state().acked
    }

    /// Failed jobs with their failure reasons.
    pub fn dead_letters(&self) -> Vec<(DeliveryJob, String)> {
        self.state().dead_letters.clone()
    }

    fn claim(&self) -> Result<Option<ClaimedJob>, QueueError> {
        let mut state = self.lock()?;
        let Some(payload) = state.pending.pop_front() else {
            return Ok(None);
        };
        state.processing.push(payload.clone());
        let job = serde_json::from_str(&payload)
            .map_err(|e| QueueError::Serialization(e.to_string()))?;
        Ok(Some(ClaimedJob {
            job,
            receipt: payload,
        }))
    }
}

#[async_trait]
impl JobQueue for InMemoryJobQueue {
    async fn enqueue(&self, job: &DeliveryJob) -> Result<String, QueueError> {
        let payload =
            serde_json::to_string(job).map_err(|e| QueueError::Serialization(e.to_string()))?;
        self.lock()?.pending.push_back(payload);
        self.notify.notify_one();
        Ok(job.job_id.clone())
    }

    async fn consume(&self, wait: Duration) -> Result<Option<ClaimedJob>, QueueError> {
        if let Some(job) = self.claim()? {
            return Ok(Some(job));
        }
        let _ = tokio::time::timeout(wait, self.notify.notified()).await;
        self.claim()
    }

    async fn ack(&self, job: &ClaimedJob) -> Result<(), QueueError> {
        let mut state = self.lock()?;
        if let Some(pos) = state.processing.iter().position(|p| *p == job.receipt) {
            state.processing.remove(pos);
        }
        state.acked += 1;
        Ok(())
    }

    async fn fail(&self, job: &ClaimedJob, reason: &str) -> Result<(), QueueError> {
        let mut state = self.lock()?;
        if let Some(pos) = state.processing.iter().position(|p| *p == job.receipt) {
            state.processing.remove(pos);
        }
        state.dead_letters.push((job.job.clone(), reason.to_string()));
        Ok(())
    }
}
