//! QueueWorker - consumes offloaded delivery jobs.
//!
//! Each job goes through the same `DeliveryExecutor` as the inline path, so
//! a job for a registration that was already delivered (or is being
//! delivered) is simply dropped. So is a job whose registration was
//! cancelled after it was enqueued.
//!
//! ## Configuration
//!
//! | Setting | Default | Description |
//! |---------|---------|-------------|
//! | `poll_wait` | 1s | How long a single consume call blocks |
//! | `error_backoff` | 2s | Pause after a queue backend error |
//!
//! ## Graceful Shutdown
//!
//! The worker finishes the job in hand, then stops.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time;
use tracing::Instrument;

use crate::ports::{ClaimedJob, DocumentMessage, JobQueue, QueueError, RegistrationRepository};

use super::{DeliveryExecutor, DeliveryOutcome};

/// Configuration for the QueueWorker.
#[derive(Debug, Clone)]
pub struct QueueWorkerConfig {
    pub poll_wait: Duration,
    pub error_backoff: Duration,
}

impl Default for QueueWorkerConfig {
    fn default() -> Self {
        Self {
            poll_wait: Duration::from_secs(1),
            error_backoff: Duration::from_secs(2),
        }
    }
}

impl QueueWorkerConfig {
    pub fn with_poll_wait(mut self, wait: Duration) -> Self {
        self.poll_wait = wait;
        self
    }

    pub fn with_error_backoff(mut self, backoff: Duration) -> Self {
        self.error_backoff = backoff;
        self
    }
}

/// What the worker did with one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobDisposition {
    /// Delivered and acknowledged.
    Delivered,

    /// Nothing to do (already sent, locked elsewhere, no longer counted);
    /// acknowledged.
    Dropped { reason: &'static str },

    /// Moved to the dead-letter list.
    DeadLettered { reason: String },
}

pub struct QueueWorker {
    queue: Arc<dyn JobQueue>,
    registrations: Arc<dyn RegistrationRepository>,
    executor: Arc<DeliveryExecutor>,
    config: QueueWorkerConfig,
}

impl QueueWorker {
    pub fn new(
        queue: Arc<dyn JobQueue>,
        registrations: Arc<dyn RegistrationRepository>,
        executor: Arc<DeliveryExecutor>,
    ) -> Self {
        Self::with_config(queue, registrations, executor, QueueWorkerConfig::default())
    }

    pub fn with_config(
        queue: Arc<dyn JobQueue>,
        registrations: Arc<dyn RegistrationRepository>,
        executor: Arc<DeliveryExecutor>,
        config: QueueWorkerConfig,
    ) -> Self {
        Self {
            queue,
            registrations,
            executor,
            config,
        }
    }

    /// Run the worker loop until shutdown signal is received.
    ///
    /// The shutdown flag is checked between jobs only; a job in hand is
    /// never abandoned while it holds the delivery lock.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!("Delivery queue worker started");
        while !*shutdown.borrow() {
            if let Err(err) = self.process_one().await {
                tracing::error!(error = %err, "Delivery queue error");
                tokio::select! {
                    _ = shutdown.changed() => {}
                    _ = time::sleep(self.config.error_backoff) => {}
                }
            }
        }
        tracing::info!("Delivery queue worker stopped");
    }

    /// Consume and handle at most one job.
    ///
    /// Returns `Ok(None)` when the queue stayed empty for `poll_wait`.
    pub async fn process_one(&self) -> Result<Option<JobDisposition>, QueueError> {
        let Some(claimed) = self.queue.consume(self.config.poll_wait).await? else {
            return Ok(None);
        };
        let span = tracing::info_span!(
            "delivery_job",
            job_id = %claimed.job.job_id,
            registration_id = %claimed.job.registration_id
        );
        let disposition = self.handle(&claimed).instrument(span).await?;
        Ok(Some(disposition))
    }

    async fn handle(&self, claimed: &ClaimedJob) -> Result<JobDisposition, QueueError> {
        let disposition = self.attempt(claimed).await;

        match &disposition {
            JobDisposition::DeadLettered { reason } => {
                tracing::warn!(reason = %reason, "Delivery job dead-lettered");
                self.queue.fail(claimed, reason).await?;
            }
            JobDisposition::Dropped { reason } => {
                tracing::debug!(reason, "Delivery job dropped");
                self.queue.ack(claimed).await?;
            }
            JobDisposition::Delivered => {
                self.queue.ack(claimed).await?;
            }
        }
        Ok(disposition)
    }

    async fn attempt(&self, claimed: &ClaimedJob) -> JobDisposition {
        let job = &claimed.job;

        // The registration may have been cancelled since the job was queued
        match self.registrations.find_by_id(job.registration_id).await {
            Ok(Some(registration)) if registration.is_counted() => {}
            Ok(_) => return JobDisposition::Dropped { reason: "not_counted" },
            Err(err) => {
                return JobDisposition::DeadLettered {
                    reason: err.to_string(),
                }
            }
        }

        let message = DocumentMessage {
            recipient: job.recipient.clone(),
            document: job.document.clone(),
            file_name: job.file_name.clone(),
            caption: job.caption.clone(),
            sender_name: job.sender_name.clone(),
        };

        match self.executor.deliver(job.registration_id, &message).await {
            Ok(DeliveryOutcome::Sent { .. }) => JobDisposition::Delivered,
            Ok(DeliveryOutcome::ResolvedElsewhere) => JobDisposition::Dropped {
                reason: "resolved_elsewhere",
            },
            Ok(DeliveryOutcome::AlreadySent) => JobDisposition::Dropped {
                reason: "already_sent",
            },
            Ok(DeliveryOutcome::Locked) => JobDisposition::Dropped { reason: "locked" },
            Ok(DeliveryOutcome::Failed { reason }) => JobDisposition::DeadLettered { reason },
            Err(err) => JobDisposition::DeadLettered {
                reason: err.to_string(),
            },
        }
    }
}
