//! NotificationDispatcher - turns a delivery trigger into one delivery
//! attempt.
//!
//! A trigger fires when a registration settles (paid or free) or when an
//! operator asks for a resend. The dispatcher renders the pass once, then
//! either hands a job to the queue worker or sends inline. It never retries
//! on its own.
//!
//! ## Background execution
//!
//! `spawn` runs the dispatch on a bounded pool: a semaphore caps concurrent
//! dispatches and each dispatch runs in its own task so a panic is caught
//! and logged instead of tearing down the caller. `shutdown` waits for
//! every running dispatch to finish and refuses new ones afterwards.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::domain::foundation::{RegistrationId, Timestamp};
use crate::domain::pass::PassTokenService;
use crate::domain::registration::{Event, Member, Registration, RegistrationError};
use crate::ports::{
    DeliveryJob, DocumentMessage, EventRepository, JobQueue, MemberDirectory, PassContent,
    PassRenderer, RegistrationRepository,
};

use super::{DeliveryExecutor, DeliveryLockManager, DeliveryOutcome};

/// Injected queue client. `Unavailable` means every delivery goes inline.
#[derive(Clone)]
pub enum QueueHandle {
    Available(Arc<dyn JobQueue>),
    Unavailable { reason: String },
}

impl QueueHandle {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        QueueHandle::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, QueueHandle::Available(_))
    }
}

impl std::fmt::Debug for QueueHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueHandle::Available(_) => write!(f, "QueueHandle::Available"),
            QueueHandle::Unavailable { reason } => {
                write!(f, "QueueHandle::Unavailable({})", reason)
            }
        }
    }
}

/// Configuration for the NotificationDispatcher.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Display name shown as the sender of the pass.
    pub sender_name: String,

    /// Prefixed to bare national numbers.
    pub default_country_code: String,

    /// Maximum dispatches running at once.
    pub max_concurrent: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            sender_name: "Registration Desk".to_string(),
            default_country_code: "91".to_string(),
            max_concurrent: 16,
        }
    }
}

/// What a single trigger led to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Nothing to do: already sent or another attempt in flight.
    Skipped { reason: &'static str },

    /// The attempt could not start (bad contact, render failure, ...).
    Abandoned { reason: String },

    /// Handed to the queue worker.
    Enqueued { job_id: String },

    /// Sent (or resolved) inline.
    Delivered(DeliveryOutcome),
}

pub struct NotificationDispatcher {
    registrations: Arc<dyn RegistrationRepository>,
    events: Arc<dyn EventRepository>,
    members: Arc<dyn MemberDirectory>,
    tokens: PassTokenService,
    renderer: Arc<dyn PassRenderer>,
    queue: QueueHandle,
    locks: Arc<DeliveryLockManager>,
    executor: Arc<DeliveryExecutor>,
    permits: Arc<Semaphore>,
    config: DispatcherConfig,
}

impl NotificationDispatcher {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registrations: Arc<dyn RegistrationRepository>,
        events: Arc<dyn EventRepository>,
        members: Arc<dyn MemberDirectory>,
        tokens: PassTokenService,
        renderer: Arc<dyn PassRenderer>,
        queue: QueueHandle,
        locks: Arc<DeliveryLockManager>,
        executor: Arc<DeliveryExecutor>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            registrations,
            events,
            members,
            tokens,
            renderer,
            queue,
            locks,
            executor,
            permits: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
            config,
        }
    }

    /// Runs `dispatch` in the background.
    ///
    /// The returned handle completes when the dispatch finished, failed, or
    /// panicked; it never yields an error itself.
    pub fn spawn(self: &Arc<Self>, registration_id: RegistrationId) -> JoinHandle<()> {
        let dispatcher = Arc::clone(self);
        let permits = Arc::clone(&self.permits);

        tokio::spawn(async move {
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    tracing::error!(registration_id = %registration_id, "Dispatch pool closed");
                    return;
                }
            };

            let task = tokio::spawn(async move { dispatcher.dispatch(registration_id).await });
            match task.await {
                Ok(Ok(outcome)) => {
                    tracing::debug!(registration_id = %registration_id, outcome = ?outcome, "Dispatch finished");
                }
                Ok(Err(err)) => {
                    tracing::error!(registration_id = %registration_id, error = %err, "Dispatch failed");
                }
                Err(join_err) if join_err.is_panic() => {
                    tracing::error!(registration_id = %registration_id, "Dispatch task panicked");
                }
                Err(join_err) => {
                    tracing::warn!(registration_id = %registration_id, error = %join_err, "Dispatch task cancelled");
                }
            }
        })
    }

    /// Stops taking new background dispatches and waits for the running
    /// ones to finish.
    ///
    /// Holding every permit means nothing is mid-dispatch; closing the
    /// semaphore then turns later `spawn` calls into logged no-ops.
    pub async fn shutdown(&self) {
        let total = u32::try_from(self.config.max_concurrent.max(1)).unwrap_or(u32::MAX);
        match self.permits.acquire_many(total).await {
            Ok(all) => {
                self.permits.close();
                drop(all);
                tracing::info!("Background dispatches drained");
            }
            Err(_) => tracing::debug!("Dispatch pool already closed"),
        }
    }

    /// Performs one delivery attempt for a registration.
    pub async fn dispatch(
        &self,
        registration_id: RegistrationId,
    ) -> Result<DispatchOutcome, RegistrationError> {
        // Cheap pre-check; the authoritative check is the lock itself.
        let state = self.locks.peek(registration_id).await?;
        if state.is_sent() {
            return Ok(DispatchOutcome::Skipped {
                reason: "already_sent",
            });
        }
        if state.is_locked(self.locks.stale_before(Timestamp::now())) {
            return Ok(DispatchOutcome::Skipped { reason: "locked" });
        }

        let registration = self
            .registrations
            .find_by_id(registration_id)
            .await?
            .ok_or_else(|| RegistrationError::registration_not_found(registration_id))?;
        if !registration.is_counted() {
            return Ok(abandon(registration_id, "registration is not settled"));
        }

        let Some(member_id) = registration.member_id else {
            return Ok(abandon(registration_id, "member no longer exists"));
        };
        let Some(member) = self.members.find_by_id(member_id).await? else {
            return Ok(abandon(registration_id, "member no longer exists"));
        };
        let Some(recipient) = normalize_recipient(&member.phone, &self.config.default_country_code)
        else {
            return Ok(abandon(registration_id, "member contact number is invalid"));
        };
        let Some(event) = self.events.find_by_id(registration.event_id).await? else {
            return Ok(abandon(registration_id, "event no longer exists"));
        };

        let message = match self.render(&registration, &event, &member, recipient).await {
            Ok(message) => message,
            Err(reason) => return Ok(abandon(registration_id, reason)),
        };

        if let QueueHandle::Available(queue) = &self.queue {
            let created_at = Timestamp::now();
            let job = DeliveryJob {
                job_id: DeliveryJob::job_id_for(registration_id, created_at),
                registration_id,
                event_id: registration.event_id,
                recipient: message.recipient.clone(),
                sender_name: message.sender_name.clone(),
                caption: message.caption.clone(),
                document: message.document.clone(),
                file_name: message.file_name.clone(),
                created_at,
            };
            match queue.enqueue(&job).await {
                Ok(job_id) => {
                    tracing::info!(registration_id = %registration_id, job_id = %job_id, "Pass delivery enqueued");
                    return Ok(DispatchOutcome::Enqueued { job_id });
                }
                Err(err) => {
                    tracing::warn!(
                        registration_id = %registration_id,
                        error = %err,
                        "Enqueue failed, delivering inline"
                    );
                }
            }
        }

        let outcome = self.executor.deliver(registration_id, &message).await?;
        Ok(DispatchOutcome::Delivered(outcome))
    }

    async fn render(
        &self,
        registration: &Registration,
        event: &Event,
        member: &Member,
        recipient: String,
    ) -> Result<DocumentMessage, String> {
        let token = self
            .tokens
            .issue(registration.id, registration.event_id, member.id);
        let content = PassContent {
            registration_id: registration.id,
            event_name: event.name.clone(),
            member_name: member.name.clone(),
            business_type: member.business_type,
            token,
        };
        let document = self
            .renderer
            .render(&content)
            .await
            .map_err(|e| e.to_string())?;

        Ok(DocumentMessage {
            recipient,
            document: document.bytes,
            file_name: document.file_name,
            caption: format!("{} - visitor pass for {}", event.name, member.name),
            sender_name: self.config.sender_name.clone(),
        })
    }
}

fn abandon(registration_id: RegistrationId, reason: impl Into<String>) -> DispatchOutcome {
    let reason = reason.into();
    tracing::warn!(registration_id = %registration_id, reason = %reason, "Pass delivery abandoned");
    DispatchOutcome::Abandoned { reason }
}

/// Normalizes a contact number into country-code-prefixed digits.
///
/// Non-digits are stripped. A bare 10-digit national number gets the
/// default country code. The result must be 11 to 15 digits long.
pub fn normalize_recipient(raw: &str, default_country_code: &str) -> Option<String> {
    let mut digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.starts_with("00") {
        digits.drain(..2);
    } else if digits.len() == 11 && digits.starts_with('0') {
        digits.remove(0);
    }
    if digits.len() == 10 {
        digits.insert_str(0, default_country_code);
    }
    if (11..=15).contains(&digits.len()) {
        Some(digits)
    } else {
        None
    }
}
