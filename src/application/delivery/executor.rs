//! DeliveryExecutor - the one code path that actually sends a pass.
//!
//! Shared by the inline dispatch path and the queue worker so both honour
//! the same lock protocol: acquire, send with a timeout, then either mark
//! sent or release.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::foundation::{RegistrationId, Timestamp};
use crate::domain::registration::RegistrationError;
use crate::ports::{DocumentMessage, MessagingError, MessagingGateway};

use super::{Acquisition, DeliveryLockManager};

/// What happened to one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// This attempt sent the pass and recorded it.
    Sent { sent_at: Timestamp },

    /// The send succeeded but the lease was lost before recording it.
    ResolvedElsewhere,

    /// An earlier attempt already delivered the pass.
    AlreadySent,

    /// Another attempt is in flight.
    Locked,

    /// The gateway failed or timed out. The lock was released.
    Failed { reason: String },
}

impl DeliveryOutcome {
    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            DeliveryOutcome::Sent { .. } => "sent",
            DeliveryOutcome::ResolvedElsewhere => "resolved_elsewhere",
            DeliveryOutcome::AlreadySent => "already_sent",
            DeliveryOutcome::Locked => "locked",
            DeliveryOutcome::Failed { .. } => "failed",
        }
    }
}

pub struct DeliveryExecutor {
    locks: Arc<DeliveryLockManager>,
    messaging: Arc<dyn MessagingGateway>,
    send_timeout: Duration,
}

impl DeliveryExecutor {
    pub fn new(
        locks: Arc<DeliveryLockManager>,
        messaging: Arc<dyn MessagingGateway>,
        send_timeout: Duration,
    ) -> Self {
        Self {
            locks,
            messaging,
            send_timeout,
        }
    }

    /// Performs exactly one send attempt under the delivery lock.
    ///
    /// # Errors
    ///
    /// Returns an error only for storage failures around the lock. Gateway
    /// failures are reported as `DeliveryOutcome::Failed`.
    pub async fn deliver(
        &self,
        registration_id: RegistrationId,
        message: &DocumentMessage,
    ) -> Result<DeliveryOutcome, RegistrationError> {
        let lease = match self.locks.acquire(registration_id).await? {
            Acquisition::Acquired(lease) => lease,
            Acquisition::AlreadySent { .. } => return Ok(DeliveryOutcome::AlreadySent),
            Acquisition::Locked => return Ok(DeliveryOutcome::Locked),
        };

        let sent = match tokio::time::timeout(self.send_timeout, self.messaging.send_document(message))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(MessagingError::Timeout(self.send_timeout)),
        };

        match sent {
            Ok(receipt) => {
                // The pass is out. From here the lock must not be released,
                // or a later trigger could send it again.
                let marked = self.locks.mark_sent(&lease).await.map_err(|e| {
                    tracing::error!(
                        registration_id = %registration_id,
                        error = %e,
                        "Pass sent but delivery marker not written; lock left in place"
                    );
                    e
                })?;
                if marked.updated {
                    let sent_at = marked.sent_at.unwrap_or_else(Timestamp::now);
                    tracing::info!(
                        registration_id = %registration_id,
                        message_id = receipt.message_id.as_deref().unwrap_or("-"),
                        "Pass delivered"
                    );
                    Ok(DeliveryOutcome::Sent { sent_at })
                } else {
                    Ok(DeliveryOutcome::ResolvedElsewhere)
                }
            }
            Err(err) => {
                tracing::warn!(
                    registration_id = %registration_id,
                    error = %err,
                    "Pass delivery failed"
                );
                if let Err(release_err) = self.locks.release(&lease).await {
                    tracing::error!(
                        registration_id = %registration_id,
                        error = %release_err,
                        "Failed to release delivery lock"
                    );
                }
                Ok(DeliveryOutcome::Failed {
                    reason: err.to_string(),
                })
            }
        }
    }
}
