//! In-memory messaging gateway that records sent documents.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::ports::{DeliveryReceipt, DocumentMessage, MessagingError, MessagingGateway};

#[derive(Default)]
struct State {
    sent: Vec<DocumentMessage>,
    attempts: usize,
    failures: VecDeque<MessagingError>,
}

/// Messaging gateway fake.
///
/// An optional delay is applied to every send, which lets tests drive the
/// caller's timeout and widen race windows between concurrent senders.
///
/// # Panics
///
/// Methods may panic if the internal lock is poisoned.
#[derive(Default)]
pub struct InMemoryMessagingGateway {
    state: Mutex<State>,
    delay: Option<Duration>,
}

impl InMemoryMessagingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state
            .lock()
            .expect("InMemoryMessagingGateway: state lock poisoned")
    }

    /// Makes the next send fail with `error`.
    pub fn fail_next(&self, error: MessagingError) {
        self.state().failures.push_back(error);
    }

    /// Successful sends.
    pub fn sent_count(&self) -> usize {
        self.state().sent.len()
    }

    /// Every call, failed ones included.
    pub fn attempt_count(&self) -> usize {
        self.state().attempts
    }

    pub fn sent(&self) -> Vec<DocumentMessage> {
        self.state().sent.clone()
    }
}

#[async_trait]
impl MessagingGateway for InMemoryMessagingGateway {
    async fn send_document(
        &self,
        message: &DocumentMessage,
    ) -> Result<DeliveryReceipt, MessagingError> {
        self.state().attempts += 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state();
        if let Some(err) = state.failures.pop_front() {
            return Err(err);
        }
        state.sent.push(message.clone());
        Ok(DeliveryReceipt {
            message_id: Some(format!("msg_{}", state.sent.len())),
        })
    }
}
