//! Messaging gateway port.
//!
//! Sends a document to a chat recipient. The transport is owned by the
//! gateway; this crate only cares whether the send succeeded.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Document addressed to one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentMessage {
    /// Country-code-prefixed digits, no punctuation.
    pub recipient: String,
    pub document: Vec<u8>,
    pub file_name: String,
    pub caption: String,
    pub sender_name: String,
}

/// Gateway acknowledgement of a send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    pub message_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagingError {
    #[error("messaging gateway unreachable: {0}")]
    Network(String),

    #[error("messaging gateway rejected the message ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("messaging gateway did not answer within {0:?}")]
    Timeout(std::time::Duration),
}

#[async_trait]
pub trait MessagingGateway: Send + Sync {
    async fn send_document(&self, message: &DocumentMessage)
        -> Result<DeliveryReceipt, MessagingError>;
}
