//! Pass renderer port.
//!
//! Turns registration details plus a signed token into a printable pass.
//! Layout is entirely the renderer's concern.

use crate::domain::foundation::{BusinessType, RegistrationId};
use async_trait::async_trait;
use thiserror::Error;

/// Everything printed on a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassContent {
    pub registration_id: RegistrationId,
    pub event_name: String,
    pub member_name: String,
    pub business_type: Option<BusinessType>,
    pub token: String,
}

/// Rendered pass document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassDocument {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub content_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("pass rendering failed: {0}")]
pub struct RenderError(pub String);

#[async_trait]
pub trait PassRenderer: Send + Sync {
    async fn render(&self, content: &PassContent) -> Result<PassDocument, RenderError>;
}
