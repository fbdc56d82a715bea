//! HTTP messaging gateway adapter.
//!
//! Posts a JSON message with the document inlined as base64 and a bearer
//! token. Any non-2xx answer is a rejection; the gateway's own delivery
//! retries are its business.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::ports::{DeliveryReceipt, DocumentMessage, MessagingError, MessagingGateway};

#[derive(Clone)]
pub struct HttpMessagingConfig {
    api_url: String,
    api_token: SecretString,
    request_timeout: Duration,
}

impl HttpMessagingConfig {
    pub fn new(api_url: impl Into<String>, api_token: SecretString) -> Self {
        Self {
            api_url: api_url.into(),
            api_token,
            request_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

#[derive(Debug, Serialize)]
struct SendDocumentBody<'a> {
    recipient: &'a str,
    sender_name: &'a str,
    caption: &'a str,
    file_name: &'a str,
    document_base64: String,
}

#[derive(Debug, Default, Deserialize)]
struct SendDocumentResponse {
    #[serde(default, alias = "id")]
    message_id: Option<String>,
}

pub struct HttpMessagingGateway {
    config: HttpMessagingConfig,
    http_client: reqwest::Client,
}

impl HttpMessagingGateway {
    pub fn new(config: HttpMessagingConfig) -> Result<Self, MessagingError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| MessagingError::Network(e.to_string()))?;
        Ok(Self {
            config,
            http_client,
        })
    }
}

fn body(message: &DocumentMessage) -> SendDocumentBody<'_> {
    SendDocumentBody {
        recipient: &message.recipient,
        sender_name: &message.sender_name,
        caption: &message.caption,
        file_name: &message.file_name,
        document_base64: STANDARD.encode(&message.document),
    }
}

#[async_trait]
impl MessagingGateway for HttpMessagingGateway {
    async fn send_document(
        &self,
        message: &DocumentMessage,
    ) -> Result<DeliveryReceipt, MessagingError> {
        let response = self
            .http_client
            .post(&self.config.api_url)
            .bearer_auth(self.config.api_token.expose_secret())
            .json(&body(message))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    MessagingError::Timeout(self.config.request_timeout)
                } else {
                    MessagingError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), error = %error_text, "Messaging gateway rejected document");
            return Err(MessagingError::Rejected {
                status: status.as_u16(),
                message: error_text,
            });
        }

        // Some gateways answer 200 with an empty body.
        let text = response.text().await.unwrap_or_default();
        let parsed: SendDocumentResponse = serde_json::from_str(&text).unwrap_or_default();
        Ok(DeliveryReceipt {
            message_id: parsed.message_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_inlines_document_as_base64() {
        let message = DocumentMessage {
            recipient: "919876543210".to_string(),
            document: b"%PASS%".to_vec(),
            file_name: "pass-1.txt".to_string(),
            caption: "Trade Meet - visitor pass for Asha".to_string(),
            sender_name: "Registration Desk".to_string(),
        };
        let json = serde_json::to_value(body(&message)).unwrap();
        assert_eq!(json["document_base64"], "JVBBU1Ml");
        assert_eq!(json["recipient"], "919876543210");
    }

    #[test]
    fn response_accepts_id_alias_and_empty_body() {
        let parsed: SendDocumentResponse = serde_json::from_str(r#"{"id":"wamid.1"}"#).unwrap();
        assert_eq!(parsed.message_id.as_deref(), Some("wamid.1"));

        let empty: SendDocumentResponse = serde_json::from_str("").unwrap_or_default();
        assert!(empty.message_id.is_none());
    }
}
