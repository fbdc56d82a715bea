//! Messaging gateway adapters.
//!
//! - `HttpMessagingGateway` - Sends pass documents through a chat gateway's HTTP API

mod http_gateway;

pub use http_gateway::{HttpMessagingConfig, HttpMessagingGateway};
