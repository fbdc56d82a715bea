//! Razorpay payment gateway adapter.
//!
//! - `RazorpayGateway` - Orders and refunds over the REST API
//! - `RazorpayConfig` - Credentials and API base URL

mod gateway;
mod wire_types;

pub use gateway::{RazorpayConfig, RazorpayGateway};
