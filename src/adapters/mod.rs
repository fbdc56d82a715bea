//! Adapters - Implementations of port interfaces.
//!
//! - `postgres` - Registrations, delivery marker, events and members
//! - `redis` - Delivery job queue
//! - `razorpay` - Payment gateway client
//! - `messaging` - Chat document delivery over HTTP
//! - `pass` - Plain-text pass renderer
//! - `http` - Axum REST API
//! - `memory` - In-process implementations for tests and local runs

pub mod http;
pub mod memory;
pub mod messaging;
pub mod pass;
pub mod postgres;
pub mod razorpay;
pub mod redis;
