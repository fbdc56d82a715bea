//! Registration Desk - Event registration and pass delivery
//!
//! This crate runs the registration lifecycle for an association's events:
//! intake with capacity limits, payment confirmation, check-in, cancellation
//! with refunds, and at-most-once delivery of a signed pass over chat.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
