//! Razorpay request and response bodies.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct OrderBody<'a> {
    /// Minor units (paise).
    pub amount: i64,
    pub currency: &'a str,
    pub receipt: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct OrderResponse {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct RefundBody<'a> {
    pub amount: i64,
    pub notes: &'a HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct RefundResponse {
    pub id: String,
    pub amount: i64,
    pub status: String,
}

/// Error envelope: `{"error": {"code": "...", "description": "..."}}`.
#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub code: Option<String>,
    pub description: Option<String>,
}
