//! Registration-specific error types.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | Validation | 400 |
//! | NotFound | 404 |
//! | AlreadyRegistered | 409 |
//! | CapacityExceeded | 409 |
//! | InvalidState | 409 |
//! | PaymentSignature | 401 |
//! | RefundExceedsPaidAmount | 422 |
//! | RefundNotAllowed | 422 |
//! | TokenInvalid | 401 |
//! | LockUnavailable | 409 |
//! | Gateway (rejected) | 502 |
//! | Gateway (unreachable) | 503 |
//! | Infrastructure | 500 |

use crate::domain::foundation::{
    DomainError, ErrorCode, EventId, MemberId, Money, RegistrationId, ValidationError,
};

/// How a payment gateway call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayFailure {
    /// The gateway answered and refused the request.
    Rejected,

    /// The request never got an answer (network error, timeout).
    Unreachable,
}

/// Registration-specific errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// Input failed validation.
    Validation { field: String, message: String },

    /// Event is full.
    CapacityExceeded(EventId),

    /// Member already holds a settled registration for the event.
    AlreadyRegistered {
        event_id: EventId,
        member_id: MemberId,
    },

    /// Payment callback signature did not verify.
    PaymentSignature,

    /// Requested refund is larger than what was paid.
    RefundExceedsPaidAmount { requested: Money, paid: Money },

    /// Refund requested without a valid prior payment.
    RefundNotAllowed(String),

    /// Pass token is malformed or its signature does not match.
    TokenInvalid,

    /// Delivery lock could not be taken.
    LockUnavailable(RegistrationId),

    /// Payment gateway refused the request or could not be reached.
    Gateway {
        failure: GatewayFailure,
        message: String,
    },

    /// Referenced entity does not exist.
    NotFound { resource: &'static str, id: String },

    /// Operation is not allowed in the current state.
    InvalidState { current: String, attempted: String },

    /// Storage, queue, or other infrastructure failure.
    Infrastructure(String),
}

impl RegistrationError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        RegistrationError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn capacity_exceeded(event_id: EventId) -> Self {
        RegistrationError::CapacityExceeded(event_id)
    }

    pub fn already_registered(event_id: EventId, member_id: MemberId) -> Self {
        RegistrationError::AlreadyRegistered {
            event_id,
            member_id,
        }
    }

    pub fn refund_exceeds_paid(requested: Money, paid: Money) -> Self {
        RegistrationError::RefundExceedsPaidAmount { requested, paid }
    }

    pub fn refund_not_allowed(reason: impl Into<String>) -> Self {
        RegistrationError::RefundNotAllowed(reason.into())
    }

    pub fn gateway_rejected(message: impl Into<String>) -> Self {
        RegistrationError::Gateway {
            failure: GatewayFailure::Rejected,
            message: message.into(),
        }
    }

    pub fn gateway_unreachable(message: impl Into<String>) -> Self {
        RegistrationError::Gateway {
            failure: GatewayFailure::Unreachable,
            message: message.into(),
        }
    }

    pub fn registration_not_found(id: RegistrationId) -> Self {
        RegistrationError::NotFound {
            resource: "registration",
            id: id.to_string(),
        }
    }

    pub fn order_not_found(order_id: impl Into<String>) -> Self {
        RegistrationError::NotFound {
            resource: "registration",
            id: order_id.into(),
        }
    }

    pub fn event_not_found(id: EventId) -> Self {
        RegistrationError::NotFound {
            resource: "event",
            id: id.to_string(),
        }
    }

    pub fn member_not_found(id: MemberId) -> Self {
        RegistrationError::NotFound {
            resource: "member",
            id: id.to_string(),
        }
    }

    pub fn invalid_state(current: impl Into<String>, attempted: impl Into<String>) -> Self {
        RegistrationError::InvalidState {
            current: current.into(),
            attempted: attempted.into(),
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        RegistrationError::Infrastructure(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            RegistrationError::Validation { .. } => ErrorCode::ValidationFailed,
            RegistrationError::CapacityExceeded(_) => ErrorCode::CapacityExceeded,
            RegistrationError::AlreadyRegistered { .. } => ErrorCode::AlreadyRegistered,
            RegistrationError::PaymentSignature => ErrorCode::PaymentSignatureInvalid,
            RegistrationError::RefundExceedsPaidAmount { .. } => {
                ErrorCode::RefundExceedsPaidAmount
            }
            RegistrationError::RefundNotAllowed(_) => ErrorCode::RefundNotAllowed,
            RegistrationError::TokenInvalid => ErrorCode::TokenInvalid,
            RegistrationError::LockUnavailable(_) => ErrorCode::LockUnavailable,
            RegistrationError::Gateway { failure, .. } => match failure {
                GatewayFailure::Rejected => ErrorCode::PaymentGatewayError,
                GatewayFailure::Unreachable => ErrorCode::PaymentGatewayUnavailable,
            },
            RegistrationError::NotFound { resource, .. } => match *resource {
                "event" => ErrorCode::EventNotFound,
                "member" => ErrorCode::MemberNotFound,
                _ => ErrorCode::RegistrationNotFound,
            },
            RegistrationError::InvalidState { .. } => ErrorCode::InvalidStateTransition,
            RegistrationError::Infrastructure(_) => ErrorCode::InternalError,
        }
    }

    /// Returns a user-friendly error message.
    pub fn message(&self) -> String {
        match self {
            RegistrationError::Validation { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            RegistrationError::CapacityExceeded(event_id) => {
                format!("Event {} has reached its attendee limit", event_id)
            }
            RegistrationError::AlreadyRegistered {
                event_id,
                member_id,
            } => format!(
                "Member {} is already registered for event {}",
                member_id, event_id
            ),
            RegistrationError::PaymentSignature => {
                "Payment signature verification failed".to_string()
            }
            RegistrationError::RefundExceedsPaidAmount { requested, paid } => format!(
                "Refund amount {} exceeds amount paid {}",
                requested, paid
            ),
            RegistrationError::RefundNotAllowed(reason) => {
                format!("Refund not allowed: {}", reason)
            }
            RegistrationError::TokenInvalid => "Pass token is invalid".to_string(),
            RegistrationError::LockUnavailable(id) => {
                format!("Delivery for registration {} is locked", id)
            }
            RegistrationError::Gateway { failure, message } => match failure {
                GatewayFailure::Rejected => format!("The payment gateway refused: {}", message),
                GatewayFailure::Unreachable => {
                    format!("The payment gateway could not be reached: {}", message)
                }
            },
            RegistrationError::NotFound { resource, id } => {
                format!("{} not found: {}", capitalize(resource), id)
            }
            RegistrationError::InvalidState { current, attempted } => {
                format!("Cannot {} a registration that is {}", attempted, current)
            }
            RegistrationError::Infrastructure(msg) => format!("Error: {}", msg),
        }
    }

    /// Returns true if repeating the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RegistrationError::Infrastructure(_)
                | RegistrationError::Gateway {
                    failure: GatewayFailure::Unreachable,
                    ..
                }
        )
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl std::fmt::Display for RegistrationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for RegistrationError {}

impl From<DomainError> for RegistrationError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ValidationFailed => RegistrationError::Validation {
                field: err
                    .details
                    .get("field")
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
                message: err.message,
            },
            ErrorCode::InvalidStateTransition => RegistrationError::InvalidState {
                current: err
                    .details
                    .get("current")
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
                attempted: err.message,
            },
            ErrorCode::PaymentGatewayError => RegistrationError::gateway_rejected(err.message),
            ErrorCode::PaymentGatewayUnavailable => {
                RegistrationError::gateway_unreachable(err.message)
            }
            ErrorCode::PaymentSignatureInvalid => RegistrationError::PaymentSignature,
            ErrorCode::TokenInvalid => RegistrationError::TokenInvalid,
            ErrorCode::RegistrationNotFound => not_found("registration", err),
            ErrorCode::EventNotFound => not_found("event", err),
            ErrorCode::MemberNotFound => not_found("member", err),
            _ => RegistrationError::Infrastructure(err.to_string()),
        }
    }
}

fn not_found(resource: &'static str, err: DomainError) -> RegistrationError {
    let id = err.details.get("id").cloned().unwrap_or(err.message);
    RegistrationError::NotFound { resource, id }
}

impl From<ValidationError> for RegistrationError {
    fn from(err: ValidationError) -> Self {
        RegistrationError::Validation {
            field: err.field().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<RegistrationError> for DomainError {
    fn from(err: RegistrationError) -> Self {
        DomainError::new(err.code(), err.message())
    }
}
