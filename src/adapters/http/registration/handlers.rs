//! HTTP handlers for registration endpoints.
//!
//! These handlers connect Axum routes to the registration command handlers.

use std::sync::Arc;

use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::application::handlers::registration::{
    CancelRegistrationCommand, CancelRegistrationHandler, CheckInCommand, CheckInHandler,
    ConfirmPaymentCommand, ConfirmPaymentHandler, RegisterCommand, RegisterHandler,
    ResendPassCommand, ResendPassHandler, ScanPassCommand, ScanPassHandler, UnlockPassCommand,
    UnlockPassHandler,
};
use crate::domain::foundation::{DomainError, EventId, MemberId, RegistrationId};
use crate::domain::registration::{GatewayFailure, RegistrationError};

use super::dto::{
    CancelRegistrationRequest, CancelRegistrationResponse, CheckInResponse, ErrorResponse,
    HealthResponse, OrderResponse, PaymentCallbackRequest, PaymentCallbackResponse,
    RegisterRequest, RegisterResponse, RefundResponse, RegistrationResponse, ResendPassResponse,
    ScanPassRequest, UnlockPassResponse,
};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state.
///
/// Cloned per request; every handler is behind an Arc.
#[derive(Clone)]
pub struct RegistrationAppState {
    pub register: Arc<RegisterHandler>,
    pub confirm_payment: Arc<ConfirmPaymentHandler>,
    pub check_in: Arc<CheckInHandler>,
    pub scan_pass: Arc<ScanPassHandler>,
    pub cancel: Arc<CancelRegistrationHandler>,
    pub resend_pass: Arc<ResendPassHandler>,
    pub unlock_pass: Arc<UnlockPassHandler>,

    /// Reported by the health endpoint.
    pub queue_available: bool,
}

// ════════════════════════════════════════════════════════════════════════════════
// Command Handlers (POST endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/events/:event_id/registrations - Register a member
pub async fn register(
    State(state): State<RegistrationAppState>,
    Path(event_id): Path<i64>,
    Json(request): Json<RegisterRequest>,
) -> Result<impl IntoResponse, RegistrationApiError> {
    let cmd = RegisterCommand {
        event_id: EventId::new(event_id),
        member_id: MemberId::new(request.member_id),
    };

    let result = state.register.handle(cmd).await?;

    let status = if result.reused {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    let response = RegisterResponse {
        registration: RegistrationResponse::from(&result.registration),
        order: result.order.as_ref().map(OrderResponse::from),
        reused: result.reused,
    };

    Ok((status, Json(response)))
}

/// POST /api/payments/callback - Gateway checkout callback
pub async fn payment_callback(
    State(state): State<RegistrationAppState>,
    Json(request): Json<PaymentCallbackRequest>,
) -> Result<impl IntoResponse, RegistrationApiError> {
    let cmd = ConfirmPaymentCommand {
        order_id: request.order_id,
        payment_id: request.payment_id,
        signature: request.signature,
    };

    let result = state.confirm_payment.handle(cmd).await?;

    Ok(Json(PaymentCallbackResponse {
        registration: RegistrationResponse::from(&result.registration),
        newly_confirmed: result.newly_confirmed,
    }))
}

/// POST /api/registrations/:id/check-in - Check in by id
pub async fn check_in(
    State(state): State<RegistrationAppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, RegistrationApiError> {
    let cmd = CheckInCommand {
        registration_id: RegistrationId::new(id),
    };

    let result = state.check_in.handle(cmd).await?;
    Ok(Json(CheckInResponse::from(result)))
}

/// POST /api/check-in/scan - Check in by pass token
pub async fn scan_pass(
    State(state): State<RegistrationAppState>,
    Json(request): Json<ScanPassRequest>,
) -> Result<impl IntoResponse, RegistrationApiError> {
    let cmd = ScanPassCommand {
        token: request.token,
    };

    let result = state.scan_pass.handle(cmd).await?;
    Ok(Json(CheckInResponse::from(result)))
}

/// POST /api/registrations/:id/cancel - Cancel with optional refund
pub async fn cancel_registration(
    State(state): State<RegistrationAppState>,
    Path(id): Path<i64>,
    request: Option<Json<CancelRegistrationRequest>>,
) -> Result<impl IntoResponse, RegistrationApiError> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let cmd = CancelRegistrationCommand {
        registration_id: RegistrationId::new(id),
        refund_amount: request.refund_amount,
        reason: request.reason,
    };

    let result = state.cancel.handle(cmd).await?;

    Ok(Json(CancelRegistrationResponse {
        registration: RegistrationResponse::from(&result.registration),
        refund: RefundResponse::from(&result.refund),
    }))
}

/// POST /api/registrations/:id/pass/resend - Operator resend
pub async fn resend_pass(
    State(state): State<RegistrationAppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, RegistrationApiError> {
    let cmd = ResendPassCommand {
        registration_id: RegistrationId::new(id),
    };

    let result = state.resend_pass.handle(cmd).await?;
    Ok((StatusCode::ACCEPTED, Json(ResendPassResponse::from(result))))
}

/// POST /api/registrations/:id/pass/unlock - Operator lock release
pub async fn unlock_pass(
    State(state): State<RegistrationAppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, RegistrationApiError> {
    let cmd = UnlockPassCommand {
        registration_id: RegistrationId::new(id),
    };

    let result = state.unlock_pass.handle(cmd).await?;
    Ok(Json(UnlockPassResponse::from(result)))
}

/// GET /health - Liveness
pub async fn health(State(state): State<RegistrationAppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        queue_available: state.queue_available,
    })
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts registration errors to HTTP responses.
#[derive(Debug)]
pub struct RegistrationApiError(RegistrationError);

impl From<RegistrationError> for RegistrationApiError {
    fn from(err: RegistrationError) -> Self {
        Self(err)
    }
}

impl From<DomainError> for RegistrationApiError {
    fn from(err: DomainError) -> Self {
        Self(RegistrationError::from(err))
    }
}

impl RegistrationApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            RegistrationError::Validation { .. } => StatusCode::BAD_REQUEST,
            RegistrationError::NotFound { .. } => StatusCode::NOT_FOUND,
            RegistrationError::AlreadyRegistered { .. }
            | RegistrationError::CapacityExceeded(_)
            | RegistrationError::InvalidState { .. }
            | RegistrationError::LockUnavailable(_) => StatusCode::CONFLICT,
            RegistrationError::PaymentSignature | RegistrationError::TokenInvalid => {
                StatusCode::UNAUTHORIZED
            }
            RegistrationError::RefundExceedsPaidAmount { .. }
            | RegistrationError::RefundNotAllowed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            RegistrationError::Gateway { failure, .. } => match failure {
                GatewayFailure::Rejected => StatusCode::BAD_GATEWAY,
                GatewayFailure::Unreachable => StatusCode::SERVICE_UNAVAILABLE,
            },
            RegistrationError::Infrastructure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RegistrationApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        }

        let body = match &self.0 {
            RegistrationError::RefundExceedsPaidAmount { requested, paid } => {
                ErrorResponse::with_details(
                    self.0.code().to_string(),
                    self.0.message(),
                    serde_json::json!({
                        "requested_minor": requested.minor_units(),
                        "paid_minor": paid.minor_units(),
                    }),
                )
            }
            // Internal detail stays in the logs.
            RegistrationError::Infrastructure(_) => {
                ErrorResponse::new(self.0.code().to_string(), "Internal error")
            }
            _ => ErrorResponse::new(self.0.code().to_string(), self.0.message()),
        };

        (status, Json(body)).into_response()
    }
}
