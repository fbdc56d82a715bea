//! Axum router configuration for registration endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    cancel_registration, check_in, health, payment_callback, register, resend_pass, scan_pass,
    unlock_pass, RegistrationAppState,
};

/// Registration API routes, relative to `/api`.
///
/// # Routes
///
/// ## Member-facing
/// - `POST /events/:event_id/registrations` - Register for an event
/// - `POST /payments/callback` - Gateway checkout callback (signature verified)
///
/// ## Desk and operator
/// - `POST /registrations/:id/check-in` - Check in by id
/// - `POST /check-in/scan` - Check in by pass token
/// - `POST /registrations/:id/cancel` - Cancel, optionally refunding
/// - `POST /registrations/:id/pass/resend` - Resend the pass
/// - `POST /registrations/:id/pass/unlock` - Release a stuck delivery lock
pub fn registration_routes() -> Router<RegistrationAppState> {
    Router::new()
        .route("/events/:event_id/registrations", post(register))
        .route("/payments/callback", post(payment_callback))
        .route("/registrations/:id/check-in", post(check_in))
        .route("/check-in/scan", post(scan_pass))
        .route("/registrations/:id/cancel", post(cancel_registration))
        .route("/registrations/:id/pass/resend", post(resend_pass))
        .route("/registrations/:id/pass/unlock", post(unlock_pass))
}

/// Complete router: the API under `/api` plus `/health`.
pub fn registration_router() -> Router<RegistrationAppState> {
    Router::new()
        .nest("/api", registration_routes())
        .route("/health", get(health))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::application::handlers::registration::test_support::{Harness, CALLBACK_SECRET};
    use crate::application::sign_callback;

    fn state(h: &Harness) -> RegistrationAppState {
        RegistrationAppState {
            register: h.register.clone(),
            confirm_payment: h.confirm_payment.clone(),
            check_in: h.check_in.clone(),
            scan_pass: h.scan_pass.clone(),
            cancel: h.cancel.clone(),
            resend_pass: h.resend_pass.clone(),
            unlock_pass: h.unlock_pass.clone(),
            queue_available: false,
        }
    }

    fn app(h: &Harness) -> Router {
        registration_router().with_state(state(h))
    }

    async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn health_reports_queue_state() {
        let h = Harness::new();
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let response = app(&h).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn paid_registration_returns_order_then_confirms() {
        let h = Harness::new();
        h.add_event(1, 500.0, Some(10));
        h.add_member(1, "9845012345");

        let (status, body) =
            post_json(app(&h), "/api/events/1/registrations", json!({"member_id": 1})).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["registration"]["payment_status"], "pending");
        let order_id = body["order"]["id"].as_str().unwrap().to_string();

        let signature = sign_callback(CALLBACK_SECRET, &order_id, "pay_1");
        let (status, body) = post_json(
            app(&h),
            "/api/payments/callback",
            json!({"order_id": order_id, "payment_id": "pay_1", "signature": signature}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["newly_confirmed"], true);
        assert_eq!(body["registration"]["payment_status"], "paid");
    }

    #[tokio::test]
    async fn bad_signature_is_unauthorized() {
        let h = Harness::new();
        h.add_event(1, 500.0, None);
        h.add_member(1, "9845012345");
        let registered = h.register(1, 1).await.unwrap();
        let order_id = registered.registration.payment_order_id.unwrap();

        let (status, body) = post_json(
            app(&h),
            "/api/payments/callback",
            json!({"order_id": order_id, "payment_id": "pay_1", "signature": "00"}),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error_code"], "PAYMENT_SIGNATURE_INVALID");
    }

    #[tokio::test]
    async fn full_event_is_conflict() {
        let h = Harness::new();
        h.add_event(1, 0.0, Some(0));
        h.add_member(1, "9845012345");

        let (status, body) =
            post_json(app(&h), "/api/events/1/registrations", json!({"member_id": 1})).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error_code"], "CAPACITY_EXCEEDED");
    }

    #[tokio::test]
    async fn cancel_without_body_skips_refund() {
        let h = Harness::new();
        h.add_event(1, 0.0, None);
        h.add_member(1, "9845012345");
        let registered = h.register(1, 1).await.unwrap();
        let uri = format!("/api/registrations/{}/cancel", registered.registration.id);

        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = app(&h).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["registration"]["status"], "cancelled");
        assert_eq!(body["refund"]["status"], "not_requested");
    }

    #[tokio::test]
    async fn unknown_registration_check_in_is_not_found() {
        let h = Harness::new();
        let (status, body) = post_json(app(&h), "/api/registrations/999/check-in", json!({})).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error_code"], "REGISTRATION_NOT_FOUND");
    }
}
