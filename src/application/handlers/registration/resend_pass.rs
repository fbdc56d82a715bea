//! ResendPassHandler - operator-triggered pass delivery.
//!
//! A resend is only accepted when no pass has gone out and no attempt is in
//! flight. The delivery itself runs in the background through the same
//! lock as every other trigger.

use std::sync::Arc;

use crate::application::delivery::{DeliveryLockManager, NotificationDispatcher};
use crate::domain::foundation::{RegistrationId, Timestamp};
use crate::domain::registration::RegistrationError;
use crate::ports::RegistrationRepository;

#[derive(Debug, Clone)]
pub struct ResendPassCommand {
    pub registration_id: RegistrationId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResendPassResult {
    pub registration_id: RegistrationId,
    pub accepted: bool,
}

pub struct ResendPassHandler {
    registrations: Arc<dyn RegistrationRepository>,
    locks: Arc<DeliveryLockManager>,
    dispatcher: Arc<NotificationDispatcher>,
}

impl ResendPassHandler {
    pub fn new(
        registrations: Arc<dyn RegistrationRepository>,
        locks: Arc<DeliveryLockManager>,
        dispatcher: Arc<NotificationDispatcher>,
    ) -> Self {
        Self {
            registrations,
            locks,
            dispatcher,
        }
    }

    pub async fn handle(&self, cmd: ResendPassCommand) -> Result<ResendPassResult, RegistrationError> {
        let id = cmd.registration_id;
        let registration = self
            .registrations
            .find_by_id(id)
            .await?
            .ok_or_else(|| RegistrationError::registration_not_found(id))?;

        if !registration.is_counted() {
            return Err(RegistrationError::invalid_state(
                format!("{}/{}", registration.status, registration.payment_status),
                "resend a pass for",
            ));
        }

        let state = self.locks.peek(id).await?;
        if state.is_sent() {
            return Err(RegistrationError::invalid_state(
                "pass already delivered",
                "resend a pass for",
            ));
        }
        if state.is_locked(self.locks.stale_before(Timestamp::now())) {
            return Err(RegistrationError::LockUnavailable(id));
        }

        tracing::info!(registration_id = %id, "Pass resend accepted");
        self.dispatcher.spawn(id);

        Ok(ResendPassResult {
            registration_id: id,
            accepted: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Harness;
    use super::*;

    #[tokio::test]
    async fn pending_registration_cannot_resend() {
        let h = Harness::new();
        h.add_event(1, 500.0, None);
        h.add_member(7, "9876543210");
        let reg = h.register(1, 7).await.unwrap().registration;

        let err = h
            .resend_pass
            .handle(ResendPassCommand { registration_id: reg.id })
            .await
            .unwrap_err();
        assert!(matches!(err, RegistrationError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn delivered_pass_is_not_resent() {
        let h = Harness::new();
        h.add_event(2, 0.0, None);
        h.add_member(7, "9876543210");
        let reg = h.register(2, 7).await.unwrap().registration;
        h.wait_for_delivery(reg.id).await;

        let err = h
            .resend_pass
            .handle(ResendPassCommand { registration_id: reg.id })
            .await
            .unwrap_err();
        assert_eq!(
            err,
            RegistrationError::invalid_state("pass already delivered", "resend a pass for")
        );
    }

    #[tokio::test]
    async fn held_lock_reports_lock_unavailable() {
        let h = Harness::new();
        h.add_event(1, 500.0, None);
        h.add_member(7, "9876543210");
        let reg = h.register(1, 7).await.unwrap().registration;
        // A holder that never finishes.
        assert!(h.locks.acquire(reg.id).await.unwrap().acquired());
        h.confirm(&reg, "pay_1").await.unwrap();

        let err = h
            .resend_pass
            .handle(ResendPassCommand { registration_id: reg.id })
            .await
            .unwrap_err();
        assert_eq!(err, RegistrationError::LockUnavailable(reg.id));
    }
}
