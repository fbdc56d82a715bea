//! UnlockPassHandler - operator recovery for a stuck delivery lock.

use std::sync::Arc;

use crate::application::delivery::DeliveryLockManager;
use crate::domain::foundation::RegistrationId;
use crate::domain::registration::RegistrationError;

#[derive(Debug, Clone)]
pub struct UnlockPassCommand {
    pub registration_id: RegistrationId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnlockPassResult {
    pub registration_id: RegistrationId,

    /// False when there was no lock to clear.
    pub released: bool,
}

/// Clears the delivery lock of an unsent registration so it can be retried.
/// A registration whose pass was sent keeps its marker.
pub struct UnlockPassHandler {
    locks: Arc<DeliveryLockManager>,
}

impl UnlockPassHandler {
    pub fn new(locks: Arc<DeliveryLockManager>) -> Self {
        Self { locks }
    }

    pub async fn handle(&self, cmd: UnlockPassCommand) -> Result<UnlockPassResult, RegistrationError> {
        let id = cmd.registration_id;
        let state = self.locks.peek(id).await?;
        if state.is_sent() {
            return Err(RegistrationError::invalid_state(
                "pass already delivered",
                "unlock delivery for",
            ));
        }

        let released = self.locks.force_release(id).await?;
        Ok(UnlockPassResult {
            registration_id: id,
            released,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Harness;
    use super::*;

    #[tokio::test]
    async fn unlock_frees_a_held_lock() {
        let h = Harness::new();
        h.add_event(1, 500.0, None);
        h.add_member(7, "9876543210");
        let reg = h.register(1, 7).await.unwrap().registration;
        assert!(h.locks.acquire(reg.id).await.unwrap().acquired());

        let result = h
            .unlock_pass
            .handle(UnlockPassCommand { registration_id: reg.id })
            .await
            .unwrap();
        assert!(result.released);
        assert!(h.locks.is_free(reg.id).await.unwrap());
    }

    #[tokio::test]
    async fn unlock_without_lock_reports_nothing_released() {
        let h = Harness::new();
        h.add_event(1, 500.0, None);
        h.add_member(7, "9876543210");
        let reg = h.register(1, 7).await.unwrap().registration;

        let result = h
            .unlock_pass
            .handle(UnlockPassCommand { registration_id: reg.id })
            .await
            .unwrap();
        assert!(!result.released);
    }

    #[tokio::test]
    async fn unknown_registration_is_not_found() {
        let h = Harness::new();
        let err = h
            .unlock_pass
            .handle(UnlockPassCommand {
                registration_id: RegistrationId::new(404),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RegistrationError::NotFound { .. }));
    }
}
