//! CheckInHandler - Command handler for venue check-in.

use std::sync::Arc;

use crate::domain::foundation::{RegistrationId, Timestamp};
use crate::domain::registration::RegistrationError;
use crate::ports::RegistrationRepository;

use super::concurrent_modification;

/// Command to check an attendee in.
#[derive(Debug, Clone)]
pub struct CheckInCommand {
    pub registration_id: RegistrationId,
}

/// Result of a check-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckInResult {
    pub registration_id: RegistrationId,
    pub attended_at: Timestamp,
    pub already_checked_in: bool,
}

/// Handler for check-in. Idempotent: repeated check-ins return the first
/// check-in time.
pub struct CheckInHandler {
    registrations: Arc<dyn RegistrationRepository>,
}

impl CheckInHandler {
    pub fn new(registrations: Arc<dyn RegistrationRepository>) -> Self {
        Self { registrations }
    }

    pub async fn handle(&self, cmd: CheckInCommand) -> Result<CheckInResult, RegistrationError> {
        let id = cmd.registration_id;
        let mut registration = self
            .registrations
            .find_by_id(id)
            .await?
            .ok_or_else(|| RegistrationError::registration_not_found(id))?;

        let check_in = registration.check_in(Timestamp::now())?;
        if check_in.already_checked_in {
            return Ok(CheckInResult {
                registration_id: id,
                attended_at: check_in.attended_at,
                already_checked_in: true,
            });
        }

        if !self.registrations.update_if_version(&registration).await? {
            // Lost to a concurrent writer; a concurrent check-in is fine.
            let mut current = self
                .registrations
                .find_by_id(id)
                .await?
                .ok_or_else(|| RegistrationError::registration_not_found(id))?;
            let retry = current.check_in(Timestamp::now())?;
            if retry.already_checked_in {
                return Ok(CheckInResult {
                    registration_id: id,
                    attended_at: retry.attended_at,
                    already_checked_in: true,
                });
            }
            return Err(concurrent_modification(id, "check in"));
        }

        tracing::info!(registration_id = %id, "Attendee checked in");
        Ok(CheckInResult {
            registration_id: id,
            attended_at: check_in.attended_at,
            already_checked_in: false,
        })
    }
}
