//! ScanPassHandler - check-in by scanning the token printed on a pass.

use std::sync::Arc;

use crate::domain::pass::PassTokenService;
use crate::domain::registration::RegistrationError;
use crate::ports::RegistrationRepository;

use super::{CheckInCommand, CheckInHandler, CheckInResult};

/// Command carrying a scanned token.
#[derive(Debug, Clone)]
pub struct ScanPassCommand {
    pub token: String,
}

pub struct ScanPassHandler {
    tokens: PassTokenService,
    registrations: Arc<dyn RegistrationRepository>,
    check_in: CheckInHandler,
}

impl ScanPassHandler {
    pub fn new(tokens: PassTokenService, registrations: Arc<dyn RegistrationRepository>) -> Self {
        Self {
            tokens,
            check_in: CheckInHandler::new(registrations.clone()),
            registrations,
        }
    }

    pub async fn handle(&self, cmd: ScanPassCommand) -> Result<CheckInResult, RegistrationError> {
        let claims = self.tokens.verify(&cmd.token).map_err(|_| {
            tracing::warn!("Rejected pass scan with invalid token");
            RegistrationError::TokenInvalid
        })?;

        // A genuine token must still describe the stored registration.
        let registration = self
            .registrations
            .find_by_id(claims.registration_id)
            .await?
            .ok_or(RegistrationError::TokenInvalid)?;
        if registration.event_id != claims.event_id
            || registration.member_id != Some(claims.member_id)
        {
            return Err(RegistrationError::TokenInvalid);
        }

        self.check_in
            .handle(CheckInCommand {
                registration_id: claims.registration_id,
            })
            .await
    }
}
