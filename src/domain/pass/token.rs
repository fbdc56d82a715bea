//! Signed pass tokens.
//!
//! A pass token binds a registration to its event and member. It is printed
//! on the visitor pass and scanned at the venue, so it must be compact and
//! tamper-evident.
//!
//! # Format
//!
//! ```text
//! RDPASS.<base64url(registration_id | event_id | member_id | signature)>
//! ```
//!
//! Identifiers are big-endian `i64`s. The signature is HMAC-SHA256 over the
//! identifier bytes, truncated to 16 bytes.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::domain::foundation::{EventId, MemberId, RegistrationId, ValidationError};

/// Literal tag every token starts with.
pub const TOKEN_PREFIX: &str = "RDPASS.";

const ID_LEN: usize = 8;
const CLAIMS_LEN: usize = ID_LEN * 3;
const SIGNATURE_LEN: usize = 16;
const TOKEN_BYTES: usize = CLAIMS_LEN + SIGNATURE_LEN;

/// Identifiers recovered from a verified token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassClaims {
    pub registration_id: RegistrationId,
    pub event_id: EventId,
    pub member_id: MemberId,
}

/// Token verification failure. Deliberately carries no detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("pass token is invalid")]
pub struct TokenInvalid;

/// Issues and verifies pass tokens with a shared secret.
#[derive(Clone)]
pub struct PassTokenService {
    mac: Hmac<Sha256>,
}

impl PassTokenService {
    /// Creates a service keyed with `secret`.
    ///
    /// # Errors
    ///
    /// Returns `EmptyField` if the secret is empty.
    pub fn new(secret: &[u8]) -> Result<Self, ValidationError> {
        if secret.is_empty() {
            return Err(ValidationError::empty_field("pass_token_secret"));
        }
        let mac = Hmac::<Sha256>::new_from_slice(secret)
            .map_err(|e| ValidationError::invalid_format("pass_token_secret", e.to_string()))?;
        Ok(Self { mac })
    }

    /// Issues a token for the given identifiers.
    pub fn issue(
        &self,
        registration_id: RegistrationId,
        event_id: EventId,
        member_id: MemberId,
    ) -> String {
        let mut bytes = Vec::with_capacity(TOKEN_BYTES);
        bytes.extend_from_slice(&registration_id.value().to_be_bytes());
        bytes.extend_from_slice(&event_id.value().to_be_bytes());
        bytes.extend_from_slice(&member_id.value().to_be_bytes());
        let signature = self.sign(&bytes);
        bytes.extend_from_slice(&signature);

        format!("{}{}", TOKEN_PREFIX, URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Verifies a token and returns its claims.
    ///
    /// Every failure (missing prefix, bad encoding, wrong length, signature
    /// mismatch) yields the same `TokenInvalid`.
    pub fn verify(&self, token: &str) -> Result<PassClaims, TokenInvalid> {
        let encoded = token.trim().strip_prefix(TOKEN_PREFIX).ok_or(TokenInvalid)?;
        let bytes = URL_SAFE_NO_PAD.decode(encoded).map_err(|_| TokenInvalid)?;
        if bytes.len() != TOKEN_BYTES {
            return Err(TokenInvalid);
        }

        let (claims, signature) = bytes.split_at(CLAIMS_LEN);
        let expected = self.sign(claims);
        if !bool::from(expected[..].ct_eq(signature)) {
            return Err(TokenInvalid);
        }

        Ok(PassClaims {
            registration_id: RegistrationId::new(read_id(claims, 0)?),
            event_id: EventId::new(read_id(claims, 1)?),
            member_id: MemberId::new(read_id(claims, 2)?),
        })
    }

    fn sign(&self, claims: &[u8]) -> [u8; SIGNATURE_LEN] {
        let mut mac = self.mac.clone();
        mac.update(claims);
        let digest = mac.finalize().into_bytes();
        let mut truncated = [0u8; SIGNATURE_LEN];
        truncated.copy_from_slice(&digest[..SIGNATURE_LEN]);
        truncated
    }
}

impl std::fmt::Debug for PassTokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PassTokenService").finish_non_exhaustive()
    }
}

fn read_id(claims: &[u8], index: usize) -> Result<i64, TokenInvalid> {
    let start = index * ID_LEN;
    let raw: [u8; ID_LEN] = claims
        .get(start..start + ID_LEN)
        .and_then(|slice| slice.try_into().ok())
        .ok_or(TokenInvalid)?;
    Ok(i64::from_be_bytes(raw))
}
