//! Pass domain module.
//!
//! Signed, scannable tokens printed on visitor passes.

mod token;

pub use token::{PassClaims, PassTokenService, TokenInvalid, TOKEN_PREFIX};
