//! Application handlers.
//!
//! Command handlers that orchestrate domain operations.

pub mod registration;

pub use registration::{
    CancelRegistrationCommand, CancelRegistrationHandler, CancelRegistrationResult,
    CheckInCommand, CheckInHandler, CheckInResult, ConfirmPaymentCommand, ConfirmPaymentHandler,
    ConfirmPaymentResult, RefundOutcome, RegisterCommand, RegisterHandler, RegisterResult,
    ResendPassCommand, ResendPassHandler, ResendPassResult, ScanPassCommand, ScanPassHandler,
    UnlockPassCommand, UnlockPassHandler, UnlockPassResult,
};
