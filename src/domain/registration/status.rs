//! Registration status state machines.
//!
//! A registration carries two independent axes: whether the attendee showed
//! up (attendance) and whether they settled the fee (payment).

use crate::domain::foundation::{StateMachine, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Attendance lifecycle of a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    /// Registered but not yet checked in.
    Registered,

    /// Checked in at the venue. May still be cancelled afterwards.
    Attended,

    /// Cancelled. Terminal.
    Cancelled,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Registered => "registered",
            AttendanceStatus::Attended => "attended",
            AttendanceStatus::Cancelled => "cancelled",
        }
    }
}

impl StateMachine for AttendanceStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use AttendanceStatus::*;
        matches!(
            (self, target),
            (Registered, Attended) | (Registered, Cancelled) | (Attended, Cancelled)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use AttendanceStatus::*;
        match self {
            Registered => vec![Attended, Cancelled],
            Attended => vec![Cancelled],
            Cancelled => vec![],
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttendanceStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "registered" => Ok(AttendanceStatus::Registered),
            "attended" => Ok(AttendanceStatus::Attended),
            "cancelled" => Ok(AttendanceStatus::Cancelled),
            other => Err(ValidationError::invalid_format(
                "status",
                format!("unknown attendance status '{}'", other),
            )),
        }
    }
}

/// Payment lifecycle of a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Order created, awaiting the gateway callback.
    Pending,

    /// Fee settled through the payment gateway.
    Paid,

    /// Event has no fee.
    Free,

    /// Paid amount returned after cancellation. Terminal.
    Refunded,
}

impl PaymentStatus {
    /// Returns true if a registration in this state occupies a seat.
    pub fn counts_toward_capacity(&self) -> bool {
        matches!(self, PaymentStatus::Paid | PaymentStatus::Free)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Free => "free",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl StateMachine for PaymentStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, target),
            (Pending, Paid) | (Pending, Free) | (Paid, Refunded)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use PaymentStatus::*;
        match self {
            Pending => vec![Paid, Free],
            Paid => vec![Refunded],
            Free | Refunded => vec![],
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "paid" => Ok(PaymentStatus::Paid),
            "free" => Ok(PaymentStatus::Free),
            "refunded" => Ok(PaymentStatus::Refunded),
            other => Err(ValidationError::invalid_format(
                "payment_status",
                format!("unknown payment status '{}'", other),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Attendance transitions

    #[test]
    fn registered_can_check_in_or_cancel() {
        let status = AttendanceStatus::Registered;
        assert_eq!(
            status.transition_to(AttendanceStatus::Attended),
            Ok(AttendanceStatus::Attended)
        );
        assert_eq!(
            status.transition_to(AttendanceStatus::Cancelled),
            Ok(AttendanceStatus::Cancelled)
        );
    }

    #[test]
    fn attended_can_still_be_cancelled() {
        assert!(AttendanceStatus::Attended.can_transition_to(&AttendanceStatus::Cancelled));
        assert!(!AttendanceStatus::Attended.can_transition_to(&AttendanceStatus::Registered));
    }

    #[test]
    fn cancelled_is_terminal() {
        let status = AttendanceStatus::Cancelled;
        assert!(status.is_terminal());
        assert!(status.transition_to(AttendanceStatus::Registered).is_err());
        assert!(status.transition_to(AttendanceStatus::Attended).is_err());
    }

    // Payment transitions

    #[test]
    fn pending_settles_as_paid_or_free() {
        assert!(PaymentStatus::Pending.can_transition_to(&PaymentStatus::Paid));
        assert!(PaymentStatus::Pending.can_transition_to(&PaymentStatus::Free));
        assert!(!PaymentStatus::Pending.can_transition_to(&PaymentStatus::Refunded));
    }

    #[test]
    fn only_paid_can_be_refunded() {
        assert!(PaymentStatus::Paid.can_transition_to(&PaymentStatus::Refunded));
        assert!(!PaymentStatus::Free.can_transition_to(&PaymentStatus::Refunded));
        assert!(PaymentStatus::Refunded.is_terminal());
    }

    #[test]
    fn paid_and_free_count_toward_capacity() {
        assert!(PaymentStatus::Paid.counts_toward_capacity());
        assert!(PaymentStatus::Free.counts_toward_capacity());
        assert!(!PaymentStatus::Pending.counts_toward_capacity());
        assert!(!PaymentStatus::Refunded.counts_toward_capacity());
    }

    #[test]
    fn storage_strings_parse_back() {
        for status in [
            PaymentStatus::Pending,
            PaymentStatus::Paid,
            PaymentStatus::Free,
            PaymentStatus::Refunded,
        ] {
            assert_eq!(status.as_str().parse::<PaymentStatus>(), Ok(status));
        }
        assert!("archived".parse::<AttendanceStatus>().is_err());
    }
}
