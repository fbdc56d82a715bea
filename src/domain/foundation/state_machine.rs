//! State machine trait for status enums.
//!
//! Status enums describe their legal edges once; the aggregate asks the
//! enum before mutating itself so illegal transitions never reach storage.

use super::ValidationError;

/// Trait for status enums that represent state machines.
///
/// # Example
///
/// ```ignore
/// impl StateMachine for AttendanceStatus {
///     fn can_transition_to(&self, target: &Self) -> bool {
///         matches!((self, target), (Registered, Attended) | (Registered, Cancelled))
///     }
///
///     fn valid_transitions(&self) -> Vec<Self> {
///         match self {
///             Registered => vec![Attended, Cancelled],
///             // ...
///         }
///     }
/// }
///
/// let next = current.transition_to(AttendanceStatus::Attended)?;
/// ```
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Returns true if transition from self to target is valid.
    fn can_transition_to(&self, target: &Self) -> bool;

    /// Returns all valid target states from current state.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Performs transition with validation, returning error if invalid.
    fn transition_to(&self, target: Self) -> Result<Self, ValidationError> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(ValidationError::invalid_format(
                "state_transition",
                format!("Cannot transition from {:?} to {:?}", self, target),
            ))
        }
    }

    /// Checks if current state is terminal (no valid outgoing transitions).
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}
