//! Result status state machine.
//!
//! ```text
//! NEW -> COMPLETE | FAILED
//! COMPLETE | FAILED: terminal, no further transitions
//! ```

use serde::{Deserialize, Serialize};

use crate::error::TaskError;

/// Lifecycle status of a task result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultStatus {
    /// Enqueued, not yet executed
    New,
    /// Executed and returned a value
    Complete,
    /// Executed and failed
    Failed,
}

impl std::fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ResultStatus::New => "NEW",
            ResultStatus::Complete => "COMPLETE",
            ResultStatus::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// Validate a result status transition.
///
/// Returns `Ok(())` if the transition is valid, or `Err(TaskError)` if not.
pub fn validate_transition(from: ResultStatus, to: ResultStatus) -> Result<(), TaskError> {
    match from {
        ResultStatus::New => match to {
            ResultStatus::Complete | ResultStatus::Failed => Ok(()),
            ResultStatus::New => Err(TaskError::InvalidTransition {
                current: from,
                requested: to,
            }),
        },
        ResultStatus::Complete | ResultStatus::Failed => Err(TaskError::TerminalState(from)),
    }
}

/// Returns `true` if the status is terminal (no further transitions allowed).
pub fn is_terminal(status: ResultStatus) -> bool {
    matches!(status, ResultStatus::Complete | ResultStatus::Failed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_new_transitions() {
        assert!(validate_transition(ResultStatus::New, ResultStatus::Complete).is_ok());
        assert!(validate_transition(ResultStatus::New, ResultStatus::Failed).is_ok());
    }

    #[test]
    fn test_invalid_new_to_new() {
        assert!(matches!(
            validate_transition(ResultStatus::New, ResultStatus::New),
            Err(TaskError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_terminal_states_reject_all_transitions() {
        for terminal in [ResultStatus::Complete, ResultStatus::Failed] {
            for target in [
                ResultStatus::New,
                ResultStatus::Complete,
                ResultStatus::Failed,
            ] {
                match validate_transition(terminal, target) {
                    Err(TaskError::TerminalState(s)) => assert_eq!(s, terminal),
                    other => panic!(
                        "Expected TerminalState for {:?} -> {:?}, got: {:?}",
                        terminal, target, other
                    ),
                }
            }
        }
    }

    #[test]
    fn test_is_terminal() {
        assert!(!is_terminal(ResultStatus::New));
        assert!(is_terminal(ResultStatus::Complete));
        assert!(is_terminal(ResultStatus::Failed));
    }

    #[test]
    fn test_wire_format() {
        assert_eq!(
            serde_json::to_value(ResultStatus::Complete).unwrap(),
            serde_json::json!("COMPLETE")
        );
        assert_eq!(ResultStatus::Failed.to_string(), "FAILED");
    }
}
