//! Pure lifecycle transition rules.
//!
//! The canonical phase sequence is
//! `intake → research → design → development → qa → review → completed`,
//! with `on_hold` and `cancelled` reachable from any non-terminal phase.
//! A held project may only resume to the phase it held from, or be
//! cancelled. `completed` and `cancelled` are terminal.

use crate::domain::errors::EngineError;
use crate::domain::types::Phase;

/// The canonical forward sequence, in order.
pub const CANONICAL_SEQUENCE: [Phase; 7] = [
    Phase::Intake,
    Phase::Research,
    Phase::Design,
    Phase::Development,
    Phase::Qa,
    Phase::Review,
    Phase::Completed,
];

/// What a legal transition does to the project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    /// Advance to the immediate successor in the canonical sequence.
    Advance,
    /// Suspend to `on_hold`, remembering the current phase.
    Hold,
    /// Resume from `on_hold` back to the held phase.
    Resume,
    /// Terminally cancel the project.
    Cancel,
}

/// Returns the immediate successor of `phase` in the canonical sequence,
/// or `None` for the last phase and the side states.
pub fn successor(phase: Phase) -> Option<Phase> {
    CANONICAL_SEQUENCE
        .iter()
        .position(|p| *p == phase)
        .and_then(|idx| CANONICAL_SEQUENCE.get(idx + 1))
        .copied()
}

/// Whether no transition is legal out of `phase`.
pub fn is_terminal(phase: Phase) -> bool {
    matches!(phase, Phase::Completed | Phase::Cancelled)
}

/// Classifies the transition `current → target`, given the phase held
/// before an `on_hold` suspension (if any).
///
/// Fails with [`EngineError::InvalidTransition`] unless `target` is the
/// immediate canonical successor, `on_hold`, `cancelled`, or a resume from
/// `on_hold` back to the held phase.
pub fn classify_transition(
    current: Phase,
    target: Phase,
    held: Option<Phase>,
) -> Result<TransitionKind, EngineError> {
    let invalid = || EngineError::InvalidTransition {
        from: current,
        to: target,
    };

    if is_terminal(current) {
        return Err(invalid());
    }

    match target {
        Phase::Cancelled => Ok(TransitionKind::Cancel),
        Phase::OnHold => {
            if current == Phase::OnHold {
                Err(invalid())
            } else {
                Ok(TransitionKind::Hold)
            }
        }
        _ if current == Phase::OnHold => {
            if held == Some(target) {
                Ok(TransitionKind::Resume)
            } else {
                Err(invalid())
            }
        }
        _ if successor(current) == Some(target) => Ok(TransitionKind::Advance),
        _ => Err(invalid()),
    }
}

#[cfg(test)]
#[path = "tests/phase_tests.rs"]
mod tests;
