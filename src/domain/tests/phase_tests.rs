use super::*;
use proptest::prelude::*;

const ALL_PHASES: [Phase; 9] = [
    Phase::Intake,
    Phase::Research,
    Phase::Design,
    Phase::Development,
    Phase::Qa,
    Phase::Review,
    Phase::Completed,
    Phase::OnHold,
    Phase::Cancelled,
];

#[test]
fn test_successor_walks_canonical_sequence() {
    assert_eq!(successor(Phase::Intake), Some(Phase::Research));
    assert_eq!(successor(Phase::Research), Some(Phase::Design));
    assert_eq!(successor(Phase::Design), Some(Phase::Development));
    assert_eq!(successor(Phase::Development), Some(Phase::Qa));
    assert_eq!(successor(Phase::Qa), Some(Phase::Review));
    assert_eq!(successor(Phase::Review), Some(Phase::Completed));
    assert_eq!(successor(Phase::Completed), None);
    assert_eq!(successor(Phase::OnHold), None);
    assert_eq!(successor(Phase::Cancelled), None);
}

#[test]
fn test_advance_along_canonical_sequence() {
    for window in CANONICAL_SEQUENCE.windows(2) {
        let result = classify_transition(window[0], window[1], None);
        assert_eq!(result, Ok(TransitionKind::Advance));
    }
}

#[test]
fn test_skipping_a_phase_is_invalid() {
    let result = classify_transition(Phase::Research, Phase::Development, None);
    assert_eq!(
        result,
        Err(EngineError::InvalidTransition {
            from: Phase::Research,
            to: Phase::Development,
        })
    );
}

#[test]
fn test_moving_backwards_is_invalid() {
    assert!(classify_transition(Phase::Qa, Phase::Design, None).is_err());
    assert!(classify_transition(Phase::Research, Phase::Intake, None).is_err());
}

#[test]
fn test_hold_and_cancel_reachable_from_any_non_terminal_phase() {
    for current in [
        Phase::Intake,
        Phase::Research,
        Phase::Design,
        Phase::Development,
        Phase::Qa,
        Phase::Review,
    ] {
        assert_eq!(
            classify_transition(current, Phase::OnHold, None),
            Ok(TransitionKind::Hold)
        );
        assert_eq!(
            classify_transition(current, Phase::Cancelled, None),
            Ok(TransitionKind::Cancel)
        );
    }
}

#[test]
fn test_resume_only_to_held_phase() {
    assert_eq!(
        classify_transition(Phase::OnHold, Phase::Design, Some(Phase::Design)),
        Ok(TransitionKind::Resume)
    );
    assert!(classify_transition(Phase::OnHold, Phase::Qa, Some(Phase::Design)).is_err());
    assert!(classify_transition(Phase::OnHold, Phase::Design, None).is_err());
}

#[test]
fn test_held_project_can_still_be_cancelled() {
    assert_eq!(
        classify_transition(Phase::OnHold, Phase::Cancelled, Some(Phase::Qa)),
        Ok(TransitionKind::Cancel)
    );
}

#[test]
fn test_holding_a_held_project_is_invalid() {
    assert!(classify_transition(Phase::OnHold, Phase::OnHold, Some(Phase::Qa)).is_err());
}

#[test]
fn test_terminal_phases_reject_every_transition() {
    for current in [Phase::Completed, Phase::Cancelled] {
        for target in ALL_PHASES {
            assert!(
                classify_transition(current, target, None).is_err(),
                "{} -> {} must be rejected",
                current,
                target
            );
        }
    }
}

proptest! {
    /// Any target that is not the canonical successor, `on_hold`, or
    /// `cancelled` is rejected, and legality is exactly the rule set.
    #[test]
    fn prop_legality_matches_rules(current_idx in 0usize..7, target_idx in 0usize..9) {
        let current = CANONICAL_SEQUENCE[current_idx];
        let target = ALL_PHASES[target_idx];

        let result = classify_transition(current, target, None);
        let legal = !is_terminal(current)
            && (target == Phase::Cancelled
                || target == Phase::OnHold
                || successor(current) == Some(target));

        prop_assert_eq!(result.is_ok(), legal);
        if let Err(EngineError::InvalidTransition { from, to }) = result {
            prop_assert_eq!(from, current);
            prop_assert_eq!(to, target);
        }
    }
}
