//! The canonical workflow definitions.

use crate::domain::types::{Phase, SpecialistKind};
use crate::workflow::{WorkflowDefinition, WorkflowStep};

/// Name of the project lifecycle workflow.
pub const PROJECT_LIFECYCLE: &str = "project-lifecycle";

/// Name of the client onboarding workflow.
pub const CLIENT_ONBOARDING: &str = "client-onboarding";

/// Drives a project from intake through completion, one step per
/// lifecycle phase. The development step delegates to the frontend and
/// backend specialists concurrently.
pub fn project_lifecycle() -> WorkflowDefinition {
    WorkflowDefinition {
        name: PROJECT_LIFECYCLE.to_string(),
        steps: vec![
            step("initialize", None, vec![SpecialistKind::ProjectManager]),
            step(
                "research",
                Some(Phase::Research),
                vec![SpecialistKind::DeepResearch],
            ),
            step("design", Some(Phase::Design), vec![SpecialistKind::Design]),
            step(
                "development",
                Some(Phase::Development),
                vec![SpecialistKind::Frontend, SpecialistKind::Backend],
            ),
            step("qa", Some(Phase::Qa), vec![SpecialistKind::Qa]),
            step(
                "review",
                Some(Phase::Review),
                vec![SpecialistKind::ProjectManager],
            ),
            step(
                "completion",
                Some(Phase::Completed),
                vec![SpecialistKind::ProjectManager],
            ),
        ],
    }
}

/// Takes a lead from qualification through proposal to project intake,
/// terminating by handing off to the project lifecycle workflow.
pub fn client_onboarding() -> WorkflowDefinition {
    WorkflowDefinition {
        name: CLIENT_ONBOARDING.to_string(),
        steps: vec![
            step("qualify-lead", None, vec![SpecialistKind::ClientAcquisition]),
            step(
                "create-proposal",
                None,
                vec![SpecialistKind::ClientAcquisition],
            ),
            step(
                "initialize-project",
                None,
                vec![SpecialistKind::ProjectManager],
            ),
        ],
    }
}

/// Looks up a canonical workflow by name.
pub fn find(name: &str) -> Option<WorkflowDefinition> {
    match name {
        PROJECT_LIFECYCLE => Some(project_lifecycle()),
        CLIENT_ONBOARDING => Some(client_onboarding()),
        _ => None,
    }
}

fn step(name: &str, phase: Option<Phase>, specialists: Vec<SpecialistKind>) -> WorkflowStep {
    WorkflowStep {
        name: name.to_string(),
        phase,
        specialists,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::phase;

    #[test]
    fn test_lifecycle_covers_every_canonical_phase_in_order() {
        let definition = project_lifecycle();
        let phases: Vec<Phase> = definition.steps.iter().filter_map(|s| s.phase).collect();
        assert_eq!(
            phases,
            vec![
                Phase::Research,
                Phase::Design,
                Phase::Development,
                Phase::Qa,
                Phase::Review,
                Phase::Completed,
            ]
        );

        // Each step's phase is the canonical successor of the previous.
        let mut current = Phase::Intake;
        for target in phases {
            assert_eq!(phase::successor(current), Some(target));
            current = target;
        }
    }

    #[test]
    fn test_development_runs_frontend_and_backend_in_parallel() {
        let definition = project_lifecycle();
        let development = definition
            .steps
            .iter()
            .find(|s| s.name == "development")
            .expect("development step");
        assert_eq!(
            development.specialists,
            vec![SpecialistKind::Frontend, SpecialistKind::Backend]
        );
    }

    #[test]
    fn test_onboarding_has_three_project_less_steps() {
        let definition = client_onboarding();
        assert_eq!(definition.steps.len(), 3);
        assert!(definition.steps.iter().all(|s| s.phase.is_none()));
    }

    #[test]
    fn test_find_resolves_canonical_names() {
        assert!(find(PROJECT_LIFECYCLE).is_some());
        assert!(find(CLIENT_ONBOARDING).is_some());
        assert!(find("unknown").is_none());
    }
}
