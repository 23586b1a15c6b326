use super::*;
use crate::domain::cqrs::events::ProjectDetails;
use crate::domain::types::{ArtifactKind, ClientId, SpecialistKind};

fn project_created() -> ProjectEvent {
    ProjectEvent::ProjectCreated {
        details: Box::new(ProjectDetails {
            name: "Acme site".to_string(),
            description: "Marketing site".to_string(),
            client_id: ClientId::new(),
            requirements: ProjectRequirements {
                description: "Build a marketing site".to_string(),
                ..Default::default()
            },
            timeline: ProjectTimeline::default(),
        }),
        created_at: TimestampUtc::now(),
    }
}

fn status_changed(previous: Phase, new_status: Phase) -> ProjectEvent {
    ProjectEvent::ProjectStatusChanged {
        previous,
        new_status,
        notes: None,
        assigned_specialists: vec![SpecialistKind::DeepResearch],
        changed_at: TimestampUtc::now(),
    }
}

#[test]
fn test_view_is_rebuilt_from_events_alone() {
    let aggregate_id = ProjectId::new().to_string();
    let mut view = ProjectView::default();

    view.apply_event(&aggregate_id, &project_created(), 1);
    assert_eq!(view.name(), Some("Acme site"));
    assert_eq!(view.status(), Phase::Intake);
    assert_eq!(view.phases().len(), 1);
    assert_eq!(view.last_event_sequence(), 1);

    view.apply_event(&aggregate_id, &status_changed(Phase::Intake, Phase::Research), 2);
    assert_eq!(view.status(), Phase::Research);
    assert_eq!(view.current_phase(), Phase::Research);
    assert_eq!(view.phases().len(), 2);
    assert_eq!(view.assigned_specialists(), &[SpecialistKind::DeepResearch]);
    assert_eq!(view.last_event_sequence(), 2);
    assert!(view.timeline().actual_start.is_some());
}

#[test]
fn test_view_tracks_hold_state() {
    let aggregate_id = ProjectId::new().to_string();
    let mut view = ProjectView::default();
    view.apply_event(&aggregate_id, &project_created(), 1);
    view.apply_event(&aggregate_id, &status_changed(Phase::Intake, Phase::Research), 2);
    view.apply_event(&aggregate_id, &status_changed(Phase::Research, Phase::OnHold), 3);

    assert_eq!(view.status(), Phase::OnHold);
    assert_eq!(view.held_phase(), Some(Phase::Research));

    view.apply_event(&aggregate_id, &status_changed(Phase::OnHold, Phase::Research), 4);
    assert_eq!(view.status(), Phase::Research);
    assert!(view.held_phase().is_none());
}

#[test]
fn test_view_collects_artifacts_and_runs() {
    let aggregate_id = ProjectId::new().to_string();
    let mut view = ProjectView::default();
    view.apply_event(&aggregate_id, &project_created(), 1);

    let artifact_id = ArtifactId::new();
    view.apply_event(
        &aggregate_id,
        &ProjectEvent::ArtifactCreated {
            artifact_id,
            kind: ArtifactKind::Wireframe,
            name: "homepage".to_string(),
            version: 1,
            created_by: SpecialistKind::Design,
            created_at: TimestampUtc::now(),
        },
        2,
    );

    let run_id = RunId::new();
    view.apply_event(
        &aggregate_id,
        &ProjectEvent::WorkflowStarted {
            workflow_name: "project-lifecycle".to_string(),
            run_id,
            started_at: TimestampUtc::now(),
        },
        3,
    );

    assert_eq!(view.artifact_ids(), &[artifact_id]);
    assert_eq!(view.workflow_runs(), &[run_id]);
    assert_eq!(view.project_id().map(|id| id.to_string()), Some(aggregate_id));
}
