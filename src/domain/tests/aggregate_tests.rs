use super::*;
use crate::domain::types::{RunId, TaskId, TaskPriority};
use cqrs_es::DomainEvent;

fn services() -> ProjectServices {
    ProjectServices::default()
}

fn details() -> ProjectDetails {
    ProjectDetails {
        name: "Acme marketing site".to_string(),
        description: "Marketing site with a component library".to_string(),
        client_id: ClientId::new(),
        requirements: ProjectRequirements {
            description: "Build a marketing site".to_string(),
            features: vec!["landing page".to_string(), "blog".to_string()],
            technical_stack: vec!["next.js".to_string()],
            ..Default::default()
        },
        timeline: ProjectTimeline::default(),
    }
}

async fn created() -> ProjectAggregate {
    let mut aggregate = ProjectAggregate::default();
    let events = aggregate
        .handle(
            ProjectCommand::CreateProject {
                details: Box::new(details()),
            },
            &services(),
        )
        .await
        .expect("create project");
    for event in events {
        aggregate.apply(event);
    }
    aggregate
}

async fn transition(
    aggregate: &mut ProjectAggregate,
    target: Phase,
) -> Result<Vec<ProjectEvent>, EngineError> {
    let events = aggregate
        .handle(
            ProjectCommand::TransitionPhase {
                target,
                notes: None,
                assigned_specialists: Vec::new(),
            },
            &services(),
        )
        .await?;
    for event in events.clone() {
        aggregate.apply(event);
    }
    Ok(events)
}

#[tokio::test]
async fn test_create_initializes_intake() {
    let aggregate = created().await;
    let data = aggregate.data().expect("active");

    assert_eq!(data.status(), Phase::Intake);
    assert_eq!(data.current_phase(), Phase::Intake);
    assert_eq!(data.phases().len(), 1);
    assert_eq!(data.phases()[0].phase, Phase::Intake);
    assert!(data.phases()[0].completed_at.is_none());
    assert!(data.held_phase().is_none());
}

#[tokio::test]
async fn test_create_twice_is_rejected() {
    let aggregate = created().await;
    let result = aggregate
        .handle(
            ProjectCommand::CreateProject {
                details: Box::new(details()),
            },
            &services(),
        )
        .await;
    assert!(matches!(result, Err(EngineError::Validation { .. })));
}

#[tokio::test]
async fn test_commands_on_uninitialized_are_rejected() {
    let aggregate = ProjectAggregate::default();
    let result = aggregate
        .handle(
            ProjectCommand::TransitionPhase {
                target: Phase::Research,
                notes: None,
                assigned_specialists: Vec::new(),
            },
            &services(),
        )
        .await;
    assert!(matches!(result, Err(EngineError::NotInitialized)));
}

#[tokio::test]
async fn test_advance_emits_exactly_one_status_changed_event() {
    let mut aggregate = created().await;
    let events = transition(&mut aggregate, Phase::Research)
        .await
        .expect("advance to research");

    assert_eq!(events.len(), 1);
    match &events[0] {
        ProjectEvent::ProjectStatusChanged {
            previous,
            new_status,
            ..
        } => {
            assert_eq!(*previous, Phase::Intake);
            assert_eq!(*new_status, Phase::Research);
        }
        other => panic!("unexpected event: {:?}", other),
    }
}

#[tokio::test]
async fn test_skipping_a_phase_is_rejected_and_state_unchanged() {
    let mut aggregate = created().await;
    transition(&mut aggregate, Phase::Research)
        .await
        .expect("advance to research");

    let result = transition(&mut aggregate, Phase::Development).await;
    assert_eq!(
        result,
        Err(EngineError::InvalidTransition {
            from: Phase::Research,
            to: Phase::Development,
        })
    );
    let data = aggregate.data().expect("active");
    assert_eq!(data.status(), Phase::Research);
    assert_eq!(data.current_phase(), Phase::Research);

    transition(&mut aggregate, Phase::Design)
        .await
        .expect("advance to design");
    assert_eq!(aggregate.data().expect("active").status(), Phase::Design);
}

#[tokio::test]
async fn test_current_phase_always_matches_last_record() {
    let mut aggregate = created().await;
    for target in [
        Phase::Research,
        Phase::Design,
        Phase::Development,
        Phase::Qa,
        Phase::Review,
        Phase::Completed,
    ] {
        transition(&mut aggregate, target).await.expect("advance");
        let data = aggregate.data().expect("active");
        let last = data.phases().last().expect("phase record");
        assert_eq!(data.current_phase(), last.phase);
        assert_eq!(data.status(), last.phase);
        // Every earlier record is closed.
        for record in &data.phases()[..data.phases().len() - 1] {
            assert!(record.completed_at.is_some());
        }
    }

    let data = aggregate.data().expect("active");
    assert_eq!(data.phases().len(), 7);
    assert!(data.timeline().actual_start.is_some());
    assert!(data.timeline().actual_end.is_some());
}

#[tokio::test]
async fn test_hold_remembers_phase_and_resume_restores_it() {
    let mut aggregate = created().await;
    transition(&mut aggregate, Phase::Research)
        .await
        .expect("advance");
    transition(&mut aggregate, Phase::OnHold).await.expect("hold");

    let data = aggregate.data().expect("active");
    assert_eq!(data.status(), Phase::OnHold);
    assert_eq!(data.held_phase(), Some(Phase::Research));

    // Resuming anywhere but the held phase is rejected.
    let result = transition(&mut aggregate, Phase::Design).await;
    assert!(matches!(
        result,
        Err(EngineError::InvalidTransition { .. })
    ));

    transition(&mut aggregate, Phase::Research)
        .await
        .expect("resume");
    let data = aggregate.data().expect("active");
    assert_eq!(data.status(), Phase::Research);
    assert!(data.held_phase().is_none());
    // Resume appends a fresh record for the held phase.
    assert_eq!(data.phases().last().expect("record").phase, Phase::Research);
}

#[tokio::test]
async fn test_cancelled_is_terminal() {
    let mut aggregate = created().await;
    transition(&mut aggregate, Phase::Cancelled)
        .await
        .expect("cancel");

    for target in [Phase::Research, Phase::OnHold, Phase::Cancelled] {
        let result = transition(&mut aggregate, target).await;
        assert!(matches!(
            result,
            Err(EngineError::InvalidTransition { .. })
        ));
    }
}

#[tokio::test]
async fn test_task_assigned_joins_assigned_specialist_set() {
    let mut aggregate = created().await;
    let events = aggregate
        .handle(
            ProjectCommand::RecordTaskAssigned {
                task_id: TaskId::new(),
                specialist: SpecialistKind::DeepResearch,
            },
            &services(),
        )
        .await
        .expect("record assignment");
    for event in events {
        aggregate.apply(event);
    }

    let data = aggregate.data().expect("active");
    assert_eq!(data.assigned_specialists(), &[SpecialistKind::DeepResearch]);
}

#[tokio::test]
async fn test_event_type_names_match_audit_vocabulary() {
    let mut aggregate = created().await;

    let cases: Vec<(ProjectCommand, &str)> = vec![
        (
            ProjectCommand::RecordTaskCreated {
                task_id: TaskId::new(),
                name: "research".to_string(),
                specialist: SpecialistKind::DeepResearch,
                priority: TaskPriority::High,
            },
            "task_created",
        ),
        (
            ProjectCommand::RecordTaskFailed {
                task_id: TaskId::new(),
                error: "boom".to_string(),
                retry_count: 3,
            },
            "task_failed",
        ),
        (
            ProjectCommand::RecordAgentStarted {
                specialist: SpecialistKind::Qa,
                task_id: None,
            },
            "agent_started",
        ),
        (
            ProjectCommand::RecordAgentError {
                specialist: SpecialistKind::Qa,
                task_id: None,
                error: "timeout".to_string(),
            },
            "agent_error",
        ),
        (
            ProjectCommand::RecordWorkflowStarted {
                workflow_name: "project-lifecycle".to_string(),
                run_id: RunId::new(),
            },
            "workflow_started",
        ),
        (
            ProjectCommand::RecordWorkflowFailed {
                workflow_name: "project-lifecycle".to_string(),
                run_id: RunId::new(),
                error: "step failed".to_string(),
            },
            "workflow_failed",
        ),
    ];

    for (command, expected) in cases {
        let events = aggregate
            .handle(command, &services())
            .await
            .expect("record command");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type(), expected);
        for event in events {
            aggregate.apply(event);
        }
    }
}
