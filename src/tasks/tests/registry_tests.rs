use super::*;
use crate::domain::types::{DependencyKind, Phase, TaskPriority};
use crate::specialists::protocol::{CoordinationBrief, SpecialistInput};
use crate::tasks::TaskDependency;

fn input() -> SpecialistInput {
    SpecialistInput::Coordination(CoordinationBrief {
        project_name: "demo".to_string(),
        phase: Phase::Intake,
        instructions: "coordinate".to_string(),
    })
}

fn draft(project_id: ProjectId) -> TaskDraft {
    TaskDraft {
        project_id,
        name: "research:deep_research".to_string(),
        description: "research work".to_string(),
        specialist: SpecialistKind::DeepResearch,
        priority: TaskPriority::Medium,
        dependencies: Vec::new(),
        input: input(),
        max_retries: None,
        estimated_duration_min: None,
    }
}

fn draft_with(
    project_id: ProjectId,
    specialist: SpecialistKind,
    priority: TaskPriority,
) -> TaskDraft {
    TaskDraft {
        specialist,
        priority,
        ..draft(project_id)
    }
}

#[tokio::test]
async fn test_create_defaults() {
    let registry = TaskRegistry::new();
    let change = registry.create(draft(ProjectId::new())).await;

    assert_eq!(change.task.status, TaskStatus::Pending);
    assert_eq!(change.task.retry_count, 0);
    assert_eq!(change.task.max_retries, 3);
    assert_eq!(change.effects.len(), 1);
    assert!(matches!(
        change.effects[0],
        ProjectCommand::RecordTaskCreated { .. }
    ));
}

#[tokio::test]
async fn test_assign_emits_task_assigned() {
    let registry = TaskRegistry::new();
    let change = registry.create(draft(ProjectId::new())).await;

    let reassigned = registry
        .assign(change.task.id, SpecialistKind::Design)
        .await
        .expect("assign");
    assert_eq!(reassigned.task.assigned_specialist, SpecialistKind::Design);
    assert!(matches!(
        reassigned.effects[0],
        ProjectCommand::RecordTaskAssigned {
            specialist: SpecialistKind::Design,
            ..
        }
    ));
}

#[tokio::test]
async fn test_claim_is_exclusive() {
    let registry = TaskRegistry::new();
    let change = registry.create(draft(ProjectId::new())).await;
    let id = change.task.id;

    let first = registry.claim(id).await.expect("first claim");
    assert!(first.is_some());

    // The second caller observes the task already in progress.
    let second = registry.claim(id).await.expect("second claim");
    assert!(second.is_none());
    assert_eq!(
        registry.get(id).await.expect("task").status,
        TaskStatus::InProgress
    );
}

#[tokio::test]
async fn test_simultaneous_claims_settle_to_exactly_one_winner() {
    let registry = TaskRegistry::new();
    let change = registry.create(draft(ProjectId::new())).await;
    let id = change.task.id;

    let (a, b) = tokio::join!(registry.claim(id), registry.claim(id));
    let winners = [a.expect("claim a"), b.expect("claim b")]
        .iter()
        .filter(|claim| claim.is_some())
        .count();
    assert_eq!(winners, 1);
}

#[tokio::test]
async fn test_in_progress_requires_completed_dependencies() {
    let registry = TaskRegistry::new();
    let project_id = ProjectId::new();
    let dep = registry.create(draft(project_id)).await;
    let mut blocked_draft = draft(project_id);
    blocked_draft.dependencies = vec![TaskDependency {
        task_id: dep.task.id,
        kind: DependencyKind::BlockedBy,
    }];
    let blocked = registry.create(blocked_draft).await;

    let result = registry.mark_in_progress(blocked.task.id).await;
    assert_eq!(
        result,
        Err(EngineError::DependencyNotSatisfied {
            task_id: blocked.task.id,
            blocked_by: dep.task.id,
        })
    );

    // Related/blocks dependencies do not gate execution; completing the
    // blocked_by dependency unblocks the task.
    registry.claim(dep.task.id).await.expect("claim dep");
    registry
        .mark_completed(
            dep.task.id,
            TaskResult {
                success: true,
                output: None,
                error: None,
                artifacts: Vec::new(),
            },
        )
        .await
        .expect("complete dep");

    let task = registry
        .mark_in_progress(blocked.task.id)
        .await
        .expect("now unblocked");
    assert_eq!(task.status, TaskStatus::InProgress);
}

#[tokio::test]
async fn test_retry_budget_exhausts_into_terminal_failure() {
    let registry = TaskRegistry::new();
    let change = registry.create(draft(ProjectId::new())).await;
    let id = change.task.id;

    // Three failures consume the budget: each one re-queues the task.
    for expected_retry in 1..=3u32 {
        registry.claim(id).await.expect("claim").expect("claimable");
        let failed = registry
            .mark_failed(id, "upstream failure".to_string())
            .await
            .expect("mark failed");
        assert_eq!(failed.task.status, TaskStatus::Pending);
        assert_eq!(failed.task.retry_count, expected_retry);
        assert!(failed.effects.is_empty());
    }

    // The fourth failure is terminal; retry_count stays at 3.
    registry.claim(id).await.expect("claim").expect("claimable");
    let terminal = registry
        .mark_failed(id, "upstream failure".to_string())
        .await
        .expect("mark failed");
    assert_eq!(terminal.task.status, TaskStatus::Failed);
    assert_eq!(terminal.task.retry_count, 3);
    assert!(matches!(
        terminal.effects[0],
        ProjectCommand::RecordTaskFailed { retry_count: 3, .. }
    ));

    // Terminally failed tasks are no longer claimable.
    assert!(registry.claim(id).await.expect("claim").is_none());
}

#[tokio::test]
async fn test_manual_retry_requeues_a_failed_task() {
    let registry = TaskRegistry::new();
    let mut zero_budget = draft(ProjectId::new());
    zero_budget.max_retries = Some(0);
    let change = registry.create(zero_budget).await;
    let id = change.task.id;

    registry.claim(id).await.expect("claim").expect("claimable");
    let terminal = registry
        .mark_failed(id, "boom".to_string())
        .await
        .expect("mark failed");
    assert_eq!(terminal.task.status, TaskStatus::Failed);

    let requeued = registry.retry(id).await.expect("retry");
    assert_eq!(requeued.status, TaskStatus::Pending);
    assert_eq!(requeued.retry_count, 0);
    assert!(requeued.result.is_none());
}

#[tokio::test]
async fn test_next_eligible_orders_by_priority_then_fifo() {
    let registry = TaskRegistry::new();
    let project_id = ProjectId::new();

    let medium = registry
        .create(draft_with(
            project_id,
            SpecialistKind::DeepResearch,
            TaskPriority::Medium,
        ))
        .await;
    let urgent_first = registry
        .create(draft_with(
            project_id,
            SpecialistKind::DeepResearch,
            TaskPriority::Urgent,
        ))
        .await;
    let urgent_second = registry
        .create(draft_with(
            project_id,
            SpecialistKind::DeepResearch,
            TaskPriority::Urgent,
        ))
        .await;
    // A different specialist's queue does not interfere.
    registry
        .create(draft_with(
            project_id,
            SpecialistKind::Qa,
            TaskPriority::Urgent,
        ))
        .await;

    let next = registry
        .next_eligible(SpecialistKind::DeepResearch)
        .await
        .expect("eligible");
    assert_eq!(next.id, urgent_first.task.id);

    registry.claim(urgent_first.task.id).await.expect("claim");
    let next = registry
        .next_eligible(SpecialistKind::DeepResearch)
        .await
        .expect("eligible");
    assert_eq!(next.id, urgent_second.task.id);

    registry.claim(urgent_second.task.id).await.expect("claim");
    let next = registry
        .next_eligible(SpecialistKind::DeepResearch)
        .await
        .expect("eligible");
    assert_eq!(next.id, medium.task.id);
}

#[tokio::test]
async fn test_next_eligible_skips_dependency_blocked_tasks() {
    let registry = TaskRegistry::new();
    let project_id = ProjectId::new();
    let dep = registry
        .create(draft_with(
            project_id,
            SpecialistKind::Qa,
            TaskPriority::Low,
        ))
        .await;
    let mut gated = draft_with(project_id, SpecialistKind::DeepResearch, TaskPriority::Urgent);
    gated.dependencies = vec![TaskDependency {
        task_id: dep.task.id,
        kind: DependencyKind::BlockedBy,
    }];
    registry.create(gated).await;

    assert!(registry
        .next_eligible(SpecialistKind::DeepResearch)
        .await
        .is_none());
}

#[tokio::test]
async fn test_blocked_and_unblocked() {
    let registry = TaskRegistry::new();
    let change = registry.create(draft(ProjectId::new())).await;

    let blocked = registry.mark_blocked(change.task.id).await.expect("block");
    assert_eq!(blocked.status, TaskStatus::Blocked);
    assert!(registry.claim(change.task.id).await.expect("claim").is_none());

    let unblocked = registry
        .mark_unblocked(change.task.id)
        .await
        .expect("unblock");
    assert_eq!(unblocked.status, TaskStatus::Pending);
}

#[tokio::test]
async fn test_cancel_rejects_settled_tasks() {
    let registry = TaskRegistry::new();
    let change = registry.create(draft(ProjectId::new())).await;
    registry.claim(change.task.id).await.expect("claim");
    registry
        .mark_completed(
            change.task.id,
            TaskResult {
                success: true,
                output: None,
                error: None,
                artifacts: Vec::new(),
            },
        )
        .await
        .expect("complete");

    let result = registry.cancel(change.task.id).await;
    assert!(matches!(result, Err(EngineError::Validation { .. })));
}

#[tokio::test]
async fn test_list_by_project_filters_by_status() {
    let registry = TaskRegistry::new();
    let project_id = ProjectId::new();
    let a = registry.create(draft(project_id)).await;
    registry.create(draft(project_id)).await;
    registry.create(draft(ProjectId::new())).await;

    registry.claim(a.task.id).await.expect("claim");

    assert_eq!(registry.list_by_project(project_id, None).await.len(), 2);
    assert_eq!(
        registry
            .list_by_project(project_id, Some(TaskStatus::Pending))
            .await
            .len(),
        1
    );
    assert_eq!(
        registry
            .list_by_project(project_id, Some(TaskStatus::InProgress))
            .await
            .len(),
        1
    );
}
