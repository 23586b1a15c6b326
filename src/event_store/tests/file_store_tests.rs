use super::*;
use crate::domain::cqrs::{ProjectCommand, ProjectDetails};
use crate::domain::services::ProjectServices;
use crate::domain::types::{ClientId, Phase, ProjectRequirements, ProjectTimeline};
use cqrs_es::CqrsFramework;
use std::collections::HashMap;
use tempfile::tempdir;

fn build_store(dir: &std::path::Path, snapshot_every: u64) -> FileEventStore {
    FileEventStore::new(
        dir.join("events.jsonl"),
        dir.join("snapshots"),
        snapshot_every,
    )
}

fn build_cqrs(
    dir: &std::path::Path,
    snapshot_every: u64,
) -> CqrsFramework<ProjectAggregate, FileEventStore> {
    let queries: Vec<Box<dyn cqrs_es::Query<ProjectAggregate>>> = Vec::new();
    CqrsFramework::new(
        build_store(dir, snapshot_every),
        queries,
        ProjectServices::default(),
    )
}

fn create_command() -> ProjectCommand {
    ProjectCommand::CreateProject {
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
    }
}

fn transition_command(target: Phase) -> ProjectCommand {
    ProjectCommand::TransitionPhase {
        target,
        notes: None,
        assigned_specialists: Vec::new(),
    }
}

#[tokio::test]
async fn test_create_project_commits_one_event() {
    let dir = tempdir().expect("temp dir");
    let cqrs = build_cqrs(dir.path(), 0);

    cqrs.execute("project-1", create_command())
        .await
        .expect("create");

    let store = build_store(dir.path(), 0);
    let ctx = store.load_aggregate("project-1").await.expect("load");
    assert_eq!(ctx.current_sequence, 1);
}

#[tokio::test]
async fn test_reload_rehydrates_aggregate_from_log() {
    let dir = tempdir().expect("temp dir");
    let cqrs = build_cqrs(dir.path(), 0);

    cqrs.execute("project-1", create_command())
        .await
        .expect("create");
    cqrs.execute("project-1", transition_command(Phase::Research))
        .await
        .expect("advance");

    // A fresh store instance sees the committed history.
    let store = build_store(dir.path(), 0);
    let ctx = store.load_aggregate("project-1").await.expect("load");
    assert_eq!(ctx.current_sequence, 2);
    let data = ctx.aggregate.data().expect("active");
    assert_eq!(data.status(), Phase::Research);
    assert_eq!(data.phases().len(), 2);
}

#[tokio::test]
async fn test_stale_context_commit_conflicts() {
    let dir = tempdir().expect("temp dir");
    let store = build_store(dir.path(), 0);

    let ctx_a = store.load_aggregate("project-1").await.expect("load a");
    let ctx_b = store.load_aggregate("project-1").await.expect("load b");

    let event = ProjectEvent::ProjectCreated {
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
    };

    store
        .commit(vec![event.clone()], ctx_a, HashMap::new())
        .await
        .expect("first commit wins");

    // The second writer still holds the pre-commit sequence; its commit
    // must fail rather than silently interleave.
    let result = store.commit(vec![event], ctx_b, HashMap::new()).await;
    assert!(matches!(result, Err(AggregateError::AggregateConflict)));
}

#[tokio::test]
async fn test_log_is_shared_but_aggregates_are_isolated() {
    let dir = tempdir().expect("temp dir");
    let cqrs = build_cqrs(dir.path(), 0);

    cqrs.execute("project-1", create_command())
        .await
        .expect("create 1");
    cqrs.execute("project-2", create_command())
        .await
        .expect("create 2");
    cqrs.execute("project-1", transition_command(Phase::Research))
        .await
        .expect("advance 1");

    let store = build_store(dir.path(), 0);
    let one = store.load_events("project-1").await.expect("events 1");
    let two = store.load_events("project-2").await.expect("events 2");
    assert_eq!(one.len(), 2);
    assert_eq!(two.len(), 1);

    // Sequences are per aggregate, not per log file.
    assert_eq!(two[0].sequence, 1);

    let all = store.read_log().expect("read log");
    assert_eq!(all.len(), 3);
}

#[tokio::test]
async fn test_snapshot_written_at_threshold_and_used_on_load() {
    let dir = tempdir().expect("temp dir");
    let cqrs = build_cqrs(dir.path(), 2);

    cqrs.execute("project-1", create_command())
        .await
        .expect("create");
    cqrs.execute("project-1", transition_command(Phase::Research))
        .await
        .expect("advance");

    let snapshot_path = dir.path().join("snapshots").join("project-1.json");
    assert!(snapshot_path.exists());

    let store = build_store(dir.path(), 2);
    let ctx = store.load_aggregate("project-1").await.expect("load");
    assert_eq!(ctx.current_sequence, 2);
    assert_eq!(
        ctx.aggregate.data().expect("active").status(),
        Phase::Research
    );
}

#[test]
fn test_should_snapshot() {
    assert!(!should_snapshot(49, 50));
    assert!(should_snapshot(50, 50));
    assert!(should_snapshot(100, 50));
    assert!(!should_snapshot(101, 50));
    assert!(!should_snapshot(50, 0)); // Disabled
}

#[tokio::test]
async fn test_event_records_carry_type_and_version() {
    let dir = tempdir().expect("temp dir");
    let cqrs = build_cqrs(dir.path(), 0);

    cqrs.execute("project-1", create_command())
        .await
        .expect("create");

    let store = build_store(dir.path(), 0);
    let records = store.read_log().expect("read log");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].event_type, "project_created");
    assert_eq!(records[0].event_version, "1.0");
}
