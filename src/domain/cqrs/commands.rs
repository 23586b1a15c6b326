//! Project commands for the CQRS aggregate.
//!
//! Commands express intent to change state. The aggregate validates each
//! command against the current state and either emits events or rejects it
//! with a typed error.

use crate::domain::cqrs::events::ProjectDetails;
use crate::domain::types::{
    ArtifactId, ArtifactKind, ExecutionId, Phase, RunId, SpecialistKind, TaskId, TaskPriority,
};
use serde::{Deserialize, Serialize};

/// Commands accepted by the project aggregate.
///
/// `Record*` commands append audit events for side effects performed by the
/// task registry, delegation protocol, artifact store, and workflow engine;
/// they are valid on any active project. `TransitionPhase` is validated
/// against the lifecycle rules in [`crate::domain::phase`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProjectCommand {
    /// Create the project in `intake`.
    CreateProject { details: Box<ProjectDetails> },

    /// Move the project to a new lifecycle phase.
    TransitionPhase {
        target: Phase,
        notes: Option<String>,
        assigned_specialists: Vec<SpecialistKind>,
    },

    RecordTaskCreated {
        task_id: TaskId,
        name: String,
        specialist: SpecialistKind,
        priority: TaskPriority,
    },

    RecordTaskAssigned {
        task_id: TaskId,
        specialist: SpecialistKind,
    },

    RecordTaskCompleted {
        task_id: TaskId,
    },

    RecordTaskFailed {
        task_id: TaskId,
        error: String,
        retry_count: u32,
    },

    RecordAgentStarted {
        specialist: SpecialistKind,
        task_id: Option<TaskId>,
    },

    RecordAgentCompleted {
        specialist: SpecialistKind,
        task_id: Option<TaskId>,
        execution_id: ExecutionId,
        duration_ms: u64,
    },

    RecordAgentError {
        specialist: SpecialistKind,
        task_id: Option<TaskId>,
        error: String,
    },

    RecordWorkflowStarted {
        workflow_name: String,
        run_id: RunId,
    },

    RecordWorkflowCompleted {
        workflow_name: String,
        run_id: RunId,
    },

    RecordWorkflowFailed {
        workflow_name: String,
        run_id: RunId,
        error: String,
    },

    RecordArtifactCreated {
        artifact_id: ArtifactId,
        kind: ArtifactKind,
        name: String,
        version: u32,
        created_by: SpecialistKind,
    },
}
