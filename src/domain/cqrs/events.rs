//! Project events for the CQRS aggregate.
//!
//! Events are facts that have happened. They are the single source of truth
//! for project history: every state change, delegation, and work product is
//! recorded here, and the audit trail is reconstructed from this log alone.

use crate::domain::types::{
    ArtifactId, ArtifactKind, ClientId, ExecutionId, Phase, ProjectRequirements, ProjectTimeline,
    RunId, SpecialistKind, TaskId, TaskPriority, TimestampUtc,
};
use cqrs_es::DomainEvent;
use serde::{Deserialize, Serialize};

/// Initial description of a project, captured at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectDetails {
    pub name: String,
    pub description: String,
    pub client_id: ClientId,
    pub requirements: ProjectRequirements,
    pub timeline: ProjectTimeline,
}

/// Events emitted by the project aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectEvent {
    /// Project was created in `intake`.
    ProjectCreated {
        details: Box<ProjectDetails>,
        created_at: TimestampUtc,
    },

    /// Project moved to a new lifecycle phase.
    ProjectStatusChanged {
        previous: Phase,
        new_status: Phase,
        notes: Option<String>,
        assigned_specialists: Vec<SpecialistKind>,
        changed_at: TimestampUtc,
    },

    /// A delegated unit of work was created.
    TaskCreated {
        task_id: TaskId,
        name: String,
        specialist: SpecialistKind,
        priority: TaskPriority,
        created_at: TimestampUtc,
    },

    /// A task was (re)assigned to a specialist.
    TaskAssigned {
        task_id: TaskId,
        specialist: SpecialistKind,
        assigned_at: TimestampUtc,
    },

    /// A task finished successfully.
    TaskCompleted {
        task_id: TaskId,
        completed_at: TimestampUtc,
    },

    /// A task failed terminally (retries exhausted).
    TaskFailed {
        task_id: TaskId,
        error: String,
        retry_count: u32,
        failed_at: TimestampUtc,
    },

    /// A specialist invocation was dispatched.
    AgentStarted {
        specialist: SpecialistKind,
        task_id: Option<TaskId>,
        started_at: TimestampUtc,
    },

    /// A specialist invocation returned a valid result.
    AgentCompleted {
        specialist: SpecialistKind,
        task_id: Option<TaskId>,
        execution_id: ExecutionId,
        duration_ms: u64,
        completed_at: TimestampUtc,
    },

    /// A specialist invocation failed (timeout, invalid output, upstream).
    AgentError {
        specialist: SpecialistKind,
        task_id: Option<TaskId>,
        error: String,
        failed_at: TimestampUtc,
    },

    /// A workflow run started for this project.
    WorkflowStarted {
        workflow_name: String,
        run_id: RunId,
        started_at: TimestampUtc,
    },

    /// A workflow run completed.
    WorkflowCompleted {
        workflow_name: String,
        run_id: RunId,
        completed_at: TimestampUtc,
    },

    /// A workflow run failed; the project stays in its last committed phase.
    WorkflowFailed {
        workflow_name: String,
        run_id: RunId,
        error: String,
        failed_at: TimestampUtc,
    },

    /// A specialist produced a versioned work product.
    ArtifactCreated {
        artifact_id: ArtifactId,
        kind: ArtifactKind,
        name: String,
        version: u32,
        created_by: SpecialistKind,
        created_at: TimestampUtc,
    },
}

impl DomainEvent for ProjectEvent {
    fn event_type(&self) -> String {
        let name = match self {
            ProjectEvent::ProjectCreated { .. } => "project_created",
            ProjectEvent::ProjectStatusChanged { .. } => "project_status_changed",
            ProjectEvent::TaskCreated { .. } => "task_created",
            ProjectEvent::TaskAssigned { .. } => "task_assigned",
            ProjectEvent::TaskCompleted { .. } => "task_completed",
            ProjectEvent::TaskFailed { .. } => "task_failed",
            ProjectEvent::AgentStarted { .. } => "agent_started",
            ProjectEvent::AgentCompleted { .. } => "agent_completed",
            ProjectEvent::AgentError { .. } => "agent_error",
            ProjectEvent::WorkflowStarted { .. } => "workflow_started",
            ProjectEvent::WorkflowCompleted { .. } => "workflow_completed",
            ProjectEvent::WorkflowFailed { .. } => "workflow_failed",
            ProjectEvent::ArtifactCreated { .. } => "artifact_created",
        };
        name.to_string()
    }

    fn event_version(&self) -> String {
        "1.0".to_string()
    }
}
