//! Delegated units of work.
//!
//! A task is one unit of specialist work owned by a project. Tasks carry
//! typed dependencies on other tasks, a scheduling priority, and a retry
//! budget consumed by failed delegations.

pub mod registry;

pub use registry::TaskRegistry;

use crate::domain::types::{
    ArtifactId, DependencyKind, ProjectId, SpecialistKind, TaskId, TaskPriority, TaskStatus,
    TimestampUtc,
};
use crate::specialists::protocol::{SpecialistInput, SpecialistOutput};
use serde::{Deserialize, Serialize};

/// Default retry budget for delegated tasks.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// A typed reference from one task to another.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TaskDependency {
    pub task_id: TaskId,
    pub kind: DependencyKind,
}

/// Outcome attached to a settled task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub success: bool,
    pub output: Option<SpecialistOutput>,
    pub error: Option<String>,
    #[serde(default)]
    pub artifacts: Vec<ArtifactId>,
}

/// One delegated unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub project_id: ProjectId,
    pub name: String,
    pub description: String,
    pub assigned_specialist: SpecialistKind,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    #[serde(default)]
    pub dependencies: Vec<TaskDependency>,
    pub input: SpecialistInput,
    pub result: Option<TaskResult>,
    #[serde(default)]
    pub artifacts: Vec<ArtifactId>,
    pub retry_count: u32,
    pub max_retries: u32,
    /// Monotonic creation sequence, used for FIFO tie-breaking.
    pub sequence: u64,
    pub estimated_duration_min: Option<u32>,
    pub actual_duration_min: Option<u32>,
    pub created_at: TimestampUtc,
    pub updated_at: TimestampUtc,
    pub started_at: Option<TimestampUtc>,
    pub completed_at: Option<TimestampUtc>,
}

impl Task {
    /// Ids of tasks that must complete before this one may start.
    pub fn blocked_by(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.dependencies
            .iter()
            .filter(|d| d.kind == DependencyKind::BlockedBy)
            .map(|d| d.task_id)
    }
}

/// Fields for a new task.
#[derive(Debug, Clone)]
pub struct TaskDraft {
    pub project_id: ProjectId,
    pub name: String,
    pub description: String,
    pub specialist: SpecialistKind,
    pub priority: TaskPriority,
    pub dependencies: Vec<TaskDependency>,
    pub input: SpecialistInput,
    pub max_retries: Option<u32>,
    pub estimated_duration_min: Option<u32>,
}
