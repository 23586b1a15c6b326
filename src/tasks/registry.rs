//! Task registry: scheduling, dependency gating, and retry state.
//!
//! Mutating operations return the audit events to append alongside the
//! updated task; the caller persists them. The claim operation is the
//! atomic pending → in_progress conditional update used by concurrent
//! workers: exactly one of two racing claims succeeds.

use crate::domain::cqrs::ProjectCommand;
use crate::domain::errors::EngineError;
use crate::domain::types::{ProjectId, SpecialistKind, TaskId, TaskStatus, TimestampUtc};
use crate::tasks::{Task, TaskDraft, TaskResult, DEFAULT_MAX_RETRIES};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

/// A task mutation together with the audit events it produced.
#[derive(Debug, Clone)]
pub struct TaskChange {
    pub task: Task,
    pub effects: Vec<ProjectCommand>,
}

/// In-memory registry of tasks, keyed by id.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: RwLock<HashMap<TaskId, Task>>,
    sequence: AtomicU64,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new pending task.
    pub async fn create(&self, draft: TaskDraft) -> TaskChange {
        let now = TimestampUtc::now();
        let task = Task {
            id: TaskId::new(),
            project_id: draft.project_id,
            name: draft.name,
            description: draft.description,
            assigned_specialist: draft.specialist,
            status: TaskStatus::Pending,
            priority: draft.priority,
            dependencies: draft.dependencies,
            input: draft.input,
            result: None,
            artifacts: Vec::new(),
            retry_count: 0,
            max_retries: draft.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
            sequence: self.sequence.fetch_add(1, Ordering::Relaxed),
            estimated_duration_min: draft.estimated_duration_min,
            actual_duration_min: None,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
        };
        self.tasks.write().await.insert(task.id, task.clone());

        let effects = vec![ProjectCommand::RecordTaskCreated {
            task_id: task.id,
            name: task.name.clone(),
            specialist: task.assigned_specialist,
            priority: task.priority,
        }];
        TaskChange { task, effects }
    }

    /// Reassigns a task to another specialist.
    pub async fn assign(
        &self,
        id: TaskId,
        specialist: SpecialistKind,
    ) -> Result<TaskChange, EngineError> {
        let mut tasks = self.tasks.write().await;
        let task = get_mut(&mut tasks, id)?;
        task.assigned_specialist = specialist;
        task.updated_at = TimestampUtc::now();
        let task = task.clone();
        Ok(TaskChange {
            effects: vec![ProjectCommand::RecordTaskAssigned {
                task_id: task.id,
                specialist,
            }],
            task,
        })
    }

    /// Atomically claims a pending task for execution.
    ///
    /// Returns `Ok(None)` when the task is not pending (already claimed,
    /// settled, or cancelled) — the caller observes the existing state
    /// rather than an error. Fails with `DependencyNotSatisfied` when a
    /// `blocked_by` dependency has not completed.
    pub async fn claim(&self, id: TaskId) -> Result<Option<Task>, EngineError> {
        let mut tasks = self.tasks.write().await;
        let task = tasks.get(&id).ok_or_else(|| not_found(id))?;

        if task.status != TaskStatus::Pending {
            return Ok(None);
        }
        check_dependencies(task, &tasks)?;

        let task = get_mut(&mut tasks, id)?;
        task.status = TaskStatus::InProgress;
        let now = TimestampUtc::now();
        task.started_at = Some(now);
        task.updated_at = now;
        Ok(Some(task.clone()))
    }

    /// Moves a pending task to `in_progress`.
    ///
    /// Unlike [`Self::claim`], an already-claimed task is an error here.
    pub async fn mark_in_progress(&self, id: TaskId) -> Result<Task, EngineError> {
        let mut tasks = self.tasks.write().await;
        let task = tasks.get(&id).ok_or_else(|| not_found(id))?;

        if task.status != TaskStatus::Pending {
            return Err(EngineError::Validation {
                message: format!("task {} is not pending", id),
            });
        }
        check_dependencies(task, &tasks)?;

        let task = get_mut(&mut tasks, id)?;
        task.status = TaskStatus::InProgress;
        let now = TimestampUtc::now();
        task.started_at = Some(now);
        task.updated_at = now;
        Ok(task.clone())
    }

    /// Settles a task successfully.
    pub async fn mark_completed(
        &self,
        id: TaskId,
        result: TaskResult,
    ) -> Result<TaskChange, EngineError> {
        let mut tasks = self.tasks.write().await;
        let task = get_mut(&mut tasks, id)?;

        let now = TimestampUtc::now();
        task.status = TaskStatus::Completed;
        task.artifacts.extend(result.artifacts.iter().copied());
        task.result = Some(result);
        task.completed_at = Some(now);
        task.updated_at = now;
        if let Some(started) = task.started_at {
            let minutes = (now.0 - started.0).num_minutes().max(0) as u32;
            task.actual_duration_min = Some(minutes);
        }
        let task = task.clone();
        Ok(TaskChange {
            effects: vec![ProjectCommand::RecordTaskCompleted { task_id: task.id }],
            task,
        })
    }

    /// Records a delegation failure against the task's retry budget.
    ///
    /// While retries remain the task returns to `pending` for
    /// re-delegation and `retry_count` is incremented; once the budget is
    /// exhausted the task fails terminally and a `task_failed` event is
    /// emitted.
    pub async fn mark_failed(&self, id: TaskId, error: String) -> Result<TaskChange, EngineError> {
        let mut tasks = self.tasks.write().await;
        let task = get_mut(&mut tasks, id)?;
        let now = TimestampUtc::now();
        task.updated_at = now;

        if task.retry_count < task.max_retries {
            task.retry_count += 1;
            task.status = TaskStatus::Pending;
            let task = task.clone();
            return Ok(TaskChange {
                task,
                effects: Vec::new(),
            });
        }

        task.status = TaskStatus::Failed;
        task.result = Some(TaskResult {
            success: false,
            output: None,
            error: Some(error.clone()),
            artifacts: Vec::new(),
        });
        task.completed_at = Some(now);
        let task = task.clone();
        Ok(TaskChange {
            effects: vec![ProjectCommand::RecordTaskFailed {
                task_id: task.id,
                error,
                retry_count: task.retry_count,
            }],
            task,
        })
    }

    /// Manually re-queues a terminally failed task with a fresh retry
    /// budget.
    pub async fn retry(&self, id: TaskId) -> Result<Task, EngineError> {
        let mut tasks = self.tasks.write().await;
        let task = get_mut(&mut tasks, id)?;

        if task.status != TaskStatus::Failed {
            return Err(EngineError::Validation {
                message: format!("task {} is not failed", id),
            });
        }
        task.status = TaskStatus::Pending;
        task.retry_count = 0;
        task.result = None;
        task.completed_at = None;
        task.updated_at = TimestampUtc::now();
        Ok(task.clone())
    }

    /// Marks a pending task as blocked on external input.
    pub async fn mark_blocked(&self, id: TaskId) -> Result<Task, EngineError> {
        self.set_status(id, TaskStatus::Pending, TaskStatus::Blocked)
            .await
    }

    /// Returns a blocked task to the pending queue.
    pub async fn mark_unblocked(&self, id: TaskId) -> Result<Task, EngineError> {
        self.set_status(id, TaskStatus::Blocked, TaskStatus::Pending)
            .await
    }

    /// Cancels a task that has not settled yet.
    pub async fn cancel(&self, id: TaskId) -> Result<Task, EngineError> {
        let mut tasks = self.tasks.write().await;
        let task = get_mut(&mut tasks, id)?;
        if matches!(
            task.status,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        ) {
            return Err(EngineError::Validation {
                message: format!("task {} already settled", id),
            });
        }
        task.status = TaskStatus::Cancelled;
        task.updated_at = TimestampUtc::now();
        Ok(task.clone())
    }

    /// Next claimable task for a specialist: pending, dependencies
    /// satisfied, ordered `urgent > high > medium > low` with FIFO
    /// tie-breaking by creation order.
    pub async fn next_eligible(&self, specialist: SpecialistKind) -> Option<Task> {
        let tasks = self.tasks.read().await;
        let mut eligible: Vec<&Task> = tasks
            .values()
            .filter(|t| t.status == TaskStatus::Pending)
            .filter(|t| t.assigned_specialist == specialist)
            .filter(|t| check_dependencies(t, &tasks).is_ok())
            .collect();
        eligible.sort_by(|a, b| {
            b.priority
                .rank()
                .cmp(&a.priority.rank())
                .then(a.sequence.cmp(&b.sequence))
        });
        eligible.first().map(|t| (*t).clone())
    }

    /// Fetches a task by id.
    pub async fn get(&self, id: TaskId) -> Option<Task> {
        self.tasks.read().await.get(&id).cloned()
    }

    /// Tasks for a project, optionally filtered by status, in creation
    /// order.
    pub async fn list_by_project(
        &self,
        project_id: ProjectId,
        status: Option<TaskStatus>,
    ) -> Vec<Task> {
        let tasks = self.tasks.read().await;
        let mut listed: Vec<Task> = tasks
            .values()
            .filter(|t| t.project_id == project_id)
            .filter(|t| match status {
                Some(s) => t.status == s,
                None => true,
            })
            .cloned()
            .collect();
        listed.sort_by_key(|t| t.sequence);
        listed
    }

    async fn set_status(
        &self,
        id: TaskId,
        expected: TaskStatus,
        next: TaskStatus,
    ) -> Result<Task, EngineError> {
        let mut tasks = self.tasks.write().await;
        let task = get_mut(&mut tasks, id)?;
        if task.status != expected {
            return Err(EngineError::Validation {
                message: format!("task {} is not {:?}", id, expected),
            });
        }
        task.status = next;
        task.updated_at = TimestampUtc::now();
        Ok(task.clone())
    }
}

fn not_found(id: TaskId) -> EngineError {
    EngineError::NotFound {
        entity: "task",
        id: id.to_string(),
    }
}

fn get_mut(tasks: &mut HashMap<TaskId, Task>, id: TaskId) -> Result<&mut Task, EngineError> {
    tasks.get_mut(&id).ok_or_else(|| not_found(id))
}

/// Fails with `DependencyNotSatisfied` for the first incomplete
/// `blocked_by` dependency.
fn check_dependencies(task: &Task, tasks: &HashMap<TaskId, Task>) -> Result<(), EngineError> {
    for dep_id in task.blocked_by() {
        let satisfied = tasks
            .get(&dep_id)
            .is_some_and(|dep| dep.status == TaskStatus::Completed);
        if !satisfied {
            return Err(EngineError::DependencyNotSatisfied {
                task_id: task.id,
                blocked_by: dep_id,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/registry_tests.rs"]
mod tests;
