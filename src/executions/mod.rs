//! Execution recorder.
//!
//! One record per specialist invocation attempt: input, output or error,
//! duration, and token accounting. Records are written before the result is
//! durably applied anywhere else, so a delegation whose result never
//! returned can always be detected and reconciled from the ledger. Records
//! are never mutated after creation; a late reply arriving after a timeout
//! is recorded as a new entry linked to the original.

use crate::domain::errors::EngineError;
use crate::domain::types::{ExecutionId, ProjectId, SpecialistKind, TaskId, TimestampUtc, TokenUsage};
use crate::specialists::protocol::{SpecialistInput, SpecialistOutput};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Log of one specialist invocation attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub id: ExecutionId,
    /// Owning project; `None` for pre-project delegations (onboarding).
    pub project_id: Option<ProjectId>,
    pub task_id: Option<TaskId>,
    pub specialist: SpecialistKind,
    pub input: SpecialistInput,
    pub output: Option<SpecialistOutput>,
    pub error: Option<String>,
    pub duration_ms: u64,
    pub token_usage: Option<TokenUsage>,
    /// Set when this record reconciles a late reply to an earlier
    /// timed-out attempt.
    pub reconciles: Option<ExecutionId>,
    pub created_at: TimestampUtc,
}

/// Fields for a new execution record.
#[derive(Debug, Clone)]
pub struct NewExecution {
    pub project_id: Option<ProjectId>,
    pub task_id: Option<TaskId>,
    pub specialist: SpecialistKind,
    pub input: SpecialistInput,
    pub output: Option<SpecialistOutput>,
    pub error: Option<String>,
    pub duration_ms: u64,
    pub token_usage: Option<TokenUsage>,
}

/// Append-only store of execution records.
#[derive(Debug, Default)]
pub struct ExecutionLog {
    records: RwLock<Vec<ExecutionRecord>>,
}

impl ExecutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record for one delegation attempt.
    pub async fn record(&self, new: NewExecution) -> ExecutionRecord {
        let record = ExecutionRecord {
            id: ExecutionId::new(),
            project_id: new.project_id,
            task_id: new.task_id,
            specialist: new.specialist,
            input: new.input,
            output: new.output,
            error: new.error,
            duration_ms: new.duration_ms,
            token_usage: new.token_usage,
            reconciles: None,
            created_at: TimestampUtc::now(),
        };
        self.records.write().await.push(record.clone());
        record
    }

    /// Records a late reply for an earlier timed-out attempt. The original
    /// record is left untouched; the reconciliation is a new linked entry.
    pub async fn reconcile_late_reply(
        &self,
        original_id: ExecutionId,
        output: SpecialistOutput,
        token_usage: Option<TokenUsage>,
    ) -> Result<ExecutionRecord, EngineError> {
        let mut records = self.records.write().await;
        let original = records
            .iter()
            .find(|r| r.id == original_id)
            .cloned()
            .ok_or_else(|| EngineError::NotFound {
                entity: "execution record",
                id: original_id.to_string(),
            })?;

        if original.error.is_none() {
            return Err(EngineError::Validation {
                message: format!(
                    "execution {} did not fail; nothing to reconcile",
                    original_id
                ),
            });
        }

        let record = ExecutionRecord {
            id: ExecutionId::new(),
            project_id: original.project_id,
            task_id: original.task_id,
            specialist: original.specialist,
            input: original.input,
            output: Some(output),
            error: None,
            duration_ms: original.duration_ms,
            token_usage,
            reconciles: Some(original_id),
            created_at: TimestampUtc::now(),
        };
        records.push(record.clone());
        Ok(record)
    }

    /// Fetches a record by id.
    pub async fn get(&self, id: ExecutionId) -> Option<ExecutionRecord> {
        self.records.read().await.iter().find(|r| r.id == id).cloned()
    }

    /// Records for a project, in creation order.
    pub async fn list_by_project(&self, project_id: ProjectId) -> Vec<ExecutionRecord> {
        self.records
            .read()
            .await
            .iter()
            .filter(|r| r.project_id == Some(project_id))
            .cloned()
            .collect()
    }

    /// Records for a task, in creation order.
    pub async fn list_by_task(&self, task_id: TaskId) -> Vec<ExecutionRecord> {
        self.records
            .read()
            .await
            .iter()
            .filter(|r| r.task_id == Some(task_id))
            .cloned()
            .collect()
    }

    /// Total number of records (all attempts, all projects).
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether no record has been written yet.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::specialists::protocol::{CoordinationBrief, CoordinationSummary};
    use crate::domain::types::Phase;

    fn sample_input() -> SpecialistInput {
        SpecialistInput::Coordination(CoordinationBrief {
            project_name: "demo".to_string(),
            phase: Phase::Intake,
            instructions: "kick off".to_string(),
        })
    }

    fn sample_output() -> SpecialistOutput {
        SpecialistOutput::Coordination(CoordinationSummary {
            summary: "done".to_string(),
            notes: Vec::new(),
        })
    }

    #[tokio::test]
    async fn test_record_and_query_by_task() {
        let log = ExecutionLog::new();
        let project_id = ProjectId::new();
        let task_id = TaskId::new();

        log.record(NewExecution {
            project_id: Some(project_id),
            task_id: Some(task_id),
            specialist: SpecialistKind::ProjectManager,
            input: sample_input(),
            output: Some(sample_output()),
            error: None,
            duration_ms: 12,
            token_usage: None,
        })
        .await;

        assert_eq!(log.list_by_project(project_id).await.len(), 1);
        assert_eq!(log.list_by_task(task_id).await.len(), 1);
        assert_eq!(log.list_by_task(TaskId::new()).await.len(), 0);
    }

    #[tokio::test]
    async fn test_reconcile_requires_failed_original() {
        let log = ExecutionLog::new();
        let ok = log
            .record(NewExecution {
                project_id: None,
                task_id: None,
                specialist: SpecialistKind::ProjectManager,
                input: sample_input(),
                output: Some(sample_output()),
                error: None,
                duration_ms: 5,
                token_usage: None,
            })
            .await;

        let result = log.reconcile_late_reply(ok.id, sample_output(), None).await;
        assert!(matches!(result, Err(EngineError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_reconcile_links_original_and_preserves_it() {
        let log = ExecutionLog::new();
        let timed_out = log
            .record(NewExecution {
                project_id: None,
                task_id: None,
                specialist: SpecialistKind::ProjectManager,
                input: sample_input(),
                output: None,
                error: Some("timeout".to_string()),
                duration_ms: 1000,
                token_usage: None,
            })
            .await;

        let reconciled = log
            .reconcile_late_reply(timed_out.id, sample_output(), None)
            .await
            .expect("reconcile");

        assert_eq!(reconciled.reconciles, Some(timed_out.id));
        assert!(reconciled.error.is_none());

        let original = log.get(timed_out.id).await.expect("original still there");
        assert_eq!(original.error.as_deref(), Some("timeout"));
        assert!(original.output.is_none());
        assert_eq!(log.len().await, 2);
    }
}
