//! Workflows: named, ordered step lists over the delegation protocol.
//!
//! A step declares the lifecycle phase it corresponds to (if any) and the
//! specialists it delegates to. Run state is tracked per execution:
//! `running → {suspended, completed, failed}`, with `suspended → running`
//! on manual resume.

pub mod catalog;
pub mod engine;

pub use engine::StepEngine;

use crate::domain::types::{
    ArtifactId, ExecutionId, Phase, ProjectId, RunId, SpecialistKind, TimestampUtc,
};
use crate::specialists::protocol::LeadProfile;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

/// One step of a workflow definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub name: String,
    /// Lifecycle phase this step commits on success. Steps without a phase
    /// (pre-project onboarding, intake initialization) delegate without
    /// advancing the project.
    pub phase: Option<Phase>,
    /// Specialists delegated to; more than one runs concurrently.
    pub specialists: Vec<SpecialistKind>,
}

/// A named, ordered list of steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub name: String,
    pub steps: Vec<WorkflowStep>,
}

/// Workflow run state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Suspended,
    Completed,
    Failed,
}

/// Typed trigger data for a workflow run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkflowTrigger {
    /// Drive an existing project through its lifecycle.
    ProjectLifecycle { project_id: ProjectId },
    /// Onboard a new lead; hands off to the lifecycle workflow.
    ClientOnboarding { lead: LeadProfile },
}

impl WorkflowTrigger {
    /// The owning project, when the trigger is project-scoped.
    pub fn project_id(&self) -> Option<ProjectId> {
        match self {
            WorkflowTrigger::ProjectLifecycle { project_id } => Some(*project_id),
            WorkflowTrigger::ClientOnboarding { .. } => None,
        }
    }
}

/// Result of one settled delegation within a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelegationSummary {
    pub specialist: SpecialistKind,
    pub execution_id: ExecutionId,
    #[serde(default)]
    pub artifact_ids: Vec<ArtifactId>,
    pub summary: String,
}

/// Cached result of a completed step. Re-entering the step returns this
/// instead of re-delegating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub step: String,
    pub phase: Option<Phase>,
    pub delegations: Vec<DelegationSummary>,
    pub completed_at: TimestampUtc,
}

/// Final output of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowOutput {
    pub summary: String,
    /// Set by the onboarding handoff once a project exists.
    pub project_id: Option<ProjectId>,
}

/// One run of the step engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowExecution {
    pub workflow_name: String,
    pub project_id: Option<ProjectId>,
    pub run_id: RunId,
    pub status: RunStatus,
    pub input: WorkflowTrigger,
    pub output: Option<WorkflowOutput>,
    pub current_step: Option<String>,
    pub steps: BTreeMap<String, StepResult>,
    pub error: Option<String>,
    pub created_at: TimestampUtc,
    pub updated_at: TimestampUtc,
    pub completed_at: Option<TimestampUtc>,
}

impl WorkflowExecution {
    /// Starts a new running execution for a trigger.
    pub fn start(workflow_name: &str, input: WorkflowTrigger) -> Self {
        let now = TimestampUtc::now();
        Self {
            workflow_name: workflow_name.to_string(),
            project_id: input.project_id(),
            run_id: RunId::new(),
            status: RunStatus::Running,
            input,
            output: None,
            current_step: None,
            steps: BTreeMap::new(),
            error: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = TimestampUtc::now();
    }
}

/// In-memory store of workflow executions.
#[derive(Debug, Default)]
pub struct WorkflowExecutionStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    runs: HashMap<RunId, WorkflowExecution>,
    order: Vec<RunId>,
}

impl WorkflowExecutionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a run record.
    pub async fn upsert(&self, execution: WorkflowExecution) {
        let mut inner = self.inner.write().await;
        if !inner.runs.contains_key(&execution.run_id) {
            inner.order.push(execution.run_id);
        }
        inner.runs.insert(execution.run_id, execution);
    }

    /// Fetches a run by id.
    pub async fn get(&self, run_id: RunId) -> Option<WorkflowExecution> {
        self.inner.read().await.runs.get(&run_id).cloned()
    }

    /// Runs for a project, in creation order.
    pub async fn list_by_project(&self, project_id: ProjectId) -> Vec<WorkflowExecution> {
        let inner = self.inner.read().await;
        inner
            .order
            .iter()
            .filter_map(|id| inner.runs.get(id))
            .filter(|run| run.project_id == Some(project_id))
            .cloned()
            .collect()
    }
}
