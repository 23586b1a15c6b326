//! Top-level wiring: one explicit object owning the CQRS framework,
//! stores, registry, delegation, and the step engine.
//!
//! Constructed once at process start from an [`EngineConfig`] and a
//! [`SpecialistRegistry`], then passed by reference wherever the engine is
//! driven — there is no ambient global instance.

use crate::artifacts::{Artifact, ArtifactStore};
use crate::config::EngineConfig;
use crate::domain::cqrs::{ProjectCommand, ProjectDetails, ProjectQuery};
use crate::domain::errors::EngineError;
use crate::domain::services::ProjectServices;
use crate::domain::types::{Phase, ProjectId, RunId, TaskStatus};
use crate::domain::view::{ProjectEventEnvelope, ProjectView};
use crate::domain::ProjectAggregate;
use crate::event_store::{FileEventStore, StoredEvent};
use crate::executions::{ExecutionLog, ExecutionRecord};
use crate::specialists::delegation::Delegator;
use crate::specialists::protocol::SpecialistOutput;
use crate::specialists::SpecialistRegistry;
use crate::tasks::{Task, TaskRegistry};
use crate::workflow::{
    catalog, RunStatus, StepEngine, WorkflowExecution, WorkflowExecutionStore, WorkflowOutput,
    WorkflowTrigger,
};
use cqrs_es::{AggregateError, CqrsFramework, EventStore, Query};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{info, instrument};

/// Capacity of the dashboard event broadcast channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Executes project commands through the CQRS framework and serves view
/// lookups, rebuilding a view from the log when this process has not yet
/// seen the project.
pub(crate) struct ProjectExecutor {
    cqrs: CqrsFramework<ProjectAggregate, FileEventStore>,
    store: FileEventStore,
    views: Arc<RwLock<HashMap<String, ProjectView>>>,
}

impl ProjectExecutor {
    pub(crate) fn new(
        store: FileEventStore,
        views: Arc<RwLock<HashMap<String, ProjectView>>>,
        event_tx: broadcast::Sender<ProjectEventEnvelope>,
    ) -> Self {
        let queries: Vec<Box<dyn Query<ProjectAggregate>>> =
            vec![Box::new(ProjectQuery::new(Arc::clone(&views), event_tx))];
        let cqrs = CqrsFramework::new(store.clone(), queries, ProjectServices::default());
        Self { cqrs, store, views }
    }

    /// Executes one command and returns the updated view.
    pub(crate) async fn execute(
        &self,
        project_id: ProjectId,
        command: ProjectCommand,
    ) -> Result<ProjectView, EngineError> {
        let aggregate_id = project_id.to_string();
        self.cqrs
            .execute(&aggregate_id, command)
            .await
            .map_err(map_aggregate_error)?;
        self.view(project_id)
            .await
            .ok_or_else(|| EngineError::Storage {
                message: format!("view missing after commit for project {}", project_id),
            })
    }

    /// Applies an effects list, committing each audit event in order.
    pub(crate) async fn apply_effects(
        &self,
        project_id: ProjectId,
        effects: Vec<ProjectCommand>,
    ) -> Result<(), EngineError> {
        for effect in effects {
            self.execute(project_id, effect).await?;
        }
        Ok(())
    }

    /// Current view of a project, rebuilt from the event log if this
    /// process has not applied any of its events yet.
    pub(crate) async fn view(&self, project_id: ProjectId) -> Option<ProjectView> {
        let aggregate_id = project_id.to_string();
        if let Some(view) = self.views.read().await.get(&aggregate_id) {
            return Some(view.clone());
        }

        let envelopes = self.store.load_events(&aggregate_id).await.ok()?;
        if envelopes.is_empty() {
            return None;
        }
        let mut view = ProjectView::default();
        for envelope in &envelopes {
            view.apply_event(&aggregate_id, &envelope.payload, envelope.sequence as u64);
        }
        self.views
            .write()
            .await
            .insert(aggregate_id, view.clone());
        Some(view)
    }
}

fn map_aggregate_error(error: AggregateError<EngineError>) -> EngineError {
    match error {
        AggregateError::UserError(e) => e,
        AggregateError::AggregateConflict => EngineError::ConcurrentTransition {
            message: "another transition committed first".to_string(),
        },
        AggregateError::DatabaseConnectionError(e)
        | AggregateError::DeserializationError(e)
        | AggregateError::UnexpectedError(e) => EngineError::Storage {
            message: e.to_string(),
        },
    }
}

/// The orchestration engine's public surface.
pub struct Orchestrator {
    executor: Arc<ProjectExecutor>,
    tasks: Arc<TaskRegistry>,
    artifacts: Arc<ArtifactStore>,
    executions: Arc<ExecutionLog>,
    runs: Arc<WorkflowExecutionStore>,
    engine: StepEngine,
    store: FileEventStore,
    event_tx: broadcast::Sender<ProjectEventEnvelope>,
}

impl Orchestrator {
    /// Wires the engine from configuration and a specialist registry.
    pub fn new(config: EngineConfig, specialists: SpecialistRegistry) -> Self {
        let store = FileEventStore::new(
            config.event_store.log_path.clone(),
            config.event_store.snapshot_dir.clone(),
            config.event_store.snapshot_every,
        );
        let views = Arc::new(RwLock::new(HashMap::new()));
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let executor = Arc::new(ProjectExecutor::new(
            store.clone(),
            views,
            event_tx.clone(),
        ));

        let registry = Arc::new(specialists);
        let tasks = Arc::new(TaskRegistry::new());
        let artifacts = Arc::new(ArtifactStore::new());
        let executions = Arc::new(ExecutionLog::new());
        let runs = Arc::new(WorkflowExecutionStore::new());
        let delegator = Arc::new(Delegator::new(
            registry,
            Arc::clone(&executions),
            Arc::clone(&artifacts),
        ));
        let engine = StepEngine::new(
            Arc::clone(&executor),
            Arc::clone(&tasks),
            delegator,
            Arc::clone(&runs),
            config,
        );

        Self {
            executor,
            tasks,
            artifacts,
            executions,
            runs,
            engine,
            store,
            event_tx,
        }
    }

    /// Creates a project in `intake` from an intake action.
    #[instrument(skip_all, fields(name = %details.name))]
    pub async fn create_project(&self, details: ProjectDetails) -> Result<ProjectId, EngineError> {
        let project_id = ProjectId::new();
        self.executor
            .execute(
                project_id,
                ProjectCommand::CreateProject {
                    details: Box::new(details),
                },
            )
            .await?;
        info!(project_id = %project_id, "project created");
        Ok(project_id)
    }

    /// Explicit status-change request (manual trigger), validated against
    /// the lifecycle rules.
    pub async fn request_status_change(
        &self,
        project_id: ProjectId,
        target: Phase,
        notes: Option<String>,
    ) -> Result<ProjectView, EngineError> {
        self.executor
            .execute(
                project_id,
                ProjectCommand::TransitionPhase {
                    target,
                    notes,
                    assigned_specialists: Vec::new(),
                },
            )
            .await
    }

    /// Runs a named workflow to settlement. A completed onboarding run
    /// hands off by creating the project in `intake`.
    #[instrument(skip_all, fields(workflow = name))]
    pub async fn run_workflow(
        &self,
        name: &str,
        trigger: WorkflowTrigger,
    ) -> Result<WorkflowExecution, EngineError> {
        let definition = catalog::find(name).ok_or_else(|| EngineError::NotFound {
            entity: "workflow",
            id: name.to_string(),
        })?;
        let execution = self.engine.run(&definition, trigger).await?;

        if name == catalog::CLIENT_ONBOARDING && execution.status == RunStatus::Completed {
            return self.handoff_onboarding(execution).await;
        }
        Ok(execution)
    }

    /// Resumes a suspended workflow run.
    pub async fn resume_workflow(&self, run_id: RunId) -> Result<WorkflowExecution, EngineError> {
        let run = self.runs.get(run_id).await.ok_or_else(|| EngineError::NotFound {
            entity: "workflow run",
            id: run_id.to_string(),
        })?;
        let definition = catalog::find(&run.workflow_name).ok_or_else(|| EngineError::NotFound {
            entity: "workflow",
            id: run.workflow_name.clone(),
        })?;
        self.engine.resume(run_id, &definition).await
    }

    /// Completes the onboarding handoff: a qualified lead becomes a
    /// project in `intake`, ready for the lifecycle workflow.
    async fn handoff_onboarding(
        &self,
        mut execution: WorkflowExecution,
    ) -> Result<WorkflowExecution, EngineError> {
        let WorkflowTrigger::ClientOnboarding { lead } = execution.input.clone() else {
            return Ok(execution);
        };

        let qualified = match self.qualification_of(&execution).await {
            Some(result) => result.qualified,
            None => false,
        };
        if !qualified {
            execution.output = Some(WorkflowOutput {
                summary: "lead not qualified; no project created".to_string(),
                project_id: None,
            });
            execution.touch();
            self.runs.upsert(execution.clone()).await;
            return Ok(execution);
        }

        let details = ProjectDetails {
            name: format!("{} project", lead.name),
            description: lead.project_description.clone(),
            client_id: crate::domain::types::ClientId::new(),
            requirements: crate::domain::types::ProjectRequirements {
                description: lead.project_description.clone(),
                ..Default::default()
            },
            timeline: Default::default(),
        };
        let project_id = self.create_project(details).await?;

        execution.output = Some(WorkflowOutput {
            summary: format!("onboarding complete; project {} created", project_id),
            project_id: Some(project_id),
        });
        execution.touch();
        self.runs.upsert(execution.clone()).await;
        info!(run_id = %execution.run_id, project_id = %project_id, "onboarding handoff complete");
        Ok(execution)
    }

    /// Extracts the lead-qualification verdict from a completed onboarding
    /// run's ledger.
    async fn qualification_of(
        &self,
        execution: &WorkflowExecution,
    ) -> Option<crate::specialists::protocol::LeadQualification> {
        let step = execution.steps.get("qualify-lead")?;
        let delegation = step.delegations.first()?;
        let record = self.executions.get(delegation.execution_id).await?;
        match record.output {
            Some(SpecialistOutput::LeadQualification(result)) => Some(result),
            _ => None,
        }
    }

    /// Attaches a late specialist reply to an earlier timed-out execution
    /// record. The original record is never mutated; the reconciliation is
    /// a new linked entry in the ledger.
    pub async fn reconcile_execution(
        &self,
        original: crate::domain::types::ExecutionId,
        output: SpecialistOutput,
        token_usage: Option<crate::domain::types::TokenUsage>,
    ) -> Result<ExecutionRecord, EngineError> {
        self.executions
            .reconcile_late_reply(original, output, token_usage)
            .await
    }

    // ----- dashboard queries -----

    /// Current view of a project.
    pub async fn project_view(&self, project_id: ProjectId) -> Option<ProjectView> {
        self.executor.view(project_id).await
    }

    /// Current phase of a project.
    pub async fn current_phase(&self, project_id: ProjectId) -> Option<Phase> {
        self.executor
            .view(project_id)
            .await
            .map(|view| view.current_phase())
    }

    /// Tasks for a project, optionally filtered by status.
    pub async fn tasks_by_project(
        &self,
        project_id: ProjectId,
        status: Option<TaskStatus>,
    ) -> Vec<Task> {
        self.tasks.list_by_project(project_id, status).await
    }

    /// Execution records for a project.
    pub async fn executions_by_project(&self, project_id: ProjectId) -> Vec<ExecutionRecord> {
        self.executions.list_by_project(project_id).await
    }

    /// Workflow runs for a project.
    pub async fn workflow_runs_by_project(&self, project_id: ProjectId) -> Vec<WorkflowExecution> {
        self.runs.list_by_project(project_id).await
    }

    /// One workflow run by id.
    pub async fn workflow_run(&self, run_id: RunId) -> Option<WorkflowExecution> {
        self.runs.get(run_id).await
    }

    /// Artifacts for a project, in creation order.
    pub async fn artifacts_by_project(&self, project_id: ProjectId) -> Vec<Artifact> {
        self.artifacts.list_by_project(project_id).await
    }

    /// Stored events for a project, in commit order.
    pub fn stored_events(&self, project_id: ProjectId) -> Result<Vec<StoredEvent>, EngineError> {
        let aggregate_id = project_id.to_string();
        Ok(self
            .store
            .read_log()?
            .into_iter()
            .filter(|record| record.aggregate_id == aggregate_id)
            .collect())
    }

    /// Subscribes to committed domain events for dashboard streaming.
    pub fn subscribe_events(&self) -> broadcast::Receiver<ProjectEventEnvelope> {
        self.event_tx.subscribe()
    }
}
