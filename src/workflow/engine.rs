//! The workflow step engine.
//!
//! Sequences a workflow's steps against one project: verifies phase
//! legality, delegates to the step's specialists, commits the phase
//! transition only after every delegation settles successfully, and
//! persists per-step results. A failed step marks the run failed and
//! leaves the project in its last committed phase; a step that already
//! recorded a result is a no-op on re-entry. Runs suspend when the
//! project goes on hold and fail when it is cancelled mid-flight.

use crate::config::EngineConfig;
use crate::domain::cqrs::ProjectCommand;
use crate::domain::errors::EngineError;
use crate::domain::phase;
use crate::domain::types::{Phase, ProjectId, RunId, SpecialistKind, TaskStatus, TimestampUtc};
use crate::domain::view::ProjectView;
use crate::orchestrator::ProjectExecutor;
use crate::specialists::delegation::{DelegationRequest, Delegator};
use crate::specialists::protocol::{
    CoordinationBrief, DesignBrief, ImplementationBrief, ImplementationSurface, ProposalRequest,
    QaBrief, ResearchBrief, SpecialistInput,
};
use crate::tasks::{TaskDraft, TaskRegistry, TaskResult};
use crate::workflow::{
    DelegationSummary, RunStatus, StepResult, WorkflowDefinition, WorkflowExecution,
    WorkflowExecutionStore, WorkflowOutput, WorkflowStep, WorkflowTrigger,
};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// A delegation settled against the step: either a summary to cache, or
/// the reason the step must fail.
type Settlement = Result<DelegationSummary, String>;

/// Sequences workflow steps, one run at a time per call.
pub struct StepEngine {
    executor: Arc<ProjectExecutor>,
    tasks: Arc<TaskRegistry>,
    delegator: Arc<Delegator>,
    runs: Arc<WorkflowExecutionStore>,
    config: EngineConfig,
}

impl StepEngine {
    pub(crate) fn new(
        executor: Arc<ProjectExecutor>,
        tasks: Arc<TaskRegistry>,
        delegator: Arc<Delegator>,
        runs: Arc<WorkflowExecutionStore>,
        config: EngineConfig,
    ) -> Self {
        Self {
            executor,
            tasks,
            delegator,
            runs,
            config,
        }
    }

    /// Starts a new run and advances it to settlement.
    #[instrument(skip_all, fields(workflow = %definition.name))]
    pub async fn run(
        &self,
        definition: &WorkflowDefinition,
        trigger: WorkflowTrigger,
    ) -> Result<WorkflowExecution, EngineError> {
        let execution = WorkflowExecution::start(&definition.name, trigger);
        self.runs.upsert(execution.clone()).await;
        info!(run_id = %execution.run_id, "workflow run started");

        if let Some(project_id) = execution.project_id {
            let started = self
                .executor
                .execute(
                    project_id,
                    ProjectCommand::RecordWorkflowStarted {
                        workflow_name: execution.workflow_name.clone(),
                        run_id: execution.run_id,
                    },
                )
                .await;
            if let Err(error) = started {
                // The trigger referenced a project the log does not know.
                return self.fail_run(execution, error.to_string(), None).await;
            }
        }

        self.advance(execution, definition).await
    }

    /// Resumes a suspended run. Steps that already recorded results are
    /// skipped; the run continues from the first unsettled step.
    pub async fn resume(
        &self,
        run_id: RunId,
        definition: &WorkflowDefinition,
    ) -> Result<WorkflowExecution, EngineError> {
        let mut execution = self.runs.get(run_id).await.ok_or_else(|| EngineError::NotFound {
            entity: "workflow run",
            id: run_id.to_string(),
        })?;

        if execution.status != RunStatus::Suspended {
            return Err(EngineError::Validation {
                message: format!("run {} is not suspended", run_id),
            });
        }
        execution.status = RunStatus::Running;
        execution.touch();
        self.runs.upsert(execution.clone()).await;
        info!(run_id = %run_id, "workflow run resumed");

        self.advance(execution, definition).await
    }

    async fn advance(
        &self,
        mut execution: WorkflowExecution,
        definition: &WorkflowDefinition,
    ) -> Result<WorkflowExecution, EngineError> {
        for step in &definition.steps {
            // Idempotent re-entry: a step with a recorded result is not
            // re-delegated.
            if execution.steps.contains_key(&step.name) {
                continue;
            }

            execution.current_step = Some(step.name.clone());
            execution.touch();
            self.runs.upsert(execution.clone()).await;

            let view = match execution.project_id {
                Some(project_id) => match self.executor.view(project_id).await {
                    Some(view) => Some(view),
                    None => {
                        let message = format!("project {} not found", project_id);
                        return self.fail_run(execution, message, None).await;
                    }
                },
                None => None,
            };

            if let (Some(project_id), Some(view)) = (execution.project_id, view.as_ref()) {
                // A cancelled project terminates the run; an on-hold
                // project suspends it for manual resume.
                if view.status() == Phase::Cancelled {
                    let error = EngineError::InvalidTransition {
                        from: Phase::Cancelled,
                        to: step.phase.unwrap_or(Phase::Cancelled),
                    };
                    return self
                        .fail_run(execution, error.to_string(), Some(project_id))
                        .await;
                }
                if view.status() == Phase::OnHold {
                    execution.status = RunStatus::Suspended;
                    execution.touch();
                    self.runs.upsert(execution.clone()).await;
                    info!(run_id = %execution.run_id, step = %step.name, "run suspended: project on hold");
                    return Ok(execution);
                }
                if let Some(target) = step.phase {
                    if let Err(error) =
                        phase::classify_transition(view.status(), target, view.held_phase())
                    {
                        return self
                            .fail_run(execution, error.to_string(), Some(project_id))
                            .await;
                    }
                }
            }

            // Delegate to every specialist of the step; all settle before
            // the phase transition is committed, and one failure does not
            // cancel siblings already in flight.
            let calls: Vec<(SpecialistKind, SpecialistInput)> = step
                .specialists
                .iter()
                .map(|&specialist| {
                    (
                        specialist,
                        build_input(step, specialist, view.as_ref(), &execution),
                    )
                })
                .collect();

            let settlements = join_all(calls.into_iter().map(|(specialist, input)| {
                self.settle_delegation(execution.project_id, &step.name, specialist, input)
            }))
            .await;

            let mut delegations = Vec::new();
            let mut failures = Vec::new();
            for settlement in settlements {
                match settlement {
                    Ok(Ok(summary)) => delegations.push(summary),
                    Ok(Err(failure)) => failures.push(failure),
                    // Resource-layer failures propagate to the trigger
                    // caller with no partial state committed.
                    Err(fatal) => return Err(fatal),
                }
            }
            if !failures.is_empty() {
                let message = failures.join("; ");
                let project_id = execution.project_id;
                return self.fail_run(execution, message, project_id).await;
            }

            if let (Some(project_id), Some(target)) = (execution.project_id, step.phase) {
                let transitioned = self
                    .executor
                    .execute(
                        project_id,
                        ProjectCommand::TransitionPhase {
                            target,
                            notes: Some(format!("workflow step '{}'", step.name)),
                            assigned_specialists: step.specialists.clone(),
                        },
                    )
                    .await;
                if let Err(error) = transitioned {
                    if matches!(error, EngineError::Storage { .. }) {
                        return Err(error);
                    }
                    return self
                        .fail_run(execution, error.to_string(), Some(project_id))
                        .await;
                }
            }

            execution.steps.insert(
                step.name.clone(),
                StepResult {
                    step: step.name.clone(),
                    phase: step.phase,
                    delegations,
                    completed_at: TimestampUtc::now(),
                },
            );
            execution.touch();
            self.runs.upsert(execution.clone()).await;
            info!(run_id = %execution.run_id, step = %step.name, "step completed");
        }

        execution.status = RunStatus::Completed;
        execution.current_step = None;
        execution.completed_at = Some(TimestampUtc::now());
        if execution.output.is_none() {
            execution.output = Some(WorkflowOutput {
                summary: format!("workflow '{}' completed", definition.name),
                project_id: execution.project_id,
            });
        }
        if let Some(project_id) = execution.project_id {
            self.executor
                .execute(
                    project_id,
                    ProjectCommand::RecordWorkflowCompleted {
                        workflow_name: execution.workflow_name.clone(),
                        run_id: execution.run_id,
                    },
                )
                .await?;
        }
        execution.touch();
        self.runs.upsert(execution.clone()).await;
        info!(run_id = %execution.run_id, "workflow run completed");
        Ok(execution)
    }

    /// Settles one specialist delegation for a step, through the task
    /// registry for project-scoped steps and directly otherwise.
    async fn settle_delegation(
        &self,
        project_id: Option<ProjectId>,
        step_name: &str,
        specialist: SpecialistKind,
        input: SpecialistInput,
    ) -> Result<Settlement, EngineError> {
        match project_id {
            Some(project_id) => {
                self.settle_project_task(project_id, step_name, specialist, input)
                    .await
            }
            None => self.settle_direct(specialist, input).await,
        }
    }

    /// Pre-project delegation (onboarding): one attempt, no task.
    async fn settle_direct(
        &self,
        specialist: SpecialistKind,
        input: SpecialistInput,
    ) -> Result<Settlement, EngineError> {
        let request = DelegationRequest {
            project_id: None,
            task_id: None,
            specialist,
            input,
            timeout: self.config.delegation.timeout_for(specialist),
        };
        let report = match self.delegator.delegate(request).await {
            Ok(report) => report,
            Err(error @ EngineError::Storage { .. }) => return Err(error),
            Err(error) => return Ok(Err(error.to_string())),
        };
        match report.result {
            Ok(output) => Ok(Ok(DelegationSummary {
                specialist,
                execution_id: report.execution.id,
                artifact_ids: Vec::new(),
                summary: output.summary().to_string(),
            })),
            Err(error) => Ok(Err(error.to_string())),
        }
    }

    /// Project-scoped delegation: create a task, claim it, and drive it to
    /// settlement. Retry is the task registry's policy, not the step's —
    /// a failed delegation re-queues the task until its budget is spent.
    async fn settle_project_task(
        &self,
        project_id: ProjectId,
        step_name: &str,
        specialist: SpecialistKind,
        input: SpecialistInput,
    ) -> Result<Settlement, EngineError> {
        let timeout = self.config.delegation.timeout_for(specialist);
        let change = self
            .tasks
            .create(TaskDraft {
                project_id,
                name: format!("{}:{}", step_name, specialist),
                description: format!("{} work for step '{}'", specialist, step_name),
                specialist,
                priority: self.config.tasks.default_priority,
                dependencies: Vec::new(),
                input: input.clone(),
                max_retries: Some(self.config.tasks.max_retries),
                estimated_duration_min: None,
            })
            .await;
        self.executor.apply_effects(project_id, change.effects).await?;
        let task_id = change.task.id;

        loop {
            match self.tasks.claim(task_id).await {
                Ok(Some(_)) => {}
                Ok(None) => return Ok(Err(format!("task {} already claimed", task_id))),
                Err(error) => return Ok(Err(error.to_string())),
            }

            let request = DelegationRequest {
                project_id: Some(project_id),
                task_id: Some(task_id),
                specialist,
                input: input.clone(),
                timeout,
            };
            let report = match self.delegator.delegate(request).await {
                Ok(report) => report,
                Err(error @ EngineError::Storage { .. }) => return Err(error),
                Err(error) => return Ok(Err(error.to_string())),
            };
            self.executor.apply_effects(project_id, report.effects).await?;

            match report.result {
                Ok(output) => {
                    let artifact_ids: Vec<_> =
                        report.artifacts.iter().map(|artifact| artifact.id).collect();
                    let completed = self
                        .tasks
                        .mark_completed(
                            task_id,
                            TaskResult {
                                success: true,
                                output: Some(output.clone()),
                                error: None,
                                artifacts: artifact_ids.clone(),
                            },
                        )
                        .await?;
                    self.executor
                        .apply_effects(project_id, completed.effects)
                        .await?;
                    return Ok(Ok(DelegationSummary {
                        specialist,
                        execution_id: report.execution.id,
                        artifact_ids,
                        summary: output.summary().to_string(),
                    }));
                }
                Err(delegation_error) => {
                    let failed = self
                        .tasks
                        .mark_failed(task_id, delegation_error.to_string())
                        .await?;
                    self.executor
                        .apply_effects(project_id, failed.effects)
                        .await?;
                    if failed.task.status == TaskStatus::Failed {
                        return Ok(Err(format!(
                            "task '{}' failed terminally after {} retries: {}",
                            failed.task.name, failed.task.retry_count, delegation_error
                        )));
                    }
                    // Task re-queued as pending; claim and retry.
                }
            }
        }
    }

    /// Marks a run failed, records the failure in the audit log, and
    /// returns the run to the trigger caller. The project stays in its
    /// last successfully committed phase.
    async fn fail_run(
        &self,
        mut execution: WorkflowExecution,
        error: String,
        project_id: Option<ProjectId>,
    ) -> Result<WorkflowExecution, EngineError> {
        warn!(run_id = %execution.run_id, error = %error, "workflow run failed");
        execution.status = RunStatus::Failed;
        execution.error = Some(error.clone());
        execution.touch();

        if let Some(project_id) = project_id {
            // Best effort: recording the failure must not mask it.
            let recorded = self
                .executor
                .execute(
                    project_id,
                    ProjectCommand::RecordWorkflowFailed {
                        workflow_name: execution.workflow_name.clone(),
                        run_id: execution.run_id,
                        error,
                    },
                )
                .await;
            if let Err(record_error) = recorded {
                warn!(error = %record_error, "could not record workflow failure event");
            }
        }

        self.runs.upsert(execution.clone()).await;
        Ok(execution)
    }
}

/// Builds the typed input for one specialist within one step, from the
/// project view and the results of earlier steps.
fn build_input(
    step: &WorkflowStep,
    specialist: SpecialistKind,
    view: Option<&ProjectView>,
    execution: &WorkflowExecution,
) -> SpecialistInput {
    let project_name = view
        .and_then(|v| v.name())
        .map(str::to_string)
        .unwrap_or_else(|| "untitled project".to_string());
    let requirements = view.map(|v| v.requirements().clone()).unwrap_or_default();
    let step_summary = |name: &str| {
        execution
            .steps
            .get(name)
            .and_then(|result| result.delegations.first())
            .map(|delegation| delegation.summary.clone())
    };

    if let WorkflowTrigger::ClientOnboarding { lead } = &execution.input {
        return match (specialist, step.name.as_str()) {
            (SpecialistKind::ClientAcquisition, "qualify-lead") => {
                SpecialistInput::QualifyLead(lead.clone())
            }
            (SpecialistKind::ClientAcquisition, _) => {
                SpecialistInput::CreateProposal(ProposalRequest {
                    client_name: lead.name.clone(),
                    project_description: lead.project_description.clone(),
                    budget: lead.budget.clone(),
                    timeline: lead.timeline.clone(),
                })
            }
            _ => SpecialistInput::Coordination(CoordinationBrief {
                project_name: format!("{} project", lead.name),
                phase: Phase::Intake,
                instructions: format!("Prepare project intake for {}", lead.name),
            }),
        };
    }

    match specialist {
        SpecialistKind::DeepResearch => SpecialistInput::Research(ResearchBrief {
            project_name,
            focus_areas: requirements.features.clone(),
            requirements,
        }),
        SpecialistKind::Design => SpecialistInput::Design(DesignBrief {
            project_name,
            requirements,
            research_summary: step_summary("research"),
        }),
        SpecialistKind::Frontend => SpecialistInput::Implementation(ImplementationBrief {
            project_name,
            surface: ImplementationSurface::Frontend,
            requirements,
            design_notes: step_summary("design"),
        }),
        SpecialistKind::Backend => SpecialistInput::Implementation(ImplementationBrief {
            project_name,
            surface: ImplementationSurface::Backend,
            requirements,
            design_notes: step_summary("design"),
        }),
        SpecialistKind::Qa => SpecialistInput::Qa(QaBrief {
            project_name,
            focus: requirements.constraints.clone(),
            requirements,
        }),
        SpecialistKind::ClientAcquisition => SpecialistInput::CreateProposal(ProposalRequest {
            client_name: project_name,
            project_description: requirements.description,
            budget: None,
            timeline: None,
        }),
        SpecialistKind::ProjectManager => SpecialistInput::Coordination(CoordinationBrief {
            instructions: format!("Coordinate the '{}' step for {}", step.name, project_name),
            project_name,
            phase: step
                .phase
                .or_else(|| view.map(|v| v.current_phase()))
                .unwrap_or(Phase::Intake),
        }),
    }
}

#[cfg(test)]
#[path = "tests/engine_tests.rs"]
mod tests;
