//! CQRS core types for the project aggregate.
//!
//! - **Commands**: intent to change state
//! - **Events**: facts that have happened
//! - **Aggregate**: command validation and event application
//! - **Query**: read-side projection dispatch

pub mod commands;
pub mod events;
pub mod query;

pub use commands::ProjectCommand;
pub use events::{ProjectDetails, ProjectEvent};
pub use query::ProjectQuery;

use crate::domain::errors::EngineError;
use crate::domain::phase;
use crate::domain::services::ProjectServices;
use crate::domain::types::{
    ClientId, Phase, PhaseRecord, ProjectRequirements, ProjectTimeline, SpecialistKind,
    TimestampUtc,
};
use async_trait::async_trait;
use cqrs_es::Aggregate;
use serde::{Deserialize, Serialize};

/// Active project data once the aggregate is initialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectData {
    name: String,
    description: String,
    client_id: ClientId,
    created_at: TimestampUtc,
    updated_at: TimestampUtc,
    status: Phase,
    current_phase: Phase,
    phases: Vec<PhaseRecord>,
    held_phase: Option<Phase>,
    requirements: ProjectRequirements,
    timeline: ProjectTimeline,
    assigned_specialists: Vec<SpecialistKind>,
}

impl ProjectData {
    /// Returns the project name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the project description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the owning client.
    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    /// Returns the creation timestamp.
    pub fn created_at(&self) -> TimestampUtc {
        self.created_at
    }

    /// Returns the last-update timestamp.
    pub fn updated_at(&self) -> TimestampUtc {
        self.updated_at
    }

    /// Returns the project status.
    pub fn status(&self) -> Phase {
        self.status
    }

    /// Returns the current phase. Always equals the phase of the last
    /// entry in [`Self::phases`].
    pub fn current_phase(&self) -> Phase {
        self.current_phase
    }

    /// Returns the phase history.
    pub fn phases(&self) -> &[PhaseRecord] {
        &self.phases
    }

    /// Returns the phase held before an `on_hold` suspension.
    pub fn held_phase(&self) -> Option<Phase> {
        self.held_phase
    }

    /// Returns the project requirements.
    pub fn requirements(&self) -> &ProjectRequirements {
        &self.requirements
    }

    /// Returns the project timeline.
    pub fn timeline(&self) -> &ProjectTimeline {
        &self.timeline
    }

    /// Returns the currently assigned specialist set.
    pub fn assigned_specialists(&self) -> &[SpecialistKind] {
        &self.assigned_specialists
    }

    pub(crate) fn touch(&mut self, at: TimestampUtc) {
        self.updated_at = at;
    }

    pub(crate) fn assign_specialist(&mut self, specialist: SpecialistKind) {
        if !self.assigned_specialists.contains(&specialist) {
            self.assigned_specialists.push(specialist);
        }
    }

    pub(crate) fn apply_status_change(
        &mut self,
        previous: Phase,
        new_status: Phase,
        assigned: Vec<SpecialistKind>,
        changed_at: TimestampUtc,
    ) {
        if let Some(last) = self.phases.last_mut() {
            last.completed_at = Some(changed_at);
        }
        self.phases
            .push(PhaseRecord::open(new_status, changed_at, assigned.clone()));
        self.status = new_status;
        self.current_phase = new_status;
        self.held_phase = if new_status == Phase::OnHold {
            Some(previous)
        } else {
            None
        };
        if previous == Phase::Intake && new_status == Phase::Research {
            self.timeline.actual_start.get_or_insert(changed_at);
        }
        if new_status == Phase::Completed {
            self.timeline.actual_end = Some(changed_at);
        }
        if !assigned.is_empty() {
            self.assigned_specialists = assigned;
        }
        self.updated_at = changed_at;
    }
}

/// Project aggregate state.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub enum ProjectState {
    /// Aggregate has not been initialized.
    #[default]
    Uninitialized,
    /// Aggregate is active with project data (boxed for memory efficiency).
    Active(Box<ProjectData>),
}

/// The project aggregate.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProjectAggregate {
    pub state: ProjectState,
}

impl ProjectAggregate {
    /// Returns the active project data, if initialized.
    pub fn data(&self) -> Option<&ProjectData> {
        match &self.state {
            ProjectState::Uninitialized => None,
            ProjectState::Active(data) => Some(data),
        }
    }
}

#[async_trait]
impl Aggregate for ProjectAggregate {
    type Command = ProjectCommand;
    type Event = ProjectEvent;
    type Error = EngineError;
    type Services = ProjectServices;

    fn aggregate_type() -> String {
        "project".to_string()
    }

    async fn handle(
        &self,
        command: Self::Command,
        services: &Self::Services,
    ) -> Result<Vec<Self::Event>, Self::Error> {
        let now = services.clock.now();

        match (&self.state, command) {
            // CreateProject - only valid on an uninitialized aggregate
            (ProjectState::Uninitialized, ProjectCommand::CreateProject { details }) => {
                Ok(vec![ProjectEvent::ProjectCreated {
                    details,
                    created_at: now,
                }])
            }

            (ProjectState::Active(_), ProjectCommand::CreateProject { .. }) => {
                Err(EngineError::Validation {
                    message: "project already created".to_string(),
                })
            }

            // TransitionPhase - validated against the lifecycle rules
            (
                ProjectState::Active(data),
                ProjectCommand::TransitionPhase {
                    target,
                    notes,
                    assigned_specialists,
                },
            ) => {
                phase::classify_transition(data.status(), target, data.held_phase())?;
                Ok(vec![ProjectEvent::ProjectStatusChanged {
                    previous: data.status(),
                    new_status: target,
                    notes,
                    assigned_specialists,
                    changed_at: now,
                }])
            }

            // Record* commands append audit events on any active project
            (
                ProjectState::Active(_),
                ProjectCommand::RecordTaskCreated {
                    task_id,
                    name,
                    specialist,
                    priority,
                },
            ) => Ok(vec![ProjectEvent::TaskCreated {
                task_id,
                name,
                specialist,
                priority,
                created_at: now,
            }]),

            (
                ProjectState::Active(_),
                ProjectCommand::RecordTaskAssigned {
                    task_id,
                    specialist,
                },
            ) => Ok(vec![ProjectEvent::TaskAssigned {
                task_id,
                specialist,
                assigned_at: now,
            }]),

            (ProjectState::Active(_), ProjectCommand::RecordTaskCompleted { task_id }) => {
                Ok(vec![ProjectEvent::TaskCompleted {
                    task_id,
                    completed_at: now,
                }])
            }

            (
                ProjectState::Active(_),
                ProjectCommand::RecordTaskFailed {
                    task_id,
                    error,
                    retry_count,
                },
            ) => Ok(vec![ProjectEvent::TaskFailed {
                task_id,
                error,
                retry_count,
                failed_at: now,
            }]),

            (
                ProjectState::Active(_),
                ProjectCommand::RecordAgentStarted {
                    specialist,
                    task_id,
                },
            ) => Ok(vec![ProjectEvent::AgentStarted {
                specialist,
                task_id,
                started_at: now,
            }]),

            (
                ProjectState::Active(_),
                ProjectCommand::RecordAgentCompleted {
                    specialist,
                    task_id,
                    execution_id,
                    duration_ms,
                },
            ) => Ok(vec![ProjectEvent::AgentCompleted {
                specialist,
                task_id,
                execution_id,
                duration_ms,
                completed_at: now,
            }]),

            (
                ProjectState::Active(_),
                ProjectCommand::RecordAgentError {
                    specialist,
                    task_id,
                    error,
                },
            ) => Ok(vec![ProjectEvent::AgentError {
                specialist,
                task_id,
                error,
                failed_at: now,
            }]),

            (
                ProjectState::Active(_),
                ProjectCommand::RecordWorkflowStarted {
                    workflow_name,
                    run_id,
                },
            ) => Ok(vec![ProjectEvent::WorkflowStarted {
                workflow_name,
                run_id,
                started_at: now,
            }]),

            (
                ProjectState::Active(_),
                ProjectCommand::RecordWorkflowCompleted {
                    workflow_name,
                    run_id,
                },
            ) => Ok(vec![ProjectEvent::WorkflowCompleted {
                workflow_name,
                run_id,
                completed_at: now,
            }]),

            (
                ProjectState::Active(_),
                ProjectCommand::RecordWorkflowFailed {
                    workflow_name,
                    run_id,
                    error,
                },
            ) => Ok(vec![ProjectEvent::WorkflowFailed {
                workflow_name,
                run_id,
                error,
                failed_at: now,
            }]),

            (
                ProjectState::Active(_),
                ProjectCommand::RecordArtifactCreated {
                    artifact_id,
                    kind,
                    name,
                    version,
                    created_by,
                },
            ) => Ok(vec![ProjectEvent::ArtifactCreated {
                artifact_id,
                kind,
                name,
                version,
                created_by,
                created_at: now,
            }]),

            // Any other command on an uninitialized aggregate
            (ProjectState::Uninitialized, _) => Err(EngineError::NotInitialized),
        }
    }

    fn apply(&mut self, event: Self::Event) {
        match (&mut self.state, event) {
            // ProjectCreated initializes the aggregate
            (
                ProjectState::Uninitialized,
                ProjectEvent::ProjectCreated {
                    details,
                    created_at,
                },
            ) => {
                let ProjectDetails {
                    name,
                    description,
                    client_id,
                    requirements,
                    timeline,
                } = *details;
                self.state = ProjectState::Active(Box::new(ProjectData {
                    name,
                    description,
                    client_id,
                    created_at,
                    updated_at: created_at,
                    status: Phase::Intake,
                    current_phase: Phase::Intake,
                    phases: vec![PhaseRecord::open(Phase::Intake, created_at, Vec::new())],
                    held_phase: None,
                    requirements,
                    timeline,
                    assigned_specialists: Vec::new(),
                }));
            }

            (
                ProjectState::Active(data),
                ProjectEvent::ProjectStatusChanged {
                    previous,
                    new_status,
                    assigned_specialists,
                    changed_at,
                    ..
                },
            ) => {
                data.apply_status_change(previous, new_status, assigned_specialists, changed_at);
            }

            (
                ProjectState::Active(data),
                ProjectEvent::TaskAssigned {
                    specialist,
                    assigned_at,
                    ..
                },
            ) => {
                data.assign_specialist(specialist);
                data.touch(assigned_at);
            }

            (ProjectState::Active(data), ProjectEvent::TaskCreated { created_at, .. }) => {
                data.touch(created_at);
            }

            (ProjectState::Active(data), ProjectEvent::TaskCompleted { completed_at, .. }) => {
                data.touch(completed_at);
            }

            (ProjectState::Active(data), ProjectEvent::TaskFailed { failed_at, .. }) => {
                data.touch(failed_at);
            }

            (ProjectState::Active(data), ProjectEvent::AgentStarted { started_at, .. }) => {
                data.touch(started_at);
            }

            (ProjectState::Active(data), ProjectEvent::AgentCompleted { completed_at, .. }) => {
                data.touch(completed_at);
            }

            (ProjectState::Active(data), ProjectEvent::AgentError { failed_at, .. }) => {
                data.touch(failed_at);
            }

            (ProjectState::Active(data), ProjectEvent::WorkflowStarted { started_at, .. }) => {
                data.touch(started_at);
            }

            (ProjectState::Active(data), ProjectEvent::WorkflowCompleted { completed_at, .. }) => {
                data.touch(completed_at);
            }

            (ProjectState::Active(data), ProjectEvent::WorkflowFailed { failed_at, .. }) => {
                data.touch(failed_at);
            }

            (ProjectState::Active(data), ProjectEvent::ArtifactCreated { created_at, .. }) => {
                data.touch(created_at);
            }

            // Ignore events on wrong state (cannot happen with a correct log)
            _ => {}
        }
    }
}

#[cfg(test)]
#[path = "../tests/aggregate_tests.rs"]
mod tests;
