//! Project view projection for dashboards and queries.
//!
//! The `ProjectView` is derived from `ProjectEvent` only (no direct
//! mutation) and contains the data the dashboard layer reads: identity,
//! phase history, assigned specialists, produced artifacts, and workflow
//! run activity.

use crate::domain::cqrs::events::ProjectDetails;
use crate::domain::cqrs::ProjectEvent;
use crate::domain::types::{
    ArtifactId, ClientId, Phase, PhaseRecord, ProjectId, ProjectRequirements, ProjectTimeline,
    RunId, SpecialistKind, TimestampUtc,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An event together with its position in a project's log. Broadcast to
/// dashboard subscribers as events are committed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectEventEnvelope {
    pub project_id: String,
    pub sequence: u64,
    pub event: ProjectEvent,
}

/// Read-only view of project state derived from events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectView {
    project_id: Option<ProjectId>,
    name: Option<String>,
    client_id: Option<ClientId>,
    status: Phase,
    current_phase: Phase,
    phases: Vec<PhaseRecord>,
    held_phase: Option<Phase>,
    requirements: ProjectRequirements,
    timeline: ProjectTimeline,
    assigned_specialists: Vec<SpecialistKind>,
    artifact_ids: Vec<ArtifactId>,
    #[serde(default)]
    workflow_runs: Vec<RunId>,
    created_at: Option<TimestampUtc>,
    updated_at: Option<TimestampUtc>,
    last_event_sequence: u64,
}

impl ProjectView {
    /// Returns the project id, if any event has been applied.
    pub fn project_id(&self) -> Option<ProjectId> {
        self.project_id
    }

    /// Returns the project name.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the owning client.
    pub fn client_id(&self) -> Option<ClientId> {
        self.client_id
    }

    /// Returns the project status.
    pub fn status(&self) -> Phase {
        self.status
    }

    /// Returns the current phase.
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

    /// Returns ids of artifacts produced for this project, in creation order.
    pub fn artifact_ids(&self) -> &[ArtifactId] {
        &self.artifact_ids
    }

    /// Returns ids of workflow runs started for this project.
    pub fn workflow_runs(&self) -> &[RunId] {
        &self.workflow_runs
    }

    /// Returns the creation timestamp.
    pub fn created_at(&self) -> Option<TimestampUtc> {
        self.created_at
    }

    /// Returns the last-update timestamp.
    pub fn updated_at(&self) -> Option<TimestampUtc> {
        self.updated_at
    }

    /// Returns the sequence number of the last applied event.
    pub fn last_event_sequence(&self) -> u64 {
        self.last_event_sequence
    }

    /// Apply an event to update the view.
    pub fn apply_event(&mut self, aggregate_id: &str, event: &ProjectEvent, sequence: u64) {
        match Uuid::parse_str(aggregate_id) {
            Ok(uuid) => self.project_id = Some(ProjectId(uuid)),
            Err(e) => tracing::warn!("invalid aggregate id '{}': {}", aggregate_id, e),
        }
        self.last_event_sequence = sequence;

        match event {
            ProjectEvent::ProjectCreated {
                details,
                created_at,
            } => {
                let ProjectDetails {
                    name,
                    client_id,
                    requirements,
                    timeline,
                    ..
                } = details.as_ref();
                self.name = Some(name.clone());
                self.client_id = Some(*client_id);
                self.status = Phase::Intake;
                self.current_phase = Phase::Intake;
                self.phases = vec![PhaseRecord::open(Phase::Intake, *created_at, Vec::new())];
                self.held_phase = None;
                self.requirements = requirements.clone();
                self.timeline = timeline.clone();
                self.assigned_specialists.clear();
                self.artifact_ids.clear();
                self.workflow_runs.clear();
                self.created_at = Some(*created_at);
                self.updated_at = Some(*created_at);
            }

            ProjectEvent::ProjectStatusChanged {
                previous,
                new_status,
                assigned_specialists,
                changed_at,
                ..
            } => {
                if let Some(last) = self.phases.last_mut() {
                    last.completed_at = Some(*changed_at);
                }
                self.phases.push(PhaseRecord::open(
                    *new_status,
                    *changed_at,
                    assigned_specialists.clone(),
                ));
                self.status = *new_status;
                self.current_phase = *new_status;
                self.held_phase = if *new_status == Phase::OnHold {
                    Some(*previous)
                } else {
                    None
                };
                if *previous == Phase::Intake && *new_status == Phase::Research {
                    self.timeline.actual_start.get_or_insert(*changed_at);
                }
                if *new_status == Phase::Completed {
                    self.timeline.actual_end = Some(*changed_at);
                }
                if !assigned_specialists.is_empty() {
                    self.assigned_specialists = assigned_specialists.clone();
                }
                self.updated_at = Some(*changed_at);
            }

            ProjectEvent::TaskAssigned {
                specialist,
                assigned_at,
                ..
            } => {
                if !self.assigned_specialists.contains(specialist) {
                    self.assigned_specialists.push(*specialist);
                }
                self.updated_at = Some(*assigned_at);
            }

            ProjectEvent::ArtifactCreated {
                artifact_id,
                created_at,
                ..
            } => {
                self.artifact_ids.push(*artifact_id);
                self.updated_at = Some(*created_at);
            }

            ProjectEvent::WorkflowStarted {
                run_id, started_at, ..
            } => {
                self.workflow_runs.push(*run_id);
                self.updated_at = Some(*started_at);
            }

            ProjectEvent::TaskCreated { created_at, .. } => {
                self.updated_at = Some(*created_at);
            }
            ProjectEvent::TaskCompleted { completed_at, .. } => {
                self.updated_at = Some(*completed_at);
            }
            ProjectEvent::TaskFailed { failed_at, .. } => {
                self.updated_at = Some(*failed_at);
            }
            ProjectEvent::AgentStarted { started_at, .. } => {
                self.updated_at = Some(*started_at);
            }
            ProjectEvent::AgentCompleted { completed_at, .. } => {
                self.updated_at = Some(*completed_at);
            }
            ProjectEvent::AgentError { failed_at, .. } => {
                self.updated_at = Some(*failed_at);
            }
            ProjectEvent::WorkflowCompleted { completed_at, .. } => {
                self.updated_at = Some(*completed_at);
            }
            ProjectEvent::WorkflowFailed { failed_at, .. } => {
                self.updated_at = Some(*failed_at);
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/view_tests.rs"]
mod tests;
