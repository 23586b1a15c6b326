//! Strongly typed domain primitives for the project lifecycle.
//!
//! These newtypes provide type safety and semantic clarity for the
//! identifiers, enumerations, and record fragments used throughout the
//! domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Creates a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Parses an identifier from a string.
            pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for a project. Used as the aggregate_id in the
    /// event store.
    ProjectId
);
uuid_id!(
    /// Unique identifier for a task.
    TaskId
);
uuid_id!(
    /// Unique identifier for an artifact version.
    ArtifactId
);
uuid_id!(
    /// Unique identifier for an execution record.
    ExecutionId
);
uuid_id!(
    /// Unique identifier for a workflow run.
    RunId
);
uuid_id!(
    /// Unique identifier for a client.
    ClientId
);

/// UTC timestamp for events and records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampUtc(pub DateTime<Utc>);

impl TimestampUtc {
    /// Creates a timestamp for the current moment.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Returns the timestamp as an RFC3339 string.
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339()
    }
}

impl Default for TimestampUtc {
    fn default() -> Self {
        Self::now()
    }
}

/// Project lifecycle phase. Doubles as the project status: the two are the
/// same vocabulary, and the invariant is that a project's status always
/// equals the phase of the last entry in its phase list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Intake,
    Research,
    Design,
    Development,
    Qa,
    Review,
    Completed,
    OnHold,
    Cancelled,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Intake => "intake",
            Phase::Research => "research",
            Phase::Design => "design",
            Phase::Development => "development",
            Phase::Qa => "qa",
            Phase::Review => "review",
            Phase::Completed => "completed",
            Phase::OnHold => "on_hold",
            Phase::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Specialist agents that can be assigned work through the delegation
/// protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecialistKind {
    ProjectManager,
    DeepResearch,
    Design,
    Frontend,
    Backend,
    Qa,
    ClientAcquisition,
}

impl SpecialistKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpecialistKind::ProjectManager => "project_manager",
            SpecialistKind::DeepResearch => "deep_research",
            SpecialistKind::Design => "design",
            SpecialistKind::Frontend => "frontend",
            SpecialistKind::Backend => "backend",
            SpecialistKind::Qa => "qa",
            SpecialistKind::ClientAcquisition => "client_acquisition",
        }
    }
}

impl std::fmt::Display for SpecialistKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Task lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Blocked,
    Completed,
    Failed,
    Cancelled,
}

/// Task scheduling priority. Ordered `urgent > high > medium > low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl TaskPriority {
    /// Numeric rank used for queue ordering (higher runs first).
    pub fn rank(&self) -> u8 {
        match self {
            TaskPriority::Low => 0,
            TaskPriority::Medium => 1,
            TaskPriority::High => 2,
            TaskPriority::Urgent => 3,
        }
    }
}

/// How one task relates to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyKind {
    Blocks,
    BlockedBy,
    Related,
}

/// Kind of work product a specialist can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Design,
    Code,
    Documentation,
    Research,
    Wireframe,
    Component,
    Api,
    Test,
    Report,
}

/// Milestone completion state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneStatus {
    #[default]
    Pending,
    Completed,
    Overdue,
}

/// A timeline milestone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub id: String,
    pub name: String,
    pub description: String,
    pub due_date: TimestampUtc,
    pub completed_at: Option<TimestampUtc>,
    pub status: MilestoneStatus,
}

/// Estimated and actual schedule for a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProjectTimeline {
    pub estimated_start: Option<TimestampUtc>,
    pub estimated_end: Option<TimestampUtc>,
    pub actual_start: Option<TimestampUtc>,
    pub actual_end: Option<TimestampUtc>,
    #[serde(default)]
    pub milestones: Vec<Milestone>,
}

/// What the client asked for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProjectRequirements {
    pub description: String,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub technical_stack: Vec<String>,
    #[serde(default)]
    pub design_preferences: Vec<String>,
    pub target_audience: Option<String>,
    #[serde(default)]
    pub constraints: Vec<String>,
}

/// One entry in a project's phase history. The last entry always defines
/// the project's current phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseRecord {
    pub name: String,
    pub phase: Phase,
    pub started_at: TimestampUtc,
    pub completed_at: Option<TimestampUtc>,
    #[serde(default)]
    pub assigned_specialists: Vec<SpecialistKind>,
}

impl PhaseRecord {
    /// Opens a new record for the given phase.
    pub fn open(phase: Phase, started_at: TimestampUtc, assigned: Vec<SpecialistKind>) -> Self {
        Self {
            name: phase.as_str().to_string(),
            phase,
            started_at,
            completed_at: None,
            assigned_specialists: assigned,
        }
    }
}

/// Token accounting for one specialist invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TokenUsage {
    pub prompt: u64,
    pub completion: u64,
    pub total: u64,
}
