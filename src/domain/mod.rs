//! Domain model for the event-sourced project lifecycle.
//!
//! This module provides a strongly typed CQRS/ES domain model: project state
//! changes are driven by commands and recorded as events in an append-only
//! log.
//!
//! # Architecture
//!
//! - **Commands** (`cqrs/commands.rs`): intent to change state
//! - **Events** (`cqrs/events.rs`): facts that have happened
//! - **Aggregate** (`cqrs/mod.rs`): command validation and event application
//! - **Phase rules** (`phase.rs`): pure lifecycle transition legality
//! - **View** (`view.rs`): read-only projection for dashboards and queries

pub mod cqrs;
pub mod errors;
pub mod phase;
pub mod services;
pub mod types;
pub mod view;

pub use cqrs::{ProjectAggregate, ProjectCommand, ProjectData, ProjectEvent, ProjectState};
pub use errors::{DelegationError, EngineError};
pub use services::{EngineClock, ProjectServices};
pub use types::{
    ArtifactId, ArtifactKind, ClientId, DependencyKind, ExecutionId, Milestone, MilestoneStatus,
    Phase, PhaseRecord, ProjectId, ProjectRequirements, ProjectTimeline, RunId, SpecialistKind,
    TaskId, TaskPriority, TaskStatus, TimestampUtc, TokenUsage,
};
pub use view::{ProjectEventEnvelope, ProjectView};
