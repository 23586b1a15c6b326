//! Error types for the orchestration domain.

use crate::domain::types::{Phase, SpecialistKind, TaskId};
use std::fmt::{Display, Formatter};

/// Errors that can occur while driving the project lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Malformed delegation input or other schema violation.
    Validation { message: String },
    /// Illegal phase change attempted.
    InvalidTransition { from: Phase, to: Phase },
    /// Task cannot start because a `blocked_by` dependency is not completed.
    DependencyNotSatisfied { task_id: TaskId, blocked_by: TaskId },
    /// Racing phase change detected (another transition committed first).
    ConcurrentTransition { message: String },
    /// A delegation call failed.
    Delegation(DelegationError),
    /// Referenced project/task/artifact/run does not exist.
    NotFound { entity: &'static str, id: String },
    /// Command executed against a project that was never created.
    NotInitialized,
    /// Resource-layer failure (store unavailable, corrupt record).
    Storage { message: String },
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation { message } => write!(f, "validation error: {}", message),
            Self::InvalidTransition { from, to } => {
                write!(f, "invalid transition: {} -> {}", from, to)
            }
            Self::DependencyNotSatisfied {
                task_id,
                blocked_by,
            } => write!(
                f,
                "task {} blocked by incomplete dependency {}",
                task_id, blocked_by
            ),
            Self::ConcurrentTransition { message } => {
                write!(f, "concurrent transition: {}", message)
            }
            Self::Delegation(err) => write!(f, "delegation failed: {}", err),
            Self::NotFound { entity, id } => write!(f, "{} not found: {}", entity, id),
            Self::NotInitialized => write!(f, "project not initialized"),
            Self::Storage { message } => write!(f, "storage failure: {}", message),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<DelegationError> for EngineError {
    fn from(err: DelegationError) -> Self {
        Self::Delegation(err)
    }
}

/// Typed failure of a single specialist delegation.
#[derive(Debug, Clone, PartialEq)]
pub enum DelegationError {
    /// The caller-supplied timeout expired before the specialist replied.
    /// The underlying call is not guaranteed to have stopped.
    Timeout {
        specialist: SpecialistKind,
        timeout_ms: u64,
    },
    /// The specialist replied, but the reply failed output validation.
    InvalidOutput {
        specialist: SpecialistKind,
        message: String,
    },
    /// The underlying model call itself failed.
    UpstreamFailure {
        specialist: SpecialistKind,
        message: String,
    },
}

impl DelegationError {
    /// The specialist whose delegation failed.
    pub fn specialist(&self) -> SpecialistKind {
        match self {
            Self::Timeout { specialist, .. }
            | Self::InvalidOutput { specialist, .. }
            | Self::UpstreamFailure { specialist, .. } => *specialist,
        }
    }
}

impl Display for DelegationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout {
                specialist,
                timeout_ms,
            } => write!(f, "{} timed out after {}ms", specialist, timeout_ms),
            Self::InvalidOutput {
                specialist,
                message,
            } => write!(f, "{} returned invalid output: {}", specialist, message),
            Self::UpstreamFailure {
                specialist,
                message,
            } => write!(f, "{} upstream failure: {}", specialist, message),
        }
    }
}

impl std::error::Error for DelegationError {}
