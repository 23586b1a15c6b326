//! Specialist agents and the delegation protocol.
//!
//! A specialist is an autonomous worker (research, design, frontend,
//! backend, QA, client acquisition, or the coordinating project manager)
//! reached through a single opaque invocation surface: structured input in,
//! raw reply out. Everything on this side of that surface — input
//! validation, timeouts, output validation, execution records, artifact
//! capture, audit events — lives in [`delegation`].

pub mod delegation;
pub mod protocol;

pub use delegation::{DelegationReport, DelegationRequest, Delegator};
pub use protocol::{SpecialistInput, SpecialistOutput};

use crate::domain::errors::EngineError;
use crate::domain::types::{SpecialistKind, TokenUsage};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Raw reply from the underlying model call, not yet validated.
#[derive(Debug, Clone)]
pub struct SpecialistReply {
    /// Structured payload, parsed into [`SpecialistOutput`] at the
    /// protocol boundary.
    pub payload: serde_json::Value,
    /// Token accounting, when the surface reports it.
    pub token_usage: Option<TokenUsage>,
}

/// The opaque specialist invocation surface.
///
/// Implementations wrap whatever actually produces the work (an LLM call,
/// a remote service, a scripted stub in tests). The engine never interprets
/// a failure here beyond "upstream failed"; schema enforcement happens in
/// the delegation layer.
#[async_trait]
pub trait Specialist: Send + Sync {
    /// Which specialist this implementation embodies.
    fn kind(&self) -> SpecialistKind;

    /// Executes one delegation. The input has already been validated.
    async fn invoke(&self, input: &SpecialistInput) -> anyhow::Result<SpecialistReply>;
}

/// Registry of the specialists available to the engine.
///
/// Constructed once at process start and passed by reference into the
/// orchestrator — there is no ambient global instance.
#[derive(Default)]
pub struct SpecialistRegistry {
    specialists: HashMap<SpecialistKind, Arc<dyn Specialist>>,
}

impl SpecialistRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a specialist, replacing any previous registration for the
    /// same kind.
    pub fn register(&mut self, specialist: Arc<dyn Specialist>) {
        self.specialists.insert(specialist.kind(), specialist);
    }

    /// Looks up a specialist by kind.
    pub fn get(&self, kind: SpecialistKind) -> Result<Arc<dyn Specialist>, EngineError> {
        self.specialists
            .get(&kind)
            .cloned()
            .ok_or_else(|| EngineError::NotFound {
                entity: "specialist",
                id: kind.as_str().to_string(),
            })
    }

    /// Kinds currently registered.
    pub fn kinds(&self) -> Vec<SpecialistKind> {
        self.specialists.keys().copied().collect()
    }
}

impl std::fmt::Debug for SpecialistRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpecialistRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}
