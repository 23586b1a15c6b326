//! CQRS query handler for the project view projection.
//!
//! The `ProjectQuery` applies committed events to a per-project view map
//! and broadcasts event envelopes to dashboard subscribers.

use super::ProjectAggregate;
use crate::domain::view::{ProjectEventEnvelope, ProjectView};
use async_trait::async_trait;
use cqrs_es::{EventEnvelope, Query};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

/// CQRS query handler that maintains the per-project view projections.
pub struct ProjectQuery {
    /// In-memory projections keyed by project id.
    pub projections: Arc<RwLock<HashMap<String, ProjectView>>>,
    /// Broadcast channel for event streaming.
    pub event_tx: broadcast::Sender<ProjectEventEnvelope>,
}

impl ProjectQuery {
    /// Creates a new project query handler.
    pub fn new(
        projections: Arc<RwLock<HashMap<String, ProjectView>>>,
        event_tx: broadcast::Sender<ProjectEventEnvelope>,
    ) -> Self {
        Self {
            projections,
            event_tx,
        }
    }
}

#[async_trait]
impl Query<ProjectAggregate> for ProjectQuery {
    async fn dispatch(&self, aggregate_id: &str, events: &[EventEnvelope<ProjectAggregate>]) {
        let mut projections = self.projections.write().await;
        let view = projections.entry(aggregate_id.to_string()).or_default();

        for envelope in events {
            view.apply_event(aggregate_id, &envelope.payload, envelope.sequence as u64);

            // Subscribers may come and go; a send failure only means nobody
            // is listening right now.
            let _ = self.event_tx.send(ProjectEventEnvelope {
                project_id: aggregate_id.to_string(),
                sequence: envelope.sequence as u64,
                event: envelope.payload.clone(),
            });
        }
    }
}
