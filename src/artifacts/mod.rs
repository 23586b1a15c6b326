//! Versioned artifact store.
//!
//! Artifacts are immutable per version: a revision never edits a document
//! in place, it creates a new one whose `previous_version_id` points at the
//! prior version. Content is fingerprinted with SHA-256 at creation.

use crate::domain::cqrs::ProjectCommand;
use crate::domain::errors::EngineError;
use crate::domain::types::{ArtifactId, ArtifactKind, ProjectId, SpecialistKind, TaskId, TimestampUtc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Typed metadata attached to an artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ArtifactMetadata {
    pub language: Option<String>,
    pub framework: Option<String>,
    pub component_type: Option<String>,
    pub design_tool: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// One immutable artifact version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: ArtifactId,
    pub project_id: ProjectId,
    pub task_id: Option<TaskId>,
    pub kind: ArtifactKind,
    pub name: String,
    pub description: Option<String>,
    pub content: String,
    pub metadata: ArtifactMetadata,
    pub created_by: SpecialistKind,
    /// Version number, starting at 1.
    pub version: u32,
    /// Previous version in the chain, if this is a revision.
    pub previous_version_id: Option<ArtifactId>,
    /// Hex SHA-256 of `content`.
    pub content_digest: String,
    pub created_at: TimestampUtc,
}

/// Fields for a new (version 1) artifact.
#[derive(Debug, Clone)]
pub struct ArtifactDraft {
    pub project_id: ProjectId,
    pub task_id: Option<TaskId>,
    pub kind: ArtifactKind,
    pub name: String,
    pub description: Option<String>,
    pub content: String,
    pub metadata: ArtifactMetadata,
    pub created_by: SpecialistKind,
}

/// In-memory artifact store, keyed by artifact id with stable creation
/// order for project listings.
#[derive(Debug, Default)]
pub struct ArtifactStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    artifacts: HashMap<ArtifactId, Artifact>,
    order: Vec<ArtifactId>,
}

impl ArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a version-1 artifact. Returns the artifact together with the
    /// audit event to append.
    pub async fn create(&self, draft: ArtifactDraft) -> (Artifact, Vec<ProjectCommand>) {
        let artifact = Artifact {
            id: ArtifactId::new(),
            project_id: draft.project_id,
            task_id: draft.task_id,
            kind: draft.kind,
            name: draft.name,
            description: draft.description,
            content_digest: digest(&draft.content),
            content: draft.content,
            metadata: draft.metadata,
            created_by: draft.created_by,
            version: 1,
            previous_version_id: None,
            created_at: TimestampUtc::now(),
        };
        self.insert(artifact.clone()).await;
        let effects = vec![record_created(&artifact)];
        (artifact, effects)
    }

    /// Creates the next version of an existing artifact. The prior version
    /// is left untouched.
    pub async fn revise(
        &self,
        previous_id: ArtifactId,
        content: String,
        created_by: SpecialistKind,
    ) -> Result<(Artifact, Vec<ProjectCommand>), EngineError> {
        let previous = self
            .get(previous_id)
            .await
            .ok_or_else(|| EngineError::NotFound {
                entity: "artifact",
                id: previous_id.to_string(),
            })?;

        let artifact = Artifact {
            id: ArtifactId::new(),
            project_id: previous.project_id,
            task_id: previous.task_id,
            kind: previous.kind,
            name: previous.name.clone(),
            description: previous.description.clone(),
            content_digest: digest(&content),
            content,
            metadata: previous.metadata.clone(),
            created_by,
            version: previous.version + 1,
            previous_version_id: Some(previous.id),
            created_at: TimestampUtc::now(),
        };
        self.insert(artifact.clone()).await;
        let effects = vec![record_created(&artifact)];
        Ok((artifact, effects))
    }

    /// Fetches one artifact version by id.
    pub async fn get(&self, id: ArtifactId) -> Option<Artifact> {
        self.inner.read().await.artifacts.get(&id).cloned()
    }

    /// All artifact versions for a project, in creation order.
    pub async fn list_by_project(&self, project_id: ProjectId) -> Vec<Artifact> {
        let inner = self.inner.read().await;
        inner
            .order
            .iter()
            .filter_map(|id| inner.artifacts.get(id))
            .filter(|a| a.project_id == project_id)
            .cloned()
            .collect()
    }

    /// The version chain ending at `id`, oldest first.
    pub async fn history(&self, id: ArtifactId) -> Result<Vec<Artifact>, EngineError> {
        let inner = self.inner.read().await;
        let mut chain = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let artifact = inner.artifacts.get(&current).ok_or_else(|| EngineError::NotFound {
                entity: "artifact",
                id: current.to_string(),
            })?;
            cursor = artifact.previous_version_id;
            chain.push(artifact.clone());
        }
        chain.reverse();
        Ok(chain)
    }

    async fn insert(&self, artifact: Artifact) {
        let mut inner = self.inner.write().await;
        inner.order.push(artifact.id);
        inner.artifacts.insert(artifact.id, artifact);
    }
}

fn record_created(artifact: &Artifact) -> ProjectCommand {
    ProjectCommand::RecordArtifactCreated {
        artifact_id: artifact.id,
        kind: artifact.kind,
        name: artifact.name.clone(),
        version: artifact.version,
        created_by: artifact.created_by,
    }
}

fn digest(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let bytes = hasher.finalize();
    let mut hex = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        use std::fmt::Write as _;
        let _ = write!(hex, "{:02x}", byte);
    }
    hex
}
