//! The delegation protocol: one schema-validated request/response call.
//!
//! Ledger ordering is the contract here: the execution record for an
//! attempt is written before its result is applied anywhere else
//! (artifacts, events), so at worst an execution record exists without its
//! artifact — never the reverse. The caller receives the audit events to
//! append as an effects list and persists them together.

use crate::artifacts::{Artifact, ArtifactDraft, ArtifactMetadata, ArtifactStore};
use crate::domain::cqrs::ProjectCommand;
use crate::domain::errors::{DelegationError, EngineError};
use crate::domain::types::{ProjectId, SpecialistKind, TaskId};
use crate::executions::{ExecutionLog, ExecutionRecord, NewExecution};
use crate::specialists::protocol::{SpecialistInput, SpecialistOutput};
use crate::specialists::SpecialistRegistry;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// One delegation call.
#[derive(Debug, Clone)]
pub struct DelegationRequest {
    /// Owning project; `None` for pre-project delegations (onboarding).
    pub project_id: Option<ProjectId>,
    /// Owning task, when the call settles a registered task.
    pub task_id: Option<TaskId>,
    pub specialist: SpecialistKind,
    pub input: SpecialistInput,
    /// Caller-supplied deadline for the underlying call.
    pub timeout: Duration,
}

/// Everything a settled delegation produced. The execution record and any
/// artifacts are already durably stored; `effects` carries the audit
/// events for the caller to append.
#[derive(Debug)]
pub struct DelegationReport {
    pub result: Result<SpecialistOutput, DelegationError>,
    pub execution: ExecutionRecord,
    pub artifacts: Vec<Artifact>,
    pub effects: Vec<ProjectCommand>,
}

impl DelegationReport {
    /// Whether the delegation succeeded.
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Executes delegation calls against the specialist registry.
pub struct Delegator {
    registry: Arc<SpecialistRegistry>,
    executions: Arc<ExecutionLog>,
    artifacts: Arc<ArtifactStore>,
}

impl Delegator {
    pub fn new(
        registry: Arc<SpecialistRegistry>,
        executions: Arc<ExecutionLog>,
        artifacts: Arc<ArtifactStore>,
    ) -> Self {
        Self {
            registry,
            executions,
            artifacts,
        }
    }

    /// Runs one delegation to settlement.
    ///
    /// Invalid input fails with [`EngineError::Validation`] before anything
    /// is dispatched or recorded. Every dispatched attempt produces exactly
    /// one execution record, success or not; failures settle into the
    /// report's `result` as a typed [`DelegationError`] rather than an
    /// outer error, so parallel sibling delegations keep running.
    pub async fn delegate(
        &self,
        request: DelegationRequest,
    ) -> Result<DelegationReport, EngineError> {
        let specialist = self.registry.get(request.specialist)?;

        if request.input.kind() != request.specialist {
            return Err(EngineError::Validation {
                message: format!(
                    "input for {} sent to {}",
                    request.input.kind(),
                    request.specialist
                ),
            });
        }
        request
            .input
            .validate()
            .map_err(|message| EngineError::Validation { message })?;

        let mut effects = vec![ProjectCommand::RecordAgentStarted {
            specialist: request.specialist,
            task_id: request.task_id,
        }];

        debug!(specialist = %request.specialist, "dispatching delegation");
        let started = Instant::now();
        let outcome = tokio::time::timeout(request.timeout, specialist.invoke(&request.input)).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match outcome {
            // Deadline expired. The underlying call is not guaranteed to
            // have stopped; a late reply is reconciled against this record.
            Err(_) => {
                let error = DelegationError::Timeout {
                    specialist: request.specialist,
                    timeout_ms: request.timeout.as_millis() as u64,
                };
                warn!(specialist = %request.specialist, "delegation timed out");
                let execution = self
                    .record_failure(&request, "timeout".to_string(), duration_ms)
                    .await;
                effects.push(agent_error(&request, "timeout"));
                Ok(DelegationReport {
                    result: Err(error),
                    execution,
                    artifacts: Vec::new(),
                    effects,
                })
            }

            Ok(Err(upstream)) => {
                let message = upstream.to_string();
                warn!(specialist = %request.specialist, error = %message, "delegation upstream failure");
                let execution = self
                    .record_failure(&request, message.clone(), duration_ms)
                    .await;
                effects.push(agent_error(&request, &message));
                Ok(DelegationReport {
                    result: Err(DelegationError::UpstreamFailure {
                        specialist: request.specialist,
                        message,
                    }),
                    execution,
                    artifacts: Vec::new(),
                    effects,
                })
            }

            Ok(Ok(reply)) => {
                match parse_output(reply.payload, request.specialist) {
                    Err(message) => {
                        warn!(specialist = %request.specialist, error = %message, "delegation output rejected");
                        let execution = self
                            .record_failure(
                                &request,
                                format!("invalid output: {}", message),
                                duration_ms,
                            )
                            .await;
                        effects.push(agent_error(&request, &format!("invalid output: {}", message)));
                        Ok(DelegationReport {
                            result: Err(DelegationError::InvalidOutput {
                                specialist: request.specialist,
                                message,
                            }),
                            execution,
                            artifacts: Vec::new(),
                            effects,
                        })
                    }

                    Ok(output) => {
                        // Ledger first: the record is durable before the
                        // result is applied.
                        let execution = self
                            .executions
                            .record(NewExecution {
                                project_id: request.project_id,
                                task_id: request.task_id,
                                specialist: request.specialist,
                                input: request.input.clone(),
                                output: Some(output.clone()),
                                error: None,
                                duration_ms,
                                token_usage: reply.token_usage,
                            })
                            .await;

                        let mut artifacts = Vec::new();
                        if let Some(project_id) = request.project_id {
                            for product in output.work_products() {
                                let (artifact, fx) = self
                                    .artifacts
                                    .create(ArtifactDraft {
                                        project_id,
                                        task_id: request.task_id,
                                        kind: product.kind,
                                        name: product.name.clone(),
                                        description: None,
                                        content: product.content.clone(),
                                        metadata: ArtifactMetadata {
                                            tags: product.tags.clone(),
                                            ..ArtifactMetadata::default()
                                        },
                                        created_by: request.specialist,
                                    })
                                    .await;
                                effects.extend(fx);
                                artifacts.push(artifact);
                            }
                        }

                        effects.push(ProjectCommand::RecordAgentCompleted {
                            specialist: request.specialist,
                            task_id: request.task_id,
                            execution_id: execution.id,
                            duration_ms,
                        });
                        debug!(specialist = %request.specialist, duration_ms, "delegation completed");

                        Ok(DelegationReport {
                            result: Ok(output),
                            execution,
                            artifacts,
                            effects,
                        })
                    }
                }
            }
        }
    }

    async fn record_failure(
        &self,
        request: &DelegationRequest,
        error: String,
        duration_ms: u64,
    ) -> ExecutionRecord {
        self.executions
            .record(NewExecution {
                project_id: request.project_id,
                task_id: request.task_id,
                specialist: request.specialist,
                input: request.input.clone(),
                output: None,
                error: Some(error),
                duration_ms,
                token_usage: None,
            })
            .await
    }
}

fn agent_error(request: &DelegationRequest, error: &str) -> ProjectCommand {
    ProjectCommand::RecordAgentError {
        specialist: request.specialist,
        task_id: request.task_id,
        error: error.to_string(),
    }
}

/// Parses and validates a raw reply payload against the expected output
/// shape for `specialist`.
fn parse_output(
    payload: serde_json::Value,
    specialist: SpecialistKind,
) -> Result<SpecialistOutput, String> {
    let output: SpecialistOutput =
        serde_json::from_value(payload).map_err(|e| format!("unparseable reply: {}", e))?;
    if output.kind() != specialist {
        return Err(format!(
            "reply shaped for {} from {}",
            output.kind(),
            specialist
        ));
    }
    output.validate()?;
    Ok(output)
}

#[cfg(test)]
#[path = "tests/delegation_tests.rs"]
mod tests;
