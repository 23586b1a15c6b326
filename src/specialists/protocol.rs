//! Typed delegation payloads.
//!
//! Every specialist accepts one input shape and produces one output shape,
//! expressed as tagged enum variants rather than free-form JSON. Inputs are
//! validated before dispatch and outputs after the reply is parsed, so a
//! schema violation never crosses the protocol boundary in either
//! direction.

use crate::domain::types::{ArtifactKind, Phase, ProjectRequirements, SpecialistKind};
use serde::{Deserialize, Serialize};

/// Which half of the development phase an implementation brief targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImplementationSurface {
    Frontend,
    Backend,
}

impl ImplementationSurface {
    pub fn specialist(&self) -> SpecialistKind {
        match self {
            ImplementationSurface::Frontend => SpecialistKind::Frontend,
            ImplementationSurface::Backend => SpecialistKind::Backend,
        }
    }
}

/// Brief for the research specialist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchBrief {
    pub project_name: String,
    pub requirements: ProjectRequirements,
    #[serde(default)]
    pub focus_areas: Vec<String>,
}

/// Brief for the design specialist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignBrief {
    pub project_name: String,
    pub requirements: ProjectRequirements,
    pub research_summary: Option<String>,
}

/// Brief for a frontend or backend implementation specialist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImplementationBrief {
    pub project_name: String,
    pub surface: ImplementationSurface,
    pub requirements: ProjectRequirements,
    pub design_notes: Option<String>,
}

/// Brief for the QA specialist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaBrief {
    pub project_name: String,
    pub requirements: ProjectRequirements,
    #[serde(default)]
    pub focus: Vec<String>,
}

/// Lead details for qualification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadProfile {
    pub name: String,
    pub email: String,
    pub company: Option<String>,
    pub project_description: String,
    pub budget: Option<String>,
    pub timeline: Option<String>,
}

/// Request for a project proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalRequest {
    pub client_name: String,
    pub project_description: String,
    pub budget: Option<String>,
    pub timeline: Option<String>,
}

/// Brief for the project manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinationBrief {
    pub project_name: String,
    pub phase: Phase,
    pub instructions: String,
}

/// Schema-validated input to a specialist delegation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SpecialistInput {
    Research(ResearchBrief),
    Design(DesignBrief),
    Implementation(ImplementationBrief),
    Qa(QaBrief),
    QualifyLead(LeadProfile),
    CreateProposal(ProposalRequest),
    Coordination(CoordinationBrief),
}

impl SpecialistInput {
    /// The specialist this input is addressed to.
    pub fn kind(&self) -> SpecialistKind {
        match self {
            SpecialistInput::Research(_) => SpecialistKind::DeepResearch,
            SpecialistInput::Design(_) => SpecialistKind::Design,
            SpecialistInput::Implementation(brief) => brief.surface.specialist(),
            SpecialistInput::Qa(_) => SpecialistKind::Qa,
            SpecialistInput::QualifyLead(_) | SpecialistInput::CreateProposal(_) => {
                SpecialistKind::ClientAcquisition
            }
            SpecialistInput::Coordination(_) => SpecialistKind::ProjectManager,
        }
    }

    /// Validates the input shape. Returns a human-readable reason when the
    /// input must not be dispatched.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            SpecialistInput::Research(brief) => {
                non_empty("project_name", &brief.project_name)?;
                non_empty("requirements.description", &brief.requirements.description)
            }
            SpecialistInput::Design(brief) => {
                non_empty("project_name", &brief.project_name)?;
                non_empty("requirements.description", &brief.requirements.description)
            }
            SpecialistInput::Implementation(brief) => {
                non_empty("project_name", &brief.project_name)?;
                non_empty("requirements.description", &brief.requirements.description)
            }
            SpecialistInput::Qa(brief) => {
                non_empty("project_name", &brief.project_name)?;
                non_empty("requirements.description", &brief.requirements.description)
            }
            SpecialistInput::QualifyLead(lead) => {
                non_empty("name", &lead.name)?;
                non_empty("email", &lead.email)?;
                if !lead.email.contains('@') {
                    return Err(format!("email '{}' is not an address", lead.email));
                }
                non_empty("project_description", &lead.project_description)
            }
            SpecialistInput::CreateProposal(req) => {
                non_empty("client_name", &req.client_name)?;
                non_empty("project_description", &req.project_description)
            }
            SpecialistInput::Coordination(brief) => {
                non_empty("project_name", &brief.project_name)?;
                non_empty("instructions", &brief.instructions)
            }
        }
    }
}

/// A work product embedded in a specialist's output, persisted by the
/// artifact store when the delegation result is applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkProduct {
    pub kind: ArtifactKind,
    pub name: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// One issue found by QA.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaIssue {
    pub severity: String,
    pub description: String,
}

/// Research findings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchReport {
    pub summary: String,
    #[serde(default)]
    pub findings: Vec<String>,
    pub report: Option<WorkProduct>,
}

/// Design deliverables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignPackage {
    pub summary: String,
    #[serde(default)]
    pub deliverables: Vec<WorkProduct>,
}

/// Implementation deliverables for one surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImplementationResult {
    pub surface: ImplementationSurface,
    pub summary: String,
    #[serde(default)]
    pub deliverables: Vec<WorkProduct>,
}

/// QA findings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaReport {
    pub summary: String,
    pub passed: bool,
    #[serde(default)]
    pub issues: Vec<QaIssue>,
    pub report: Option<WorkProduct>,
}

/// Lead qualification verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadQualification {
    pub qualified: bool,
    /// Score in the range 0..=100.
    pub score: u8,
    pub notes: String,
}

/// A generated proposal document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalDocument {
    pub summary: String,
    pub document: WorkProduct,
}

/// Coordination outcome from the project manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinationSummary {
    pub summary: String,
    #[serde(default)]
    pub notes: Vec<String>,
}

/// Schema-validated output of a specialist delegation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SpecialistOutput {
    Research(ResearchReport),
    Design(DesignPackage),
    Implementation(ImplementationResult),
    Qa(QaReport),
    LeadQualification(LeadQualification),
    Proposal(ProposalDocument),
    Coordination(CoordinationSummary),
}

impl SpecialistOutput {
    /// The specialist this output shape belongs to.
    pub fn kind(&self) -> SpecialistKind {
        match self {
            SpecialistOutput::Research(_) => SpecialistKind::DeepResearch,
            SpecialistOutput::Design(_) => SpecialistKind::Design,
            SpecialistOutput::Implementation(result) => result.surface.specialist(),
            SpecialistOutput::Qa(_) => SpecialistKind::Qa,
            SpecialistOutput::LeadQualification(_) | SpecialistOutput::Proposal(_) => {
                SpecialistKind::ClientAcquisition
            }
            SpecialistOutput::Coordination(_) => SpecialistKind::ProjectManager,
        }
    }

    /// One-line result summary, used for step results and audit payloads.
    pub fn summary(&self) -> &str {
        match self {
            SpecialistOutput::Research(r) => &r.summary,
            SpecialistOutput::Design(d) => &d.summary,
            SpecialistOutput::Implementation(i) => &i.summary,
            SpecialistOutput::Qa(q) => &q.summary,
            SpecialistOutput::LeadQualification(l) => &l.notes,
            SpecialistOutput::Proposal(p) => &p.summary,
            SpecialistOutput::Coordination(c) => &c.summary,
        }
    }

    /// Work products to persist as artifacts.
    pub fn work_products(&self) -> Vec<&WorkProduct> {
        match self {
            SpecialistOutput::Research(r) => r.report.iter().collect(),
            SpecialistOutput::Design(d) => d.deliverables.iter().collect(),
            SpecialistOutput::Implementation(i) => i.deliverables.iter().collect(),
            SpecialistOutput::Qa(q) => q.report.iter().collect(),
            SpecialistOutput::Proposal(p) => vec![&p.document],
            SpecialistOutput::LeadQualification(_) | SpecialistOutput::Coordination(_) => {
                Vec::new()
            }
        }
    }

    /// Validates the output shape. Returns a human-readable reason when the
    /// reply must be rejected as invalid.
    pub fn validate(&self) -> Result<(), String> {
        non_empty("summary", self.summary())?;
        if let SpecialistOutput::LeadQualification(l) = self {
            if l.score > 100 {
                return Err(format!("score {} out of range 0..=100", l.score));
            }
        }
        for product in self.work_products() {
            non_empty("work product name", &product.name)?;
            non_empty("work product content", &product.content)?;
        }
        Ok(())
    }
}

fn non_empty(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{} must not be empty", field))
    } else {
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
