//! Typed operation requests.
//!
//! # Responsibility
//! - Model every lifecycle operation input as an explicit request type.
//! - Validate required-field presence before any store access.
//!
//! # Invariants
//! - Deserialization ignores unrecognized fields instead of failing.
//! - `validate()` never touches the store; referential checks happen in
//!   the manager against freshly read rows.

use crate::lifecycle::ValidationError;
use crate::model::incident::IncidentId;
use crate::model::protocol::{ProtocolId, StepId};
use crate::model::risk::RiskId;
use crate::model::severity::{Probability, Severity};
use crate::model::user::{Role, UserId};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

fn require(
    value: &str,
    entity: &'static str,
    field: &'static str,
) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField { entity, field });
    }
    Ok(())
}

/// Input for registering a user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterUser {
    pub full_name: String,
    pub email: String,
    pub role: Role,
}

impl RegisterUser {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require(&self.full_name, "user", "full_name")?;
        require(&self.email, "user", "email")?;
        if !EMAIL_RE.is_match(self.email.trim()) {
            return Err(ValidationError::InvalidEmail(self.email.clone()));
        }
        Ok(())
    }
}

/// Input for creating a risk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRisk {
    pub title: String,
    pub description: String,
    pub category: String,
    pub impact: Severity,
    pub probability: Probability,
    pub responsible_id: UserId,
    pub protocol_id: Option<ProtocolId>,
}

impl CreateRisk {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require(&self.title, "risk", "title")?;
        require(&self.description, "risk", "description")?;
        require(&self.category, "risk", "category")
    }
}

/// Requested risk state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RiskTransition {
    /// Record mitigation measures and move to `Mitigated`.
    Mitigate { measures: String },
    /// Close the risk, from `Active` (abandonment) or `Mitigated`.
    Resolve,
}

impl RiskTransition {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Self::Mitigate { measures } = self {
            require(measures, "risk", "measures")?;
        }
        Ok(())
    }
}

/// Input for recording that a risk actually occurred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterializeRisk {
    pub event_description: String,
    pub observed_severity: Severity,
    pub actions_taken: String,
    pub executed_protocol_id: Option<ProtocolId>,
    pub generated_incident_id: Option<IncidentId>,
}

impl MaterializeRisk {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require(&self.event_description, "materialization", "event_description")?;
        require(&self.actions_taken, "materialization", "actions_taken")
    }
}

/// Requested materialization follow-up change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum MaterializationTransition {
    FollowUp,
    Resolve,
}

/// Input for creating an incident.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateIncident {
    pub title: String,
    pub description: String,
    pub category: String,
    pub severity: Severity,
    pub assignee_id: UserId,
    pub risk_id: Option<RiskId>,
    pub protocol_id: Option<ProtocolId>,
}

impl CreateIncident {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require(&self.title, "incident", "title")?;
        require(&self.description, "incident", "description")?;
        require(&self.category, "incident", "category")
    }
}

/// Requested incident state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum IncidentTransition {
    /// Begin remediation work.
    Start,
    /// Close after remediation.
    Resolve,
    /// Close without remediation; the reason is mandatory.
    Cancel { reason: String },
}

impl IncidentTransition {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Self::Cancel { reason } = self {
            require(reason, "incident", "cancellation_reason")?;
        }
        Ok(())
    }
}

/// Input for starting a protocol execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartExecution {
    pub protocol_id: ProtocolId,
    pub incident_id: IncidentId,
}

/// Progress report for a running execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionProgress {
    pub progress: u8,
    pub completed_steps: Vec<StepId>,
}

/// Requested execution state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ExecutionTransition {
    Complete,
    Cancel,
}

/// Direct field edit on a risk or incident.
///
/// Edits do not count as transitions and trigger no notification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateDetails {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
}

impl UpdateDetails {
    pub fn validate(&self, entity: &'static str) -> Result<(), ValidationError> {
        if let Some(title) = &self.title {
            require(title, entity, "title")?;
        }
        if let Some(description) = &self.description {
            require(description, entity, "description")?;
        }
        if let Some(category) = &self.category {
            require(category, entity, "category")?;
        }
        Ok(())
    }
}
