//! Incident domain model.
//!
//! # Responsibility
//! - Define the incident record and its lifecycle states.
//! - Keep the transition rules of the incident state machine in one place.
//!
//! # Invariants
//! - `Resolved` is terminal.
//! - `was_cancelled` implies a non-empty `cancellation_reason`.
//! - Resolution records `resolved_by` and `resolved_at`.

use crate::model::protocol::ProtocolId;
use crate::model::risk::RiskId;
use crate::model::severity::Severity;
use crate::model::user::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for an incident.
pub type IncidentId = Uuid;

/// Lifecycle state of an incident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentState {
    Pending,
    InProgress,
    Resolved,
}

impl IncidentState {
    /// Canonical display label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pendiente",
            Self::InProgress => "En Curso",
            Self::Resolved => "Resuelto",
        }
    }

    /// Whether the remediation path permits moving to `next`.
    ///
    /// The direct `Pending -> Resolved` jump is reserved for cancellation
    /// and is validated separately together with its mandatory reason.
    pub fn allows(self, next: IncidentState) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::InProgress) | (Self::InProgress, Self::Resolved)
        )
    }
}

/// Reported occurrence requiring response, optionally linked to a risk
/// and a remediation protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Incident {
    pub id: IncidentId,
    pub title: String,
    pub description: String,
    pub category: String,
    pub severity: Severity,
    pub state: IncidentState,
    pub reported_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub assignee_id: UserId,
    /// Originating risk, when the incident materializes a tracked hazard.
    pub risk_id: Option<RiskId>,
    pub protocol_id: Option<ProtocolId>,
    /// Set by the caller once a linked protocol run finished.
    pub protocol_executed: bool,
    /// Closed without remediation.
    pub was_cancelled: bool,
    pub cancellation_reason: Option<String>,
    pub resolved_by: Option<UserId>,
}
