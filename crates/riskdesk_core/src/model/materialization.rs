//! Risk materialization model.
//!
//! A materialization records that a tracked risk actually occurred. It
//! never changes the state of the originating risk; follow-up happens on
//! the materialization record itself.

use crate::model::incident::IncidentId;
use crate::model::protocol::ProtocolId;
use crate::model::risk::RiskId;
use crate::model::severity::Severity;
use crate::model::user::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a risk materialization.
pub type MaterializationId = Uuid;

/// Follow-up state of a materialization record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterializationState {
    Active,
    UnderFollowUp,
    Resolved,
}

impl MaterializationState {
    /// Canonical display label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Active => "Activa",
            Self::UnderFollowUp => "En Seguimiento",
            Self::Resolved => "Resuelta",
        }
    }

    /// Whether the follow-up flow permits moving to `next`.
    pub fn allows(self, next: MaterializationState) -> bool {
        matches!(
            (self, next),
            (Self::Active, Self::UnderFollowUp)
                | (Self::Active, Self::Resolved)
                | (Self::UnderFollowUp, Self::Resolved)
        )
    }
}

/// Record that a risk actually occurred, with observed severity and the
/// actions taken in response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskMaterialization {
    pub id: MaterializationId,
    pub risk_id: RiskId,
    pub occurred_at: DateTime<Utc>,
    pub event_description: String,
    pub observed_severity: Severity,
    pub actions_taken: String,
    /// Protocol that was executed in response, when any.
    pub executed_protocol_id: Option<ProtocolId>,
    /// Incident generated from this occurrence, when any.
    pub generated_incident_id: Option<IncidentId>,
    pub state: MaterializationState,
    pub reported_by: UserId,
    pub resolved_by: Option<UserId>,
}
