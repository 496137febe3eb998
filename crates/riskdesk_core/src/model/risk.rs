//! Risk domain model.
//!
//! # Responsibility
//! - Define the risk record and its lifecycle states.
//! - Keep the transition rules of the risk state machine in one place.
//!
//! # Invariants
//! - `Resolved` is terminal; no transition leaves it.
//! - `mitigation_measures` is present whenever the risk reached
//!   `Mitigated` through a transition.

use crate::model::protocol::ProtocolId;
use crate::model::severity::{Probability, Severity};
use crate::model::user::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a risk.
pub type RiskId = Uuid;

/// Lifecycle state of a risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskState {
    Active,
    Mitigated,
    Resolved,
}

impl RiskState {
    /// Canonical display label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Active => "Activo",
            Self::Mitigated => "Mitigado",
            Self::Resolved => "Resuelto",
        }
    }

    /// Whether the state machine permits moving to `next`.
    ///
    /// Mitigation is only reachable from `Active`; resolution is
    /// reachable from `Active` (abandonment) and from `Mitigated`.
    pub fn allows(self, next: RiskState) -> bool {
        matches!(
            (self, next),
            (Self::Active, Self::Mitigated)
                | (Self::Active, Self::Resolved)
                | (Self::Mitigated, Self::Resolved)
        )
    }
}

/// Tracked hazard with impact/probability ratings and a responsible party.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Risk {
    pub id: RiskId,
    pub title: String,
    pub description: String,
    pub category: String,
    pub impact: Severity,
    pub probability: Probability,
    pub state: RiskState,
    pub responsible_id: UserId,
    /// Optional linked remediation protocol.
    pub protocol_id: Option<ProtocolId>,
    /// Recorded when the risk transitions to `Mitigated`.
    pub mitigation_measures: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Soft-delete flag.
    pub active: bool,
}

impl Risk {
    /// Marks this risk as softly deleted.
    pub fn soft_delete(&mut self) {
        self.active = false;
    }
}
