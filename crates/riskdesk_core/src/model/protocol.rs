//! Protocol and protocol execution models.
//!
//! # Responsibility
//! - Define the predefined remediation procedure and its ordered steps.
//! - Define the tracked run of a protocol against an incident.
//!
//! # Invariants
//! - Step identifiers are unique within one protocol.
//! - `Completed` requires full progress and every declared step done.
//! - `Completed` and `Cancelled` are final.

use crate::model::incident::IncidentId;
use crate::model::severity::Severity;
use crate::model::user::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Stable identifier for a protocol.
pub type ProtocolId = Uuid;

/// Stable identifier for a protocol step.
pub type StepId = Uuid;

/// Stable identifier for a protocol execution.
pub type ExecutionId = Uuid;

/// One ordered step of a remediation procedure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolStep {
    pub id: StepId,
    pub title: String,
    pub description: String,
    /// Ordered sub-tasks carried for display; completion is tracked at
    /// step granularity.
    pub tasks: Vec<String>,
}

impl ProtocolStep {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: description.into(),
            tasks: Vec::new(),
        }
    }
}

/// Predefined ordered remediation procedure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Protocol {
    pub id: ProtocolId,
    pub name: String,
    pub description: String,
    pub category: String,
    pub severity: Severity,
    /// Estimated total duration in minutes.
    pub estimated_minutes: u32,
    pub steps: Vec<ProtocolStep>,
    pub publisher_id: UserId,
    /// Soft-delete flag.
    pub active: bool,
}

impl Protocol {
    /// Identifiers of every declared step.
    pub fn step_ids(&self) -> BTreeSet<StepId> {
        self.steps.iter().map(|step| step.id).collect()
    }

    /// Marks this protocol as softly deleted.
    pub fn soft_delete(&mut self) {
        self.active = false;
    }
}

/// Lifecycle state of a protocol execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionState {
    InProgress,
    Completed,
    Cancelled,
}

impl ExecutionState {
    /// Canonical display label.
    pub fn label(self) -> &'static str {
        match self {
            Self::InProgress => "En Curso",
            Self::Completed => "Completada",
            Self::Cancelled => "Cancelada",
        }
    }

    /// Whether the state machine permits moving to `next`.
    pub fn allows(self, next: ExecutionState) -> bool {
        matches!(
            (self, next),
            (Self::InProgress, Self::Completed) | (Self::InProgress, Self::Cancelled)
        )
    }
}

/// Tracked run of a protocol against a specific incident.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolExecution {
    pub id: ExecutionId,
    pub protocol_id: ProtocolId,
    pub incident_id: IncidentId,
    pub executor_id: UserId,
    pub state: ExecutionState,
    /// Completion percentage, always within 0..=100.
    pub progress: u8,
    pub completed_steps: BTreeSet<StepId>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}
