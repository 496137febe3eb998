//! Domain events emitted after committed state changes.
//!
//! An event is an immutable record describing what changed, carrying the
//! entity snapshot needed for notification rendering and the resolved
//! recipient when one exists. Events are constructed only after the
//! entity store accepted the write.

use crate::model::incident::{Incident, IncidentState};
use crate::model::materialization::RiskMaterialization;
use crate::model::risk::{Risk, RiskState};
use crate::model::user::{User, UserId};
use chrono::{DateTime, Utc};

/// Kind of committed state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    RiskCreated,
    RiskStateChanged,
    RiskMaterialized,
    IncidentCreated,
    IncidentStateChanged,
    IncidentCancelled,
    UserRegistered,
    UserLoggedIn,
}

impl EventKind {
    /// Stable name used for template lookup and log lines.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RiskCreated => "risk_created",
            Self::RiskStateChanged => "risk_state_changed",
            Self::RiskMaterialized => "risk_materialized",
            Self::IncidentCreated => "incident_created",
            Self::IncidentStateChanged => "incident_state_changed",
            Self::IncidentCancelled => "incident_cancelled",
            Self::UserRegistered => "user_registered",
            Self::UserLoggedIn => "user_logged_in",
        }
    }

    /// Every kind, in template-catalog order.
    pub fn all() -> [EventKind; 8] {
        [
            Self::RiskCreated,
            Self::RiskStateChanged,
            Self::RiskMaterialized,
            Self::IncidentCreated,
            Self::IncidentStateChanged,
            Self::IncidentCancelled,
            Self::UserRegistered,
            Self::UserLoggedIn,
        ]
    }
}

/// Resolved notification recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub name: String,
    pub email: String,
}

impl Recipient {
    /// Builds a recipient from a user, when that user can be notified.
    pub fn for_user(user: &User) -> Option<Self> {
        if !user.has_notification_address() {
            return None;
        }
        Some(Self {
            name: user.full_name.clone(),
            email: user.email.trim().to_string(),
        })
    }
}

/// User who triggered the operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorRef {
    pub id: UserId,
    pub name: String,
}

impl ActorRef {
    pub fn of(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.full_name.clone(),
        }
    }
}

/// Entity snapshot carried by a domain event.
#[derive(Debug, Clone)]
pub enum EventPayload {
    Risk {
        risk: Risk,
        previous_state: Option<RiskState>,
    },
    Materialization {
        risk: Risk,
        materialization: RiskMaterialization,
    },
    Incident {
        incident: Incident,
        previous_state: Option<IncidentState>,
    },
    User {
        user: User,
    },
}

/// Immutable record of one committed state change.
#[derive(Debug, Clone)]
pub struct DomainEvent {
    pub kind: EventKind,
    pub payload: EventPayload,
    /// Absent when the responsible party cannot be notified; the event
    /// is still returned to the caller.
    pub recipient: Option<Recipient>,
    pub actor: ActorRef,
    pub occurred_at: DateTime<Utc>,
}
