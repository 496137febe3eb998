//! Notification dispatch.
//!
//! # Responsibility
//! - Turn a domain event into a rendered mail message and hand it to the
//!   transport.
//! - Swallow and log every rendering or transport fault.
//!
//! # Invariants
//! - `dispatch` never returns an error and never panics on transport
//!   failure; the triggering operation already committed.
//! - Events without a resolved recipient are skipped, not failed.

use crate::lifecycle::event::{DomainEvent, EventKind, EventPayload};
use crate::model::incident::IncidentState;
use crate::model::risk::RiskState;
use crate::notify::catalog::TemplateCatalog;
use crate::notify::template::{render, TemplateError};
use chrono::{DateTime, Utc};
use log::{info, warn};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Outbound mail message handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Opaque transport failure.
#[derive(Debug, Clone)]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Display for TransportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "mail transport failure: {}", self.message)
    }
}

impl Error for TransportError {}

/// Mail sending capability, injected at dispatcher construction.
///
/// Host, port and credentials are configuration of the implementation,
/// not of this core.
pub trait MailTransport: Send + Sync {
    fn send(&self, message: &MailMessage) -> Result<(), TransportError>;
}

/// Notification fault; logged with event context, never propagated.
#[derive(Debug)]
pub enum NotificationError {
    Template(TemplateError),
    Transport(TransportError),
}

impl Display for NotificationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Template(err) => write!(f, "{err}"),
            Self::Transport(err) => write!(f, "{err}"),
        }
    }
}

impl Error for NotificationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Template(err) => Some(err),
            Self::Transport(err) => Some(err),
        }
    }
}

impl From<TemplateError> for NotificationError {
    fn from(value: TemplateError) -> Self {
        Self::Template(value)
    }
}

impl From<TransportError> for NotificationError {
    fn from(value: TransportError) -> Self {
        Self::Transport(value)
    }
}

/// Maps a severity display label to its style class.
///
/// Exact, case-sensitive match; anything unrecognized is styled `low`.
pub fn severity_class(label: &str) -> &'static str {
    match label {
        "Crítica" => "critical",
        "Alta" => "high",
        "Media" => "medium",
        _ => "low",
    }
}

/// Renders and sends one mail per dispatched event, at most once.
pub struct NotificationDispatcher {
    transport: Arc<dyn MailTransport>,
    catalog: TemplateCatalog,
    sender: String,
}

impl NotificationDispatcher {
    /// Creates a dispatcher over an injected transport.
    ///
    /// `sender` is the `from` address stamped on every message.
    pub fn new(
        transport: Arc<dyn MailTransport>,
        catalog: TemplateCatalog,
        sender: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            catalog,
            sender: sender.into(),
        }
    }

    /// Dispatches one event; faults are logged and discarded.
    pub fn dispatch(&self, event: &DomainEvent) {
        let Some(recipient) = event.recipient.as_ref() else {
            warn!(
                "event=notification_skipped module=notify status=warn kind={} reason=no_recipient",
                event.kind.as_str()
            );
            return;
        };

        match self.try_dispatch(event, &recipient.email) {
            Ok(()) => info!(
                "event=notification_sent module=notify status=ok kind={}",
                event.kind.as_str()
            ),
            Err(err) => warn!(
                "event=notification_failed module=notify status=error kind={} error={err}",
                event.kind.as_str()
            ),
        }
    }

    fn try_dispatch(&self, event: &DomainEvent, to: &str) -> Result<(), NotificationError> {
        let (bindings, flags) = event_context(event);
        let html = render(self.catalog.template(event.kind), &bindings, &flags)?;
        let message = MailMessage {
            from: self.sender.clone(),
            to: to.to_string(),
            subject: subject_for(event),
            html,
        };
        self.transport.send(&message)?;
        Ok(())
    }
}

fn subject_for(event: &DomainEvent) -> String {
    match (&event.kind, &event.payload) {
        (EventKind::RiskCreated, EventPayload::Risk { risk, .. }) => {
            format!("Nuevo riesgo: {}", risk.title)
        }
        (EventKind::RiskStateChanged, EventPayload::Risk { risk, .. }) => {
            format!("Riesgo actualizado: {}", risk.title)
        }
        (EventKind::RiskMaterialized, EventPayload::Materialization { risk, .. }) => {
            format!("Riesgo materializado: {}", risk.title)
        }
        (EventKind::IncidentCreated, EventPayload::Incident { incident, .. }) => {
            format!("Nuevo incidente: {}", incident.title)
        }
        (EventKind::IncidentStateChanged, EventPayload::Incident { incident, .. }) => {
            format!("Incidente actualizado: {}", incident.title)
        }
        (EventKind::IncidentCancelled, EventPayload::Incident { incident, .. }) => {
            format!("Incidente cancelado: {}", incident.title)
        }
        (EventKind::UserRegistered, _) => "Bienvenida a la plataforma".to_string(),
        (EventKind::UserLoggedIn, _) => "Nuevo acceso a tu cuenta".to_string(),
        // Kind/payload mismatch cannot be built through the manager.
        _ => event.kind.as_str().to_string(),
    }
}

fn format_time(value: DateTime<Utc>) -> String {
    value.format("%d/%m/%Y %H:%M UTC").to_string()
}

fn bind(map: &mut BTreeMap<String, String>, key: &str, value: impl Into<String>) {
    map.insert(key.to_string(), value.into());
}

fn flag(map: &mut BTreeMap<String, bool>, key: &str, value: bool) {
    map.insert(key.to_string(), value);
}

/// Builds the binding/flag context a template sees for one event.
fn event_context(event: &DomainEvent) -> (BTreeMap<String, String>, BTreeMap<String, bool>) {
    let mut bindings = BTreeMap::new();
    let mut flags = BTreeMap::new();

    let recipient_name = event
        .recipient
        .as_ref()
        .map(|recipient| recipient.name.clone())
        .unwrap_or_default();
    let when = format_time(event.occurred_at);

    match &event.payload {
        EventPayload::Risk {
            risk,
            previous_state,
        } => {
            bind(&mut bindings, "riskName", &risk.title);
            bind(&mut bindings, "category", &risk.category);
            bind(&mut bindings, "impactLevel", risk.impact.label());
            bind(&mut bindings, "probability", risk.probability.label());
            bind(&mut bindings, "severityClass", severity_class(risk.impact.label()));
            bind(&mut bindings, "responsibleName", recipient_name);
            bind(&mut bindings, "newState", risk.state.label());
            bind(
                &mut bindings,
                "previousState",
                previous_state.map(|state| state.label()).unwrap_or(""),
            );
            bind(
                &mut bindings,
                "mitigationMeasures",
                risk.mitigation_measures.as_deref().unwrap_or(""),
            );
            bind(&mut bindings, "createdBy", &event.actor.name);
            bind(&mut bindings, "changedBy", &event.actor.name);
            bind(&mut bindings, "creationTime", format_time(risk.created_at));
            bind(&mut bindings, "changeTime", when);
            flag(&mut flags, "hasProtocol", risk.protocol_id.is_some());
            flag(&mut flags, "wasMitigated", risk.state == RiskState::Mitigated);
            flag(&mut flags, "wasResolved", risk.state == RiskState::Resolved);
        }
        EventPayload::Materialization {
            risk,
            materialization,
        } => {
            bind(&mut bindings, "riskName", &risk.title);
            bind(&mut bindings, "responsibleName", recipient_name);
            bind(
                &mut bindings,
                "eventDescription",
                &materialization.event_description,
            );
            bind(
                &mut bindings,
                "severity",
                materialization.observed_severity.label(),
            );
            bind(
                &mut bindings,
                "severityClass",
                severity_class(materialization.observed_severity.label()),
            );
            bind(&mut bindings, "actionsTaken", &materialization.actions_taken);
            bind(&mut bindings, "reportedBy", &event.actor.name);
            bind(
                &mut bindings,
                "occurredAt",
                format_time(materialization.occurred_at),
            );
            flag(
                &mut flags,
                "hasProtocol",
                materialization.executed_protocol_id.is_some(),
            );
            flag(
                &mut flags,
                "hasIncident",
                materialization.generated_incident_id.is_some(),
            );
        }
        EventPayload::Incident {
            incident,
            previous_state,
        } => {
            bind(&mut bindings, "incidentTitle", &incident.title);
            bind(&mut bindings, "category", &incident.category);
            bind(&mut bindings, "severity", incident.severity.label());
            bind(
                &mut bindings,
                "severityClass",
                severity_class(incident.severity.label()),
            );
            bind(&mut bindings, "assigneeName", recipient_name);
            bind(&mut bindings, "newState", incident.state.label());
            bind(
                &mut bindings,
                "previousState",
                previous_state.map(|state| state.label()).unwrap_or(""),
            );
            bind(&mut bindings, "reportedBy", &event.actor.name);
            bind(&mut bindings, "changedBy", &event.actor.name);
            bind(&mut bindings, "cancelledBy", &event.actor.name);
            bind(&mut bindings, "resolvedBy", &event.actor.name);
            bind(
                &mut bindings,
                "reportedAt",
                format_time(incident.reported_at),
            );
            bind(&mut bindings, "changeTime", when);
            bind(
                &mut bindings,
                "cancellationReason",
                incident.cancellation_reason.as_deref().unwrap_or(""),
            );
            flag(&mut flags, "hasRisk", incident.risk_id.is_some());
            flag(&mut flags, "hasProtocol", incident.protocol_id.is_some());
            flag(&mut flags, "wasCancelled", incident.was_cancelled);
            flag(
                &mut flags,
                "wasResolved",
                incident.state == IncidentState::Resolved && !incident.was_cancelled,
            );
        }
        EventPayload::User { user } => {
            bind(&mut bindings, "userName", &user.full_name);
            bind(&mut bindings, "userEmail", &user.email);
            bind(&mut bindings, "userRole", user.role.label());
            bind(&mut bindings, "registeredAt", when.clone());
            bind(&mut bindings, "loginTime", when);
        }
    }

    (bindings, flags)
}
