//! Lifecycle use-case orchestration.
//!
//! # Responsibility
//! - Apply validated state transitions against the entity store.
//! - Build one domain event per committed change, with the resolved
//!   notification recipient.
//!
//! # Invariants
//! - Entity state is re-read from the store on every operation; nothing
//!   is cached across calls.
//! - Validation failures leave the store untouched.
//! - An unresolvable recipient downgrades the event to recipient-less
//!   and logs a warning; it never fails the operation.

use crate::lifecycle::event::{ActorRef, DomainEvent, EventKind, EventPayload, Recipient};
use crate::lifecycle::request::{
    CreateIncident, CreateRisk, ExecutionProgress, ExecutionTransition, IncidentTransition,
    MaterializationTransition, MaterializeRisk, RegisterUser, RiskTransition, StartExecution,
    UpdateDetails,
};
use crate::lifecycle::{LifecycleError, LifecycleResult, ValidationError};
use crate::model::incident::{Incident, IncidentId, IncidentState};
use crate::model::materialization::{
    MaterializationId, MaterializationState, RiskMaterialization,
};
use crate::model::protocol::{ExecutionId, ExecutionState, Protocol, ProtocolExecution, ProtocolId};
use crate::model::risk::{Risk, RiskId, RiskState};
use crate::model::user::{User, UserId};
use crate::store::{EntityKind, EntityStore};
use chrono::Utc;
use log::{info, warn};
use uuid::Uuid;

/// Owns the state machines for risks, incidents and protocol executions.
///
/// Holds no persistent entity copies; only transient in-flight
/// representations during a transition.
pub struct LifecycleManager<S: EntityStore> {
    store: S,
}

impl<S: EntityStore> LifecycleManager<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Read access to the underlying store seam.
    pub fn store(&self) -> &S {
        &self.store
    }

    // ---- users -----------------------------------------------------------

    /// Registers a user account and emits `UserRegistered`.
    pub fn register_user(&self, input: RegisterUser) -> LifecycleResult<(User, DomainEvent)> {
        input.validate()?;

        let user = User::new(
            input.full_name.trim(),
            input.email.trim(),
            input.role,
        );
        self.store.create_user(&user)?;
        info!(
            "event=user_registered module=lifecycle status=ok user_id={}",
            user.id
        );

        let event = self.event(
            EventKind::UserRegistered,
            EventPayload::User { user: user.clone() },
            self.recipient_of(&user, EventKind::UserRegistered),
            ActorRef::of(&user),
        );
        Ok((user, event))
    }

    /// Emits `UserLoggedIn` for an existing active account.
    ///
    /// Session handling lives outside this core; only the notification
    /// side of a login is modeled here.
    pub fn record_login(&self, user_id: UserId) -> LifecycleResult<DomainEvent> {
        let user = self.require_user(user_id)?;
        info!(
            "event=user_login module=lifecycle status=ok user_id={}",
            user.id
        );
        Ok(self.event(
            EventKind::UserLoggedIn,
            EventPayload::User { user: user.clone() },
            self.recipient_of(&user, EventKind::UserLoggedIn),
            ActorRef::of(&user),
        ))
    }

    /// Softly deletes a user account. No notification.
    pub fn deactivate_user(&self, id: UserId) -> LifecycleResult<User> {
        let mut user = self.require_user(id)?;
        user.deactivate();
        self.store.update_user(&user)?;
        info!(
            "event=user_deactivated module=lifecycle status=ok user_id={id}"
        );
        Ok(user)
    }

    // ---- protocols -------------------------------------------------------

    /// Publishes a remediation protocol. No notification.
    pub fn publish_protocol(&self, protocol: &Protocol) -> LifecycleResult<()> {
        if protocol.name.trim().is_empty() {
            return Err(ValidationError::MissingField {
                entity: "protocol",
                field: "name",
            }
            .into());
        }
        self.require_user(protocol.publisher_id)?;
        self.store.create_protocol(protocol)?;
        info!(
            "event=protocol_published module=lifecycle status=ok protocol_id={} steps={}",
            protocol.id,
            protocol.steps.len()
        );
        Ok(())
    }

    /// Softly deletes a protocol, preserving historical linkage.
    pub fn withdraw_protocol(&self, id: ProtocolId) -> LifecycleResult<Protocol> {
        let mut protocol = self.require_protocol(id)?;
        protocol.soft_delete();
        self.store.update_protocol(&protocol)?;
        info!(
            "event=protocol_withdrawn module=lifecycle status=ok protocol_id={id}"
        );
        Ok(protocol)
    }

    // ---- risks -----------------------------------------------------------

    /// Creates a risk in `Active` state and emits `RiskCreated`.
    pub fn create_risk(
        &self,
        input: CreateRisk,
        actor_id: UserId,
    ) -> LifecycleResult<(Risk, DomainEvent)> {
        input.validate()?;
        let actor = self.require_user(actor_id)?;
        let responsible = self.require_user(input.responsible_id)?;
        if let Some(protocol_id) = input.protocol_id {
            self.require_protocol(protocol_id)?;
        }

        let risk = Risk {
            id: Uuid::new_v4(),
            title: input.title,
            description: input.description,
            category: input.category,
            impact: input.impact,
            probability: input.probability,
            state: RiskState::Active,
            responsible_id: responsible.id,
            protocol_id: input.protocol_id,
            mitigation_measures: None,
            created_at: Utc::now(),
            active: true,
        };
        self.store.create_risk(&risk)?;
        info!(
            "event=risk_created module=lifecycle status=ok risk_id={} impact={} actor_id={}",
            risk.id,
            risk.impact.label(),
            actor.id
        );

        let event = self.event(
            EventKind::RiskCreated,
            EventPayload::Risk {
                risk: risk.clone(),
                previous_state: None,
            },
            self.recipient_of(&responsible, EventKind::RiskCreated),
            ActorRef::of(&actor),
        );
        Ok((risk, event))
    }

    /// Applies a risk state transition and emits `RiskStateChanged`.
    pub fn transition_risk(
        &self,
        id: RiskId,
        input: RiskTransition,
        actor_id: UserId,
    ) -> LifecycleResult<(Risk, DomainEvent)> {
        input.validate()?;
        let actor = self.require_user(actor_id)?;
        let mut risk = self.require_risk(id)?;

        let previous = risk.state;
        let target = match &input {
            RiskTransition::Mitigate { .. } => RiskState::Mitigated,
            RiskTransition::Resolve => RiskState::Resolved,
        };
        if !previous.allows(target) {
            return Err(ValidationError::InvalidTransition {
                entity: "risk",
                from: previous.label(),
                to: target.label(),
            }
            .into());
        }

        if let RiskTransition::Mitigate { measures } = input {
            risk.mitigation_measures = Some(measures);
        }
        risk.state = target;
        self.store.update_risk(&risk)?;
        info!(
            "event=risk_transition module=lifecycle status=ok risk_id={id} from={} to={} actor_id={}",
            previous.label(),
            target.label(),
            actor.id
        );

        let recipient = self.resolve_recipient(risk.responsible_id, EventKind::RiskStateChanged)?;
        let event = self.event(
            EventKind::RiskStateChanged,
            EventPayload::Risk {
                risk: risk.clone(),
                previous_state: Some(previous),
            },
            recipient,
            ActorRef::of(&actor),
        );
        Ok((risk, event))
    }

    /// Direct field edit; not a transition, triggers no notification.
    pub fn update_risk_details(
        &self,
        id: RiskId,
        input: UpdateDetails,
    ) -> LifecycleResult<Risk> {
        input.validate("risk")?;
        let mut risk = self.require_risk(id)?;
        apply_details(
            &mut risk.title,
            &mut risk.description,
            &mut risk.category,
            input,
        );
        self.store.update_risk(&risk)?;
        Ok(risk)
    }

    /// Softly deletes a risk, preserving materialization linkage.
    pub fn retire_risk(&self, id: RiskId) -> LifecycleResult<Risk> {
        let mut risk = self.require_risk(id)?;
        risk.soft_delete();
        self.store.update_risk(&risk)?;
        info!("event=risk_retired module=lifecycle status=ok risk_id={id}");
        Ok(risk)
    }

    /// Records that a risk actually occurred and emits `RiskMaterialized`.
    ///
    /// The risk itself stays `Active`; follow-up happens on the returned
    /// materialization record.
    pub fn materialize_risk(
        &self,
        risk_id: RiskId,
        input: MaterializeRisk,
        actor_id: UserId,
    ) -> LifecycleResult<(RiskMaterialization, DomainEvent)> {
        input.validate()?;
        let actor = self.require_user(actor_id)?;
        let risk = self.require_risk(risk_id)?;
        if risk.state != RiskState::Active {
            return Err(ValidationError::RiskNotActive {
                state: risk.state.label(),
            }
            .into());
        }
        if let Some(protocol_id) = input.executed_protocol_id {
            self.require_known_protocol(protocol_id)?;
        }
        if let Some(incident_id) = input.generated_incident_id {
            self.require_incident(incident_id)?;
        }

        let materialization = RiskMaterialization {
            id: Uuid::new_v4(),
            risk_id,
            occurred_at: Utc::now(),
            event_description: input.event_description,
            observed_severity: input.observed_severity,
            actions_taken: input.actions_taken,
            executed_protocol_id: input.executed_protocol_id,
            generated_incident_id: input.generated_incident_id,
            state: MaterializationState::Active,
            reported_by: actor.id,
            resolved_by: None,
        };
        self.store.create_materialization(&materialization)?;
        info!(
            "event=risk_materialized module=lifecycle status=ok risk_id={risk_id} materialization_id={} severity={}",
            materialization.id,
            materialization.observed_severity.label()
        );

        let recipient = self.resolve_recipient(risk.responsible_id, EventKind::RiskMaterialized)?;
        let event = self.event(
            EventKind::RiskMaterialized,
            EventPayload::Materialization {
                risk,
                materialization: materialization.clone(),
            },
            recipient,
            ActorRef::of(&actor),
        );
        Ok((materialization, event))
    }

    /// Moves a materialization through its follow-up flow. No notification.
    pub fn transition_materialization(
        &self,
        id: MaterializationId,
        input: MaterializationTransition,
        actor_id: UserId,
    ) -> LifecycleResult<RiskMaterialization> {
        let actor = self.require_user(actor_id)?;
        let mut materialization = self
            .store
            .get_materialization(id)?
            .ok_or(LifecycleError::NotFound {
                kind: EntityKind::Materialization,
                id,
            })?;

        let target = match input {
            MaterializationTransition::FollowUp => MaterializationState::UnderFollowUp,
            MaterializationTransition::Resolve => MaterializationState::Resolved,
        };
        if !materialization.state.allows(target) {
            return Err(ValidationError::InvalidTransition {
                entity: "materialization",
                from: materialization.state.label(),
                to: target.label(),
            }
            .into());
        }

        materialization.state = target;
        if target == MaterializationState::Resolved {
            materialization.resolved_by = Some(actor.id);
        }
        self.store.update_materialization(&materialization)?;
        info!(
            "event=materialization_transition module=lifecycle status=ok materialization_id={id} to={}",
            target.label()
        );
        Ok(materialization)
    }

    // ---- incidents -------------------------------------------------------

    /// Creates an incident in `Pending` state and emits `IncidentCreated`.
    pub fn create_incident(
        &self,
        input: CreateIncident,
        actor_id: UserId,
    ) -> LifecycleResult<(Incident, DomainEvent)> {
        input.validate()?;
        let actor = self.require_user(actor_id)?;
        let assignee = self.require_user(input.assignee_id)?;
        if let Some(risk_id) = input.risk_id {
            self.require_known_risk(risk_id)?;
        }
        if let Some(protocol_id) = input.protocol_id {
            self.require_known_protocol(protocol_id)?;
        }

        let incident = Incident {
            id: Uuid::new_v4(),
            title: input.title,
            description: input.description,
            category: input.category,
            severity: input.severity,
            state: IncidentState::Pending,
            reported_at: Utc::now(),
            resolved_at: None,
            assignee_id: assignee.id,
            risk_id: input.risk_id,
            protocol_id: input.protocol_id,
            protocol_executed: false,
            was_cancelled: false,
            cancellation_reason: None,
            resolved_by: None,
        };
        self.store.create_incident(&incident)?;
        info!(
            "event=incident_created module=lifecycle status=ok incident_id={} severity={} actor_id={}",
            incident.id,
            incident.severity.label(),
            actor.id
        );

        let event = self.event(
            EventKind::IncidentCreated,
            EventPayload::Incident {
                incident: incident.clone(),
                previous_state: None,
            },
            self.recipient_of(&assignee, EventKind::IncidentCreated),
            ActorRef::of(&actor),
        );
        Ok((incident, event))
    }

    /// Applies an incident transition.
    ///
    /// Emits `IncidentStateChanged`, or `IncidentCancelled` for the
    /// close-without-remediation path.
    pub fn transition_incident(
        &self,
        id: IncidentId,
        input: IncidentTransition,
        actor_id: UserId,
    ) -> LifecycleResult<(Incident, DomainEvent)> {
        input.validate()?;
        let actor = self.require_user(actor_id)?;
        let mut incident =
            self.store
                .get_incident(id)?
                .ok_or(LifecycleError::NotFound {
                    kind: EntityKind::Incident,
                    id,
                })?;

        let previous = incident.state;
        let kind = match input {
            IncidentTransition::Start => {
                self.check_incident_move(previous, IncidentState::InProgress)?;
                incident.state = IncidentState::InProgress;
                EventKind::IncidentStateChanged
            }
            IncidentTransition::Resolve => {
                self.check_incident_move(previous, IncidentState::Resolved)?;
                incident.state = IncidentState::Resolved;
                incident.resolved_at = Some(Utc::now());
                incident.resolved_by = Some(actor.id);
                EventKind::IncidentStateChanged
            }
            IncidentTransition::Cancel { reason } => {
                // Cancellation is the only legal Pending -> Resolved jump.
                if previous != IncidentState::Pending {
                    return Err(ValidationError::InvalidTransition {
                        entity: "incident",
                        from: previous.label(),
                        to: IncidentState::Resolved.label(),
                    }
                    .into());
                }
                incident.state = IncidentState::Resolved;
                incident.was_cancelled = true;
                incident.cancellation_reason = Some(reason);
                incident.resolved_at = Some(Utc::now());
                incident.resolved_by = Some(actor.id);
                EventKind::IncidentCancelled
            }
        };

        self.store.update_incident(&incident)?;
        info!(
            "event=incident_transition module=lifecycle status=ok incident_id={id} from={} to={} cancelled={} actor_id={}",
            previous.label(),
            incident.state.label(),
            incident.was_cancelled,
            actor.id
        );

        let recipient = self.resolve_recipient(incident.assignee_id, kind)?;
        let event = self.event(
            kind,
            EventPayload::Incident {
                incident: incident.clone(),
                previous_state: Some(previous),
            },
            recipient,
            ActorRef::of(&actor),
        );
        Ok((incident, event))
    }

    /// Marks the linked protocol run as finished for this incident.
    ///
    /// Field edit, not a transition; triggers no notification.
    pub fn mark_protocol_executed(&self, id: IncidentId) -> LifecycleResult<Incident> {
        let mut incident =
            self.store
                .get_incident(id)?
                .ok_or(LifecycleError::NotFound {
                    kind: EntityKind::Incident,
                    id,
                })?;
        incident.protocol_executed = true;
        self.store.update_incident(&incident)?;
        info!(
            "event=incident_protocol_executed module=lifecycle status=ok incident_id={id}"
        );
        Ok(incident)
    }

    /// Direct field edit; not a transition, triggers no notification.
    pub fn update_incident_details(
        &self,
        id: IncidentId,
        input: UpdateDetails,
    ) -> LifecycleResult<Incident> {
        input.validate("incident")?;
        let mut incident =
            self.store
                .get_incident(id)?
                .ok_or(LifecycleError::NotFound {
                    kind: EntityKind::Incident,
                    id,
                })?;
        apply_details(
            &mut incident.title,
            &mut incident.description,
            &mut incident.category,
            input,
        );
        self.store.update_incident(&incident)?;
        Ok(incident)
    }

    // ---- protocol executions --------------------------------------------

    /// Starts a protocol run against an incident. No notification.
    pub fn start_execution(
        &self,
        input: StartExecution,
        actor_id: UserId,
    ) -> LifecycleResult<ProtocolExecution> {
        let actor = self.require_user(actor_id)?;
        let protocol = self.require_protocol(input.protocol_id)?;
        self.require_incident(input.incident_id)?;

        let execution = ProtocolExecution {
            id: Uuid::new_v4(),
            protocol_id: protocol.id,
            incident_id: input.incident_id,
            executor_id: actor.id,
            state: ExecutionState::InProgress,
            progress: 0,
            completed_steps: Default::default(),
            started_at: Utc::now(),
            finished_at: None,
        };
        self.store.create_execution(&execution)?;
        info!(
            "event=execution_started module=lifecycle status=ok execution_id={} protocol_id={} incident_id={}",
            execution.id, execution.protocol_id, execution.incident_id
        );
        Ok(execution)
    }

    /// Records progress on a running execution.
    ///
    /// Out-of-range progress and step identifiers not declared by the
    /// protocol are rejected, never silently adjusted.
    pub fn report_execution_progress(
        &self,
        id: ExecutionId,
        input: ExecutionProgress,
        actor_id: UserId,
    ) -> LifecycleResult<ProtocolExecution> {
        let actor = self.require_user(actor_id)?;
        let mut execution = self.require_execution(id)?;
        if execution.state != ExecutionState::InProgress {
            return Err(ValidationError::InvalidTransition {
                entity: "execution",
                from: execution.state.label(),
                to: ExecutionState::InProgress.label(),
            }
            .into());
        }
        if input.progress > 100 {
            return Err(ValidationError::ProgressOutOfRange(input.progress).into());
        }

        let protocol = self.require_known_protocol(execution.protocol_id)?;
        let declared = protocol.step_ids();
        for step_id in &input.completed_steps {
            if !declared.contains(step_id) {
                return Err(ValidationError::UndeclaredStep(*step_id).into());
            }
        }

        execution.progress = input.progress;
        execution.completed_steps = input.completed_steps.into_iter().collect();
        self.store.update_execution(&execution)?;
        info!(
            "event=execution_progress module=lifecycle status=ok execution_id={id} progress={} actor_id={}",
            execution.progress, actor.id
        );
        Ok(execution)
    }

    /// Ends a protocol run.
    ///
    /// `Complete` requires full progress and every declared step done;
    /// `Cancel` is accepted at any progress. Both are final.
    pub fn transition_execution(
        &self,
        id: ExecutionId,
        input: ExecutionTransition,
        actor_id: UserId,
    ) -> LifecycleResult<ProtocolExecution> {
        let actor = self.require_user(actor_id)?;
        let mut execution = self.require_execution(id)?;

        let target = match input {
            ExecutionTransition::Complete => ExecutionState::Completed,
            ExecutionTransition::Cancel => ExecutionState::Cancelled,
        };
        if !execution.state.allows(target) {
            return Err(ValidationError::InvalidTransition {
                entity: "execution",
                from: execution.state.label(),
                to: target.label(),
            }
            .into());
        }
        if target == ExecutionState::Completed {
            let protocol = self.require_known_protocol(execution.protocol_id)?;
            let missing = protocol
                .step_ids()
                .difference(&execution.completed_steps)
                .count();
            if execution.progress != 100 || missing > 0 {
                return Err(ValidationError::IncompleteExecution {
                    progress: execution.progress,
                    missing_steps: missing,
                }
                .into());
            }
        }

        execution.state = target;
        execution.finished_at = Some(Utc::now());
        self.store.update_execution(&execution)?;
        info!(
            "event=execution_transition module=lifecycle status=ok execution_id={id} to={} actor_id={}",
            target.label(),
            actor.id
        );
        Ok(execution)
    }

    // ---- helpers ---------------------------------------------------------

    fn require_user(&self, id: UserId) -> LifecycleResult<User> {
        let user = self.store.get_user(id)?.ok_or(LifecycleError::NotFound {
            kind: EntityKind::User,
            id,
        })?;
        if !user.active {
            return Err(LifecycleError::InactiveReference {
                kind: EntityKind::User,
                id,
            });
        }
        Ok(user)
    }

    fn require_risk(&self, id: RiskId) -> LifecycleResult<Risk> {
        let risk = self.require_known_risk(id)?;
        if !risk.active {
            return Err(LifecycleError::InactiveReference {
                kind: EntityKind::Risk,
                id,
            });
        }
        Ok(risk)
    }

    fn require_known_risk(&self, id: RiskId) -> LifecycleResult<Risk> {
        self.store.get_risk(id)?.ok_or(LifecycleError::NotFound {
            kind: EntityKind::Risk,
            id,
        })
    }

    fn require_protocol(&self, id: ProtocolId) -> LifecycleResult<Protocol> {
        let protocol = self.require_known_protocol(id)?;
        if !protocol.active {
            return Err(LifecycleError::InactiveReference {
                kind: EntityKind::Protocol,
                id,
            });
        }
        Ok(protocol)
    }

    /// Existence-only lookup used for historical links, where a withdrawn
    /// protocol is still a valid reference.
    fn require_known_protocol(&self, id: ProtocolId) -> LifecycleResult<Protocol> {
        self.store
            .get_protocol(id)?
            .ok_or(LifecycleError::NotFound {
                kind: EntityKind::Protocol,
                id,
            })
    }

    fn require_incident(&self, id: IncidentId) -> LifecycleResult<Incident> {
        self.store
            .get_incident(id)?
            .ok_or(LifecycleError::NotFound {
                kind: EntityKind::Incident,
                id,
            })
    }

    fn require_execution(&self, id: ExecutionId) -> LifecycleResult<ProtocolExecution> {
        self.store
            .get_execution(id)?
            .ok_or(LifecycleError::NotFound {
                kind: EntityKind::Execution,
                id,
            })
    }

    fn check_incident_move(
        &self,
        from: IncidentState,
        to: IncidentState,
    ) -> LifecycleResult<()> {
        if !from.allows(to) {
            return Err(ValidationError::InvalidTransition {
                entity: "incident",
                from: from.label(),
                to: to.label(),
            }
            .into());
        }
        Ok(())
    }

    /// Best-effort recipient lookup by user id, after the write committed.
    fn resolve_recipient(
        &self,
        user_id: UserId,
        kind: EventKind,
    ) -> LifecycleResult<Option<Recipient>> {
        let recipient = self
            .store
            .get_user(user_id)?
            .as_ref()
            .and_then(Recipient::for_user);
        if recipient.is_none() {
            warn!(
                "event=recipient_unresolved module=lifecycle status=warn kind={} user_id={user_id}",
                kind.as_str()
            );
        }
        Ok(recipient)
    }

    fn recipient_of(&self, user: &User, kind: EventKind) -> Option<Recipient> {
        let recipient = Recipient::for_user(user);
        if recipient.is_none() {
            warn!(
                "event=recipient_unresolved module=lifecycle status=warn kind={} user_id={}",
                kind.as_str(),
                user.id
            );
        }
        recipient
    }

    fn event(
        &self,
        kind: EventKind,
        payload: EventPayload,
        recipient: Option<Recipient>,
        actor: ActorRef,
    ) -> DomainEvent {
        DomainEvent {
            kind,
            payload,
            recipient,
            actor,
            occurred_at: Utc::now(),
        }
    }
}

fn apply_details(
    title: &mut String,
    description: &mut String,
    category: &mut String,
    input: UpdateDetails,
) {
    if let Some(value) = input.title {
        *title = value;
    }
    if let Some(value) = input.description {
        *description = value;
    }
    if let Some(value) = input.category {
        *category = value;
    }
}
