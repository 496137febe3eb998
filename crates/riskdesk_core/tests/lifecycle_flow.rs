use riskdesk_core::{
    CreateIncident, CreateRisk, EntityStore, EventKind, ExecutionProgress, ExecutionTransition,
    IncidentState, IncidentTransition, LifecycleError, LifecycleManager, MaterializationState,
    MaterializationTransition, MaterializeRisk, MemoryStore, Probability, Protocol,
    ProtocolStep, RegisterUser, RiskState, RiskTransition, Role, Severity, StartExecution,
    StoreError, StoreResult, UpdateDetails, User, ValidationError,
};
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

fn manager() -> LifecycleManager<MemoryStore> {
    LifecycleManager::new(MemoryStore::new())
}

fn seed_user(manager: &LifecycleManager<MemoryStore>, name: &str, email: &str) -> User {
    let (user, _event) = manager
        .register_user(RegisterUser {
            full_name: name.to_string(),
            email: email.to_string(),
            role: Role::Administrator,
        })
        .unwrap();
    user
}

fn risk_input(responsible: &User) -> CreateRisk {
    CreateRisk {
        title: "Corte de energía".to_string(),
        description: "Pérdida de suministro en el CPD".to_string(),
        category: "Infraestructura".to_string(),
        impact: Severity::High,
        probability: Probability::Medium,
        responsible_id: responsible.id,
        protocol_id: None,
    }
}

fn incident_input(assignee: &User) -> CreateIncident {
    CreateIncident {
        title: "Caída del portal".to_string(),
        description: "El portal devuelve error 500".to_string(),
        category: "Aplicaciones".to_string(),
        severity: Severity::Critical,
        assignee_id: assignee.id,
        risk_id: None,
        protocol_id: None,
    }
}

fn seed_protocol(manager: &LifecycleManager<MemoryStore>, publisher: &User) -> Protocol {
    let protocol = Protocol {
        id: Uuid::new_v4(),
        name: "Recuperación del portal".to_string(),
        description: "Pasos de restauración del servicio".to_string(),
        category: "Aplicaciones".to_string(),
        severity: Severity::High,
        estimated_minutes: 60,
        steps: {
            let mut diagnostico = ProtocolStep::new("Diagnóstico", "Revisar registros y métricas");
            diagnostico.tasks = vec![
                "Revisar registros de aplicación".to_string(),
                "Comprobar métricas de carga".to_string(),
            ];
            vec![
                diagnostico,
                ProtocolStep::new("Restauración", "Reiniciar servicios afectados"),
            ]
        },
        publisher_id: publisher.id,
        active: true,
    };
    manager.publish_protocol(&protocol).unwrap();
    protocol
}

#[test]
fn risk_reaches_resolved_through_mitigation() {
    let manager = manager();
    let actor = seed_user(&manager, "Ana Torres", "ana@example.com");
    let responsible = seed_user(&manager, "Luis Mora", "luis@example.com");

    let (risk, created) = manager.create_risk(risk_input(&responsible), actor.id).unwrap();
    assert_eq!(risk.state, RiskState::Active);
    assert_eq!(created.kind, EventKind::RiskCreated);
    assert_eq!(created.recipient.unwrap().email, "luis@example.com");

    let (risk, changed) = manager
        .transition_risk(
            risk.id,
            RiskTransition::Mitigate {
                measures: "Grupo electrógeno instalado".to_string(),
            },
            actor.id,
        )
        .unwrap();
    assert_eq!(risk.state, RiskState::Mitigated);
    assert_eq!(
        risk.mitigation_measures.as_deref(),
        Some("Grupo electrógeno instalado")
    );
    assert_eq!(changed.kind, EventKind::RiskStateChanged);

    let (risk, _event) = manager
        .transition_risk(risk.id, RiskTransition::Resolve, actor.id)
        .unwrap();
    assert_eq!(risk.state, RiskState::Resolved);
}

#[test]
fn resolved_risk_rejects_every_further_transition() {
    let manager = manager();
    let actor = seed_user(&manager, "Ana Torres", "ana@example.com");
    let (risk, _) = manager.create_risk(risk_input(&actor), actor.id).unwrap();
    manager
        .transition_risk(risk.id, RiskTransition::Resolve, actor.id)
        .unwrap();

    for attempt in [
        RiskTransition::Resolve,
        RiskTransition::Mitigate {
            measures: "tarde".to_string(),
        },
    ] {
        let err = manager
            .transition_risk(risk.id, attempt, actor.id)
            .unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::Validation(ValidationError::InvalidTransition { .. })
        ));
    }

    let stored = manager.store().get_risk(risk.id).unwrap().unwrap();
    assert_eq!(stored.state, RiskState::Resolved);
}

#[test]
fn active_risk_can_be_abandoned_directly() {
    let manager = manager();
    let actor = seed_user(&manager, "Ana Torres", "ana@example.com");
    let (risk, _) = manager.create_risk(risk_input(&actor), actor.id).unwrap();

    let (risk, event) = manager
        .transition_risk(risk.id, RiskTransition::Resolve, actor.id)
        .unwrap();
    assert_eq!(risk.state, RiskState::Resolved);
    assert_eq!(event.kind, EventKind::RiskStateChanged);
}

#[test]
fn risk_creation_validates_fields_and_references() {
    let manager = manager();
    let actor = seed_user(&manager, "Ana Torres", "ana@example.com");

    let mut blank = risk_input(&actor);
    blank.category = "  ".to_string();
    assert!(matches!(
        manager.create_risk(blank, actor.id),
        Err(LifecycleError::Validation(ValidationError::MissingField {
            field: "category",
            ..
        }))
    ));

    let mut unknown = risk_input(&actor);
    unknown.responsible_id = Uuid::new_v4();
    assert!(matches!(
        manager.create_risk(unknown, actor.id),
        Err(LifecycleError::NotFound { .. })
    ));

    let retired = seed_user(&manager, "Baja Temporal", "baja@example.com");
    manager.deactivate_user(retired.id).unwrap();
    assert!(matches!(
        manager.create_risk(risk_input(&retired), actor.id),
        Err(LifecycleError::InactiveReference { .. })
    ));
}

#[test]
fn mitigation_requires_recorded_measures() {
    let manager = manager();
    let actor = seed_user(&manager, "Ana Torres", "ana@example.com");
    let (risk, _) = manager.create_risk(risk_input(&actor), actor.id).unwrap();

    let err = manager
        .transition_risk(
            risk.id,
            RiskTransition::Mitigate {
                measures: "   ".to_string(),
            },
            actor.id,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        LifecycleError::Validation(ValidationError::MissingField {
            field: "measures",
            ..
        })
    ));
}

#[test]
fn materialization_leaves_the_risk_state_untouched() {
    let manager = manager();
    let actor = seed_user(&manager, "Ana Torres", "ana@example.com");
    let (risk, _) = manager.create_risk(risk_input(&actor), actor.id).unwrap();

    let (materialization, event) = manager
        .materialize_risk(
            risk.id,
            MaterializeRisk {
                event_description: "Corte real de suministro".to_string(),
                observed_severity: Severity::Critical,
                actions_taken: "Conmutación al generador".to_string(),
                executed_protocol_id: None,
                generated_incident_id: None,
            },
            actor.id,
        )
        .unwrap();

    assert_eq!(materialization.state, MaterializationState::Active);
    assert_eq!(materialization.reported_by, actor.id);
    assert_eq!(event.kind, EventKind::RiskMaterialized);

    let stored = manager.store().get_risk(risk.id).unwrap().unwrap();
    assert_eq!(stored.state, RiskState::Active);
}

#[test]
fn only_active_risks_can_materialize() {
    let manager = manager();
    let actor = seed_user(&manager, "Ana Torres", "ana@example.com");
    let (risk, _) = manager.create_risk(risk_input(&actor), actor.id).unwrap();
    manager
        .transition_risk(risk.id, RiskTransition::Resolve, actor.id)
        .unwrap();

    let err = manager
        .materialize_risk(
            risk.id,
            MaterializeRisk {
                event_description: "Demasiado tarde".to_string(),
                observed_severity: Severity::Low,
                actions_taken: "Ninguna".to_string(),
                executed_protocol_id: None,
                generated_incident_id: None,
            },
            actor.id,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        LifecycleError::Validation(ValidationError::RiskNotActive { .. })
    ));
}

#[test]
fn materialization_follow_up_flow_is_terminal_once_resolved() {
    let manager = manager();
    let actor = seed_user(&manager, "Ana Torres", "ana@example.com");
    let (risk, _) = manager.create_risk(risk_input(&actor), actor.id).unwrap();
    let (materialization, _) = manager
        .materialize_risk(
            risk.id,
            MaterializeRisk {
                event_description: "Corte real".to_string(),
                observed_severity: Severity::High,
                actions_taken: "Generador".to_string(),
                executed_protocol_id: None,
                generated_incident_id: None,
            },
            actor.id,
        )
        .unwrap();

    let followed = manager
        .transition_materialization(
            materialization.id,
            MaterializationTransition::FollowUp,
            actor.id,
        )
        .unwrap();
    assert_eq!(followed.state, MaterializationState::UnderFollowUp);

    let resolved = manager
        .transition_materialization(
            materialization.id,
            MaterializationTransition::Resolve,
            actor.id,
        )
        .unwrap();
    assert_eq!(resolved.state, MaterializationState::Resolved);
    assert_eq!(resolved.resolved_by, Some(actor.id));

    let err = manager
        .transition_materialization(
            materialization.id,
            MaterializationTransition::FollowUp,
            actor.id,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        LifecycleError::Validation(ValidationError::InvalidTransition { .. })
    ));
}

#[test]
fn incident_remediation_path_records_resolution() {
    let manager = manager();
    let reporter = seed_user(&manager, "Ana Torres", "ana@example.com");
    let assignee = seed_user(&manager, "Luis Mora", "luis@example.com");

    let (incident, created) = manager
        .create_incident(incident_input(&assignee), reporter.id)
        .unwrap();
    assert_eq!(incident.state, IncidentState::Pending);
    assert_eq!(created.kind, EventKind::IncidentCreated);

    let (incident, started) = manager
        .transition_incident(incident.id, IncidentTransition::Start, assignee.id)
        .unwrap();
    assert_eq!(incident.state, IncidentState::InProgress);
    assert_eq!(started.kind, EventKind::IncidentStateChanged);

    let (incident, resolved) = manager
        .transition_incident(incident.id, IncidentTransition::Resolve, assignee.id)
        .unwrap();
    assert_eq!(incident.state, IncidentState::Resolved);
    assert!(!incident.was_cancelled);
    assert_eq!(incident.resolved_by, Some(assignee.id));
    assert!(incident.resolved_at.is_some());
    assert_eq!(resolved.kind, EventKind::IncidentStateChanged);
}

#[test]
fn incident_cancellation_needs_a_reason_and_pending_state() {
    let manager = manager();
    let reporter = seed_user(&manager, "Ana Torres", "ana@example.com");
    let assignee = seed_user(&manager, "Luis Mora", "luis@example.com");

    let (incident, _) = manager
        .create_incident(incident_input(&assignee), reporter.id)
        .unwrap();

    assert!(matches!(
        manager.transition_incident(
            incident.id,
            IncidentTransition::Cancel {
                reason: " ".to_string()
            },
            reporter.id,
        ),
        Err(LifecycleError::Validation(ValidationError::MissingField {
            field: "cancellation_reason",
            ..
        }))
    ));

    let (cancelled, event) = manager
        .transition_incident(
            incident.id,
            IncidentTransition::Cancel {
                reason: "Duplicado de otro incidente".to_string(),
            },
            reporter.id,
        )
        .unwrap();
    assert_eq!(cancelled.state, IncidentState::Resolved);
    assert!(cancelled.was_cancelled);
    assert_eq!(
        cancelled.cancellation_reason.as_deref(),
        Some("Duplicado de otro incidente")
    );
    assert_eq!(event.kind, EventKind::IncidentCancelled);

    // A second incident moved to InProgress can no longer be cancelled.
    let (second, _) = manager
        .create_incident(incident_input(&assignee), reporter.id)
        .unwrap();
    manager
        .transition_incident(second.id, IncidentTransition::Start, assignee.id)
        .unwrap();
    assert!(matches!(
        manager.transition_incident(
            second.id,
            IncidentTransition::Cancel {
                reason: "tarde".to_string()
            },
            reporter.id,
        ),
        Err(LifecycleError::Validation(
            ValidationError::InvalidTransition { .. }
        ))
    ));
}

#[test]
fn pending_incident_cannot_resolve_without_cancelling() {
    let manager = manager();
    let reporter = seed_user(&manager, "Ana Torres", "ana@example.com");
    let (incident, _) = manager
        .create_incident(incident_input(&reporter), reporter.id)
        .unwrap();

    assert!(matches!(
        manager.transition_incident(incident.id, IncidentTransition::Resolve, reporter.id),
        Err(LifecycleError::Validation(
            ValidationError::InvalidTransition { .. }
        ))
    ));
}

#[test]
fn execution_completion_demands_full_progress_and_steps() {
    let manager = manager();
    let actor = seed_user(&manager, "Ana Torres", "ana@example.com");
    let protocol = seed_protocol(&manager, &actor);
    let (incident, _) = manager
        .create_incident(incident_input(&actor), actor.id)
        .unwrap();

    let execution = manager
        .start_execution(
            StartExecution {
                protocol_id: protocol.id,
                incident_id: incident.id,
            },
            actor.id,
        )
        .unwrap();
    assert_eq!(execution.progress, 0);

    let all_steps: Vec<_> = protocol.steps.iter().map(|step| step.id).collect();

    // Partial progress cannot complete.
    manager
        .report_execution_progress(
            execution.id,
            ExecutionProgress {
                progress: 80,
                completed_steps: vec![all_steps[0]],
            },
            actor.id,
        )
        .unwrap();
    assert!(matches!(
        manager.transition_execution(execution.id, ExecutionTransition::Complete, actor.id),
        Err(LifecycleError::Validation(
            ValidationError::IncompleteExecution { progress: 80, .. }
        ))
    ));

    // Out-of-range progress is an error, not a clamp.
    assert!(matches!(
        manager.report_execution_progress(
            execution.id,
            ExecutionProgress {
                progress: 120,
                completed_steps: all_steps.clone(),
            },
            actor.id,
        ),
        Err(LifecycleError::Validation(
            ValidationError::ProgressOutOfRange(120)
        ))
    ));

    // Steps the protocol never declared are rejected.
    assert!(matches!(
        manager.report_execution_progress(
            execution.id,
            ExecutionProgress {
                progress: 90,
                completed_steps: vec![Uuid::new_v4()],
            },
            actor.id,
        ),
        Err(LifecycleError::Validation(ValidationError::UndeclaredStep(_)))
    ));

    manager
        .report_execution_progress(
            execution.id,
            ExecutionProgress {
                progress: 100,
                completed_steps: all_steps,
            },
            actor.id,
        )
        .unwrap();
    let done = manager
        .transition_execution(execution.id, ExecutionTransition::Complete, actor.id)
        .unwrap();
    assert!(done.finished_at.is_some());

    // The finished run is recorded on the incident as a field edit.
    let incident = manager.mark_protocol_executed(incident.id).unwrap();
    assert!(incident.protocol_executed);
    assert_eq!(incident.state, IncidentState::Pending);

    // Terminal states are final.
    assert!(matches!(
        manager.transition_execution(execution.id, ExecutionTransition::Cancel, actor.id),
        Err(LifecycleError::Validation(
            ValidationError::InvalidTransition { .. }
        ))
    ));
}

#[test]
fn execution_can_cancel_at_any_progress() {
    let manager = manager();
    let actor = seed_user(&manager, "Ana Torres", "ana@example.com");
    let protocol = seed_protocol(&manager, &actor);
    let (incident, _) = manager
        .create_incident(incident_input(&actor), actor.id)
        .unwrap();

    let execution = manager
        .start_execution(
            StartExecution {
                protocol_id: protocol.id,
                incident_id: incident.id,
            },
            actor.id,
        )
        .unwrap();
    manager
        .report_execution_progress(
            execution.id,
            ExecutionProgress {
                progress: 40,
                completed_steps: vec![protocol.steps[0].id],
            },
            actor.id,
        )
        .unwrap();

    let cancelled = manager
        .transition_execution(execution.id, ExecutionTransition::Cancel, actor.id)
        .unwrap();
    assert_eq!(cancelled.progress, 40);
    assert!(cancelled.finished_at.is_some());
}

#[test]
fn transitions_touch_only_their_own_entity() {
    let manager = manager();
    let actor = seed_user(&manager, "Ana Torres", "ana@example.com");
    let (risk, _) = manager.create_risk(risk_input(&actor), actor.id).unwrap();
    let (incident, _) = manager
        .create_incident(incident_input(&actor), actor.id)
        .unwrap();

    manager
        .transition_incident(incident.id, IncidentTransition::Start, actor.id)
        .unwrap();

    let stored_risk = manager.store().get_risk(risk.id).unwrap().unwrap();
    assert_eq!(stored_risk, risk);
}

#[test]
fn detail_edits_do_not_count_as_transitions() {
    let manager = manager();
    let actor = seed_user(&manager, "Ana Torres", "ana@example.com");
    let (risk, _) = manager.create_risk(risk_input(&actor), actor.id).unwrap();

    let edited = manager
        .update_risk_details(
            risk.id,
            UpdateDetails {
                category: Some("Continuidad".to_string()),
                ..UpdateDetails::default()
            },
        )
        .unwrap();
    assert_eq!(edited.category, "Continuidad");
    assert_eq!(edited.state, RiskState::Active);
}

#[test]
fn retired_risk_rejects_transitions() {
    let manager = manager();
    let actor = seed_user(&manager, "Ana Torres", "ana@example.com");
    let (risk, _) = manager.create_risk(risk_input(&actor), actor.id).unwrap();

    let retired = manager.retire_risk(risk.id).unwrap();
    assert!(!retired.active);

    assert!(matches!(
        manager.transition_risk(risk.id, RiskTransition::Resolve, actor.id),
        Err(LifecycleError::InactiveReference { .. })
    ));
}

#[test]
fn login_event_targets_the_account_owner() {
    let manager = manager();
    let user = seed_user(&manager, "Ana Torres", "ana@example.com");

    let event = manager.record_login(user.id).unwrap();
    assert_eq!(event.kind, EventKind::UserLoggedIn);
    assert_eq!(event.recipient.unwrap().email, "ana@example.com");
}

// Store wrapper that can be switched into a failing mode, standing in
// for a broken relational backend.
struct FlakyStore {
    inner: MemoryStore,
    fail_writes: AtomicBool,
}

impl FlakyStore {
    fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            fail_writes: AtomicBool::new(false),
        }
    }

    fn check(&self) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("disk full".to_string()));
        }
        Ok(())
    }
}

impl EntityStore for FlakyStore {
    fn create_user(&self, user: &riskdesk_core::User) -> StoreResult<()> {
        self.check()?;
        self.inner.create_user(user)
    }
    fn get_user(&self, id: riskdesk_core::UserId) -> StoreResult<Option<riskdesk_core::User>> {
        self.inner.get_user(id)
    }
    fn update_user(&self, user: &riskdesk_core::User) -> StoreResult<()> {
        self.check()?;
        self.inner.update_user(user)
    }
    fn create_risk(&self, risk: &riskdesk_core::Risk) -> StoreResult<()> {
        self.check()?;
        self.inner.create_risk(risk)
    }
    fn get_risk(&self, id: riskdesk_core::RiskId) -> StoreResult<Option<riskdesk_core::Risk>> {
        self.inner.get_risk(id)
    }
    fn update_risk(&self, risk: &riskdesk_core::Risk) -> StoreResult<()> {
        self.check()?;
        self.inner.update_risk(risk)
    }
    fn create_incident(&self, incident: &riskdesk_core::Incident) -> StoreResult<()> {
        self.check()?;
        self.inner.create_incident(incident)
    }
    fn get_incident(
        &self,
        id: riskdesk_core::IncidentId,
    ) -> StoreResult<Option<riskdesk_core::Incident>> {
        self.inner.get_incident(id)
    }
    fn update_incident(&self, incident: &riskdesk_core::Incident) -> StoreResult<()> {
        self.check()?;
        self.inner.update_incident(incident)
    }
    fn create_protocol(&self, protocol: &Protocol) -> StoreResult<()> {
        self.check()?;
        self.inner.create_protocol(protocol)
    }
    fn get_protocol(&self, id: riskdesk_core::ProtocolId) -> StoreResult<Option<Protocol>> {
        self.inner.get_protocol(id)
    }
    fn update_protocol(&self, protocol: &Protocol) -> StoreResult<()> {
        self.check()?;
        self.inner.update_protocol(protocol)
    }
    fn create_execution(&self, execution: &riskdesk_core::ProtocolExecution) -> StoreResult<()> {
        self.check()?;
        self.inner.create_execution(execution)
    }
    fn get_execution(
        &self,
        id: riskdesk_core::ExecutionId,
    ) -> StoreResult<Option<riskdesk_core::ProtocolExecution>> {
        self.inner.get_execution(id)
    }
    fn update_execution(&self, execution: &riskdesk_core::ProtocolExecution) -> StoreResult<()> {
        self.check()?;
        self.inner.update_execution(execution)
    }
    fn create_materialization(
        &self,
        materialization: &riskdesk_core::RiskMaterialization,
    ) -> StoreResult<()> {
        self.check()?;
        self.inner.create_materialization(materialization)
    }
    fn get_materialization(
        &self,
        id: riskdesk_core::MaterializationId,
    ) -> StoreResult<Option<riskdesk_core::RiskMaterialization>> {
        self.inner.get_materialization(id)
    }
    fn update_materialization(
        &self,
        materialization: &riskdesk_core::RiskMaterialization,
    ) -> StoreResult<()> {
        self.check()?;
        self.inner.update_materialization(materialization)
    }
}

#[test]
fn persistence_failure_aborts_the_whole_transition() {
    let manager = LifecycleManager::new(FlakyStore::new());
    let (actor, _) = manager
        .register_user(RegisterUser {
            full_name: "Ana Torres".to_string(),
            email: "ana@example.com".to_string(),
            role: Role::Administrator,
        })
        .unwrap();
    let (incident, _) = manager
        .create_incident(incident_input(&actor), actor.id)
        .unwrap();

    manager.store().fail_writes.store(true, Ordering::SeqCst);
    let err = manager
        .transition_incident(incident.id, IncidentTransition::Start, actor.id)
        .unwrap_err();
    assert!(matches!(err, LifecycleError::Store(StoreError::Backend(_))));

    manager.store().fail_writes.store(false, Ordering::SeqCst);
    let stored = manager
        .store()
        .get_incident(incident.id)
        .unwrap()
        .unwrap();
    assert_eq!(stored.state, IncidentState::Pending);
}
