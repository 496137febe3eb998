//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `riskdesk_core` wiring.
//! - Run one create/resolve cycle against the in-memory store with a
//!   console transport standing in for SMTP.

use riskdesk_core::{
    CreateIncident, IncidentTransition, LifecycleManager, MailMessage, MailTransport,
    MemoryStore, Notifier, NotificationDispatcher, RegisterUser, Role, Severity,
    TemplateCatalog, TransportError,
};
use std::sync::Arc;

struct ConsoleTransport;

impl MailTransport for ConsoleTransport {
    fn send(&self, message: &MailMessage) -> Result<(), TransportError> {
        println!("mail to={} subject={}", message.to, message.subject);
        Ok(())
    }
}

fn main() {
    println!("riskdesk_core version={}", riskdesk_core::core_version());

    let manager = LifecycleManager::new(MemoryStore::new());
    let dispatcher = NotificationDispatcher::new(
        Arc::new(ConsoleTransport),
        TemplateCatalog::builtin(),
        "noreply@riskdesk.local",
    );
    let notifier = match Notifier::spawn(dispatcher) {
        Ok(notifier) => notifier,
        Err(err) => {
            eprintln!("cannot start notification worker: {err}");
            return;
        }
    };

    let result = (|| {
        let (admin, registered) = manager.register_user(RegisterUser {
            full_name: "Ana Torres".to_string(),
            email: "ana@example.com".to_string(),
            role: Role::Administrator,
        })?;
        notifier.notify(registered);

        let (incident, created) = manager.create_incident(
            CreateIncident {
                title: "Caída del servicio de correo".to_string(),
                description: "El servidor SMTP no responde".to_string(),
                category: "Infraestructura".to_string(),
                severity: Severity::Critical,
                assignee_id: admin.id,
                risk_id: None,
                protocol_id: None,
            },
            admin.id,
        )?;
        notifier.notify(created);

        let (incident, started) =
            manager.transition_incident(incident.id, IncidentTransition::Start, admin.id)?;
        notifier.notify(started);

        let (incident, resolved) =
            manager.transition_incident(incident.id, IncidentTransition::Resolve, admin.id)?;
        notifier.notify(resolved);

        println!("incident state={}", incident.state.label());
        Ok::<(), riskdesk_core::LifecycleError>(())
    })();

    notifier.shutdown();

    if let Err(err) = result {
        eprintln!("smoke run failed: {err}");
        std::process::exit(1);
    }
}
