//! Core domain logic for RiskDesk.
//! This crate is the single source of truth for lifecycle invariants and
//! the best-effort notification pipeline built on top of them.

pub mod lifecycle;
pub mod logging;
pub mod model;
pub mod notify;
pub mod store;

pub use lifecycle::event::{ActorRef, DomainEvent, EventKind, EventPayload, Recipient};
pub use lifecycle::manager::LifecycleManager;
pub use lifecycle::request::{
    CreateIncident, CreateRisk, ExecutionProgress, ExecutionTransition, IncidentTransition,
    MaterializationTransition, MaterializeRisk, RegisterUser, RiskTransition, StartExecution,
    UpdateDetails,
};
pub use lifecycle::{LifecycleError, LifecycleResult, ValidationError};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::incident::{Incident, IncidentId, IncidentState};
pub use model::materialization::{MaterializationId, MaterializationState, RiskMaterialization};
pub use model::protocol::{
    ExecutionId, ExecutionState, Protocol, ProtocolExecution, ProtocolId, ProtocolStep, StepId,
};
pub use model::risk::{Risk, RiskId, RiskState};
pub use model::severity::{parse_probability, parse_severity, Probability, Severity};
pub use model::user::{Role, User, UserId};
pub use notify::catalog::{CatalogError, TemplateCatalog};
pub use notify::dispatcher::{
    severity_class, MailMessage, MailTransport, NotificationDispatcher, TransportError,
};
pub use notify::template::{render, RenderResult, TemplateError};
pub use notify::worker::Notifier;
pub use store::memory::MemoryStore;
pub use store::{EntityKind, EntityStore, StoreError, StoreResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
