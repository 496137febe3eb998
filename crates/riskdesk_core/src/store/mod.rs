//! Entity store contracts.
//!
//! # Responsibility
//! - Define the persistence seam the lifecycle core writes through.
//! - Keep storage details out of business orchestration.
//!
//! # Invariants
//! - Writes are atomic per entity; there are no partial writes.
//! - Soft delete flips an activation flag, rows are never removed.
//! - The core re-reads through this seam before validating a transition
//!   and never caches entity state across calls.

use crate::model::incident::{Incident, IncidentId};
use crate::model::materialization::{MaterializationId, RiskMaterialization};
use crate::model::protocol::{ExecutionId, Protocol, ProtocolExecution, ProtocolId};
use crate::model::risk::{Risk, RiskId};
use crate::model::user::{User, UserId};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod memory;

pub type StoreResult<T> = Result<T, StoreError>;

/// Entity kinds managed through the store seam.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    User,
    Risk,
    Incident,
    Protocol,
    Execution,
    Materialization,
}

impl EntityKind {
    /// Stable lowercase name used in errors and log lines.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Risk => "risk",
            Self::Incident => "incident",
            Self::Protocol => "protocol",
            Self::Execution => "execution",
            Self::Materialization => "materialization",
        }
    }
}

/// Persistence error surfaced by store implementations.
#[derive(Debug)]
pub enum StoreError {
    /// Write targeted a row that does not exist.
    NotFound { kind: EntityKind, id: Uuid },
    /// Create targeted an identifier that already exists.
    Duplicate { kind: EntityKind, id: Uuid },
    /// Backend failure; the write is considered not to have happened.
    Backend(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { kind, id } => write!(f, "{} not found: {id}", kind.as_str()),
            Self::Duplicate { kind, id } => {
                write!(f, "{} already exists: {id}", kind.as_str())
            }
            Self::Backend(message) => write!(f, "store backend failure: {message}"),
        }
    }
}

impl Error for StoreError {}

/// Durable storage seam for all lifecycle entities.
///
/// Implementations serialize writes per entity; the in-memory reference
/// implementation lives in [`memory`]. The relational implementation is
/// owned by the surrounding application.
pub trait EntityStore {
    fn create_user(&self, user: &User) -> StoreResult<()>;
    fn get_user(&self, id: UserId) -> StoreResult<Option<User>>;
    fn update_user(&self, user: &User) -> StoreResult<()>;

    fn create_risk(&self, risk: &Risk) -> StoreResult<()>;
    fn get_risk(&self, id: RiskId) -> StoreResult<Option<Risk>>;
    fn update_risk(&self, risk: &Risk) -> StoreResult<()>;

    fn create_incident(&self, incident: &Incident) -> StoreResult<()>;
    fn get_incident(&self, id: IncidentId) -> StoreResult<Option<Incident>>;
    fn update_incident(&self, incident: &Incident) -> StoreResult<()>;

    fn create_protocol(&self, protocol: &Protocol) -> StoreResult<()>;
    fn get_protocol(&self, id: ProtocolId) -> StoreResult<Option<Protocol>>;
    fn update_protocol(&self, protocol: &Protocol) -> StoreResult<()>;

    fn create_execution(&self, execution: &ProtocolExecution) -> StoreResult<()>;
    fn get_execution(&self, id: ExecutionId) -> StoreResult<Option<ProtocolExecution>>;
    fn update_execution(&self, execution: &ProtocolExecution) -> StoreResult<()>;

    fn create_materialization(&self, materialization: &RiskMaterialization) -> StoreResult<()>;
    fn get_materialization(
        &self,
        id: MaterializationId,
    ) -> StoreResult<Option<RiskMaterialization>>;
    fn update_materialization(&self, materialization: &RiskMaterialization) -> StoreResult<()>;
}
