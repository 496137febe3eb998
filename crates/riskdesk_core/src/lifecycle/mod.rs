//! Lifecycle orchestration for risks, incidents and protocol executions.
//!
//! # Responsibility
//! - Validate and apply state transitions through the entity store.
//! - Emit one domain event per committed state change.
//!
//! # Invariants
//! - No state change is persisted when validation fails.
//! - A committed transition is never unwound by a notification failure.

use crate::store::{EntityKind, StoreError};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod event;
pub mod manager;
pub mod request;

pub type LifecycleResult<T> = Result<T, LifecycleError>;

/// Rejected transition request; nothing was persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing or blank.
    MissingField {
        entity: &'static str,
        field: &'static str,
    },
    /// Email value does not look like an address.
    InvalidEmail(String),
    /// The state machine does not permit this move.
    InvalidTransition {
        entity: &'static str,
        from: &'static str,
        to: &'static str,
    },
    /// Progress percentage outside 0..=100.
    ProgressOutOfRange(u8),
    /// Completion requested before the run was actually finished.
    IncompleteExecution { progress: u8, missing_steps: usize },
    /// A completed-step identifier is not declared by the protocol.
    UndeclaredStep(Uuid),
    /// Materializations can only be recorded while the risk is active.
    RiskNotActive { state: &'static str },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField { entity, field } => {
                write!(f, "{entity} requires a non-empty `{field}`")
            }
            Self::InvalidEmail(value) => write!(f, "invalid email address: `{value}`"),
            Self::InvalidTransition { entity, from, to } => {
                write!(f, "{entity} cannot move from `{from}` to `{to}`")
            }
            Self::ProgressOutOfRange(value) => {
                write!(f, "progress must be within 0..=100, got {value}")
            }
            Self::IncompleteExecution {
                progress,
                missing_steps,
            } => write!(
                f,
                "execution cannot complete at progress {progress} with {missing_steps} pending step(s)"
            ),
            Self::UndeclaredStep(id) => {
                write!(f, "step {id} is not declared by the protocol")
            }
            Self::RiskNotActive { state } => {
                write!(f, "risk in state `{state}` cannot materialize")
            }
        }
    }
}

impl Error for ValidationError {}

/// Error surfaced by lifecycle operations.
#[derive(Debug)]
pub enum LifecycleError {
    /// Caller-actionable input problem; no state change occurred.
    Validation(ValidationError),
    /// Referenced entity does not exist.
    NotFound { kind: EntityKind, id: Uuid },
    /// Referenced entity exists but is softly deleted.
    InactiveReference { kind: EntityKind, id: Uuid },
    /// Persistence failure; the transition did not happen.
    Store(StoreError),
}

impl Display for LifecycleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound { kind, id } => write!(f, "{} not found: {id}", kind.as_str()),
            Self::InactiveReference { kind, id } => {
                write!(f, "{} is inactive: {id}", kind.as_str())
            }
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for LifecycleError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for LifecycleError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<StoreError> for LifecycleError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound { kind, id } => Self::NotFound { kind, id },
            other => Self::Store(other),
        }
    }
}
