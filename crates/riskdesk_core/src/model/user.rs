//! User reference model.
//!
//! Users are referenced by risks, incidents and executions but owned by
//! the account subsystem; this crate only needs identity, contact and
//! activation data.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a user account.
pub type UserId = Uuid;

/// Access role for a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Administrator,
    Reader,
}

impl Role {
    /// Canonical display label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Administrator => "Administrador",
            Self::Reader => "Lector",
        }
    }
}

/// User account snapshot as seen by the lifecycle core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub full_name: String,
    pub email: String,
    pub role: Role,
    /// Soft-delete flag; inactive users fail referential validation.
    pub active: bool,
}

impl User {
    /// Creates an active user with a generated stable ID.
    pub fn new(full_name: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            full_name: full_name.into(),
            email: email.into(),
            role,
            active: true,
        }
    }

    /// Marks this user as softly deleted.
    pub fn deactivate(&mut self) {
        self.active = false;
    }

    /// Whether notifications can be addressed to this user.
    ///
    /// Requires an active account and a non-empty email address.
    pub fn has_notification_address(&self) -> bool {
        self.active && !self.email.trim().is_empty()
    }
}
