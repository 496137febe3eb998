//! Notification template catalog.
//!
//! One UTF-8 HTML template per event kind. Built-in copies are embedded
//! at compile time; an operator directory can override any of them, file
//! name `<event_kind>.html`. Kinds without an override fall back to the
//! embedded default.

use crate::lifecycle::event::EventKind;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Template catalog lookup and override loading errors.
#[derive(Debug)]
pub enum CatalogError {
    /// An override file exists but could not be read as UTF-8 text.
    Unreadable { path: PathBuf, message: String },
}

impl Display for CatalogError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unreadable { path, message } => {
                write!(f, "cannot read template `{}`: {message}", path.display())
            }
        }
    }
}

impl Error for CatalogError {}

/// Resolves the template text for each event kind.
#[derive(Debug, Default)]
pub struct TemplateCatalog {
    overrides: BTreeMap<&'static str, String>,
}

impl TemplateCatalog {
    /// Catalog backed only by the embedded templates.
    pub fn builtin() -> Self {
        Self::default()
    }

    /// Loads `<event_kind>.html` overrides from a directory.
    ///
    /// Missing files are fine; present-but-unreadable files are errors.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let mut overrides = BTreeMap::new();
        for kind in EventKind::all() {
            let path = dir.as_ref().join(format!("{}.html", kind.as_str()));
            if !path.exists() {
                continue;
            }
            let text = std::fs::read_to_string(&path).map_err(|err| CatalogError::Unreadable {
                path: path.clone(),
                message: err.to_string(),
            })?;
            overrides.insert(kind.as_str(), text);
        }
        Ok(Self { overrides })
    }

    /// Template text for one event kind.
    pub fn template(&self, kind: EventKind) -> &str {
        self.overrides
            .get(kind.as_str())
            .map(String::as_str)
            .unwrap_or_else(|| builtin_template(kind))
    }
}

fn builtin_template(kind: EventKind) -> &'static str {
    match kind {
        EventKind::RiskCreated => include_str!("../../templates/risk_created.html"),
        EventKind::RiskStateChanged => include_str!("../../templates/risk_state_changed.html"),
        EventKind::RiskMaterialized => include_str!("../../templates/risk_materialized.html"),
        EventKind::IncidentCreated => include_str!("../../templates/incident_created.html"),
        EventKind::IncidentStateChanged => {
            include_str!("../../templates/incident_state_changed.html")
        }
        EventKind::IncidentCancelled => include_str!("../../templates/incident_cancelled.html"),
        EventKind::UserRegistered => include_str!("../../templates/user_registered.html"),
        EventKind::UserLoggedIn => include_str!("../../templates/user_logged_in.html"),
    }
}
