//! In-memory entity store.
//!
//! Reference implementation of [`EntityStore`] used by tests and smoke
//! binaries. Writes are serialized behind one `RwLock`, which mirrors the
//! per-entity atomicity of the relational store it stands in for.

use crate::model::incident::{Incident, IncidentId};
use crate::model::materialization::{MaterializationId, RiskMaterialization};
use crate::model::protocol::{ExecutionId, Protocol, ProtocolExecution, ProtocolId};
use crate::model::risk::{Risk, RiskId};
use crate::model::user::{User, UserId};
use crate::store::{EntityKind, EntityStore, StoreError, StoreResult};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

#[derive(Debug, Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    risks: HashMap<Uuid, Risk>,
    incidents: HashMap<Uuid, Incident>,
    protocols: HashMap<Uuid, Protocol>,
    executions: HashMap<Uuid, ProtocolExecution>,
    materializations: HashMap<Uuid, RiskMaterialization>,
}

/// Thread-safe in-memory store keyed by stable entity IDs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|_| StoreError::Backend("store lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|_| StoreError::Backend("store lock poisoned".to_string()))
    }
}

fn create_row<T: Clone>(
    map: &mut HashMap<Uuid, T>,
    kind: EntityKind,
    id: Uuid,
    row: &T,
) -> StoreResult<()> {
    if map.contains_key(&id) {
        return Err(StoreError::Duplicate { kind, id });
    }
    map.insert(id, row.clone());
    Ok(())
}

fn update_row<T: Clone>(
    map: &mut HashMap<Uuid, T>,
    kind: EntityKind,
    id: Uuid,
    row: &T,
) -> StoreResult<()> {
    if !map.contains_key(&id) {
        return Err(StoreError::NotFound { kind, id });
    }
    map.insert(id, row.clone());
    Ok(())
}

impl EntityStore for MemoryStore {
    fn create_user(&self, user: &User) -> StoreResult<()> {
        create_row(&mut self.write()?.users, EntityKind::User, user.id, user)
    }

    fn get_user(&self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    fn update_user(&self, user: &User) -> StoreResult<()> {
        update_row(&mut self.write()?.users, EntityKind::User, user.id, user)
    }

    fn create_risk(&self, risk: &Risk) -> StoreResult<()> {
        create_row(&mut self.write()?.risks, EntityKind::Risk, risk.id, risk)
    }

    fn get_risk(&self, id: RiskId) -> StoreResult<Option<Risk>> {
        Ok(self.read()?.risks.get(&id).cloned())
    }

    fn update_risk(&self, risk: &Risk) -> StoreResult<()> {
        update_row(&mut self.write()?.risks, EntityKind::Risk, risk.id, risk)
    }

    fn create_incident(&self, incident: &Incident) -> StoreResult<()> {
        create_row(
            &mut self.write()?.incidents,
            EntityKind::Incident,
            incident.id,
            incident,
        )
    }

    fn get_incident(&self, id: IncidentId) -> StoreResult<Option<Incident>> {
        Ok(self.read()?.incidents.get(&id).cloned())
    }

    fn update_incident(&self, incident: &Incident) -> StoreResult<()> {
        update_row(
            &mut self.write()?.incidents,
            EntityKind::Incident,
            incident.id,
            incident,
        )
    }

    fn create_protocol(&self, protocol: &Protocol) -> StoreResult<()> {
        create_row(
            &mut self.write()?.protocols,
            EntityKind::Protocol,
            protocol.id,
            protocol,
        )
    }

    fn get_protocol(&self, id: ProtocolId) -> StoreResult<Option<Protocol>> {
        Ok(self.read()?.protocols.get(&id).cloned())
    }

    fn update_protocol(&self, protocol: &Protocol) -> StoreResult<()> {
        update_row(
            &mut self.write()?.protocols,
            EntityKind::Protocol,
            protocol.id,
            protocol,
        )
    }

    fn create_execution(&self, execution: &ProtocolExecution) -> StoreResult<()> {
        create_row(
            &mut self.write()?.executions,
            EntityKind::Execution,
            execution.id,
            execution,
        )
    }

    fn get_execution(&self, id: ExecutionId) -> StoreResult<Option<ProtocolExecution>> {
        Ok(self.read()?.executions.get(&id).cloned())
    }

    fn update_execution(&self, execution: &ProtocolExecution) -> StoreResult<()> {
        update_row(
            &mut self.write()?.executions,
            EntityKind::Execution,
            execution.id,
            execution,
        )
    }

    fn create_materialization(&self, materialization: &RiskMaterialization) -> StoreResult<()> {
        create_row(
            &mut self.write()?.materializations,
            EntityKind::Materialization,
            materialization.id,
            materialization,
        )
    }

    fn get_materialization(
        &self,
        id: MaterializationId,
    ) -> StoreResult<Option<RiskMaterialization>> {
        Ok(self.read()?.materializations.get(&id).cloned())
    }

    fn update_materialization(&self, materialization: &RiskMaterialization) -> StoreResult<()> {
        update_row(
            &mut self.write()?.materializations,
            EntityKind::Materialization,
            materialization.id,
            materialization,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryStore;
    use crate::model::user::{Role, User};
    use crate::store::{EntityStore, StoreError};
    use uuid::Uuid;

    #[test]
    fn create_and_get_roundtrip() {
        let store = MemoryStore::new();
        let user = User::new("Ana Torres", "ana@example.com", Role::Administrator);

        store.create_user(&user).unwrap();
        let loaded = store.get_user(user.id).unwrap().unwrap();
        assert_eq!(loaded, user);
    }

    #[test]
    fn duplicate_create_is_rejected() {
        let store = MemoryStore::new();
        let user = User::new("Ana Torres", "ana@example.com", Role::Reader);

        store.create_user(&user).unwrap();
        let err = store.create_user(&user).unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { id, .. } if id == user.id));
    }

    #[test]
    fn update_missing_row_is_not_found() {
        let store = MemoryStore::new();
        let user = User::new("Nadie", "nadie@example.com", Role::Reader);

        let err = store.update_user(&user).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { id, .. } if id == user.id));
    }

    #[test]
    fn get_missing_row_returns_none() {
        let store = MemoryStore::new();
        assert!(store.get_risk(Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn soft_delete_keeps_the_row() {
        let store = MemoryStore::new();
        let mut user = User::new("Ana Torres", "ana@example.com", Role::Reader);
        store.create_user(&user).unwrap();

        user.deactivate();
        store.update_user(&user).unwrap();

        let loaded = store.get_user(user.id).unwrap().unwrap();
        assert!(!loaded.active);
    }
}
