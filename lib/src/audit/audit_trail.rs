// lib/src/audit/audit_trail.rs

use std::sync::Arc;

use log::info;

use models::medical::{AuditEntry, EntityRef};
use models::HmsResult;

use crate::storage_engine::RecordStore;

/// Persists audit entries and mirrors them to the log.
#[derive(Clone)]
pub struct AuditTrail {
    store: Arc<dyn RecordStore>,
}

impl AuditTrail {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        AuditTrail { store }
    }

    /// Writes one entry on its own. Entries that belong to a multi-record
    /// change travel inside its `ChangeSet` instead and are only emitted here.
    pub async fn record(&self, entry: AuditEntry) -> HmsResult<()> {
        self.emit(&entry);
        self.store.append_audit(entry).await
    }

    pub fn emit(&self, entry: &AuditEntry) {
        match &entry.parent {
            Some(parent) => info!(
                "audit: {} ({}) {:?} {} [{}]: {}",
                entry.actor_id, entry.role, entry.action, entry.entity, parent, entry.detail
            ),
            None => info!(
                "audit: {} ({}) {:?} {}: {}",
                entry.actor_id, entry.role, entry.action, entry.entity, entry.detail
            ),
        }
    }

    pub fn emit_all(&self, entries: &[AuditEntry]) {
        entries.iter().for_each(|entry| self.emit(entry));
    }

    /// Entries about `entity`, including those of its child records, oldest first.
    pub async fn history(&self, entity: &EntityRef) -> HmsResult<Vec<AuditEntry>> {
        let mut entries = self.store.audit_for(entity).await?;
        entries.sort_by_key(|e| e.at);
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage_engine::InMemoryStorage;
    use models::medical::{Actor, AuditAction, Role};

    #[tokio::test]
    async fn history_includes_child_entries() {
        let trail = AuditTrail::new(Arc::new(InMemoryStorage::new()));
        let tech = Actor::new("tech-1", Role::LabTechnician);
        trail
            .record(AuditEntry::new(&tech, AuditAction::LabResultRecorded, EntityRef::LabReport(9), "CBC")
                .with_parent(EntityRef::Prescription(4)))
            .await
            .unwrap();
        trail
            .record(AuditEntry::new(&tech, AuditAction::LabResultRecorded, EntityRef::LabReport(10), "other")
                .with_parent(EntityRef::Prescription(5)))
            .await
            .unwrap();

        let history = trail.history(&EntityRef::Prescription(4)).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].entity, EntityRef::LabReport(9));
        assert_eq!(history[0].actor_id, "tech-1");
    }
}
